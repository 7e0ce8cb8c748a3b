//! # Event Bus
//!
//! Typed, synchronous publish/subscribe keyed by event name.
//!
//! ## Invariants
//!
//! - Listeners fire in registration order; prepends go to the front.
//! - A listener is registered at most once per event name.
//! - `emit` walks a snapshot taken at call time. Listeners added or removed
//!   while the snapshot is walked do not change which listeners run in that
//!   round.
//! - `once` listeners are removed after the whole snapshot has been walked.
//! - The table lock is never held while a listener runs, so listeners may
//!   call back into the bus.

use std::sync::RwLock;

use super::listener::{Listener, Registration};

/// Listeners registered under one event name
struct EventSlot<T> {
    name: String,
    registrations: Vec<Registration<T>>,
}

/// Typed event bus
///
/// `T` is the payload handed to every listener of every event.
pub struct EventBus<T> {
    /// Event slots, in order of first registration
    slots: RwLock<Vec<EventSlot<T>>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Register `listener` for `event`
    ///
    /// Registering the same listener twice for one event is a no-op.
    pub fn on(&self, event: &str, listener: &Listener<T>) -> &Self {
        self.register(event, listener, false, false)
    }

    /// Alias of [`EventBus::on`]
    pub fn add_listener(&self, event: &str, listener: &Listener<T>) -> &Self {
        self.on(event, listener)
    }

    /// Register `listener` for a single invocation
    pub fn once(&self, event: &str, listener: &Listener<T>) -> &Self {
        self.register(event, listener, true, false)
    }

    /// Register `listener` ahead of every existing listener for `event`
    pub fn prepend_listener(&self, event: &str, listener: &Listener<T>) -> &Self {
        self.register(event, listener, false, true)
    }

    /// Register a single-shot `listener` ahead of every existing listener
    pub fn prepend_once_listener(&self, event: &str, listener: &Listener<T>) -> &Self {
        self.register(event, listener, true, true)
    }

    fn register(&self, event: &str, listener: &Listener<T>, once: bool, prepend: bool) -> &Self {
        if let Ok(mut slots) = self.slots.write() {
            let index = match slots.iter().position(|slot| slot.name == event) {
                Some(index) => index,
                None => {
                    slots.push(EventSlot {
                        name: event.to_string(),
                        registrations: Vec::new(),
                    });
                    slots.len() - 1
                }
            };

            let registrations = &mut slots[index].registrations;
            if registrations
                .iter()
                .any(|r| !r.is_spent() && r.listener.same_as(listener))
            {
                return self;
            }

            let registration = Registration::new(listener.clone(), once);
            if prepend {
                registrations.insert(0, registration);
            } else {
                registrations.push(registration);
            }
        }
        self
    }

    /// Remove `listener` from `event`
    ///
    /// Drops the event name entirely once its last listener is gone.
    pub fn remove_listener(&self, event: &str, listener: &Listener<T>) -> &Self {
        self.remove_matching(event, |r| r.listener.same_as(listener));
        self
    }

    /// Alias of [`EventBus::remove_listener`]
    pub fn off(&self, event: &str, listener: &Listener<T>) -> &Self {
        self.remove_listener(event, listener)
    }

    fn remove_matching(&self, event: &str, predicate: impl Fn(&Registration<T>) -> bool) {
        if let Ok(mut slots) = self.slots.write() {
            if let Some(index) = slots.iter().position(|slot| slot.name == event) {
                let registrations = &mut slots[index].registrations;
                if let Some(pos) = registrations.iter().position(|r| predicate(r)) {
                    registrations.remove(pos);
                }
                if registrations.is_empty() {
                    slots.remove(index);
                }
            }
        }
    }

    /// Remove every listener of `event`, or of every event when `None`
    pub fn remove_all_listeners(&self, event: Option<&str>) -> &Self {
        if let Ok(mut slots) = self.slots.write() {
            match event {
                Some(name) => slots.retain(|slot| slot.name != name),
                None => slots.clear(),
            }
        }
        self
    }

    /// Invoke every listener of `event` with `payload`
    ///
    /// Returns whether any listener was registered. Listeners run
    /// synchronously; nothing is awaited.
    pub fn emit(&self, event: &str, payload: &T) -> bool {
        let snapshot: Vec<Registration<T>> = match self.slots.read() {
            Ok(slots) => slots
                .iter()
                .find(|slot| slot.name == event)
                .map(|slot| slot.registrations.clone())
                .unwrap_or_default(),
            Err(_) => return false,
        };

        if snapshot.is_empty() {
            return false;
        }

        for registration in &snapshot {
            if registration.claim() {
                registration.listener.call(payload);
            }
        }

        for fired in snapshot.iter().filter(|r| r.once) {
            self.remove_matching(event, |r| r.same_entry(fired));
        }

        true
    }

    /// Listeners currently registered for `event`, in invocation order
    pub fn listeners(&self, event: &str) -> Vec<Listener<T>> {
        self.slots
            .read()
            .map(|slots| {
                slots
                    .iter()
                    .find(|slot| slot.name == event)
                    .map(|slot| slot.registrations.iter().map(|r| r.listener.clone()).collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Number of listeners registered for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.slots
            .read()
            .map(|slots| {
                slots
                    .iter()
                    .find(|slot| slot.name == event)
                    .map(|slot| slot.registrations.len())
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    /// Event names with at least one listener, in order of first registration
    pub fn event_names(&self) -> Vec<String> {
        self.slots
            .read()
            .map(|slots| slots.iter().map(|slot| slot.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn counter() -> (Arc<AtomicUsize>, Listener<()>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let listener = Listener::new(move |_: &()| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Listener<()> {
        let log = Arc::clone(log);
        Listener::new(move |_: &()| log.lock().unwrap().push(tag))
    }

    #[test]
    fn test_on_and_once() {
        let bus = EventBus::new();
        let (f_count, f) = counter();
        let (g_count, g) = counter();

        bus.on("x", &f).once("x", &g);
        assert!(bus.emit("x", &()));
        assert!(bus.emit("x", &()));

        assert_eq!(f_count.load(Ordering::SeqCst), 2);
        assert_eq!(g_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let bus = EventBus::new();
        let (count, f) = counter();

        bus.on("x", &f).on("x", &f).add_listener("x", &f.clone());
        bus.emit("x", &());

        assert_eq!(bus.listener_count("x"), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_without_listeners() {
        let bus: EventBus<()> = EventBus::new();
        assert!(!bus.emit("nothing", &()));
    }

    #[test]
    fn test_prepend_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.on("x", &recorder(&log, "a"));
        bus.on("x", &recorder(&log, "b"));
        bus.prepend_listener("x", &recorder(&log, "first"));
        bus.prepend_once_listener("x", &recorder(&log, "zeroth"));

        bus.emit("x", &());
        bus.emit("x", &());

        assert_eq!(
            *log.lock().unwrap(),
            vec!["zeroth", "first", "a", "b", "first", "a", "b"]
        );
    }

    #[test]
    fn test_remove_listener_drops_empty_event() {
        let bus = EventBus::new();
        let (_, f) = counter();
        let (_, g) = counter();

        bus.on("x", &f).on("y", &g);
        bus.remove_listener("x", &f);

        assert_eq!(bus.event_names(), vec!["y".to_string()]);
        assert_eq!(bus.listener_count("x"), 0);
    }

    #[test]
    fn test_remove_all_listeners() {
        let bus = EventBus::new();
        let (_, f) = counter();

        bus.on("x", &f).on("y", &f).on("z", &f);
        bus.remove_all_listeners(Some("y"));
        assert_eq!(bus.event_names(), vec!["x".to_string(), "z".to_string()]);

        bus.remove_all_listeners(None);
        assert!(bus.event_names().is_empty());
    }

    #[test]
    fn test_removal_during_emit_does_not_skip_snapshot() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim = recorder(&log, "victim");

        let remover = {
            let bus = Arc::clone(&bus);
            let victim = victim.clone();
            let log = Arc::clone(&log);
            Listener::new(move |_: &()| {
                log.lock().unwrap().push("remover");
                bus.remove_listener("x", &victim);
            })
        };

        bus.on("x", &remover).on("x", &victim);
        bus.emit("x", &());
        bus.emit("x", &());

        assert_eq!(
            *log.lock().unwrap(),
            vec!["remover", "victim", "remover"]
        );
    }

    #[test]
    fn test_listener_added_during_emit_waits_for_next_round() {
        let bus = Arc::new(EventBus::new());
        let (late_count, late) = counter();

        let adder = {
            let bus = Arc::clone(&bus);
            Listener::new(move |_: &()| {
                bus.on("x", &late);
            })
        };

        bus.on("x", &adder);
        bus.emit("x", &());
        assert_eq!(late_count.load(Ordering::SeqCst), 0);

        bus.emit("x", &());
        assert_eq!(late_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_once_listener_sees_full_batch_before_removal() {
        let bus = Arc::new(EventBus::new());
        let observed = Arc::new(AtomicUsize::new(0));
        let (_, once) = counter();

        let inspector = {
            let bus = Arc::clone(&bus);
            let observed = Arc::clone(&observed);
            Listener::new(move |_: &()| {
                observed.store(bus.listener_count("x"), Ordering::SeqCst);
            })
        };

        bus.once("x", &once).on("x", &inspector);
        bus.emit("x", &());

        // The once listener is still registered while the batch runs
        assert_eq!(observed.load(Ordering::SeqCst), 2);
        assert_eq!(bus.listener_count("x"), 1);
    }

    #[test]
    fn test_listeners_introspection() {
        let bus = EventBus::new();
        let (_, f) = counter();
        let (_, g) = counter();

        bus.on("x", &f).prepend_listener("x", &g);
        let listeners = bus.listeners("x");

        assert_eq!(listeners.len(), 2);
        assert!(listeners[0].same_as(&g));
        assert!(listeners[1].same_as(&f));
        assert!(bus.listeners("missing").is_empty());
    }
}
