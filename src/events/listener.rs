//! Listener handles
//!
//! A [`Listener`] is a shared, cloneable handle around a callback. Two
//! handles are the same listener when they point at the same allocation,
//! which is what duplicate detection and removal compare.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Closure type for event listeners
pub type ListenerFn<T> = dyn Fn(&T) + Send + Sync;

/// Shared handle to a listener callback
pub struct Listener<T> {
    callback: Arc<ListenerFn<T>>,
}

impl<T> Listener<T> {
    /// Wrap a callback
    pub fn new(callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Invoke the callback
    pub fn call(&self, payload: &T) {
        (self.callback)(payload)
    }

    /// Identity comparison
    ///
    /// Only the data pointer is compared; vtable pointers for the same
    /// closure type are not guaranteed unique across codegen units.
    pub fn same_as(&self, other: &Listener<T>) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.callback) as *const (),
            Arc::as_ptr(&other.callback) as *const (),
        )
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("ptr", &(Arc::as_ptr(&self.callback) as *const ()))
            .finish()
    }
}

/// One entry of the listener table
///
/// Clones share the `fired` flag, so a once listener reached again through
/// a nested emit of the same event is skipped.
#[derive(Debug)]
pub(crate) struct Registration<T> {
    pub(crate) listener: Listener<T>,
    pub(crate) once: bool,
    fired: Arc<AtomicBool>,
}

impl<T> Registration<T> {
    pub(crate) fn new(listener: Listener<T>, once: bool) -> Self {
        Self {
            listener,
            once,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether this registration should run now; marks once listeners fired
    pub(crate) fn claim(&self) -> bool {
        !self.once || !self.fired.swap(true, Ordering::SeqCst)
    }

    /// A once registration that already ran and waits for removal
    pub(crate) fn is_spent(&self) -> bool {
        self.once && self.fired.load(Ordering::SeqCst)
    }

    /// Whether `other` is this registration or one of its clones
    pub(crate) fn same_entry(&self, other: &Registration<T>) -> bool {
        Arc::ptr_eq(&self.fired, &other.fired)
    }
}

impl<T> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener.clone(),
            once: self.once,
            fired: Arc::clone(&self.fired),
        }
    }
}
