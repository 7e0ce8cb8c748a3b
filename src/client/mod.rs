//! # Client
//!
//! The facade callers use: every request goes through the interceptor
//! pipeline and the transport, search responses become paginated results
//! and subscriptions are tracked per connection.

mod facade;
mod handle;

pub use facade::{Client, SDK_NAME_KEY};
