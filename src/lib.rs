//! aerodb-sdk - Asynchronous client core for the AeroDB real-time backend
//!
//! Request lifecycle, interceptor pipeline, realtime subscriptions and
//! paginated search over a pluggable transport.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod protocol;
pub mod realtime;
pub mod request;
pub mod search;
pub mod transport;

pub use client::Client;
pub use config::{ConfigError, SdkConfig};
pub use error::{SdkError, SdkResult};
pub use events::{EventBus, Listener, SdkEvent};
pub use pipeline::{Interceptor, InterceptorPipeline, Phase};
pub use protocol::{QueryDispatcher, QueryOptions, RequestDescriptor, ResponseDescriptor};
pub use realtime::{Notification, SubscribeOptions, Subscription};
pub use search::{PaginatedResult, SearchActions};
pub use transport::{QueueTransport, Transport};
