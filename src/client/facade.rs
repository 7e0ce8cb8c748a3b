//! Client facade

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::handle::ClientHandle;
use crate::config::SdkConfig;
use crate::error::SdkResult;
use crate::events::{EventBus, SdkEvent};
use crate::observability::{log_event, log_event_with_fields, trace_event, Event, Logger};
use crate::pipeline::{Interceptor, InterceptorPipeline, Phase};
use crate::protocol::{
    DispatchFuture, QueryDispatcher, QueryOptions, RequestDescriptor, ResponseDescriptor,
};
use crate::realtime::{
    Notification, ReconnectReport, SubscribeOptions, Subscription, SubscriptionRegistry,
    ORIGIN_KEY,
};
use crate::request::RequestError;
use crate::search::{PaginatedResult, SearchActions};
use crate::transport::Transport;

/// Volatile key carrying the SDK name
pub const SDK_NAME_KEY: &str = "sdkName";

const REQUEST_STAGE: &str = "request";
const SUBSCRIBE_STAGE: &str = "subscribe";
const SEARCH_STAGE: &str = "search";

/// SDK client
pub struct Client {
    config: SdkConfig,
    transport: Arc<dyn Transport>,
    pipeline: InterceptorPipeline<Value>,
    subscriptions: SubscriptionRegistry,
    events: EventBus<SdkEvent>,
}

impl Client {
    /// Create a client over `transport`
    ///
    /// Validates `config` and applies its log level.
    pub fn new(config: SdkConfig, transport: Arc<dyn Transport>) -> SdkResult<Arc<Self>> {
        config.validate()?;
        Logger::set_min_severity(config.severity()?);

        Ok(Arc::new(Self {
            pipeline: InterceptorPipeline::new(config.pipeline_config()),
            config,
            transport,
            subscriptions: SubscriptionRegistry::new(),
            events: EventBus::new(),
        }))
    }

    /// Active configuration
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Connection-level events (`tokenExpired`, `reconnected`, `disconnected`)
    pub fn events(&self) -> &EventBus<SdkEvent> {
        &self.events
    }

    /// Subscriptions of this connection
    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// Register an interceptor on `stage`
    pub fn register_interceptor(
        &self,
        stage: &str,
        phase: Phase,
        description: &str,
        interceptor: Interceptor<Value>,
    ) -> SdkResult<()> {
        self.pipeline.register(stage, phase, description, interceptor)?;
        Ok(())
    }

    /// Send one request and wait for its response
    ///
    /// Assigns a request id when missing, stamps the connection identity and
    /// SDK name into `volatile`, and runs the interceptors of the `request`
    /// stage (plus `search` or `subscribe` for those actions) around the call.
    pub async fn query(
        &self,
        request: RequestDescriptor,
        options: QueryOptions,
    ) -> SdkResult<ResponseDescriptor> {
        let request = self.prepare(request);
        let stage = action_stage(&request);

        let mut request = self.intercept(REQUEST_STAGE, Phase::Before, request).await?;
        if let Some(stage) = stage {
            request = self.intercept(stage, Phase::Before, request).await?;
        }

        trace_event(
            Event::RequestSent,
            &[
                ("action", request.action_name().as_str()),
                ("request_id", request.request_id_str()),
            ],
        );

        let timeout = options.timeout.or_else(|| self.config.request_timeout());
        let mut response = self.transport.send(request, timeout).await?;

        if let Some(stage) = stage {
            response = self.intercept(stage, Phase::After, response).await?;
        }
        let response = self.intercept(REQUEST_STAGE, Phase::After, response).await?;

        Ok(response)
    }

    /// Run a search-like request and wrap the first page
    pub async fn search(
        self: &Arc<Self>,
        request: RequestDescriptor,
        options: QueryOptions,
    ) -> SdkResult<PaginatedResult> {
        let response = self.query(request.clone(), options.clone()).await?;
        let dispatcher: Arc<dyn QueryDispatcher> = Arc::clone(self) as Arc<dyn QueryDispatcher>;
        Ok(PaginatedResult::new(dispatcher, request, options, &response)?)
    }

    /// Subscribe to changes on `index`/`collection` matching `filters`
    ///
    /// `options` of `None` uses the configured defaults.
    pub async fn subscribe<F>(
        self: &Arc<Self>,
        index: &str,
        collection: &str,
        filters: Value,
        callback: F,
        options: Option<SubscribeOptions>,
    ) -> SdkResult<Subscription>
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let options = options.unwrap_or_else(|| self.config.subscribe_options());
        let subscription = Subscription::new(
            Arc::new(ClientHandle::new(self)),
            index,
            collection,
            filters,
            callback,
            options,
        );

        subscription.subscribe().await?;
        self.subscriptions.add(subscription.clone())?;
        Ok(subscription)
    }

    /// Leave the room `room_id`
    pub async fn unsubscribe(&self, room_id: &str) -> SdkResult<()> {
        let subscription = self.subscriptions.remove(room_id)?;
        subscription.unsubscribe().await?;
        Ok(())
    }

    /// The transport re-established its connection
    ///
    /// Publishes `reconnected`, then re-subscribes the rooms that asked
    /// for it.
    pub async fn reconnected(&self) -> ReconnectReport {
        log_event(Event::ConnectionRestored);
        self.events.emit(SdkEvent::Reconnected.name(), &SdkEvent::Reconnected);
        self.subscriptions.on_reconnect().await
    }

    /// The transport lost its connection
    ///
    /// Subscriptions are kept so they can be re-issued on reconnect.
    pub fn disconnected(&self) {
        log_event(Event::ConnectionLost);
        self.events.emit(SdkEvent::Disconnected.name(), &SdkEvent::Disconnected);
    }

    /// Terminate every subscription without contacting the server
    pub fn teardown(&self) -> usize {
        let count = self.subscriptions.teardown();
        let count_str = count.to_string();
        log_event_with_fields(Event::SubscriptionsTornDown, &[("count", count_str.as_str())]);
        count
    }

    fn prepare(&self, mut request: RequestDescriptor) -> RequestDescriptor {
        if request.request_id.as_deref().map_or(true, str::is_empty) {
            request.request_id = Some(Uuid::new_v4().to_string());
        }
        if let Some(connection_id) = self.transport.connection_id() {
            request
                .volatile
                .insert(ORIGIN_KEY.to_string(), Value::String(connection_id));
        }
        request
            .volatile
            .insert(SDK_NAME_KEY.to_string(), Value::String(self.config.sdk_name.clone()));
        request
    }

    async fn intercept<T>(&self, stage: &str, phase: Phase, value: T) -> SdkResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
    {
        if self.pipeline.interceptor_count(stage, phase) == 0 {
            return Ok(value);
        }

        let payload = serde_json::to_value(&value).map_err(RequestError::from)?;
        let payload = self.pipeline.execute(stage, phase, payload).await?;
        Ok(serde_json::from_value(payload).map_err(RequestError::from)?)
    }
}

/// Action-specific stage run inside the `request` stage
fn action_stage(request: &RequestDescriptor) -> Option<&'static str> {
    if request.controller == "realtime" && request.action == "subscribe" {
        return Some(SUBSCRIBE_STAGE);
    }
    SearchActions::is_search_like(request).then_some(SEARCH_STAGE)
}

impl QueryDispatcher for Client {
    fn dispatch(&self, request: RequestDescriptor, options: QueryOptions) -> DispatchFuture<'_> {
        Box::pin(async move {
            self.query(request, options)
                .await
                .map_err(|e| e.into_request_error())
        })
    }

    fn connection_id(&self) -> Option<String> {
        self.transport.connection_id()
    }

    fn channels(&self) -> Arc<EventBus<Value>> {
        self.transport.channels()
    }

    fn token_expired(&self) {
        self.events.emit(SdkEvent::TokenExpired.name(), &SdkEvent::TokenExpired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_stage() {
        assert_eq!(
            action_stage(&RequestDescriptor::new("realtime", "subscribe")),
            Some(SUBSCRIBE_STAGE)
        );
        assert_eq!(
            action_stage(&RequestDescriptor::new("document", "search")),
            Some(SEARCH_STAGE)
        );
        assert_eq!(
            action_stage(&RequestDescriptor::new("security", "scrollUsers")),
            Some(SEARCH_STAGE)
        );
        assert_eq!(action_stage(&RequestDescriptor::new("document", "create")), None);
    }

    #[test]
    fn test_sdk_name_key_is_camel_case() {
        let request = RequestDescriptor::new("server", "now").with_volatile(SDK_NAME_KEY, json!("x"));
        let frame = serde_json::to_value(&request).unwrap();
        assert_eq!(frame["volatile"]["sdkName"], json!("x"));
    }
}
