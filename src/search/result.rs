//! # Paginated Result
//!
//! One page of a search-like response plus what is needed to fetch the
//! next one. Each [`PaginatedResult::next`] call yields a new result whose
//! fetched count is the running total of the chain.
//!
//! ## Strategy selection
//!
//! 1. `fetched >= total`: exhausted, no call is made
//! 2. Original request has `scroll`: scroll continuation with the cursor id
//! 3. Original request has `size` and a sort: `search_after` from the last hit
//! 4. Original request has `size` only: `from` advanced to `fetched`
//! 5. Otherwise: `MissingPaginationContext`

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::actions::SearchActions;
use super::errors::{SearchError, SearchResult};
use super::sort::{sort_fields, ID_FIELD};
use crate::observability::{log_event_with_fields, trace_event, Event};
use crate::protocol::{
    resolve_path, Hit, QueryDispatcher, QueryOptions, RequestDescriptor, ResponseDescriptor,
    SearchPage,
};

/// Key under which the keyset tuple is added to the request body
pub const SEARCH_AFTER_KEY: &str = "search_after";

/// How the next page is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Opaque server cursor
    Scroll,
    /// Sort values of the last hit
    SearchAfter,
    /// Numeric offset
    Offset,
}

impl Strategy {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Scroll => "scroll",
            Strategy::SearchAfter => "search_after",
            Strategy::Offset => "offset",
        }
    }
}

/// A page of hits that knows how to fetch its successor
pub struct PaginatedResult {
    dispatcher: Arc<dyn QueryDispatcher>,
    request: RequestDescriptor,
    options: QueryOptions,
    actions: Option<SearchActions>,
    hits: Vec<Hit>,
    aggregations: Option<Value>,
    fetched: u64,
    total: u64,
    scroll_id: Option<String>,
}

impl PaginatedResult {
    /// Wrap the response to `request`
    pub fn new(
        dispatcher: Arc<dyn QueryDispatcher>,
        request: RequestDescriptor,
        options: QueryOptions,
        response: &ResponseDescriptor,
    ) -> SearchResult<Self> {
        let page = read_page(response)?;
        let actions = SearchActions::for_request(&request);
        Ok(Self::from_page(dispatcher, request, options, actions, page, 0))
    }

    /// Use `actions` for scroll continuations instead of the looked-up family
    pub fn with_actions(mut self, actions: SearchActions) -> Self {
        self.actions = Some(actions);
        self
    }

    fn from_page(
        dispatcher: Arc<dyn QueryDispatcher>,
        request: RequestDescriptor,
        options: QueryOptions,
        actions: Option<SearchActions>,
        page: SearchPage,
        fetched_before: u64,
    ) -> Self {
        let fetched = fetched_before + page.hits.len() as u64;
        Self {
            dispatcher,
            request,
            options,
            actions,
            hits: page.hits,
            aggregations: page.aggregations,
            fetched,
            total: page.total,
            scroll_id: page.scroll_id,
        }
    }

    /// Hits of this page
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Take the hits of this page
    pub fn into_hits(self) -> Vec<Hit> {
        self.hits
    }

    /// Aggregations returned with this page
    pub fn aggregations(&self) -> Option<&Value> {
        self.aggregations.as_ref()
    }

    /// Hits fetched so far across the chain, this page included
    pub fn fetched(&self) -> u64 {
        self.fetched
    }

    /// Total number of matching hits
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Cursor returned with this page
    pub fn scroll_id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// The request the chain started from
    pub fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    /// Whether the chain has nothing left to fetch
    ///
    /// True once every hit has been fetched, or when an offset search
    /// started at or past the total.
    pub fn is_exhausted(&self) -> bool {
        self.fetched >= self.total || self.offset_past_total()
    }

    fn offset_past_total(&self) -> bool {
        self.strategy() == Some(Strategy::Offset) && self.request.from.unwrap_or(0) >= self.total
    }

    /// Continuation strategy implied by the original request
    pub fn strategy(&self) -> Option<Strategy> {
        if self.request.scroll.is_some() {
            Some(Strategy::Scroll)
        } else if self.request.size.is_some() && self.request.sort().is_some() {
            Some(Strategy::SearchAfter)
        } else if self.request.size.is_some() {
            Some(Strategy::Offset)
        } else {
            None
        }
    }

    /// Fetch the next page, or `None` once the chain is exhausted
    pub async fn next(&self) -> SearchResult<Option<PaginatedResult>> {
        let action = self.request.action_name();

        if self.is_exhausted() {
            let fetched = self.fetched.to_string();
            trace_event(
                Event::PagesExhausted,
                &[("action", action.as_str()), ("fetched", fetched.as_str())],
            );
            return Ok(None);
        }

        let (strategy, request) = self.next_request()?;
        let response = self.dispatcher.dispatch(request, self.options.clone()).await?;
        let page = read_page(&response)?;

        let next = Self::from_page(
            Arc::clone(&self.dispatcher),
            self.request.clone(),
            self.options.clone(),
            self.actions,
            page,
            self.fetched,
        );

        let fetched = next.fetched.to_string();
        let total = next.total.to_string();
        let hits = next.hits.len().to_string();
        log_event_with_fields(
            Event::PageFetched,
            &[
                ("action", action.as_str()),
                ("fetched", fetched.as_str()),
                ("hits", hits.as_str()),
                ("strategy", strategy.as_str()),
                ("total", total.as_str()),
            ],
        );

        Ok(Some(next))
    }

    /// The request that fetches the page after this one
    pub fn next_request(&self) -> SearchResult<(Strategy, RequestDescriptor)> {
        match self.strategy() {
            Some(Strategy::Scroll) => self.scroll_request().map(|r| (Strategy::Scroll, r)),
            Some(Strategy::SearchAfter) => {
                self.search_after_request().map(|r| (Strategy::SearchAfter, r))
            }
            Some(Strategy::Offset) => Ok((Strategy::Offset, self.offset_request())),
            None => Err(SearchError::missing_context(
                self.request.action_name(),
                "request has no scroll, no sort with size, and no size",
            )),
        }
    }

    fn scroll_request(&self) -> SearchResult<RequestDescriptor> {
        let action = self.request.action_name();
        let (controller, scroll_action) = match self.actions {
            Some(SearchActions {
                controller,
                scroll: Some(scroll),
                ..
            }) => (controller, scroll),
            _ => {
                return Err(SearchError::missing_context(
                    action,
                    "no scroll action exists for this search",
                ))
            }
        };

        let scroll_id = self.scroll_id.clone().ok_or_else(|| {
            SearchError::missing_context(action.clone(), "previous response carried no scroll id")
        })?;
        let ttl = self.request.scroll.clone().unwrap_or_default();

        let mut request = RequestDescriptor::new(controller, scroll_action).with_scroll(ttl);
        request.scroll_id = Some(scroll_id);
        request.volatile = self.request.volatile.clone();
        Ok(request)
    }

    fn search_after_request(&self) -> SearchResult<RequestDescriptor> {
        let sort = self
            .request
            .sort()
            .ok_or_else(|| SearchError::ambiguous_sort("request carries no sort"))?;
        let fields = sort_fields(sort)?;

        let last = self.hits.last().ok_or_else(|| SearchError::EmptyPage {
            action: self.request.action_name(),
        })?;

        let key: Vec<Value> = fields
            .iter()
            .map(|field| {
                if field == ID_FIELD {
                    Value::String(last.id.clone())
                } else {
                    resolve_path(&last.source, field).into_value()
                }
            })
            .collect();

        let mut request = self.request.clone();
        request.request_id = None;
        if let Some(body) = request.body.as_object_mut() {
            body.insert(SEARCH_AFTER_KEY.to_string(), Value::Array(key));
        }
        Ok(request)
    }

    fn offset_request(&self) -> RequestDescriptor {
        let mut request = self.request.clone();
        request.request_id = None;
        request.from = Some(self.fetched);
        request
    }
}

fn read_page(response: &ResponseDescriptor) -> SearchResult<SearchPage> {
    response
        .search_page()
        .map_err(|e| SearchError::MalformedPage(e.to_string()))
}

impl fmt::Debug for PaginatedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedResult")
            .field("request", &self.request.action_name())
            .field("hits", &self.hits.len())
            .field("fetched", &self.fetched)
            .field("total", &self.total)
            .field("strategy", &self.strategy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::protocol::DispatchFuture;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NeverCalled {
        calls: AtomicUsize,
    }

    impl QueryDispatcher for NeverCalled {
        fn dispatch(&self, _request: RequestDescriptor, _options: QueryOptions) -> DispatchFuture<'_> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(ResponseDescriptor::ok(json!({"hits": [], "total": 0}))) })
        }

        fn connection_id(&self) -> Option<String> {
            None
        }

        fn channels(&self) -> Arc<EventBus<Value>> {
            Arc::new(EventBus::new())
        }

        fn token_expired(&self) {}
    }

    fn page(hits: Value, total: u64) -> ResponseDescriptor {
        ResponseDescriptor::ok(json!({"hits": hits, "total": total}))
    }

    fn result(request: RequestDescriptor, response: ResponseDescriptor) -> PaginatedResult {
        let dispatcher = Arc::new(NeverCalled {
            calls: AtomicUsize::new(0),
        });
        PaginatedResult::new(dispatcher, request, QueryOptions::default(), &response).unwrap()
    }

    #[test]
    fn test_strategy_priority() {
        let sorted = json!({"sort": ["price"]});
        let scroll = SearchActions::DOCUMENTS
            .search_request()
            .with_scroll("30s")
            .with_size(2)
            .with_body(sorted.clone());
        let keyset = SearchActions::DOCUMENTS.search_request().with_size(2).with_body(sorted);
        let offset = SearchActions::DOCUMENTS.search_request().with_size(2);
        let none = SearchActions::DOCUMENTS.search_request();

        let empty = page(json!([]), 5);
        assert_eq!(result(scroll, empty.clone()).strategy(), Some(Strategy::Scroll));
        assert_eq!(result(keyset, empty.clone()).strategy(), Some(Strategy::SearchAfter));
        assert_eq!(result(offset, empty.clone()).strategy(), Some(Strategy::Offset));
        assert_eq!(result(none, empty).strategy(), None);
    }

    #[tokio::test]
    async fn test_exhausted_makes_no_call() {
        let dispatcher = Arc::new(NeverCalled {
            calls: AtomicUsize::new(0),
        });
        let hits: Vec<Value> = (0..10).map(|i| json!({"_id": i.to_string()})).collect();
        let first = PaginatedResult::new(
            dispatcher.clone(),
            SearchActions::DOCUMENTS.search_request().with_size(10),
            QueryOptions::default(),
            &page(Value::Array(hits), 10),
        )
        .unwrap();

        assert_eq!(first.fetched(), 10);
        assert!(first.next().await.unwrap().is_none());
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_search_after_key_from_last_hit() {
        let request = SearchActions::DOCUMENTS
            .search_request()
            .with_size(2)
            .with_body(json!({"query": {}, "sort": [{"author.name": "asc"}, "missing.field", "_id"]}));
        let response = page(
            json!([
                {"_id": "a", "_source": {"author": {"name": "Ann"}}},
                {"_id": "b", "_source": {"author": {"name": "Bob"}}}
            ]),
            5,
        );

        let (strategy, next) = result(request, response).next_request().unwrap();
        assert_eq!(strategy, Strategy::SearchAfter);
        assert_eq!(next.body[SEARCH_AFTER_KEY], json!(["Bob", null, "b"]));
        assert_eq!(next.body["query"], json!({}));
    }

    #[test]
    fn test_search_after_rejects_empty_page_and_empty_sort() {
        let request = SearchActions::DOCUMENTS
            .search_request()
            .with_size(2)
            .with_body(json!({"sort": ["price"]}));
        let err = result(request, page(json!([]), 5)).next_request().unwrap_err();
        assert!(matches!(err, SearchError::EmptyPage { .. }));

        let request = SearchActions::DOCUMENTS
            .search_request()
            .with_size(2)
            .with_body(json!({"sort": []}));
        let err = result(request, page(json!([{"_id": "a"}]), 5))
            .next_request()
            .unwrap_err();
        assert!(matches!(err, SearchError::AmbiguousSort { .. }));
    }

    #[test]
    fn test_scroll_without_scroll_action() {
        let request = SearchActions::ROLES.search_request().with_scroll("1m");
        let response = ResponseDescriptor::ok(json!({"hits": [{"_id": "r1"}], "total": 3, "scrollId": "c1"}));

        let err = result(request, response).next_request().unwrap_err();
        assert!(matches!(err, SearchError::MissingPaginationContext { .. }));
    }

    #[test]
    fn test_explicit_actions_enable_scroll() {
        let request = SearchActions::ROLES.search_request().with_scroll("1m");
        let response = ResponseDescriptor::ok(json!({"hits": [{"_id": "r1"}], "total": 3, "scrollId": "c1"}));

        let first = result(request, response).with_actions(SearchActions::DOCUMENTS);
        let (strategy, next) = first.next_request().unwrap();
        assert_eq!(strategy, Strategy::Scroll);
        assert_eq!(next.action_name(), "document:scroll");
        assert_eq!(next.scroll_id.as_deref(), Some("c1"));

        let hits = first.into_hits();
        assert_eq!(hits[0].id, "r1");
    }

    #[test]
    fn test_offset_advances_to_fetched() {
        let request = SearchActions::DOCUMENTS.search_request().with_from(0).with_size(2);
        let response = page(json!([{"_id": "a"}, {"_id": "b"}]), 5);

        let (_, next) = result(request, response).next_request().unwrap();
        assert_eq!(next.from, Some(2));
        assert_eq!(next.size, Some(2));
    }

    #[tokio::test]
    async fn test_no_context_is_an_error() {
        let first = result(SearchActions::DOCUMENTS.search_request(), page(json!([{"_id": "a"}]), 3));
        let err = first.next().await.unwrap_err();
        assert_eq!(err.code(), "AERO_SDK_MISSING_PAGINATION_CONTEXT");
    }
}
