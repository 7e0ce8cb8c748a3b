//! Pagination Strategy Tests
//!
//! Scroll, keyset and offset continuation driven through a scripted
//! dispatcher, plus the error paths that must never loop.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use aerodb_sdk::protocol::{QueryDispatcher, QueryOptions, RequestDescriptor, ResponseDescriptor};
use aerodb_sdk::search::{PaginatedResult, SearchActions, SearchError, Strategy, SEARCH_AFTER_KEY};

use common::{hits, page, scroll_page, ScriptedDispatcher};

fn first_page(
    dispatcher: &Arc<ScriptedDispatcher>,
    request: RequestDescriptor,
    result: serde_json::Value,
) -> PaginatedResult {
    let dispatcher: Arc<dyn QueryDispatcher> = dispatcher.clone();
    PaginatedResult::new(dispatcher, request, QueryOptions::default(), &ResponseDescriptor::ok(result))
        .unwrap()
}

// =============================================================================
// EXHAUSTION
// =============================================================================

#[tokio::test]
async fn test_fetched_equals_total_returns_none_without_dispatch() {
    let dispatcher = ScriptedDispatcher::new("me");
    let request = SearchActions::DOCUMENTS.search_request().with_size(10).with_scroll("30s");
    let result = first_page(&dispatcher, request, scroll_page(hits("d", 0..10), 10, "c1"));

    assert_eq!(result.fetched(), 10);
    assert_eq!(result.total(), 10);
    assert!(result.next().await.unwrap().is_none());
    assert_eq!(dispatcher.dispatch_count(), 0);
}

// =============================================================================
// SCROLL
// =============================================================================

#[tokio::test]
async fn test_scroll_chain_sums_to_total() {
    let dispatcher = ScriptedDispatcher::new("me");
    dispatcher
        .respond(scroll_page(hits("d", 4..8), 10, "c2"))
        .respond(scroll_page(hits("d", 8..10), 10, "c3"));

    let request = SearchActions::DOCUMENTS
        .search_request()
        .with_index("shop")
        .with_collection("orders")
        .with_size(4)
        .with_scroll("30s");
    let mut current = first_page(&dispatcher, request, scroll_page(hits("d", 0..4), 10, "c1"));
    assert_eq!(current.strategy(), Some(Strategy::Scroll));

    let mut seen = current.hits().len() as u64;
    let mut fetched = vec![current.fetched()];
    while let Some(next) = current.next().await.unwrap() {
        seen += next.hits().len() as u64;
        fetched.push(next.fetched());
        current = next;
    }

    assert_eq!(seen, 10);
    assert_eq!(fetched, vec![4, 8, 10]);

    let sent = dispatcher.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].action_name(), "document:scroll");
    assert_eq!(sent[0].scroll.as_deref(), Some("30s"));
    assert_eq!(sent[0].scroll_id.as_deref(), Some("c1"));
    assert_eq!(sent[1].scroll_id.as_deref(), Some("c2"));
}

#[tokio::test]
async fn test_scroll_for_family_without_scroll_action() {
    let dispatcher = ScriptedDispatcher::new("me");
    let request = SearchActions::ROLES.search_request().with_size(2).with_scroll("1m");
    let result = first_page(&dispatcher, request, scroll_page(hits("role", 0..2), 5, "c1"));

    let err = result.next().await.unwrap_err();
    assert!(matches!(err, SearchError::MissingPaginationContext { .. }));
    assert_eq!(dispatcher.dispatch_count(), 0);
}

#[tokio::test]
async fn test_user_scroll_uses_family_scroll_action() {
    let dispatcher = ScriptedDispatcher::new("me");
    dispatcher.respond(scroll_page(hits("u", 1..2), 2, "c2"));

    let request = SearchActions::USERS.search_request().with_size(1).with_scroll("10s");
    let result = first_page(&dispatcher, request, scroll_page(hits("u", 0..1), 2, "c1"));

    let next = result.next().await.unwrap().unwrap();
    assert_eq!(next.fetched(), 2);
    assert_eq!(dispatcher.sent()[0].action_name(), "security:scrollUsers");
}

// =============================================================================
// KEYSET (SEARCH_AFTER)
// =============================================================================

#[tokio::test]
async fn test_keyset_advances_without_repeating_hits() {
    let dispatcher = ScriptedDispatcher::new("me");
    dispatcher
        .respond(page(hits("d", 3..6), 8))
        .respond(page(hits("d", 6..8), 8));

    let request = SearchActions::DOCUMENTS
        .search_request()
        .with_size(3)
        .with_body(json!({"query": {"match_all": {}}, "sort": [{"rank": "asc"}, "_id"]}));
    let mut current = first_page(&dispatcher, request, page(hits("d", 0..3), 8));
    assert_eq!(current.strategy(), Some(Strategy::SearchAfter));

    let mut ids: HashSet<String> = current.hits().iter().map(|h| h.id.clone()).collect();
    while let Some(next) = current.next().await.unwrap() {
        for hit in next.hits() {
            assert!(ids.insert(hit.id.clone()), "hit {} repeated", hit.id);
        }
        current = next;
    }
    assert_eq!(ids.len(), 8);

    let sent = dispatcher.sent();
    assert_eq!(sent[0].body[SEARCH_AFTER_KEY], json!([2, "d-2"]));
    assert_eq!(sent[1].body[SEARCH_AFTER_KEY], json!([5, "d-5"]));
    assert_eq!(sent[1].body["query"], json!({"match_all": {}}));
    assert_eq!(sent[1].action_name(), "document:search");
}

#[tokio::test]
async fn test_keyset_empty_page_rejects() {
    let dispatcher = ScriptedDispatcher::new("me");
    dispatcher.respond(page(json!([]), 10));

    let request = SearchActions::DOCUMENTS
        .search_request()
        .with_size(5)
        .with_body(json!({"sort": {"rank": "desc"}}));
    let first = first_page(&dispatcher, request, page(hits("d", 0..5), 10));

    let second = first.next().await.unwrap().unwrap();
    assert_eq!(second.fetched(), 5);

    let err = second.next().await.unwrap_err();
    assert!(matches!(err, SearchError::EmptyPage { .. }));
    assert!(err.to_string().contains("document:search"));
    assert_eq!(dispatcher.dispatch_count(), 1);
}

#[tokio::test]
async fn test_keyset_ambiguous_sort_rejects() {
    let dispatcher = ScriptedDispatcher::new("me");
    let request = SearchActions::DOCUMENTS
        .search_request()
        .with_size(5)
        .with_body(json!({"sort": [{"rank": "asc", "name": "desc"}]}));
    let first = first_page(&dispatcher, request, page(hits("d", 0..5), 10));

    let err = first.next().await.unwrap_err();
    assert_eq!(err.code(), "AERO_SDK_AMBIGUOUS_SORT");
    assert_eq!(dispatcher.dispatch_count(), 0);
}

// =============================================================================
// OFFSET
// =============================================================================

#[tokio::test]
async fn test_offset_advances_from_by_fetched() {
    let dispatcher = ScriptedDispatcher::new("me");
    dispatcher
        .respond(page(hits("d", 4..8), 9))
        .respond(page(hits("d", 8..9), 9));

    let request = SearchActions::DOCUMENTS.search_request().with_from(0).with_size(4);
    let mut current = first_page(&dispatcher, request, page(hits("d", 0..4), 9));
    assert_eq!(current.strategy(), Some(Strategy::Offset));

    while let Some(next) = current.next().await.unwrap() {
        current = next;
    }
    assert_eq!(current.fetched(), 9);

    let froms: Vec<Option<u64>> = dispatcher.sent().iter().map(|r| r.from).collect();
    assert_eq!(froms, vec![Some(4), Some(8)]);
}

#[tokio::test]
async fn test_offset_starting_past_total_stops() {
    let dispatcher = ScriptedDispatcher::new("me");
    dispatcher.respond(page(hits("d", 0..5), 10));

    let request = SearchActions::DOCUMENTS.search_request().with_from(20).with_size(5);
    let first = first_page(&dispatcher, request, page(hits("d", 0..0), 10));

    assert!(first.is_exhausted());
    assert!(first.next().await.unwrap().is_none());
    assert_eq!(dispatcher.dispatch_count(), 0);
}

#[tokio::test]
async fn test_offset_starting_at_total_stops() {
    let dispatcher = ScriptedDispatcher::new("me");

    let request = SearchActions::DOCUMENTS.search_request().with_from(10).with_size(5);
    let first = first_page(&dispatcher, request, page(hits("d", 0..0), 10));

    assert!(first.next().await.unwrap().is_none());
    assert_eq!(dispatcher.dispatch_count(), 0);
}

#[tokio::test]
async fn test_missing_context_rejects() {
    let dispatcher = ScriptedDispatcher::new("me");
    let request = SearchActions::DOCUMENTS.search_request().with_body(json!({"query": {}}));
    let first = first_page(&dispatcher, request, page(hits("d", 0..3), 9));

    let err = first.next().await.unwrap_err();
    assert!(matches!(err, SearchError::MissingPaginationContext { .. }));
}

#[tokio::test]
async fn test_dispatch_failure_propagates() {
    let dispatcher = ScriptedDispatcher::new("me");
    dispatcher.fail(aerodb_sdk::request::RequestError::ConnectionClosed);

    let request = SearchActions::DOCUMENTS.search_request().with_size(3);
    let first = first_page(&dispatcher, request, page(hits("d", 0..3), 9));

    let err = first.next().await.unwrap_err();
    assert_eq!(err.code(), "AERO_SDK_CONNECTION_CLOSED");
}
