use anyhow::Result;
use enrollment_sync::domain::model::QueryParams;
use enrollment_sync::{
    ApiClient, EventBus, NoticeKind, QueryFailure, QueryOutcome, QuerySnapshot,
    ResourceQueryController,
};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::watch;

const FORMATIONS_PATH: &str = "/api/formations";
const DEBOUNCE: Duration = Duration::from_millis(100);

fn formation(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "Hands-on course",
        "date": "2026-11-02",
        "location": "Lyon",
        "duration": "3 days",
        "instructor": "C. Ferris",
        "price": 1200,
        "seats": 12,
        "level": "intermediate"
    })
}

fn page(items: Vec<Value>, total: u64, limit: u64, offset: u64) -> Value {
    json!({
        "items": items,
        "pagination": { "total": total, "limit": limit, "offset": offset, "pages": 0 }
    })
}

fn controller(server: &MockServer, limit: u64) -> ResourceQueryController {
    let client = ApiClient::new(&server.base_url()).unwrap();
    ResourceQueryController::new(client, limit, DEBOUNCE, EventBus::default())
}

async fn settled(
    rx: &mut watch::Receiver<QuerySnapshot>,
    predicate: impl FnMut(&QuerySnapshot) -> bool,
) -> Result<QuerySnapshot> {
    let snapshot = tokio::time::timeout(Duration::from_secs(3), rx.wait_for(predicate))
        .await??
        .clone();
    Ok(snapshot)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rapid_search_terms_collapse_into_one_request() -> Result<()> {
    let server = MockServer::start_async().await;
    let mut mocks = Vec::new();
    for term in ["a", "ab", "abc"] {
        mocks.push(
            server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path(FORMATIONS_PATH)
                        .query_param("search", term);
                    then.status(200)
                        .json_body(page(vec![formation(1, term)], 1, 10, 0));
                })
                .await,
        );
    }

    let controller = controller(&server, 10);
    let mut rx = controller.subscribe();

    controller.set_search_term("a");
    controller.set_search_term("ab");
    controller.set_search_term("abc");

    let snapshot = settled(&mut rx, |s| !s.loading && !s.items.is_empty()).await?;
    tokio::time::sleep(DEBOUNCE * 3).await;

    mocks[0].assert_hits_async(0).await;
    mocks[1].assert_hits_async(0).await;
    mocks[2].assert_hits_async(1).await;
    assert_eq!(snapshot.items[0].title, "abc");
    assert_eq!(snapshot.params.search.as_deref(), Some("abc"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_term_is_not_applied_before_quiescence() -> Result<()> {
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET).path(FORMATIONS_PATH);
            then.status(200).json_body(page(vec![], 0, 10, 0));
        })
        .await;

    let controller = controller(&server, 10);
    controller.set_search_term("rust");
    tokio::time::sleep(DEBOUNCE / 2).await;

    search.assert_hits_async(0).await;
    assert_eq!(controller.params().search, None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_go_to_page_requests_offset() -> Result<()> {
    let server = MockServer::start_async().await;
    let second_page = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(FORMATIONS_PATH)
                .query_param("limit", "10")
                .query_param("offset", "10");
            then.status(200)
                .json_body(page(vec![formation(11, "Eleventh")], 95, 10, 10));
        })
        .await;

    let controller = controller(&server, 10);
    assert!(controller.go_to_page(1).is_none());

    let handle = controller.go_to_page(2).expect("page 2 differs from page 1");
    assert_eq!(handle.outcome().await, QueryOutcome::Loaded { items: 1 });
    second_page.assert_hits_async(1).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.pagination.total, 95);
    assert_eq!(snapshot.pagination.pages, 10);
    assert_eq!(snapshot.pagination.current_page(), 2);
    assert!(snapshot.error.is_none());

    assert!(controller.go_to_page(2).is_none());
    second_page.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_filters_are_sent_as_query_parameters() -> Result<()> {
    let server = MockServer::start_async().await;
    let filtered = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(FORMATIONS_PATH)
                .query_param("level", "advanced")
                .query_param("location", "Paris")
                .query_param("offset", "0");
            then.status(200)
                .json_body(page(vec![formation(7, "Async Rust")], 1, 10, 0));
        })
        .await;

    let controller = controller(&server, 10);
    let params = QueryParams {
        level: Some("advanced".to_string()),
        location: Some("Paris".to_string()),
        ..QueryParams::new(10)
    };

    let handle = controller.replace_params(params).expect("params changed");
    assert_eq!(handle.outcome().await, QueryOutcome::Loaded { items: 1 });
    filtered.assert_hits_async(1).await;
    assert_eq!(controller.snapshot().items[0].id, "7");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_superseded_query_never_updates_results() -> Result<()> {
    let server = MockServer::start_async().await;
    let slow = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(FORMATIONS_PATH)
                .query_param("level", "beginner");
            then.status(200)
                .delay(Duration::from_millis(400))
                .json_body(page(vec![formation(1, "Stale")], 1, 10, 0));
        })
        .await;
    let fast = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(FORMATIONS_PATH)
                .query_param("level", "expert");
            then.status(200)
                .json_body(page(vec![formation(2, "Fresh")], 1, 10, 0));
        })
        .await;

    let controller = controller(&server, 10);

    let stale = controller
        .set_level(Some("beginner".to_string()))
        .expect("level changed");
    // let the slow request reach the server before superseding it
    tokio::time::sleep(Duration::from_millis(100)).await;
    let fresh = controller
        .set_level(Some("expert".to_string()))
        .expect("level changed");

    assert!(stale.is_cancelled());
    assert_eq!(fresh.outcome().await, QueryOutcome::Loaded { items: 1 });
    assert_eq!(stale.outcome().await, QueryOutcome::Cancelled);

    // outlive the slow response
    tokio::time::sleep(Duration::from_millis(500)).await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].title, "Fresh");
    assert!(snapshot.error.is_none());
    assert!(!snapshot.loading);
    fast.assert_hits_async(1).await;
    assert!(slow.hits_async().await <= 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancellation_surfaces_no_error_notice() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(FORMATIONS_PATH);
            then.status(200)
                .delay(Duration::from_millis(100))
                .json_body(page(vec![formation(1, "Only")], 1, 10, 0));
        })
        .await;

    let events = EventBus::default();
    let mut notices = events.subscribe();
    let client = ApiClient::new(&server.base_url())?;
    let controller = ResourceQueryController::new(client, 10, DEBOUNCE, events);

    let first = controller.refetch().expect("refetch always issues");
    let second = controller.refetch().expect("refetch always issues");
    assert_eq!(first.outcome().await, QueryOutcome::Cancelled);
    assert_eq!(second.outcome().await, QueryOutcome::Loaded { items: 1 });

    assert!(notices.try_recv().is_err());
    assert!(controller.snapshot().error.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_error_is_surfaced_once_and_clears_results() -> Result<()> {
    let server = MockServer::start_async().await;
    let ok = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(FORMATIONS_PATH)
                .query_param("offset", "0");
            then.status(200)
                .json_body(page(vec![formation(1, "First")], 20, 10, 0));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(FORMATIONS_PATH)
                .query_param("offset", "10");
            then.status(500)
                .json_body(json!({ "message": "Catalogue unavailable" }));
        })
        .await;

    let events = EventBus::default();
    let mut notices = events.subscribe();
    let client = ApiClient::new(&server.base_url())?;
    let controller = ResourceQueryController::new(client, 10, DEBOUNCE, events);

    let first = controller.refetch().expect("refetch always issues");
    assert_eq!(first.outcome().await, QueryOutcome::Loaded { items: 1 });
    ok.assert_hits_async(1).await;

    let failing = controller.go_to_page(2).expect("page changed");
    assert_eq!(
        failing.outcome().await,
        QueryOutcome::Failed(QueryFailure::Server {
            status: 500,
            message: "Catalogue unavailable".to_string()
        })
    );

    let snapshot = controller.snapshot();
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.error.as_deref(), Some("Catalogue unavailable"));
    assert!(!snapshot.loading);

    let notice = notices.recv().await?;
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notices.try_recv().is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_response_is_classified() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(FORMATIONS_PATH);
            then.status(200).body("<html>not json</html>");
        })
        .await;

    let controller = controller(&server, 10);
    let outcome = controller.refetch().expect("refetch always issues").outcome().await;

    assert!(matches!(
        outcome,
        QueryOutcome::Failed(QueryFailure::MalformedResponse(_))
    ));
    assert_eq!(
        controller.snapshot().error.as_deref(),
        Some("The server sent an unexpected response.")
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_server_is_a_network_failure() -> Result<()> {
    let client = ApiClient::new("http://127.0.0.1:1")?;
    let controller = ResourceQueryController::new(client, 10, DEBOUNCE, EventBus::default());

    let outcome = controller.refetch().expect("refetch always issues").outcome().await;

    assert!(matches!(
        outcome,
        QueryOutcome::Failed(QueryFailure::Network(_))
    ));
    assert!(controller.snapshot().error.is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refetch_reissues_same_query() -> Result<()> {
    let server = MockServer::start_async().await;
    let catalogue = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(FORMATIONS_PATH)
                .query_param("limit", "5")
                .query_param("offset", "0");
            then.status(200)
                .json_body(page(vec![formation(1, "One")], 1, 5, 0));
        })
        .await;

    let controller = controller(&server, 5);
    for _ in 0..2 {
        let handle = controller.refetch().expect("refetch always issues");
        assert_eq!(handle.outcome().await, QueryOutcome::Loaded { items: 1 });
    }

    catalogue.assert_hits_async(2).await;
    assert_eq!(controller.params().offset, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disposal_drops_late_response() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(FORMATIONS_PATH);
            then.status(200)
                .delay(Duration::from_millis(200))
                .json_body(page(vec![formation(1, "Too late")], 1, 10, 0));
        })
        .await;

    let controller = controller(&server, 10);
    let rx = controller.subscribe();
    let handle = controller.refetch().expect("refetch always issues");

    drop(controller);

    assert_eq!(handle.outcome().await, QueryOutcome::Cancelled);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.borrow().items.is_empty());
    Ok(())
}
