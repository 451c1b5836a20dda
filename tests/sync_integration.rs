//! End-to-end tests for the sync service.
//!
//! Everything runs against the mock transport and mock channel with tokio's
//! clock paused, so backoff, debounce and poll timings are exact.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use catalog_sync::adapters::{InMemoryResponseCache, MockCatalogTransport, MockChannelConnector, MockConnection};
use catalog_sync::application::{Freshness, SyncService, SyncSettings};
use catalog_sync::domain::catalog::{CatalogQuery, CatalogResponse, ResponseData, Resource};
use catalog_sync::domain::foundation::{EditionId, EntityId};
use catalog_sync::ports::TransportError;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn course(price: f64) -> CatalogResponse {
    let entity = serde_json::from_value(course_json(price)).unwrap();
    CatalogResponse::new(ResponseData::One(entity))
}

fn course_json(price: f64) -> serde_json::Value {
    json!({
        "id": "c-1",
        "slug": "example-course",
        "editions": [
            {"id": "A", "registrationDeadline": "2099-01-10", "price": price},
            {"id": "B", "registrationDeadline": "2099-01-01", "soldOut": true}
        ]
    })
}

fn listing(ids: &[&str]) -> CatalogResponse {
    let entities = ids
        .iter()
        .map(|id| serde_json::from_value(json!({"id": id, "editions": [{"id": "A"}]})).unwrap())
        .collect();
    CatalogResponse::new(ResponseData::Many(entities))
}

fn slug_query() -> CatalogQuery {
    CatalogQuery::by_slug(Resource::Courses, "example-course")
}

struct Harness {
    service: SyncService,
    transport: MockCatalogTransport,
    connector: MockChannelConnector,
    connection: MockConnection,
}

impl Harness {
    fn new(transport: MockCatalogTransport) -> Self {
        let connector = MockChannelConnector::new();
        let connection = connector.accept_next();
        let service = SyncService::with_parts(
            SyncSettings::default(),
            Arc::new(transport.clone()),
            Arc::new(InMemoryResponseCache::default()),
            Arc::new(connector.clone()),
        );
        Self {
            service,
            transport,
            connector,
            connection,
        }
    }
}

fn price_of_a(view: &catalog_sync::application::ObservedView) -> Option<f64> {
    let primary = view.snapshot.primary()?;
    primary
        .editions
        .iter()
        .find(|e| e.id == EditionId::new("A").unwrap())
        .and_then(|e| e.price)
}

// =============================================================================
// Cache Sharing
// =============================================================================

#[tokio::test(start_paused = true)]
async fn two_observers_of_the_same_slug_share_one_request() {
    let h = Harness::new(MockCatalogTransport::new().with_fallback(course(100.0)));

    let mut first = h.service.observe(slug_query());
    let first_view = first.ready().await.unwrap();
    let mut second = h.service.observe(slug_query());
    let second_view = second.ready().await.unwrap();

    assert_eq!(first_view.freshness, Freshness::Fresh);
    assert_eq!(second_view.freshness, Freshness::Cached);
    assert_eq!(h.transport.call_count(), 1);
}

// =============================================================================
// Push Events
// =============================================================================

#[tokio::test(start_paused = true)]
async fn collection_update_without_data_refetches_once() {
    let h = Harness::new(MockCatalogTransport::new().with_fallback(course(100.0)));
    let mut observation = h.service.observe(slug_query());
    observation.ready().await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert!(h.service.is_connected());

    h.connection.send_event("collection-updated", None);
    sleep(Duration::from_millis(400)).await;
    assert_eq!(h.transport.call_count(), 1);

    let view = observation.changed().await.unwrap();
    assert_eq!(view.freshness, Freshness::Fresh);
    assert_eq!(h.transport.call_count(), 2);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn burst_of_events_collapses_to_one_fetch() {
    let h = Harness::new(MockCatalogTransport::new().with_fallback(course(100.0)));
    let mut observation = h.service.observe(slug_query());
    observation.ready().await.unwrap();

    for _ in 0..10 {
        h.connection.send_event("full-resync", None);
        sleep(Duration::from_millis(100)).await;
    }
    sleep(Duration::from_secs(2)).await;

    assert_eq!(h.transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn unrelated_reference_does_not_refetch() {
    let h = Harness::new(MockCatalogTransport::new().with_fallback(course(100.0)));
    let mut observation = h.service.observe(slug_query());
    observation.ready().await.unwrap();

    h.connection.send_event("entity-updated", Some(json!("c-999")));
    sleep(Duration::from_secs(2)).await;

    assert_eq!(h.transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn inline_payload_is_applied_without_a_fetch() {
    let h = Harness::new(MockCatalogTransport::new().with_fallback(course(100.0)));
    let mut observation = h.service.observe(slug_query());
    let first = observation.ready().await.unwrap();
    assert_eq!(price_of_a(&first), Some(100.0));

    h.connection.send_event("entity-updated", Some(course_json(150.0)));
    let view = observation.changed().await.unwrap();

    assert_eq!(view.freshness, Freshness::Pushed);
    assert_eq!(price_of_a(&view), Some(150.0));
    sleep(Duration::from_secs(2)).await;
    assert_eq!(h.transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn partial_record_refetches_and_keeps_selection() {
    let h = Harness::new(
        MockCatalogTransport::new()
            .with_response(course(100.0))
            .with_fallback(course(130.0)),
    );
    let mut observation = h.service.observe(slug_query());
    observation.ready().await.unwrap();

    let entity = EntityId::new("c-1").unwrap();
    assert!(observation
        .select_edition(&entity, &EditionId::new("B").unwrap())
        .await
        .unwrap());
    observation.changed().await.unwrap();

    h.connection
        .send_event("entity-updated", Some(json!({"id": "c-1", "title": "Renamed"})));
    let view = observation.changed().await.unwrap();

    assert_eq!(h.transport.call_count(), 2);
    assert_eq!(view.freshness, Freshness::Fresh);
    let primary = view.snapshot.primary().unwrap();
    assert_eq!(primary.editions.len(), 2);
    assert_eq!(primary.entity.slug.as_deref(), Some("example-course"));
    assert_eq!(view.snapshot.selected_edition().map(|e| e.id.clone()), EditionId::new("B").ok());
    assert_eq!(price_of_a(&view), Some(130.0));
}

#[tokio::test(start_paused = true)]
async fn inline_collection_update_drops_removed_members() {
    let h = Harness::new(
        MockCatalogTransport::new()
            .with_response(listing(&["c-1", "c-2"]))
            .with_fallback(listing(&["c-1"])),
    );
    let mut observation = h.service.observe(CatalogQuery::collection(Resource::Courses));
    let first = observation.ready().await.unwrap();
    assert_eq!(first.snapshot.len(), 2);

    h.connection.send_event(
        "collection-updated",
        Some(json!([{"id": "c-1", "editions": [{"id": "A"}]}])),
    );
    let view = observation.changed().await.unwrap();

    assert_eq!(h.transport.call_count(), 2);
    assert_eq!(view.snapshot.len(), 1);
    assert_eq!(view.snapshot.primary().map(|e| e.id().as_str()), Some("c-1"));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_refetch_keeps_previous_data_as_stale() {
    let h = Harness::new(
        MockCatalogTransport::new()
            .with_response(course(100.0))
            .with_error(TransportError::network("down")),
    );
    let mut observation = h.service.observe(slug_query());
    observation.ready().await.unwrap();

    h.connection.send_event("collection-updated", None);
    let view = observation.changed().await.unwrap();

    assert_eq!(view.freshness, Freshness::Stale);
    assert_eq!(view.error, Some(TransportError::network("down")));
    assert_eq!(price_of_a(&view), Some(100.0));
}

#[tokio::test(start_paused = true)]
async fn stopped_observation_ignores_events() {
    let h = Harness::new(MockCatalogTransport::new().with_fallback(course(100.0)));
    let mut observation = h.service.observe(slug_query());
    observation.ready().await.unwrap();

    observation.stop();
    h.connection.send_event("collection-updated", None);
    sleep(Duration::from_secs(2)).await;

    assert_eq!(h.transport.call_count(), 1);
}

// =============================================================================
// Fallback Polling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn polling_covers_a_dropped_channel_until_reconnect() {
    let h = Harness::new(MockCatalogTransport::new().with_fallback(course(100.0)));
    let mut observation = h.service.observe(slug_query());
    observation.ready().await.unwrap();
    sleep(Duration::from_millis(10)).await;
    assert!(h.service.is_connected());
    assert!(!h.service.is_polling());

    h.connection.close();
    sleep(Duration::from_secs(6)).await;
    assert!(!h.service.is_connected());
    assert!(h.service.is_polling());
    assert_eq!(h.transport.call_count(), 1);

    // First poll lands one interval after polling started.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.transport.call_count(), 2);

    let _connection = h.connector.accept_next();
    h.service.reconnect();
    sleep(Duration::from_millis(10)).await;
    assert!(h.service.is_connected());

    sleep(Duration::from_secs(6)).await;
    assert!(!h.service.is_polling());
    sleep(Duration::from_secs(120)).await;
    assert_eq!(h.transport.call_count(), 2);

    h.service.shutdown().await;
}
