//! Integration tests for the sync orchestrators against a mock store.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tomo_core::{Book, Coupon, Customer, Order, OrderLine, Platform, TaxonomyKind, TaxonomyTerm};
use tomo_sync::{
    EntityStore, InboundSync, MemoryStore, OutboundSync, ReconcileOptions, SaveMode, SyncError,
    SyncOutcome, TermReconciler,
};
use tomo_woo::{RateLimitConfig, RetryPolicy, WooClient, WooClientSet, WooConfig};

// =============================================================================
// Test Helpers
// =============================================================================

async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

fn client_set(base_url: &str) -> WooClientSet {
    let config = WooConfig::new(base_url, "ck_test", "cs_test")
        .with_rate_limit(RateLimitConfig::disabled())
        .with_retry(RetryPolicy::disabled());
    let client = WooClient::new(Platform::Es, config).unwrap();
    WooClientSet::from_clients(vec![client])
}

fn empty_client_set() -> WooClientSet {
    WooClientSet::from_clients(Vec::new())
}

fn eligible_book(title: &str, isbn: &str) -> Book {
    let mut book = Book::new(title);
    book.isbn = Some(isbn.to_string());
    book.channels = vec![Platform::Es];
    book
}

// =============================================================================
// Outbound: books
// =============================================================================

#[tokio::test]
async fn test_sync_book_creates_then_updates() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let book = eligible_book("El Quijote", "9788412345678");
    store.create_book(&book, SaveMode::Normal).await.unwrap();

    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 501})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/products/501"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 501})))
        .expect(1)
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);

    let first = outbound.sync_book(book.id, Platform::Es).await.unwrap();
    assert_eq!(first, SyncOutcome::Created { external_id: 501 });

    let second = outbound.sync_book(book.id, Platform::Es).await.unwrap();
    assert_eq!(second, SyncOutcome::Updated { external_id: 501 });

    // The id persist must carry the skip-sync marker.
    let writes = store.writes_for("book").await;
    let skip_writes: Vec<_> = writes.iter().filter(|w| w.mode == SaveMode::SkipSync).collect();
    assert_eq!(skip_writes.len(), 1);

    let stored = store.get_book(book.id).await.unwrap().unwrap();
    assert_eq!(stored.external_ids.get(Platform::Es), Some(501));
    assert_eq!(stored.woo_id, Some(501));
}

#[tokio::test]
async fn test_sync_book_channel_gating() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let mut book = Book::new("Solo interno");
    book.channels = vec![Platform::Mx];
    store.create_book(&book, SaveMode::Normal).await.unwrap();

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);
    let outcome = outbound.sync_book(book.id, Platform::Es).await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Skipped { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_book_unconfigured_platform_skips() {
    let store = MemoryStore::new();
    let book = eligible_book("X", "9788412345678");
    store.create_book(&book, SaveMode::Normal).await.unwrap();

    let clients = empty_client_set();
    let outbound = OutboundSync::new(&store, &clients);
    let outcome = outbound.sync_book(book.id, Platform::Es).await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Skipped { .. }));
}

#[tokio::test]
async fn test_sync_book_read_repair_after_external_delete() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let mut book = eligible_book("Rayuela", "9788437604572");
    book.record_external_id(Platform::Es, 99);
    store.create_book(&book, SaveMode::Normal).await.unwrap();

    Mock::given(method("PUT"))
        .and(path("/products/99"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 100})))
        .expect(1)
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);
    let outcome = outbound.sync_book(book.id, Platform::Es).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Created { external_id: 100 });

    let stored = store.get_book(book.id).await.unwrap().unwrap();
    assert_eq!(stored.external_ids.get(Platform::Es), Some(100));
}

#[tokio::test]
async fn test_sync_book_resolves_author_attribute() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();

    let author = TaxonomyTerm::new(TaxonomyKind::Author, "Julio Cortázar");
    store.create_term(&author, SaveMode::Normal).await.unwrap();
    let mut book = eligible_book("Rayuela", "9788437604572");
    book.author = Some(author.id);
    store.create_book(&book, SaveMode::Normal).await.unwrap();

    // Attribute lookup finds "Autor" already defined.
    Mock::given(method("GET"))
        .and(path("/products/attributes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 4, "name": "Autor", "slug": "autor", "type": "select"}
        ])))
        .mount(&server)
        .await;
    // No term matches the stable slug; the scan finds nothing; create.
    Mock::given(method("GET"))
        .and(path("/products/attributes/4/terms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/products/attributes/4/terms"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 88, "name": "Julio Cortázar"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 700})))
        .expect(1)
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);
    let outcome = outbound.sync_book(book.id, Platform::Es).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Created { external_id: 700 });

    // The resolved term id is persisted on the term with skip-sync.
    let stored_term = store.get_term(author.id).await.unwrap().unwrap();
    assert_eq!(stored_term.external_ids.get(Platform::Es), Some(88));
    let term_writes = store.writes_for("term").await;
    assert!(term_writes.iter().any(|w| w.mode == SaveMode::SkipSync));
}

// =============================================================================
// Outbound: orders
// =============================================================================

#[tokio::test]
async fn test_sync_order_cascades_unsynced_product() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();

    let book = eligible_book("Ficciones", "9788420633138");
    store.create_book(&book, SaveMode::Normal).await.unwrap();

    let mut order = Order::new("TOMO-2001", "paid");
    order.lines = vec![OrderLine {
        book: Some(book.id),
        external_product_id: None,
        sku: Some("9788420633138".to_string()),
        name: "Ficciones".to_string(),
        quantity: 1,
        unit_price: 15.0,
        total: 15.0,
    }];
    order.totals.total = 15.0;
    store.create_order(&order, SaveMode::Normal).await.unwrap();

    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 310})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 900})))
        .expect(1)
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);
    let outcome = outbound.sync_order(order.id, Platform::Es).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Created { external_id: 900 });

    // The cascade persisted the product id too.
    let stored_book = store.get_book(book.id).await.unwrap().unwrap();
    assert_eq!(stored_book.external_ids.get(Platform::Es), Some(310));
}

#[tokio::test]
async fn test_sync_order_rejects_when_no_line_resolves() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();

    let mut order = Order::new("TOMO-2002", "pending");
    order.lines = vec![OrderLine {
        book: None,
        external_product_id: None,
        sku: None,
        name: "Misterio".to_string(),
        quantity: 1,
        unit_price: 5.0,
        total: 5.0,
    }];
    store.create_order(&order, SaveMode::Normal).await.unwrap();

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);
    let err = outbound.sync_order(order.id, Platform::Es).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation { .. }));
    // No order call was issued.
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_order_requires_number() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let order = Order::new("  ", "pending");
    store.create_order(&order, SaveMode::Normal).await.unwrap();

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);
    let err = outbound.sync_order(order.id, Platform::Es).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation { .. }));
}

// =============================================================================
// Outbound: customers, coupons, deletes
// =============================================================================

#[tokio::test]
async fn test_sync_customer_adopts_existing_store_account() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let customer = Customer::new("ana@example.com");
    store.create_customer(&customer, SaveMode::Normal).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/customers"))
        .and(query_param("email", "ana@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 61, "email": "ana@example.com"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/customers/61"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 61})))
        .expect(1)
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);
    let outcome = outbound.sync_customer(customer.id, Platform::Es).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Created { external_id: 61 });
}

#[tokio::test]
async fn test_sync_coupon_drops_unsynced_scoped_books() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();

    let mut synced = eligible_book("A", "9788400000001");
    synced.record_external_id(Platform::Es, 11);
    store.create_book(&synced, SaveMode::Normal).await.unwrap();
    let unsynced = eligible_book("B", "9788400000002");
    store.create_book(&unsynced, SaveMode::Normal).await.unwrap();

    let mut coupon = Coupon::new("VERANO10", "porcentaje", 10.0);
    coupon.product_ids = vec![synced.id, unsynced.id];
    store.create_coupon(&coupon, SaveMode::Normal).await.unwrap();

    Mock::given(method("POST"))
        .and(path("/coupons"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 44})))
        .expect(1)
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);
    let outcome = outbound.sync_coupon(coupon.id, Platform::Es).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Created { external_id: 44 });

    let sent = &server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(body["product_ids"], json!([11]));
    assert_eq!(body["discount_type"], json!("percent"));
}

#[tokio::test]
async fn test_delete_book_clears_external_id() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let mut book = eligible_book("Borrado", "9788400000003");
    book.record_external_id(Platform::Es, 77);
    store.create_book(&book, SaveMode::Normal).await.unwrap();

    // Already gone on the store side; delete still succeeds.
    Mock::given(method("DELETE"))
        .and(path("/products/77"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let outbound = OutboundSync::new(&store, &clients);
    outbound.delete_book(book.id, Platform::Es).await.unwrap();

    let stored = store.get_book(book.id).await.unwrap().unwrap();
    assert_eq!(stored.external_ids.get(Platform::Es), None);
    assert_eq!(stored.woo_id, None);
}

// =============================================================================
// Inbound
// =============================================================================

#[tokio::test]
async fn test_ingest_product_creates_book_and_terms() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let clients = client_set(&server.uri());
    let inbound = InboundSync::new(&store, &clients);

    let payload: tomo_woo::WooProduct = serde_json::from_value(json!({
        "id": 501,
        "name": "Cien años de soledad",
        "sku": "9788497592208",
        "description": "<p>Obra maestra.</p>",
        "regular_price": "21.90",
        "stock_status": "instock",
        "attributes": [
            {"name": "Autor", "options": ["Gabriel García Márquez"]},
            {"name": "Editorial", "options": ["Sudamericana"]}
        ],
        "meta_data": [{"key": "_isbn", "value": "9788497592208"}]
    }))
    .unwrap();

    let book = inbound.ingest_product(Platform::Es, &payload).await.unwrap();
    assert_eq!(book.title, "Cien años de soledad");
    assert_eq!(book.isbn.as_deref(), Some("9788497592208"));
    assert_eq!(book.external_ids.get(Platform::Es), Some(501));
    assert!(book.author.is_some());
    assert!(book.publisher.is_some());
    assert!(book.raw.is_some());

    // Ingest writes are skip-sync so they do not echo outbound.
    let writes = store.writes_for("book").await;
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].mode, SaveMode::SkipSync);

    // The created author got a split name.
    let author = store
        .get_term(book.author.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(author.first_name.as_deref(), Some("Gabriel"));
    assert_eq!(author.last_name.as_deref(), Some("García"));
    assert_eq!(author.second_last_name.as_deref(), Some("Márquez"));

    // A second ingest upserts the same record.
    inbound.ingest_product(Platform::Es, &payload).await.unwrap();
    assert_eq!(store.writes_for("book").await.len(), 2);
}

#[tokio::test]
async fn test_ingest_from_unconfigured_platform_rejected() {
    let store = MemoryStore::new();
    let clients = empty_client_set();
    let inbound = InboundSync::new(&store, &clients);

    let payload = tomo_woo::WooProduct::default();
    let err = inbound.ingest_product(Platform::Es, &payload).await.unwrap_err();
    assert!(matches!(err, SyncError::Configuration { .. }));
}

#[tokio::test]
async fn test_ingest_order_creates_customer_and_person() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let clients = client_set(&server.uri());
    let inbound = InboundSync::new(&store, &clients);

    let mut book = Book::new("Ficciones");
    book.isbn = Some("9788420633138".to_string());
    book.record_external_id(Platform::Es, 310);
    store.create_book(&book, SaveMode::Normal).await.unwrap();

    let payload: tomo_woo::WooOrder = serde_json::from_value(json!({
        "id": 900,
        "number": "900",
        "status": "processing",
        "total": "15.00",
        "billing": {
            "firstName": "Ana",
            "lastName": "Pérez",
            "email": "ana@example.com"
        },
        "line_items": [
            {"product_id": 310, "name": "Ficciones", "quantity": 1, "total": "15.00"}
        ]
    }))
    .unwrap();

    let order = inbound.ingest_order(Platform::Es, &payload).await.unwrap();
    assert_eq!(order.number, "900");
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].book, Some(book.id));
    assert_eq!(order.totals.total, 15.0);

    // Opportunistic customer and person creation from the billing block.
    let customer = store
        .get_customer(order.customer.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.email, "ana@example.com");
    let person = store
        .get_person(customer.person.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(person.full_name, "Ana Pérez");
}

#[tokio::test]
async fn test_ingest_order_without_number_rejected() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let clients = client_set(&server.uri());
    let inbound = InboundSync::new(&store, &clients);

    let payload = tomo_woo::WooOrder {
        id: Some(1),
        ..Default::default()
    };
    let err = inbound.ingest_order(Platform::Es, &payload).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation { .. }));
}

#[tokio::test]
async fn test_pull_products_survives_bad_items() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();
    let clients = client_set(&server.uri());
    let inbound = InboundSync::new(&store, &clients);

    // Second product has no id and fails validation; the sweep continues.
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Uno", "sku": "9788400000001"},
            {"name": "Sin id"},
            {"id": 3, "name": "Tres", "sku": "9788400000003"}
        ])))
        .mount(&server)
        .await;

    let summary = inbound.pull_products(Platform::Es).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
async fn test_reconcile_dry_run_classifies_without_writes() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();

    let term = TaxonomyTerm::new(TaxonomyKind::Tag, "novedad");
    store.create_term(&term, SaveMode::Normal).await.unwrap();

    // The store has one extra tag and lacks the internal one.
    Mock::given(method("GET"))
        .and(path("/products/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "name": "oferta", "slug": "oferta"}
        ])))
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let reconciler = TermReconciler::new(&store, &clients);
    let options = ReconcileOptions {
        kinds: vec![TaxonomyKind::Tag],
        dry_run: true,
        ..Default::default()
    };
    let summary = reconciler.sync_all_terms(&options).await.unwrap();
    assert_eq!(summary.outbound.created, 1);
    assert_eq!(summary.inbound.created, 1);
    assert!(summary.errors.is_empty());

    // Dry run never writes: only the seed write exists and no POSTs went out.
    assert_eq!(store.write_log().await.len(), 1);
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.to_string() == "GET"));
}

#[tokio::test]
async fn test_reconcile_adopts_store_only_tag() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();

    Mock::given(method("GET"))
        .and(path("/products/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "name": "oferta", "slug": "oferta"}
        ])))
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let reconciler = TermReconciler::new(&store, &clients);
    let options = ReconcileOptions {
        kinds: vec![TaxonomyKind::Tag],
        ..Default::default()
    };
    let summary = reconciler.sync_all_terms(&options).await.unwrap();
    assert_eq!(summary.inbound.created, 1);

    let tags = store.list_terms(TaxonomyKind::Tag).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "oferta");
    assert_eq!(tags[0].external_ids.get(Platform::Es), Some(9));
}

#[tokio::test]
async fn test_reconcile_failed_push_counts_errored_not_created() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();

    let term = TaxonomyTerm::new(TaxonomyKind::Tag, "novedad");
    store.create_term(&term, SaveMode::Normal).await.unwrap();

    Mock::given(method("GET"))
        .and(path("/products/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/products/tags"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let reconciler = TermReconciler::new(&store, &clients);
    let options = ReconcileOptions {
        kinds: vec![TaxonomyKind::Tag],
        ..Default::default()
    };
    let summary = reconciler.sync_all_terms(&options).await.unwrap();

    // A term whose push fails is errored, never also counted as created.
    assert_eq!(summary.outbound.created, 0);
    assert_eq!(summary.outbound.errored, 1);
    assert_eq!(summary.errors.len(), 1);
}

#[tokio::test]
async fn test_reconcile_matching_content_skips() {
    let server = setup_mock_server().await;
    let store = MemoryStore::new();

    let term = TaxonomyTerm::new(TaxonomyKind::Tag, "novedad");
    store.create_term(&term, SaveMode::Normal).await.unwrap();

    let stable = term.stable_id();
    let slug = &stable[..28];
    Mock::given(method("GET"))
        .and(path("/products/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "name": "novedad", "slug": slug}
        ])))
        .mount(&server)
        .await;

    let clients = client_set(&server.uri());
    let reconciler = TermReconciler::new(&store, &clients);
    let options = ReconcileOptions {
        kinds: vec![TaxonomyKind::Tag],
        ..Default::default()
    };
    let summary = reconciler.sync_all_terms(&options).await.unwrap();
    assert_eq!(summary.outbound.skipped, 1);
    assert_eq!(summary.changes(), 0);

    // Matching still back-fills the external id mapping.
    let stored = store.list_terms(TaxonomyKind::Tag).await.unwrap();
    assert_eq!(stored[0].external_ids.get(Platform::Es), Some(5));
}
