//! Integration test support for Shopfront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! Each test starts a [`StubBackend`]: an `axum` server on an ephemeral
//! localhost port that speaks the storefront REST API, keeps a mutable cart,
//! and records every request it receives. No external services are needed.
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart loading, identity, mutations and policies
//! - `checkout_flow` - Address loading and order placement
//! - `catalog` - Product pages, caching and fallback

#![allow(clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use shopfront_client::{ApiClient, ClientConfig};
use tokio::task::JoinHandle;

/// Cart ID the stub reports. Sent as a JSON number.
pub const STUB_CART_ID: i64 = 55;

/// Order ID the stub assigns. Sent as a JSON number.
pub const STUB_ORDER_ID: i64 = 1001;

// ============================================================================
// Scenario
// ============================================================================

/// A line in the stub's server-side cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubItem {
    pub id: String,
    pub product_id: String,
    pub title: String,
    pub price: i64,
    pub quantity: i64,
    pub category: String,
}

impl StubItem {
    #[must_use]
    pub fn new(id: &str, product_id: &str, title: &str, price: i64, quantity: i64) -> Self {
        Self {
            id: id.to_string(),
            product_id: product_id.to_string(),
            title: title.to_string(),
            price,
            quantity,
            category: "General".to_string(),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "quantity": self.quantity,
            "product": {
                "id": self.product_id,
                "title": self.title,
                "price": self.price,
                "images": [{ "url": format!("/images/{}.jpg", self.product_id) }],
                "category": { "name": self.category },
            },
        })
    }
}

/// A 200 response whose body is not a usable success envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeFault {
    /// `{"success": false, "message": ...}`
    Unsuccessful,
    /// `{"success": true}` with no `data`.
    MissingData,
    /// An HTML maintenance page.
    NotJson,
}

impl EnvelopeFault {
    pub const ALL: [Self; 3] = [Self::Unsuccessful, Self::MissingData, Self::NotJson];

    fn respond(self) -> Response {
        match self {
            Self::Unsuccessful => {
                Json(json!({ "success": false, "message": "temporarily unavailable" }))
                    .into_response()
            }
            Self::MissingData => ack(),
            Self::NotJson => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        }
    }
}

/// What the stub serves and how it fails.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    /// Server-side cart lines.
    pub items: Vec<StubItem>,
    /// Guest token issued to requests without a bearer token.
    pub guest_token: Option<String>,
    /// Saved addresses, as raw JSON.
    pub addresses: Vec<Value>,
    /// Catalog, as raw JSON.
    pub products: Vec<Value>,
    pub fail_cart: bool,
    pub fail_mutations: bool,
    pub fail_addresses: bool,
    pub fail_orders: bool,
    pub fail_products: bool,
    /// Every endpoint answers 200 with this body instead of its usual one.
    pub envelope_fault: Option<EnvelopeFault>,
}

impl Scenario {
    /// Headphones 250,000 x2 and a wallet 150,000 x1.
    #[must_use]
    pub fn two_line_cart() -> Self {
        Self {
            items: vec![
                StubItem::new("line-1", "p-1", "Wireless Headphones", 250_000, 2),
                StubItem::new("line-2", "p-2", "Leather Wallet", 150_000, 1),
            ],
            ..Self::default()
        }
    }

    /// A catalog of `count` products priced 10,000 apart.
    #[must_use]
    pub fn with_catalog(mut self, count: i64) -> Self {
        self.products = (1..=count)
            .map(|n| {
                json!({
                    "id": n,
                    "title": format!("Product {n}"),
                    "price": n * 10_000,
                    "images": [format!("/images/product-{n}.jpg")],
                    "category": { "name": "General" },
                })
            })
            .collect();
        self
    }

    #[must_use]
    pub fn with_guest_token(mut self, token: &str) -> Self {
        self.guest_token = Some(token.to_string());
        self
    }

    #[must_use]
    pub const fn with_envelope_fault(mut self, fault: EnvelopeFault) -> Self {
        self.envelope_fault = Some(fault);
        self
    }

    #[must_use]
    pub fn with_addresses(mut self, addresses: Vec<Value>) -> Self {
        self.addresses = addresses;
        self
    }
}

/// A saved address in the backend's JSON shape.
#[must_use]
pub fn address_json(id: i64, title: &str, is_default: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "fullName": "Sam Doe",
        "address": "12 Market Street",
        "city": "Springfield",
        "province": "Central",
        "postalCode": "10001",
        "phone": "555-0100",
        "isDefault": is_default,
    })
}

// ============================================================================
// Recording
// ============================================================================

/// A request as the stub saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// Value of a query parameter, if present.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }
}

struct Stub {
    scenario: Mutex<Scenario>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Stub {
    fn scenario(&self) -> MutexGuard<'_, Scenario> {
        self.scenario.lock().expect("stub scenario lock poisoned")
    }

    fn record(&self, method: Method, uri: &Uri, headers: &HeaderMap, body: Option<&Bytes>) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let request = RecordedRequest {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            authorization: header("authorization"),
            request_id: header("x-request-id"),
            content_type: header("content-type"),
            body: body.and_then(|b| serde_json::from_slice(b).ok()),
        };
        self.requests
            .lock()
            .expect("stub request log poisoned")
            .push(request);
    }
}

type Shared = State<Arc<Stub>>;

// ============================================================================
// Handlers
// ============================================================================

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn ack() -> Response {
    Json(json!({ "success": true })).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn is_authenticated(headers: &HeaderMap) -> bool {
    headers.contains_key("authorization")
}

async fn get_cart(State(stub): Shared, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    stub.record(method, &uri, &headers, None);
    let scenario = stub.scenario();

    if scenario.fail_cart {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "cart service unavailable");
    }
    if let Some(fault) = scenario.envelope_fault {
        return fault.respond();
    }

    let mut data = json!({
        "id": STUB_CART_ID,
        "items": scenario.items.iter().map(StubItem::to_json).collect::<Vec<_>>(),
    });
    if !is_authenticated(&headers)
        && let Some(token) = &scenario.guest_token
    {
        data["guestToken"] = json!(token);
    }
    ok(data)
}

async fn update_item(
    State(stub): Shared,
    Path(item_id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    stub.record(method, &uri, &headers, Some(&body));
    let mut scenario = stub.scenario();

    if scenario.fail_mutations {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "cart is locked");
    }
    if let Some(fault) = scenario.envelope_fault {
        return fault.respond();
    }

    let quantity = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|v| v["quantity"].as_i64());
    let Some(quantity) = quantity else {
        return fail(StatusCode::BAD_REQUEST, "quantity is required");
    };

    match scenario.items.iter_mut().find(|i| i.id == item_id) {
        Some(item) => {
            item.quantity = quantity;
            ack()
        }
        None => fail(StatusCode::NOT_FOUND, "cart item not found"),
    }
}

async fn remove_item(
    State(stub): Shared,
    Path(item_id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    stub.record(method, &uri, &headers, None);
    let mut scenario = stub.scenario();

    if scenario.fail_mutations {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "cart is locked");
    }
    if let Some(fault) = scenario.envelope_fault {
        return fault.respond();
    }

    let before = scenario.items.len();
    scenario.items.retain(|i| i.id != item_id);
    if scenario.items.len() == before {
        return fail(StatusCode::NOT_FOUND, "cart item not found");
    }
    ack()
}

async fn add_item(
    State(stub): Shared,
    Path(cart_id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    stub.record(method, &uri, &headers, Some(&body));
    let mut scenario = stub.scenario();

    if scenario.fail_mutations {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "cart is locked");
    }
    if let Some(fault) = scenario.envelope_fault {
        return fault.respond();
    }
    if cart_id != STUB_CART_ID.to_string() {
        return fail(StatusCode::NOT_FOUND, "cart not found");
    }

    let parsed = serde_json::from_slice::<Value>(&body).unwrap_or_default();
    let Some(product_id) = parsed["productId"].as_str().map(str::to_string) else {
        return fail(StatusCode::BAD_REQUEST, "productId is required");
    };
    let quantity = parsed["quantity"].as_i64().unwrap_or(1);

    if let Some(item) = scenario.items.iter_mut().find(|i| i.product_id == product_id) {
        item.quantity += quantity;
    } else {
        let id = format!("line-{}", scenario.items.len() + 1);
        let title = format!("Product {product_id}");
        scenario
            .items
            .push(StubItem::new(&id, &product_id, &title, 100_000, quantity));
    }
    ack()
}

async fn list_addresses(
    State(stub): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    stub.record(method, &uri, &headers, None);
    let scenario = stub.scenario();

    if !is_authenticated(&headers) {
        return fail(StatusCode::UNAUTHORIZED, "login required");
    }
    if scenario.fail_addresses {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "address service unavailable");
    }
    if let Some(fault) = scenario.envelope_fault {
        return fault.respond();
    }
    ok(Value::Array(scenario.addresses.clone()))
}

async fn create_order(
    State(stub): Shared,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    stub.record(method, &uri, &headers, Some(&body));
    let mut scenario = stub.scenario();

    if !is_authenticated(&headers) {
        return fail(StatusCode::UNAUTHORIZED, "login required");
    }
    if scenario.fail_orders {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "payment gateway timeout");
    }
    if let Some(fault) = scenario.envelope_fault {
        return fault.respond();
    }

    scenario.items.clear();
    ok(json!({ "id": STUB_ORDER_ID }))
}

async fn list_products(
    State(stub): Shared,
    Query(params): Query<std::collections::HashMap<String, String>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    stub.record(method, &uri, &headers, None);
    let scenario = stub.scenario();

    if scenario.fail_products {
        return fail(StatusCode::SERVICE_UNAVAILABLE, "catalog unavailable");
    }
    if let Some(fault) = scenario.envelope_fault {
        return fault.respond();
    }

    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    let products = scenario.products.iter().take(limit).cloned().collect();
    ok(Value::Array(products))
}

// ============================================================================
// StubBackend
// ============================================================================

/// A running stub backend. The server stops when this is dropped.
pub struct StubBackend {
    addr: SocketAddr,
    stub: Arc<Stub>,
    server: JoinHandle<()>,
}

impl StubBackend {
    /// Start serving `scenario` on an ephemeral localhost port.
    pub async fn start(scenario: Scenario) -> Self {
        let stub = Arc::new(Stub {
            scenario: Mutex::new(scenario),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/cart", get(get_cart))
            .route("/cart/items/{item_id}", put(update_item).delete(remove_item))
            .route("/cart/{cart_id}/items", post(add_item))
            .route("/address", get(list_addresses))
            .route("/orders", post(create_order))
            .route("/products", get(list_products))
            .with_state(Arc::clone(&stub));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub backend");
        let addr = listener.local_addr().expect("Failed to read stub address");

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Stub backend failed");
        });

        Self { addr, stub, server }
    }

    /// Base URL with a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Client configuration pointing at this stub.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url()).expect("Stub URL is a valid base URL")
    }

    /// An API client pointing at this stub.
    #[must_use]
    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.config()).expect("Failed to build API client")
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.stub
            .requests
            .lock()
            .expect("stub request log poisoned")
            .clone()
    }

    /// Requests received for `method` and `path`.
    #[must_use]
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| &r.method == method && r.path == path)
            .collect()
    }

    /// The server-side cart lines.
    #[must_use]
    pub fn server_items(&self) -> Vec<StubItem> {
        self.stub.scenario().items.clone()
    }

    /// Change the scenario mid-test.
    pub fn update(&self, f: impl FnOnce(&mut Scenario)) {
        f(&mut self.stub.scenario());
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}
