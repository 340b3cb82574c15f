//! In-process mock of the CRM backend.
//!
//! Serves the `/api` endpoints on a random local port with an in-memory
//! store. Tokens are issued by `/api/auth/login`; every other endpoint
//! answers 401 unless it sees a live bearer token. The method and path of
//! every request, and its `Authorization` header, are recorded for
//! assertions.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crm_desktop_lib::{
    config::Config,
    storage::{KeyValueStore, MemoryStorage, StorageError},
    AppState,
};

pub const ADMIN_TOKEN: &str = "token-admin";
pub const SALES_TOKEN: &str = "token-sales";

#[derive(Default)]
pub struct Backend {
    customers: Mutex<BTreeMap<i64, Value>>,
    deals: Mutex<BTreeMap<i64, Value>>,
    next_id: AtomicI64,
    live_tokens: Mutex<HashSet<String>>,
    seen_auth: Mutex<Vec<Option<String>>>,
    seen_requests: Mutex<Vec<String>>,
    fail_statistics: AtomicBool,
}

impl Backend {
    /// Authorization headers seen so far, in request order
    pub fn seen_auth(&self) -> Vec<Option<String>> {
        self.seen_auth.lock().unwrap().clone()
    }

    /// Method and path of the most recent request, e.g. `"GET /api/deals/4"`
    pub fn last_request(&self) -> Option<String> {
        self.seen_requests.lock().unwrap().last().cloned()
    }

    /// Invalidate every issued token, as a server-side expiry would
    pub fn revoke_all(&self) {
        self.live_tokens.lock().unwrap().clear();
    }

    pub fn fail_statistics(&self) {
        self.fail_statistics.store(true, Ordering::SeqCst);
    }

    fn record(&self, headers: &HeaderMap) {
        let auth = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen_auth.lock().unwrap().push(auth);
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiFailure> {
        self.record(headers);
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match token {
            Some(token) if self.live_tokens.lock().unwrap().contains(token) => Ok(()),
            _ => Err(failure(StatusCode::UNAUTHORIZED, "unauthorized")),
        }
    }
}

type Shared = Arc<Backend>;
type ApiFailure = (StatusCode, Json<Value>);

fn failure(status: StatusCode, message: &str) -> ApiFailure {
    (status, Json(json!({ "success": false, "message": message })))
}

async fn track(State(backend): State<Shared>, request: Request, next: Next) -> Response {
    let line = format!("{} {}", request.method(), request.uri().path());
    backend.seen_requests.lock().unwrap().push(line);
    next.run(request).await
}

/// Copy every field of `patch` onto `record`
fn merge(record: &mut Value, patch: &Value) {
    if let (Some(target), Some(fields)) = (record.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
}

pub fn app(backend: Shared) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/customers", get(list_customers).post(create_customer))
        .route(
            "/api/customers/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/api/deals", get(list_deals).post(create_deal))
        .route("/api/deals/statistics", get(deal_statistics))
        .route("/api/deals/{id}", get(get_deal).put(update_deal).delete(delete_deal))
        .route("/api/approvals", post(create_approval))
        .route("/api/approvals/pending", get(pending_approvals))
        .route("/api/approvals/history", get(approval_history))
        .route("/api/approvals/my", get(my_approvals))
        .route("/api/approvals/{id}/process", post(process_approval))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", put(update_user))
        .layer(middleware::from_fn_with_state(backend.clone(), track))
        .with_state(backend)
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn login(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Value>, ApiFailure> {
    backend.record(&headers);
    let (token, id, role) = match (credentials.username.as_str(), credentials.password.as_str()) {
        ("admin", "secret") => (ADMIN_TOKEN, 1, "ADMIN"),
        ("sales", "secret") => (SALES_TOKEN, 2, "SALES"),
        _ => return Err(failure(StatusCode::UNAUTHORIZED, "invalid credentials")),
    };
    backend.live_tokens.lock().unwrap().insert(token.to_string());
    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": {
            "id": id,
            "username": credentials.username,
            "fullName": format!("{} user", credentials.username),
            "email": format!("{}@crm.test", credentials.username),
            "role": role
        }
    })))
}

#[derive(Deserialize)]
struct CustomerFilter {
    status: Option<String>,
}

async fn list_customers(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Query(filter): Query<CustomerFilter>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    let customers: Vec<Value> = backend
        .customers
        .lock()
        .unwrap()
        .values()
        .filter(|c| match &filter.status {
            Some(status) => c["status"] == status.as_str(),
            None => true,
        })
        .cloned()
        .collect();
    Ok(Json(json!({
        "success": true,
        "total": customers.len(),
        "data": customers
    })))
}

async fn create_customer(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(mut customer): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    let id = backend.next_id();
    customer["id"] = json!(id);
    customer["createdAt"] = json!("2024-05-01T09:30:00");
    backend.customers.lock().unwrap().insert(id, customer.clone());
    Ok(Json(json!({ "success": true, "data": customer })))
}

async fn get_customer(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    match backend.customers.lock().unwrap().get(&id) {
        Some(customer) => Ok(Json(json!({ "success": true, "data": customer }))),
        None => Err(failure(StatusCode::NOT_FOUND, "Customer not found")),
    }
}

async fn update_customer(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    let mut customers = backend.customers.lock().unwrap();
    let customer = customers
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Customer not found"))?;
    merge(customer, &patch);
    Ok(Json(json!({ "success": true, "data": customer })))
}

async fn delete_customer(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    match backend.customers.lock().unwrap().remove(&id) {
        Some(_) => Ok(Json(json!({ "success": true, "message": "Customer deleted" }))),
        None => Err(failure(StatusCode::NOT_FOUND, "Customer not found")),
    }
}

async fn list_deals(
    State(backend): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    Ok(Json(json!({
        "success": true,
        "data": [
            { "id": 1, "title": "Pilot", "customerId": 1, "amount": 1200.0, "stage": "PROPOSAL" }
        ]
    })))
}

async fn create_deal(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(mut deal): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    let id = backend.next_id();
    deal["id"] = json!(id);
    deal["createdAt"] = json!("2024-06-03T14:00:00");
    backend.deals.lock().unwrap().insert(id, deal.clone());
    Ok(Json(json!({ "success": true, "data": deal })))
}

async fn get_deal(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    match backend.deals.lock().unwrap().get(&id) {
        Some(deal) => Ok(Json(json!({ "success": true, "data": deal }))),
        None => Err(failure(StatusCode::NOT_FOUND, "Deal not found")),
    }
}

async fn update_deal(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    let mut deals = backend.deals.lock().unwrap();
    let deal = deals
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Deal not found"))?;
    merge(deal, &patch);
    deal["updatedAt"] = json!("2024-06-04T08:15:00");
    Ok(Json(json!({ "success": true, "data": deal })))
}

async fn delete_deal(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    match backend.deals.lock().unwrap().remove(&id) {
        Some(_) => Ok(Json(json!({ "success": true, "message": "Deal deleted" }))),
        None => Err(failure(StatusCode::NOT_FOUND, "Deal not found")),
    }
}

async fn deal_statistics(
    State(backend): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, String)> {
    backend
        .authorize(&headers)
        .map_err(|(status, _)| (status, String::new()))?;
    if backend.fail_statistics.load(Ordering::SeqCst) {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "statistics unavailable".to_string()));
    }
    Ok(Json(json!({
        "success": true,
        "data": { "totalOpen": 3, "pipelineValue": 42000.0 }
    })))
}

async fn create_approval(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(mut approval): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    approval["id"] = json!(backend.next_id());
    approval["status"] = json!("PENDING");
    approval["createdAt"] = json!("2024-06-05T10:00:00");
    Ok(Json(approval))
}

async fn pending_approvals(
    State(backend): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    Ok(Json(json!([
        { "id": 10, "title": "Discount", "type": "DISCOUNT", "status": "PENDING", "applicantId": 2 }
    ])))
}

async fn approval_history(
    State(backend): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    Ok(Json(json!([])))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyApprovals {
    user_id: i64,
}

async fn my_approvals(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<MyApprovals>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    Ok(Json(json!([
        { "id": 11, "title": "Stage change", "status": "APPROVED", "applicantId": query.user_id }
    ])))
}

#[derive(Deserialize)]
struct Decision {
    approved: bool,
}

async fn process_approval(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(decision): Json<Decision>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    let status = if decision.approved { "APPROVED" } else { "REJECTED" };
    Ok(Json(json!({ "success": true, "id": id, "status": status })))
}

async fn list_users(
    State(backend): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    Ok(Json(json!([
        { "id": 1, "username": "admin", "email": "admin@crm.test", "role": "ADMIN", "isActive": true },
        { "id": 2, "username": "sales", "email": "sales@crm.test", "role": "SALES", "isActive": true }
    ])))
}

async fn create_user(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(mut user): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    if let Some(fields) = user.as_object_mut() {
        fields.remove("password");
    }
    user["id"] = json!(backend.next_id());
    user["isActive"] = json!(true);
    Ok(Json(user))
}

async fn update_user(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(mut patch): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    backend.authorize(&headers)?;
    patch["id"] = json!(id);
    Ok(Json(patch))
}

/// Memory storage that refuses every write to one key
pub struct FailingStorage {
    inner: MemoryStorage,
    key: &'static str,
}

impl FailingStorage {
    pub fn failing_on(key: &'static str) -> Self {
        Self {
            inner: MemoryStorage::new(),
            key,
        }
    }
}

impl KeyValueStore for FailingStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == self.key {
            return Err(StorageError::Io("disk full".to_string()));
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key)
    }
}

/// A running backend and an app wired to it
pub struct TestApp {
    pub state: AppState,
    pub backend: Shared,
}

/// Start a backend and an app over fresh in-memory storage
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(MemoryStorage::new())).await
}

pub async fn spawn_app_with(storage: Arc<dyn KeyValueStore>) -> TestApp {
    let backend: Shared = Arc::new(Backend::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let router = app(backend.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let state = state_for(&format!("http://{addr}/api"), storage);
    TestApp { state, backend }
}

/// An app pointed at `base_url` with fresh in-memory storage
pub fn app_for(base_url: &str) -> AppState {
    state_for(base_url, Arc::new(MemoryStorage::new()))
}

fn state_for(base_url: &str, storage: Arc<dyn KeyValueStore>) -> AppState {
    let config = Config {
        api_base_url: base_url.to_string(),
        timeout: std::time::Duration::from_secs(5),
        ..Config::default()
    };
    AppState::new(&config, storage).unwrap()
}
