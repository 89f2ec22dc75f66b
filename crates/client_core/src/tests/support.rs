//! In-process doubles for the user, vocabulary and translation services.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{EntryId, VocabularyEntry},
    protocol::routes::API_KEY_HEADER,
};
use tokio::net::TcpListener;

use crate::{
    ClientSettings, CredentialBackend, LingoClient, MemoryCredentialBackend, ServiceAddressing,
    UserPrompt,
};

pub const TEST_STORAGE_KEY: &str = "apiKey";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Register,
    ValidateKey,
    List,
    Add,
    Update,
    Get,
    Delete,
    Translate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Single,
    Split,
}

#[derive(Default)]
struct MockState {
    entries: StdMutex<Vec<VocabularyEntry>>,
    next_entry_id: AtomicI64,
    next_user_id: AtomicI64,
    keys: StdMutex<HashMap<String, String>>,
    issued_key: StdMutex<Option<String>>,
    overrides: StdMutex<HashMap<Route, (StatusCode, String)>>,
    delays: StdMutex<HashMap<Route, Duration>>,
    hits: StdMutex<HashMap<Route, usize>>,
    seen_keys: StdMutex<Vec<Option<String>>>,
    translated: StdMutex<Vec<String>>,
    translate_reply: StdMutex<Option<Value>>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_key(&self, key: &str, username: &str) {
        self.state
            .keys
            .lock()
            .expect("keys")
            .insert(key.to_string(), username.to_string());
    }

    pub fn issue_key(&self, key: &str) {
        *self.state.issued_key.lock().expect("issued key") = Some(key.to_string());
    }

    pub fn seed(&self, entries: &[(&str, &str)]) {
        for (english, spanish) in entries {
            self.insert(english, spanish);
        }
    }

    pub fn remove_entry(&self, id: EntryId) {
        self.state
            .entries
            .lock()
            .expect("entries")
            .retain(|entry| entry.id != id);
    }

    pub fn entries(&self) -> Vec<VocabularyEntry> {
        self.state.entries.lock().expect("entries").clone()
    }

    pub fn hits(&self, route: Route) -> usize {
        self.state
            .hits
            .lock()
            .expect("hits")
            .get(&route)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().expect("hits").values().sum()
    }

    pub fn respond_with(&self, route: Route, status: StatusCode, body: &str) {
        self.state
            .overrides
            .lock()
            .expect("overrides")
            .insert(route, (status, body.to_string()));
    }

    pub fn delay(&self, route: Route, delay: Duration) {
        self.state
            .delays
            .lock()
            .expect("delays")
            .insert(route, delay);
    }

    pub fn seen_keys(&self) -> Vec<Option<String>> {
        self.state.seen_keys.lock().expect("seen keys").clone()
    }

    pub fn translated_texts(&self) -> Vec<String> {
        self.state.translated.lock().expect("translated").clone()
    }

    pub fn reply_to_translate(&self, reply: Value) {
        *self.state.translate_reply.lock().expect("reply") = Some(reply);
    }

    /// Serves the routes on an ephemeral port and returns the addressing a
    /// client needs to reach them.
    pub async fn spawn(&self, layout: Layout) -> ServiceAddressing {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = match layout {
            Layout::Single => user_routes()
                .merge(vocabulary_routes())
                .merge(translation_routes())
                .route("/api", get(|| async { "Vocabulary Translator API is running!" }))
                .with_state(self.clone()),
            Layout::Split => Router::new()
                .nest(
                    "/user-service",
                    user_routes().route("/api", get(|| async { "User Management API is running!" })),
                )
                .nest(
                    "/vocab-service",
                    vocabulary_routes().route("/api", get(|| async { "Vocabulary API is running!" })),
                )
                .nest(
                    "/translation-service",
                    translation_routes()
                        .route("/api", get(|| async { "Translation API is running!" })),
                )
                .with_state(self.clone()),
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let origin = format!("http://{addr}");
        match layout {
            Layout::Single => ServiceAddressing::single(origin),
            Layout::Split => ServiceAddressing::split(origin),
        }
    }

    fn insert(&self, english: &str, spanish: &str) -> VocabularyEntry {
        let entry = VocabularyEntry {
            id: EntryId(self.state.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1),
            english: english.to_string(),
            spanish: spanish.to_string(),
        };
        self.state
            .entries
            .lock()
            .expect("entries")
            .push(entry.clone());
        entry
    }

    async fn hit(&self, route: Route) -> Option<Response> {
        *self
            .state
            .hits
            .lock()
            .expect("hits")
            .entry(route)
            .or_default() += 1;

        let delay = self.state.delays.lock().expect("delays").get(&route).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (status, body) = self
            .state
            .overrides
            .lock()
            .expect("overrides")
            .get(&route)
            .cloned()?;
        let content_type = if serde_json::from_str::<Value>(&body).is_ok() {
            "application/json"
        } else {
            "text/html; charset=utf-8"
        };
        Some((status, [(header::CONTENT_TYPE, content_type)], body).into_response())
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let key = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.state
            .seen_keys
            .lock()
            .expect("seen keys")
            .push(key.clone());
        let known = key
            .map(|key| self.state.keys.lock().expect("keys").contains_key(&key))
            .unwrap_or(false);
        if known {
            Ok(())
        } else {
            Err(error(StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn non_empty(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn user_routes() -> Router<MockBackend> {
    Router::new()
        .route("/register", post(register))
        .route("/validate-key", get(validate_key))
}

fn vocabulary_routes() -> Router<MockBackend> {
    Router::new()
        .route("/translations", get(list_entries).post(add_entry))
        .route(
            "/translations/:id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

fn translation_routes() -> Router<MockBackend> {
    Router::new().route("/translate", post(translate))
}

async fn register(State(backend): State<MockBackend>, Json(body): Json<Value>) -> Response {
    if let Some(response) = backend.hit(Route::Register).await {
        return response;
    }
    let (Some(username), Some(_password)) = (non_empty(&body, "username"), non_empty(&body, "password"))
    else {
        return error(StatusCode::BAD_REQUEST, "Missing username or password");
    };

    let mut keys = backend.state.keys.lock().expect("keys");
    if keys.values().any(|existing| existing == &username) {
        return error(StatusCode::CONFLICT, "Username already exists");
    }
    let user_id = backend.state.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
    let api_key = backend
        .state
        .issued_key
        .lock()
        .expect("issued key")
        .take()
        .unwrap_or_else(|| format!("key-{user_id}"));
    keys.insert(api_key.clone(), username.clone());

    (
        StatusCode::CREATED,
        Json(json!({ "id": user_id, "username": username, "api_key": api_key })),
    )
        .into_response()
}

async fn validate_key(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    if let Some(response) = backend.hit(Route::ValidateKey).await {
        return response;
    }
    let Some(key) = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return error(StatusCode::UNAUTHORIZED, "No API key provided");
    };
    let username = backend.state.keys.lock().expect("keys").get(key).cloned();
    match username {
        Some(username) => Json(json!({ "valid": true, "user_id": 1, "username": username }))
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "valid": false, "error": "Invalid API key" })),
        )
            .into_response(),
    }
}

async fn list_entries(State(backend): State<MockBackend>, headers: HeaderMap) -> Response {
    if let Some(response) = backend.hit(Route::List).await {
        return response;
    }
    if let Err(response) = backend.authorize(&headers) {
        return response;
    }
    Json(backend.entries()).into_response()
}

async fn add_entry(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(response) = backend.hit(Route::Add).await {
        return response;
    }
    if let Err(response) = backend.authorize(&headers) {
        return response;
    }
    let (Some(english), Some(spanish)) = (non_empty(&body, "English"), non_empty(&body, "Spanish"))
    else {
        return error(StatusCode::BAD_REQUEST, "Missing English or Spanish term");
    };
    (StatusCode::CREATED, Json(backend.insert(&english, &spanish))).into_response()
}

async fn update_entry(
    State(backend): State<MockBackend>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(response) = backend.hit(Route::Update).await {
        return response;
    }
    if let Err(response) = backend.authorize(&headers) {
        return response;
    }
    let english = body.get("English").and_then(Value::as_str);
    let spanish = body.get("Spanish").and_then(Value::as_str);
    if english.is_none() && spanish.is_none() {
        return error(StatusCode::BAD_REQUEST, "No valid fields to update");
    }

    let mut entries = backend.state.entries.lock().expect("entries");
    let Some(entry) = entries.iter_mut().find(|entry| entry.id == EntryId(id)) else {
        return error(StatusCode::NOT_FOUND, "Item not found");
    };
    if let Some(english) = english {
        entry.english = english.to_string();
    }
    if let Some(spanish) = spanish {
        entry.spanish = spanish.to_string();
    }
    Json(entry.clone()).into_response()
}

async fn get_entry(
    State(backend): State<MockBackend>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = backend.hit(Route::Get).await {
        return response;
    }
    if let Err(response) = backend.authorize(&headers) {
        return response;
    }
    match backend
        .entries()
        .into_iter()
        .find(|entry| entry.id == EntryId(id))
    {
        Some(entry) => Json(entry).into_response(),
        None => error(StatusCode::NOT_FOUND, "Item not found"),
    }
}

async fn delete_entry(
    State(backend): State<MockBackend>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = backend.hit(Route::Delete).await {
        return response;
    }
    if let Err(response) = backend.authorize(&headers) {
        return response;
    }
    backend.remove_entry(EntryId(id));
    Json(json!({ "message": "Item deleted successfully" })).into_response()
}

async fn translate(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(response) = backend.hit(Route::Translate).await {
        return response;
    }
    if let Err(response) = backend.authorize(&headers) {
        return response;
    }
    let Some(text) = non_empty(&body, "text") else {
        return error(StatusCode::BAD_REQUEST, "Missing text to translate");
    };
    backend
        .state
        .translated
        .lock()
        .expect("translated")
        .push(text.clone());

    let reply = backend
        .state
        .translate_reply
        .lock()
        .expect("reply")
        .clone()
        .unwrap_or_else(|| json!({ "translation": format!("[es] {text}") }));
    Json(reply).into_response()
}

/// Records alerts and answers confirmations with a preset value.
pub struct RecordingPrompt {
    alerts: StdMutex<Vec<String>>,
    confirmations: AtomicUsize,
    answer: AtomicBool,
}

impl RecordingPrompt {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            alerts: StdMutex::new(Vec::new()),
            confirmations: AtomicUsize::new(0),
            answer: AtomicBool::new(answer),
        })
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().expect("alerts").clone()
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations.load(Ordering::SeqCst)
    }

    pub fn answer(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserPrompt for RecordingPrompt {
    async fn alert(&self, message: &str) {
        self.alerts
            .lock()
            .expect("alerts")
            .push(message.to_string());
    }

    async fn confirm(&self, _message: &str) -> bool {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        self.answer.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub backend: MockBackend,
    pub prompt: Arc<RecordingPrompt>,
    pub credentials: Arc<MemoryCredentialBackend>,
    pub client: LingoClient,
}

impl Harness {
    /// Fresh profile with no stored key.
    pub async fn anonymous(layout: Layout) -> Self {
        Self::build(
            MockBackend::new(),
            layout,
            Arc::new(MemoryCredentialBackend::new()),
        )
        .await
    }

    /// Profile whose stored key the backend already accepts.
    pub async fn registered(layout: Layout, key: &str) -> Self {
        let backend = MockBackend::new();
        backend.accept_key(key, "alice");
        Self::build(
            backend,
            layout,
            Arc::new(MemoryCredentialBackend::with_value(TEST_STORAGE_KEY, key)),
        )
        .await
    }

    pub async fn build(
        backend: MockBackend,
        layout: Layout,
        credentials: Arc<MemoryCredentialBackend>,
    ) -> Self {
        let settings = ClientSettings {
            addressing: backend.spawn(layout).await,
            ..ClientSettings::default()
        };
        let prompt = RecordingPrompt::new(true);
        let client = LingoClient::new(
            &settings,
            credentials.clone() as Arc<dyn CredentialBackend>,
            prompt.clone() as Arc<dyn UserPrompt>,
        )
        .await
        .expect("client");
        Self {
            backend,
            prompt,
            credentials,
            client,
        }
    }
}

/// An address nothing listens on.
pub async fn unreachable_origin() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}
