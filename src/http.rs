//! HTTP Client Module
//!
//! One configured `reqwest` client shared by every resource API. Outgoing
//! requests pass through a request interceptor chain; failed calls are
//! classified into [`ApiError`] and passed through a response interceptor
//! chain before being returned. Successful calls yield only the payload.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Request, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::session::SessionContext;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Hook run on every request before it is sent
pub trait RequestInterceptor: Send + Sync {
    fn on_request(&self, request: &mut Request);
}

/// Hook run on every failed call before the error reaches the caller
pub trait ResponseInterceptor: Send + Sync {
    fn on_error(&self, method: &Method, url: &Url, error: &ApiError);
}

/// Attaches `Authorization: Bearer <token>` when a token is stored
pub struct BearerAuth {
    session: SessionContext,
}

impl BearerAuth {
    pub fn new(session: SessionContext) -> Self {
        Self { session }
    }
}

impl RequestInterceptor for BearerAuth {
    fn on_request(&self, request: &mut Request) {
        let token = match self.session.token() {
            Ok(Some(token)) => token,
            Ok(None) => return,
            Err(e) => {
                warn!("Could not read session token, sending without it: {}", e);
                return;
            }
        };

        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(e) => warn!("Stored token is not a valid header value: {}", e),
        }
    }
}

/// Expires the session when the backend answers 401
pub struct SessionExpiry {
    session: SessionContext,
}

impl SessionExpiry {
    pub fn new(session: SessionContext) -> Self {
        Self { session }
    }
}

impl ResponseInterceptor for SessionExpiry {
    fn on_error(&self, method: &Method, url: &Url, error: &ApiError) {
        if error.is_unauthorized() {
            warn!("Unauthorized response for {} {}", method, url);
            self.session.expire();
        }
    }
}

/// Logs diagnostics for not-found and server errors
pub struct StatusDiagnostics;

impl ResponseInterceptor for StatusDiagnostics {
    fn on_error(&self, method: &Method, url: &Url, error: &ApiError) {
        match error.status() {
            Some(404) => error!("Resource not found: {} {}", method, url),
            Some(500) => error!("Server error: {} {}: {}", method, url, error),
            _ => debug!("Request failed: {} {}: {}", method, url, error),
        }
    }
}

pub struct HttpClientBuilder {
    base_url: String,
    timeout: Duration,
    session: SessionContext,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl HttpClientBuilder {
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append a request interceptor; runs after the built-in bearer auth
    pub fn request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    /// Append a response interceptor; runs after the built-in handlers
    pub fn response_interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response_interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> Result<HttpClient, ApiError> {
        Url::parse(&self.base_url)
            .map_err(|e| ApiError::Request(format!("invalid base URL {}: {}", self.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let mut request_chain: Vec<Arc<dyn RequestInterceptor>> =
            vec![Arc::new(BearerAuth::new(self.session.clone()))];
        request_chain.extend(self.request_interceptors);

        let mut response_chain: Vec<Arc<dyn ResponseInterceptor>> = vec![
            Arc::new(SessionExpiry::new(self.session.clone())),
            Arc::new(StatusDiagnostics),
        ];
        response_chain.extend(self.response_interceptors);

        debug!("HTTP client configured for {}", self.base_url);

        Ok(HttpClient {
            base_url: self.base_url,
            client,
            request_chain: Arc::new(request_chain),
            response_chain: Arc::new(response_chain),
        })
    }
}

/// Shared API client; cheap to clone
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    client: reqwest::Client,
    request_chain: Arc<Vec<Arc<dyn RequestInterceptor>>>,
    response_chain: Arc<Vec<Arc<dyn ResponseInterceptor>>>,
}

impl HttpClient {
    pub fn builder(session: SessionContext) -> HttpClientBuilder {
        HttpClientBuilder {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            session,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        }
    }

    /// Client configured from `config` with the default interceptors
    pub fn new(config: &Config, session: SessionContext) -> Result<Self, ApiError> {
        Self::builder(session)
            .base_url(&config.api_base_url)
            .timeout(config.timeout)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn get_with<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.request(Method::DELETE, path)).await
    }

    /// Start a request for `path`, relative to the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Build the request and run the request interceptor chain over it
    pub fn prepare(&self, builder: RequestBuilder) -> Result<Request, ApiError> {
        let mut request = builder
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;

        for interceptor in self.request_chain.iter() {
            interceptor.on_request(&mut request);
        }

        Ok(request)
    }

    /// Execute a request through both interceptor chains
    pub async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let request = self.prepare(builder)?;
        let method = request.method().clone();
        let url = request.url().clone();

        debug!("{} {}", method, url);

        let result = self.execute(request).await;

        if let Err(e) = &result {
            for interceptor in self.response_chain.iter() {
                interceptor.on_error(&method, &url, e);
            }
        }

        result
    }

    async fn execute<T: DeserializeOwned>(&self, request: Request) -> Result<T, ApiError> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &body));
        }

        unwrap_payload(&body)
    }
}

/// Deserialize a success body; an empty body reads as JSON `null`.
pub fn unwrap_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(|e| ApiError::Parse(e.to_string()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Parse(e.to_string()))
}

/// API errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No response arrived (connect failure, timeout, broken stream)
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status
    #[error("HTTP {status}{}", status_detail(.body))]
    Status { status: u16, body: Option<Value> },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl ApiError {
    /// Classify a non-2xx response, keeping the body as JSON when it parses
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let body = if body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(serde_json::from_slice(body).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(body).trim().to_string())
            }))
        };
        ApiError::Status { status, body }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

fn status_detail(body: &Option<Value>) -> String {
    match body {
        Some(Value::String(text)) => format!(": {}", text),
        Some(value) => match value.get("message").and_then(Value::as_str) {
            Some(message) => format!(": {}", message),
            None => format!(": {}", value),
        },
        None => String::new(),
    }
}
