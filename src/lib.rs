//! CRM Desktop Library
//!
//! Client core for the CRM front end: typed API modules over one shared
//! HTTP client, the persisted session, and the guarded router.

pub mod api;
pub mod commands;
pub mod config;
pub mod http;
pub mod logging;
pub mod router;
pub mod session;
pub mod storage;

use std::sync::Arc;

use config::Config;
use http::{ApiError, HttpClient};
use router::Router;
use session::SessionContext;
use storage::KeyValueStore;

/// Application state shared across commands
pub struct AppState {
    pub session: SessionContext,
    pub api: HttpClient,
    pub router: Arc<Router>,
}

impl AppState {
    /// Wire the session, client and router over one storage backend
    pub fn new(config: &Config, storage: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let session = SessionContext::new(storage);
        let api = HttpClient::new(config, session.clone())?;
        let router = Router::new(session.clone());

        Ok(Self {
            session,
            api,
            router,
        })
    }
}
