//! Commands Module
//!
//! Application flows exposed to the front end: login, logout, navigation
//! and session status. Each flow keeps the session and the router in step.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::api::{AuthUser, LoginRequest, LoginResponse};
use crate::router::{self, Navigation, RouteName, RouterError, DASHBOARD_PATH, LOGIN_PATH};
use crate::storage::StorageError;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user: Option<AuthUser>,
    pub started_at: Option<DateTime<Utc>>,
    pub location: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Router(#[from] RouterError),
}

/// Report the persisted session
pub fn get_session_status(state: &AppState) -> SessionStatus {
    debug!("Getting session status");

    let authenticated = state.session.is_authenticated();
    SessionStatus {
        authenticated,
        user: authenticated.then(|| state.session.current_user()).flatten(),
        started_at: authenticated.then(|| state.session.started_at()).flatten(),
        location: state.router.current(),
    }
}

/// Log in and, on success, start the session and open the dashboard.
///
/// Always yields a login response; failures are reported in it.
pub async fn login(state: &AppState, username: String, password: String) -> LoginResponse {
    info!("Logging in as {}", username);

    let response = state
        .api
        .auth()
        .login(&LoginRequest { username, password })
        .await;

    if !response.success {
        info!(
            "Login rejected: {}",
            response.message.as_deref().unwrap_or("no reason given")
        );
        return response;
    }

    if response.token.is_empty() {
        warn!("Login succeeded without a token; session not started");
        return response;
    }

    if let Err(e) = state.session.begin(&response.token, &response.user) {
        error!("Failed to save session: {}", e);
        return LoginResponse::failure(format!("Failed to save session: {e}"));
    }

    if let Err(e) = state.router.navigate(DASHBOARD_PATH) {
        error!("Failed to open dashboard after login: {}", e);
    }

    response
}

/// Clear the session and return to the login page
pub fn logout(state: &AppState) -> Result<Navigation, CommandError> {
    info!("Logging out");

    state.session.end()?;
    Ok(state.router.navigate(LOGIN_PATH)?)
}

/// Navigate as the front end would; visiting the logout route logs out
pub fn navigate(state: &AppState, location: &str) -> Result<Navigation, CommandError> {
    match router::resolve(location) {
        Some(route) if route.name == RouteName::Logout => logout(state),
        _ => Ok(state.router.navigate(location)?),
    }
}
