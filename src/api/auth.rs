//! Authentication API
//!
//! Login is the one call that never fails: transport errors collapse into
//! a failure-shaped [`LoginResponse`].

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::null_as_default;
use crate::http::{ApiError, HttpClient};

/// Fallback message when a failed login carries no error text
pub const NETWORK_ERROR_MESSAGE: &str = "Network Error";

/// Identity of the logged-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthUser {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub token: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user: AuthUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginResponse {
    /// Failure result for a login that produced no usable server body
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            token: String::new(),
            user: AuthUser::default(),
            message: Some(message.into()),
        }
    }

    /// Collapse a failed login call into a login result.
    ///
    /// A structured error body that reads as a login response is returned
    /// as-is; anything else becomes a synthesized failure.
    pub fn from_error(error: &ApiError) -> Self {
        if let Some(body) = error.body() {
            if let Ok(response) = serde_json::from_value::<LoginResponse>(body.clone()) {
                return response;
            }
        }

        let message = match error {
            ApiError::Network(msg) if !msg.is_empty() => msg.clone(),
            ApiError::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        };
        Self::failure(message)
    }
}

pub struct AuthApi<'a> {
    http: &'a HttpClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    /// POST /auth/login
    pub async fn login(&self, credentials: &LoginRequest) -> LoginResponse {
        info!("Sending login request for user: {}", credentials.username);

        match self
            .http
            .post::<LoginResponse, _>("/auth/login", credentials)
            .await
        {
            Ok(response) => {
                info!("Login response received (success: {})", response.success);
                response
            }
            Err(e) => {
                warn!("Login request failed: {}", e);
                LoginResponse::from_error(&e)
            }
        }
    }
}
