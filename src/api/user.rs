//! User administration API

use serde::{Deserialize, Serialize};

use crate::http::{ApiError, HttpClient};

/// An application user as managed by administrators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<String>,
    /// Only sent on create or password change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

pub struct UserApi<'a> {
    http: &'a HttpClient,
}

impl<'a> UserApi<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    pub async fn get_all(&self) -> Result<Vec<AppUser>, ApiError> {
        self.http.get("/users").await
    }

    pub async fn create(&self, user: &AppUser) -> Result<AppUser, ApiError> {
        self.http.post("/users", user).await
    }

    pub async fn update(&self, id: i64, user: &AppUser) -> Result<AppUser, ApiError> {
        self.http.put(&format!("/users/{id}"), user).await
    }
}
