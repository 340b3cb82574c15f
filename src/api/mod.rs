//! Resource API Modules
//!
//! Thin typed wrappers mapping each backend resource to its REST calls.
//! Every call goes through the shared [`HttpClient`] so the interceptor
//! chains apply uniformly.

pub mod approval;
pub mod auth;
pub mod customer;
pub mod deal;
pub mod user;

use serde::{Deserialize, Deserializer, Serialize};

use crate::http::HttpClient;

pub use approval::{Approval, ApprovalApi, ApprovalStatus};
pub use auth::{AuthApi, AuthUser, LoginRequest, LoginResponse};
pub use customer::{Customer, CustomerApi, CustomerQuery, CustomerStatus};
pub use deal::{Deal, DealApi, DealQuery, DealStage};
pub use user::{AppUser, UserApi};

/// Response envelope used by the customer and deal endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HttpClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn customers(&self) -> CustomerApi<'_> {
        CustomerApi::new(self)
    }

    pub fn deals(&self) -> DealApi<'_> {
        DealApi::new(self)
    }

    pub fn approvals(&self) -> ApprovalApi<'_> {
        ApprovalApi::new(self)
    }

    pub fn users(&self) -> UserApi<'_> {
        UserApi::new(self)
    }
}

/// Deserialize `null` as the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
