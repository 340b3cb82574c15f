//! Approval API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{ApiError, HttpClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MyApprovalsQuery {
    user_id: i64,
}

#[derive(Serialize)]
struct ProcessRequest {
    approved: bool,
}

pub struct ApprovalApi<'a> {
    http: &'a HttpClient,
}

impl<'a> ApprovalApi<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    pub async fn get_pending(&self) -> Result<Vec<Approval>, ApiError> {
        self.http.get("/approvals/pending").await
    }

    pub async fn get_history(&self) -> Result<Vec<Approval>, ApiError> {
        self.http.get("/approvals/history").await
    }

    /// Approvals submitted by `user_id`
    pub async fn get_my(&self, user_id: i64) -> Result<Vec<Approval>, ApiError> {
        self.http
            .get_with("/approvals/my", &MyApprovalsQuery { user_id })
            .await
    }

    pub async fn create(&self, approval: &Approval) -> Result<Approval, ApiError> {
        self.http.post("/approvals", approval).await
    }

    pub async fn process(&self, id: i64, approved: bool) -> Result<Value, ApiError> {
        self.http
            .post(&format!("/approvals/{id}/process"), &ProcessRequest { approved })
            .await
    }
}
