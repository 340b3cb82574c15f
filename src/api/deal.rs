//! Deal API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiResponse;
use crate::http::{ApiError, HttpClient};

/// Pipeline stage of a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DealStage {
    Qualification,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<DealStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_close_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_close_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Filters for `GET /deals`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<DealStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_only: Option<bool>,
}

pub struct DealApi<'a> {
    http: &'a HttpClient,
}

impl<'a> DealApi<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    pub async fn get_all(&self, query: &DealQuery) -> Result<ApiResponse<Vec<Deal>>, ApiError> {
        self.http.get_with("/deals", query).await
    }

    /// Pipeline statistics; the shape is owned by the backend
    pub async fn get_statistics(&self) -> Result<ApiResponse<Value>, ApiError> {
        self.http.get("/deals/statistics").await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<ApiResponse<Deal>, ApiError> {
        self.http.get(&format!("/deals/{id}")).await
    }

    pub async fn create(&self, deal: &Deal) -> Result<ApiResponse<Deal>, ApiError> {
        self.http.post("/deals", deal).await
    }

    pub async fn update(&self, id: i64, deal: &Deal) -> Result<ApiResponse<Deal>, ApiError> {
        self.http.put(&format!("/deals/{id}"), deal).await
    }

    pub async fn delete(&self, id: i64) -> Result<ApiResponse<Value>, ApiError> {
        self.http.delete(&format!("/deals/{id}")).await
    }
}
