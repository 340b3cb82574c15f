//! Customer API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiResponse;
use crate::http::{ApiError, HttpClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CustomerStatus {
    Vip,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CustomerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_deals: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Filters for `GET /customers`; unset fields are not sent
#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CustomerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

pub struct CustomerApi<'a> {
    http: &'a HttpClient,
}

impl<'a> CustomerApi<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    pub async fn get_all(
        &self,
        query: &CustomerQuery,
    ) -> Result<ApiResponse<Vec<Customer>>, ApiError> {
        self.http.get_with("/customers", query).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<ApiResponse<Customer>, ApiError> {
        self.http.get(&format!("/customers/{id}")).await
    }

    pub async fn create(&self, customer: &Customer) -> Result<ApiResponse<Customer>, ApiError> {
        self.http.post("/customers", customer).await
    }

    pub async fn update(
        &self,
        id: i64,
        customer: &Customer,
    ) -> Result<ApiResponse<Customer>, ApiError> {
        self.http.put(&format!("/customers/{id}"), customer).await
    }

    pub async fn delete(&self, id: i64) -> Result<ApiResponse<Value>, ApiError> {
        self.http.delete(&format!("/customers/{id}")).await
    }
}
