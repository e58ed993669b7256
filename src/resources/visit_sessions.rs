use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::pagination::{Page, Pageable};
use crate::client::{ApiClient, RequestOptions};
use crate::error::Result;

const BASE: &str = "/patient-visit-sessions";

/// One patient visit as it moves through reception, triage and the clinic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSession {
    pub id: i64,
    pub patient_id: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub consultation_fee_paid: bool,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisitSession {
    pub patient_id: i64,
    pub visit_purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation_fee_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkFeePaid {
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedVisitSession {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub deleted_id: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub struct VisitSessionsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> VisitSessionsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, session: &NewVisitSession) -> Result<VisitSession> {
        self.client.post(BASE, session).await
    }

    pub async fn get(&self, id: i64) -> Result<VisitSession> {
        self.client.get(&format!("{BASE}/{id}")).await
    }

    pub async fn list(
        &self,
        pageable: &Pageable,
        search: Option<&str>,
    ) -> Result<Page<VisitSession>> {
        let endpoint = pageable.endpoint(BASE, &[("search", search.unwrap_or_default())]);
        self.client.get(&endpoint).await
    }

    pub async fn for_patient(&self, patient_id: i64) -> Result<Vec<VisitSession>> {
        self.client
            .get(&format!("{BASE}/patient/{patient_id}"))
            .await
    }

    pub async fn update(&self, id: i64, changes: &Map<String, Value>) -> Result<VisitSession> {
        self.client.put(&format!("{BASE}/{id}"), changes).await
    }

    pub async fn mark_fee_paid(&self, id: i64, payment: &MarkFeePaid) -> Result<VisitSession> {
        self.client
            .put(&format!("{BASE}/{id}/mark-fee-paid"), payment)
            .await
    }

    /// Deletion reports what was removed; a bare 204 yields `None`.
    pub async fn delete(&self, id: i64) -> Result<Option<DeletedVisitSession>> {
        let options = RequestOptions::new().method(Method::DELETE);
        let payload = self.client.request(&format!("{BASE}/{id}"), options).await?;
        Ok(payload.into_option())
    }
}
