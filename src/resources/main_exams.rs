use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::pagination::{normalize_page, Page, Pageable};
use crate::client::ApiClient;
use crate::error::{ApiError, Result};

const BASE: &str = "/main-exams";

/// The doctor's main eye examination for a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainExam {
    pub id: i64,
    pub visit_session_id: i64,
    #[serde(default)]
    pub iop_right: Option<f64>,
    #[serde(default)]
    pub iop_left: Option<f64>,
    #[serde(default)]
    pub time_completed: Option<String>,
    #[serde(flatten)]
    pub findings: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMainExam {
    pub visit_session_id: i64,
    #[serde(flatten)]
    pub findings: Map<String, Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct MainExamsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> MainExamsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, exam: &NewMainExam) -> Result<MainExam> {
        self.client.post(BASE, exam).await
    }

    pub async fn get(&self, id: i64) -> Result<MainExam> {
        self.client.get(&format!("{BASE}/{id}")).await
    }

    pub async fn for_visit_session(&self, visit_session_id: i64) -> Result<MainExam> {
        self.client
            .get(&format!("{BASE}/visit-session/{visit_session_id}"))
            .await
    }

    /// Lists exams. Older backends answer with a bare array; either shape
    /// comes back as a page.
    pub async fn list(&self, pageable: &Pageable) -> Result<Page<MainExam>> {
        let endpoint = pageable.endpoint(BASE, &[]);
        let raw: Value = self.client.get(&endpoint).await?;
        normalize_page(raw, pageable).map_err(|e| ApiError::parse(200, &endpoint, e))
    }

    pub async fn update(&self, id: i64, exam: &NewMainExam) -> Result<MainExam> {
        self.client.put(&format!("{BASE}/{id}"), exam).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("{BASE}/{id}")).await
    }
}
