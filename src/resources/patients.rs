use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::pagination::{Page, Pageable};
use crate::client::ApiClient;
use crate::error::Result;

const BASE: &str = "/patients";

/// A registered patient. Demographic fields beyond the names are kept in
/// `details` as sent by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    #[serde(default)]
    pub patient_number: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct PatientsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> PatientsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, pageable: &Pageable) -> Result<Page<Patient>> {
        self.client.get(&pageable.endpoint(BASE, &[])).await
    }

    /// Every patient, newest first, unpaged.
    pub async fn list_latest(&self) -> Result<Vec<Patient>> {
        self.client.get(&format!("{BASE}/all")).await
    }

    /// Backend search over names, numbers and phone; a blank query lists all.
    pub async fn search(&self, query: &str, pageable: &Pageable) -> Result<Page<Patient>> {
        let endpoint = pageable.endpoint(&format!("{BASE}/search"), &[("query", query.trim())]);
        self.client.get(&endpoint).await
    }

    pub async fn get(&self, id: i64) -> Result<Patient> {
        self.client.get(&format!("{BASE}/{id}")).await
    }

    pub async fn create(&self, patient: &NewPatient) -> Result<Patient> {
        self.client.post(BASE, patient).await
    }

    /// Send only the fields to change.
    pub async fn update(&self, id: i64, changes: &Map<String, Value>) -> Result<Patient> {
        self.client.put(&format!("{BASE}/{id}"), changes).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("{BASE}/{id}")).await
    }
}
