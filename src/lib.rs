//! Authenticated client for the clinic records API.
//!
//! Every call goes through [`ApiClient::request`](client::ApiClient::request):
//! the stored bearer token is attached (and refreshed first when it is about
//! to expire), a 401 triggers one refresh and one retry, and every failure
//! comes back as the same [`ApiError`](error::ApiError) shape.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use clinic_client::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(ClientConfig::from_env())?
//!     .with_store(Arc::new(FileSessionStore::new_default()));
//! client.auth().login("nurse1", "hunter2").await?;
//!
//! let page = client.patients().list(&Pageable::new(0, 20)).await?;
//! for patient in page.content {
//!     println!("{}", patient.full_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod json;
pub mod prelude;
pub mod resources;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;
