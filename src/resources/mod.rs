//! Typed wrappers over a few clinic endpoints.
//!
//! Each is a thin layer over [`ApiClient`](crate::client::ApiClient): a fixed
//! path, a payload type, and nothing else.

pub mod main_exams;
pub mod pagination;
pub mod patients;
pub mod visit_sessions;

pub use main_exams::{MainExam, MainExamsApi, NewMainExam};
pub use pagination::{normalize_page, Page, Pageable};
pub use patients::{NewPatient, Patient, PatientsApi};
pub use visit_sessions::{
    DeletedVisitSession, MarkFeePaid, NewVisitSession, VisitSession, VisitSessionsApi,
};
