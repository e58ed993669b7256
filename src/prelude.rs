//! Convenience re-exports for common use.

pub use crate::auth::{
    FileSessionStore, MemorySessionStore, Navigator, SessionProfile, SessionStore,
};
pub use crate::client::{ApiClient, Payload, RequestOptions};
pub use crate::config::ClientConfig;
pub use crate::error::{ApiError, ErrorCode, Result};
pub use crate::resources::{Page, Pageable};
