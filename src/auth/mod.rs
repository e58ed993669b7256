//! Session credentials, their storage and the sign-in flows.

pub mod error;
pub mod navigator;
pub mod service;
pub mod store;
pub mod token;

pub use error::{AuthError, StoreError};
pub use navigator::{Navigator, NoopNavigator};
pub use service::{
    AuthApi, ChangePasswordRequest, ChangePasswordResponse, CreateUserRequest, MessageResponse,
    ResetPasswordRequest, TokenValidation,
};
pub use store::{FileSessionStore, MemorySessionStore, SessionKey, SessionStore, SessionStoreConfig};
pub use token::{needs_refresh, ClaimsError, Credentials, SessionProfile, TokenClaims};
