use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::error::{AuthError, StoreError};
use super::store::SessionKey;
use super::token::SessionProfile;
use crate::client::{expect_content, ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::error::Result;

const LOGIN_ENDPOINT: &str = "/auth/login";

#[derive(Debug, Clone, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password_change_required: bool,
    #[serde(default)]
    pub password_changed_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Token from the reset email.
    pub reset_token: Option<String>,
    pub new_password: String,
    pub confirm_password: String,
}

/// A staff account created by an administrator. Without a `password` the
/// backend mails a setup link instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub roles: Vec<String>,
    pub department_id: i64,
    #[serde(default)]
    pub send_email_notification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Answer to a reset-token check. The backend sends `valid` as either a
/// boolean or the strings `"true"`/`"false"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    #[serde(deserialize_with = "lenient_bool")]
    pub valid: bool,
    #[serde(default)]
    pub message: String,
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::String(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
        Value::Number(n) => Ok(n.as_i64() == Some(1)),
        _ => Ok(false),
    }
}

/// Sign-in, session and password flows.
///
/// Login and refresh go out without a bearer token and never enter the
/// refresh-and-retry path; every other call is a normal authenticated
/// request.
///
/// # Example
/// ```no_run
/// use clinic_client::client::ApiClient;
/// use clinic_client::config::ClientConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new(ClientConfig::default())?;
/// let profile = client.auth().login("nurse1", "hunter2").await?;
/// println!("signed in as {}", profile.display_name());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Exchange username and password for a session and store it.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> std::result::Result<SessionProfile, AuthError> {
        let body = LoginRequest { username, password };
        let payload = self
            .client
            .send_public(Method::POST, LOGIN_ENDPOINT, Some(&body))
            .await?;
        let profile: SessionProfile = expect_content(LOGIN_ENDPOINT, payload)?;
        self.client.store().save_profile(&profile)?;
        info!(username, roles = ?profile.roles, "Signed in");
        Ok(profile)
    }

    /// Exchange a refresh token for a new session. Nothing is stored.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionProfile> {
        self.client.exchange_refresh_token(refresh_token).await
    }

    /// Forget the stored session. No request is made.
    pub fn logout(&self) -> std::result::Result<(), StoreError> {
        self.client.store().clear_session()?;
        info!("Signed out");
        Ok(())
    }

    /// The profile saved by the last login, if any.
    pub fn current_profile(&self) -> std::result::Result<Option<SessionProfile>, StoreError> {
        self.client.store().profile()
    }

    /// Replace the stored profile. Tokens are left as they are.
    pub fn update_profile(&self, profile: &SessionProfile) -> std::result::Result<(), StoreError> {
        self.client
            .store()
            .set(SessionKey::User, &serde_json::to_string(profile)?)
    }

    pub async fn change_password(
        &self,
        request: &ChangePasswordRequest,
    ) -> Result<ChangePasswordResponse> {
        self.client.post("/auth/change-password", request).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse> {
        self.client
            .post("/auth/forgot-password", &serde_json::json!({ "email": email }))
            .await
    }

    pub async fn validate_reset_token(&self, token: &str) -> Result<TokenValidation> {
        self.validate_token("/auth/validate-reset-token", token).await
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<MessageResponse> {
        self.client.post("/auth/reset-password", request).await
    }

    /// Create a staff account. The backend answers with no body.
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<()> {
        let endpoint = "/auth/create-user";
        let options = RequestOptions::new()
            .method(Method::POST)
            .json(request)
            .map_err(|e| ApiError::invalid_request(endpoint, e))?;
        self.client
            .request::<Value>(endpoint, options)
            .await
            .map(|_| ())
    }

    /// Check the token from an account-setup email.
    pub async fn validate_setup_token(&self, token: &str) -> Result<TokenValidation> {
        self.validate_token("/auth/validate-setup-token", token).await
    }

    /// Set the first password of a new account. Same body as a reset.
    pub async fn setup_password(&self, request: &ResetPasswordRequest) -> Result<MessageResponse> {
        self.client.post("/auth/setup-password", request).await
    }

    /// Echo endpoint that only answers for a valid session.
    pub async fn test_auth(&self) -> Result<Map<String, Value>> {
        self.client.get("/auth/test").await
    }

    async fn validate_token(&self, path: &str, token: &str) -> Result<TokenValidation> {
        let endpoint = format!("{path}?token={}", urlencoding::encode(token));
        self.client.get(&endpoint).await
    }
}
