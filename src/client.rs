//! Authenticated JSON-over-HTTP client.
//!
//! # Design
//! `ApiClient` owns its configuration and the three collaborators it talks
//! to: a [`Transport`], a [`SessionStore`] and a [`Navigator`]. All are
//! injected, so tests swap in fakes instead of relying on ambient globals.
//!
//! One call to [`ApiClient::request`] makes at most two attempts. The first
//! attempt may refresh a near-expiry access token before sending; a 401 on
//! the first attempt triggers one refresh and one retry. A failed refresh
//! clears the stored session, notifies the navigator and fails with
//! `AUTH_EXPIRED`.

use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::auth::navigator::{Navigator, NoopNavigator};
use crate::auth::service::AuthApi;
use crate::auth::store::{MemorySessionStore, SessionKey, SessionStore};
use crate::auth::token::{needs_refresh, Credentials, SessionProfile};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::json::{parse_tolerant, JsonRepairError};
use crate::resources::main_exams::MainExamsApi;
use crate::resources::patients::PatientsApi;
use crate::resources::visit_sessions::VisitSessionsApi;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

/// Result of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    Content(T),
    /// The server answered 204; no body was read.
    NoContent,
}

impl<T> Payload<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Payload::Content(value) => Some(value),
            Payload::NoContent => None,
        }
    }

    pub fn is_no_content(&self) -> bool {
        matches!(self, Payload::NoContent)
    }
}

/// Method, extra headers and pre-serialized body for one call.
///
/// # Example
/// ```
/// use clinic_client::client::RequestOptions;
/// use reqwest::Method;
///
/// let options = RequestOptions::new()
///     .method(Method::PUT)
///     .header("X-Clinic-Branch", "kampala")
///     .body(r#"{"status":"COMPLETED"}"#);
/// assert_eq!(options.resolved_method(), Method::PUT);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a header. Names or values that are not valid HTTP are dropped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(header = name, "Dropping invalid header"),
        }
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> serde_json::Result<Self> {
        Ok(self.body(serde_json::to_string(body)?))
    }

    /// Explicit method, else POST with a body and GET without.
    pub fn resolved_method(&self) -> Method {
        match (&self.method, &self.body) {
            (Some(method), _) => method.clone(),
            (None, Some(_)) => Method::POST,
            (None, None) => Method::GET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    /// Sent once after a 401-triggered refresh. Never refreshes again.
    Retry,
}

impl Attempt {
    fn number(self) -> u8 {
        match self {
            Attempt::First => 1,
            Attempt::Retry => 2,
        }
    }
}

/// Client for the clinic records API.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use clinic_client::auth::FileSessionStore;
/// use clinic_client::client::ApiClient;
/// use clinic_client::config::ClientConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new(ClientConfig::from_env())?
///     .with_store(Arc::new(FileSessionStore::new_default()));
/// let patient: serde_json::Value = client.get("/patients/7").await?;
/// println!("{patient}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("transport", &"..")
            .field("store", &"..")
            .field("navigator", &"..")
            .finish()
    }
}

impl ApiClient {
    /// Client with a reqwest transport, an in-memory session and no navigator.
    pub fn new(config: ClientConfig) -> std::result::Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
            store: Arc::new(MemorySessionStore::new()),
            navigator: Arc::new(NoopNavigator),
        })
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn patients(&self) -> PatientsApi<'_> {
        PatientsApi::new(self)
    }

    pub fn visit_sessions(&self) -> VisitSessionsApi<'_> {
        VisitSessionsApi::new(self)
    }

    pub fn main_exams(&self) -> MainExamsApi<'_> {
        MainExamsApi::new(self)
    }

    /// Perform one authenticated call against `endpoint` (path plus query,
    /// relative to the base URL).
    ///
    /// Resolves to [`Payload::NoContent`] for 204 responses. Every failure,
    /// including an unreachable backend, is an [`ApiError`].
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Payload<T>> {
        let mut attempt = Attempt::First;
        loop {
            let request = self.prepare(endpoint, &options, attempt).await?;
            debug!(
                endpoint,
                method = %request.method,
                attempt = attempt.number(),
                "Sending request"
            );
            let response = self.send(endpoint, request).await?;
            debug!(endpoint, status = response.status.as_u16(), "Received response");

            if response.status == StatusCode::UNAUTHORIZED && attempt == Attempt::First {
                if let Some(refresh_token) = self.stored(SessionKey::RefreshToken) {
                    self.refresh_or_expire(endpoint, &refresh_token).await?;
                    attempt = Attempt::Retry;
                    continue;
                }
            }

            return finish(endpoint, response);
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let payload = self.request(endpoint, RequestOptions::new()).await?;
        expect_content(endpoint, payload)
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, endpoint, body).await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, endpoint, body).await
    }

    pub async fn patch<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, endpoint, body).await
    }

    /// DELETE; any JSON body the server sends back is discarded.
    pub async fn delete(&self, endpoint: &str) -> Result<()> {
        self.request::<serde_json::Value>(endpoint, RequestOptions::new().method(Method::DELETE))
            .await
            .map(|_| ())
    }

    async fn send_json<B, T>(&self, method: Method, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::new()
            .method(method)
            .json(body)
            .map_err(|e| ApiError::invalid_request(endpoint, e))?;
        let payload = self.request(endpoint, options).await?;
        expect_content(endpoint, payload)
    }

    /// Send without a bearer token and without any refresh handling.
    pub(crate) async fn send_public<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Payload<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::invalid_request(endpoint, e))?;
        let request = HttpRequest {
            method,
            url: self.config.url_for(endpoint),
            headers: json_headers(),
            body,
        };
        let response = self.send(endpoint, request).await?;
        finish(endpoint, response)
    }

    /// Exchange a refresh token for a new session profile.
    ///
    /// A plain POST with no retry of its own.
    pub(crate) async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<SessionProfile> {
        let endpoint = self.config.refresh_endpoint.as_str();
        let body = serde_json::json!({ "refreshToken": refresh_token });
        let payload = self
            .send_public(Method::POST, endpoint, Some(&body))
            .await?;
        expect_content(endpoint, payload)
    }

    async fn prepare(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        attempt: Attempt,
    ) -> Result<HttpRequest> {
        let mut headers = json_headers();
        for name in options.headers.keys() {
            headers.remove(name);
            for value in options.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        if let Some(token) = self.stored(SessionKey::AccessToken) {
            let lookahead = self.config.refresh_lookahead();
            let bearer = if attempt == Attempt::First && needs_refresh(&token, Utc::now(), lookahead)
            {
                match self.stored(SessionKey::RefreshToken) {
                    Some(refresh_token) => {
                        debug!(endpoint, "Access token near expiry; refreshing before send");
                        self.refresh_or_expire(endpoint, &refresh_token)
                            .await?
                            .access_token
                    }
                    None => token,
                }
            } else {
                token
            };
            match HeaderValue::from_str(&format!("Bearer {bearer}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!(endpoint, "Stored access token is not a valid header value"),
            }
        }

        Ok(HttpRequest {
            method: options.resolved_method(),
            url: self.config.url_for(endpoint),
            headers,
            body: options.body.clone(),
        })
    }

    async fn send(&self, endpoint: &str, request: HttpRequest) -> Result<HttpResponse> {
        self.transport.send(request).await.map_err(|err| match err {
            TransportError::Unreachable(cause) => {
                error!(
                    endpoint,
                    base_url = %self.config.base_url,
                    %cause,
                    "Backend unreachable"
                );
                ApiError::unreachable(endpoint, &self.config.base_url, &cause)
            }
        })
    }

    /// Refresh and persist the token pair, or end the session.
    async fn refresh_or_expire(&self, endpoint: &str, refresh_token: &str) -> Result<Credentials> {
        let profile = match self.exchange_refresh_token(refresh_token).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!(endpoint, error = %err, "Token refresh failed");
                return Err(self.expire_session(endpoint));
            }
        };

        let credentials = profile.credentials();
        if let Err(err) = self.store.save_credentials(&credentials) {
            warn!(endpoint, error = %err, "Could not persist refreshed tokens");
            return Err(self.expire_session(endpoint));
        }
        info!(endpoint, "Access token refreshed");
        Ok(credentials)
    }

    fn expire_session(&self, endpoint: &str) -> ApiError {
        if let Err(err) = self.store.clear_session() {
            warn!(error = %err, "Failed to clear stored session");
        }
        warn!(endpoint, route = %self.config.login_route, "Session expired; redirecting to login");
        self.navigator.redirect_to_login(&self.config.login_route);
        ApiError::auth_expired(endpoint)
    }

    /// Read a session key; an unreadable store counts as an absent key.
    fn stored(&self, key: SessionKey) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!(%key, error = %err, "Session store read failed");
                None
            }
        }
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Map a received response to the call's outcome.
fn finish<T: DeserializeOwned>(endpoint: &str, response: HttpResponse) -> Result<Payload<T>> {
    let status = response.status;
    if !status.is_success() {
        return Err(ApiError::from_error_response(status, endpoint, &response.body));
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(Payload::NoContent);
    }

    let code = status.as_u16();
    let text = response
        .body
        .map_err(|e| ApiError::parse(code, endpoint, e))?;
    if text.trim().is_empty() {
        return Err(ApiError::parse(code, endpoint, JsonRepairError::Empty));
    }
    let value = parse_tolerant(&text).map_err(|e| ApiError::parse(code, endpoint, e))?;
    serde_json::from_value(value)
        .map(Payload::Content)
        .map_err(|e| ApiError::parse(code, endpoint, e))
}

pub(crate) fn expect_content<T>(endpoint: &str, payload: Payload<T>) -> Result<T> {
    match payload {
        Payload::Content(value) => Ok(value),
        Payload::NoContent => Err(ApiError::parse(
            StatusCode::NO_CONTENT.as_u16(),
            endpoint,
            "expected a response body but the server sent 204 No Content",
        )),
    }
}
