#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use clinic_client::auth::{
    Credentials, MemorySessionStore, Navigator, SessionKey, SessionStore, StoreError,
};
use clinic_client::client::ApiClient;
use clinic_client::config::ClientConfig;

/// Records every redirect it is asked to perform.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().expect("navigator lock poisoned").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self, route: &str) {
        self.routes
            .lock()
            .expect("navigator lock poisoned")
            .push(route.to_string());
    }
}

/// In-memory store that counts removals and can be told to fail writes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemorySessionStore,
    removes: AtomicUsize,
    fail_writes: bool,
}

impl CountingStore {
    pub fn with_credentials(access_token: &str, refresh_token: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemorySessionStore::with_credentials(&Credentials {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
            }),
            ..Self::default()
        })
    }

    pub fn read_only(access_token: &str, refresh_token: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemorySessionStore::with_credentials(&Credentials {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
            }),
            fail_writes: true,
            ..Self::default()
        })
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn value(&self, key: SessionKey) -> Option<String> {
        self.inner.get(key).expect("memory store read")
    }
}

impl SessionStore for CountingStore {
    fn get(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("read-only".to_string()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

/// An unsigned JWT whose `exp` is `expires_in` seconds from now.
pub fn jwt(expires_in: i64) -> String {
    let exp = Utc::now().timestamp() + expires_in;
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"sub":"nurse1"}}"#));
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.sig")
}

/// JSON body returned by the login and refresh endpoints.
pub fn session_body(access_token: &str, refresh_token: &str) -> serde_json::Value {
    serde_json::json!({
        "accessToken": access_token,
        "refreshToken": refresh_token,
        "tokenType": "Bearer",
        "username": "nurse1",
        "firstName": "Grace",
        "lastName": "Auma",
        "roles": ["NURSE"],
        "passwordChangeRequired": false
    })
}

pub fn client_for(
    base_url: &str,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
) -> ApiClient {
    ApiClient::new(ClientConfig::builder().base_url(base_url).build())
        .expect("client builds")
        .with_store(store)
        .with_navigator(navigator)
}
