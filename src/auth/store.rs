use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::error::StoreError;
use super::token::{Credentials, SessionProfile};

/// Fixed keys of the durable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum SessionKey {
    AccessToken,
    RefreshToken,
    User,
}

impl SessionKey {
    pub const ALL: [SessionKey; 3] = [
        SessionKey::AccessToken,
        SessionKey::RefreshToken,
        SessionKey::User,
    ];
}

/// Durable key-value storage for the signed-in session.
///
/// Implementations only provide `get`/`set`/`remove`; the credential and
/// profile helpers are built on top of them.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: SessionKey) -> Result<Option<String>, StoreError>;
    fn set(&self, key: SessionKey, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: SessionKey) -> Result<(), StoreError>;

    fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.get(SessionKey::AccessToken)
    }

    fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.get(SessionKey::RefreshToken)
    }

    fn save_credentials(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.set(SessionKey::AccessToken, &credentials.access_token)?;
        self.set(SessionKey::RefreshToken, &credentials.refresh_token)
    }

    /// Store the token pair and the serialized profile.
    fn save_profile(&self, profile: &SessionProfile) -> Result<(), StoreError> {
        self.save_credentials(&profile.credentials())?;
        self.set(SessionKey::User, &serde_json::to_string(profile)?)
    }

    fn profile(&self) -> Result<Option<SessionProfile>, StoreError> {
        match self.get(SessionKey::User)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Remove every session key. All keys are attempted even if one fails;
    /// the first failure is returned.
    fn clear_session(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for key in SessionKey::ALL {
            if let Err(err) = self.remove(key) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<SessionKey, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: &Credentials) -> Self {
        let mut entries = HashMap::new();
        entries.insert(SessionKey::AccessToken, credentials.access_token.clone());
        entries.insert(SessionKey::RefreshToken, credentials.refresh_token.clone());
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionKey, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("session store lock poisoned".to_string()))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        Ok(self.entries()?.get(&key).cloned())
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), StoreError> {
        self.entries()?.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
        self.entries()?.remove(&key);
        Ok(())
    }
}

/// Configuration for file-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub base_dir: PathBuf,
}

impl SessionStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_clinic_dir()
    }
}

/// File-backed session store using one TOML file per profile.
///
/// # Example
/// ```no_run
/// use clinic_client::auth::{Credentials, FileSessionStore, SessionStore};
///
/// let store = FileSessionStore::new_default();
/// store.save_credentials(&Credentials {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
/// })?;
/// # Ok::<(), clinic_client::auth::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_dir: PathBuf,
    profile: String,
}

impl FileSessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
            profile: "default".to_string(),
        }
    }

    pub fn new_default() -> Self {
        Self::new(SessionStoreConfig::new(default_clinic_dir()))
    }

    /// Keep a separate session per backend, e.g. "staging".
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = normalize_label(&profile.into());
        self
    }

    pub fn path(&self) -> PathBuf {
        let name = if self.profile == "default" {
            "session.toml".to_string()
        } else {
            format!("session.{}.toml", self.profile)
        };
        self.base_dir.join(name)
    }

    fn read(&self) -> Result<SessionFile, StoreError> {
        let raw = match fs::read_to_string(self.path()) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionFile::default())
            }
            Err(err) => return Err(err.into()),
        };
        Ok(toml::from_str(&raw)?)
    }

    fn write(&self, mut file: SessionFile) -> Result<(), StoreError> {
        let path = self.path();
        if file.entries.is_empty() {
            return match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            };
        }
        ensure_parent(&path)?;
        file.version = SESSION_FILE_VERSION;
        file.saved_at = Some(Utc::now());
        fs::write(&path, toml::to_string(&file)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        Ok(self.read()?.entries.remove(key.as_ref()))
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), StoreError> {
        let mut file = self.read()?;
        file.entries.insert(key.to_string(), value.to_string());
        self.write(file)
    }

    fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
        let mut file = self.read()?;
        if file.entries.remove(key.as_ref()).is_none() {
            return Ok(());
        }
        self.write(file)
    }
}

const SESSION_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub(crate) fn default_clinic_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".clinic"))
        .unwrap_or_else(|| PathBuf::from(".clinic"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
