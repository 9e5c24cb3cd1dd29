//! Settings collaborator: opaque key-value persistence keyed by string
//! paths (`user-settings`, `auth.<platform>`).
//!
//! The engine consumes [`UserSettings`] at initialization and persists
//! platform auth changes as side effects of settings commands. Two
//! implementations: a JSON file store for the binary and an in-memory
//! store for tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::PlatformId;

/// Store key holding the user settings document.
pub const USER_SETTINGS_KEY: &str = "user-settings";

/// Store key holding one platform's credentials.
pub fn auth_key(platform: PlatformId) -> String {
    format!("auth.{platform}")
}

/// Settings persistence errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backing file could not be read or written.
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The backing document is not valid JSON.
    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The local user's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Display name shown as the sender of locally authored messages.
    pub name: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "User".to_string(),
        }
    }
}

/// Per-platform settings: the enabled flag plus inline credentials
/// (token, api_id, …) captured by the setup flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    /// Whether the user has enabled this platform.
    pub enabled: bool,
    /// Credential key/value pairs stored inline with the settings.
    #[serde(flatten)]
    pub credentials: BTreeMap<String, String>,
}

/// The persisted user settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Local user profile.
    pub user: UserProfile,
    /// Per-platform settings keyed by platform id string.
    pub platforms: BTreeMap<String, PlatformSettings>,
}

impl UserSettings {
    /// Look up one platform's settings.
    pub fn platform(&self, platform: PlatformId) -> Option<&PlatformSettings> {
        self.platforms.get(platform.as_str())
    }

    /// Whether a platform is enabled. Unlisted platforms are disabled.
    pub fn is_enabled(&self, platform: PlatformId) -> bool {
        self.platform(platform).is_some_and(|p| p.enabled)
    }
}

/// Opaque key-value settings persistence.
pub trait SettingsStore: Send + Sync {
    /// Read the user settings document, defaulting when absent.
    fn get_user_settings(&self) -> Result<UserSettings, SettingsError>;

    /// Replace the user settings document.
    fn save_user_settings(&self, settings: &UserSettings) -> Result<(), SettingsError>;

    /// Read one platform's stored credentials, empty when absent.
    fn get_platform_auth(
        &self,
        platform: PlatformId,
    ) -> Result<BTreeMap<String, String>, SettingsError>;

    /// Replace one platform's stored credentials.
    fn save_platform_auth(
        &self,
        platform: PlatformId,
        auth: &BTreeMap<String, String>,
    ) -> Result<(), SettingsError>;

    /// Remove one platform's stored credentials.
    fn clear_platform_auth(&self, platform: PlatformId) -> Result<(), SettingsError>;
}

// ── Document helpers shared by both stores ──────────────────────

fn read_user_settings(doc: &Map<String, Value>) -> Result<UserSettings, SettingsError> {
    match doc.get(USER_SETTINGS_KEY) {
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Ok(UserSettings::default()),
    }
}

fn read_platform_auth(
    doc: &Map<String, Value>,
    platform: PlatformId,
) -> Result<BTreeMap<String, String>, SettingsError> {
    match doc.get(&auth_key(platform)) {
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Ok(BTreeMap::new()),
    }
}

/// JSON file-backed settings store.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the given file. The file is created on
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default settings path under the user's config directory, or the
    /// working directory when no home is available.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "unichat")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("unichat-settings.json"))
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let value: Value = serde_json::from_str(&contents)?;
                match value {
                    Value::Object(map) => Ok(map),
                    _ => Ok(Map::new()),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, doc: &Map<String, Value>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&Value::Object(doc.clone()))?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn update(
        &self,
        mutate: impl FnOnce(&mut Map<String, Value>) -> Result<(), SettingsError>,
    ) -> Result<(), SettingsError> {
        let mut doc = self.load()?;
        mutate(&mut doc)?;
        self.store(&doc)
    }
}

impl SettingsStore for JsonFileStore {
    fn get_user_settings(&self) -> Result<UserSettings, SettingsError> {
        read_user_settings(&self.load()?)
    }

    fn save_user_settings(&self, settings: &UserSettings) -> Result<(), SettingsError> {
        self.update(|doc| {
            doc.insert(
                USER_SETTINGS_KEY.to_string(),
                serde_json::to_value(settings)?,
            );
            Ok(())
        })
    }

    fn get_platform_auth(
        &self,
        platform: PlatformId,
    ) -> Result<BTreeMap<String, String>, SettingsError> {
        read_platform_auth(&self.load()?, platform)
    }

    fn save_platform_auth(
        &self,
        platform: PlatformId,
        auth: &BTreeMap<String, String>,
    ) -> Result<(), SettingsError> {
        self.update(|doc| {
            doc.insert(auth_key(platform), serde_json::to_value(auth)?);
            Ok(())
        })
    }

    fn clear_platform_auth(&self, platform: PlatformId) -> Result<(), SettingsError> {
        self.update(|doc| {
            doc.remove(&auth_key(platform));
            Ok(())
        })
    }
}

/// In-memory settings store for tests.
#[derive(Default)]
pub struct MemoryStore {
    doc: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with a settings document.
    pub fn with_settings(settings: &UserSettings) -> Self {
        let store = Self::new();
        if let Ok(value) = serde_json::to_value(settings) {
            store.doc().insert(USER_SETTINGS_KEY.to_string(), value);
        }
        store
    }

    fn doc(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        self.doc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SettingsStore for MemoryStore {
    fn get_user_settings(&self) -> Result<UserSettings, SettingsError> {
        read_user_settings(&self.doc())
    }

    fn save_user_settings(&self, settings: &UserSettings) -> Result<(), SettingsError> {
        let value = serde_json::to_value(settings)?;
        self.doc().insert(USER_SETTINGS_KEY.to_string(), value);
        Ok(())
    }

    fn get_platform_auth(
        &self,
        platform: PlatformId,
    ) -> Result<BTreeMap<String, String>, SettingsError> {
        read_platform_auth(&self.doc(), platform)
    }

    fn save_platform_auth(
        &self,
        platform: PlatformId,
        auth: &BTreeMap<String, String>,
    ) -> Result<(), SettingsError> {
        let value = serde_json::to_value(auth)?;
        self.doc().insert(auth_key(platform), value);
        Ok(())
    }

    fn clear_platform_auth(&self, platform: PlatformId) -> Result<(), SettingsError> {
        self.doc().remove(&auth_key(platform));
        Ok(())
    }
}
