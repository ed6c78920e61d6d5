//! Persisted local settings: the signed-in username and an optional API base
//! override, stored as a flat YAML map.

use std::{
    collections::BTreeMap,
    fs,
    io,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use thiserror::Error;
use url::Url;

pub const USERNAME_KEY: &str = "whatsapp_username";
pub const API_BASE_KEY: &str = "whatsapp_api_base";
pub const DEFAULT_API_BASE: &str = "https://cdcapi.onrender.com/api/";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Settings file {path:?} is not a valid key/value map: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("'{0}' is not an absolute http:// or https:// URL")]
    InvalidApiBase(String),
}

/// Minimal string key/value store.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;
    fn remove(&mut self, key: &str) -> Result<(), SettingsError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        self.values.remove(key);
        Ok(())
    }
}

/// YAML-backed store; every change rewrites the whole file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self, SettingsError> {
        let values = match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                serde_yaml::from_str(&contents).map_err(|source| SettingsError::Format {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("Settings file {path:?} not found; starting empty");
                BTreeMap::new()
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), SettingsError> {
        let contents = serde_yaml::to_string(&self.values).map_err(|source| {
            SettingsError::Format {
                path: self.path.clone(),
                source,
            }
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, contents).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

pub fn is_valid_api_base(value: &str) -> bool {
    let trimmed = value.trim();
    (trimmed.starts_with("http://") || trimmed.starts_with("https://"))
        && Url::parse(trimmed).is_ok()
}

/// Base URL for API calls: the override when it is a valid absolute URL,
/// the built-in default otherwise. Always ends with `/`.
pub fn resolve_api_base(override_value: Option<&str>) -> String {
    let chosen = match override_value {
        Some(value) if is_valid_api_base(value) => value.trim(),
        Some(value) => {
            warn!("Ignoring invalid API base override '{value}'; using {DEFAULT_API_BASE}");
            DEFAULT_API_BASE
        }
        None => DEFAULT_API_BASE,
    };
    if chosen.ends_with('/') {
        chosen.to_string()
    } else {
        format!("{chosen}/")
    }
}

pub fn stored_username<S: SettingsStore + ?Sized>(store: &S) -> Option<String> {
    store
        .get(USERNAME_KEY)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Validates and stores an API base override, returning the resolved base.
pub fn store_api_base<S: SettingsStore + ?Sized>(
    store: &mut S,
    value: &str,
) -> Result<String, SettingsError> {
    if !is_valid_api_base(value) {
        return Err(SettingsError::InvalidApiBase(value.to_string()));
    }
    store.set(API_BASE_KEY, value.trim())?;
    Ok(resolve_api_base(Some(value)))
}
