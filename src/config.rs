use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::{
    entities::Endpoint,
    errors::Result,
    sender::{SenderConfig, DEFAULT_CHUNK_SIZE},
};

const APP_NAME: &str = "camdrop";
const CONFIG_FILE: &str = "config.toml";

/// Saved settings, stored as `camdrop/config.toml` in `$XDG_CONFIG_HOME`
/// (or `~/.config`), `~/Library/Application Support` on macOS and
/// `%APPDATA%` on Windows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chunk_size: usize,
    pub receive_dir: Option<PathBuf>,
    pub endpoint: Endpoint,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            receive_dir: None,
            endpoint: Endpoint::default(),
        }
    }
}

impl AppConfig {
    /// `camdrop` under the platform config directory.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let base = if cfg!(target_os = "windows") {
            env::var_os("APPDATA").map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            env::var_os("HOME")
                .map(|home| PathBuf::from(home).join("Library/Application Support"))
        } else {
            env::var_os("XDG_CONFIG_HOME").map(PathBuf::from).or_else(|| {
                env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
            })
        };
        base.map(|dir| dir.join(APP_NAME))
            .ok_or_else(|| anyhow!("No config directory found"))
    }

    pub fn config_file() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default())
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Cannot read {}", path.display())
                })
            }
        };
        toml::from_str(&text)
            .with_context(|| format!("Malformed config {}", path.display()))
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create {}", dir.display()))?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)
            .with_context(|| format!("Cannot write {}", path.display()))
    }

    pub fn sender_config(&self) -> Result<SenderConfig> {
        SenderConfig::with_chunk_size(self.chunk_size)
    }
}

/// Holds the latest committed endpoint.
///
/// The editor side commits new values; the capture side takes a copy with
/// [`EndpointEditor::current`] when a photo is saved. A transfer only ever
/// sees the copy it was started with.
#[derive(Clone, Default)]
pub struct EndpointEditor {
    current: Arc<RwLock<Endpoint>>,
}

impl EndpointEditor {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            current: Arc::new(RwLock::new(endpoint)),
        }
    }

    /// Snapshot of the latest committed endpoint.
    pub fn current(&self) -> Endpoint {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn commit(&self, endpoint: Endpoint) {
        log::debug!("endpoint set to {endpoint}");
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = endpoint;
    }

    /// Commits the raw text of a host/port form.
    ///
    /// An invalid port leaves the committed endpoint untouched.
    pub fn commit_text(&self, host: &str, port: &str) -> Result<Endpoint> {
        let endpoint = Endpoint::from_text(host, port)?;
        self.commit(endpoint.clone());
        Ok(endpoint)
    }
}
