//! Persistent user preferences (currently only the colour theme).
//!
//! The store is initialised from a JSON file, publishes changes through a
//! `watch` channel and writes every change straight back to disk. A missing
//! or unreadable file is not an error: the defaults apply and the file is
//! created on the first change.

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Directory under the platform config dir.
pub const APP_DIR: &str = "pdftools";
pub const FILE_NAME: &str = "preferences.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}' (expected light or dark)")),
        }
    }
}

/// On-disk shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
}

/// Observable, write-through preference store.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    // Serialises read-modify-write of the file.
    write_lock: Mutex<()>,
    tx: watch::Sender<Preferences>,
}

impl PreferenceStore {
    /// Open the store at `path`, reading the current preferences if present.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let prefs = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring malformed preferences at {}: {}", path.display(), e);
                Preferences::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => {
                warn!("Cannot read preferences at {}: {}", path.display(), e);
                Preferences::default()
            }
        };
        debug!("Preferences loaded from {}: theme={}", path.display(), prefs.theme);
        let (tx, _) = watch::channel(prefs);
        Self {
            path,
            write_lock: Mutex::new(()),
            tx,
        }
    }

    /// Open the store at `<config dir>/pdftools/preferences.json`.
    pub fn load_default() -> Result<Self, WorkflowError> {
        let path = default_path().ok_or_else(|| {
            WorkflowError::InvalidConfig("no configuration directory on this platform".into())
        })?;
        Ok(Self::load(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn theme(&self) -> Theme {
        self.tx.borrow().theme
    }

    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.tx.subscribe()
    }

    /// Flip the theme and persist it. Returns the new theme.
    pub fn toggle(&self) -> Result<Theme, WorkflowError> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    /// Persist `theme`, then publish it.
    pub fn set_theme(&self, theme: Theme) -> Result<(), WorkflowError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut prefs = self.tx.borrow().clone();
        prefs.theme = theme;
        self.persist(&prefs)?;
        self.tx.send_replace(prefs);
        debug!("Theme set to {}", theme);
        Ok(())
    }

    fn persist(&self, prefs: &Preferences) -> Result<(), WorkflowError> {
        let write_err = |source: std::io::Error| WorkflowError::OutputWriteFailed {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_vec_pretty(prefs)
            .map_err(|e| WorkflowError::Internal(format!("serialise preferences: {e}")))?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

/// `<config dir>/pdftools/preferences.json`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(FILE_NAME))
}
