use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::browse::array::DEFAULT_EXTENSIONS;
use crate::error::{AppError, Result};

/// Application configuration, deserialized from a TOML file.
///
/// Every field has a default so a missing or partial file still yields a
/// working configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the media catalog; overridden by the command-line path.
    pub library: Option<PathBuf>,
    /// Player argv; the media path is appended when a cycle starts.
    pub player: Vec<String>,
    /// Control line that asks the player to exit.
    pub quit_directive: String,
    /// File extensions admitted into the catalog, without dots.
    pub extensions: Vec<String>,
    /// Command file replayed through the input pipeline at startup.
    pub startup: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library: None,
            player: vec![
                "mplayer".into(),
                "-slave".into(),
                "-vo".into(),
                "null".into(),
                "-quiet".into(),
            ],
            quit_directive: "quit".into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            startup: None,
        }
    }
}

impl Config {
    /// Load from `path` if given, else from the default location if it
    /// exists, else fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&text)
            .map_err(|e| AppError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// `~/.config/medley/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("medley").join("config.toml"))
    }
}
