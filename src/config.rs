use crate::error::{TalkError, TalkResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at an alternate config file
pub const CONFIG_ENV: &str = "TALKASMIC_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    // Devices
    /// Substrings identifying a virtual cable output, matched case-insensitively
    pub virtual_cable_patterns: Vec<String>,
    /// Preferred primary device name; overrides the cable heuristic when present
    pub primary_device: Option<String>,
    /// Monitor device name; no monitoring when unset
    pub monitor_device: Option<String>,

    // Speech
    pub voice: Option<String>,
    pub rate: i32,
    pub volume: i32,
    pub espeak_binary: String,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            virtual_cable_patterns: vec![
                "CABLE Input".to_string(),
                "VB-Audio".to_string(),
                "Virtual Cable".to_string(),
            ],
            primary_device: None,
            monitor_device: None,
            voice: None,
            rate: 0,
            volume: 100,
            espeak_binary: "espeak-ng".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// A config file that could not be parsed and was replaced by defaults
///
/// Loading happens before logging is set up, so the caller reports this.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub reason: String,
    /// Where the unreadable file now lives, if moving it succeeded
    pub backup: Option<PathBuf>,
}

impl Config {
    /// Load config from an explicit path
    ///
    /// A missing file yields defaults. A corrupt file is moved aside to
    /// `*.json.corrupt` and defaults are used.
    pub fn load_from(path: &Path) -> TalkResult<(Self, Option<Recovered>)> {
        if !path.exists() {
            return Ok((Self::default(), None));
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok((config, None)),
            Err(e) => {
                let backup_path = path.with_extension("json.corrupt");
                let backup = std::fs::rename(path, &backup_path).ok().map(|_| backup_path);
                let recovered = Recovered {
                    reason: e.to_string(),
                    backup,
                };
                Ok((Self::default(), Some(recovered)))
            }
        }
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &Path) -> TalkResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that can never be valid, independent of any engine
    pub fn validate(&self) -> TalkResult<()> {
        if self.espeak_binary.trim().is_empty() {
            return Err(TalkError::Config("espeak_binary must not be empty".into()));
        }
        Ok(())
    }
}

/// Config file location, honouring `TALKASMIC_CONFIG`
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("talkasmic")
        .join("config.json")
}
