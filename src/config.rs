// Application configuration - RON file in the platform config directory

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "euclid_beats";
const CONFIG_FILE: &str = "config.ron";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),
}

/// Runtime settings. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rate the voice buffers are synthesised at when no device is open
    pub sample_rate: u32,
    pub capture_sample_rate: u32,
    /// Upper bound on one microphone recording
    pub capture_max_seconds: u32,
    /// How long stopping a recording waits for the capture thread
    pub capture_stop_timeout_ms: u64,
    pub playback_queue_capacity: usize,
    pub event_queue_capacity: usize,
    pub state_path: PathBuf,
    pub recordings_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            sample_rate: 44100,
            capture_sample_rate: 44100,
            capture_max_seconds: 10,
            capture_stop_timeout_ms: 200,
            playback_queue_capacity: 64,
            event_queue_capacity: 256,
            state_path: data_dir.join("state.json"),
            recordings_dir: data_dir,
        }
    }
}

impl AppConfig {
    /// `<config_dir>/euclid_beats/config.ron`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(ron::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load from the default location, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            log::debug!("No config directory on this platform, using defaults");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => {
                log::debug!("Config loaded from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Could not read {}: {}. Using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Maximum number of mono samples one recording may hold
    pub fn capture_max_samples(&self) -> usize {
        self.capture_sample_rate as usize * self.capture_max_seconds as usize
    }

    pub fn capture_stop_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_stop_timeout_ms)
    }

    pub fn recording_path(&self, voice_name: &str) -> PathBuf {
        self.recordings_dir.join(format!("mic_rec_{}.wav", voice_name))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}
