//! chromatone configuration
//!
//! Optional TOML file with the bind port, audio device and startup defaults.
//! Missing keys fall back to defaults; out-of-range values are clamped.

use crate::audio::generator::NoiseKind;
use crate::error::{Error, Result};
use crate::playback::session::{DEFAULT_VOLUME, MAX_TIMER_MINUTES};
use serde::Deserialize;
use std::path::Path;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5750;

/// Player configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP control port
    pub port: u16,
    /// Output device name (None = system default)
    pub audio_device: Option<String>,
    /// Noise kind selected at startup
    pub default_noise: NoiseKind,
    /// Volume at startup, 0.0-1.0
    pub default_volume: f32,
    /// Auto-stop timer armed at startup, whole minutes
    pub timer_minutes: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            audio_device: None,
            default_noise: NoiseKind::White,
            default_volume: DEFAULT_VOLUME,
            timer_minutes: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let mut config: Config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

        config.default_volume = config.default_volume.clamp(0.0, 1.0);
        config.timer_minutes = config.timer_minutes.map(|m| m.min(MAX_TIMER_MINUTES));
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.default_noise, NoiseKind::White);
        assert_eq!(config.default_volume, DEFAULT_VOLUME);
        assert!(config.audio_device.is_none());
        assert!(config.timer_minutes.is_none());
    }

    #[test]
    fn test_load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 6000\naudio_device = \"pipewire\"\ndefault_noise = \"brown\"\ndefault_volume = 0.5\ntimer_minutes = 30"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.audio_device.as_deref(), Some("pipewire"));
        assert_eq!(config.default_noise, NoiseKind::Brown);
        assert_eq!(config.default_volume, 0.5);
        assert_eq!(config.timer_minutes, Some(30));
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_noise = \"pink\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.default_noise, NoiseKind::Pink);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.default_volume, DEFAULT_VOLUME);
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_volume = 3.5\ntimer_minutes = 1000").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.default_volume, 1.0);
        assert_eq!(config.timer_minutes, Some(MAX_TIMER_MINUTES));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = Config::load(Path::new("/nonexistent/chromatone.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_noise = \"plaid\"").unwrap();
        assert!(matches!(Config::load(file.path()), Err(Error::Config(_))));
    }
}
