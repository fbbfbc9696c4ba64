//! Persisted configuration.
//!
//! The on-disk format is a small versioned JSON document. The loader reads
//! the two most recent schema versions plus a deprecated unversioned layout
//! that only carried the shell size. Unknown schema versions are an error at
//! this boundary; callers log it and fall back to defaults so a corrupt
//! file can never take the show down.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{
    Config, ConfigUpdate, Quality, SkyLighting, MAX_SHELL_SIZE, MIN_SHELL_SIZE,
};

pub const SCHEMA_VERSION: &str = "1.2";

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Parse(serde_json::Error),
    /// Schema version the loader does not understand.
    UnknownSchema(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "config file I/O failed: {}", e),
            StoreError::Parse(e) => write!(f, "config file is not valid JSON: {}", e),
            StoreError::UnknownSchema(v) => {
                write!(f, "unrecognized config schema version {:?}", v)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Parse(e) => Some(e),
            StoreError::UnknownSchema(_) => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Parse(e)
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedFile {
    #[serde(rename = "schemaVersion")]
    schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<PersistedData>,
    /// Deprecated v1 layout: the size lived in its own JSON-encoded string.
    #[serde(
        rename = "configSize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    config_size: Option<String>,
}

#[derive(Serialize, Deserialize, Default)]
struct PersistedData {
    #[serde(default)]
    quality: Option<u8>,
    #[serde(default)]
    size: Option<f32>,
    #[serde(rename = "skyLighting", default)]
    sky_lighting: Option<u8>,
    #[serde(rename = "scaleFactor", default)]
    scale_factor: Option<f32>,
}

/// Default config file location: `$XDG_CONFIG_HOME/pyroterm/config.json`,
/// falling back to `~/.config`.
pub fn default_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("pyroterm").join("config.json"))
}

/// Read persisted configuration as a partial update over the defaults.
///
/// `Ok(None)` means no file exists. Restored values are validated and
/// silently dropped when out of range rather than clamped; a corrupt value
/// should not be normalized into a plausible-looking one.
pub fn load(path: &Path) -> Result<Option<ConfigUpdate>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let file: PersistedFile = serde_json::from_str(&raw)?;

    match file.schema_version.as_str() {
        "1.1" | "1.2" => {
            let data = file.data.unwrap_or_default();
            let mut update = ConfigUpdate {
                quality: data.quality.and_then(Quality::from_level),
                size: data.size.filter(|s| (MIN_SHELL_SIZE..=MAX_SHELL_SIZE).contains(s)),
                sky_lighting: data.sky_lighting.and_then(SkyLighting::from_level),
                ..Default::default()
            };
            if file.schema_version == "1.2" {
                update.scale_factor = data.scale_factor.filter(|s| (0.1..=5.0).contains(s));
            }
            info!(schema = %file.schema_version, "loaded config");
            Ok(Some(update))
        }
        "1" => Ok(Some(load_legacy(file.config_size.as_deref()))),
        other => Err(StoreError::UnknownSchema(other.to_string())),
    }
}

/// The deprecated format stored a single JSON-encoded size. Parse failures
/// and out-of-range values are recovered here; the rest of the config keeps
/// its defaults.
fn load_legacy(config_size: Option<&str>) -> ConfigUpdate {
    let mut update = ConfigUpdate::default();
    let Some(raw) = config_size else {
        return update;
    };
    let size = match serde_json::from_str::<f64>(raw) {
        Ok(size) => size,
        Err(e) => {
            warn!(error = %e, "recovered from error parsing legacy config size");
            return update;
        }
    };
    let size = size as i64;
    if (0..=4).contains(&size) {
        update.size = Some(size as f32);
        info!(size, "restored legacy config size");
    }
    update
}

/// Persist the current configuration at the newest schema version.
pub fn save(path: &Path, config: &Config) -> Result<(), StoreError> {
    let file = PersistedFile {
        schema_version: SCHEMA_VERSION.to_string(),
        data: Some(PersistedData {
            quality: Some(config.quality.level()),
            size: Some(config.size),
            sky_lighting: Some(config.sky_lighting.level()),
            scale_factor: Some(config.scale_factor),
        }),
        config_size: None,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellSelector;

    fn sample_config() -> Config {
        Config {
            quality: Quality::High,
            size: 3.0,
            shell: ShellSelector::Random,
            auto_launch: true,
            finale: false,
            sky_lighting: SkyLighting::Dim,
            scale_factor: 0.75,
            hide_controls: false,
            long_exposure: false,
        }
    }

    #[test]
    fn round_trip_preserves_persisted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = sample_config();
        save(&path, &config).unwrap();

        let update = load(&path).unwrap().expect("file should exist");
        assert_eq!(update.quality, Some(Quality::High));
        assert_eq!(update.size, Some(3.0));
        assert_eq!(update.sky_lighting, Some(SkyLighting::Dim));
        assert_eq!(update.scale_factor, Some(0.75));

        let mut restored = Config::device_defaults(80);
        restored.apply(&update);
        assert_eq!(restored.quality, config.quality);
        assert_eq!(restored.size, config.size);
        assert_eq!(restored.sky_lighting, config.sky_lighting);
        assert_eq!(restored.scale_factor, config.scale_factor);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn v11_loads_without_scale_factor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"schemaVersion":"1.1","data":{"quality":1,"size":2.0,"skyLighting":0}}"#,
        )
        .unwrap();
        let update = load(&path).unwrap().unwrap();
        assert_eq!(update.quality, Some(Quality::Low));
        assert_eq!(update.size, Some(2.0));
        assert_eq!(update.sky_lighting, Some(SkyLighting::None));
        assert_eq!(update.scale_factor, None);
    }

    #[test]
    fn legacy_size_is_restored_when_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"schemaVersion":"1","configSize":"3"}"#).unwrap();
        let update = load(&path).unwrap().unwrap();
        assert_eq!(update.size, Some(3.0));
        assert_eq!(update.quality, None);
    }

    #[test]
    fn corrupt_legacy_size_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"schemaVersion":"1","configSize":"abc"}"#).unwrap();
        let update = load(&path).unwrap().unwrap();
        assert_eq!(update.size, None);
    }

    #[test]
    fn out_of_range_legacy_size_is_discarded_not_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"schemaVersion":"1","configSize":"9"}"#).unwrap();
        let update = load(&path).unwrap().unwrap();
        assert_eq!(update.size, None);
    }

    #[test]
    fn unknown_schema_version_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"schemaVersion":"9.9","data":{}}"#).unwrap();
        assert!(matches!(
            load(&path),
            Err(StoreError::UnknownSchema(v)) if v == "9.9"
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(StoreError::Parse(_))));
    }

    #[test]
    fn out_of_range_values_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"schemaVersion":"1.2","data":{"quality":7,"size":40.0,"skyLighting":9,"scaleFactor":100.0}}"#,
        )
        .unwrap();
        let update = load(&path).unwrap().unwrap();
        assert_eq!(update.quality, None);
        assert_eq!(update.size, None);
        assert_eq!(update.sky_lighting, None);
        assert_eq!(update.scale_factor, None);
    }
}
