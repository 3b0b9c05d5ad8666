// Pipeline settings: the core Config plus where each artifact lives on disk

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use melody_core::Config;

/// Locations of the dataset and every artifact the pipeline produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Directory searched recursively for `.krn` / `.mid` files
    pub dataset_dir: PathBuf,
    /// One tokenized file per usable piece
    pub encoded_dir: PathBuf,
    pub corpus_file: PathBuf,
    pub vocabulary_file: PathBuf,
    pub model_file: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            dataset_dir: PathBuf::from("dataset"),
            encoded_dir: PathBuf::from("encoded"),
            corpus_file: PathBuf::from("corpus.txt"),
            vocabulary_file: PathBuf::from("vocabulary.json"),
            model_file: PathBuf::from("model.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub config: Config,
    pub paths: Paths,
}

impl Settings {
    /// Defaults, overlaid with a JSON settings file when one is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the core parameters before any work starts
    pub fn validate(&self) -> Result<()> {
        self.config.validate().context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use melody_core::Duration;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_json(
            r#"{
                "window_len": 32,
                "time_step": "1/8",
                "paths": { "dataset_dir": "essen/europa" }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.config.window_len, 32);
        assert_eq!(settings.config.time_step, Duration::new(1, 8).unwrap());
        assert_eq!(settings.config.temperature, 0.5);
        assert_eq!(settings.paths.dataset_dir, PathBuf::from("essen/europa"));
        assert_eq!(settings.paths.model_file, PathBuf::from("model.json"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = Settings::from_json(r#"{ "batch_size": 0 }"#).unwrap();
        assert!(settings.validate().is_err());
        assert!(Settings::from_json("{ not json").is_err());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Settings::load(Some(Path::new("/no/such/settings.json"))).unwrap_err();
        assert!(format!("{:#}", err).contains("/no/such/settings.json"));
    }
}
