use serde::{Deserialize, Serialize};

use crate::duration::Duration;
use crate::error::ConfigError;

/// Parameters shared by tokenization, training and generation.
///
/// Built once (from defaults, a JSON file, or command line flags) and handed
/// to each component by reference. A trained model is only valid together
/// with the `time_step` and `window_len` it was trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Length of one grid step in quarter notes
    pub time_step: Duration,
    /// Number of tokens of context the predictor sees
    pub window_len: usize,
    /// Note and rest lengths a piece may use; pieces with others are skipped
    pub acceptable_durations: Vec<Duration>,
    /// Transpose every piece to C major / A minor before tokenizing
    pub normalize_key: bool,
    pub temperature: f64,
    /// Maximum number of tokens sampled per melody
    pub step_budget: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    /// Seed for sampling and training; `None` draws from the OS
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let d = |n, m| Duration::new(n, m).unwrap_or(Duration::QUARTER);
        Config {
            time_step: Duration::SIXTEENTH,
            window_len: 64,
            acceptable_durations: vec![
                d(1, 4),
                d(1, 2),
                d(3, 4),
                d(1, 1),
                d(3, 2),
                d(2, 1),
                d(3, 1),
                d(4, 1),
            ],
            normalize_key: true,
            temperature: 0.5,
            step_budget: 500,
            batch_size: 64,
            learning_rate: 0.001,
            epochs: 50,
            seed: None,
        }
    }
}

impl Config {
    /// Load from JSON; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_step.is_zero() {
            return Err(ConfigError::ZeroTimeStep);
        }
        if self.window_len == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.acceptable_durations.is_empty() {
            return Err(ConfigError::NoAcceptableDurations);
        }
        for &duration in &self.acceptable_durations {
            if duration.steps_of(self.time_step).is_none() {
                return Err(ConfigError::IncompatibleDuration {
                    duration,
                    step: self.time_step,
                });
            }
        }
        Ok(())
    }

    pub fn is_acceptable(&self, duration: Duration) -> bool {
        self.acceptable_durations.contains(&duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_len, 64);
        assert_eq!(config.acceptable_durations.len(), 8);
        assert!(config.is_acceptable(Duration::new(3, 4).unwrap()));
        assert!(!config.is_acceptable(Duration::new(1, 8).unwrap()));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{"window_len": 16, "time_step": 0.5, "acceptable_durations": ["1/2", 1]}"#).unwrap();
        assert_eq!(config.window_len, 16);
        assert_eq!(config.time_step, Duration::new(1, 2).unwrap());
        assert_eq!(config.acceptable_durations, vec![Duration::new(1, 2).unwrap(), Duration::QUARTER]);
        assert_eq!(config.step_budget, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.window_len = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroWindow));

        let mut config = Config::default();
        config.temperature = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTemperature(0.0)));

        let mut config = Config::default();
        config.time_step = Duration::new(1, 2).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompatibleDuration { .. })
        ));
    }
}
