//! Configuration system for RandForge.
//!
//! Load randomization settings from TOML or YAML files to control seeding,
//! solver timeouts and soft constraint weights without code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use randforge_config::RandomizeConfig;
//! use std::time::Duration;
//!
//! let config = RandomizeConfig::from_toml_str(r#"
//!     random_seed = 7
//!
//!     [solver]
//!     timeout_ms = 2000
//!
//!     [weights]
//!     declared = 500
//! "#).unwrap();
//!
//! assert_eq!(config.random_seed, Some(7));
//! assert_eq!(config.timeout(), Some(Duration::from_millis(2000)));
//! assert_eq!(config.weights().declared, 500);
//! assert_eq!(config.weights().uniformity, 1);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use randforge_config::RandomizeConfig;
//!
//! let config = RandomizeConfig::load("randforge.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::path::Path;
use std::time::Duration;

use randforge_core::Weights;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main randomization configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RandomizeConfig {
    /// Random seed for reproducible stimulus. Seeded from the OS if absent.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Solver settings.
    #[serde(default)]
    pub solver: SolverSettings,

    /// Soft constraint weight tiers.
    #[serde(default)]
    pub weights: WeightConfig,

    /// Per-bit bias settings.
    #[serde(default)]
    pub bias: BiasConfig,
}

impl RandomizeConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that declared soft constraints outweigh the uniformity bias.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weights.declared <= self.weights.uniformity {
            return Err(ConfigError::Invalid(format!(
                "declared weight {} must exceed uniformity weight {}",
                self.weights.declared, self.weights.uniformity
            )));
        }
        if self.solver.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "solver timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the solver timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.solver.timeout_ms = Some(timeout_ms);
        self
    }

    /// Enables or disables the per-bit bias on integer variables.
    pub fn with_integer_bias(mut self, enabled: bool) -> Self {
        self.bias.integers = enabled;
        self
    }

    /// Returns the solver timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.solver.timeout_ms.map(Duration::from_millis)
    }

    /// Weight tiers in the form the randomizer expects.
    pub fn weights(&self) -> Weights {
        Weights {
            uniformity: self.weights.uniformity,
            declared: self.weights.declared,
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SolverSettings {
    /// Per-solve timeout in milliseconds. Unlimited if absent.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Soft constraint weights.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WeightConfig {
    /// Weight of each per-bit uniformity goal.
    #[serde(default = "default_uniformity")]
    pub uniformity: u32,

    /// Weight of each declared soft constraint.
    #[serde(default = "default_declared")]
    pub declared: u32,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            uniformity: default_uniformity(),
            declared: default_declared(),
        }
    }
}

fn default_uniformity() -> u32 {
    Weights::default().uniformity
}

fn default_declared() -> u32 {
    Weights::default().declared
}

/// Per-bit bias settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BiasConfig {
    /// Bias integer and boolean variables towards uniform bit patterns.
    /// Floats are always biased.
    #[serde(default = "default_true")]
    pub integers: bool,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self { integers: true }
    }
}

fn default_true() -> bool {
    true
}
