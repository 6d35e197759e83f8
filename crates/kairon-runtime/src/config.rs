//! Runtime configuration.
//!
//! Settings come from an optional YAML file; every field has a default so
//! an empty file (or none at all) is valid. `LOG_LEVEL` and `LOG_FILE`
//! from the environment override the `logging` section. The two API keys
//! are never read from the file: [`Secrets::from_env`] loads them from the
//! environment and fails fast when either is missing.
//!
//! ```yaml
//! generation:
//!   model: gemini-2.0-flash
//!   temperature: 0.3
//!   timeout: 60s
//! search:
//!   max_results: 5
//!   search_depth: basic
//! research:
//!   max_iterations: 3
//!   min_findings: 2
//! quality:
//!   accuracy_threshold: 0.7
//! budget:
//!   max_tokens: 200000
//! logging:
//!   level: info
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::providers::secrets::{ApiCredential, GOOGLE_KEY_LABEL, TAVILY_KEY_LABEL};
use crate::providers::{CompletionConfig, SystemMessageMode, GEMINI_API_KEY_ENV};
use crate::search::{SearchOptions, TAVILY_API_KEY_ENV};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "kairon.yaml";

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required secret: {0}")]
    MissingSecret(String),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Generation backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Registry name of the provider
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    pub system_message: SystemMessageMode,
    pub base_url: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        let completion = CompletionConfig::default();
        Self {
            provider: "gemini".to_string(),
            model: completion.model,
            max_tokens: completion.max_tokens,
            temperature: completion.temperature,
            timeout: completion.timeout,
            system_message: completion.system_message,
            base_url: None,
        }
    }
}

impl GenerationSettings {
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            system_message: self.system_message,
        }
    }

    /// Settings handed to the provider factory. Carries no credentials.
    pub fn provider_json(&self) -> JsonValue {
        let mut json = serde_json::json!({ "model": self.model });
        if let Some(url) = &self.base_url {
            json["base_url"] = JsonValue::String(url.clone());
        }
        json
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchSettings {
    pub max_iterations: usize,
    /// Findings after which the loop may stop early
    pub min_findings: usize,
    /// Deadline for one whole run; unset means none
    #[serde(with = "duration_serde::option")]
    pub run_timeout: Option<Duration>,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            min_findings: 2,
            run_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    pub accuracy_threshold: f64,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            accuracy_threshold: kairon_core::DEFAULT_ACCURACY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSettings {
    /// Token cap across every generation call of a run; unset means none
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KaironConfig {
    pub generation: GenerationSettings,
    pub search: SearchOptions,
    pub research: ResearchSettings,
    pub quality: QualitySettings,
    pub budget: BudgetSettings,
    pub logging: LoggingSettings,
}

impl KaironConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Load configuration for a run.
    ///
    /// An explicit path must exist. Without one, `kairon.yaml` in the
    /// working directory is used when present. Environment overrides are
    /// applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `LOG_LEVEL` and `LOG_FILE` from `lookup`. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.logging.level = level.trim().to_lowercase();
        }
        if let Some(file) = lookup("LOG_FILE").filter(|v| !v.trim().is_empty()) {
            self.logging.file = Some(PathBuf::from(file.trim()));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.research.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "research.max_iterations must be at least 1".to_string(),
            ));
        }

        let threshold = self.quality.accuracy_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "quality.accuracy_threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Invalid(format!(
                "generation.temperature must be within [0, 2], got {}",
                self.generation.temperature
            )));
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::Invalid(
                "search.max_results must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// The two API keys every run needs.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub google_api_key: ApiCredential,
    pub tavily_api_key: ApiCredential,
}

impl Secrets {
    /// Load both keys from the environment, failing on the first missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&serde_json::json!({}))
    }

    /// Load both keys, preferring `google_api_key`/`tavily_api_key` in
    /// `overrides` over the environment.
    pub fn load(overrides: &JsonValue) -> Result<Self, ConfigError> {
        Self::load_with_env(overrides, GEMINI_API_KEY_ENV, TAVILY_API_KEY_ENV)
    }

    fn load_with_env(
        overrides: &JsonValue,
        google_env: &str,
        tavily_env: &str,
    ) -> Result<Self, ConfigError> {
        let resolve = |key: &str, env_var: &str, label: &'static str| {
            ApiCredential::resolve(overrides, key, env_var, label)
                .map_err(|e| ConfigError::MissingSecret(e.to_string()))
        };

        Ok(Self {
            google_api_key: resolve("google_api_key", google_env, GOOGLE_KEY_LABEL)?,
            tavily_api_key: resolve("tavily_api_key", tavily_env, TAVILY_KEY_LABEL)?,
        })
    }
}

/// Serde adapter for human-readable durations such as `60s` or `1m 30s`.
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            duration: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match duration {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| humantime::parse_duration(&text).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
