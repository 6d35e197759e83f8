//! API keys for the generation and search services.
//!
//! A key is wrapped in a `secrecy::SecretString` as soon as it is read. It is
//! redacted in `Debug` and `Display`, zeroed on drop, and only readable
//! through [`ApiCredential::expose`] at the point where a request is built.
//!
//! ```ignore
//! use kairon_runtime::providers::secrets::{ApiCredential, GOOGLE_KEY_LABEL};
//!
//! let key = ApiCredential::from_env("GOOGLE_API_KEY", GOOGLE_KEY_LABEL)?;
//! request.header("x-goog-api-key", key.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::ProviderError;

pub const GOOGLE_KEY_LABEL: &str = "Google API key";
pub const TAVILY_KEY_LABEL: &str = "Tavily API key";

/// Where a key was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// A JSON override, e.g. provider configuration
    Override,
    Environment,
    /// Passed directly to a constructor
    Inline,
}

impl fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match self {
            KeyOrigin::Override => "override",
            KeyOrigin::Environment => "environment",
            KeyOrigin::Inline => "inline",
        };
        f.write_str(origin)
    }
}

/// An API key that never shows up in logs.
pub struct ApiCredential {
    value: SecretString,
    origin: KeyOrigin,
    label: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, origin: KeyOrigin, label: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            origin,
            label,
        }
    }

    pub fn inline(value: impl Into<String>, label: &'static str) -> Self {
        Self::new(value, KeyOrigin::Inline, label)
    }

    /// Read `env_var`. Unset and blank values are both errors naming it.
    pub fn from_env(env_var: &str, label: &'static str) -> Result<Self, ProviderError> {
        read_env(env_var)
            .map(|value| Self::new(value, KeyOrigin::Environment, label))
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("{} missing: set {}", label, env_var))
            })
    }

    /// Read `key` from `overrides`, falling back to `env_var`.
    pub fn resolve(
        overrides: &JsonValue,
        key: &str,
        env_var: &str,
        label: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(value) = read_override(overrides, key) {
            return Ok(Self::new(value, KeyOrigin::Override, label));
        }
        if let Some(value) = read_env(env_var) {
            return Ok(Self::new(value, KeyOrigin::Environment, label));
        }
        Err(ProviderError::NotConfigured(format!(
            "{} missing: set {} (or '{}' in provider config)",
            label, env_var, key
        )))
    }

    /// Whether [`resolve`](Self::resolve) would succeed, without reading the key.
    pub fn is_set(overrides: &JsonValue, key: &str, env_var: &str) -> bool {
        read_override(overrides, key).is_some() || read_env(env_var).is_some()
    }

    /// The raw key. Use only when building a request; never store it.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// True for an inline key built from an empty string.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().trim().is_empty()
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

fn read_override<'a>(overrides: &'a JsonValue, key: &str) -> Option<&'a str> {
    overrides[key].as_str().filter(|v| !v.trim().is_empty())
}

fn read_env(env_var: &str) -> Option<String> {
    std::env::var(env_var).ok().filter(|v| !v.trim().is_empty())
}

// SecretString is not Clone; copy through an explicit exposure.
impl Clone for ApiCredential {
    fn clone(&self) -> Self {
        Self::new(self.expose(), self.origin, self.label)
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("label", &self.label)
            .field("origin", &self.origin)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, [REDACTED])", self.label, self.origin)
    }
}
