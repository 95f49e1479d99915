//! Environment variable configuration
//!
//! `KOCHA_*` variables override the config file and are overridden by flags.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "KOCHA";

/// Configuration read from environment variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Timeout from KOCHA_TIMEOUT
    pub timeout: Option<String>,
    /// Retries from KOCHA_RETRIES
    pub retries: Option<u32>,
    /// Output format from KOCHA_FORMAT
    pub format: Option<String>,
    /// Config file from KOCHA_CONFIG
    pub config_file: Option<String>,
    /// KOCHA_NO_COLOR
    pub no_color: Option<bool>,
    /// KOCHA_VERBOSE
    pub verbose: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));

        Self {
            timeout: get("TIMEOUT"),
            retries: get("RETRIES").and_then(|v| v.parse().ok()),
            format: get("FORMAT"),
            config_file: get("CONFIG"),
            no_color: get("NO_COLOR").map(|v| parse_bool(&v)),
            verbose: get("VERBOSE").map(|v| parse_bool(&v)),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.timeout.is_some()
            || self.retries.is_some()
            || self.format.is_some()
            || self.config_file.is_some()
            || self.no_color.is_some()
            || self.verbose.is_some()
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}
