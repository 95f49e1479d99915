//! Configuration module
//!
//! Resolves run settings from flags, `KOCHA_*` variables and config files.

mod env;
mod file;

pub use env::EnvConfig;
pub use file::ConfigFile;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::SetupError;
use crate::output::OutputFormat;

/// Parse a timeout: a bare integer is milliseconds, anything else goes
/// through `humantime` (`2s`, `1m 30s`, `250ms`).
pub fn parse_timeout(value: &str) -> Result<Duration, SetupError> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(value).map_err(|_| SetupError::InvalidTimeout(value.to_string()))
}

/// Values given on the command line
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub timeout: Option<String>,
    pub retries: Option<u32>,
    pub format: Option<String>,
    pub no_color: bool,
    pub require: Vec<String>,
    pub patterns: Vec<String>,
}

/// Fully resolved settings for one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Root timeout; `None` keeps the built-in default
    pub timeout: Option<Duration>,
    /// Root retries; `None` keeps the built-in default
    pub retries: Option<u32>,
    pub format: OutputFormat,
    pub colorize: bool,
    pub require: Vec<String>,
    pub patterns: Vec<String>,
}

impl Settings {
    /// Merge the sources, flag > environment > file > default
    pub fn resolve(
        cli: &Overrides,
        env: &EnvConfig,
        file: &ConfigFile,
    ) -> Result<Self, SetupError> {
        let timeout = cli
            .timeout
            .as_deref()
            .or(env.timeout.as_deref())
            .or(file.timeout.as_deref())
            .map(parse_timeout)
            .transpose()?;

        let retries = cli.retries.or(env.retries).or(file.retries);

        let format = match cli
            .format
            .as_deref()
            .or(env.format.as_deref())
            .or(file.format.as_deref())
        {
            Some(name) => OutputFormat::from_str(name)
                .ok_or_else(|| SetupError::UnknownFormat(name.to_string()))?,
            None => OutputFormat::Spec,
        };

        let colorize = if cli.no_color || env.no_color == Some(true) {
            false
        } else {
            file.color.unwrap_or(true)
        };

        let mut require = file.require.clone();
        for name in &cli.require {
            if !require.contains(name) {
                require.push(name.clone());
            }
        }

        let patterns = if cli.patterns.is_empty() {
            file.spec.clone()
        } else {
            cli.patterns.clone()
        };

        let settings = Self {
            timeout,
            retries,
            format,
            colorize,
            require,
            patterns,
        };
        debug!("Resolved settings: {:?}", settings);
        Ok(settings)
    }
}

/// Load the config file named by the flag or `KOCHA_CONFIG`, or the first
/// one found in the standard locations.
pub fn load_config(explicit: Option<&Path>, env: &EnvConfig) -> Result<ConfigFile> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| env.config_file.as_ref().map(PathBuf::from));

    match explicit {
        Some(path) if !path.exists() => Err(SetupError::ConfigNotFound(path).into()),
        Some(path) => ConfigFile::load(&path),
        None => ConfigFile::load_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("500").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_timeout("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_timeout("1m 30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_timeout(" 0 ").unwrap(), Duration::ZERO);

        let err = parse_timeout("later").unwrap_err();
        assert!(matches!(err, SetupError::InvalidTimeout(ref v) if v == "later"));
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let settings = Settings::resolve(
            &Overrides::default(),
            &EnvConfig::default(),
            &ConfigFile::default(),
        )
        .unwrap();

        assert_eq!(settings.timeout, None);
        assert_eq!(settings.retries, None);
        assert_eq!(settings.format, OutputFormat::Spec);
        assert!(settings.colorize);
        assert!(settings.patterns.is_empty());
    }

    #[test]
    fn test_precedence() {
        let file = ConfigFile {
            timeout: Some("10s".to_string()),
            retries: Some(1),
            format: Some("summary".to_string()),
            spec: vec!["*".to_string()],
            require: vec!["root-hooks".to_string()],
            ..Default::default()
        };
        let env = EnvConfig {
            timeout: Some("5s".to_string()),
            retries: Some(2),
            ..Default::default()
        };
        let cli = Overrides {
            timeout: Some("100".to_string()),
            patterns: vec!["simple-*".to_string()],
            require: vec!["root-hooks".to_string()],
            ..Default::default()
        };

        let settings = Settings::resolve(&cli, &env, &file).unwrap();
        assert_eq!(settings.timeout, Some(Duration::from_millis(100)));
        assert_eq!(settings.retries, Some(2));
        assert_eq!(settings.format, OutputFormat::Summary);
        assert_eq!(settings.patterns, vec!["simple-*"]);
        assert_eq!(settings.require, vec!["root-hooks"]);
    }

    #[test]
    fn test_color_switches() {
        let file = ConfigFile {
            color: Some(true),
            ..Default::default()
        };
        let env = EnvConfig {
            no_color: Some(true),
            ..Default::default()
        };
        let settings = Settings::resolve(&Overrides::default(), &env, &file).unwrap();
        assert!(!settings.colorize);
    }

    #[test]
    fn test_unknown_format() {
        let cli = Overrides {
            format: Some("xml".to_string()),
            ..Default::default()
        };
        let err = Settings::resolve(&cli, &EnvConfig::default(), &ConfigFile::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown output format: xml");
    }

    #[test]
    fn test_missing_explicit_config() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");

        let err = load_config(Some(&missing), &EnvConfig::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn test_config_from_env_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ci.json");
        std::fs::write(&path, r#"{"retries": 4}"#).unwrap();

        let env = EnvConfig {
            config_file: Some(path.display().to_string()),
            ..Default::default()
        };
        assert_eq!(load_config(None, &env).unwrap().retries, Some(4));
    }
}
