use crate::version::resolve_max_satisfying;
use std::env;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PUBLISH_DIR: &str = "out";

const NODEJS_VERSIONS: &[&str] = &["16.20.2", "18.19.1", "20.11.1", "22.3.0"];
const NODEJS_DEFAULT: &str = "20";
const PYTHON_VERSIONS: &[&str] = &["3.8.18", "3.9.19", "3.10.14", "3.11.9", "3.12.4"];
const PYTHON_DEFAULT: &str = "3.11";
const DOTNET_VERSIONS: &[&str] = &["3.1.32", "6.0.31", "7.0.20", "8.0.6"];
const DOTNET_DEFAULT: &str = "8.0";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Versions one built-in platform offers and the version used when a
/// repository does not pin one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformVersions {
    pub supported: Vec<String>,
    pub default_version: String,
}

impl PlatformVersions {
    fn from_env(prefix: &str, supported: &[&str], default_version: &str) -> Self {
        let supported = env::var(format!("BUILDSCRIPT_{}_VERSIONS", prefix))
            .ok()
            .map(|list| parse_version_list(&list))
            .unwrap_or_else(|| supported.iter().map(|v| v.to_string()).collect());

        let default_version = env::var(format!("BUILDSCRIPT_{}_DEFAULT_VERSION", prefix))
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default_version.to_string());

        Self {
            supported,
            default_version,
        }
    }

    fn validate(&self, platform: &str) -> Result<(), ConfigError> {
        if self.supported.is_empty() {
            return Err(ConfigError::ValidationFailed(format!(
                "{} must support at least one version",
                platform
            )));
        }

        for version in &self.supported {
            if !is_full_version(version) {
                return Err(ConfigError::ParseError {
                    field: format!("{} supported versions", platform),
                    error: format!("'{}' is not a dotted numeric version", version),
                });
            }
        }

        if resolve_max_satisfying(&self.default_version, &self.supported).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "{} default version '{}' matches none of: {}",
                platform,
                self.default_version,
                self.supported.join(", ")
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub log_level: String,
    pub log_json: bool,
    /// Directory build output is published into by fragments that produce artifacts.
    pub publish_dir: String,
    pub nodejs: PlatformVersions,
    pub python: PlatformVersions,
    pub dotnet: PlatformVersions,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let log_level = env::var("BUILDSCRIPT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let log_json = env::var("BUILDSCRIPT_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        let publish_dir = env::var("BUILDSCRIPT_PUBLISH_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PUBLISH_DIR.to_string());

        Self {
            log_level,
            log_json,
            publish_dir,
            nodejs: PlatformVersions::from_env("NODEJS", NODEJS_VERSIONS, NODEJS_DEFAULT),
            python: PlatformVersions::from_env("PYTHON", PYTHON_VERSIONS, PYTHON_DEFAULT),
            dotnet: PlatformVersions::from_env("DOTNET", DOTNET_VERSIONS, DOTNET_DEFAULT),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if self.publish_dir.contains("..") {
            return Err(ConfigError::ValidationFailed(
                "Publish directory must stay inside the repository".to_string(),
            ));
        }

        self.nodejs.validate("nodejs")?;
        self.python.validate("python")?;
        self.dotnet.validate("dotnet")?;

        Ok(())
    }
}

fn parse_version_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_full_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "BUILDSCRIPT_LOG_LEVEL",
            "BUILDSCRIPT_LOG_JSON",
            "BUILDSCRIPT_PUBLISH_DIR",
            "BUILDSCRIPT_NODEJS_VERSIONS",
            "BUILDSCRIPT_NODEJS_DEFAULT_VERSION",
            "BUILDSCRIPT_PYTHON_VERSIONS",
            "BUILDSCRIPT_PYTHON_DEFAULT_VERSION",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_are_valid() {
        clear_env();
        let config = GeneratorConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert_eq!(config.publish_dir, "out");
        assert_eq!(config.nodejs.default_version, "20");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_version_list_override() {
        clear_env();
        env::set_var("BUILDSCRIPT_NODEJS_VERSIONS", " 18.0.0, 20.1.0 ,");
        env::set_var("BUILDSCRIPT_NODEJS_DEFAULT_VERSION", "18");
        let config = GeneratorConfig::default();
        clear_env();

        assert_eq!(config.nodejs.supported, vec!["18.0.0", "20.1.0"]);
        assert_eq!(config.nodejs.default_version, "18");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_default_version_must_be_supported() {
        clear_env();
        env::set_var("BUILDSCRIPT_PYTHON_DEFAULT_VERSION", "2.7");
        let config = GeneratorConfig::default();
        clear_env();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("python default version '2.7'"));
    }

    #[test]
    #[serial]
    fn test_invalid_log_level() {
        clear_env();
        env::set_var("BUILDSCRIPT_LOG_LEVEL", "LOUD");
        let config = GeneratorConfig::default();
        clear_env();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed(msg)) if msg.contains("loud")
        ));
    }

    #[test]
    fn test_non_numeric_version_rejected() {
        let versions = PlatformVersions {
            supported: vec!["lts".to_string()],
            default_version: "lts".to_string(),
        };
        assert!(matches!(
            versions.validate("nodejs"),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_empty_supported_rejected() {
        let versions = PlatformVersions {
            supported: vec![],
            default_version: "1".to_string(),
        };
        assert!(versions.validate("python").is_err());
    }
}
