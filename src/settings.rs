//! Environment settings consulted by platforms
//!
//! Settings are an opaque key/value lookup. Build properties passed on the
//! command line (`-p KEY=VALUE`) shadow process environment variables.

use std::collections::BTreeMap;
use std::env;

#[cfg_attr(test, mockall::automock)]
pub trait EnvironmentSettings: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Parses a setting as a flag. `true`, `1` and `yes` are truthy.
pub fn get_bool(settings: &dyn EnvironmentSettings, key: &str) -> bool {
    settings
        .get(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Setting that switches a platform off, e.g. `DISABLE_NODEJS_BUILD`.
pub fn disable_key(platform: &str) -> String {
    let name: String = platform
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("DISABLE_{}_BUILD", name)
}

pub fn is_platform_disabled(settings: &dyn EnvironmentSettings, platform: &str) -> bool {
    get_bool(settings, &disable_key(platform))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl EnvironmentSettings for ProcessEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

#[derive(Debug, Default, Clone)]
pub struct StaticEnvironment {
    values: BTreeMap<String, String>,
}

impl StaticEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Parses `KEY=VALUE` pairs. A pair without `=` is an error.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut settings = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid property '{}', expected KEY=VALUE", pair))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("Invalid property '{}', key is empty", pair));
            }
            settings.insert(key, value.trim());
        }
        Ok(settings)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl EnvironmentSettings for StaticEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Properties first, then the fallback provider.
pub struct LayeredEnvironment<F: EnvironmentSettings = ProcessEnvironment> {
    properties: StaticEnvironment,
    fallback: F,
}

impl LayeredEnvironment<ProcessEnvironment> {
    pub fn over_process(properties: StaticEnvironment) -> Self {
        Self::new(properties, ProcessEnvironment)
    }
}

impl<F: EnvironmentSettings> LayeredEnvironment<F> {
    pub fn new(properties: StaticEnvironment, fallback: F) -> Self {
        Self {
            properties,
            fallback,
        }
    }
}

impl<F: EnvironmentSettings> EnvironmentSettings for LayeredEnvironment<F> {
    fn get(&self, key: &str) -> Option<String> {
        self.properties.get(key).or_else(|| self.fallback.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_disable_key() {
        assert_eq!(disable_key("nodejs"), "DISABLE_NODEJS_BUILD");
        assert_eq!(disable_key("dotnet-core"), "DISABLE_DOTNET_CORE_BUILD");
    }

    #[test]
    fn test_is_platform_disabled_consults_provider() {
        let mut settings = MockEnvironmentSettings::new();
        settings
            .expect_get()
            .with(eq("DISABLE_PYTHON_BUILD"))
            .times(1)
            .returning(|_| Some("True".to_string()));

        assert!(is_platform_disabled(&settings, "python"));
    }

    #[test]
    fn test_get_bool_values() {
        let settings = StaticEnvironment::new()
            .with("A", "1")
            .with("B", "yes")
            .with("C", "false")
            .with("D", "");
        assert!(get_bool(&settings, "A"));
        assert!(get_bool(&settings, "B"));
        assert!(!get_bool(&settings, "C"));
        assert!(!get_bool(&settings, "D"));
        assert!(!get_bool(&settings, "MISSING"));
    }

    #[test]
    fn test_from_pairs() {
        let settings = StaticEnvironment::from_pairs(["KEY=value", "OTHER = a=b "]).unwrap();
        assert_eq!(settings.get("KEY"), Some("value".to_string()));
        assert_eq!(settings.get("OTHER"), Some("a=b".to_string()));

        assert!(StaticEnvironment::from_pairs(["novalue"]).is_err());
        assert!(StaticEnvironment::from_pairs(["=x"]).is_err());
    }

    #[test]
    fn test_layered_prefers_properties() {
        let mut fallback = MockEnvironmentSettings::new();
        fallback
            .expect_get()
            .with(eq("ONLY_ENV"))
            .returning(|_| Some("env".to_string()));

        let layered = LayeredEnvironment::new(StaticEnvironment::new().with("BOTH", "prop"), fallback);
        assert_eq!(layered.get("BOTH"), Some("prop".to_string()));
        assert_eq!(layered.get("ONLY_ENV"), Some("env".to_string()));
    }
}
