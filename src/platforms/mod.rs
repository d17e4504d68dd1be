//! Built-in platforms
//!
//! Registered by [`default_platforms`] in the order nodejs, python, dotnet.
//! That order is the auto-detection precedence.

mod dotnet;
mod nodejs;
mod python;

pub use dotnet::{DotNetDetector, DotNetPlatform};
pub use nodejs::{NodeDetector, NodePlatform};
pub use python::{PythonDetector, PythonPlatform};

use crate::config::GeneratorConfig;
use crate::platform::Platform;
use crate::settings::EnvironmentSettings;
use std::sync::Arc;

pub fn default_platforms(
    config: &GeneratorConfig,
    settings: Arc<dyn EnvironmentSettings>,
) -> Vec<Arc<dyn Platform>> {
    vec![
        Arc::new(NodePlatform::new(config.nodejs.clone(), Arc::clone(&settings))),
        Arc::new(PythonPlatform::new(config.python.clone(), Arc::clone(&settings))),
        Arc::new(DotNetPlatform::new(
            config.dotnet.clone(),
            config.publish_dir.clone(),
            settings,
        )),
    ]
}

/// Single-quotes a value for bash.
pub(crate) fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '-' | '_'))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
