//! Output formatting for detection results and platform listings
//!
//! JSON and YAML are machine-readable; the human format is a short aligned
//! summary meant for terminals.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::generator::{Detection, GeneratedScript};
use crate::platform::Platform;
use crate::version::sort_descending;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

/// Serializable view of a registered platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub name: String,
    pub enabled: bool,
    pub supported_versions: Vec<String>,
}

impl PlatformInfo {
    /// Versions are listed newest first.
    pub fn new(platform: &dyn Platform, enabled: bool) -> Self {
        let mut supported_versions = platform.supported_versions().to_vec();
        sort_descending(&mut supported_versions);
        Self {
            name: platform.name().to_string(),
            enabled,
            supported_versions,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_detection(&self, detection: &Detection) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(detection)
                .context("Failed to serialize detection to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(detection).context("Failed to serialize detection to YAML")
            }
            OutputFormat::Human => Ok(Self::detection_human(detection)),
        }
    }

    pub fn format_platforms(&self, platforms: &[PlatformInfo]) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(platforms)
                .context("Failed to serialize platforms to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(platforms).context("Failed to serialize platforms to YAML")
            }
            OutputFormat::Human => Ok(Self::platforms_human(platforms)),
        }
    }

    /// Generated scripts are only offered as JSON; the other formats are
    /// the script text itself.
    pub fn format_generated_json(generated: &GeneratedScript) -> Result<String> {
        serde_json::to_string_pretty(generated).context("Failed to serialize script to JSON")
    }

    fn detection_human(detection: &Detection) -> String {
        let mut output = String::new();
        output.push_str("\u{2713} Platform Detection Result\n");
        output.push_str(&"\u{2501}".repeat(32));
        output.push_str("\n\n");
        output.push_str(&format!("Platform:  {}\n", detection.platform));
        output.push_str(&format!("Language:  {}\n", detection.language));
        output.push_str(&format!(
            "Version:   {}\n",
            detection
                .language_version
                .as_deref()
                .unwrap_or("(not detected)")
        ));
        output
    }

    fn platforms_human(platforms: &[PlatformInfo]) -> String {
        if platforms.is_empty() {
            return "No platforms registered\n".to_string();
        }

        let width = platforms.iter().map(|p| p.name.len()).max().unwrap_or(0);
        let mut output = String::new();
        for platform in platforms {
            let status = if platform.enabled { "" } else { " (disabled)" };
            output.push_str(&format!(
                "{:<width$}  {}{}\n",
                platform.name,
                platform.supported_versions.join(", "),
                status,
                width = width
            ));
        }
        output
    }
}
