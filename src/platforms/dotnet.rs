//! .NET platform (SDK-style project files)

use super::shell_quote;
use crate::config::PlatformVersions;
use crate::platform::{
    BuildState, DetectionResult, LanguageDetector, Platform, RequiredTools, ScriptFragment,
    ScriptRequest,
};
use crate::repo::SourceRepo;
use crate::settings::{is_platform_disabled, EnvironmentSettings};
use anyhow::{Context, Result};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const NAME: &str = "dotnet";
const PROJECT_PATTERN: &str = "*.csproj";

/// Maps a target framework moniker to a runtime version.
///
/// `netcoreapp3.1` → `3.1`, `net8.0` and `net8.0-windows` → `8.0`.
/// `netstandard*` and .NET Framework monikers (`net48`) carry no runtime.
pub fn runtime_version(moniker: &str) -> Option<String> {
    let moniker = moniker.trim().to_lowercase();
    if moniker.starts_with("netstandard") {
        return None;
    }
    let version = moniker
        .strip_prefix("netcoreapp")
        .or_else(|| moniker.strip_prefix("net"))?;
    let version = version.split('-').next()?;

    if !version.contains('.') || !version.split('.').all(|p| p.parse::<u32>().is_ok()) {
        return None;
    }
    Some(version.to_string())
}

/// First `TargetFramework`, or the first entry of `TargetFrameworks`.
fn target_framework(project_xml: &str) -> Result<Option<String>> {
    let doc = roxmltree::Document::parse(project_xml).context("Failed to parse project file")?;

    let framework = doc.descendants().find_map(|node| match node.tag_name().name() {
        "TargetFramework" => node.text().map(|t| t.trim().to_string()),
        "TargetFrameworks" => node
            .text()
            .and_then(|t| t.split(';').map(str::trim).find(|f| !f.is_empty()))
            .map(str::to_string),
        _ => None,
    });
    Ok(framework)
}

fn find_project(repo: &dyn SourceRepo) -> Result<Option<PathBuf>> {
    Ok(repo.enumerate_files(PROJECT_PATTERN, true)?.into_iter().next())
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect()
}

pub struct DotNetDetector {
    default_version: String,
}

impl DotNetDetector {
    pub fn new(default_version: impl Into<String>) -> Self {
        Self {
            default_version: default_version.into(),
        }
    }
}

impl LanguageDetector for DotNetDetector {
    fn detect(&self, repo: &dyn SourceRepo) -> Result<Option<DetectionResult>> {
        let Some(project) = find_project(repo)? else {
            return Ok(None);
        };

        let segments = path_segments(&project);
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let xml = repo.read_file(&segments)?;
        let version = target_framework(&xml)
            .with_context(|| format!("Invalid project file {}", project.display()))?
            .as_deref()
            .and_then(runtime_version)
            .unwrap_or_else(|| self.default_version.clone());

        Ok(Some(DetectionResult::with_version(NAME, version)))
    }
}

pub struct DotNetPlatform {
    versions: PlatformVersions,
    publish_dir: String,
    detector: DotNetDetector,
    settings: Arc<dyn EnvironmentSettings>,
}

impl DotNetPlatform {
    pub fn new(
        versions: PlatformVersions,
        publish_dir: String,
        settings: Arc<dyn EnvironmentSettings>,
    ) -> Self {
        let detector = DotNetDetector::new(versions.default_version.clone());
        Self {
            versions,
            publish_dir,
            detector,
            settings,
        }
    }
}

impl Platform for DotNetPlatform {
    fn name(&self) -> &str {
        NAME
    }

    fn supported_versions(&self) -> &[String] {
        &self.versions.supported
    }

    fn detect(&self, repo: &dyn SourceRepo) -> Result<Option<DetectionResult>> {
        self.detector.detect(repo)
    }

    fn is_enabled(&self, _request: &ScriptRequest<'_>) -> bool {
        !is_platform_disabled(self.settings.as_ref(), NAME)
    }

    fn generate(
        &self,
        request: &ScriptRequest<'_>,
        state: &BuildState,
    ) -> Result<Option<ScriptFragment>> {
        let Some(project) = find_project(request.repo)? else {
            return Ok(None);
        };
        let project = shell_quote(&project.to_string_lossy());
        let publish_dir = shell_quote(&self.publish_dir);

        let mut bash = String::new();
        if let Some(version) = state.resolved_version(NAME) {
            writeln!(bash, "echo \"Using .NET SDK {}\"", version)?;
        }
        writeln!(bash, "dotnet restore {}", project)?;
        writeln!(
            bash,
            "dotnet publish {} --configuration Release --output {}",
            project, publish_dir
        )?;

        Ok(Some(ScriptFragment::new(bash)))
    }

    fn record_required_tools(
        &self,
        _repo: &dyn SourceRepo,
        version: &str,
        tools: &mut RequiredTools,
    ) {
        tools.insert("dotnet".to_string(), version.to_string());
    }
}
