//! Python platform (pip, pipenv)

use crate::config::PlatformVersions;
use crate::platform::{
    BuildState, DetectionResult, LanguageDetector, Platform, RequiredTools, ScriptFragment,
    ScriptRequest,
};
use crate::repo::SourceRepo;
use crate::settings::{is_platform_disabled, EnvironmentSettings};
use anyhow::{Context, Result};
use regex::Regex;
use std::fmt::Write;
use std::sync::{Arc, OnceLock};
use tracing::debug;

const NAME: &str = "python";
const MANIFESTS: &[&str] = &[
    "requirements.txt",
    "setup.py",
    "pyproject.toml",
    "Pipfile",
    "runtime.txt",
];
const VIRTUALENV: &str = ".venv";

fn leading_version(text: &str) -> Option<String> {
    static VERSION: OnceLock<Option<Regex>> = OnceLock::new();
    let re = VERSION
        .get_or_init(|| Regex::new(r"(\d+(?:\.\d+){0,2})").ok())
        .as_ref()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `runtime.txt` holds `python-3.8.5`.
fn version_from_runtime_txt(repo: &dyn SourceRepo) -> Result<Option<String>> {
    if !repo.file_exists(&["runtime.txt"]) {
        return Ok(None);
    }
    let lines = repo.read_all_lines(&["runtime.txt"])?;
    Ok(lines
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .and_then(|l| l.strip_prefix("python-"))
        .and_then(leading_version))
}

fn version_from_python_version_file(repo: &dyn SourceRepo) -> Result<Option<String>> {
    if !repo.file_exists(&[".python-version"]) {
        return Ok(None);
    }
    let lines = repo.read_all_lines(&[".python-version"])?;
    Ok(lines
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .and_then(leading_version))
}

/// `requires-python = ">=3.10"` in `[project]`, or `python_version` under
/// `[requires]` in a Pipfile.
fn version_from_toml(repo: &dyn SourceRepo, file: &str, pointer: &[&str]) -> Result<Option<String>> {
    if !repo.file_exists(&[file]) {
        return Ok(None);
    }
    let content = repo.read_file(&[file])?;
    let document: toml::Table =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", file))?;

    let mut value = document.get(pointer[0]);
    for key in &pointer[1..] {
        value = value.and_then(|v| v.get(*key));
    }
    Ok(value.and_then(|v| v.as_str()).and_then(leading_version))
}

pub struct PythonDetector {
    default_version: String,
}

impl PythonDetector {
    pub fn new(default_version: impl Into<String>) -> Self {
        Self {
            default_version: default_version.into(),
        }
    }
}

impl LanguageDetector for PythonDetector {
    fn detect(&self, repo: &dyn SourceRepo) -> Result<Option<DetectionResult>> {
        if !MANIFESTS.iter().any(|m| repo.file_exists(&[m])) {
            return Ok(None);
        }

        let pinned = match version_from_runtime_txt(repo)? {
            Some(v) => Some(v),
            None => match version_from_python_version_file(repo)? {
                Some(v) => Some(v),
                None => match version_from_toml(repo, "pyproject.toml", &["project", "requires-python"])? {
                    Some(v) => Some(v),
                    None => version_from_toml(repo, "Pipfile", &["requires", "python_version"])?,
                },
            },
        };

        if pinned.is_none() {
            debug!(default = %self.default_version, "No pinned Python version, using default");
        }
        let version = pinned.unwrap_or_else(|| self.default_version.clone());
        Ok(Some(DetectionResult::with_version(NAME, version)))
    }
}

pub struct PythonPlatform {
    versions: PlatformVersions,
    detector: PythonDetector,
    settings: Arc<dyn EnvironmentSettings>,
}

impl PythonPlatform {
    pub fn new(versions: PlatformVersions, settings: Arc<dyn EnvironmentSettings>) -> Self {
        let detector = PythonDetector::new(versions.default_version.clone());
        Self {
            versions,
            detector,
            settings,
        }
    }

    fn install_command(repo: &dyn SourceRepo) -> Option<&'static str> {
        if repo.file_exists(&["requirements.txt"]) {
            Some("pip install --no-cache-dir -r requirements.txt")
        } else if repo.file_exists(&["pyproject.toml"]) || repo.file_exists(&["setup.py"]) {
            Some("pip install --no-cache-dir .")
        } else if repo.file_exists(&["Pipfile"]) {
            Some("pip install pipenv && pipenv install --deploy")
        } else {
            None
        }
    }
}

impl Platform for PythonPlatform {
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
        let Some(install) = Self::install_command(request.repo) else {
            return Ok(None);
        };

        let mut bash = String::new();
        if let Some(version) = state.resolved_version(NAME) {
            writeln!(bash, "echo \"Using Python {}\"", version)?;
        }
        writeln!(bash, "python -m venv {}", VIRTUALENV)?;
        writeln!(bash, "source {}/bin/activate", VIRTUALENV)?;
        writeln!(bash, "pip install --upgrade pip")?;
        writeln!(bash, "echo \"Running '{}'...\"", install)?;
        writeln!(bash, "{}", install)?;

        Ok(Some(ScriptFragment::new(bash)))
    }

    fn record_required_tools(
        &self,
        _repo: &dyn SourceRepo,
        version: &str,
        tools: &mut RequiredTools,
    ) {
        tools.insert("python".to_string(), version.to_string());
    }
}
