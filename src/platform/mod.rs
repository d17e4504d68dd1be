//! Platform and detector contracts
//!
//! A platform is a named provider of build-script fragments for one
//! language/runtime ecosystem. The generator drives platforms strictly
//! through [`Platform`]; concrete providers live in [`crate::platforms`].

use crate::repo::SourceRepo;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tool name to required version, filled in by selected platforms.
pub type RequiredTools = BTreeMap<String, String>;

/// What a detector recognized in a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub language: String,
    pub language_version: Option<String>,
}

impl DetectionResult {
    pub fn new(language: impl Into<String>, language_version: Option<String>) -> Self {
        Self {
            language: language.into(),
            language_version: language_version.filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn with_version(language: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(language, Some(version.into()))
    }
}

/// Shell text contributed by one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFragment {
    pub bash: String,
}

impl ScriptFragment {
    pub fn new(bash: impl Into<String>) -> Self {
        Self { bash: bash.into() }
    }
}

impl fmt::Display for ScriptFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bash)
    }
}

/// Caller input for one generation call. Empty strings mean "detect".
pub struct ScriptRequest<'a> {
    pub language: Option<String>,
    pub language_version: Option<String>,
    pub repo: &'a dyn SourceRepo,
}

impl<'a> ScriptRequest<'a> {
    pub fn new(repo: &'a dyn SourceRepo) -> Self {
        Self {
            language: None,
            language_version: None,
            repo,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_language_version(mut self, version: impl Into<String>) -> Self {
        self.language_version = Some(version.into());
        self
    }

    pub fn supplied_language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    pub fn supplied_version(&self) -> Option<&str> {
        self.language_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

impl fmt::Debug for ScriptRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRequest")
            .field("language", &self.language)
            .field("language_version", &self.language_version)
            .field("repo", &self.repo.root_path())
            .finish()
    }
}

/// Per-call state written by the platforms selected for generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildState {
    /// Platform name to the version it was resolved at.
    pub resolved_versions: BTreeMap<String, String>,
    pub required_tools: RequiredTools,
}

impl BuildState {
    pub fn resolved_version(&self, platform: &str) -> Option<&str> {
        self.resolved_versions.get(platform).map(String::as_str)
    }
}

pub trait LanguageDetector: Send + Sync {
    fn detect(&self, repo: &dyn SourceRepo) -> Result<Option<DetectionResult>>;
}

pub trait Platform: Send + Sync {
    /// Stable identifier callers select the platform by, e.g. "python".
    fn name(&self) -> &str;

    /// Full versions this platform can build. Never empty.
    fn supported_versions(&self) -> &[String];

    fn detect(&self, repo: &dyn SourceRepo) -> Result<Option<DetectionResult>>;

    fn is_enabled(&self, request: &ScriptRequest<'_>) -> bool;

    /// `Ok(None)` declines to contribute.
    fn generate(
        &self,
        request: &ScriptRequest<'_>,
        state: &BuildState,
    ) -> Result<Option<ScriptFragment>>;

    fn record_required_tools(
        &self,
        repo: &dyn SourceRepo,
        version: &str,
        tools: &mut RequiredTools,
    );

    fn record_resolved_version(&self, state: &mut BuildState, version: &str) {
        state
            .resolved_versions
            .insert(self.name().to_string(), version.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::repo::LocalSourceRepo;
    use std::sync::Arc;

    #[test]
    fn test_detection_result_drops_blank_version() {
        let result = DetectionResult::new("python", Some("  ".to_string()));
        assert_eq!(result.language_version, None);

        let result = DetectionResult::with_version("python", "3.11");
        assert_eq!(result.language_version.as_deref(), Some("3.11"));
    }

    #[test]
    fn test_request_treats_empty_as_absent() {
        let repo = LocalSourceRepo::with_fs("/mock", Arc::new(MockFileSystem::new()));
        let request = ScriptRequest::new(&repo)
            .with_language("")
            .with_language_version(" ");
        assert_eq!(request.supplied_language(), None);
        assert_eq!(request.supplied_version(), None);

        let request = ScriptRequest::new(&repo)
            .with_language("nodejs")
            .with_language_version("20");
        assert_eq!(request.supplied_language(), Some("nodejs"));
        assert_eq!(request.supplied_version(), Some("20"));
    }

    #[test]
    fn test_build_state_resolved_version() {
        let mut state = BuildState::default();
        state
            .resolved_versions
            .insert("nodejs".to_string(), "20.11.1".to_string());
        assert_eq!(state.resolved_version("nodejs"), Some("20.11.1"));
        assert_eq!(state.resolved_version("python"), None);
    }
}
