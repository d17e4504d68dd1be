//! Node.js platform (npm, yarn)

use crate::config::PlatformVersions;
use crate::platform::{
    BuildState, DetectionResult, LanguageDetector, Platform, RequiredTools, ScriptFragment,
    ScriptRequest,
};
use crate::repo::SourceRepo;
use crate::settings::{is_platform_disabled, EnvironmentSettings};
use crate::version::compare_versions;
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::Write;
use std::sync::{Arc, OnceLock};

const NAME: &str = "nodejs";
const ENTRY_FILES: &[&str] = &["server.js", "app.js"];

fn read_manifest(repo: &dyn SourceRepo) -> Result<Option<Value>> {
    if !repo.file_exists(&["package.json"]) {
        return Ok(None);
    }
    let content = repo.read_file(&["package.json"])?;
    let manifest = serde_json::from_str(&content).context("Failed to parse package.json")?;
    Ok(Some(manifest))
}

fn numeric_parts(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map_while(|part| part.parse::<u64>().ok())
        .collect()
}

fn join(parts: &[u64]) -> String {
    parts
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// `18` becomes `19`, `18.2` becomes `18.3`.
fn bump(parts: &[u64]) -> String {
    let mut bumped = parts.to_vec();
    if let Some(last) = bumped.last_mut() {
        *last += 1;
    }
    join(&bumped)
}

/// Inclusive lower and exclusive upper bound of one `||` alternative.
#[derive(Debug, Default)]
struct Bounds {
    lower: Option<String>,
    upper: Option<String>,
}

impl Bounds {
    fn raise_lower(&mut self, bound: String) {
        if self
            .lower
            .as_deref()
            .map_or(true, |current| compare_versions(&bound, current) == Ordering::Greater)
        {
            self.lower = Some(bound);
        }
    }

    fn lower_upper(&mut self, bound: String) {
        if self
            .upper
            .as_deref()
            .map_or(true, |current| compare_versions(&bound, current) == Ordering::Less)
        {
            self.upper = Some(bound);
        }
    }

    fn allows(&self, version: &str) -> bool {
        let above = self
            .lower
            .as_deref()
            .map_or(true, |lower| compare_versions(version, lower) != Ordering::Less);
        let below = self
            .upper
            .as_deref()
            .map_or(true, |upper| compare_versions(version, upper) == Ordering::Less);
        above && below
    }
}

fn parse_alternative(re: &Regex, alternative: &str) -> Option<Bounds> {
    let mut bounds = Bounds::default();
    let mut seen = false;

    for caps in re.captures_iter(alternative) {
        let operator = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let parts = numeric_parts(caps.get(2).map(|m| m.as_str()).unwrap_or(""));
        if parts.is_empty() {
            continue;
        }
        seen = true;

        match operator {
            ">=" => bounds.raise_lower(join(&parts)),
            ">" => bounds.raise_lower(bump(&parts)),
            "<" => bounds.lower_upper(join(&parts)),
            "<=" => bounds.lower_upper(bump(&parts)),
            "^" => {
                let significant = parts
                    .iter()
                    .position(|p| *p != 0)
                    .unwrap_or(parts.len() - 1);
                bounds.raise_lower(join(&parts));
                bounds.lower_upper(bump(&parts[..=significant]));
            }
            "~" => {
                bounds.raise_lower(join(&parts));
                bounds.lower_upper(bump(&parts[..parts.len().min(2)]));
            }
            _ => {
                bounds.raise_lower(join(&parts));
                bounds.lower_upper(bump(&parts));
            }
        }
    }

    seen.then_some(bounds)
}

/// Picks the highest supported version an `engines.node` range allows.
///
/// Every `||` alternative is considered. `^18.2.0` allows 18.x from 18.2.0,
/// `~18.2` allows 18.2.x, `>=18` anything from 18.0.0, `>18` anything from
/// 19.0.0 and `18.x` or `18` allows 18.x. When no supported version falls in
/// the range the range text itself is returned, so resolution reports it as
/// unsupported. Ranges with no version in them (`lts/*`, `*`) yield `None`.
pub fn engine_specifier(range: &str, supported: &[String]) -> Option<String> {
    static COMPARATOR: OnceLock<Option<Regex>> = OnceLock::new();
    let re = COMPARATOR
        .get_or_init(|| {
            Regex::new(r"(\^|~|>=|<=|>|<|=)?\s*v?(\d+(?:\.(?:\d+|[xX*])){0,2})").ok()
        })
        .as_ref()?;

    let alternatives: Vec<Bounds> = range
        .split("||")
        .filter_map(|alternative| parse_alternative(re, alternative))
        .collect();
    if alternatives.is_empty() {
        return None;
    }

    let best = supported
        .iter()
        .filter(|version| alternatives.iter().any(|bounds| bounds.allows(version)))
        .max_by(|a, b| compare_versions(a, b))
        .cloned();

    Some(best.unwrap_or_else(|| range.trim().to_string()))
}

pub struct NodeDetector {
    default_version: String,
    supported: Vec<String>,
}

impl NodeDetector {
    pub fn new(default_version: impl Into<String>, supported: Vec<String>) -> Self {
        Self {
            default_version: default_version.into(),
            supported,
        }
    }
}

impl LanguageDetector for NodeDetector {
    fn detect(&self, repo: &dyn SourceRepo) -> Result<Option<DetectionResult>> {
        let manifest = read_manifest(repo)?;
        if manifest.is_none() && !ENTRY_FILES.iter().any(|f| repo.file_exists(&[f])) {
            return Ok(None);
        }

        let version = manifest
            .as_ref()
            .and_then(|m| m.pointer("/engines/node"))
            .and_then(Value::as_str)
            .and_then(|range| engine_specifier(range, &self.supported))
            .unwrap_or_else(|| self.default_version.clone());

        Ok(Some(DetectionResult::with_version(NAME, version)))
    }
}

pub struct NodePlatform {
    versions: PlatformVersions,
    detector: NodeDetector,
    settings: Arc<dyn EnvironmentSettings>,
}

impl NodePlatform {
    pub fn new(versions: PlatformVersions, settings: Arc<dyn EnvironmentSettings>) -> Self {
        let detector =
            NodeDetector::new(versions.default_version.clone(), versions.supported.clone());
        Self {
            versions,
            detector,
            settings,
        }
    }
}

impl Platform for NodePlatform {
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
        let Some(manifest) = read_manifest(request.repo)? else {
            return Ok(None);
        };

        let yarn = request.repo.file_exists(&["yarn.lock"]);
        let has_build = manifest.pointer("/scripts/build").is_some();

        let mut bash = String::new();
        if let Some(version) = state.resolved_version(NAME) {
            writeln!(bash, "echo \"Using Node.js {}\"", version)?;
        }

        let install = if yarn {
            "yarn install --frozen-lockfile"
        } else if request.repo.file_exists(&["package-lock.json"]) {
            "npm ci"
        } else {
            "npm install"
        };
        writeln!(bash, "echo \"Running '{}'...\"", install)?;
        writeln!(bash, "{}", install)?;

        if has_build {
            let build = if yarn { "yarn run build" } else { "npm run build" };
            writeln!(bash, "echo \"Running '{}'...\"", build)?;
            writeln!(bash, "{}", build)?;
        }

        Ok(Some(ScriptFragment::new(bash)))
    }

    fn record_required_tools(
        &self,
        repo: &dyn SourceRepo,
        version: &str,
        tools: &mut RequiredTools,
    ) {
        tools.insert("node".to_string(), version.to_string());
        if repo.file_exists(&["yarn.lock"]) {
            tools.insert("yarn".to_string(), "1".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::repo::LocalSourceRepo;
    use crate::settings::StaticEnvironment;
    use std::path::PathBuf;
    use yare::parameterized;

    fn repo_with(files: &[(&str, &str)]) -> LocalSourceRepo {
        let fs = MockFileSystem::with_root(PathBuf::from("/app"));
        for (path, content) in files {
            fs.add_file(path, content);
        }
        LocalSourceRepo::with_fs("/app", Arc::new(fs))
    }

    fn platform(settings: StaticEnvironment) -> NodePlatform {
        NodePlatform::new(
            PlatformVersions {
                supported: vec!["18.19.1".to_string(), "20.11.1".to_string()],
                default_version: "20".to_string(),
            },
            Arc::new(settings),
        )
    }

    fn supported() -> Vec<String> {
        ["16.20.2", "18.19.1", "20.11.1", "22.3.0"]
            .iter()
            .map(|v| v.to_string())
            .collect()
    }

    #[parameterized(
        caret = { "^18.2.0", Some("18.19.1") },
        tilde = { "~18.19", Some("18.19.1") },
        at_least = { ">=18", Some("22.3.0") },
        above_major = { ">18", Some("22.3.0") },
        above_newest = { ">22", Some(">22") },
        above_exact = { ">22.3.0", Some(">22.3.0") },
        bounded = { ">=18 <21", Some("20.11.1") },
        at_most = { "<=18", Some("18.19.1") },
        wildcard = { "18.x", Some("18.19.1") },
        exact = { "20.11.1", Some("20.11.1") },
        major_minor = { "20.11", Some("20.11.1") },
        alternatives = { "^16 || ^18", Some("18.19.1") },
        v_prefix = { "v20.11.1", Some("20.11.1") },
        unsupported_exact = { "20.5.0", Some("20.5.0") },
        lts = { "lts/*", None },
        any = { "*", None },
    )]
    fn test_engine_specifier(range: &str, expected: Option<&str>) {
        assert_eq!(
            engine_specifier(range, &supported()),
            expected.map(str::to_string)
        );
    }

    #[test]
    fn test_above_major_never_selects_that_major() {
        let selected = engine_specifier(">18", &supported()).unwrap();
        assert!(!selected.starts_with("18."));

        let only_18 = vec!["18.19.1".to_string()];
        assert_eq!(engine_specifier(">18", &only_18).as_deref(), Some(">18"));
    }

    #[test]
    fn test_detect_reads_engines() {
        let repo = repo_with(&[("package.json", r#"{"engines": {"node": "^18.0.0"}}"#)]);
        let result = NodeDetector::new("20", supported())
            .detect(&repo)
            .unwrap()
            .unwrap();
        assert_eq!(result.language, "nodejs");
        assert_eq!(result.language_version.as_deref(), Some("18.19.1"));
    }

    #[test]
    fn test_detect_falls_back_to_default_version() {
        let repo = repo_with(&[("server.js", "require('http')")]);
        let result = NodeDetector::new("20", supported()).detect(&repo).unwrap().unwrap();
        assert_eq!(result.language_version.as_deref(), Some("20"));
    }

    #[test]
    fn test_detect_no_match() {
        let repo = repo_with(&[("requirements.txt", "flask")]);
        assert!(NodeDetector::new("20", supported()).detect(&repo).unwrap().is_none());
    }

    #[test]
    fn test_detect_malformed_manifest_is_an_error() {
        let repo = repo_with(&[("package.json", "{ not json")]);
        let err = NodeDetector::new("20", supported()).detect(&repo).unwrap_err();
        assert!(err.to_string().contains("package.json"));
    }

    #[test]
    fn test_generate_with_yarn_and_build() {
        let repo = repo_with(&[
            ("package.json", r#"{"scripts": {"build": "tsc"}}"#),
            ("yarn.lock", ""),
        ]);
        let request = ScriptRequest::new(&repo);
        let node = platform(StaticEnvironment::new());
        let mut state = BuildState::default();
        node.record_resolved_version(&mut state, "20.11.1");

        let fragment = node.generate(&request, &state).unwrap().unwrap();
        assert!(fragment.bash.contains("Using Node.js 20.11.1"));
        assert!(fragment.bash.contains("yarn install --frozen-lockfile"));
        assert!(fragment.bash.contains("yarn run build"));
        assert!(!fragment.bash.contains("npm"));
    }

    #[test]
    fn test_generate_prefers_npm_ci_with_lockfile() {
        let repo = repo_with(&[("package.json", "{}"), ("package-lock.json", "{}")]);
        let request = ScriptRequest::new(&repo);
        let fragment = platform(StaticEnvironment::new())
            .generate(&request, &BuildState::default())
            .unwrap()
            .unwrap();
        assert!(fragment.bash.contains("npm ci"));
        assert!(!fragment.bash.contains("npm run build"));
    }

    #[test]
    fn test_generate_declines_without_manifest() {
        let repo = repo_with(&[("server.js", "")]);
        let request = ScriptRequest::new(&repo);
        let fragment = platform(StaticEnvironment::new())
            .generate(&request, &BuildState::default())
            .unwrap();
        assert!(fragment.is_none());
    }

    #[test]
    fn test_required_tools() {
        let repo = repo_with(&[("package.json", "{}"), ("yarn.lock", "")]);
        let mut tools = RequiredTools::new();
        platform(StaticEnvironment::new()).record_required_tools(&repo, "18.19.1", &mut tools);
        assert_eq!(tools.get("node").map(String::as_str), Some("18.19.1"));
        assert!(tools.contains_key("yarn"));
    }

    #[test]
    fn test_disabled_by_setting() {
        let repo = repo_with(&[]);
        let request = ScriptRequest::new(&repo);
        assert!(platform(StaticEnvironment::new()).is_enabled(&request));
        let disabled = platform(StaticEnvironment::new().with("DISABLE_NODEJS_BUILD", "true"));
        assert!(!disabled.is_enabled(&request));
    }
}
