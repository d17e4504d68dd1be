//! Script generation: language resolution, platform selection and composition
//!
//! A request either names a language or leaves it to detection:
//!
//! - **Explicit**: every enabled platform with that name is a candidate. Each
//!   candidate resolves the supplied version against its own supported set,
//!   or asks its own detector for a default when no version was supplied.
//!   All surviving candidates contribute, in registration order.
//! - **Auto-detect**: the first enabled platform whose detector recognizes
//!   the repository decides language and version. The detected pair then goes
//!   through the same candidate resolution as an explicit request.
//!
//! Validation runs name, then version, then generation, so a version error is
//! never reported for an unsupported language.

mod error;

pub use error::{ErrorKind, HookStage, ScriptGeneratorError};

use crate::platform::{BuildState, Platform, ScriptRequest};
use crate::version::resolve_max_satisfying;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of the auto-detect step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// Platform whose detector matched first.
    pub platform: String,
    pub language: String,
    pub language_version: Option<String>,
}

/// One platform that contributed to the composed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub platform: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedScript {
    /// Fragments joined in registration order.
    pub script: String,
    pub language: String,
    pub contributions: Vec<Contribution>,
    pub state: BuildState,
}

/// How the language/version pair fed into candidate resolution was obtained.
#[derive(Debug, Clone)]
enum ResolutionSource {
    Supplied { version: Option<String> },
    Detected { platform: String, version: String },
}

struct Candidate {
    platform: Arc<dyn Platform>,
    version: String,
}

pub struct ScriptGenerator {
    platforms: Vec<Arc<dyn Platform>>,
}

impl ScriptGenerator {
    /// Registration order decides detection precedence and fragment order.
    pub fn new(platforms: Vec<Arc<dyn Platform>>) -> Self {
        Self { platforms }
    }

    pub fn platforms(&self) -> &[Arc<dyn Platform>] {
        &self.platforms
    }

    pub fn enabled_platforms(&self, request: &ScriptRequest<'_>) -> Vec<Arc<dyn Platform>> {
        self.platforms
            .iter()
            .filter(|p| {
                let enabled = p.is_enabled(request);
                if !enabled {
                    debug!(platform = p.name(), "Platform disabled, skipping");
                }
                enabled
            })
            .cloned()
            .collect()
    }

    pub fn try_generate_script(
        &self,
        request: &ScriptRequest<'_>,
    ) -> Result<GeneratedScript, ScriptGeneratorError> {
        let start = Instant::now();
        let enabled = self.enabled_platforms(request);

        let (language, source) = match request.supplied_language() {
            Some(language) => {
                debug!(
                    language,
                    version = ?request.supplied_version(),
                    "Using supplied language"
                );
                (
                    language.to_string(),
                    ResolutionSource::Supplied {
                        version: request.supplied_version().map(str::to_string),
                    },
                )
            }
            None => {
                let detection = Self::detect_first(&enabled, request)?;
                let version = detection.language_version.ok_or_else(|| {
                    ScriptGeneratorError::VersionNotDetected {
                        platform: detection.platform.clone(),
                    }
                })?;
                (
                    detection.language,
                    ResolutionSource::Detected {
                        platform: detection.platform,
                        version,
                    },
                )
            }
        };

        let candidates = Self::resolve_candidates(&enabled, &language, source, request)?;
        let generated = Self::compose(language, candidates, request)?;

        info!(
            language = %generated.language,
            platforms = generated.contributions.len(),
            total_time_ms = start.elapsed().as_millis(),
            "Build script generated"
        );
        Ok(generated)
    }

    /// Runs only the auto-detect step against the enabled platforms.
    pub fn detect(&self, request: &ScriptRequest<'_>) -> Result<Detection, ScriptGeneratorError> {
        let enabled = self.enabled_platforms(request);
        Self::detect_first(&enabled, request)
    }

    fn detect_first(
        enabled: &[Arc<dyn Platform>],
        request: &ScriptRequest<'_>,
    ) -> Result<Detection, ScriptGeneratorError> {
        for platform in enabled {
            let detected = platform.detect(request.repo).map_err(|source| {
                ScriptGeneratorError::Platform {
                    platform: platform.name().to_string(),
                    stage: HookStage::Detect,
                    source,
                }
            })?;

            if let Some(result) = detected {
                debug!(
                    platform = platform.name(),
                    language = %result.language,
                    version = ?result.language_version,
                    "Detected language"
                );
                return Ok(Detection {
                    platform: platform.name().to_string(),
                    language: result.language,
                    language_version: result.language_version,
                });
            }
        }

        debug!(platforms = enabled.len(), "No detector recognized the repository");
        Err(ScriptGeneratorError::LanguageNotDetected)
    }

    fn resolve_candidates(
        enabled: &[Arc<dyn Platform>],
        language: &str,
        source: ResolutionSource,
        request: &ScriptRequest<'_>,
    ) -> Result<Vec<Candidate>, ScriptGeneratorError> {
        let matched: Vec<&Arc<dyn Platform>> = enabled
            .iter()
            .filter(|p| p.name().eq_ignore_ascii_case(language))
            .collect();

        if matched.is_empty() {
            return Err(ScriptGeneratorError::UnsupportedLanguage {
                language: language.to_string(),
                supported: enabled.iter().map(|p| p.name().to_string()).collect(),
            });
        }

        let mut candidates = Vec::new();
        // first version obtained, reported if nothing supports it
        let mut requested: Option<String> = None;

        for platform in &matched {
            let specifier = match &source {
                ResolutionSource::Supplied {
                    version: Some(version),
                } => Some(version.clone()),
                ResolutionSource::Detected { version, .. } => Some(version.clone()),
                ResolutionSource::Supplied { version: None } => platform
                    .detect(request.repo)
                    .map_err(|source| ScriptGeneratorError::Platform {
                        platform: platform.name().to_string(),
                        stage: HookStage::Detect,
                        source,
                    })?
                    .and_then(|result| result.language_version),
            };

            let Some(specifier) = specifier else {
                debug!(platform = platform.name(), "No default version detected, dropping");
                continue;
            };
            requested.get_or_insert_with(|| specifier.clone());

            match resolve_max_satisfying(&specifier, platform.supported_versions()) {
                Some(version) => {
                    debug!(
                        platform = platform.name(),
                        requested = %specifier,
                        resolved = %version,
                        "Resolved platform version"
                    );
                    candidates.push(Candidate {
                        platform: Arc::clone(platform),
                        version,
                    });
                }
                None => debug!(
                    platform = platform.name(),
                    requested = %specifier,
                    "Version not supported, dropping"
                ),
            }
        }

        if !candidates.is_empty() {
            return Ok(candidates);
        }

        match requested {
            Some(version) => {
                let mut supported: Vec<String> = Vec::new();
                for platform in &matched {
                    for v in platform.supported_versions() {
                        if !supported.contains(v) {
                            supported.push(v.clone());
                        }
                    }
                }
                Err(ScriptGeneratorError::UnsupportedVersion {
                    language: language.to_string(),
                    version,
                    supported,
                })
            }
            None => Err(ScriptGeneratorError::VersionNotDetected {
                platform: match source {
                    ResolutionSource::Detected { platform, .. } => platform,
                    ResolutionSource::Supplied { .. } => language.to_string(),
                },
            }),
        }
    }

    fn compose(
        language: String,
        candidates: Vec<Candidate>,
        request: &ScriptRequest<'_>,
    ) -> Result<GeneratedScript, ScriptGeneratorError> {
        let mut state = BuildState::default();
        let mut fragments = Vec::new();
        let mut contributions = Vec::new();

        for candidate in candidates {
            let platform = &candidate.platform;
            platform.record_resolved_version(&mut state, &candidate.version);
            platform.record_required_tools(
                request.repo,
                &candidate.version,
                &mut state.required_tools,
            );

            let fragment = platform.generate(request, &state).map_err(|source| {
                ScriptGeneratorError::Platform {
                    platform: platform.name().to_string(),
                    stage: HookStage::Generate,
                    source,
                }
            })?;

            match fragment {
                Some(fragment) => {
                    fragments.push(fragment.bash);
                    contributions.push(Contribution {
                        platform: platform.name().to_string(),
                        version: candidate.version,
                    });
                }
                None => debug!(platform = platform.name(), "Platform declined to generate"),
            }
        }

        if fragments.is_empty() {
            warn!(language = %language, "Every matching platform declined to generate a script");
            return Err(ScriptGeneratorError::LanguageNotDetected);
        }

        Ok(GeneratedScript {
            script: fragments.join("\n"),
            language,
            contributions,
            state,
        })
    }
}
