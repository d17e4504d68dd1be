use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Externally visible failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedLanguage,
    UnsupportedVersion,
    LanguageNotDetected,
    PlatformFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnsupportedLanguage => "unsupported language",
            ErrorKind::UnsupportedVersion => "unsupported version",
            ErrorKind::LanguageNotDetected => "language not detected",
            ErrorKind::PlatformFailure => "platform failure",
        };
        f.write_str(name)
    }
}

/// Platform hook that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Detect,
    Generate,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookStage::Detect => f.write_str("detection"),
            HookStage::Generate => f.write_str("script generation"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScriptGeneratorError {
    #[error("'{language}' platform is not supported. Supported platforms are: {}", supported.join(", "))]
    UnsupportedLanguage {
        language: String,
        supported: Vec<String>,
    },

    #[error("The '{language}' version '{version}' is not supported. Supported versions are: {}", supported.join(", "))]
    UnsupportedVersion {
        language: String,
        version: String,
        supported: Vec<String>,
    },

    #[error("Couldn't detect a version for the platform '{platform}' in the repo.")]
    VersionNotDetected { platform: String },

    /// Also raised when every matching platform declined to generate.
    #[error("Could not detect the language from repo.")]
    LanguageNotDetected,

    #[error("Platform '{platform}' failed during {stage}")]
    Platform {
        platform: String,
        stage: HookStage,
        #[source]
        source: anyhow::Error,
    },
}

impl ScriptGeneratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptGeneratorError::UnsupportedLanguage { .. } => ErrorKind::UnsupportedLanguage,
            ScriptGeneratorError::UnsupportedVersion { .. }
            | ScriptGeneratorError::VersionNotDetected { .. } => ErrorKind::UnsupportedVersion,
            ScriptGeneratorError::LanguageNotDetected => ErrorKind::LanguageNotDetected,
            ScriptGeneratorError::Platform { .. } => ErrorKind::PlatformFailure,
        }
    }

    /// True for the three classified outcomes, false for propagated hook failures.
    pub fn is_classified(&self) -> bool {
        self.kind() != ErrorKind::PlatformFailure
    }
}
