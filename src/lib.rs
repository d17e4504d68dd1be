//! buildscript - composes the build script for a source repository
//!
//! Given a repository and optional language/version hints, this crate works
//! out which language platform the repository targets, resolves a concrete
//! supported version for it, and asks each eligible platform for a bash
//! fragment. The fragments are concatenated into one build script.
//!
//! # Core Concepts
//!
//! - **Platform**: a named provider (`nodejs`, `python`, `dotnet`) with its own
//!   supported versions, detector and fragment generator
//! - **Detection**: when no language is supplied, the first enabled platform
//!   whose detector recognizes the repository decides language and version
//! - **Max-satisfying resolution**: a partial specifier such as `3` or `3.11`
//!   resolves to the highest supported full version it prefixes
//!
//! # Example Usage
//!
//! ```no_run
//! use buildscript::{default_platforms, GeneratorConfig, LocalSourceRepo, ProcessEnvironment};
//! use buildscript::{ScriptGenerator, ScriptRequest};
//! use std::sync::Arc;
//!
//! let config = GeneratorConfig::default();
//! let generator = ScriptGenerator::new(default_platforms(&config, Arc::new(ProcessEnvironment)));
//! let repo = LocalSourceRepo::new("/path/to/repo");
//!
//! let generated = generator.try_generate_script(&ScriptRequest::new(&repo))?;
//! println!("{}", generated.script);
//! # Ok::<(), buildscript::ScriptGeneratorError>(())
//! ```

pub mod cli;
pub mod config;
pub mod fs;
pub mod generator;
pub mod platform;
pub mod platforms;
pub mod repo;
pub mod script;
pub mod settings;
pub mod util;
pub mod version;

pub use config::{ConfigError, GeneratorConfig, PlatformVersions};
pub use generator::{
    Contribution, Detection, ErrorKind, GeneratedScript, ScriptGenerator, ScriptGeneratorError,
};
pub use platform::{
    BuildState, DetectionResult, LanguageDetector, Platform, RequiredTools, ScriptFragment,
    ScriptRequest,
};
pub use platforms::default_platforms;
pub use repo::{LocalSourceRepo, SourceRepo};
pub use script::{BashScript, ScriptOptions};
pub use settings::{EnvironmentSettings, LayeredEnvironment, ProcessEnvironment, StaticEnvironment};
pub use version::resolve_max_satisfying;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_buildscript() {
        assert_eq!(NAME, "buildscript");
    }
}
