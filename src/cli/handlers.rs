//! Subcommand handlers. Each returns the process exit code.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::commands::{DetectArgs, GenerateArgs, PlatformsArgs, ScriptFormatArg};
use super::output::{OutputFormatter, PlatformInfo};
use crate::config::GeneratorConfig;
use crate::generator::{ScriptGenerator, ScriptGeneratorError};
use crate::platform::ScriptRequest;
use crate::platforms::default_platforms;
use crate::repo::{LocalSourceRepo, SourceRepo};
use crate::script::{BashScript, ScriptOptions};
use crate::settings::{LayeredEnvironment, StaticEnvironment};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// Unsupported language, unsupported version or language not detected.
pub const EXIT_GENERATION_FAILED: i32 = 2;

pub fn handle_generate(args: &GenerateArgs, config: &GeneratorConfig, quiet: bool) -> i32 {
    let repo_path = match resolve_repository_path(args.repository_path.as_deref()) {
        Ok(path) => path,
        Err(e) => return report_failure(&e),
    };
    let generator = match build_generator(config, &args.properties) {
        Ok(generator) => generator,
        Err(e) => return report_failure(&e),
    };

    info!("Generating build script for {}", repo_path.display());
    let repo = LocalSourceRepo::new(&repo_path);
    let mut request = ScriptRequest::new(&repo);
    if let Some(platform) = &args.platform {
        request = request.with_language(platform.clone());
    }
    if let Some(version) = &args.platform_version {
        request = request.with_language_version(version.clone());
    }

    let generated = match generator.try_generate_script(&request) {
        Ok(generated) => generated,
        Err(e) => return report_generation_error(&e),
    };

    let rendered = match args.format {
        ScriptFormatArg::Bash => BashScript::render(
            &generated,
            &ScriptOptions {
                source_dir: Some(repo_path.clone()),
                commit_id: repo.commit_id(),
            },
        )
        .context("Failed to render build script"),
        ScriptFormatArg::Raw => Ok(generated.script.clone()),
        ScriptFormatArg::Json => OutputFormatter::format_generated_json(&generated),
    };
    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err(e) => return report_failure(&e),
    };

    match &args.output {
        Some(path) => {
            if let Err(e) = write_script(path, &rendered, args.format != ScriptFormatArg::Json) {
                return report_failure(&e);
            }
            if !quiet {
                eprintln!("Script written to {}", path.display());
            }
        }
        None => print!("{}", rendered),
    }

    EXIT_SUCCESS
}

pub fn handle_detect(args: &DetectArgs, config: &GeneratorConfig) -> i32 {
    let repo_path = match resolve_repository_path(args.repository_path.as_deref()) {
        Ok(path) => path,
        Err(e) => return report_failure(&e),
    };
    let generator = match build_generator(config, &args.properties) {
        Ok(generator) => generator,
        Err(e) => return report_failure(&e),
    };

    let repo = LocalSourceRepo::new(&repo_path);
    let detection = match generator.detect(&ScriptRequest::new(&repo)) {
        Ok(detection) => detection,
        Err(e) => return report_generation_error(&e),
    };

    match OutputFormatter::new(args.format.into()).format_detection(&detection) {
        Ok(output) => {
            println!("{}", output.trim_end());
            EXIT_SUCCESS
        }
        Err(e) => report_failure(&e),
    }
}

pub fn handle_platforms(args: &PlatformsArgs, config: &GeneratorConfig) -> i32 {
    let generator = match build_generator(config, &args.properties) {
        Ok(generator) => generator,
        Err(e) => return report_failure(&e),
    };

    // enablement is checked against the working directory
    let repo = LocalSourceRepo::new(env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let request = ScriptRequest::new(&repo);
    let infos: Vec<PlatformInfo> = generator
        .platforms()
        .iter()
        .map(|p| PlatformInfo::new(p.as_ref(), p.is_enabled(&request)))
        .collect();

    match OutputFormatter::new(args.format.into()).format_platforms(&infos) {
        Ok(output) => {
            println!("{}", output.trim_end());
            EXIT_SUCCESS
        }
        Err(e) => report_failure(&e),
    }
}

fn build_generator(config: &GeneratorConfig, properties: &[String]) -> Result<ScriptGenerator> {
    let properties = StaticEnvironment::from_pairs(properties).map_err(anyhow::Error::msg)?;
    if !properties.is_empty() {
        debug!("Build properties override process environment");
    }
    let settings = Arc::new(LayeredEnvironment::over_process(properties));
    Ok(ScriptGenerator::new(default_platforms(config, settings)))
}

fn resolve_repository_path(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().context("Failed to get current directory")?,
    };

    if !path.exists() {
        bail!("Repository path does not exist: {}", path.display());
    }
    if !path.is_dir() {
        bail!("Repository path is not a directory: {}", path.display());
    }

    path.canonicalize()
        .with_context(|| format!("Failed to resolve repository path {}", path.display()))
}

fn write_script(path: &Path, content: &str, executable: bool) -> Result<()> {
    fs::write(path, content)
        .with_context(|| format!("Failed to write script to {}", path.display()))?;

    #[cfg(unix)]
    if executable {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = executable;

    Ok(())
}

fn report_failure(e: &anyhow::Error) -> i32 {
    error!("{:#}", e);
    eprintln!("Error: {:#}", e);
    EXIT_FAILURE
}

fn report_generation_error(e: &ScriptGeneratorError) -> i32 {
    error!(kind = %e.kind(), "{}", e);
    eprintln!("Error: {}", e);
    if let ScriptGeneratorError::Platform { source, .. } = e {
        eprintln!("Caused by: {:#}", source);
    }

    if e.is_classified() {
        EXIT_GENERATION_FAILED
    } else {
        EXIT_FAILURE
    }
}
