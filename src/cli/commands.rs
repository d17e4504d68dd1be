use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Detects the platform of a repository and composes its build script
#[derive(Parser, Debug)]
#[command(
    name = "buildscript",
    about = "Detects the platform of a repository and composes its build script",
    version,
    author,
    long_about = "buildscript inspects a source repository, works out which language platform \
                  and version it targets, and composes a bash build script from the fragments \
                  contributed by the matching platforms (nodejs, python, dotnet)."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate the build script for a repository",
        long_about = "Resolves the platform and version of a repository and prints the composed \
                      build script.\n\n\
                      Examples:\n  \
                      buildscript generate\n  \
                      buildscript generate /path/to/repo -o build.sh\n  \
                      buildscript generate --platform python --platform-version 3.11\n  \
                      buildscript generate -p DISABLE_NODEJS_BUILD=true"
    )]
    Generate(GenerateArgs),

    #[command(
        about = "Detect the platform and version of a repository",
        long_about = "Runs platform detection only and reports which platform recognized the \
                      repository first.\n\n\
                      Examples:\n  \
                      buildscript detect\n  \
                      buildscript detect /path/to/repo --format json"
    )]
    Detect(DetectArgs),

    #[command(about = "List registered platforms and their supported versions")]
    Platforms(PlatformsArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(
        short = 'l',
        long,
        value_name = "NAME",
        help = "Platform to build with (detected when omitted)"
    )]
    pub platform: Option<String>,

    #[arg(
        long,
        value_name = "VERSION",
        requires = "platform",
        help = "Platform version, full or partial (e.g. 3 or 3.11)"
    )]
    pub platform_version: Option<String>,

    #[arg(
        short = 'p',
        long = "property",
        value_name = "KEY=VALUE",
        help = "Build property overriding an environment setting (repeatable)"
    )]
    pub properties: Vec<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "bash",
        help = "Output format"
    )]
    pub format: ScriptFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the script to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to repository (defaults to current directory)"
    )]
    pub repository_path: Option<PathBuf>,

    #[arg(short = 'p', long = "property", value_name = "KEY=VALUE")]
    pub properties: Vec<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct PlatformsArgs {
    #[arg(short = 'p', long = "property", value_name = "KEY=VALUE")]
    pub properties: Vec<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFormatArg {
    /// Runnable script with preamble
    Bash,
    /// Composed fragments only
    Raw,
    /// Script plus resolution details
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_generate_args() {
        let args = CliArgs::parse_from(["buildscript", "generate"]);
        match args.command {
            Commands::Generate(generate) => {
                assert!(generate.repository_path.is_none());
                assert!(generate.platform.is_none());
                assert!(generate.platform_version.is_none());
                assert!(generate.properties.is_empty());
                assert_eq!(generate.format, ScriptFormatArg::Bash);
                assert!(generate.output.is_none());
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_generate_with_options() {
        let args = CliArgs::parse_from([
            "buildscript",
            "generate",
            "/tmp/repo",
            "--platform",
            "python",
            "--platform-version",
            "3.11",
            "-p",
            "DISABLE_NODEJS_BUILD=true",
            "-p",
            "X=1",
            "--format",
            "json",
            "-o",
            "build.sh",
        ]);
        match args.command {
            Commands::Generate(generate) => {
                assert_eq!(generate.repository_path, Some(PathBuf::from("/tmp/repo")));
                assert_eq!(generate.platform.as_deref(), Some("python"));
                assert_eq!(generate.platform_version.as_deref(), Some("3.11"));
                assert_eq!(generate.properties, vec!["DISABLE_NODEJS_BUILD=true", "X=1"]);
                assert_eq!(generate.format, ScriptFormatArg::Json);
                assert_eq!(generate.output, Some(PathBuf::from("build.sh")));
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_platform_version_requires_platform() {
        let result =
            CliArgs::try_parse_from(["buildscript", "generate", "--platform-version", "3"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_detect_format() {
        let args = CliArgs::parse_from(["buildscript", "detect", "--format", "yaml"]);
        match args.command {
            Commands::Detect(detect) => assert_eq!(detect.format, OutputFormatArg::Yaml),
            _ => panic!("Expected Detect command"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = CliArgs::try_parse_from(["buildscript", "-q", "-v", "platforms"]);
        assert!(result.is_err());
    }
}
