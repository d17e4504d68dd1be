use buildscript::cli::commands::{CliArgs, Commands};
use buildscript::cli::handlers::{handle_detect, handle_generate, handle_platforms, EXIT_FAILURE};
use buildscript::util::{init_logging, parse_level, LoggingConfig};
use buildscript::{GeneratorConfig, VERSION};

use clap::Parser;
use tracing::{debug, error, Level};

fn main() {
    let args = CliArgs::parse();
    let config = GeneratorConfig::default();
    init_logging_from_args(&args, &config);

    debug!("buildscript v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_FAILURE);
    }

    let exit_code = match &args.command {
        Commands::Generate(generate_args) => handle_generate(generate_args, &config, args.quiet),
        Commands::Detect(detect_args) => handle_detect(detect_args, &config),
        Commands::Platforms(platforms_args) => handle_platforms(platforms_args, &config),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs, config: &GeneratorConfig) {
    let mut logging = LoggingConfig::from_generator_config(config);
    logging.level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        logging.level
    };
    init_logging(logging);
}
