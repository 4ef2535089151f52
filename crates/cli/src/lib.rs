pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use leadflow_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "leadflow",
    about = "Leadflow operator CLI",
    long_about = "Apply migrations, inspect configuration, and run the deterministic calculation engine.",
    after_help = "Examples:\n  leadflow config\n  leadflow calc ceil_divide 12 5\n  leadflow quote --file items.json --pricing-mode inclusive"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a leadflow.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Evaluate one exact-decimal calculator operation")]
    Calc {
        #[arg(help = "add, subtract, multiply, divide, ceil_divide, ceil, floor, round, percentage")]
        operation: String,
        a: String,
        b: Option<String>,
    },
    #[command(about = "Compute quote totals for a JSON list of items (file or stdin)")]
    Quote {
        #[arg(long, help = "JSON file with items; reads stdin when omitted")]
        file: Option<PathBuf>,
        #[arg(long, help = "exclusive or inclusive")]
        pricing_mode: Option<String>,
        #[arg(long, help = "percentage (basis points) or fixed (cents)")]
        discount_type: Option<String>,
        #[arg(long)]
        discount_value: Option<i64>,
    },
    #[command(about = "Compute a low/high price range from a JSON estimate input (file or stdin)")]
    Estimate {
        #[arg(long, help = "JSON file with the estimate input; reads stdin when omitted")]
        file: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let load_options = || LoadOptions { config_path: cli.config.clone() };

    // Commands report config failures themselves; logging just falls back to defaults.
    let logging = AppConfig::load(load_options())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    init_logging(&logging);

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(load_options()),
        Command::Config => commands::config::run(load_options()),
        Command::Calc { ref operation, ref a, ref b } => {
            commands::calc::run(operation, a, b.as_deref())
        }
        Command::Quote { ref file, ref pricing_mode, ref discount_type, discount_value } => {
            commands::quote::run(
                file.as_deref(),
                commands::quote::QuoteOptions {
                    pricing_mode: pricing_mode.clone(),
                    discount_type: discount_type.clone(),
                    discount_value,
                },
            )
        }
        Command::Estimate { ref file } => commands::estimate::run(file.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON document.
pub fn init_logging(config: &LoggingConfig) {
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when the CLI is embedded in tests.
    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
