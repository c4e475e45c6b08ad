use std::path::PathBuf;

use autodelegate_cli::commands::{check, generate, inspect, Format};
use autodelegate_core::{init_tracing, GeneratorConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "autodelegate",
    version,
    about = "autodelegate - generate forwarding classes for interfaces"
)]
struct Cli {
    /// Configuration profile; AUTODELEGATE_PROFILE takes precedence
    #[arg(long, global = true, default_value = "dev")]
    profile: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate forwarding classes into a directory
    Generate {
        /// Declaration files, one round each, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Run a full pass without writing anything
    Check {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Show resolved methods and accessors
    Inspect {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Only this target (qualified or package-relative name)
        #[arg(long)]
        target: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", colored::Colorize::red(format!("Error: {e}").as_str()));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = GeneratorConfig::load(&cli.profile)?;
    let settings = config.settings()?;
    init_tracing(&settings.log_filter);
    tracing::debug!(profile = %config.profile(), "configuration loaded");

    match cli.command {
        Commands::Generate {
            inputs,
            out,
            format,
        } => generate::run(&inputs, &out, format, &settings),
        Commands::Check { inputs, format } => check::run(&inputs, format, &settings),
        Commands::Inspect { inputs, target } => inspect::run(&inputs, target.as_deref(), &settings),
    }
}
