mod commands;
mod config;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// PetSoft pet manager: HTTP server and payload tools.
#[derive(Parser)]
#[command(name = "petsoft", version, about = "PetSoft pet manager")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the PetSoft HTTP API server
    Serve {
        /// Path to the TOML config file (missing file = defaults)
        #[arg(long, default_value = "petsoft.toml")]
        config: PathBuf,
        /// Port to listen on (overrides config and PETSOFT_PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate a pet form JSON file and print the normalised payload
    Validate {
        /// Path to the pet JSON file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => {
            commands::serve::cmd_serve(&config, port, cli.output, cli.quiet);
        }
        Commands::Validate { file } => {
            commands::validate::cmd_validate(&file, cli.output, cli.quiet);
        }
    }
}

/// Print an error message in the requested output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
