use anyhow::Result;
use clap::{Parser, Subcommand};
use fxr::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxr::cli::setup::setup(),
        None => {
            tokio::select! {
                result = fxr::run(cli.config_path.as_deref()) => result,
                _ = tokio::signal::ctrl_c() => {
                    println!("\nProcess interrupted by user. Exiting...");
                    // A pending terminal read would otherwise keep the runtime alive
                    std::process::exit(0);
                }
            }
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
