use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use graffiti_bridge::bridge::server;
use graffiti_bridge::config::Config;
use graffiti_bridge::utils;

#[derive(Parser)]
#[command(name = "graffiti-bridge", version, about = "HTTP bridge for the graffiti CLI test suite")]
struct AppCli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge HTTP server
    Serve {
        #[arg(long, default_value_t = 8765)]
        port: u16,
        /// Path to the wallet/graffiti CLI executable
        #[arg(long)]
        cli_path: Option<PathBuf>,
        /// Directory the browser test suite is served from
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

async fn run_serve(
    config_file: Option<String>,
    port: u16,
    cli_path: Option<PathBuf>,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load(config_file.as_deref())?;
    // Command-line flags win over the config file.
    if let Some(path) = cli_path {
        config.cli_path = path;
    }
    if let Some(dir) = static_dir {
        config.static_dir = dir;
    }

    info!("starting bridge on port {port}");
    server::serve(config, port).await
}

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init();

    let args = AppCli::parse();
    match args.command {
        Some(Commands::Serve {
            port,
            cli_path,
            static_dir,
        }) => run_serve(args.config, port, cli_path, static_dir).await?,
        None => run_serve(args.config, 8765, None, None).await?,
    }

    Ok(())
}
