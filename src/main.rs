//! modmap - source relationship and structure extraction service
//!
//! A command-line tool for mapping JavaScript/TypeScript projects into
//! module include graphs and per-file declaration, call and containment
//! structures, served live over a WebSocket session.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

mod core;
mod error;
mod server;

pub use crate::core::config::Config;
use crate::core::project::ProjectModel;

/// modmap - source relationship and structure extraction service
#[derive(Parser)]
#[command(name = "modmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the session server over a project
    Serve {
        /// Path to the project root
        path: PathBuf,

        /// Host to bind to (overrides configuration)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the project include map as JSON
    Map {
        /// Path to the project root
        path: PathBuf,
    },

    /// Print the map of one file as JSON
    File {
        /// Path to the project root
        path: PathBuf,

        /// Project-relative file to map
        #[arg(short, long)]
        filename: String,

        /// Include files directly connected in the include map
        #[arg(short, long)]
        related: bool,

        /// Print containment trees instead of flat mappings
        #[arg(short, long)]
        tree: bool,
    },

    /// Show server status
    Status {
        /// Host to connect to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to connect to
        #[arg(short, long, default_value_t = 3789)]
        port: u16,
    },
}

fn init_logging(verbose: bool, level: &str) {
    let filter = if verbose {
        "modmap=debug,tower_http=debug".to_string()
    } else {
        format!("modmap={level},tower_http={level}")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    init_logging(cli.verbose, &config.logging.level);

    match cli.command {
        Commands::Serve { path, host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let model = Arc::new(ProjectModel::new(path, &config.project)?);

            info!("Starting modmap server on {}:{}", host, port);
            server::run_server(&host, port, model).await?;
        }

        Commands::Map { path } => {
            let map = core::map_project(&path, &config.project).await?;
            println!("{}", serde_json::to_string_pretty(&map)?);
        }

        Commands::File {
            path,
            filename,
            related,
            tree,
        } => {
            let model = ProjectModel::new(path, &config.project)?;
            model.recompute().await?;
            let maps = model.file_map(&filename, related).await?;

            if tree {
                let mut out = Vec::new();
                for map in &maps {
                    let logic = core::logic::build_logic_tree(
                        &map.mapping.function_declarations,
                        &map.mapping.function_calls,
                        map.content.len(),
                    )?;
                    out.push(serde_json::json!({
                        "filename": map.filename,
                        "logic": logic,
                    }));
                }
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&maps)?);
            }
        }

        Commands::Status { host, port } => {
            let url = format!("http://{}:{}/api/v1/health", host, port);
            match reqwest::get(&url).await {
                Ok(resp) => {
                    if resp.status().is_success() {
                        println!("Server is running at {}:{}", host, port);
                    } else {
                        println!("Server returned status: {}", resp.status());
                    }
                }
                Err(e) => {
                    println!("Failed to connect to server: {}", e);
                }
            }
        }
    }

    Ok(())
}
