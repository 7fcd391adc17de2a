//! fngate — entry point.
//!
//! Loads the project manifest and serves its native functions over HTTP.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FNGATE_PORT` | `1465` | TCP port to listen on. |
//! | `RUST_LOG` | `fngate_gateway=info,fngate_kernel=info` | Log filter. |

use anyhow::Context;
use clap::Parser;
use fngate_gateway::cli::{Cli, Commands};
use fngate_gateway::init::DylibInitHook;
use fngate_gateway::resolver::DylibResolver;
use fngate_gateway::GatewayServer;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fngate_gateway={default_level},fngate_kernel={default_level}"
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve(args) => {
            let config = args.into_config()?;
            let init = config.init.clone();

            let mut server = GatewayServer::new(config, Arc::new(DylibResolver::new()));
            if let Some(path) = init {
                server = server.with_init_hook(DylibInitHook::load(path)?);
            }
            server.start().await.context("gateway server failed")?;
        }

        Commands::Routes(args) => {
            let config = args.into_config()?;
            let server = GatewayServer::new(config, Arc::new(DylibResolver::new()));
            for entry in server.route_table()?.entries() {
                println!(
                    "{:<8} {:<40} {} ({})",
                    entry.method().as_str(),
                    entry.display_path(),
                    entry.endpoint().function_name,
                    entry.endpoint().handler
                );
            }
        }
    }

    Ok(())
}
