//! CLI command definitions using clap

use crate::error::ServeResult;
use clap::{Args, Parser, Subcommand};
use fngate_kernel::config::load_manifest;
use fngate_kernel::validation::DEFAULT_PORT;
use fngate_kernel::GatewayConfig;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Manifest read when `--manifest` is not given.
pub const DEFAULT_MANIFEST: &str = "fngate.yml";

/// fngate - local API gateway simulator for native function handlers
#[derive(Debug, Parser)]
#[command(name = "fngate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the project's functions over HTTP
    Serve(ServeArgs),

    /// Print the routes the project declares
    Routes(ServeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short = 'P', long, env = "FNGATE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// URL prefix for every endpoint
    #[arg(short = 'p', long, default_value = "")]
    pub prefix: String,

    /// Shared library exporting `fngate_init`, run before listening
    #[arg(short, long)]
    pub init: Option<PathBuf>,

    /// Project manifest (YAML, TOML or JSON)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

impl ServeArgs {
    /// Assemble the gateway configuration, loading endpoints from the
    /// manifest.
    ///
    /// A missing default manifest yields a gateway without functions; a
    /// missing explicit one is an error.
    pub fn into_config(self) -> ServeResult<GatewayConfig> {
        let endpoints = match &self.manifest {
            Some(path) => load_manifest(path)?,
            None if Path::new(DEFAULT_MANIFEST).exists() => {
                load_manifest(Path::new(DEFAULT_MANIFEST))?
            }
            None => {
                warn!(manifest = DEFAULT_MANIFEST, "no manifest found, serving no functions");
                Vec::new()
            }
        };

        let mut config = GatewayConfig::new()
            .with_port(self.port)
            .with_host(self.host)
            .with_prefix(self.prefix)
            .with_endpoints(endpoints);
        if let Some(init) = self.init {
            config = config.with_init(init);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServeError;
    use std::io::Write;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["fngate", "serve"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.prefix, "");
        assert!(args.init.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn short_flags_distinguish_port_and_prefix() {
        let cli = Cli::try_parse_from([
            "fngate", "serve", "-P", "8080", "-p", "api", "-i", "libinit.so", "-v",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 8080);
        assert_eq!(args.prefix, "api");
        assert_eq!(args.init, Some(PathBuf::from("libinit.so")));
        assert!(cli.verbose);
    }

    #[test]
    fn explicit_manifest_must_exist() {
        let cli = Cli::try_parse_from(["fngate", "routes", "-m", "/nonexistent/fngate.yml"]).unwrap();
        let Commands::Routes(args) = cli.command else {
            panic!("expected routes");
        };
        assert!(matches!(args.into_config(), Err(ServeError::Manifest(_))));
    }

    #[test]
    fn manifest_endpoints_reach_the_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"functions":[{{"name":"hi","handler":"hi/lib.run","endpoints":[{{"path":"hi","method":"GET"}}]}}]}}"#
        )
        .unwrap();

        let args = ServeArgs {
            port: 9000,
            host: "127.0.0.1".into(),
            prefix: "dev".into(),
            init: None,
            manifest: Some(path),
        };
        let config = args.into_config().unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.normalized_prefix(), "dev/");
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].function_name, "hi");
    }
}
