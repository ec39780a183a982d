// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # AEGIS Component Host
//!
//! The `aegis-component` binary hosts a component over gRPC and probes
//! running ones.
//!
//! ## Commands
//!
//! - `aegis-component serve` - Serve the built-in echo agent (default)
//! - `aegis-component health` - Probe a component's `Health` RPC
//!
//! Settings resolve as flag, then environment variable, then default.
//! A `.env` file in the working directory is loaded first.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aegis_component_host::echo::{EchoAgent, EchoTool};
use aegis_component_host::probe::{probe, ProbeOutcome};
use aegis_component_sdk::{
    registry_from_env, resolve_port, ComponentServer, ServerConfig, StandaloneHarnessFactory,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// AEGIS Component Host - Serve and probe AEGIS components
#[derive(Parser)]
#[command(name = "aegis-component")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AEGIS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Serve options used when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    /// The subcommand to run; bare `aegis-component` means `serve` with the
    /// top-level serve options.
    fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the built-in echo agent until SIGINT/SIGTERM
    #[command(name = "serve")]
    Serve(ServeArgs),

    /// Probe a running component (exit 0 healthy, 1 not healthy, 3 unreachable)
    #[command(name = "health")]
    Health(HealthArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// gRPC port (falls back to AEGIS_COMPONENT_PORT, then 50051; 0 picks one)
    #[arg(long)]
    port: Option<u16>,

    /// Interface to bind
    #[arg(long, env = "AEGIS_HOST", default_value = "0.0.0.0")]
    host: Option<IpAddr>,

    /// Also listen on a Unix domain socket at this path
    #[arg(long, env = "AEGIS_SOCKET_PATH", value_name = "FILE")]
    socket: Option<PathBuf>,

    /// PEM certificate; TLS is enabled when both cert and key are set
    #[arg(long, env = "AEGIS_TLS_CERT", value_name = "FILE")]
    tls_cert: Option<PathBuf>,

    /// PEM private key
    #[arg(long, env = "AEGIS_TLS_KEY", value_name = "FILE")]
    tls_key: Option<PathBuf>,

    /// Seconds to wait for in-flight calls before forcing shutdown
    #[arg(long, env = "AEGIS_GRACEFUL_TIMEOUT", default_value = "30")]
    graceful_timeout: Option<u64>,

    /// Host name advertised to the service registry
    #[arg(long)]
    advertise: Option<String>,
}

#[derive(Args, Debug)]
struct HealthArgs {
    /// Component endpoint
    #[arg(long, env = "AEGIS_COMPONENT_ENDPOINT", default_value = "http://127.0.0.1:50051")]
    endpoint: String,

    /// Connect and request timeout in seconds
    #[arg(long, default_value = "5")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.into_command() {
        Commands::Serve(args) => serve(args).await,
        Commands::Health(args) => {
            let code = health(args).await?;
            std::process::exit(code);
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let port = resolve_port(args.port).context("Failed to resolve port")?;

    let mut builder = ServerConfig::builder()
        .port(port)
        .tls_cert(args.tls_cert)
        .tls_key(args.tls_key);
    if let Some(host) = args.host {
        builder = builder.host(host);
    }
    if let Some(socket) = args.socket {
        builder = builder.socket_path(socket);
    }
    if let Some(secs) = args.graceful_timeout {
        builder = builder.graceful_timeout(Duration::from_secs(secs));
    }
    if let Some(advertise) = args.advertise {
        builder = builder.advertise_addr(advertise);
    }
    if let Some(registry) = registry_from_env() {
        builder = builder.registry(registry);
    }

    let factory = StandaloneHarnessFactory::new().with_tool(Arc::new(EchoTool));
    let server = ComponentServer::start(builder.build(), Arc::new(EchoAgent), Arc::new(factory))
        .await
        .context("Failed to start component server")?;

    info!(addr = %server.local_addr(), "AEGIS component host ready");

    server
        .serve(CancellationToken::new())
        .await
        .context("Component server failed")?;

    info!("AEGIS component host stopped");
    Ok(())
}

async fn health(args: HealthArgs) -> Result<i32> {
    let outcome = probe(&args.endpoint, Duration::from_secs(args.timeout)).await?;
    match &outcome {
        ProbeOutcome::Healthy => println!("healthy"),
        ProbeOutcome::NotHealthy { state, message } => {
            println!("not healthy: {} {}", state, message);
        }
        ProbeOutcome::Unreachable(reason) => {
            warn!(endpoint = %args.endpoint, "Component unreachable");
            eprintln!("unreachable: {}", reason);
        }
    }
    Ok(outcome.exit_code())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_invocation_serves_with_top_level_flags() {
        let cli = Cli::try_parse_from([
            "aegis-component",
            "--port",
            "6001",
            "--socket",
            "/run/aegis/agent.sock",
            "--graceful-timeout",
            "5",
        ])
        .unwrap();

        match cli.into_command() {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(6001));
                assert_eq!(args.socket, Some(PathBuf::from("/run/aegis/agent.sock")));
                assert_eq!(args.graceful_timeout, Some(5));
            }
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_invocation_reads_environment() {
        // Only this test touches these variables
        std::env::set_var("AEGIS_SOCKET_PATH", "/tmp/aegis-env.sock");
        std::env::set_var("AEGIS_HOST", "127.0.0.1");
        std::env::set_var("AEGIS_GRACEFUL_TIMEOUT", "7");

        let parsed = Cli::try_parse_from(["aegis-component"]).map(Cli::into_command);

        std::env::remove_var("AEGIS_SOCKET_PATH");
        std::env::remove_var("AEGIS_HOST");
        std::env::remove_var("AEGIS_GRACEFUL_TIMEOUT");

        match parsed.unwrap() {
            Commands::Serve(args) => {
                assert_eq!(args.socket, Some(PathBuf::from("/tmp/aegis-env.sock")));
                assert_eq!(args.host, Some("127.0.0.1".parse::<IpAddr>().unwrap()));
                assert_eq!(args.graceful_timeout, Some(7));
            }
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_serve_subcommand_flags() {
        let cli = Cli::try_parse_from(["aegis-component", "serve", "--port", "0"]).unwrap();
        match cli.into_command() {
            Commands::Serve(args) => assert_eq!(args.port, Some(0)),
            other => panic!("expected serve, got {:?}", other),
        }
    }

    #[test]
    fn test_health_subcommand() {
        let cli = Cli::try_parse_from([
            "aegis-component",
            "health",
            "--endpoint",
            "http://10.0.0.5:50051",
        ])
        .unwrap();
        match cli.into_command() {
            Commands::Health(args) => {
                assert_eq!(args.endpoint, "http://10.0.0.5:50051");
                assert_eq!(args.timeout, 5);
            }
            other => panic!("expected health, got {:?}", other),
        }
    }
}
