//! Skeleton storefront server.
//!
//! Commands:
//! - `skeleton-storefront serve` - Serve the storefront over HTTP
//! - `skeleton-storefront check` - Validate the configuration and exit

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use skeleton_storefront::{build_router, AppState};
use storefront_core::StorefrontEnv;
use storefront_data::HyperTransport;
use storefront_observability::{init_logging, LogFormat};

/// Skeleton storefront - streaming SSR over the Storefront API
#[derive(Parser)]
#[command(name = "skeleton-storefront")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (TOML). Environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format: json or human
    #[arg(long, global = true, default_value = "json")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the storefront
    Serve(ServeArgs),

    /// Validate the configuration
    Check,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

fn load_env(path: Option<&PathBuf>) -> Result<StorefrontEnv> {
    let env = match path {
        Some(path) => StorefrontEnv::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => StorefrontEnv::default(),
    };
    Ok(env.with_process_env())
}

async fn serve(args: ServeArgs, env: StorefrontEnv) -> Result<()> {
    let state = AppState::new(env, Arc::new(HyperTransport::new()))?;
    let router = build_router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, "storefront listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    let env = load_env(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve(args) => serve(args, env).await,
        Commands::Check => {
            env.validate().context("invalid storefront environment")?;
            println!(
                "ok: {} (API {})",
                env.store_domain,
                env.api_version()
            );
            Ok(())
        }
    }
}
