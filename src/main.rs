use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tinykvm::config;
use tinykvm::web;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// tinykvm command line arguments
#[derive(Parser, Debug)]
#[command(name = "tinykvm")]
#[command(version, about = "A lightweight IP-KVM daemon", long_about = None)]
struct CliArgs {
    /// Path to the YAML configuration file
    #[arg(short = 'c', long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Listen address (overrides the configuration file)
    #[arg(short = 'a', long, value_name = "ADDRESS")]
    address: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level, args.verbose);

    tracing::info!("Starting tinykvm v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load(&args.config)?;
    if let Some(address) = args.address {
        config.listen_address = address;
    }

    // The producer pipelines require a one-time library init before any
    // session builds its first pipeline
    gstreamer::init()?;

    let config = Arc::new(config);
    let app = web::create_router(config.clone());

    let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C handler: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "tinykvm=error,tower_http=error",
        LogLevel::Warn => "tinykvm=warn,tower_http=warn",
        LogLevel::Info => "tinykvm=info,tower_http=info",
        LogLevel::Debug => "tinykvm=debug,tower_http=debug",
        LogLevel::Trace => "tinykvm=trace,tower_http=debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
