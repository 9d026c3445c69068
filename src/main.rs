//! lpd8-host binary - loads configuration, registers the built-in modules,
//! and runs until interrupted.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lpd8_host::actions::ActionMap;
use lpd8_host::config::AppConfig;
use lpd8_host::modules::{ConsoleModule, Lpd8Module, ModuleHost};
use lpd8_host::transport;

/// LPD8 host - bind pads and knobs to application actions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sampleConfig.json")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        transport::print_ports();
        return Ok(());
    }

    info!("Starting lpd8-host...");
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load(&args.config).await?;
    info!(
        "Configuration loaded: {} binding(s), {} module entry(ies)",
        config.event_bindings.len(),
        config.modules.len()
    );

    let actions = Arc::new(ActionMap::new());

    let mut host = ModuleHost::new();
    host.register(Arc::new(Lpd8Module));
    host.register(Arc::new(ConsoleModule));

    host.load_all(&config.modules, &config, &actions);
    info!("✅ {} module(s) loaded, ready for MIDI events", host.loaded_count());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping...");

    host.unload_all();
    info!("lpd8-host shutdown complete");

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
