//! lwm2m-agent - LWM2M IoT Agent daemon
//!
//! Usage:
//!   lwm2m-agent [config.toml]
//!
//! If no config file is provided, `config.toml` in the working directory is
//! used. `IOTA_*` environment variables override values from the file.

use lwm2m_agent::{log_filter_for, start_server, AgentConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "config.toml";

fn parse_args() -> String {
    let mut config_path = None;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => config_path = Some(arg.to_string()),
            _ => eprintln!("Unknown argument: {}", arg),
        }
    }

    config_path.unwrap_or_else(|| DEFAULT_CONFIG.to_string())
}

fn print_help() {
    eprintln!(
        r#"lwm2m-agent - LWM2M IoT Agent

Usage: lwm2m-agent [config.toml]

Options:
  -h, --help    Print this help message

Environment overrides:
  IOTA_CB_HOST, IOTA_CB_PORT, IOTA_CB_NGSI_VERSION, IOTA_NORTH_HOST,
  IOTA_NORTH_PORT, IOTA_LOG_LEVEL, IOTA_SERVICE, IOTA_SUBSERVICE,
  IOTA_PROVIDER_URL
"#
    );
}

fn init_tracing(default_filter: String) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = parse_args();

    // The log level lives in the config, so a load failure is logged at the default level
    let mut config = match AgentConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(log_filter_for("INFO"));
            tracing::error!("Error starting Agent: [{}] Exiting process", e);
            std::process::exit(1);
        }
    };
    init_tracing(config.log_filter());

    tracing::info!("Loaded config from: {}", config_path);
    config.stamp_version(env!("CARGO_PKG_VERSION"));

    let agent = match start_server(config).await {
        Ok(agent) => agent,
        Err(e) => {
            tracing::error!("Error starting Agent: [{}] Exiting process", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Lightweight M2M IoT Agent started");

    tokio::signal::ctrl_c().await?;
    agent.stop().await;

    Ok(())
}
