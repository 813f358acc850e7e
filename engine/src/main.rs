// src/main.rs
use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hotel_ac_engine::config::Cli;
use hotel_ac_engine::engine::Engine;
use hotel_ac_engine::{binding, ticker};

#[tokio::main]
async fn main() -> Result<()> {
    // -------- logging ----------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("hotel_ac_engine=info".parse().unwrap())
                .add_directive("tokio=warn".parse().unwrap()),
        )
        .compact()
        .init();

    // -------- config ----------
    let config = Cli::parse_and_build_config();
    info!(?config, "hotel AC engine starting");

    // -------- engine + background ticker ----------
    let engine = Engine::new(config.clone());
    let bind_addr = config.bind_addr.clone();
    let _ticker = ticker::spawn(engine.clone());

    info!(%bind_addr, "binding layer listening, press Ctrl+C to stop");

    // -------- serve until shutdown ----------
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    binding::serve(&bind_addr, engine, shutdown).await?;

    info!("shutdown complete");
    Ok(())
}
