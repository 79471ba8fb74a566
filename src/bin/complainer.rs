use std::sync::Arc;

use clap::Parser;
use complainer::{
    api::{ApiState, spawn_api_server},
    config::{Config, http_client},
    monitor::Monitor,
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![
        ("complainer", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::parse();
    init(config.log_level);
    trace!("started with config: {config:?}");

    let client = http_client()?;
    let cluster = config.cluster()?;
    let uploader = config.uploader(&client)?;
    let reporters = config.reporters(&client).await?;
    let matcher = config.matcher()?;

    info!(
        "watching {} master(s) as {:?}, reporting to {:?}",
        cluster.masters().len(),
        config.name,
        reporters.keys().collect::<Vec<_>>()
    );

    let mut monitor = Monitor::new(
        config.name.clone(),
        Arc::new(cluster),
        uploader,
        reporters,
        config.defaults,
    )
    .with_matcher(matcher);

    if let Some(addr) = config.listen_addr() {
        spawn_api_server(addr, ApiState::new(monitor.health())).await?;
    }

    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if let Err(e) = monitor.run().await {
            error!("error running monitor: {e:#}");
        }
    }
}
