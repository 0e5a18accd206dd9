mod nta_config;
mod nta_controllers;
mod nta_countdown;
mod nta_directions;
mod nta_locale;
mod nta_models;
mod nta_poller;
mod nta_session;
mod nta_station_graph;
mod nta_trains;
mod nta_views;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;

use nta_config::{CliArgs, Config, parse_location};
use nta_controllers::NTAControllers;
use nta_models::{HttpTransport, Lang};
use nta_session::{SessionStore, sanitize_search};
use nta_station_graph::StationGraph;

fn main() {
    // Set up panic hook for better error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n{}", "═".repeat(70));
        eprintln!("❌ APPLICATION PANIC");
        eprintln!("{}", "═".repeat(70));
        eprintln!("\nThe application encountered an unexpected error:");
        eprintln!("{}", panic_info);
        eprintln!("\n💡 Troubleshooting:");
        eprintln!("  • Run again with RUST_LOG=debug for details");
        eprintln!("  • Check that the feed at NTA_BASE_URL is reachable");
        eprintln!("\n{}", "═".repeat(70));
    }));

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match std::panic::catch_unwind(run) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("\n✗ {:#}", e);
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("\n⚠️  Application terminated unexpectedly");
            std::process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = CliArgs::parse();
    let config = Config::from_env()
        .context("Invalid NTA_* environment")?
        .apply_cli(&cli);

    let graph = match &config.stations_path {
        Some(path) => StationGraph::load(path)?,
        None => StationGraph::bundled()?,
    };
    if graph.is_empty() {
        anyhow::bail!("The station dataset is empty");
    }
    log::info!("{} stations loaded", graph.len());

    let near = cli
        .near
        .as_deref()
        .map(parse_location)
        .transpose()
        .context("Invalid --near")?;

    let store = SessionStore::open(&config.storage_path);
    let mut session = store.restore(cli.link.as_deref());
    if let Some(code) = &cli.lang {
        session.lang = code.parse::<Lang>().context("Invalid --lang")?;
    }
    if let Some(text) = &cli.search {
        session.search = sanitize_search(text);
    }

    let transport = Arc::new(HttpTransport::new(&config.base_url, config.request_timeout)?);
    let controllers =
        NTAControllers::new(config, graph, transport, store, &session, near);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(controllers.run(cli.station, &session.search))?;

    Ok(())
}
