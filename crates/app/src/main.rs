mod cli;
mod html;
mod scene;
mod server;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use map_query::{HttpBackend, QueryOrchestrator};
use tracing::info;

use crate::{
    cli::{ConsoleCliArgs, ConsoleConfig},
    scene::{SceneSurface, shared_scene},
    server::{ConsoleBackend, spawn_console_server},
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = ConsoleCliArgs::parse();
    telemetry::init(args.log_filter.as_deref());
    let config = ConsoleConfig::try_from(args)?;

    let backend = HttpBackend::new(&config.client).context("Failed to build HTTP client")?;
    info!(
        "Spatial-index service at {} (timeout: {:?})",
        backend.base_url(),
        config.client.request_timeout
    );

    let scene = shared_scene();
    let orchestrator = Arc::new(QueryOrchestrator::new(
        Box::new(backend) as ConsoleBackend,
        SceneSurface::new(scene.clone()),
        config.orchestrator,
    ));

    spawn_console_server(orchestrator, scene, config.bind, config.port)?.join()
}
