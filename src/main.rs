mod api;
mod config;
mod controller;
mod datastore;
mod log;
mod model;

use anyhow::Context;
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;
use tokio::runtime::Builder;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use controller::{ExternalHandler, TaskController};
use datastore::HashMapStorage;

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;
    let env_filter = EnvFilter::try_from_env(log::LOG_FILTER_ENV);
    log::setup(env_filter, &config.log);

    info!("Starting TaskApi: {}", env!("CARGO_PKG_VERSION"));

    let runtime = Builder::new_multi_thread()
        .thread_name("http-api")
        .enable_all()
        .build()
        .context("failed to create runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.listen.addr()?;
    let listener = TcpListener::bind(addr).map_err(|err| {
        error!(reason = %err, %addr, "Unable to bind listening socket.");
        anyhow::anyhow!("listen on {}: {}", addr, err)
    })?;

    let datastore = Arc::new(HashMapStorage::new());
    let external = ExternalHandler::new(&config.external)?;
    let controller = TaskController::new(datastore, config.auth, external);
    let shutdown = api::termination_signal()?;

    api::Server::new(config.listen, controller)
        .serve(listener, shutdown)
        .await?;
    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod e2e_tests;
