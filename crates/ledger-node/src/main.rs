mod actor;
mod api;
mod config;
mod constants;
mod mining;

use anyhow::Context;
use clap::Parser;
use config::{Args, Backend, LogFormat};
use ledger_core::{Chain, ChainStore};
use ledger_storage::{FileStore, SledStore};
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => fmt().with_env_filter(filter).init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).init(),
    }
}

fn open_store(args: &Args) -> anyhow::Result<Box<dyn ChainStore>> {
    let store: Box<dyn ChainStore> = match args.backend {
        Backend::File => Box::new(FileStore::init(&args.data_dir)?),
        Backend::Sled => Box::new(SledStore::open(&args.data_dir)?),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let store = open_store(&args)
        .with_context(|| format!("failed to open storage at {}", args.data_dir))?;
    let chain = Chain::open(store, args.ledger_config()).context("failed to load recent blocks")?;
    let (ledger, actor_task) = actor::spawn(chain);

    let trigger = tokio::spawn(mining::run(
        ledger.clone(),
        args.reward_address.clone(),
        args.mining_interval(),
    ));

    let addr: SocketAddr = args.listen.parse()?;
    info!(
        backend = ?args.backend,
        reward_address = %args.reward_address,
        interval_secs = args.mining_interval().as_secs(),
        "ledger-node listening on http://{addr}"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    api::serve(listener, ledger, signal).await?;

    trigger.abort();
    let _ = trigger.await;
    actor_task.await?;
    info!("ledger-node stopped");
    Ok(())
}
