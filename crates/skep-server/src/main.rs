//! skep exchange server binary (`skepd`).
//!
//! Binds the requested address with a demo-seeded in-memory store and
//! a fixed vision oracle. Real deployments build an [`ExchangeServer`]
//! in their own binary with production ports wired in.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skep_proto::{Category, FillPercent, Location, ReceptacleKey};
use skep_server::{
    ExchangeServer, ExchangeServices, FixedOracle, ProtocolVariant, ServerConfig,
    DEFAULT_BIND_ADDR,
};
use skep_store::{KnowledgeTable, MemoryBinStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Usage: skepd [bind-addr] [single-phase|two-phase]
    let args: Vec<String> = std::env::args().collect();
    let bind_addr = match args.get(1) {
        Some(raw) => raw.parse().context("invalid bind address")?,
        None => DEFAULT_BIND_ADDR,
    };
    let variant = match args.get(2).map(String::as_str) {
        Some("two-phase") => ProtocolVariant::TwoPhase,
        _ => ProtocolVariant::SinglePhase,
    };

    info!(addr = %bind_addr, variant = variant.as_str(), "Starting skep exchange server");

    let config = ServerConfig::new(bind_addr, variant);
    let mut server = ExchangeServer::new(config, demo_services()?);
    server.serve().await.context("server error")
}

/// Demo wiring: one site with a receptacle per real category, a small
/// knowledge table, and an oracle that always sees a plastic bottle.
fn demo_services() -> anyhow::Result<ExchangeServices> {
    let location = Location::parse("ABCDE").context("demo location")?;
    let store = MemoryBinStore::new();
    for code in 1..=4 {
        let category = Category::new(code).context("demo category")?;
        store.provision(
            ReceptacleKey::new(location.clone(), category),
            FillPercent::ZERO,
        );
    }

    let gateway = KnowledgeTable::new()
        .with_item("plastic bottle", Category::new(1).context("seed category")?)?
        .with_item("battery", Category::new(2).context("seed category")?)?
        .with_item("banana peel", Category::new(3).context("seed category")?)?
        .with_item("ceramic shard", Category::new(4).context("seed category")?)?;

    let fill = FillPercent::new(40).context("demo fill level")?;

    Ok(ExchangeServices {
        store: Arc::new(store),
        gateway: Arc::new(gateway),
        oracle: Arc::new(FixedOracle::new("plastic bottle", fill)),
    })
}
