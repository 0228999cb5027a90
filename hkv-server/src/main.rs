//! Shard node binary: `hkv-server <listen-ip> <listen-port>`.

use std::sync::Arc;

use hkv_engine::CacheEngine;
use tokio::net::TcpListener;

const DEFAULT_CAPACITY: usize = 10;
const DEFAULT_DISK_PATH: &str = "./cache_disk";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let listen_ip = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: hkv-server <listen-ip> <listen-port>"))?;
    let listen_port = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: hkv-server <listen-ip> <listen-port>"))?;

    let addr = format!("{listen_ip}:{listen_port}");
    let listener = TcpListener::bind(&addr).await.map_err(|err| {
        tracing::error!(%addr, error = %err, "failed to bind listener");
        err
    })?;
    tracing::info!(%addr, "listening for clients");

    let engine = Arc::new(CacheEngine::new(DEFAULT_CAPACITY, DEFAULT_DISK_PATH)?);
    hkv_server::run(listener, engine).await?;
    Ok(())
}
