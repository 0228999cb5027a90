//! Coordinator binary: `hkv-coordinator <listen-ip> <listen-port> <shard-ip:port>...`.

use tokio::net::TcpListener;

const DEFAULT_REPLICAS: usize = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let usage = "usage: hkv-coordinator <listen-ip> <listen-port> <shard-ip:port>...";
    let listen_ip = args.next().ok_or_else(|| anyhow::anyhow!(usage))?;
    let listen_port = args.next().ok_or_else(|| anyhow::anyhow!(usage))?;
    let shard_addrs: Vec<String> = args.collect();
    if shard_addrs.is_empty() {
        anyhow::bail!("{usage} (at least one shard is required)");
    }

    let addr = format!("{listen_ip}:{listen_port}");
    let listener = TcpListener::bind(&addr).await.map_err(|err| {
        tracing::error!(%addr, error = %err, "failed to bind listener");
        err
    })?;
    tracing::info!(%addr, shards = ?shard_addrs, "listening for clients");

    hkv_coordinator::run(listener, &shard_addrs, DEFAULT_REPLICAS).await
}
