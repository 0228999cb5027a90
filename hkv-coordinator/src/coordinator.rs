//! # Coordinator
//!
//! Fans client commands out to shard nodes by consistent hashing, and
//! aggregates `stats` across every shard. Mirrors the shard node's
//! reader/worker split: every client connection gets a reader task,
//! and a single worker task owns the ring and every shard connection
//! outright, so shard sockets are never contended.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;

use hkv_common::command::Command;
use hkv_common::error::HkvError;
use hkv_common::protocol::{decode_request, encode_response};
use hkv_common::stats::{aggregate, StatsSnapshot};

use crate::ring::Ring;
use crate::shard_conn::ShardConnection;

struct WorkItem {
    writer: Arc<AsyncMutex<OwnedWriteHalf>>,
    commands: Vec<String>,
}

/// Connects to every shard address, builds the ring, and serves
/// clients on `listener` until it errors.
pub async fn run(
    listener: TcpListener,
    shard_addrs: &[String],
    replicas: usize,
) -> anyhow::Result<()> {
    let mut ring = Ring::new(replicas);
    let mut shards = HashMap::new();
    for addr in shard_addrs {
        let conn = ShardConnection::connect(addr).await?;
        ring.add_node(addr);
        shards.insert(addr.clone(), conn);
        tracing::info!(%addr, "connected to shard");
    }

    let (tx, rx) = mpsc::unbounded_channel::<WorkItem>();
    tokio::spawn(run_worker(rx, shards, ring));

    loop {
        let (stream, addr) = listener.accept().await?;
        tracing::info!(%addr, "accepted client connection");
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_client(stream, tx).await {
                tracing::warn!(%addr, error = %err, "client connection terminated with error");
            }
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    tx: UnboundedSender<WorkItem>,
) -> std::io::Result<()> {
    let (mut read_half, write_half) = stream.into_split();
    let writer = Arc::new(AsyncMutex::new(write_half));
    let mut buffer = BytesMut::with_capacity(8 * 1024);

    loop {
        buffer.clear();
        let read = read_half.read_buf(&mut buffer).await?;
        if read == 0 {
            tracing::info!("client connection closed");
            return Ok(());
        }

        match decode_request(&buffer) {
            Ok(commands) => {
                if tx
                    .send(WorkItem {
                        writer: writer.clone(),
                        commands,
                    })
                    .is_err()
                {
                    return Ok(());
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "malformed request frame, closing connection");
                return Ok(());
            }
        }
    }
}

async fn run_worker(
    mut rx: UnboundedReceiver<WorkItem>,
    mut shards: HashMap<String, ShardConnection>,
    ring: Ring,
) {
    while let Some(item) = rx.recv().await {
        let mut results = Vec::with_capacity(item.commands.len());
        for line in &item.commands {
            results.push(dispatch(line, &ring, &mut shards).await);
        }
        let response = encode_response(&results);

        let mut writer = item.writer.lock().await;
        if let Err(err) = writer.write_all(&response).await {
            tracing::error!(error = %err, "failed to write response to client");
        }
    }
}

async fn dispatch(
    line: &str,
    ring: &Ring,
    shards: &mut HashMap<String, ShardConnection>,
) -> String {
    let command = match hkv_common::command::parse(line) {
        Ok(command) => command,
        Err(err) => {
            tracing::error!(%line, error = %err, "invalid command");
            return err.to_string();
        }
    };

    match command {
        Command::Stats => stats_fanout(shards).await,
        Command::Set { .. } | Command::Get { .. } => {
            route_single(line, command.routing_key().expect("single-key command"), ring, shards).await
        }
    }
}

async fn route_single(
    line: &str,
    key: &str,
    ring: &Ring,
    shards: &mut HashMap<String, ShardConnection>,
) -> String {
    let Some(owner) = ring.get_node(key) else {
        tracing::error!(%key, "no shard in ring");
        return HkvError::ShardUnavailable("ring is empty".to_string()).to_string();
    };
    let owner = owner.to_string();

    let Some(conn) = shards.get_mut(&owner) else {
        tracing::error!(%owner, "ring points at an unconnected shard");
        return HkvError::ShardUnavailable(format!("no connection for shard {owner}")).to_string();
    };

    match conn.send_commands(std::slice::from_ref(&line.to_string())).await {
        Ok(mut results) if results.len() == 1 => results.remove(0),
        Ok(_) => {
            tracing::error!(%owner, "shard returned unexpected result count");
            HkvError::ShardUnavailable(format!("malformed reply from {owner}")).to_string()
        }
        Err(err) => {
            tracing::error!(%owner, error = %err, "shard request failed");
            err.to_string()
        }
    }
}

async fn stats_fanout(shards: &mut HashMap<String, ShardConnection>) -> String {
    let mut snapshots: Vec<StatsSnapshot> = Vec::with_capacity(shards.len());

    for (addr, conn) in shards.iter_mut() {
        match conn.send_commands(&["stats".to_string()]).await {
            Ok(mut results) if results.len() == 1 => {
                match serde_json::from_str::<StatsSnapshot>(&results.remove(0)) {
                    Ok(snapshot) => snapshots.push(snapshot),
                    Err(err) => tracing::error!(%addr, error = %err, "malformed stats reply"),
                }
            }
            Ok(_) => tracing::error!(%addr, "unexpected stats reply shape"),
            Err(err) => tracing::error!(%addr, error = %err, "shard unreachable for stats"),
        }
    }

    let total = aggregate(&snapshots);
    serde_json::to_string_pretty(&total).expect("StatsSnapshot always serializes")
}
