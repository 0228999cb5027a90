//! # TCP Server
//!
//! Accepts JSON-array-framed connections, decodes them into command
//! lines, and dispatches them against a shard's `CacheEngine`. Each
//! connection gets its own reader task; every reader feeds a single
//! worker task over an unbounded channel so all engine access and all
//! socket writes for a shard are serialized through one place, the
//! same reader/worker split the coordinator uses for its shard
//! connections.

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
use hkv_engine::CacheEngine;

struct WorkItem {
    writer: Arc<AsyncMutex<OwnedWriteHalf>>,
    commands: Vec<String>,
}

/// Runs the accept loop until `listener` errors. Spawns one reader
/// task per connection and a single worker task shared by all of them.
pub async fn run(listener: TcpListener, engine: Arc<CacheEngine>) -> std::io::Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<WorkItem>();

    tokio::spawn(run_worker(rx, engine));

    loop {
        let (stream, addr) = listener.accept().await?;
        tracing::info!(%addr, "accepted connection");
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, tx).await {
                tracing::warn!(%addr, error = %err, "connection terminated with error");
            }
        });
    }
}

async fn handle_connection(
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
            tracing::info!("connection closed by peer");
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

async fn run_worker(mut rx: UnboundedReceiver<WorkItem>, engine: Arc<CacheEngine>) {
    while let Some(item) = rx.recv().await {
        let results: Vec<String> = item
            .commands
            .iter()
            .map(|line| dispatch_command(line, &engine))
            .collect();
        let response = encode_response(&results);

        let mut writer = item.writer.lock().await;
        if let Err(err) = writer.write_all(&response).await {
            tracing::error!(error = %err, "failed to write response");
        }
    }
}

/// Executes one command line against `engine`, returning the exact
/// string that goes back over the wire for it.
fn dispatch_command(line: &str, engine: &CacheEngine) -> String {
    match hkv_common::command::parse(line) {
        Ok(Command::Set { key, value }) => {
            engine.put(&key, &value);
            tracing::info!(%key, %value, "inserted");
            "Inserted".to_string()
        }
        Ok(Command::Get { key }) => match engine.get(&key) {
            Some(value) => {
                tracing::info!(%key, "retrieved");
                value
            }
            None => {
                tracing::warn!(%key, "key does not exist");
                HkvError::NotFound.to_string()
            }
        },
        Ok(Command::Stats) => {
            let snapshot = engine.stats();
            serde_json::to_string_pretty(&snapshot).expect("StatsSnapshot always serializes")
        }
        Err(err) => {
            tracing::error!(%line, error = %err, "invalid command");
            err.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn spawn_shard() -> (std::net::SocketAddr, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let engine = Arc::new(CacheEngine::new(10, tmp.path()).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run(listener, engine));
        (addr, tmp)
    }

    #[tokio::test]
    async fn set_then_get_round_trips_over_the_wire() {
        let (addr, _tmp) = spawn_shard().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream
            .write_all(br#"["set foo bar"]"#)
            .await
            .unwrap();
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], br#"["Inserted"]"#);

        stream.write_all(br#"["get foo"]"#).await.unwrap();
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], br#"["bar"]"#);
    }

    #[tokio::test]
    async fn get_of_missing_key_reports_error_string() {
        let (addr, _tmp) = spawn_shard().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(br#"["get ghost"]"#).await.unwrap();
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], br#"["Error: Non existent key"]"#);
    }

    #[tokio::test]
    async fn batched_commands_in_one_frame_get_batched_results() {
        let (addr, _tmp) = spawn_shard().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream
            .write_all(br#"["set a 1", "set b 2", "get a", "get b"]"#)
            .await
            .unwrap();
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], br#"["Inserted","Inserted","1","2"]"#);
    }

    #[tokio::test]
    async fn invalid_command_reports_error_string() {
        let (addr, _tmp) = spawn_shard().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(br#"["frobnicate x"]"#).await.unwrap();
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], br#"["Error: Invalid command"]"#);
    }

    #[tokio::test]
    async fn malformed_frame_closes_connection_without_a_reply() {
        let (addr, _tmp) = spawn_shard().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"not json at all").await.unwrap();
        let mut buf = vec![0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "server must close, not reply, on a malformed frame");
    }
}
