//! Interactive line client: `hkv-client-cli <server-ip> <server-port>`.
//!
//! Reads lines from stdin until `done`, ships the batch as one frame,
//! and prints whatever the server sends back on a background task.

use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let usage = "usage: hkv-client-cli <server-ip> <server-port>";
    let server_ip = args.next().ok_or_else(|| anyhow::anyhow!(usage))?;
    let server_port = args.next().ok_or_else(|| anyhow::anyhow!(usage))?;
    let addr = format!("{server_ip}:{server_port}");

    let runtime = tokio::runtime::Runtime::new()?;
    let stream = runtime.block_on(TcpStream::connect(&addr))?;
    tracing::info!(%addr, "connected");

    let (read_half, write_half) = stream.into_split();
    let write_half = Arc::new(Mutex::new(write_half));
    runtime.spawn(listen_for_messages(read_half));

    loop {
        println!("Enter commands (type 'done' to finish):");
        let mut commands = Vec::new();
        loop {
            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                return Ok(());
            }
            let line = line.trim_end().to_string();
            if line.eq_ignore_ascii_case("done") {
                break;
            }
            commands.push(line);
        }

        let frame = hkv_common::protocol::encode_response(&commands);
        let write_half = write_half.clone();
        runtime.block_on(async move {
            let mut w = write_half.lock().await;
            w.write_all(&frame).await
        })?;
    }
}

async fn listen_for_messages(mut read_half: OwnedReadHalf) {
    let mut buffer = BytesMut::with_capacity(8 * 1024);
    loop {
        buffer.clear();
        match read_half.read_buf(&mut buffer).await {
            Ok(0) => {
                tracing::info!("server closed connection");
                return;
            }
            Ok(_) => match std::str::from_utf8(&buffer) {
                Ok(text) => println!("{text}"),
                Err(_) => tracing::warn!("received non-utf8 response"),
            },
            Err(err) => {
                tracing::error!(error = %err, "read failed");
                return;
            }
        }
    }
}
