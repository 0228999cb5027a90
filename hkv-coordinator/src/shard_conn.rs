//! # Shard Connection
//!
//! One persistent TCP connection per shard, held exclusively by the
//! coordinator's worker task. Request/response is synchronous: send
//! one frame, read exactly one frame back. Grounded in the pooled
//! `Connection` type the teacher's client used for its own
//! request/response cycle, minus the pool — the coordinator needs
//! exactly one long-lived connection per shard, not a pool of them.

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use hkv_common::error::{HkvError, HkvResult};
use hkv_common::protocol::{decode_request, encode_response};

pub struct ShardConnection {
    addr: String,
    stream: TcpStream,
    read_buf: BytesMut,
}

impl ShardConnection {
    pub async fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(ShardConnection {
            addr: addr.to_string(),
            stream,
            read_buf: BytesMut::with_capacity(8 * 1024),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends `commands` as one frame and returns the shard's single
    /// response frame, decoded as an array of result strings.
    pub async fn send_commands(&mut self, commands: &[String]) -> HkvResult<Vec<String>> {
        let frame = encode_response(commands);
        self.stream
            .write_all(&frame)
            .await
            .map_err(|err| HkvError::ShardUnavailable(format!("{}: {err}", self.addr)))?;

        self.read_buf.clear();
        let read = self
            .stream
            .read_buf(&mut self.read_buf)
            .await
            .map_err(|err| HkvError::ShardUnavailable(format!("{}: {err}", self.addr)))?;
        if read == 0 {
            return Err(HkvError::ShardUnavailable(format!(
                "{}: connection closed",
                self.addr
            )));
        }

        decode_request(&self.read_buf)
    }
}
