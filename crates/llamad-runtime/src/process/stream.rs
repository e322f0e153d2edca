//! Readers that copy the server's stdout/stderr into the log sink.
//!
//! llama-server can emit non-UTF8 bytes. Lines are read as bytes and decoded
//! lossily so one bad byte never ends the reader.

use std::sync::Arc;

use llamad_core::logs::LogLevel;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::logs::MemoryLogSink;

/// Spawn a task appending every line of `stream` to `sink` under `subsystem`.
///
/// The task ends at EOF, which happens when the server exits.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    sink: Arc<MemoryLogSink>,
    subsystem: String,
    level: LogLevel,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }
                    sink.append(&subsystem, level, String::from_utf8_lossy(&buf));
                }
                Err(e) => {
                    debug!(%subsystem, error = %e, "server output reader exiting on read error");
                    break;
                }
            }
        }
    })
}
