//! Response body channel.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio::sync::mpsc;

/// Default number of chunks buffered between the assembler and the transport.
pub const DEFAULT_BODY_CAPACITY: usize = 32;

/// The response body reader was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("response body closed by consumer")]
pub struct BodyClosed;

/// Create a connected writer and body.
pub(crate) fn channel(capacity: usize) -> (BodyWriter, ResponseBody) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        BodyWriter {
            tx,
            bytes_written: 0,
            chunks_written: 0,
        },
        ResponseBody { rx },
    )
}

/// Write half of the response body, owned by the assembler.
#[derive(Debug)]
pub(crate) struct BodyWriter {
    tx: mpsc::Sender<Bytes>,
    bytes_written: usize,
    chunks_written: usize,
}

impl BodyWriter {
    /// Send one chunk, waiting for capacity. Empty chunks are skipped.
    pub(crate) async fn write(&mut self, chunk: Bytes) -> Result<(), BodyClosed> {
        if chunk.is_empty() {
            return Ok(());
        }
        let len = chunk.len();
        self.tx.send(chunk).await.map_err(|_| BodyClosed)?;
        self.bytes_written += len;
        self.chunks_written += 1;
        Ok(())
    }

    pub(crate) fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub(crate) fn chunks_written(&self) -> usize {
        self.chunks_written
    }
}

/// Streaming response body.
///
/// Yields markup chunks in production order and ends when the render
/// settles. Implements `Stream<Item = Bytes>` for the HTTP transport.
#[derive(Debug)]
pub struct ResponseBody {
    rx: mpsc::Receiver<Bytes>,
}

impl ResponseBody {
    /// Read the whole body into memory.
    pub async fn into_bytes(mut self) -> Bytes {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.rx.recv().await {
            buf.extend_from_slice(&chunk);
        }
        buf.freeze()
    }

    /// Read the whole body as (lossy) UTF-8.
    pub async fn into_string(self) -> String {
        String::from_utf8_lossy(&self.into_bytes().await).into_owned()
    }
}

impl Stream for ResponseBody {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }
}
