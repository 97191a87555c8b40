//! Background stream pumps.
//!
//! A pump copies one of a child's output pipes into an [`OutputBuffer`],
//! one line at a time, until the pipe reports end of data. Lines keep the
//! terminator the child wrote; a trailing line without one is appended as
//! is. The buffer is the pump's only channel back to the command.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::output::OutputBuffer;
use crate::types::StreamKind;

/// Initial capacity of the per-line scratch buffer.
const LINE_CAPACITY: usize = 256;

/// A running pump task for one stream.
#[derive(Debug)]
pub(crate) struct StreamPump {
    stream: StreamKind,
    handle: JoinHandle<usize>,
}

impl StreamPump {
    /// Spawn a pump on the given runtime.
    pub(crate) fn spawn<R>(
        runtime: &Handle,
        stream: StreamKind,
        reader: R,
        buffer: OutputBuffer,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let handle = runtime.spawn(pump(stream, reader, buffer));
        Self { stream, handle }
    }

    /// The stream this pump reads.
    pub(crate) const fn stream(&self) -> StreamKind {
        self.stream
    }

    /// Wait for the pump to reach end of data, for at most `timeout`.
    ///
    /// Returns `false` if the pump was still running when the timeout hit,
    /// in which case it is aborted.
    pub(crate) async fn drain(self, timeout: Duration) -> bool {
        let Self { stream, mut handle } = self;
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(bytes)) => {
                tracing::trace!(%stream, bytes, "pump drained");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(%stream, error = %e, "pump task failed");
                true
            }
            Err(_) => {
                tracing::debug!(%stream, ?timeout, "pump still open after drain timeout");
                handle.abort();
                false
            }
        }
    }

    /// Stop the pump without waiting for it.
    pub(crate) fn abort(&self) {
        self.handle.abort();
    }
}

/// Copy `reader` into `buffer` line by line. Returns the bytes read.
pub(crate) async fn pump<R>(stream: StreamKind, reader: R, buffer: OutputBuffer) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::with_capacity(LINE_CAPACITY);
    let mut total = 0;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                tracing::trace!(%stream, bytes = n, "pumped line");
                if !buffer.append_bytes(&line) {
                    tracing::trace!(%stream, bytes = n, "buffer sealed, output discarded");
                }
            }
            Err(e) => {
                tracing::warn!(%stream, error = %e, "failed to read child output");
                buffer.set_fault(e);
                break;
            }
        }
    }

    tracing::debug!(%stream, total, "stream closed");
    total
}
