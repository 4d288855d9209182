use std::sync::Arc;

use sensor::error::{EngineResult, ErrorKind};
use sensor::sensor_error;
use sensor::sink::Sink;
use sensor::types::{Batch, Envelope};
use serde::Serialize;
use tokio::io::{self, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

/// First line written for every batch, followed by one line per envelope.
#[derive(Debug, Serialize)]
struct BatchHeader {
    batch_size: usize,
}

/// Sink writing envelopes as JSON lines into any [`AsyncWrite`] implementation.
///
/// A batch is encoded up front and written with a single call while holding the lock, so its
/// lines are never interleaved with those of a batch published concurrently.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

impl<W> Clone for WriterSink<W> {
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
        }
    }
}

fn encode_line<S: Serialize>(buffer: &mut Vec<u8>, value: &S) -> EngineResult<()> {
    serde_json::to_writer(&mut *buffer, value)?;
    buffer.push(b'\n');

    Ok(())
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&self, buffer: &[u8]) -> EngineResult<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(buffer).await?;

        Ok(())
    }
}

impl<W, T> Sink<T> for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
    T: Serialize + Send + 'static,
{
    fn name() -> &'static str {
        "writer"
    }

    async fn publish_one(&self, envelope: Envelope<T>) -> EngineResult<()> {
        let mut buffer = Vec::new();
        encode_line(&mut buffer, &envelope)?;

        self.write(&buffer).await
    }

    async fn publish_batch(&self, batch: Batch<T>) -> EngineResult<()> {
        let mut buffer = Vec::new();
        encode_line(
            &mut buffer,
            &BatchHeader {
                batch_size: batch.len(),
            },
        )?;
        for envelope in &batch {
            encode_line(&mut buffer, envelope)?;
        }

        self.write(&buffer).await
    }

    async fn close(&self) -> EngineResult<()> {
        let mut writer = self.writer.lock().await;
        writer.flush().await.map_err(|err| {
            sensor_error!(
                ErrorKind::SinkCloseFailed,
                "Failed to flush sink writer",
                source: err
            )
        })?;
        debug!("writer sink flushed");

        Ok(())
    }
}

/// [`WriterSink`] over the process standard output.
pub type StdoutSink = WriterSink<io::Stdout>;

impl StdoutSink {
    pub fn stdout() -> Self {
        WriterSink::new(io::stdout())
    }
}
