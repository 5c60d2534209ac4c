//! JSON-lines transport: one delivery per line in, one record per line out.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Split, Stdin, Stdout,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{MessageSource, ResultSink};
use crate::error::QueueError;
use crate::pipeline::types::MessageRecord;

struct LineState<R> {
    lines: Split<R>,
    line_no: usize,
}

/// Reads deliveries from a line-oriented reader.
///
/// Each non-blank line is either a JSON object (one record) or a JSON array
/// of objects (a batch). Lines are decoded individually, so a line that is
/// not valid UTF-8 only loses that delivery.
pub struct JsonLinesSource<R> {
    name: String,
    state: Mutex<LineState<R>>,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LineState {
                lines: reader.split(b'\n'),
                line_no: 0,
            }),
        }
    }
}

impl JsonLinesSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a JSON-lines file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> MessageSource for JsonLinesSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv(&self) -> Result<Option<Vec<MessageRecord>>, QueueError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        while let Some(bytes) = state.lines.next_segment().await? {
            state.line_no += 1;
            let line = std::str::from_utf8(&bytes).map_err(|e| QueueError::Malformed {
                line: state.line_no,
                reason: format!("invalid UTF-8: {e}"),
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let records = parse_delivery(trimmed, state.line_no)?;
            debug!(
                source = %self.name,
                line = state.line_no,
                records = records.len(),
                "Received delivery"
            );
            return Ok(Some(records));
        }

        Ok(None)
    }
}

/// Parse one line into records. Batches must contain only objects.
fn parse_delivery(line: &str, line_no: usize) -> Result<Vec<MessageRecord>, QueueError> {
    let malformed = |reason: String| QueueError::Malformed {
        line: line_no,
        reason,
    };

    let value: Value =
        serde_json::from_str(line).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    match value {
        Value::Object(map) => Ok(vec![MessageRecord::from(map)]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                MessageRecord::try_from(item)
                    .map_err(|_| malformed(format!("batch item {i} is not an object")))
            })
            .collect(),
        _ => Err(malformed("expected a JSON object or array".into())),
    }
}

/// Writes each published record as one JSON line.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ResultSink for JsonLinesSink<W> {
    async fn publish(&self, record: MessageRecord) -> Result<(), QueueError> {
        let mut line =
            serde_json::to_string(&record).map_err(|e| QueueError::Publish(e.to_string()))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn reject(&self, record: MessageRecord, reason: &str) -> Result<(), QueueError> {
        warn!(
            reason,
            fields = record.len(),
            "Dropping record"
        );
        Ok(())
    }
}
