use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use atp_types::{JsonRpcResponse, TaskStatusUpdateEvent};
use bytes::Bytes;
use futures_core::Stream;

use crate::error::ClientError;
use crate::transport::EventStream;

/// Maximum buffer size for SSE line accumulation (10 MB).
const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

type SseItem = Result<TaskStatusUpdateEvent, ClientError>;

/// SSE line parser.
///
/// Accumulates raw bytes into complete lines and emits one snapshot per
/// blank-line-terminated event.
struct SseParser {
    /// Bytes of an incomplete line carried across chunks.
    line_buffer: Vec<u8>,
    /// Accumulated `data:` value for the current event.
    data_buffer: String,
}

impl SseParser {
    fn new() -> Self {
        Self {
            line_buffer: Vec::new(),
            data_buffer: String::new(),
        }
    }

    /// Feed a raw chunk and return all completed events.
    fn feed(&mut self, chunk: &[u8]) -> Vec<SseItem> {
        let mut events = Vec::new();

        for &byte in chunk {
            if byte == b'\n' {
                let raw = std::mem::take(&mut self.line_buffer);
                let line = match String::from_utf8(raw) {
                    Ok(line) => line,
                    Err(e) => {
                        events.push(Err(ClientError::SseParse(format!("Invalid UTF-8: {e}"))));
                        continue;
                    }
                };
                let line = line.strip_suffix('\r').unwrap_or(&line);
                if let Some(result) = self.process_line(line) {
                    events.push(result);
                }
            } else {
                self.line_buffer.push(byte);
                if self.line_buffer.len() > MAX_BUFFER_SIZE {
                    events.push(Err(ClientError::SseParse("Line buffer exceeded 10 MB".into())));
                    self.line_buffer.clear();
                    self.data_buffer.clear();
                    return events;
                }
            }
        }

        events
    }

    /// Handles one complete line; an empty line ends the current event.
    fn process_line(&mut self, line: &str) -> Option<SseItem> {
        if line.is_empty() {
            if self.data_buffer.is_empty() {
                return None;
            }
            let data = std::mem::take(&mut self.data_buffer);
            return Some(Self::parse_event_data(&data));
        }

        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            if !self.data_buffer.is_empty() {
                self.data_buffer.push('\n');
            }
            self.data_buffer.push_str(value);
            if self.data_buffer.len() > MAX_BUFFER_SIZE {
                self.data_buffer.clear();
                return Some(Err(ClientError::SseParse("Data buffer exceeded 10 MB".into())));
            }
        }

        // Comments, `id:`, `event:`, `retry:` and unknown fields carry nothing we use.
        None
    }

    /// Parse accumulated data as a JSON-RPC envelope carrying a snapshot.
    fn parse_event_data(data: &str) -> SseItem {
        let response: JsonRpcResponse = serde_json::from_str(data)
            .map_err(|e| ClientError::SseParse(format!("JSON parse error: {e}")))?;

        if let Some(error) = response.error {
            return Err(ClientError::JsonRpc(error));
        }

        let result = response.result.ok_or(ClientError::EmptyResult)?;
        serde_json::from_value(result).map_err(Into::into)
    }

    fn flush(&mut self) -> Option<SseItem> {
        if self.data_buffer.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data_buffer);
        Some(Self::parse_event_data(&data))
    }
}

/// Wraps a byte stream and an `SseParser` to produce snapshots.
struct SseStream<S> {
    inner: Pin<Box<S>>,
    parser: SseParser,
    /// Events parsed from the current chunk that haven't been yielded yet.
    pending: VecDeque<SseItem>,
    finished: bool,
}

impl<S> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>>,
{
    type Item = SseItem;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(event) = this.pending.pop_front() {
            return Poll::Ready(Some(event));
        }
        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let mut events = this.parser.feed(&bytes).into_iter();
                    if let Some(first) = events.next() {
                        this.pending.extend(events);
                        return Poll::Ready(Some(first));
                    }
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(ClientError::Http(e)))),
                Poll::Ready(None) => {
                    this.finished = true;
                    return Poll::Ready(this.parser.flush());
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Create a stream that parses SSE-framed bytes into task snapshots.
pub fn parse_sse_stream(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> EventStream {
    Box::pin(SseStream {
        inner: Box::pin(byte_stream),
        parser: SseParser::new(),
        pending: VecDeque::new(),
        finished: false,
    })
}
