//! Incremental server-sent-events decoding.
//!
//! DESIGN
//! ======
//! Both provider streaming APIs speak SSE over chunked HTTP bodies, and a
//! chunk boundary can land anywhere, including inside a UTF-8 sequence.
//! The decoder buffers raw bytes, emits the payload of each completed
//! `data:` line, and ignores comments, `event:` lines, and blank separators.
//! Event dispatch happens on the JSON payload, not the event name.

/// Stateful line decoder for an SSE byte stream.
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Feed raw bytes, returning the `data:` payloads of all lines completed
    /// by this chunk.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = parse_line(String::from_utf8_lossy(&line).trim()) {
                out.push(data.to_string());
            }
        }
        out
    }

    /// Flush any trailing line left when the body ends without a newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(String::from_utf8_lossy(&rest).trim()).map(str::to_string)
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the payload of a single SSE line, if it is a data line.
fn parse_line(line: &str) -> Option<&str> {
    if line.is_empty() || line.starts_with(':') || line.starts_with("event:") {
        return None;
    }
    let payload = line.strip_prefix("data:")?;
    // The SSE spec allows exactly one optional space after the colon.
    Some(payload.strip_prefix(' ').unwrap_or(payload))
}

#[cfg(test)]
#[path = "sse_test.rs"]
mod tests;
