//! Incremental server-sent-event decoding for provider streams

/// Splits a byte stream into SSE event blocks and yields their `data` payloads
///
/// Bytes are buffered until a blank line closes an event, so multi-byte UTF-8
/// sequences and events split across network chunks decode intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Last byte pushed was `\r`; a following `\n` belongs to the same line break
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes received from the provider
    ///
    /// `\r\n` and a lone `\r` are both stored as `\n`, also when the pair is
    /// split across chunks.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.reserve(chunk.len());
        for &byte in chunk {
            match byte {
                b'\r' => self.buffer.push(b'\n'),
                b'\n' if self.after_cr => {}
                _ => self.buffer.push(byte),
            }
            self.after_cr = byte == b'\r';
        }
    }

    /// Next complete event's data payload, if one is buffered
    pub fn next_data(&mut self) -> Option<String> {
        loop {
            let end = self.buffer.windows(2).position(|w| w == b"\n\n")?;
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(data) = extract_data(&block[..end]) {
                return Some(data);
            }
        }
    }

    /// Flush an unterminated trailing event once the upstream has closed
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let block = std::mem::take(&mut self.buffer);
        extract_data(&block)
    }
}

/// Join the `data:` lines of one event block; `None` for comment-only or event-only blocks
fn extract_data(block: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(block);
    let lines: Vec<&str> = text
        .split('\n')
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
