//! Line framing for the serial byte stream.
//!
//! Splits on `\n` and strips a trailing `\r`. Bytes are decoded lossily so a
//! corrupted byte never ends the stream; the damaged line is dropped later
//! by the decoder. Lines longer than the maximum are skipped up to the next
//! newline.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::debug;

/// Default maximum line length in bytes, excluding the terminator.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Index into the buffer up to which no newline has been found.
    next_index: usize,
    max_length: usize,
    /// True while skipping the rest of an overlong line.
    is_discarding: bool,
    discarded: u64,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            is_discarding: false,
            discarded: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Number of overlong lines skipped so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, std::io::Error> {
        loop {
            // +1 so a line of exactly max_length still finds its newline
            let read_to = self.max_length.saturating_add(1).min(buf.len());
            let newline = buf[self.next_index..read_to].iter().position(|b| *b == b'\n');

            match (self.is_discarding, newline) {
                (true, Some(offset)) => {
                    buf.advance(self.next_index + offset + 1);
                    self.is_discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let newline_index = self.next_index + offset;
                    self.next_index = 0;
                    let line = buf.split_to(newline_index + 1);
                    return Ok(Some(to_line(&line[..newline_index])));
                }
                (false, None) if buf.len() > self.max_length => {
                    self.is_discarding = true;
                    self.discarded += 1;
                    debug!("Discarding line longer than {} bytes", self.max_length);
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, std::io::Error> {
        Ok(match self.decode(buf)? {
            Some(line) => Some(line),
            None if self.is_discarding => {
                buf.clear();
                self.is_discarding = false;
                None
            }
            None if buf.is_empty() => None,
            None => {
                let line = buf.split_to(buf.len());
                self.next_index = 0;
                Some(to_line(&line))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut LineCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = codec.decode(buf).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_splits_lines_and_strips_cr() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"a1.5,2.5,3.5\r\nt37\n\nt3"[..]);

        let lines = decode_all(&mut codec, &mut buf);
        assert_eq!(lines, vec!["a1.5,2.5,3.5", "t37", ""]);
        assert_eq!(&buf[..], b"t3");
    }

    #[test]
    fn test_line_split_across_reads() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"t3"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"7\r");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"\na1");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("t37".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"\xfft37\nt38\n"[..]);

        let lines = decode_all(&mut codec, &mut buf);
        assert_eq!(lines, vec!["\u{fffd}t37", "t38"]);
    }

    #[test]
    fn test_overlong_line_is_discarded() {
        let mut codec = LineCodec::with_max_length(8);
        let mut buf = BytesMut::from(&b"a123456789,"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b"0000\nt37\n");
        let lines = decode_all(&mut codec, &mut buf);
        assert_eq!(lines, vec!["t37"]);
        assert_eq!(codec.discarded(), 1);
    }

    #[test]
    fn test_line_at_max_length_is_kept() {
        let mut codec = LineCodec::with_max_length(4);
        let mut buf = BytesMut::from(&b"t123\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("t123".to_string()));
    }

    #[test]
    fn test_eof_flushes_partial_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"t37\nt38"[..]);

        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some("t37".to_string()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some("t38".to_string()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }
}
