use tracing::warn;

/// One complete `data:` record extracted from the stream.
///
/// The payload is the un-parsed text after the `data:` prefix; interpreting
/// it is the router's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: String,
}

/// Reassembles complete frames from raw transport deltas.
///
/// Delta boundaries carry no meaning: a frame may arrive split across any
/// number of deltas, so unconsumed trailing bytes are carried over between
/// `feed` calls instead of being re-split per delivery. Emitted frames plus
/// the pending remainder always account for every byte received, in order.
#[derive(Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    /// Appends a delta and drains every complete frame now available.
    ///
    /// A frame is terminated by a blank line (`\n\n`, or `\r\n\r\n` from
    /// servers that emit CRLF). The remainder stays buffered for the next
    /// call.
    pub fn feed(&mut self, delta: &[u8]) -> Vec<Frame> {
        self.pending.extend_from_slice(delta);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_record_separator(&self.pending) {
            let block = self.pending[..idx].to_vec();
            self.pending.drain(..idx + delim_len);
            if let Some(frame) = parse_block(&block) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Consumes a trailing unterminated record at end-of-stream.
    ///
    /// Some servers omit the final record separator; a trailing block that
    /// still carries a `data:` line is returned as the last frame. Anything
    /// else is logged and discarded as truncated.
    pub fn flush(&mut self) -> Option<Frame> {
        if self.pending.is_empty() {
            return None;
        }
        let block = std::mem::take(&mut self.pending);
        let frame = parse_block(&block);
        if frame.is_none() {
            warn!(
                len = block.len(),
                "discarding trailing bytes without a data record"
            );
        }
        frame
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn find_record_separator(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        i += 1;
    }
    None
}

fn parse_block(bytes: &[u8]) -> Option<Frame> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        // Blank keep-alive lines and `:` comments are consumed, not errors.
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        return None;
    }
    Some(Frame {
        payload: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_str(decoder: &mut FrameDecoder, text: &str) -> Vec<Frame> {
        decoder.feed(text.as_bytes())
    }

    #[test]
    fn drains_multiple_frames_from_one_delta() {
        let mut decoder = FrameDecoder::default();
        let frames = feed_str(&mut decoder, "data: one\n\ndata: two\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload, "one");
        assert_eq!(frames[1].payload, "two");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn carries_partial_frame_across_delta_boundary() {
        let mut decoder = FrameDecoder::default();
        assert!(feed_str(&mut decoder, "data: {\"content\":\"ab").is_empty());
        let frames = feed_str(&mut decoder, "c\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, "{\"content\":\"abc\"}");
    }

    #[test]
    fn any_split_point_yields_the_same_frames() {
        let text = "data: {\"content\":\"Para 1. \"}\n\ndata: {\"content\":\"Para 2.\"}\r\n\r\ndata: {\"done\":true}\n\n";
        let mut reference = FrameDecoder::default();
        let expected = feed_str(&mut reference, text);
        assert_eq!(expected.len(), 3);

        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut decoder = FrameDecoder::default();
            let mut frames = decoder.feed(&bytes[..split]);
            frames.extend(decoder.feed(&bytes[split..]));
            assert_eq!(frames, expected, "split at byte {split}");
        }
    }

    #[test]
    fn keep_alive_blanks_and_comments_are_ignored() {
        let mut decoder = FrameDecoder::default();
        let frames = feed_str(&mut decoder, ": ping\n\n\n\ndata: ok\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, "ok");
    }

    #[test]
    fn flush_recovers_final_frame_without_trailing_separator() {
        let mut decoder = FrameDecoder::default();
        assert!(feed_str(&mut decoder, "data: {\"done\":true}").is_empty());
        let frame = decoder.flush().expect("trailing frame");
        assert_eq!(frame.payload, "{\"done\":true}");
        assert!(decoder.flush().is_none());
    }

    #[test]
    fn flush_discards_trailing_bytes_without_data_line() {
        let mut decoder = FrameDecoder::default();
        assert!(feed_str(&mut decoder, ": half a comment").is_empty());
        assert!(decoder.flush().is_none());
    }

    #[test]
    fn crlf_records_decode_like_lf_records() {
        let mut decoder = FrameDecoder::default();
        let frames = feed_str(&mut decoder, "data: hi\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, "hi");
    }
}
