//! Log stream framing.
//!
//! Docker-compatible daemons emit logs either as one full blob (one-shot) or
//! as a multiplexed stream of length-prefixed frames (follow mode). This
//! module owns both decodings; see spec's Design Notes for why this is a
//! first-class decoder rather than a private helper bolted onto the client.

use bytes::{Buf, Bytes, BytesMut};

/// Header size of one multiplexed-stream frame: 1 byte stream kind (ignored),
/// 3 reserved bytes, 4-byte big-endian payload length.
const HEADER_LEN: usize = 8;

/// Incrementally decodes a multiplexed Docker log stream into payload
/// chunks. Feed raw bytes as they arrive; call [`FrameDecoder::poll`] after
/// each feed to drain any complete frames.
#[derive(Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop one complete frame's payload if the buffer holds a full header
    /// and payload, else `None`.
    pub fn poll(&mut self) -> Option<Bytes> {
        if self.buf.len() < HEADER_LEN {
            return None;
        }
        let len = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]) as usize;
        if self.buf.len() < HEADER_LEN + len {
            return None;
        }
        self.buf.advance(HEADER_LEN);
        Some(self.buf.split_to(len).freeze())
    }

    /// Drain every currently-available complete frame.
    pub fn drain(&mut self) -> Vec<Bytes> {
        let mut out = Vec::new();
        while let Some(frame) = self.poll() {
            out.push(frame);
        }
        out
    }
}

/// Split a one-shot log blob into lines, each with its trailing `\n`
/// restored. A trailing newline in the blob does not produce a spurious
/// empty final record.
pub fn split_one_shot(blob: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(blob);
    text.lines().map(|line| format!("{line}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_three_framed_lines() {
        let mut dec = FrameDecoder::new();
        for payload in ["this is line 1", "this is line 2", "this is line 3"] {
            let mut frame = Vec::new();
            frame.push(1u8);
            frame.extend_from_slice(&[0, 0, 0]);
            frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            frame.extend_from_slice(payload.as_bytes());
            dec.feed(&frame);
        }
        let frames = dec.drain();
        let payloads: Vec<String> = frames
            .into_iter()
            .map(|b| String::from_utf8(b.to_vec()).unwrap())
            .collect();
        assert_eq!(payloads, vec!["this is line 1", "this is line 2", "this is line 3"]);
    }

    #[test]
    fn incomplete_header_yields_nothing() {
        let mut dec = FrameDecoder::new();
        dec.feed(&[1, 0, 0, 0, 0]);
        assert!(dec.poll().is_none());
    }

    #[test]
    fn incomplete_payload_yields_nothing_until_rest_arrives() {
        let mut dec = FrameDecoder::new();
        let mut header = vec![1u8, 0, 0, 0];
        header.extend_from_slice(&5u32.to_be_bytes());
        dec.feed(&header);
        dec.feed(b"he");
        assert!(dec.poll().is_none());
        dec.feed(b"llo");
        assert_eq!(dec.poll().unwrap().as_ref(), b"hello");
    }

    #[test]
    fn one_shot_split_restores_trailing_newline_per_line() {
        let lines = split_one_shot(b"this is line 1\nthis is line 2\n");
        assert_eq!(lines, vec!["this is line 1\n", "this is line 2\n"]);
    }
}
