//! Incremental JPEG frame extraction from a raw MJPEG byte stream.
//!
//! Bytes arrive in arbitrary chunks. The extractor finds a start-of-image
//! marker, then walks the JPEG marker structure to find the matching
//! end-of-image marker:
//!
//! - length-prefixed header segments are skipped whole, so an EXIF
//!   thumbnail carrying its own `FF D9` does not end the frame early;
//! - inside entropy-coded data, `FF 00` stuffing and `FF D0..D7` restart
//!   markers are data, and the first `FF D9` ends the frame;
//! - a payload that does not follow the marker structure (a non-marker
//!   byte or an `FF` followed by a code outside `C0..FE`) is scanned
//!   plainly for the next `FF D9`.
//!
//! A payload that happens to look like a valid marker with a length
//! prefix is still trusted, so its declared length is skipped.
//!
//! Each completed frame starts with `FF D8` and ends with `FF D9`. Scan
//! progress is kept between calls, so data is never rescanned.

use bytes::{Buf, Bytes, BytesMut};

const MARKER: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Expecting a marker at the cursor.
    Header,
    /// Inside entropy-coded (or unstructured) data.
    Entropy,
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    pos: usize,
    phase: Phase,
}

/// Reassembles complete JPEG frames from stream chunks.
#[derive(Debug)]
pub struct FrameExtractor {
    buf: BytesMut,
    scan: Option<Cursor>,
    max_frame_bytes: usize,
    dropped: u64,
}

impl FrameExtractor {
    /// Create an extractor that abandons frames larger than `max_frame_bytes`.
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scan: None,
            max_frame_bytes: max_frame_bytes.max(4),
            dropped: 0,
        }
    }

    /// Append raw bytes read from the stream.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Drop any buffered partial frame.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.scan = None;
    }

    /// Bytes currently held.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Frames abandoned for exceeding the size limit.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Extract the next complete frame, if the buffer holds one.
    pub fn next_frame(&mut self) -> Option<Bytes> {
        loop {
            let mut cursor = match self.scan {
                Some(cursor) => cursor,
                None => match find_start(&self.buf) {
                    Some(start) => {
                        self.buf.advance(start);
                        Cursor {
                            pos: 2,
                            phase: Phase::Header,
                        }
                    }
                    None => {
                        // Keep a trailing 0xFF: it may be the first half of a split marker.
                        let keep = usize::from(self.buf.last() == Some(&MARKER));
                        let discard = self.buf.len() - keep;
                        self.buf.advance(discard);
                        return None;
                    }
                },
            };

            if let Some(end) = scan_to_end(&self.buf, &mut cursor) {
                self.scan = None;
                return Some(self.buf.split_to(end).freeze());
            }

            if self.buf.len() > self.max_frame_bytes {
                self.dropped += 1;
                tracing::warn!(
                    buffered = self.buf.len(),
                    limit = self.max_frame_bytes,
                    "abandoning oversized frame, resynchronising"
                );
                self.buf.advance(2);
                self.scan = None;
                continue;
            }

            self.scan = Some(cursor);
            return None;
        }
    }
}

fn find_start(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w[0] == MARKER && w[1] == SOI)
}

/// Markers that may legally appear between scans of a multi-scan image.
fn is_interscan_marker(code: u8) -> bool {
    matches!(code, 0xC4 | 0xCC | 0xDA..=0xDD | 0xE0..=0xEF | 0xFE)
}

/// Advance `cursor` through `buf`; returns the exclusive end offset of the frame.
fn scan_to_end(buf: &[u8], cursor: &mut Cursor) -> Option<usize> {
    loop {
        match cursor.phase {
            Phase::Header => {
                let p = cursor.pos;
                if p >= buf.len() {
                    return None;
                }
                if buf[p] != MARKER {
                    cursor.phase = Phase::Entropy;
                    continue;
                }
                if p + 1 >= buf.len() {
                    return None;
                }
                match buf[p + 1] {
                    MARKER => cursor.pos += 1,
                    EOI => return Some(p + 2),
                    0x00 => cursor.phase = Phase::Entropy,
                    0x01 | 0xD0..=0xD7 | SOI => cursor.pos += 2,
                    code if !(0xC0..=0xFE).contains(&code) => {
                        // Not a JPEG marker: treat the rest as unstructured.
                        cursor.pos = p + 2;
                        cursor.phase = Phase::Entropy;
                    }
                    code => {
                        if p + 3 >= buf.len() {
                            return None;
                        }
                        let len = u16::from_be_bytes([buf[p + 2], buf[p + 3]]) as usize;
                        if len < 2 {
                            cursor.pos = p + 2;
                            cursor.phase = Phase::Entropy;
                            continue;
                        }
                        cursor.pos = p + 2 + len;
                        if code == SOS {
                            cursor.phase = Phase::Entropy;
                        }
                    }
                }
            }
            Phase::Entropy => {
                if cursor.pos >= buf.len() {
                    return None;
                }
                let Some(offset) = buf[cursor.pos..]
                    .iter()
                    .position(|b| *b == MARKER)
                else {
                    cursor.pos = buf.len();
                    return None;
                };
                let p = cursor.pos + offset;
                if p + 1 >= buf.len() {
                    cursor.pos = p;
                    return None;
                }
                match buf[p + 1] {
                    EOI => return Some(p + 2),
                    MARKER => cursor.pos = p + 1,
                    code if is_interscan_marker(code) => {
                        cursor.pos = p;
                        cursor.phase = Phase::Header;
                    }
                    _ => cursor.pos = p + 2,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal structurally valid JPEG: APP0, DQT, SOS header, entropy data.
    fn jpeg(seed: u8, entropy_len: usize) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x07, b'J', b'F', b'I', b'F', 0x00]);
        out.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x05, 0x00, seed, 0x01]);
        out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
        for i in 0..entropy_len {
            let byte = seed.wrapping_add(i as u8);
            out.push(byte);
            if byte == 0xFF {
                out.push(0x00);
            }
        }
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    fn drain(extractor: &mut FrameExtractor) -> Vec<Bytes> {
        std::iter::from_fn(|| extractor.next_frame()).collect()
    }

    #[test]
    fn extracts_frames_in_order_across_any_chunking() {
        let frames: Vec<Vec<u8>> = (0..5).map(|i| jpeg(i * 40, 300 + i as usize)).collect();
        let mut stream = b"noise before".to_vec();
        for frame in &frames {
            stream.extend_from_slice(frame);
            stream.extend_from_slice(b"\x00\x12junk");
        }

        for chunk_size in [1, 2, 3, 7, 64, 1024, stream.len()] {
            let mut extractor = FrameExtractor::new(1 << 20);
            let mut out = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                extractor.extend(chunk);
                out.extend(drain(&mut extractor));
            }
            assert_eq!(out.len(), frames.len(), "chunk size {}", chunk_size);
            for (got, want) in out.iter().zip(&frames) {
                assert_eq!(&got[..], &want[..]);
            }
        }
    }

    #[test]
    fn plain_payload_between_markers_is_one_frame() {
        let mut extractor = FrameExtractor::new(1024);
        extractor.extend(&[0xFF, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9, 0xFF, 0xD8, 0x04, 0xFF, 0xD9]);
        let frames = drain(&mut extractor);
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], &[0xFF, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9]);
        assert_eq!(&frames[1][..], &[0xFF, 0xD8, 0x04, 0xFF, 0xD9]);
    }

    #[test]
    fn end_marker_inside_exif_thumbnail_does_not_split_frame() {
        let thumbnail = [0xFF, 0xD8, 0xAA, 0xFF, 0xD9];
        let mut frame = vec![0xFF, 0xD8, 0xFF, 0xE1];
        frame.extend_from_slice(&((thumbnail.len() + 2) as u16).to_be_bytes());
        frame.extend_from_slice(&thumbnail);
        frame.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x10, 0x20, 0xFF, 0xD9]);

        let mut extractor = FrameExtractor::new(1024);
        extractor.extend(&frame);
        let frames = drain(&mut extractor);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &frame[..]);
    }

    #[test]
    fn stuffed_bytes_and_restart_markers_are_data() {
        let frame = [
            0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0x11, 0xFF, 0x00, 0x22, 0xFF, 0xD3, 0x33, 0xFF,
            0xFF, 0xD9,
        ];
        let mut extractor = FrameExtractor::new(1024);
        extractor.extend(&frame);
        let frames = drain(&mut extractor);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &frame[..]);
    }

    #[test]
    fn start_marker_split_across_chunks() {
        let mut extractor = FrameExtractor::new(1024);
        extractor.extend(&[0x10, 0x20, 0xFF]);
        assert!(extractor.next_frame().is_none());
        assert_eq!(extractor.buffered(), 1);
        extractor.extend(&[0xD8, 0x42, 0xFF]);
        assert!(extractor.next_frame().is_none());
        extractor.extend(&[0xD9]);
        let frame = extractor.next_frame().unwrap();
        assert_eq!(&frame[..], &[0xFF, 0xD8, 0x42, 0xFF, 0xD9]);
    }

    #[test]
    fn garbage_without_start_marker_stays_bounded() {
        let mut extractor = FrameExtractor::new(1024);
        for _ in 0..100 {
            extractor.extend(&[0x55; 512]);
            assert!(extractor.next_frame().is_none());
        }
        assert_eq!(extractor.buffered(), 0);
    }

    #[test]
    fn oversized_frame_is_abandoned_and_next_frame_recovered() {
        let mut extractor = FrameExtractor::new(64);
        extractor.extend(&[0xFF, 0xD8]);
        extractor.extend(&[0x11; 100]);
        assert!(extractor.next_frame().is_none());
        assert_eq!(extractor.dropped(), 1);

        let good = jpeg(3, 8);
        extractor.extend(&good);
        let frames = drain(&mut extractor);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &good[..]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut extractor = FrameExtractor::new(1024);
        extractor.extend(&[0xFF, 0xD8, 0x01, 0x02]);
        assert!(extractor.next_frame().is_none());
        extractor.reset();
        extractor.extend(&[0x03, 0xFF, 0xD9]);
        assert!(extractor.next_frame().is_none());
    }

    #[test]
    fn bogus_marker_after_start_falls_back_to_plain_scan() {
        let first: &[u8] = &[0xFF, 0xD8, 0xFF, 0x05, 0x00, 0xFF, 0x01, 0xFF, 0xD9];
        let second: &[u8] = &[0xFF, 0xD8, 0x02, 0xFF, 0xD9];
        let mut extractor = FrameExtractor::new(1024);
        extractor.extend(first);
        extractor.extend(second);

        let frames = drain(&mut extractor);
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], first);
        assert_eq!(&frames[1][..], second);
    }

    #[test]
    fn plausible_segment_length_is_trusted() {
        // COM marker claiming 16 bytes swallows the early FF D9.
        let mut stream = vec![0xFF, 0xD8, 0xFF, 0xFE, 0x00, 0x10, 0xFF, 0xD9];
        stream.extend_from_slice(&[0x00; 12]);
        stream.extend_from_slice(&[0xFF, 0xD9]);
        let mut extractor = FrameExtractor::new(1024);
        extractor.extend(&stream);

        let frames = drain(&mut extractor);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), stream.len());
    }
}
