//! Synthetic MP3 images for integration tests.

#![allow(dead_code)]

use std::io::Write;

use mpeg_inspect::id3::header::BitPaddedInt;
use tempfile::NamedTempFile;

/// MPEG1 Layer III, 128 kbps, 44100 Hz, stereo
pub const V1_L3_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

/// Builder for an MP3 byte image: optional ID3v2 tag, a first frame with an
/// optional VBR tag, filler, and an optional ID3v1 trailer.
#[derive(Debug, Clone)]
pub struct Mp3Image {
    id3v2_body: Option<u32>,
    garbage: Vec<u8>,
    header: [u8; 4],
    vbr_tag: Option<(u64, Vec<u8>)>,
    total_len: usize,
    id3v1: bool,
}

impl Mp3Image {
    pub fn new() -> Self {
        Mp3Image {
            id3v2_body: None,
            garbage: Vec::new(),
            header: V1_L3_128K,
            vbr_tag: None,
            total_len: 0,
            id3v1: false,
        }
    }

    pub fn id3v2(mut self, body: u32) -> Self {
        self.id3v2_body = Some(body);
        self
    }

    /// Bytes between the leading tag and the first frame.
    pub fn garbage(mut self, bytes: &[u8]) -> Self {
        self.garbage = bytes.to_vec();
        self
    }

    pub fn header(mut self, header: [u8; 4]) -> Self {
        self.header = header;
        self
    }

    /// Xing/Info tag placed `at` bytes past the frame start.
    pub fn xing(mut self, marker: &[u8; 4], at: u64, flags: u32, fields: &[u32]) -> Self {
        let mut tag = marker.to_vec();
        tag.extend_from_slice(&flags.to_be_bytes());
        for f in fields {
            tag.extend_from_slice(&f.to_be_bytes());
        }
        self.vbr_tag = Some((at, tag));
        self
    }

    /// VBRI tag at frame + 36.
    pub fn vbri(mut self, bytes: u32, frames: u32) -> Self {
        let mut tag = b"VBRI".to_vec();
        tag.extend_from_slice(&1u16.to_be_bytes());
        tag.extend_from_slice(&0u16.to_be_bytes());
        tag.extend_from_slice(&80u16.to_be_bytes());
        tag.extend_from_slice(&bytes.to_be_bytes());
        tag.extend_from_slice(&frames.to_be_bytes());
        self.vbr_tag = Some((36, tag));
        self
    }

    /// Total file length, including both tags.
    pub fn total_len(mut self, len: usize) -> Self {
        self.total_len = len;
        self
    }

    pub fn id3v1(mut self) -> Self {
        self.id3v1 = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::new();
        if let Some(body) = self.id3v2_body {
            data.extend_from_slice(b"ID3\x03\x00\x00");
            data.extend_from_slice(&BitPaddedInt::encode(body, 4, 7));
            data.resize(10 + body as usize, 0);
        }
        data.extend_from_slice(&self.garbage);
        let frame_start = data.len();
        data.extend_from_slice(&self.header);
        if let Some((at, tag)) = &self.vbr_tag {
            data.resize(frame_start + *at as usize, 0);
            data.extend_from_slice(tag);
        }

        let trailer = if self.id3v1 { 128 } else { 0 };
        let body_len = self.total_len.saturating_sub(trailer).max(data.len());
        data.resize(body_len, 0);
        if self.id3v1 {
            let mut tag = vec![0u8; 128];
            tag[..3].copy_from_slice(b"TAG");
            data.extend_from_slice(&tag);
        }
        data
    }

    pub fn write_temp(&self) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().expect("create temp file");
        tmp.write_all(&self.build()).expect("write temp file");
        tmp.flush().expect("flush temp file");
        tmp
    }
}
