use crate::common::error::Result;
use crate::common::source::{probe, ByteSource};

/// Syncsafe integer encoding used in ID3v2 tags.
/// Each byte uses only 7 bits (MSB is always 0).
pub struct BitPaddedInt;

impl BitPaddedInt {
    /// Decode a bit-padded integer from bytes, big-endian.
    /// `bits` is the number of significant bits per byte (7 for syncsafe).
    pub fn decode(data: &[u8], bits: u8) -> u32 {
        let mut result: u32 = 0;
        let mask = (1u32 << bits) - 1;
        for &b in data {
            result = (result << bits) | (b as u32 & mask);
        }
        result
    }

    /// Decode a 4-byte syncsafe integer into its 28-bit value.
    pub fn syncsafe(data: &[u8; 4]) -> u32 {
        Self::decode(data, 7)
    }

    /// Encode an integer as bit-padded bytes.
    pub fn encode(value: u32, width: usize, bits: u8) -> Vec<u8> {
        let mut result = vec![0u8; width];
        let mask = (1u32 << bits) - 1;
        let mut val = value;
        for i in (0..width).rev() {
            result[i] = (val & mask) as u8;
            val >>= bits;
        }
        result
    }

    /// Check if data could be a valid syncsafe integer (no high bits set).
    pub fn has_valid_padding(data: &[u8]) -> bool {
        data.iter().all(|&b| b & 0x80 == 0)
    }
}

/// ID3v2 header flags that affect the tag's on-disk size.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ID3Flags {
    /// v2.4 only: a 10-byte footer follows the tag body.
    pub footer: bool,
}

/// Parsed ID3v2 header (10 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct ID3Header {
    pub version: (u8, u8), // (major, revision) e.g. (4, 0) for ID3v2.4
    pub flags: ID3Flags,
    pub size: u32,         // Tag size excluding header (10 bytes)
}

impl ID3Header {
    /// Parse an ID3v2 header from its 10 raw bytes.
    /// Returns `None` when the "ID3" magic is missing.
    pub fn parse(data: &[u8; 10]) -> Option<Self> {
        if &data[0..3] != b"ID3" {
            return None;
        }

        let major = data[3];
        let flag_byte = data[5];

        let flags = ID3Flags {
            footer: major == 4 && (flag_byte & 0x10 != 0),
        };

        // Size is always syncsafe in the header
        let size = BitPaddedInt::syncsafe(&[data[6], data[7], data[8], data[9]]);

        Some(ID3Header {
            version: (major, data[4]),
            flags,
            size,
        })
    }

    /// Full tag size including 10-byte header (and optional 10-byte footer).
    pub fn full_size(&self) -> u64 {
        let mut s = self.size as u64 + 10;
        if self.flags.footer {
            s += 10;
        }
        s
    }
}

/// Leading ID3v2 tag as seen by the container scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ID3v2TagInfo {
    pub present: bool,
    /// Header plus body (plus footer); audio starts at this offset.
    pub total_size: u64,
    pub version: Option<(u8, u8)>,
}

impl ID3v2TagInfo {
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Probe the start of the source for an ID3v2 tag.
/// The cursor is restored before returning.
pub fn detect_id3v2<S: ByteSource>(source: &mut S) -> Result<ID3v2TagInfo> {
    probe(source, |s| {
        let header = match s.read_array_at::<10>(0)? {
            Some(raw) => {
                let parsed = ID3Header::parse(&raw);
                if parsed.is_some() && !BitPaddedInt::has_valid_padding(&raw[6..10]) {
                    log::trace!("ID3v2 size field has high bits set");
                }
                parsed
            }
            None => {
                if s.read_array_at::<3>(0)? == Some(*b"ID3") {
                    log::debug!("ID3v2 magic present but header truncated");
                }
                None
            }
        };

        Ok(match header {
            Some(h) => {
                log::debug!(
                    "ID3v2.{}.{} tag, {} bytes",
                    h.version.0,
                    h.version.1,
                    h.full_size()
                );
                ID3v2TagInfo {
                    present: true,
                    total_size: h.full_size(),
                    version: Some(h.version),
                }
            }
            None => ID3v2TagInfo::absent(),
        })
    })
}
