use crate::common::error::Result;
use crate::common::source::{probe, ByteSource};

/// Fixed size of an ID3v1 tag.
pub const ID3V1_SIZE: u64 = 128;

/// Trailing ID3v1 tag as seen by the container scan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ID3v1TagInfo {
    pub present: bool,
}

impl ID3v1TagInfo {
    /// Bytes the tag occupies at the end of the file.
    pub fn size(&self) -> u64 {
        if self.present {
            ID3V1_SIZE
        } else {
            0
        }
    }
}

/// Probe the last 128 bytes of the source for the "TAG" marker.
/// The cursor is restored before returning.
pub fn detect_id3v1<S: ByteSource>(source: &mut S) -> Result<ID3v1TagInfo> {
    probe(source, |s| {
        let len = s.length()?;
        if len < ID3V1_SIZE {
            return Ok(ID3v1TagInfo { present: false });
        }
        let present = s.read_array_at::<3>(len - ID3V1_SIZE)? == Some(*b"TAG");
        if present {
            log::debug!("ID3v1 tag at offset {}", len - ID3V1_SIZE);
        }
        Ok(ID3v1TagInfo { present })
    })
}
