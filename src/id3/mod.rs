//! Container tag scan: the leading ID3v2 tag and the trailing ID3v1 tag.
//!
//! Only tag boundaries are read; tag contents are never decoded.

pub mod header;
pub mod id3v1;

use crate::common::error::Result;
use crate::common::source::ByteSource;
use crate::id3::header::{detect_id3v2, ID3v2TagInfo};
use crate::id3::id3v1::{detect_id3v1, ID3v1TagInfo};

/// Both container tags of a file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerTags {
    pub id3v2: ID3v2TagInfo,
    pub id3v1: ID3v1TagInfo,
}

impl ContainerTags {
    /// Offset where audio data begins.
    pub fn audio_start(&self) -> u64 {
        self.id3v2.total_size
    }

    /// Offset where audio data ends, given the total source length.
    pub fn audio_end(&self, length: u64) -> u64 {
        length.saturating_sub(self.id3v1.size())
    }
}

/// Run both tag probes. The cursor is left where it was found.
pub fn scan_tags<S: ByteSource>(source: &mut S) -> Result<ContainerTags> {
    let id3v2 = detect_id3v2(source)?;
    let id3v1 = detect_id3v1(source)?;
    Ok(ContainerTags { id3v2, id3v1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3::header::BitPaddedInt;
    use std::io::Cursor;

    #[test]
    fn test_scan_both_tags() {
        let mut data = b"ID3\x04\x00\x00".to_vec();
        data.extend_from_slice(&BitPaddedInt::encode(90, 4, 7));
        data.resize(1000, 0);
        let mut tag = vec![0u8; 128];
        tag[..3].copy_from_slice(b"TAG");
        data.extend_from_slice(&tag);

        let mut src = Cursor::new(data);
        src.set_position(77);
        let tags = scan_tags(&mut src).unwrap();
        assert_eq!(tags.audio_start(), 100);
        assert_eq!(tags.audio_end(1128), 1000);
        assert_eq!(src.position(), 77);
    }

    #[test]
    fn test_scan_untagged() {
        let tags = scan_tags(&mut Cursor::new(vec![0u8; 300])).unwrap();
        assert_eq!(tags, ContainerTags::default());
        assert_eq!(tags.audio_start(), 0);
        assert_eq!(tags.audio_end(300), 300);
    }
}
