use std::io::{self, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::common::error::{InspectError, Result};
use crate::common::source::{probe, ByteSource};
use crate::config::AudioSizeSource;
use crate::mp3::header::ResolvedHeader;

pub const XING_FRAMES_FLAG: u32 = 0x01;
pub const XING_BYTES_FLAG: u32 = 0x02;
pub const XING_TOC_FLAG: u32 = 0x04;
pub const XING_QUALITY_FLAG: u32 = 0x08;

/// Offset of a VBR tag from the frame start in MPEG1 Layer III stereo streams.
pub const CONVENTIONAL_TAG_OFFSET: u64 = 36;

/// Bitrate mode for VBR detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateMode {
    CBR,
    VBR,
}

/// Parsed Xing/Info VBR header.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XingTagInfo {
    pub present: bool,
    pub is_info: bool, // "Info" tag = CBR, "Xing" tag = VBR
    pub flags: u32,
    pub frame_count: Option<u32>,
    pub byte_count: Option<u32>,
    pub quality: Option<u32>,
    /// Absolute offset of the "Xing"/"Info" marker.
    pub offset: u64,
}

impl XingTagInfo {
    /// Bytes taken by the marker, flags and every field the flags announce.
    pub fn size(&self) -> u64 {
        let mut size = 8;
        if self.flags & XING_FRAMES_FLAG != 0 {
            size += 4;
        }
        if self.flags & XING_BYTES_FLAG != 0 {
            size += 4;
        }
        if self.flags & XING_TOC_FLAG != 0 {
            size += 100;
        }
        if self.flags & XING_QUALITY_FLAG != 0 {
            size += 4;
        }
        size
    }
}

/// Parsed VBRI header (Fraunhofer encoder).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VbriTagInfo {
    pub version: u16,
    pub quality: u16,
    pub byte_count: u32,
    pub frame_count: u32,
}

/// Whichever VBR tag the first frame carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VbrTag {
    Xing(XingTagInfo),
    Vbri(VbriTagInfo),
}

impl VbrTag {
    pub fn frame_count(&self) -> Option<u32> {
        match self {
            VbrTag::Xing(x) => x.frame_count,
            VbrTag::Vbri(v) => Some(v.frame_count),
        }
    }

    pub fn byte_count(&self) -> Option<u32> {
        match self {
            VbrTag::Xing(x) => x.byte_count,
            VbrTag::Vbri(v) => Some(v.byte_count),
        }
    }

    pub fn bitrate_mode(&self) -> BitrateMode {
        match self {
            VbrTag::Xing(x) if x.is_info => BitrateMode::CBR,
            _ => BitrateMode::VBR,
        }
    }
}

/// Read a big-endian u32, mapping end of stream to `None`.
fn read_be_u32<S: ByteSource>(s: &mut S) -> io::Result<Option<u32>> {
    match s.read_u32::<BigEndian>() {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_be_u16<S: ByteSource>(s: &mut S) -> io::Result<Option<u16>> {
    match s.read_u16::<BigEndian>() {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parse the tag body following a "Xing"/"Info" marker at `offset`.
/// Returns `None` when the declared fields run past the end of the source.
fn parse_xing_at<S: ByteSource>(
    s: &mut S,
    offset: u64,
    is_info: bool,
) -> io::Result<Option<XingTagInfo>> {
    s.seek(SeekFrom::Start(offset + 4))?;
    let Some(flags) = read_be_u32(s)? else {
        return Ok(None);
    };

    let mut info = XingTagInfo {
        present: true,
        is_info,
        flags,
        offset,
        ..XingTagInfo::default()
    };

    if flags & XING_FRAMES_FLAG != 0 {
        match read_be_u32(s)? {
            Some(f) => info.frame_count = Some(f),
            None => return Ok(None),
        }
    }
    if flags & XING_BYTES_FLAG != 0 {
        match read_be_u32(s)? {
            Some(b) => info.byte_count = Some(b),
            None => return Ok(None),
        }
    }
    if flags & XING_TOC_FLAG != 0 {
        // Skip TOC data
        let toc_end = s.position()? + 100;
        if toc_end > s.length()? {
            return Ok(None);
        }
        s.seek(SeekFrom::Start(toc_end))?;
    }
    if flags & XING_QUALITY_FLAG != 0 {
        match read_be_u32(s)? {
            Some(q) => info.quality = Some(q),
            None => return Ok(None),
        }
    }

    Ok(Some(info))
}

/// Look for a Xing/Info tag inside the first frame.
///
/// The tag sits right after the side information. Both the side-info
/// position for this header and the conventional frame + 36 position are
/// tried. The cursor is restored before returning.
pub fn detect_xing<S: ByteSource>(
    source: &mut S,
    frame_offset: u64,
    header: &ResolvedHeader,
) -> Result<XingTagInfo> {
    let side_info_offset = frame_offset + 4 + header.side_info_len();
    let conventional = frame_offset + CONVENTIONAL_TAG_OFFSET;
    let candidates = if side_info_offset == conventional {
        vec![conventional]
    } else {
        vec![side_info_offset, conventional]
    };

    probe(source, |s| {
        for offset in candidates {
            let is_info = match s.read_array_at::<4>(offset)? {
                Some(marker) if &marker == b"Xing" => false,
                Some(marker) if &marker == b"Info" => true,
                _ => continue,
            };
            match parse_xing_at(s, offset, is_info)? {
                Some(info) => {
                    log::debug!(
                        "{} tag at offset {}: flags={:#06x} frames={:?} bytes={:?}",
                        if is_info { "Info" } else { "Xing" },
                        offset,
                        info.flags,
                        info.frame_count,
                        info.byte_count
                    );
                    return Ok(info);
                }
                None => log::debug!("truncated VBR tag at offset {}", offset),
            }
        }
        Ok(XingTagInfo::default())
    })
}

/// Look for a VBRI tag at frame + 36. The cursor is restored before returning.
pub fn detect_vbri<S: ByteSource>(
    source: &mut S,
    frame_offset: u64,
) -> Result<Option<VbriTagInfo>> {
    probe(source, |s| {
        let offset = frame_offset + CONVENTIONAL_TAG_OFFSET;
        if s.read_array_at::<4>(offset)? != Some(*b"VBRI") {
            return Ok(None);
        }
        let Some(version) = read_be_u16(s)? else { return Ok(None) };
        // Skip delay
        if read_be_u16(s)?.is_none() {
            return Ok(None);
        }
        let Some(quality) = read_be_u16(s)? else { return Ok(None) };
        let Some(byte_count) = read_be_u32(s)? else { return Ok(None) };
        let Some(frame_count) = read_be_u32(s)? else { return Ok(None) };

        log::debug!(
            "VBRI tag at offset {}: frames={} bytes={}",
            offset,
            frame_count,
            byte_count
        );
        Ok(Some(VbriTagInfo {
            version,
            quality,
            byte_count,
            frame_count,
        }))
    })
}

/// Average bitrate derived from a VBR tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VbrEstimate {
    pub duration_secs: f64,
    pub audio_bytes: u64,
    pub bitrate_kbps: f64,
}

/// Estimate the average bitrate as audio bytes over playback time.
///
/// `file_span` is the file size minus the leading ID3v2 and trailing ID3v1
/// tags. With [`AudioSizeSource::TagByteCount`] the tag's own byte count is
/// used instead.
pub fn estimate_bitrate(
    tag: &VbrTag,
    header: &ResolvedHeader,
    file_span: u64,
    size_source: AudioSizeSource,
) -> Result<VbrEstimate> {
    let frames = tag.frame_count().ok_or_else(|| {
        InspectError::IndeterminateDuration("VBR tag carries no frame count".into())
    })?;
    if header.sample_rate == 0 {
        return Err(InspectError::IndeterminateDuration("zero sample rate".into()));
    }

    let duration_secs = frames as f64 * header.samples_per_frame as f64 / header.sample_rate as f64;
    if duration_secs <= 0.0 {
        return Err(InspectError::IndeterminateDuration(format!(
            "{} frames gives no playback time",
            frames
        )));
    }

    let audio_bytes = match size_source {
        AudioSizeSource::FileSpan => file_span,
        AudioSizeSource::TagByteCount => tag.byte_count().ok_or_else(|| {
            InspectError::IndeterminateDuration("VBR tag carries no byte count".into())
        })? as u64,
    };

    Ok(VbrEstimate {
        duration_secs,
        audio_bytes,
        bitrate_kbps: audio_bytes as f64 * 8.0 / duration_secs / 1000.0,
    })
}
