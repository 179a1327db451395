//! MPEG audio frame headers: sync scan and field resolution.
//!
//! Header layout (4 bytes):
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//!
//! A = sync (11 bits), B = version, C = layer, D = protection,
//! E = bitrate index, F = sample rate index, G = padding, H = private,
//! I = channel mode, J = mode extension, K = copyright, L = original,
//! M = emphasis.

use std::io::SeekFrom;

use memchr::memchr;

use crate::common::error::{InspectError, Result};
use crate::common::source::ByteSource;

/// MPEG audio version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MPEGVersion {
    V1,
    V2,
    V25,
}

impl MPEGVersion {
    pub fn as_f64(&self) -> f64 {
        match self {
            MPEGVersion::V1 => 1.0,
            MPEGVersion::V2 => 2.0,
            MPEGVersion::V25 => 2.5,
        }
    }
}

/// MPEG audio layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MPEGLayer {
    Layer1,
    Layer2,
    Layer3,
}

impl MPEGLayer {
    pub fn as_u8(&self) -> u8 {
        match self {
            MPEGLayer::Layer1 => 1,
            MPEGLayer::Layer2 => 2,
            MPEGLayer::Layer3 => 3,
        }
    }
}

/// Channel mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

impl ChannelMode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        }
    }
}

/// Raw bit fields of a frame header, before any table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrameHeader {
    pub sync_valid: bool,
    pub version_bits: u8,
    pub layer_bits: u8,
    pub bitrate_index: u8,
    pub sample_rate_index: u8,
    pub padding: bool,
    pub channel_mode_bits: u8,
}

impl RawFrameHeader {
    /// Extract header fields from 4 bytes. Fields are taken as-is even when
    /// `sync_valid` is false.
    pub fn from_bytes(b: [u8; 4]) -> Self {
        RawFrameHeader {
            sync_valid: is_sync(b[0], b[1]),
            version_bits: (b[1] >> 3) & 0x03,
            layer_bits: (b[1] >> 1) & 0x03,
            bitrate_index: (b[2] >> 4) & 0x0F,
            sample_rate_index: (b[2] >> 2) & 0x03,
            padding: (b[2] >> 1) & 0x01 != 0,
            channel_mode_bits: (b[3] >> 6) & 0x03,
        }
    }

    pub fn channel_mode(&self) -> ChannelMode {
        ChannelMode::from_bits(self.channel_mode_bits)
    }
}

/// 11-bit frame sync: 0xFF then a byte with its top 3 bits set.
#[inline]
pub fn is_sync(b0: u8, b1: u8) -> bool {
    b0 == 0xFF && b1 & 0xE0 == 0xE0
}

pub fn resolve_version(bits: u8) -> Option<MPEGVersion> {
    match bits {
        0 => Some(MPEGVersion::V25),
        2 => Some(MPEGVersion::V2),
        3 => Some(MPEGVersion::V1),
        _ => None,
    }
}

pub fn resolve_layer(bits: u8) -> Option<MPEGLayer> {
    match bits {
        1 => Some(MPEGLayer::Layer3),
        2 => Some(MPEGLayer::Layer2),
        3 => Some(MPEGLayer::Layer1),
        _ => None,
    }
}

/// Sample rate in Hz. Index 3 is reserved for every version.
pub fn resolve_sample_rate(version: MPEGVersion, index: u8) -> Result<u32> {
    let rates: [u32; 3] = match version {
        MPEGVersion::V1 => [44100, 48000, 32000],
        MPEGVersion::V2 => [22050, 24000, 16000],
        MPEGVersion::V25 => [11025, 12000, 8000],
    };
    rates.get(index as usize).copied().ok_or_else(|| {
        InspectError::UnresolvedSampleRate(format!(
            "reserved sample rate index {} for MPEG {}",
            index,
            version.as_f64()
        ))
    })
}

// Bitrates in kbps for indices 1..=14. Index 0 (free format) and 15 are invalid.
const BITRATES_V1_L1: [u32; 14] = [
    32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448,
];
const BITRATES_V1_L2: [u32; 14] = [
    32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384,
];
const BITRATES_V1_L3: [u32; 14] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];
const BITRATES_V2_L1: [u32; 14] = [
    32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256,
];
const BITRATES_V2_L23: [u32; 14] = [
    8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];

/// Bitrate in kbps for a constant-bitrate frame.
pub fn resolve_bitrate(version: MPEGVersion, layer: MPEGLayer, index: u8) -> Result<u32> {
    let table = match (version, layer) {
        (MPEGVersion::V1, MPEGLayer::Layer1) => &BITRATES_V1_L1,
        (MPEGVersion::V1, MPEGLayer::Layer2) => &BITRATES_V1_L2,
        (MPEGVersion::V1, MPEGLayer::Layer3) => &BITRATES_V1_L3,
        (_, MPEGLayer::Layer1) => &BITRATES_V2_L1,
        (_, _) => &BITRATES_V2_L23,
    };
    match index {
        1..=14 => Ok(table[index as usize - 1]),
        0 => Err(InspectError::UnresolvedBitrate(
            "free-format bitrate index 0".into(),
        )),
        _ => Err(InspectError::UnresolvedBitrate(format!(
            "invalid bitrate index {}",
            index
        ))),
    }
}

pub fn samples_per_frame(version: MPEGVersion, layer: MPEGLayer) -> u32 {
    match (version, layer) {
        (_, MPEGLayer::Layer1) => 384,
        (_, MPEGLayer::Layer2) => 1152,
        (MPEGVersion::V1, MPEGLayer::Layer3) => 1152,
        (_, MPEGLayer::Layer3) => 576,
    }
}

/// Length of the Layer III side information that follows the header.
pub fn side_info_len(version: MPEGVersion, channel_mode: ChannelMode) -> u64 {
    match (version, channel_mode) {
        (MPEGVersion::V1, ChannelMode::Mono) => 17,
        (MPEGVersion::V1, _) => 32,
        (_, ChannelMode::Mono) => 9,
        (_, _) => 17,
    }
}

/// A frame header with its table lookups applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedHeader {
    pub version: MPEGVersion,
    pub layer: MPEGLayer,
    pub sample_rate: u32,
    pub samples_per_frame: u32,
    pub channel_mode: ChannelMode,
}

impl ResolvedHeader {
    pub fn resolve(raw: &RawFrameHeader) -> Result<Self> {
        let version = resolve_version(raw.version_bits).ok_or_else(|| {
            InspectError::UnresolvedSampleRate("reserved MPEG version bits".into())
        })?;
        let layer = resolve_layer(raw.layer_bits)
            .ok_or_else(|| InspectError::UnresolvedBitrate("reserved layer bits".into()))?;
        let sample_rate = resolve_sample_rate(version, raw.sample_rate_index)?;

        Ok(ResolvedHeader {
            version,
            layer,
            sample_rate,
            samples_per_frame: samples_per_frame(version, layer),
            channel_mode: raw.channel_mode(),
        })
    }

    /// Bitrate of this frame in kbps, from its own bitrate index.
    pub fn bitrate_kbps(&self, raw: &RawFrameHeader) -> Result<u32> {
        resolve_bitrate(self.version, self.layer, raw.bitrate_index)
    }

    pub fn side_info_len(&self) -> u64 {
        side_info_len(self.version, self.channel_mode)
    }
}

const SCAN_CHUNK: usize = 8192;

/// Scan forward from `start` for the first frame sync.
///
/// Returns the raw header and its absolute offset, leaving the cursor just
/// after the 4 header bytes. `limit` bounds how many bytes past `start` a
/// sync may begin at.
pub fn find_first_frame<S: ByteSource>(
    source: &mut S,
    start: u64,
    limit: Option<u64>,
) -> Result<(RawFrameHeader, u64)> {
    let end = limit.map(|l| start.saturating_add(l));
    source.seek(SeekFrom::Start(start))?;

    let mut buf = vec![0u8; SCAN_CHUNK];
    // Absolute offset of buf[0]
    let mut base = start;
    // Bytes carried over from the previous chunk
    let mut carry = 0usize;

    loop {
        let n = source.read_up_to(&mut buf[carry..])?;
        let avail = carry + n;
        let eof = avail < buf.len();

        let mut pos = 0usize;
        while pos + 4 <= avail {
            let Some(off) = memchr(0xFF, &buf[pos..avail - 3]) else {
                break;
            };
            let p = pos + off;
            let abs = base + p as u64;
            if end.is_some_and(|e| abs >= e) {
                log::debug!("no frame sync within scan limit");
                return Err(InspectError::NoAudioFrame);
            }
            if is_sync(buf[p], buf[p + 1]) {
                let header =
                    RawFrameHeader::from_bytes([buf[p], buf[p + 1], buf[p + 2], buf[p + 3]]);
                source.seek(SeekFrom::Start(abs + 4))?;
                log::debug!("frame sync at offset {} ({} bytes skipped)", abs, abs - start);
                return Ok((header, abs));
            }
            pos = p + 1;
        }

        if eof {
            return Err(InspectError::NoAudioFrame);
        }

        let keep = avail.min(3);
        buf.copy_within(avail - keep..avail, 0);
        base += (avail - keep) as u64;
        carry = keep;
        log::trace!("sync scan continuing at offset {}", base);

        if end.is_some_and(|e| base >= e) {
            return Err(InspectError::NoAudioFrame);
        }
    }
}
