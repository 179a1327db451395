pub mod header;
pub mod xing;

use std::fmt;
use std::path::Path;

use crate::common::error::Result;
use crate::common::source::ByteSource;
use crate::common::util::open_source;
use crate::config::AnalyzerConfig;
use crate::id3::header::ID3v2TagInfo;
use crate::id3::id3v1::ID3v1TagInfo;
use crate::id3::scan_tags;
use crate::mp3::header::{find_first_frame, ResolvedHeader};
use crate::mp3::xing::{detect_vbri, detect_xing, estimate_bitrate, BitrateMode, VbrTag};

/// Sample rate and bitrate of one MP3 stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub sample_rate: u32,
    pub bitrate_kbps: f64,
    /// True when the bitrate was averaged from a Xing/Info or VBRI tag.
    pub is_vbr: bool,
    pub bitrate_mode: BitrateMode,
    pub header: ResolvedHeader,
    /// Offset of the first frame header.
    pub frame_offset: u64,
    pub duration_secs: Option<f64>,
    /// Bytes between the leading and trailing tags.
    pub audio_bytes: u64,
    pub id3v2: ID3v2TagInfo,
    pub id3v1: ID3v1TagInfo,
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MPEG {} layer {}, {} Hz, {:.2} kbps ({})",
            self.header.version.as_f64(),
            self.header.layer.as_u8(),
            self.sample_rate,
            self.bitrate_kbps,
            if self.is_vbr { "VBR" } else { "CBR" }
        )
    }
}

/// Analyze the MP3 file at `path` with the default configuration.
pub fn analyze(path: impl AsRef<Path>) -> Result<AnalysisResult> {
    analyze_with(path, &AnalyzerConfig::default())
}

/// Analyze the MP3 file at `path`. The file is closed on every return path.
pub fn analyze_with(path: impl AsRef<Path>, config: &AnalyzerConfig) -> Result<AnalysisResult> {
    let path = path.as_ref();
    log::debug!("analyzing {}", path.display());
    let mut source = open_source(path, config.map_file)?;
    analyze_source(&mut source, config)
}

/// Analyze an already-open byte source.
pub fn analyze_source<S: ByteSource>(
    source: &mut S,
    config: &AnalyzerConfig,
) -> Result<AnalysisResult> {
    let length = source.length()?;
    let tags = scan_tags(source)?;
    let audio_start = tags.audio_start();
    let audio_bytes = tags.audio_end(length).saturating_sub(audio_start);

    // A sync must leave room for its 4 header bytes before the ID3v1 trailer
    let in_audio = audio_bytes.saturating_sub(3);
    let limit = config.max_scan_bytes.map_or(in_audio, |l| l.min(in_audio));
    let (raw, frame_offset) = find_first_frame(source, audio_start, Some(limit))?;
    let header = ResolvedHeader::resolve(&raw)?;

    let xing = detect_xing(source, frame_offset, &header)?;
    let tag = if xing.present {
        Some(VbrTag::Xing(xing))
    } else if config.probe_vbri {
        detect_vbri(source, frame_offset)?.map(VbrTag::Vbri)
    } else {
        None
    };

    let (bitrate_kbps, duration_secs, is_vbr, bitrate_mode) = match tag {
        Some(tag) => {
            let est = estimate_bitrate(&tag, &header, audio_bytes, config.audio_size)?;
            log::debug!(
                "VBR estimate: {} bytes over {:.3}s = {:.2} kbps",
                est.audio_bytes,
                est.duration_secs,
                est.bitrate_kbps
            );
            (est.bitrate_kbps, Some(est.duration_secs), true, tag.bitrate_mode())
        }
        None => {
            let kbps = header.bitrate_kbps(&raw)? as f64;
            let duration = audio_bytes as f64 * 8.0 / (kbps * 1000.0);
            log::debug!("CBR frame at {}: {} kbps", frame_offset, kbps);
            (kbps, Some(duration), false, BitrateMode::CBR)
        }
    };

    Ok(AnalysisResult {
        sample_rate: header.sample_rate,
        bitrate_kbps,
        is_vbr,
        bitrate_mode,
        header,
        frame_offset,
        duration_secs,
        audio_bytes,
        id3v2: tags.id3v2,
        id3v1: tags.id3v1,
    })
}

/// Analyze many files in parallel. Results keep the order of `paths`.
pub fn analyze_batch<P>(paths: &[P], config: &AnalyzerConfig) -> Vec<Result<AnalysisResult>>
where
    P: AsRef<Path> + Sync,
{
    use rayon::prelude::*;

    paths
        .par_iter()
        .map(|path| analyze_with(path, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::InspectError;
    use crate::config::AudioSizeSource;
    use crate::id3::header::BitPaddedInt;
    use crate::mp3::header::{MPEGLayer, MPEGVersion};
    use std::io::Cursor;

    const CBR_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

    fn id3v2(body: u32) -> Vec<u8> {
        let mut v = b"ID3\x03\x00\x00".to_vec();
        v.extend_from_slice(&BitPaddedInt::encode(body, 4, 7));
        v.resize(10 + body as usize, 0);
        v
    }

    fn id3v1() -> Vec<u8> {
        let mut v = vec![0u8; 128];
        v[..3].copy_from_slice(b"TAG");
        v
    }

    #[test]
    fn test_cbr_after_id3v2() {
        let mut data = id3v2(1000);
        data.extend_from_slice(&CBR_HEADER);
        data.resize(1010 + 4180, 0);
        let res = analyze_source(&mut Cursor::new(data), &AnalyzerConfig::default()).unwrap();
        assert_eq!(res.sample_rate, 44100);
        assert_eq!(res.bitrate_kbps, 128.0);
        assert!(!res.is_vbr);
        assert_eq!(res.bitrate_mode, BitrateMode::CBR);
        assert_eq!(res.frame_offset, 1010);
        assert_eq!(res.audio_bytes, 4180);
        assert_eq!(res.header.version, MPEGVersion::V1);
        assert_eq!(res.header.layer, MPEGLayer::Layer3);
        assert!(res.id3v2.present);
        assert!(!res.id3v1.present);
    }

    #[test]
    fn test_xing_vbr() {
        let mut data = id3v2(1000);
        data.extend_from_slice(&CBR_HEADER);
        data.resize(1010 + 36, 0);
        data.extend_from_slice(b"Xing");
        data.extend_from_slice(&3u32.to_be_bytes());
        data.extend_from_slice(&1000u32.to_be_bytes());
        data.extend_from_slice(&2_000_000u32.to_be_bytes());
        data.resize(2_001_138 - 128, 0);
        data.extend_from_slice(&id3v1());
        assert_eq!(data.len(), 2_001_138);

        let res = analyze_source(&mut Cursor::new(data), &AnalyzerConfig::default()).unwrap();
        let duration = 1000.0 * 1152.0 / 44100.0;
        assert!(res.is_vbr);
        assert_eq!(res.bitrate_mode, BitrateMode::VBR);
        assert_eq!(res.audio_bytes, 2_000_000);
        assert!((res.duration_secs.unwrap() - duration).abs() < 1e-9);
        assert!((res.bitrate_kbps - 2_000_000.0 * 8.0 / duration / 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_vbri_can_be_disabled() {
        let mut data = CBR_HEADER.to_vec();
        data.resize(36, 0);
        data.extend_from_slice(b"VBRI");
        data.extend_from_slice(&[0, 1, 0, 0, 0, 50]);
        data.extend_from_slice(&10_000u32.to_be_bytes());
        data.extend_from_slice(&100u32.to_be_bytes());
        data.resize(10_000, 0);

        let config = AnalyzerConfig::default();
        let res = analyze_source(&mut Cursor::new(data.clone()), &config).unwrap();
        assert!(res.is_vbr);

        let config = AnalyzerConfig::default().with_probe_vbri(false);
        let res = analyze_source(&mut Cursor::new(data), &config).unwrap();
        assert!(!res.is_vbr);
        assert_eq!(res.bitrate_kbps, 128.0);
    }

    #[test]
    fn test_tag_byte_count_source() {
        let mut data = CBR_HEADER.to_vec();
        data.resize(36, 0);
        data.extend_from_slice(b"Xing");
        data.extend_from_slice(&3u32.to_be_bytes());
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(&5_000u32.to_be_bytes());
        data.resize(9_000, 0);

        let config = AnalyzerConfig::default().with_audio_size(AudioSizeSource::TagByteCount);
        let res = analyze_source(&mut Cursor::new(data), &config).unwrap();
        assert_eq!(res.audio_bytes, 9_000);
        let duration = 100.0 * 1152.0 / 44100.0;
        assert!((res.bitrate_kbps - 5_000.0 * 8.0 / duration / 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_errors_propagate() {
        let config = AnalyzerConfig::default();
        let err = analyze_source(&mut Cursor::new(vec![0u8; 256]), &config).unwrap_err();
        assert!(matches!(err, InspectError::NoAudioFrame));

        // sample rate index 3
        let data = vec![0xFF, 0xFB, 0x9C, 0x00, 0, 0, 0, 0];
        let err = analyze_source(&mut Cursor::new(data), &AnalyzerConfig::default()).unwrap_err();
        assert!(matches!(err, InspectError::UnresolvedSampleRate(_)));

        // bitrate index 15
        let data = vec![0xFF, 0xFB, 0xF0, 0x00, 0, 0, 0, 0];
        let err = analyze_source(&mut Cursor::new(data), &AnalyzerConfig::default()).unwrap_err();
        assert!(matches!(err, InspectError::UnresolvedBitrate(_)));
    }

    #[test]
    fn test_sync_in_id3v1_trailer_is_ignored() {
        let mut data = vec![0u8; 4096];
        let mut trailer = id3v1();
        trailer[3..7].copy_from_slice(&CBR_HEADER);
        data.extend_from_slice(&trailer);
        let err = analyze_source(&mut Cursor::new(data), &AnalyzerConfig::default()).unwrap_err();
        assert!(matches!(err, InspectError::NoAudioFrame));
    }

    #[test]
    fn test_frame_just_before_trailer() {
        let mut data = vec![0u8; 100];
        data.extend_from_slice(&CBR_HEADER);
        data.extend_from_slice(&id3v1());
        let res = analyze_source(&mut Cursor::new(data), &AnalyzerConfig::default()).unwrap();
        assert_eq!(res.frame_offset, 100);
        assert!(res.id3v1.present);

        // One byte later the header would overlap the trailer
        let mut data = vec![0u8; 101];
        data.extend_from_slice(&CBR_HEADER[..3]);
        data.extend_from_slice(&id3v1());
        let err = analyze_source(&mut Cursor::new(data), &AnalyzerConfig::default()).unwrap_err();
        assert!(matches!(err, InspectError::NoAudioFrame));
    }

    #[test]
    fn test_batch_results_cross_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<Vec<Result<AnalysisResult>>>();
        assert_send::<AnalyzerConfig>();
    }

    #[test]
    fn test_display() {
        let mut data = CBR_HEADER.to_vec();
        data.resize(418, 0);
        let res = analyze_source(&mut Cursor::new(data), &AnalyzerConfig::default()).unwrap();
        assert_eq!(res.to_string(), "MPEG 1 layer 3, 44100 Hz, 128.00 kbps (CBR)");
    }
}
