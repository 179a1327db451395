//! Configuration for MP3 analysis

/// How the VBR estimator measures the audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioSizeSource {
    /// File size minus the leading ID3v2 and trailing ID3v1 tags
    #[default]
    FileSpan,
    /// Byte count stored in the Xing/VBRI tag
    TagByteCount,
}

/// Analysis configuration parameters
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Memory-map files instead of buffered reads (default: true)
    pub map_file: bool,

    /// Maximum distance past the leading tag to search for a frame sync
    /// (default: None, scan to end of file)
    pub max_scan_bytes: Option<u64>,

    /// Audio byte count used by the VBR estimator (default: FileSpan)
    pub audio_size: AudioSizeSource,

    /// Look for a Fraunhofer VBRI tag when no Xing/Info tag is found (default: true)
    pub probe_vbri: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            map_file: true,
            max_scan_bytes: None,
            audio_size: AudioSizeSource::FileSpan,
            probe_vbri: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map_file(mut self, map: bool) -> Self {
        self.map_file = map;
        self
    }

    pub fn with_max_scan_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_scan_bytes = limit;
        self
    }

    pub fn with_audio_size(mut self, source: AudioSizeSource) -> Self {
        self.audio_size = source;
        self
    }

    pub fn with_probe_vbri(mut self, probe: bool) -> Self {
        self.probe_vbri = probe;
        self
    }
}
