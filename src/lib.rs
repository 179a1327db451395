//! MPEG audio header inspection.
//!
//! Finds the leading ID3v2 and trailing ID3v1 tags, syncs to the first
//! MPEG audio frame, and reports the stream's sample rate and bitrate.
//! Variable-bitrate streams are averaged from their Xing/Info or VBRI tag.
//!
//! ```no_run
//! let info = mpeg_inspect::analyze("song.mp3").unwrap();
//! println!("{} Hz, {:.1} kbps", info.sample_rate, info.bitrate_kbps);
//! ```

pub mod common;
pub mod config;
pub mod id3;
pub mod mp3;

pub use common::error::{InspectError, Result};
pub use common::source::{ByteSource, CursorGuard};
pub use config::{AnalyzerConfig, AudioSizeSource};
pub use mp3::header::{ChannelMode, MPEGLayer, MPEGVersion, RawFrameHeader, ResolvedHeader};
pub use mp3::xing::{BitrateMode, VbriTagInfo, XingTagInfo};
pub use mp3::{analyze, analyze_batch, analyze_source, analyze_with, AnalysisResult};

#[cfg(feature = "python")]
mod python_bindings {
use super::*;
use pyo3::prelude::*;

// ---- Python Classes ----

#[pyclass(name = "AnalysisResult")]
#[derive(Debug, Clone)]
struct PyAnalysisResult {
    #[pyo3(get)]
    sample_rate: u32,
    #[pyo3(get)]
    bitrate_kbps: f64,
    #[pyo3(get)]
    is_vbr: bool,
    #[pyo3(get)]
    duration: Option<f64>,
    #[pyo3(get)]
    version: f64,
    #[pyo3(get)]
    layer: u8,
    #[pyo3(get)]
    frame_offset: u64,
}

impl From<AnalysisResult> for PyAnalysisResult {
    fn from(r: AnalysisResult) -> Self {
        PyAnalysisResult {
            sample_rate: r.sample_rate,
            bitrate_kbps: r.bitrate_kbps,
            is_vbr: r.is_vbr,
            duration: r.duration_secs,
            version: r.header.version.as_f64(),
            layer: r.header.layer.as_u8(),
            frame_offset: r.frame_offset,
        }
    }
}

#[pymethods]
impl PyAnalysisResult {
    fn __repr__(&self) -> String {
        format!(
            "AnalysisResult(sample_rate={}, bitrate_kbps={:.2}, is_vbr={}, version={}, layer={})",
            self.sample_rate,
            self.bitrate_kbps,
            if self.is_vbr { "True" } else { "False" },
            self.version,
            self.layer
        )
    }

    fn pprint(&self) -> String {
        format!(
            "MPEG {} layer {}, {} Hz, {:.2} kbps ({})",
            self.version,
            self.layer,
            self.sample_rate,
            self.bitrate_kbps,
            if self.is_vbr { "VBR" } else { "CBR" }
        )
    }
}

/// Analyze one file; raises on failure.
#[pyfunction]
fn analyze(filename: &str) -> PyResult<PyAnalysisResult> {
    Ok(mp3::analyze(filename)?.into())
}

/// Analyze several files in parallel. Failed files map to None.
/// The GIL is released while the files are read and parsed.
#[pyfunction]
fn analyze_batch(py: Python<'_>, filenames: Vec<String>) -> Vec<Option<PyAnalysisResult>> {
    py.detach(|| {
        mp3::analyze_batch(&filenames, &AnalyzerConfig::default())
            .into_iter()
            .map(|r| r.ok().map(PyAnalysisResult::from))
            .collect()
    })
}

// ---- Module registration ----

#[pymodule]
fn mpeg_inspect(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyAnalysisResult>()?;

    m.add_function(wrap_pyfunction!(analyze, m)?)?;
    m.add_function(wrap_pyfunction!(analyze_batch, m)?)?;

    m.add("InspectError", m.py().get_type::<common::error::InspectPyError>())?;
    m.add("NoAudioFrameError", m.py().get_type::<common::error::NoAudioFrameError>())?;
    m.add(
        "UnresolvedHeaderError",
        m.py().get_type::<common::error::UnresolvedHeaderError>(),
    )?;
    m.add(
        "IndeterminateDurationError",
        m.py().get_type::<common::error::IndeterminateDurationError>(),
    )?;

    Ok(())
}
} // mod python_bindings
