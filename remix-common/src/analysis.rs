//! Analysis backend wire types
//!
//! The analysis backend is an external collaborator; its result is
//! consumed opaquely. Field names match the backend's JSON verbatim.

use serde::{Deserialize, Serialize};

/// Full analysis result for one audio file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioAnalysis {
    pub sample_rate: u32,
    pub duration_sec: f64,
    /// Per-frame RMS energy curve
    pub energy_rms: Vec<f64>,
    pub spectrogram_db: Vec<Vec<f64>>,
    pub mfcc_mean: Vec<f64>,
    pub tempo_bpm: f64,
    pub beat_times: Vec<f64>,
    /// Segment boundary timestamps, seconds (n boundaries -> n-1 sections)
    pub segments_sec: Vec<f64>,
    pub spectral_centroid: Vec<f64>,
}

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisError {
    pub error: String,
}
