use serde::{Deserialize, Serialize};

use faceid_store::StoreOptions;

use crate::matcher::Metric;
use crate::preprocess::Preprocessor;
use crate::FaceError;

/// Tunables for recognition and enrollment.
///
/// Every field has a default, so a partial YAML/JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Comparison metric. Default: cosine.
    pub metric: Metric,

    /// Acceptance threshold in units of `metric`: minimum similarity for
    /// cosine, maximum distance for Euclidean. Default: 0.7.
    pub threshold: f64,

    /// Minimum surviving samples per registration. Default: 1.
    pub min_valid: usize,

    /// Samples beyond this count are ignored (earliest kept). Default: unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_candidates: Option<usize>,

    /// Concurrent per-image extractions in one request. Default: 4.
    pub parallelism: usize,

    /// Minimum face box side in pixels. Default: 20.
    pub min_face_size: u32,

    /// Minimum detector confidence for a box to be used. Default: 0.5.
    pub detection_confidence: f32,

    /// Mean luma below which images are enhanced. Default: 80.
    pub brightness_threshold: f64,

    /// Store capacity. Default: 1000.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_identities: Option<usize>,

    /// Fixed embedding dimension (e.g. 128 or 512). Default: set by the
    /// first registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Cosine,
            threshold: 0.7,
            min_valid: 1,
            max_candidates: None,
            parallelism: 4,
            min_face_size: 20,
            detection_confidence: 0.5,
            brightness_threshold: Preprocessor::DEFAULT_BRIGHTNESS_THRESHOLD,
            max_identities: Some(1000),
            dimension: None,
        }
    }
}

impl EngineConfig {
    /// Rejects settings that cannot work.
    pub fn validate(&self) -> Result<(), FaceError> {
        let bad = |msg: String| -> Result<(), FaceError> { Err(FaceError::Config(msg)) };

        if !self.threshold.is_finite() {
            return bad(format!("threshold must be finite, got {}", self.threshold));
        }
        match self.metric {
            Metric::Cosine if !(-1.0..=1.0).contains(&self.threshold) => {
                return bad(format!(
                    "cosine threshold must be in [-1, 1], got {}",
                    self.threshold
                ));
            }
            Metric::Euclidean if self.threshold < 0.0 => {
                return bad(format!(
                    "euclidean threshold must be non-negative, got {}",
                    self.threshold
                ));
            }
            _ => {}
        }
        if self.min_valid == 0 {
            return bad("min_valid must be at least 1".into());
        }
        if let Some(max) = self.max_candidates {
            if max < self.min_valid {
                return bad(format!(
                    "max_candidates ({max}) is below min_valid ({})",
                    self.min_valid
                ));
            }
        }
        if self.parallelism == 0 {
            return bad("parallelism must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return bad(format!(
                "detection_confidence must be in [0, 1], got {}",
                self.detection_confidence
            ));
        }
        if self.dimension == Some(0) {
            return bad("dimension must be positive".into());
        }
        if self.max_identities == Some(0) {
            return bad("max_identities must be positive".into());
        }
        Ok(())
    }

    /// Options for opening the store this engine will use.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            dimension: self.dimension,
            capacity: self.max_identities,
        }
    }
}
