use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use faceid_store::{EmbeddingStore, IdentityRecord, Snapshot};
use faceid_vecmath::{cosine_similarity, distance, is_degenerate};

use crate::FaceError;

/// Label reported for a face that matched no enrolled identity.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Scores closer than this are treated as equal.
const TIE_EPSILON: f64 = 1e-9;

/// How a query is compared against enrolled embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity in [-1, 1]; higher is closer. Known iff
    /// `score >= threshold`.
    #[default]
    Cosine,
    /// Euclidean distance; lower is closer. Known iff `score <= threshold`.
    Euclidean,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::Euclidean => write!(f, "euclidean"),
        }
    }
}

impl Metric {
    /// Score of `b` relative to query `a`.
    pub fn score(self, a: &[f32], b: &[f32]) -> Result<f64, FaceError> {
        let s = match self {
            Self::Cosine => cosine_similarity(a, b)?,
            Self::Euclidean => distance(a, b)?,
        };
        Ok(s)
    }

    /// The score reported when there is nothing to compare against.
    pub fn worst(self) -> f64 {
        match self {
            Self::Cosine => -1.0,
            Self::Euclidean => f64::INFINITY,
        }
    }

    /// True if `score` passes `threshold`. The boundary is inclusive.
    pub fn accepts(self, score: f64, threshold: f64) -> bool {
        match self {
            Self::Cosine => score >= threshold,
            Self::Euclidean => score <= threshold,
        }
    }

    /// True if `a` beats `b` by more than the tie epsilon.
    fn beats(self, a: f64, b: f64) -> bool {
        match self {
            Self::Cosine => a > b + TIE_EPSILON,
            Self::Euclidean => a < b - TIE_EPSILON,
        }
    }
}

/// Outcome of a single query.
///
/// A "no match" is a successful result with `is_known == false`; failures
/// such as a dimension mismatch are returned as errors instead.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Closest enrolled identity, whether or not it passed the threshold.
    /// `None` only when the store is empty.
    pub record: Option<Arc<IdentityRecord>>,

    /// Metric value between the query and `record`, or [`Metric::worst`].
    pub score: f64,

    /// Whether `score` passed the threshold.
    pub is_known: bool,

    pub metric: Metric,
}

impl MatchResult {
    /// Name of the matched identity, if known.
    pub fn name(&self) -> Option<&str> {
        if !self.is_known {
            return None;
        }
        self.record.as_deref().map(|r| r.name.as_str())
    }

    /// Name of the matched identity, or [`UNKNOWN_LABEL`].
    pub fn label(&self) -> &str {
        self.name().unwrap_or(UNKNOWN_LABEL)
    }
}

/// Nearest-neighbor search with a fixed metric and threshold.
///
/// Stateless apart from its configuration: every query runs against the
/// snapshot it is given, so concurrent queries never observe a half-applied
/// write.
#[derive(Debug, Clone, Copy)]
pub struct MatchEngine {
    metric: Metric,
    threshold: f64,
}

impl MatchEngine {
    pub fn new(metric: Metric, threshold: f64) -> Self {
        Self { metric, threshold }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Matches `query` against the store's current snapshot.
    pub fn match_store(
        &self,
        query: &[f32],
        store: &EmbeddingStore,
    ) -> Result<MatchResult, FaceError> {
        self.find(query, &store.snapshot())
    }

    /// Scans every record and returns the best one.
    ///
    /// Ties (within 1e-9) go to the smaller id. Linear in the number of
    /// records.
    pub fn find(&self, query: &[f32], snapshot: &Snapshot) -> Result<MatchResult, FaceError> {
        if let Some(dim) = snapshot.dimension() {
            if query.len() != dim {
                return Err(FaceError::DimensionMismatch {
                    expected: dim,
                    got: query.len(),
                });
            }
        }
        if query.iter().any(|x| !x.is_finite())
            || (self.metric == Metric::Cosine && is_degenerate(query))
        {
            return Err(FaceError::DegenerateVector);
        }

        // Records are in ascending id order, so only a strictly better score
        // may replace the current best.
        let mut best: Option<(&Arc<IdentityRecord>, f64)> = None;
        for rec in snapshot.records() {
            let score = self.metric.score(query, &rec.embedding)?;
            match best {
                Some((_, best_score)) if !self.metric.beats(score, best_score) => {}
                _ => best = Some((rec, score)),
            }
        }

        let result = match best {
            Some((rec, score)) => MatchResult {
                record: Some(Arc::clone(rec)),
                score,
                is_known: self.metric.accepts(score, self.threshold),
                metric: self.metric,
            },
            None => MatchResult {
                record: None,
                score: self.metric.worst(),
                is_known: false,
                metric: self.metric,
            },
        };

        debug!(
            candidates = snapshot.len(),
            best = ?result.record.as_ref().map(|r| r.id),
            score = result.score,
            known = result.is_known,
            "match"
        );
        Ok(result)
    }
}
