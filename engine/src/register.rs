use std::sync::Arc;

use tracing::debug;

use faceid_store::{EmbeddingStore, IdentityRecord};
use faceid_vecmath::{is_degenerate, mean};

use crate::FaceError;

/// One sample offered for enrollment.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub embedding: Vec<f32>,

    /// Result of the upstream quality gate (face detected, large enough).
    pub quality_ok: bool,
}

impl Candidate {
    /// A candidate that passed the quality gate.
    pub fn accepted(embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            quality_ok: true,
        }
    }

    /// A placeholder for a sample that failed upstream.
    pub fn rejected() -> Self {
        Self {
            embedding: Vec::new(),
            quality_ok: false,
        }
    }
}

/// The averaged embedding that a registration will commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub name: String,
    pub embedding: Vec<f32>,
    pub source_count: u32,
    /// Candidates discarded by the gate or the dimension check.
    pub dropped: usize,
}

/// Merges several candidate embeddings into one identity record.
///
/// Policy:
/// - the name must be non-empty after trimming;
/// - candidates beyond `max_candidates` are discarded, keeping the earliest;
/// - candidates that failed the quality gate, are degenerate, or disagree on
///   dimension are dropped and counted;
/// - at least `min_valid` must survive, otherwise nothing is written;
/// - survivors are averaged and inserted with one store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPipeline {
    min_valid: usize,
    max_candidates: Option<usize>,
}

impl Default for RegistrationPipeline {
    fn default() -> Self {
        Self::new(1, None)
    }
}

impl RegistrationPipeline {
    /// `min_valid` of 0 is treated as 1: a record needs at least one source.
    pub fn new(min_valid: usize, max_candidates: Option<usize>) -> Self {
        Self {
            min_valid: min_valid.max(1),
            max_candidates,
        }
    }

    pub fn min_valid(&self) -> usize {
        self.min_valid
    }

    pub fn max_candidates(&self) -> Option<usize> {
        self.max_candidates
    }

    /// Applies the policy without touching any store.
    ///
    /// `dimension` is the store's established dimension; when `None`, the
    /// first surviving candidate sets it.
    pub fn prepare(
        &self,
        name: &str,
        candidates: Vec<Candidate>,
        dimension: Option<usize>,
    ) -> Result<Enrollment, FaceError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(FaceError::InvalidName(name.to_string()));
        }

        let mut candidates = candidates;
        if let Some(max) = self.max_candidates {
            candidates.truncate(max);
        }
        let offered = candidates.len();

        let mut dim = dimension;
        let mut survivors: Vec<Vec<f32>> = Vec::with_capacity(offered);
        for (i, c) in candidates.into_iter().enumerate() {
            if !c.quality_ok {
                debug!(candidate = i, "dropped: failed quality gate");
                continue;
            }
            if is_degenerate(&c.embedding) {
                debug!(candidate = i, "dropped: degenerate embedding");
                continue;
            }
            match dim {
                Some(d) if d != c.embedding.len() => {
                    debug!(
                        candidate = i,
                        expected = d,
                        got = c.embedding.len(),
                        "dropped: dimension mismatch"
                    );
                    continue;
                }
                Some(_) => {}
                None => dim = Some(c.embedding.len()),
            }
            survivors.push(c.embedding);
        }

        let dropped = offered - survivors.len();
        if survivors.len() < self.min_valid {
            return Err(FaceError::InsufficientValidSamples {
                required: self.min_valid,
                valid: survivors.len(),
                dropped,
            });
        }

        let embedding = mean(&survivors)?;
        if is_degenerate(&embedding) {
            return Err(FaceError::DegenerateVector);
        }

        Ok(Enrollment {
            name: trimmed.to_string(),
            embedding,
            source_count: survivors.len() as u32,
            dropped,
        })
    }

    /// Applies the policy and commits the result with a single insert.
    ///
    /// On error the store is unchanged.
    pub fn register(
        &self,
        store: &EmbeddingStore,
        name: &str,
        candidates: Vec<Candidate>,
    ) -> Result<Arc<IdentityRecord>, FaceError> {
        let enrollment = self.prepare(name, candidates, store.dimension())?;
        debug!(
            name = %enrollment.name,
            sources = enrollment.source_count,
            dropped = enrollment.dropped,
            "enrolling"
        );
        let record = store.insert(
            &enrollment.name,
            enrollment.embedding,
            enrollment.source_count,
        )?;
        Ok(record)
    }
}
