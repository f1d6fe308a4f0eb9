use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An enrolled identity: a display name and the embedding it is matched by.
///
/// Records are created by [`EmbeddingStore::insert`](crate::EmbeddingStore::insert)
/// and never mutated afterwards. Re-registering a name creates a new record.
#[derive(Clone, PartialEq, Serialize)]
pub struct IdentityRecord {
    /// Store-assigned, strictly increasing, never reused.
    pub id: u64,

    /// Display label. Not unique; `id` is the key.
    pub name: String,

    /// Averaged embedding, `dimension()` components.
    pub embedding: Vec<f32>,

    /// Insert time, millisecond precision.
    pub created_at: DateTime<Utc>,

    /// Number of sample images averaged into `embedding` (>= 1).
    pub source_count: u32,
}

impl fmt::Debug for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("dim", &self.embedding.len())
            .field("created_at", &self.created_at)
            .field("source_count", &self.source_count)
            .finish()
    }
}
