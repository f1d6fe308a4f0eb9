use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use faceid_vecmath::is_degenerate;

use crate::backend::Backend;
use crate::codec::{decode_record, decode_u32, decode_u64, encode_record};
use crate::error::StoreError;
use crate::keys::{parse_record_key, record_key, META_DIM, META_NEXT_ID, RECORD_PREFIX};
use crate::record::IdentityRecord;

/// Settings fixed when a store is opened.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Required embedding dimension. When `None`, the dimension already
    /// persisted in the backend is used, or the first insert establishes it.
    pub dimension: Option<usize>,

    /// Maximum number of records. `None` means unbounded.
    pub capacity: Option<usize>,
}

/// Immutable view of the store at one point in time.
///
/// Cloning is cheap. A snapshot never changes after it is taken; inserts and
/// removals publish a new one.
#[derive(Clone, Default)]
pub struct Snapshot {
    records: Arc<Vec<Arc<IdentityRecord>>>,
    dimension: Option<usize>,
}

impl Snapshot {
    /// Records in id (insertion) order.
    pub fn records(&self) -> &[Arc<IdentityRecord>] {
        &self.records
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Arc<IdentityRecord>> {
        self.position(id).map(|i| &self.records[i])
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.records.binary_search_by_key(&id, |r| r.id).ok()
    }
}

/// The canonical, durable set of enrolled identities.
///
/// Thread-safe: readers take a [`Snapshot`] and never block writers for
/// longer than an `Arc` clone. Writers ([`insert`](Self::insert),
/// [`remove`](Self::remove)) are serialized; each commits to the backend
/// first and only then publishes the new index, so readers never see a
/// record that is not durable.
pub struct EmbeddingStore {
    backend: Box<dyn Backend>,
    capacity: Option<usize>,
    published: RwLock<Snapshot>,
    /// Single-writer guard; holds the next id to assign.
    writer: Mutex<u64>,
}

impl EmbeddingStore {
    /// Rebuilds the index from `backend`.
    ///
    /// An empty backend yields an empty store. Rows that cannot be decoded,
    /// or that disagree on dimension, fail with [`StoreError::Corrupt`];
    /// nothing is skipped or repaired.
    pub fn open(backend: Box<dyn Backend>, opts: StoreOptions) -> Result<Self, StoreError> {
        if opts.dimension == Some(0) {
            return Err(StoreError::InvalidRecord(
                "dimension must be positive".into(),
            ));
        }

        let rows = backend.scan(RECORD_PREFIX).map_err(unreadable)?;
        let mut records = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            let rec = decode_record(&value)
                .map_err(|e| StoreError::Corrupt(format!("row {key}: {e}")))?;
            if parse_record_key(&key) != Some(rec.id) {
                return Err(StoreError::Corrupt(format!(
                    "row {key} holds record {}",
                    rec.id
                )));
            }
            if rec.source_count == 0 {
                return Err(StoreError::Corrupt(format!(
                    "record {} has no sources",
                    rec.id
                )));
            }
            if is_degenerate(&rec.embedding) {
                return Err(StoreError::Corrupt(format!(
                    "record {} has a zero or non-finite embedding",
                    rec.id
                )));
            }
            records.push(Arc::new(rec));
        }

        let stored_dim = match backend.get(META_DIM).map_err(unreadable)? {
            Some(b) => Some(decode_u32(&b)? as usize),
            None => None,
        };
        let mut dimension = stored_dim.or_else(|| records.first().map(|r| r.embedding.len()));
        if let Some(bad) = records
            .iter()
            .find(|r| Some(r.embedding.len()) != dimension)
        {
            return Err(StoreError::Corrupt(format!(
                "record {} has dimension {}, store has {:?}",
                bad.id,
                bad.embedding.len(),
                dimension
            )));
        }

        match (dimension, opts.dimension) {
            (Some(have), Some(want)) if have != want => {
                return Err(StoreError::DimensionMismatch {
                    expected: have,
                    got: want,
                });
            }
            (None, want) => dimension = want,
            _ => {}
        }

        let stored_next = match backend.get(META_NEXT_ID).map_err(unreadable)? {
            Some(b) => decode_u64(&b)?,
            None => 1,
        };
        let max_id = records.last().map(|r| r.id).unwrap_or(0);
        let next_id = stored_next.max(max_id + 1);

        info!(
            records = records.len(),
            dimension = ?dimension,
            next_id,
            "embedding store opened"
        );

        Ok(Self {
            backend,
            capacity: opts.capacity,
            published: RwLock::new(Snapshot {
                records: Arc::new(records),
                dimension,
            }),
            writer: Mutex::new(next_id),
        })
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.published.read().clone()
    }

    /// All records in insertion order.
    pub fn all(&self) -> Vec<Arc<IdentityRecord>> {
        self.snapshot().records().to_vec()
    }

    pub fn get(&self, id: u64) -> Option<Arc<IdentityRecord>> {
        self.snapshot().get(id).cloned()
    }

    /// The fixed embedding dimension, once configured or established.
    pub fn dimension(&self) -> Option<usize> {
        self.published.read().dimension
    }

    pub fn len(&self) -> usize {
        self.published.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Durably adds a new identity and returns it.
    ///
    /// The first insert into a store without a dimension establishes it.
    /// On any error nothing is written and the index is unchanged.
    pub fn insert(
        &self,
        name: &str,
        embedding: Vec<f32>,
        source_count: u32,
    ) -> Result<Arc<IdentityRecord>, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidRecord("name is empty".into()));
        }
        if source_count == 0 {
            return Err(StoreError::InvalidRecord(
                "source_count must be at least 1".into(),
            ));
        }
        if is_degenerate(&embedding) {
            return Err(StoreError::DegenerateVector);
        }

        let mut next_id = self.writer.lock();
        let current = self.snapshot();
        if let Some(dim) = current.dimension {
            if embedding.len() != dim {
                return Err(StoreError::DimensionMismatch {
                    expected: dim,
                    got: embedding.len(),
                });
            }
        }
        if let Some(capacity) = self.capacity {
            if current.len() >= capacity {
                return Err(StoreError::Full { capacity });
            }
        }

        let record = IdentityRecord {
            id: *next_id,
            name: name.to_string(),
            embedding,
            created_at: now_millis(),
            source_count,
        };
        let key = record_key(record.id);
        let row = encode_record(&record);
        let next = (record.id + 1).to_le_bytes();
        let dim = (record.embedding.len() as u32).to_le_bytes();
        self.backend.commit(
            &[
                (key.as_str(), row.as_slice()),
                (META_NEXT_ID, next.as_slice()),
                (META_DIM, dim.as_slice()),
            ],
            &[],
        )?;
        *next_id = record.id + 1;

        let record = Arc::new(record);
        let mut records = Vec::with_capacity(current.len() + 1);
        records.extend(current.records.iter().cloned());
        records.push(Arc::clone(&record));
        self.publish(records, Some(record.embedding.len()));

        info!(
            id = record.id,
            name = %record.name,
            source_count,
            "identity inserted"
        );
        Ok(record)
    }

    /// Durably deletes a record and returns it.
    pub fn remove(&self, id: u64) -> Result<Arc<IdentityRecord>, StoreError> {
        let _guard = self.writer.lock();
        let current = self.snapshot();
        let pos = current.position(id).ok_or(StoreError::NotFound(id))?;

        self.backend.commit(&[], &[record_key(id).as_str()])?;

        let mut records = current.records.to_vec();
        let removed = records.remove(pos);
        self.publish(records, current.dimension);

        info!(id, name = %removed.name, "identity removed");
        Ok(removed)
    }

    fn publish(&self, records: Vec<Arc<IdentityRecord>>, dimension: Option<usize>) {
        let count = records.len();
        *self.published.write() = Snapshot {
            records: Arc::new(records),
            dimension,
        };
        debug!(records = count, "index published");
    }
}

fn unreadable(e: StoreError) -> StoreError {
    match e {
        StoreError::Storage(msg) => StoreError::Corrupt(msg),
        other => other,
    }
}

fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
