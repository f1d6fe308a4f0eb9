//! Durable collection of enrolled face identities.
//!
//! [`EmbeddingStore`] owns the canonical set of [`IdentityRecord`]s. Reads go
//! through immutable [`Snapshot`]s; writes are serialized and become visible
//! only after the [`Backend`] has committed them.
//!
//! ```no_run
//! use faceid_store::{EmbeddingStore, RedbBackend, StoreOptions};
//!
//! let backend = RedbBackend::open("faces.redb")?;
//! let store = EmbeddingStore::open(Box::new(backend), StoreOptions::default())?;
//! let rec = store.insert("Alice", vec![0.1, 0.9, 0.0], 3)?;
//! assert_eq!(store.get(rec.id).map(|r| r.source_count), Some(3));
//! # Ok::<(), faceid_store::StoreError>(())
//! ```

mod backend;
mod codec;
mod error;
mod keys;
mod record;
mod redb_backend;
mod store;

pub use backend::{Backend, MemoryBackend};
pub use error::StoreError;
pub use record::IdentityRecord;
pub use redb_backend::RedbBackend;
pub use store::{EmbeddingStore, Snapshot, StoreOptions};
