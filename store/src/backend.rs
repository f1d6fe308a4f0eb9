use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StoreError;

/// Ordered key-value storage underneath an [`EmbeddingStore`](crate::EmbeddingStore).
///
/// Implementations must be safe for concurrent use. [`Backend::commit`] must
/// be all-or-nothing: after a crash the backend reflects either every put and
/// delete of a commit or none of them.
pub trait Backend: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Return all entries whose key starts with `prefix`, sorted by key.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Apply puts and deletes in a single atomic, durable transaction.
    fn commit(&self, puts: &[(&str, &[u8])], deletes: &[&str]) -> Result<(), StoreError>;
}

impl fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Backend {{ ... }}")
    }
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        (**self).scan(prefix)
    }

    fn commit(&self, puts: &[(&str, &[u8])], deletes: &[&str]) -> Result<(), StoreError> {
        (**self).commit(puts, deletes)
    }
}

/// In-memory [`Backend`]. Data is lost on drop; intended for tests and
/// ephemeral stores.
#[derive(Default)]
pub struct MemoryBackend {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let data = self.data.lock();
        Ok(data
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn commit(&self, puts: &[(&str, &[u8])], deletes: &[&str]) -> Result<(), StoreError> {
        let mut data = self.data.lock();
        for (key, value) in puts {
            data.insert((*key).to_string(), value.to_vec());
        }
        for key in deletes {
            data.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_commit_and_get() {
        let b = MemoryBackend::new();
        b.commit(&[("k1", b"v1".as_slice()), ("k2", b"v2".as_slice())], &[]).unwrap();
        assert_eq!(b.get("k1").unwrap(), Some(b"v1".to_vec()));

        b.commit(&[], &["k1"]).unwrap();
        assert_eq!(b.get("k1").unwrap(), None);
        assert_eq!(b.get("k2").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn memory_scan_is_prefixed_and_sorted() {
        let b = MemoryBackend::new();
        b.commit(&[("p:b", b"2".as_slice()), ("p:a", b"1".as_slice()), ("q:c", b"3".as_slice())], &[])
            .unwrap();

        let got = b.scan("p:").unwrap();
        let keys: Vec<&str> = got.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["p:a", "p:b"]);
        assert_eq!(b.scan("").unwrap().len(), 3);
    }
}
