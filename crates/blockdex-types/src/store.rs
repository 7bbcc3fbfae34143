//! The key-value store seam.
//!
//! The multi-store itself is an external collaborator; state-machine
//! components write through this trait so snapshots and replay never depend
//! on a concrete store implementation.

/// One subsystem's ordered key-value view.
pub trait KvStore {
    fn set(&mut self, key: &[u8], value: Vec<u8>);
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn delete(&mut self, key: &[u8]);
    /// All entries whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

/// A plain in-memory store view backed by a `BTreeMap`. The production
/// multi-store wraps its substores in this; tests use it directly.
#[derive(Debug, Clone, Default)]
pub struct MemKvStore {
    entries: std::collections::BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemKvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate every entry in key order, for hashing.
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> {
        self.entries.iter()
    }
}

impl KvStore for MemKvStore {
    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let mut store = MemKvStore::new();
        store.set(b"a", vec![1]);
        assert_eq!(store.get(b"a"), Some(vec![1]));
        store.delete(b"a");
        assert_eq!(store.get(b"a"), None);
    }

    #[test]
    fn prefix_scan_is_ordered_and_bounded() {
        let mut store = MemKvStore::new();
        store.set(b"snap/001/x", vec![1]);
        store.set(b"snap/002/x", vec![2]);
        store.set(b"other", vec![3]);

        let hits = store.prefix_scan(b"snap/");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, b"snap/001/x".to_vec());
        assert_eq!(hits[1].0, b"snap/002/x".to_vec());
    }
}
