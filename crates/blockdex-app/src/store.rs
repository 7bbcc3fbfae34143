//! The versioned multi-store.
//!
//! One ordered key-value substore per subsystem; Commit advances the
//! version and recomputes the application hash over every substore in a
//! fixed order, so two nodes with the same history report byte-identical
//! hashes.

use sha2::{Digest, Sha256};

use blockdex_types::MemKvStore;

/// All subsystem stores. Commit is atomic across them: nothing outside the
/// state machine observes a partially written block.
#[derive(Debug, Clone, Default)]
pub struct MultiStore {
    pub main: MemKvStore,
    pub accounts: MemKvStore,
    pub tokens: MemKvStore,
    pub pairs: MemKvStore,
    pub params: MemKvStore,
    pub orderbooks: MemKvStore,
    pub blocks: MemKvStore,
    version: i64,
    app_hash: [u8; 32],
}

impl MultiStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    #[must_use]
    pub fn app_hash(&self) -> [u8; 32] {
        self.app_hash
    }

    /// Seal the current contents: bump the version and recompute the
    /// application hash.
    pub fn commit(&mut self) -> (i64, [u8; 32]) {
        self.version += 1;
        let mut hasher = Sha256::new();
        hasher.update(b"blockdex:app_hash:v1:");
        hasher.update(self.version.to_be_bytes());
        for (name, sub) in [
            ("main", &self.main),
            ("accounts", &self.accounts),
            ("tokens", &self.tokens),
            ("pairs", &self.pairs),
            ("params", &self.params),
            ("orderbooks", &self.orderbooks),
            ("blocks", &self.blocks),
        ] {
            hasher.update(name.as_bytes());
            for (key, value) in sub.iter() {
                hasher.update((key.len() as u64).to_be_bytes());
                hasher.update(key);
                hasher.update((value.len() as u64).to_be_bytes());
                hasher.update(value);
            }
        }
        self.app_hash = hasher.finalize().into();
        (self.version, self.app_hash)
    }
}
