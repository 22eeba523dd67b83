//! Storage layer
//!
//! Reading positions are kept in plain string key-value stores, one per
//! durability tier:
//!
//! - **Session tier**: [`MemoryStore`], gone when the reading session ends
//! - **Durable tier**: [`FileStore`], a JSON file under the data directory
//!
//! [`TieredStore`] puts the two behind a typed interface addressed by
//! [`StorageKey`].

pub mod error;
pub mod file;
pub mod key;
pub mod memory;

pub use error::{StorageError, StorageResult, WriteFailure};
pub use file::FileStore;
pub use key::{Namespace, StorageKey, Tier};
pub use memory::MemoryStore;

/// String key-value store (the browser `Storage` shape)
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&mut self, key: &str) -> StorageResult<()>;
    fn clear(&mut self) -> StorageResult<()>;
}

/// Session and durable stores behind one typed interface
pub struct TieredStore {
    session: Box<dyn KeyValueStore>,
    durable: Box<dyn KeyValueStore>,
}

impl TieredStore {
    pub fn new(session: Box<dyn KeyValueStore>, durable: Box<dyn KeyValueStore>) -> Self {
        Self { session, durable }
    }

    /// Both tiers in memory (tests, throwaway sessions)
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()), Box::new(MemoryStore::new()))
    }

    /// In-memory session tier, durable tier in the JSON file at `path`
    pub fn open(path: impl Into<std::path::PathBuf>) -> StorageResult<Self> {
        let durable = FileStore::open(path)?;
        Ok(Self::new(Box::new(MemoryStore::new()), Box::new(durable)))
    }

    fn tier(&self, tier: Tier) -> &dyn KeyValueStore {
        match tier {
            Tier::Session => self.session.as_ref(),
            Tier::Durable => self.durable.as_ref(),
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut dyn KeyValueStore {
        match tier {
            Tier::Session => self.session.as_mut(),
            Tier::Durable => self.durable.as_mut(),
        }
    }

    pub fn get(&self, key: &StorageKey) -> StorageResult<Option<String>> {
        self.tier(key.tier).get(&key.encode())
    }

    pub fn set(&mut self, key: &StorageKey, value: &str) -> StorageResult<()> {
        self.tier_mut(key.tier).set(&key.encode(), value)
    }

    pub fn remove(&mut self, key: &StorageKey) -> StorageResult<()> {
        self.tier_mut(key.tier).remove(&key.encode())
    }

    /// Drop everything in the session tier
    pub fn end_session(&mut self) -> StorageResult<()> {
        self.session.clear()
    }
}
