use std::collections::BTreeMap;

use anyhow::Result;
use parking_lot::RwLock;

pub trait KVStoreRead: Send + Sync {
    fn get(&self, key: &[u8]) -> Option<Box<[u8]>>;
}

pub trait KVStoreWrite: Send + Sync {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&self, key: &[u8]) -> Result<()>;
}

pub trait KVStore: KVStoreRead + KVStoreWrite {}

/// In-memory backend for tests and dry runs.
#[derive(Default)]
pub struct MemoryKV {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKV {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KVStoreRead for MemoryKV {
    fn get(&self, key: &[u8]) -> Option<Box<[u8]>> {
        self.map
            .read()
            .get(key)
            .map(|value| value.clone().into_boxed_slice())
    }
}

impl KVStoreWrite for MemoryKV {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }
}

impl KVStore for MemoryKV {}
