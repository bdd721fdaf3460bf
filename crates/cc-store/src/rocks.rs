use std::path::Path;

use anyhow::{Context, Result};
use rocksdb::DB;

use crate::kv::{KVStore, KVStoreRead, KVStoreWrite};

/// RocksDB-backed byte store. The database is closed when the value drops.
pub struct RocksKV {
    db: DB,
}

impl RocksKV {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = DB::open_default(path.as_ref())
            .with_context(|| format!("open store at {}", path.as_ref().display()))?;
        Ok(RocksKV { db })
    }
}

impl KVStoreRead for RocksKV {
    fn get(&self, key: &[u8]) -> Option<Box<[u8]>> {
        self.db
            .get(key)
            .expect("db operation should be ok")
            .map(Vec::into_boxed_slice)
    }
}

impl KVStoreWrite for RocksKV {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.put(key, value).context("store write")
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db.delete(key).context("store delete")
    }
}

impl KVStore for RocksKV {}
