use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::error::TrieError;

use super::TrieDB;

/// InMemory implementation for the TrieDB trait, with get and put operations.
pub struct InMemoryTrieDB {
    inner: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl InMemoryTrieDB {
    pub fn new(map: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>) -> Self {
        Self { inner: map }
    }

    pub fn empty() -> Self {
        Self::new(Arc::new(Mutex::new(HashMap::new())))
    }
}

impl TrieDB for InMemoryTrieDB {
    fn get(&self, key: Vec<u8>) -> Result<Option<Vec<u8>>, TrieError> {
        Ok(self.inner.lock().unwrap().get(&key).cloned())
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), TrieError> {
        self.inner.lock().unwrap().insert(key, value);
        Ok(())
    }

    fn key_exists(&self, key: Vec<u8>) -> Result<bool, TrieError> {
        Ok(self.inner.lock().unwrap().contains_key(&key))
    }
}
