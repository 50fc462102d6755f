use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

/// Failures a key-value backend can signal. None of them are fatal to the
/// journal; callers degrade to an empty or in-memory log.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("storage backend unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("storage quota exceeded writing {key}: {needed} bytes over a {limit} byte limit")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
}

impl BackendError {
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        BackendError::Unavailable {
            reason: reason.into(),
        }
    }
}

/// String-keyed, string-valued store the journal persists into.
///
/// Methods take `&self`; implementations that mutate in memory use interior
/// mutability. Removing an absent key succeeds.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;
    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;
    fn remove(&self, key: &str) -> Result<(), BackendError>;
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for &B {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        (**self).remove(key)
    }
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for Box<B> {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        (**self).remove(key)
    }
}

/// Process-local backend. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any single value longer than `limit` bytes, the way a browser
    /// store rejects writes past its quota.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            quota: Some(limit),
        }
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        if let Some(limit) = self.quota {
            if value.len() > limit {
                return Err(BackendError::QuotaExceeded {
                    key: key.to_owned(),
                    needed: value.len(),
                    limit,
                });
            }
        }
        self.values.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        self.values.lock().remove(key);
        Ok(())
    }
}
