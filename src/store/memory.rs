//! In-process store used when no Redis is configured, and by tests.
//!
//! Durability obviously doesn't survive the process, which is acceptable for
//! local development; the pipeline itself never knows the difference.

use super::{KvStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

enum Value {
    Scalar(String),
    Hash(HashMap<String, String>),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> T) -> T {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        entries.retain(|_, entry| !entry.expired());
        f(&mut entries)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.with_entries(|entries| match entries.get(key) {
            Some(Entry {
                value: Value::Scalar(s),
                ..
            }) => Some(s.clone()),
            _ => None,
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            entries.insert(
                key.to_owned(),
                Entry {
                    value: Value::Scalar(value.to_owned()),
                    expires_at: ttl.map(|d| Instant::now() + d),
                },
            );
        });

        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.with_entries(|entries| match entries.get(key) {
            Some(Entry {
                value: Value::Hash(h),
                ..
            }) => h.clone(),
            _ => HashMap::new(),
        }))
    }

    async fn hset(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            let entry = entries.entry(key.to_owned()).or_insert_with(|| Entry {
                value: Value::Hash(HashMap::new()),
                expires_at: None,
            });

            // Overwriting a scalar with a hash mirrors what the field update
            // would do on a fresh key.
            if !matches!(entry.value, Value::Hash(_)) {
                entry.value = Value::Hash(HashMap::new());
            }

            if let Value::Hash(h) = &mut entry.value {
                for (field, value) in fields {
                    h.insert((*field).to_owned(), (*value).to_owned());
                }
            }
        });

        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            if let Some(entry) = entries.get_mut(key) {
                entry.expires_at = Some(Instant::now() + ttl);
            }
        });

        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.with_entries(|entries| {
            entries.remove(key);
        });

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
