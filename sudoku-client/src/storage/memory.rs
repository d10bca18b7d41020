//! In-memory backend with an optional size quota.

use super::{KeyValueBackend, StoreError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory backend. Clones share the same entries.
///
/// With a quota, a write that would push the total size of keys and values
/// past it fails with [`StoreError::QuotaExceeded`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
    fail_next_set: bool,
}

impl MemoryInner {
    fn used_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl MemoryBackend {
    /// An unbounded backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend holding at most `bytes` of keys and values.
    pub fn with_quota(bytes: usize) -> Self {
        let backend = Self::default();
        backend.lock().quota_bytes = Some(bytes);
        backend
    }

    /// Change the quota; `None` removes it.
    pub fn set_quota(&self, bytes: Option<usize>) {
        self.lock().quota_bytes = bytes;
    }

    /// Make the next `set()` fail with a quota error regardless of size.
    pub fn fail_next_set(&self) {
        self.lock().fail_next_set = true;
    }

    /// Total size of keys and values.
    pub fn used_bytes(&self) -> usize {
        self.lock().used_without("")
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        // Poisoning leaves the map intact.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();

        if std::mem::take(&mut inner.fail_next_set) {
            return Err(StoreError::QuotaExceeded);
        }

        if let Some(quota) = inner.quota_bytes {
            if inner.used_without(key) + key.len() + value.len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }

        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.lock().entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_removes_values() {
        let backend = MemoryBackend::new();
        backend.set("a", "1").unwrap();
        backend.set("b", "2").unwrap();
        assert_eq!(backend.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(backend.keys().unwrap(), vec!["a", "b"]);

        backend.remove("a").unwrap();
        backend.remove("missing").unwrap();
        assert_eq!(backend.get("a").unwrap(), None);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn quota_counts_keys_and_values() {
        let backend = MemoryBackend::with_quota(10);
        backend.set("ab", "1234").unwrap(); // 6 bytes
        assert!(matches!(backend.set("cd", "1234"), Err(StoreError::QuotaExceeded)));

        // Overwriting only counts the new value.
        backend.set("ab", "12345678").unwrap();
        assert_eq!(backend.used_bytes(), 10);
    }

    #[test]
    fn forced_failure_applies_once() {
        let backend = MemoryBackend::new();
        backend.fail_next_set();
        assert!(matches!(backend.set("a", "1"), Err(StoreError::QuotaExceeded)));
        backend.set("a", "1").unwrap();
    }

    #[test]
    fn clones_share_entries() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend.set("k", "v").unwrap();
        assert_eq!(other.get("k").unwrap().as_deref(), Some("v"));
    }
}
