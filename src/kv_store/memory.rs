use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;

use super::KvStore;

/// In-memory key-value store, used by tests in place of [`SqliteKvStore`].
#[derive(Default)]
pub struct MemoryKvStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, (u64, String)>,
    next_seq: u64,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.entries.get(key).map(|(_, value)| value.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get_mut(key) {
            Some(slot) => slot.1 = value.to_string(),
            None => {
                inner.next_seq += 1;
                let seq = inner.next_seq;
                inner.entries.insert(key.to_string(), (seq, value.to_string()));
            }
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        let mut matches: Vec<(u64, String)> = inner
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (seq, _))| (*seq, key.clone()))
            .collect();
        matches.sort();
        Ok(matches.into_iter().map(|(_, key)| key).collect())
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let current = inner.entries.get(key).map(|(_, value)| value.clone());
        if current.as_deref() != expected {
            return Ok(false);
        }
        match inner.entries.get_mut(key) {
            Some(slot) => slot.1 = new.to_string(),
            None => {
                inner.next_seq += 1;
                let seq = inner.next_seq;
                inner.entries.insert(key.to_string(), (seq, new.to_string()));
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaves_like_the_sqlite_store() {
        let store = MemoryKvStore::new();
        store.set("p_batch_one", "1").unwrap();
        store.set("p_batch_two", "2").unwrap();
        store.set("p_batch_one", "1b").unwrap();

        assert_eq!(
            store.keys_with_prefix("p_batch_").unwrap(),
            vec!["p_batch_one", "p_batch_two"]
        );
        assert_eq!(store.get("p_batch_one").unwrap(), Some("1b".to_string()));

        assert!(store.compare_and_swap("lock", None, "a").unwrap());
        assert!(!store.compare_and_swap("lock", None, "b").unwrap());
        assert!(store.compare_and_swap("lock", Some("a"), "b").unwrap());

        store.delete("lock").unwrap();
        assert_eq!(store.get("lock").unwrap(), None);
    }
}
