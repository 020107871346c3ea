//! Shared, persisted alias store for concurrent readers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use tracing::info;

use super::resolver::resolve;
use super::store::{AliasStore, Result};
use crate::error::StoreError;
use crate::models::record::FieldResult;

/// Single-writer, multi-reader handle over an [`AliasStore`].
///
/// Readers clone an `Arc` snapshot under a brief read lock and resolve
/// without holding it. Writers are serialized, mutate a copy, flush it to
/// the backing file and only then publish the new snapshot, so a change is
/// visible to readers only once it is persisted.
#[derive(Debug)]
pub struct AliasRegistry {
    current: RwLock<Arc<AliasStore>>,
    writer: Mutex<()>,
    path: Option<PathBuf>,
}

impl AliasRegistry {
    /// In-memory registry with no backing file.
    pub fn new(store: AliasStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
            writer: Mutex::new(()),
            path: None,
        }
    }

    /// Load the registry from a store file. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = AliasStore::load(&path)?;
        Ok(Self {
            current: RwLock::new(Arc::new(store)),
            writer: Mutex::new(()),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current published store.
    pub fn snapshot(&self) -> Arc<AliasStore> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            // The Arc is swapped in one assignment, so it is never half-written.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Resolve against the current snapshot.
    pub fn resolve(&self, candidate: &str, threshold: f32) -> FieldResult<String> {
        resolve(candidate, &self.snapshot(), threshold)
    }

    /// Apply a mutation, persist it, then publish it.
    ///
    /// Nothing is published when the mutation or the flush fails.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut AliasStore) -> Result<T>,
    {
        let _guard = self.writer.lock().map_err(|_| StoreError::Poisoned)?;

        let mut next = (*self.snapshot()).clone();
        let out = f(&mut next)?;

        if let Some(path) = &self.path {
            next.save(path)?;
            info!("Alias store updated at {}", path.display());
        }

        let mut current = self.current.write().map_err(|_| StoreError::Poisoned)?;
        *current = Arc::new(next);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_update_persists_before_publish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        let registry = AliasRegistry::open(&path).unwrap();
        assert!(registry.snapshot().is_empty());

        registry
            .update(|store| {
                store.add_canonical("SCOTIABANK")?;
                store.add_alias("SCOTIABANK", "Scotia")
            })
            .unwrap();

        assert_eq!(registry.resolve("scotia", 0.8).value().map(String::as_str), Some("SCOTIABANK"));
        let reloaded = AliasStore::load(&path).unwrap();
        assert_eq!(reloaded.lookup("SCOTIA"), Some("SCOTIABANK"));
    }

    #[test]
    fn test_failed_update_publishes_nothing() {
        let registry = AliasRegistry::new(AliasStore::new());
        let err = registry.update(|store| {
            store.add_canonical("BELL")?;
            store.add_alias("ROGERS", "Rogers Wireless")
        });
        assert!(matches!(err, Err(StoreError::UnknownCanonical(_))));
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_is_stable_across_updates() {
        let registry = AliasRegistry::new(AliasStore::new());
        let before = registry.snapshot();
        registry.update(|store| store.add_canonical("BELL")).unwrap();

        assert!(before.is_empty());
        assert!(registry.snapshot().contains_canonical("BELL"));
    }

    #[test]
    fn test_concurrent_writers_are_serialized() {
        let registry = Arc::new(AliasRegistry::new(AliasStore::new()));
        registry.update(|store| store.add_canonical("ACME")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry
                        .update(|store| store.add_alias("ACME", &format!("Acme {i}")))
                        .unwrap();
                    registry.resolve("ACME", 0.8).is_present()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(registry.snapshot().aliases_of("ACME").count(), 8);
    }
}
