//! Persistent canonical-name / alias store.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::similarity::match_key;
use crate::error::StoreError;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// On-disk layout of the store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    canonical_names: Vec<String>,
    #[serde(default)]
    aliases: BTreeMap<String, Vec<String>>,
}

/// Canonical business names and the aliases that resolve to them.
///
/// Every alias maps to exactly one canonical name, and no two entries
/// share a match key (case-insensitive, whitespace-collapsed).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasStore {
    canonicals: Vec<String>,
    aliases: BTreeMap<String, BTreeSet<String>>,
    /// Match key of every canonical and alias -> owning canonical.
    index: BTreeMap<String, String>,
}

/// A name known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownName<'a> {
    /// Match key of the name.
    pub key: &'a str,
    /// Canonical the name resolves to.
    pub canonical: &'a str,
}

impl AliasStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.canonicals.is_empty()
    }

    /// Canonical names in insertion order.
    pub fn canonical_names(&self) -> &[String] {
        &self.canonicals
    }

    pub fn contains_canonical(&self, name: &str) -> bool {
        self.canonicals.iter().any(|c| c == name)
    }

    /// Aliases registered under a canonical name, sorted.
    pub fn aliases_of(&self, canonical: &str) -> impl Iterator<Item = &str> {
        self.aliases
            .get(canonical)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Every canonical and alias, keyed for matching.
    pub fn known_names(&self) -> impl Iterator<Item = KnownName<'_>> {
        self.index.iter().map(|(key, canonical)| KnownName {
            key: key.as_str(),
            canonical: canonical.as_str(),
        })
    }

    /// Canonical owning a name whose match key equals `name`'s.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.index.get(&match_key(name)).map(String::as_str)
    }

    /// Register a canonical name. Returns `false` if it already exists.
    pub fn add_canonical(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        let key = match_key(name);
        if key.is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        if let Some(existing) = self.index.get(&key) {
            if existing == name {
                return Ok(false);
            }
            return Err(StoreError::DuplicateAlias {
                alias: name.to_string(),
                existing: existing.clone(),
            });
        }

        self.canonicals.push(name.to_string());
        self.index.insert(key, name.to_string());
        debug!("Added canonical name {:?}", name);
        Ok(true)
    }

    /// Register an alias under an existing canonical name. Returns `false`
    /// if the alias already resolves to that canonical.
    pub fn add_alias(&mut self, canonical: &str, alias: &str) -> Result<bool> {
        let canonical = canonical.trim();
        if !self.contains_canonical(canonical) {
            return Err(StoreError::UnknownCanonical(canonical.to_string()));
        }

        let alias = alias.trim();
        let key = match_key(alias);
        if key.is_empty() {
            return Err(StoreError::InvalidName(alias.to_string()));
        }

        if let Some(existing) = self.index.get(&key) {
            if existing == canonical {
                return Ok(false);
            }
            return Err(StoreError::DuplicateAlias {
                alias: alias.to_string(),
                existing: existing.clone(),
            });
        }

        self.aliases
            .entry(canonical.to_string())
            .or_default()
            .insert(alias.to_string());
        self.index.insert(key, canonical.to_string());
        debug!("Added alias {:?} -> {:?}", alias, canonical);
        Ok(true)
    }

    /// Remove an alias. Returns `false` if no such alias is registered;
    /// canonical names are removed with [`remove_canonical`](Self::remove_canonical).
    pub fn remove_alias(&mut self, alias: &str) -> Result<bool> {
        let key = match_key(alias);
        let Some(canonical) = self.index.get(&key).cloned() else {
            return Ok(false);
        };

        let Some(set) = self.aliases.get_mut(&canonical) else {
            return Ok(false);
        };
        let Some(stored) = set.iter().find(|a| match_key(a) == key).cloned() else {
            return Ok(false);
        };

        set.remove(&stored);
        if set.is_empty() {
            self.aliases.remove(&canonical);
        }
        self.index.remove(&key);
        debug!("Removed alias {:?} from {:?}", stored, canonical);
        Ok(true)
    }

    /// Remove a canonical name together with all of its aliases.
    /// Returns the removed aliases.
    pub fn remove_canonical(&mut self, name: &str) -> Result<Vec<String>> {
        let name = name.trim();
        let pos = self
            .canonicals
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| StoreError::UnknownCanonical(name.to_string()))?;

        self.canonicals.remove(pos);
        self.index.remove(&match_key(name));

        let removed: Vec<String> = self
            .aliases
            .remove(name)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        for alias in &removed {
            self.index.remove(&match_key(alias));
        }

        debug!("Removed canonical {:?} and {} aliases", name, removed.len());
        Ok(removed)
    }

    /// Load a store from JSON. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Alias store {} not found, starting empty", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let corrupt = |reason: String| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let file: StoreFile = serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        let store = Self::from_file(file).map_err(|e| corrupt(e.to_string()))?;

        info!(
            "Loaded {} canonical names and {} aliases from {}",
            store.canonicals.len(),
            store.index.len() - store.canonicals.len(),
            path.display()
        );
        Ok(store)
    }

    /// Persist the store as JSON, replacing the file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(&self.to_file())?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

        debug!("Saved alias store to {}", path.display());
        Ok(())
    }

    fn from_file(file: StoreFile) -> Result<Self> {
        let mut store = Self::new();

        for name in &file.canonical_names {
            store.add_canonical(name)?;
        }

        for (canonical, aliases) in &file.aliases {
            // Alias groups may name canonicals missing from the list.
            store.add_canonical(canonical)?;
            for alias in aliases {
                store.add_alias(canonical, alias)?;
            }
        }

        Ok(store)
    }

    fn to_file(&self) -> StoreFile {
        StoreFile {
            canonical_names: self.canonicals.clone(),
            aliases: self
                .aliases
                .iter()
                .map(|(canonical, set)| (canonical.clone(), set.iter().cloned().collect()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> AliasStore {
        let mut store = AliasStore::new();
        store.add_canonical("HYDRO-QUÉBEC").unwrap();
        store.add_alias("HYDRO-QUÉBEC", "HYDRO QUEBEC").unwrap();
        store.add_alias("HYDRO-QUÉBEC", "Hydro Qc").unwrap();
        store.add_canonical("SCOTIABANK").unwrap();
        store.add_alias("SCOTIABANK", "Scotia").unwrap();
        store
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut store = sample();
        assert!(!store.add_canonical("SCOTIABANK").unwrap());
        assert!(!store.add_alias("SCOTIABANK", "  scotia ").unwrap());
        assert_eq!(store.aliases_of("SCOTIABANK").count(), 1);
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let mut store = sample();
        let err = store.add_alias("SCOTIABANK", "hydro quebec").unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateAlias { ref existing, .. } if existing == "HYDRO-QUÉBEC"
        ));

        // An alias may not shadow another canonical either.
        assert!(store.add_alias("SCOTIABANK", "Hydro-Québec").is_err());
        assert!(store.add_canonical("scotia").is_err());
    }

    #[test]
    fn test_unknown_canonical() {
        let mut store = sample();
        assert!(matches!(
            store.add_alias("BELL", "Bell Canada"),
            Err(StoreError::UnknownCanonical(_))
        ));
        assert!(matches!(
            store.remove_canonical("BELL"),
            Err(StoreError::UnknownCanonical(_))
        ));
    }

    #[test]
    fn test_blank_names_rejected() {
        let mut store = sample();
        assert!(matches!(store.add_canonical("  "), Err(StoreError::InvalidName(_))));
        assert!(matches!(
            store.add_alias("SCOTIABANK", ""),
            Err(StoreError::InvalidName(_))
        ));
    }

    #[test]
    fn test_remove_alias() {
        let mut store = sample();
        assert!(store.remove_alias("HYDRO qc").unwrap());
        assert!(!store.remove_alias("HYDRO qc").unwrap());
        assert_eq!(store.lookup("hydro qc"), None);
        // Canonical names are not aliases.
        assert!(!store.remove_alias("SCOTIABANK").unwrap());
    }

    #[test]
    fn test_remove_canonical_cascades() {
        let mut store = sample();
        let removed = store.remove_canonical("HYDRO-QUÉBEC").unwrap();
        assert_eq!(removed, vec!["HYDRO QUEBEC".to_string(), "Hydro Qc".to_string()]);
        assert_eq!(store.lookup("HYDRO QUEBEC"), None);
        assert_eq!(store.canonical_names(), &["SCOTIABANK".to_string()]);

        // The freed alias can now be registered elsewhere.
        assert!(store.add_alias("SCOTIABANK", "HYDRO QUEBEC").unwrap());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("aliases.json");

        let store = sample();
        store.save(&path).unwrap();
        let loaded = AliasStore::load(&path).unwrap();

        assert_eq!(loaded, store);
        assert_eq!(loaded.lookup("scotia"), Some("SCOTIABANK"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AliasStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(AliasStore::load(&path), Err(StoreError::Corrupt { .. })));

        // Same alias under two canonicals violates the store invariant.
        std::fs::write(
            &path,
            r#"{"canonical_names":["A","B"],"aliases":{"A":["x"],"B":["X"]}}"#,
        )
        .unwrap();
        assert!(matches!(AliasStore::load(&path), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_alias_groups_register_missing_canonicals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        std::fs::write(&path, r#"{"aliases":{"BELL":["Bell Canada"]}}"#).unwrap();

        let store = AliasStore::load(&path).unwrap();
        assert_eq!(store.lookup("bell canada"), Some("BELL"));
        assert!(store.contains_canonical("BELL"));
    }
}
