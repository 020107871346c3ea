//! Resolve noisy business-name fragments to canonical names.

use serde::Serialize;
use tracing::debug;

use super::similarity::{contains_words, key_words, match_key, similarity};
use super::store::AliasStore;
use crate::models::record::FieldResult;

/// Confidence of an exact alias or canonical match.
pub const EXACT_CONFIDENCE: f32 = 1.0;

/// Confidence of a whole-word containment match.
pub const CONTAINMENT_CONFIDENCE: f32 = 0.9;

/// Shortest candidate key allowed to match by being contained in a stored name.
const MIN_CONTAINED_LEN: usize = 3;

/// How a candidate matched the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Containment,
    Fuzzy,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::Containment => "containment",
            MatchKind::Fuzzy => "fuzzy",
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasMatch {
    /// Canonical name the candidate resolved to.
    pub canonical: String,
    /// Match key of the stored alias or canonical that matched.
    pub matched: String,
    pub kind: MatchKind,
    pub confidence: f32,
}

/// Resolve `candidate` against the store.
///
/// `threshold` is the minimum similarity for a fuzzy match; it is passed
/// per call so callers with different strictness never interfere.
pub fn resolve(candidate: &str, store: &AliasStore, threshold: f32) -> FieldResult<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return FieldResult::absent();
    }

    match resolve_detailed(trimmed, store, threshold) {
        Some(m) => FieldResult::present(m.canonical, m.confidence, m.matched),
        None => FieldResult::absent_with_evidence(trimmed),
    }
}

/// Resolve and report which stored name matched and how.
pub fn resolve_detailed(candidate: &str, store: &AliasStore, threshold: f32) -> Option<AliasMatch> {
    let key = match_key(candidate);
    if key.is_empty() {
        return None;
    }

    let found = exact(&key, store)
        .or_else(|| containment(&key, store))
        .or_else(|| fuzzy(&key, store, threshold));

    match &found {
        Some(m) => debug!(
            "Resolved {:?} -> {:?} ({} match on {:?}, {:.2})",
            candidate,
            m.canonical,
            m.kind.as_str(),
            m.matched,
            m.confidence
        ),
        None => debug!("No alias match for {:?}", candidate),
    }

    found
}

fn exact(key: &str, store: &AliasStore) -> Option<AliasMatch> {
    store.lookup(key).map(|canonical| AliasMatch {
        canonical: canonical.to_string(),
        matched: key.to_string(),
        kind: MatchKind::Exact,
        confidence: EXACT_CONFIDENCE,
    })
}

fn containment(key: &str, store: &AliasStore) -> Option<AliasMatch> {
    let words = key_words(key);
    let candidate_len = key.chars().count();

    store
        .known_names()
        .filter(|known| {
            let known_words = key_words(known.key);
            contains_words(&words, &known_words)
                || (candidate_len >= MIN_CONTAINED_LEN && contains_words(&known_words, &words))
        })
        // Longest matched key, then the smaller canonical.
        .max_by(|a, b| {
            a.key
                .chars()
                .count()
                .cmp(&b.key.chars().count())
                .then_with(|| b.canonical.cmp(a.canonical))
        })
        .map(|known| AliasMatch {
            canonical: known.canonical.to_string(),
            matched: known.key.to_string(),
            kind: MatchKind::Containment,
            confidence: CONTAINMENT_CONFIDENCE,
        })
}

fn fuzzy(key: &str, store: &AliasStore, threshold: f32) -> Option<AliasMatch> {
    let mut best: Option<(f32, usize, &str, &str)> = None;

    for known in store.known_names() {
        let score = similarity(key, known.key);
        if score < threshold {
            continue;
        }
        let len = known.key.chars().count();

        let better = match best {
            None => true,
            Some((best_score, best_len, _, best_canonical)) => {
                score > best_score
                    || (score == best_score && len > best_len)
                    || (score == best_score && len == best_len && known.canonical < best_canonical)
            }
        };
        if better {
            best = Some((score, len, known.key, known.canonical));
        }
    }

    best.map(|(score, _, matched, canonical)| AliasMatch {
        canonical: canonical.to_string(),
        matched: matched.to_string(),
        kind: MatchKind::Fuzzy,
        confidence: score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> AliasStore {
        let mut store = AliasStore::new();
        store.add_canonical("HYDRO-QUÉBEC").unwrap();
        store.add_alias("HYDRO-QUÉBEC", "HYDRO QUEBEC").unwrap();
        store.add_canonical("SCOTIABANK").unwrap();
        store.add_alias("SCOTIABANK", "Scotia").unwrap();
        store.add_alias("SCOTIABANK", "Bank of Nova Scotia").unwrap();
        store.add_canonical("BELL").unwrap();
        store.add_alias("BELL", "Bell Canada").unwrap();
        store
    }

    #[test]
    fn test_every_alias_resolves_exactly() {
        let store = store();
        for canonical in store.canonical_names() {
            let aliases: Vec<&str> = store.aliases_of(canonical).collect();
            for alias in aliases.into_iter().chain([canonical.as_str()]) {
                let result = resolve(alias, &store, 0.8);
                assert_eq!(result.value(), Some(canonical), "alias {:?}", alias);
                assert_eq!(result.confidence(), 1.0);
            }
        }
    }

    #[test]
    fn test_case_and_whitespace_symmetry() {
        let store = store();
        assert_eq!(resolve(" scotia ", &store, 0.8), resolve("SCOTIA", &store, 0.8));
        assert_eq!(
            resolve("hydro   quebec", &store, 0.8),
            resolve("Hydro Quebec", &store, 0.8)
        );
    }

    #[test]
    fn test_containment() {
        let store = store();

        // Candidate contains a known name.
        let m = resolve_detailed("HYDRO QUEBEC MONTREAL QC", &store, 0.8).unwrap();
        assert_eq!(m.canonical, "HYDRO-QUÉBEC");
        assert_eq!(m.kind, MatchKind::Containment);
        assert_eq!(m.confidence, 0.9);

        // Candidate contained in a known name.
        let m = resolve_detailed("Nova Scotia", &store, 0.8).unwrap();
        assert_eq!(m.canonical, "SCOTIABANK");
        assert_eq!(m.matched, "bank of nova scotia");

        // Whole words only.
        assert!(resolve_detailed("Bellevue Dental", &store, 0.8).is_none());
    }

    #[test]
    fn test_containment_prefers_longest_key() {
        let store = store();
        // Both "bell" and "bell canada" occur; the longer key wins.
        let m = resolve_detailed("Bell Canada Inc", &store, 0.8).unwrap();
        assert_eq!(m.matched, "bell canada");
    }

    #[test]
    fn test_fuzzy() {
        let store = store();
        let m = resolve_detailed("SCOTIABNK", &store, 0.8).unwrap();
        assert_eq!(m.canonical, "SCOTIABANK");
        assert_eq!(m.kind, MatchKind::Fuzzy);
        assert!((m.confidence - 0.9).abs() < 1e-6);

        // A stricter threshold rejects it.
        assert!(resolve_detailed("SCOTIABNK", &store, 0.95).is_none());
    }

    #[test]
    fn test_fuzzy_tie_prefers_smaller_canonical() {
        let mut store = AliasStore::new();
        store.add_canonical("ZETA").unwrap();
        store.add_alias("ZETA", "abcd").unwrap();
        store.add_canonical("ALPHA").unwrap();
        store.add_alias("ALPHA", "abce").unwrap();

        let m = resolve_detailed("abcf", &store, 0.7).unwrap();
        assert_eq!(m.canonical, "ALPHA");
    }

    #[test]
    fn test_fuzzy_tie_prefers_longer_key() {
        let mut store = AliasStore::new();
        store.add_canonical("AAA").unwrap();
        store.add_alias("AAA", "abcdxy").unwrap();
        store.add_canonical("ZZZ").unwrap();
        store.add_alias("ZZZ", "abcdefghi").unwrap();

        // 1 - 2/6 and 1 - 3/9: equal scores, the longer key wins over the
        // smaller canonical.
        let m = resolve_detailed("abcdef", &store, 0.6).unwrap();
        assert_eq!(m.kind, MatchKind::Fuzzy);
        assert_eq!(m.matched, "abcdefghi");
        assert_eq!(m.canonical, "ZZZ");
    }

    #[test]
    fn test_fuzzy_case_and_whitespace_symmetry() {
        let store = store();
        let spaced = resolve(" scotiabnk ", &store, 0.8);
        assert!(spaced.is_present());
        assert_eq!(spaced, resolve("SCOTIABNK", &store, 0.8));
        assert_eq!(spaced.value().map(String::as_str), Some("SCOTIABANK"));
    }

    #[test]
    fn test_no_match_keeps_candidate() {
        let store = store();
        let result = resolve("  Totally Unknown Co  ", &store, 0.8);
        assert!(result.is_absent());
        assert_eq!(result.confidence(), 0.0);
        assert_eq!(result.evidence(), Some("Totally Unknown Co"));
    }

    #[test]
    fn test_blank_candidate() {
        let store = store();
        assert_eq!(resolve("   ", &store, 0.8), FieldResult::absent());
    }

    #[test]
    fn test_resolve_does_not_mutate() {
        let store = store();
        let before = store.clone();
        let _ = resolve("SCOTIABNK", &store, 0.5);
        assert_eq!(store, before);
    }
}
