//! String keys and similarity scoring for business-name matching.

/// Comparison key: trimmed, whitespace-collapsed, lower-cased.
pub fn match_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Alphanumeric words of a key, used for whole-word containment.
pub fn key_words(key: &str) -> Vec<&str> {
    key.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whether `needle` occurs in `haystack` as a contiguous run of whole words.
pub fn contains_words(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Normalized similarity in [0, 1]: `1 - distance / longer length`,
/// with Levenshtein distance counted over chars.
pub fn similarity(a: &str, b: &str) -> f32 {
    strsim::normalized_levenshtein(a, b) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_key() {
        assert_eq!(match_key("  Hydro   Québec "), "hydro québec");
    }

    #[test]
    fn test_similarity_counts_chars() {
        assert!((similarity("québec", "quebec") - 5.0 / 6.0).abs() < 1e-6);
        assert!((similarity("kitten", "sitting") - 4.0 / 7.0).abs() < 1e-6);
        assert_eq!(similarity("same", "same"), 1.0);
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert!((similarity("scotiabank", "scotiabnk") - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_contains_words() {
        let hay = key_words("hydro quebec montreal");
        assert!(contains_words(&hay, &key_words("hydro quebec")));
        assert!(!contains_words(&hay, &key_words("hydro montreal")));
        assert!(!contains_words(&key_words("hydroquebec"), &key_words("hydro")));
    }
}
