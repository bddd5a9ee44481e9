//! Text normalization and edit-distance similarity.

/// Case-folds, strips punctuation and symbols, and collapses whitespace runs
/// to a single space.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    collapse_whitespace(&folded)
}

/// Normalizes `expected` and `actual` for comparison.
///
/// Text made only of punctuation or symbols (`%`, `...`) normalizes to
/// nothing, so such an expectation keeps its symbols and both sides are
/// only whitespace-collapsed.
pub fn normalize_pair(expected: &str, actual: &str) -> (String, String) {
    let normalized = normalize(expected);
    if normalized.is_empty() && !expected.trim().is_empty() {
        return (collapse_whitespace(expected), collapse_whitespace(actual));
    }
    (normalized, normalize(actual))
}

/// Trims and collapses whitespace runs, leaving case and punctuation alone.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized similarity ratio `1 - distance / max(len)` in [0, 1].
///
/// Two empty strings are identical (1.0).
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [&str; 8] = [
        "",
        "Welcome",
        "welcome",
        "Welcorne",
        "Einstellungen speichern",
        "設定を保存",
        "Save   settings!",
        "a",
    ];

    #[test]
    fn test_levenshtein_known_values() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("設定", "設置"), 1);
    }

    #[test]
    fn test_similarity_identity() {
        for s in SAMPLES {
            assert_eq!(similarity(s, s), 1.0, "{:?}", s);
        }
    }

    #[test]
    fn test_similarity_symmetric_and_bounded() {
        for a in SAMPLES {
            for b in SAMPLES {
                let ab = similarity(a, b);
                assert_eq!(ab, similarity(b, a), "{:?} / {:?}", a, b);
                assert!((0.0..=1.0).contains(&ab));
            }
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Save   Settings! "), "save settings");
        assert_eq!(normalize("Don't\tstop"), "dont stop");
        assert_eq!(normalize("...."), "");
        assert_eq!(collapse_whitespace(" A \n B "), "A B");
    }

    #[test]
    fn test_symbol_only_text_keeps_symbols() {
        assert_eq!(normalize_pair("%", " $ "), ("%".to_string(), "$".to_string()));
        assert_eq!(
            normalize_pair("...", "Loading..."),
            ("...".to_string(), "Loading...".to_string())
        );
        assert_eq!(
            normalize_pair("Save!", "SAVE"),
            ("save".to_string(), "save".to_string())
        );
    }
}
