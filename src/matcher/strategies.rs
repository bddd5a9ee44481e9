//! Built-in matcher strategies.

use log::warn;
use regex::RegexBuilder;

use super::similarity::{collapse_whitespace, normalize_pair, similarity};
use super::StringMatcher;
use crate::model::MatchOutcome;

const REGEX_SIZE_LIMIT: usize = 1 << 20;

fn outcome(strategy: &str, passed: bool, score: Option<f64>) -> MatchOutcome {
    MatchOutcome {
        passed,
        strategy: strategy.to_string(),
        score,
    }
}

/// Extracted text with nothing but whitespace never satisfies a
/// text-expecting strategy.
fn is_blank(actual: &str) -> bool {
    actual.trim().is_empty()
}

/// Case-sensitive literal equality.
pub struct ExactMatcher;

impl StringMatcher for ExactMatcher {
    fn name(&self) -> &str {
        "exact"
    }

    fn evaluate(&self, expected: &str, actual: &str) -> MatchOutcome {
        let passed = !is_blank(actual) && expected == actual;
        outcome(self.name(), passed, None)
    }
}

/// Equality after case folding, punctuation stripping and whitespace collapsing.
/// Expectations made only of symbols are compared with their symbols kept.
pub struct NormalizedMatcher;

impl StringMatcher for NormalizedMatcher {
    fn name(&self) -> &str {
        "normalized"
    }

    fn evaluate(&self, expected: &str, actual: &str) -> MatchOutcome {
        let (expected, actual_text) = normalize_pair(expected, actual);
        let passed = !is_blank(actual) && expected == actual_text;
        outcome(self.name(), passed, None)
    }
}

/// Passes when the edit-distance similarity reaches `threshold`.
pub struct FuzzyMatcher {
    threshold: f64,
    case_sensitive: bool,
}

impl FuzzyMatcher {
    pub fn new(threshold: f64, case_sensitive: bool) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            case_sensitive,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn score(&self, expected: &str, actual: &str) -> f64 {
        if self.case_sensitive {
            similarity(&collapse_whitespace(expected), &collapse_whitespace(actual))
        } else {
            let (expected, actual) = normalize_pair(expected, actual);
            similarity(&expected, &actual)
        }
    }
}

impl StringMatcher for FuzzyMatcher {
    fn name(&self) -> &str {
        "fuzzy"
    }

    fn evaluate(&self, expected: &str, actual: &str) -> MatchOutcome {
        let score = self.score(expected, actual);
        let passed = !is_blank(actual) && score >= self.threshold;
        outcome(self.name(), passed, Some(score))
    }
}

/// Passes when the normalized expected text occurs inside the normalized actual text.
pub struct ContainsMatcher;

impl StringMatcher for ContainsMatcher {
    fn name(&self) -> &str {
        "contains"
    }

    fn evaluate(&self, expected: &str, actual: &str) -> MatchOutcome {
        let (expected, actual_text) = normalize_pair(expected, actual);
        let passed = !is_blank(actual) && actual_text.contains(&expected);
        outcome(self.name(), passed, None)
    }
}

/// Treats the expected text as a pattern searched for in the actual text.
///
/// A pattern that does not compile falls back to exact comparison.
pub struct RegexMatcher;

impl StringMatcher for RegexMatcher {
    fn name(&self) -> &str {
        "regex"
    }

    fn evaluate(&self, expected: &str, actual: &str) -> MatchOutcome {
        if is_blank(actual) {
            return outcome(self.name(), false, None);
        }
        match RegexBuilder::new(expected)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
        {
            Ok(re) => outcome(self.name(), re.is_match(actual.trim()), None),
            Err(e) => {
                warn!(
                    "Invalid pattern {:?} ({}); comparing literally",
                    expected, e
                );
                outcome(self.name(), expected == actual, None)
            }
        }
    }
}

/// Passes only when nothing but whitespace was extracted.
///
/// Used for regions that must stay empty, e.g. a cleared input field.
pub struct ExpectEmptyMatcher;

impl StringMatcher for ExpectEmptyMatcher {
    fn name(&self) -> &str {
        "expect-empty"
    }

    fn evaluate(&self, _expected: &str, actual: &str) -> MatchOutcome {
        outcome(self.name(), is_blank(actual), None)
    }
}

/// Tries each sub-strategy in order and passes on the first success.
pub struct CompositeMatcher {
    strategies: Vec<Box<dyn StringMatcher>>,
}

impl CompositeMatcher {
    pub fn new(strategies: Vec<Box<dyn StringMatcher>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl StringMatcher for CompositeMatcher {
    fn name(&self) -> &str {
        "composite"
    }

    fn evaluate(&self, expected: &str, actual: &str) -> MatchOutcome {
        let mut best: Option<f64> = None;
        for strategy in &self.strategies {
            let result = strategy.evaluate(expected, actual);
            if result.passed {
                return outcome(
                    &format!("composite({})", result.strategy),
                    true,
                    result.score,
                );
            }
            best = match (best, result.score) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
        outcome(self.name(), false, best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: [(&str, &str); 5] = [
        ("Welcome", "Welcome"),
        ("Save settings", "Save settings"),
        ("設定を保存", "設定を保存"),
        ("Total: 3 items", "Total: 3 items"),
        ("a", "a"),
    ];

    fn default_composite() -> CompositeMatcher {
        CompositeMatcher::new(vec![
            Box::new(ExactMatcher),
            Box::new(NormalizedMatcher),
            Box::new(FuzzyMatcher::new(0.85, false)),
        ])
    }

    #[test]
    fn test_identical_text_passes_text_strategies() {
        let composite = default_composite();
        let strategies: [&dyn StringMatcher; 4] =
            [&ExactMatcher, &NormalizedMatcher, &ContainsMatcher, &composite];
        for (expected, actual) in PAIRS {
            for s in strategies {
                assert!(s.evaluate(expected, actual).passed, "{} on {:?}", s.name(), expected);
            }
        }
    }

    #[test]
    fn test_case_and_surrounding_whitespace() {
        let pairs = [("Welcome", "  WELCOME "), ("Save settings", "save settings\n")];
        for (expected, actual) in pairs {
            assert!(NormalizedMatcher.evaluate(expected, actual).passed);
            assert!(!ExactMatcher.evaluate(expected, actual).passed);
        }
    }

    #[test]
    fn test_blank_actual_fails_everything_but_expect_empty() {
        let composite = default_composite();
        let strategies: [&dyn StringMatcher; 6] = [
            &ExactMatcher,
            &NormalizedMatcher,
            &FuzzyMatcher::new(0.0, false),
            &ContainsMatcher,
            &RegexMatcher,
            &composite,
        ];
        for s in strategies {
            assert!(!s.evaluate("", "  ").passed, "{}", s.name());
            assert!(!s.evaluate(".*", "").passed, "{}", s.name());
        }
        assert!(ExpectEmptyMatcher.evaluate("", " \n").passed);
        assert!(!ExpectEmptyMatcher.evaluate("", "x").passed);
    }

    #[test]
    fn test_fuzzy_threshold_monotonic() {
        let inputs = [("Welcome", "Welcorne"), ("Settings", "Setings"), ("OK", "0K")];
        let thresholds = [0.0, 0.5, 0.7, 0.85, 0.9, 1.0];
        for (expected, actual) in inputs {
            let mut previously_failed = false;
            for t in thresholds {
                let passed = FuzzyMatcher::new(t, false).evaluate(expected, actual).passed;
                assert!(!(previously_failed && passed), "{} at {}", expected, t);
                previously_failed |= !passed;
            }
        }
    }

    #[test]
    fn test_fuzzy_reports_score() {
        let result = FuzzyMatcher::new(0.85, false).evaluate("Welcome", "Welcorne");
        let score = result.score.unwrap();
        assert!(score > 0.7 && score < 1.0);
        assert!(!result.passed);
        assert!(FuzzyMatcher::new(0.7, false).evaluate("Welcome", "Welcorne").passed);
    }

    #[test]
    fn test_contains() {
        assert!(ContainsMatcher.evaluate("welcome", "Welcome, Alex!").passed);
        assert!(!ContainsMatcher.evaluate("goodbye", "Welcome, Alex!").passed);
    }

    #[test]
    fn test_symbol_only_expectations_compare_symbols() {
        assert!(!NormalizedMatcher.evaluate("%", "$").passed);
        assert!(NormalizedMatcher.evaluate("%", " % ").passed);
        assert!(!ContainsMatcher.evaluate("...", "Error 500").passed);
        assert!(ContainsMatcher.evaluate("...", "Loading...").passed);

        let fuzzy = FuzzyMatcher::new(0.85, false);
        assert!(!fuzzy.evaluate("%", "$").passed);
        assert_eq!(fuzzy.score("%", "%"), 1.0);
        assert!(!default_composite().evaluate("%", "$").passed);
    }

    #[test]
    fn test_regex() {
        assert!(RegexMatcher.evaluate(r"^\d+ items?$", "12 items").passed);
        assert!(!RegexMatcher.evaluate(r"^\d+ items?$", "many items").passed);
        // Unbalanced pattern compares literally instead of panicking.
        assert!(RegexMatcher.evaluate("Price (USD", "Price (USD").passed);
        assert!(!RegexMatcher.evaluate("Price (USD", "Price USD").passed);
    }

    #[test]
    fn test_composite_reports_matching_sub_strategy() {
        let composite = default_composite();
        assert_eq!(composite.evaluate("Welcome", "Welcome").strategy, "composite(exact)");
        assert_eq!(
            composite.evaluate("Welcome", "WELCOME").strategy,
            "composite(normalized)"
        );
        assert_eq!(
            composite.evaluate("Einstellungen", "Einstelungen").strategy,
            "composite(fuzzy)"
        );

        let failed = composite.evaluate("Welcome", "Goodbye");
        assert!(!failed.passed);
        assert_eq!(failed.strategy, "composite");
        assert!(failed.score.is_some());
    }
}
