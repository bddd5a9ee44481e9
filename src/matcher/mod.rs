//! String matching: decides whether extracted text satisfies an expected string.
//!
//! Strategies are selected by name through [`STRATEGIES`], so adding one
//! means writing a [`StringMatcher`] and registering its constructor.

pub mod similarity;
pub mod strategies;

use anyhow::{bail, Result};
use log::warn;

use crate::config::MatcherConfig;
use crate::model::MatchOutcome;

pub use similarity::{normalize, similarity};
pub use strategies::{
    CompositeMatcher, ContainsMatcher, ExactMatcher, ExpectEmptyMatcher, FuzzyMatcher,
    NormalizedMatcher, RegexMatcher,
};

/// A comparison strategy. Implementations are pure and total: any pair of
/// strings yields an outcome.
pub trait StringMatcher: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, expected: &str, actual: &str) -> MatchOutcome;
}

type Constructor = fn(&MatcherConfig) -> Box<dyn StringMatcher>;

/// Registered strategies by name.
pub const STRATEGIES: &[(&str, Constructor)] = &[
    ("exact", build_exact),
    ("normalized", build_normalized),
    ("fuzzy", build_fuzzy),
    ("contains", build_contains),
    ("regex", build_regex),
    ("expect-empty", build_expect_empty),
    ("composite", build_composite),
];

fn build_exact(_: &MatcherConfig) -> Box<dyn StringMatcher> {
    Box::new(ExactMatcher)
}

fn build_normalized(_: &MatcherConfig) -> Box<dyn StringMatcher> {
    Box::new(NormalizedMatcher)
}

fn build_fuzzy(config: &MatcherConfig) -> Box<dyn StringMatcher> {
    Box::new(FuzzyMatcher::new(
        config.fuzzy_threshold,
        config.case_sensitive_fuzzy,
    ))
}

fn build_contains(_: &MatcherConfig) -> Box<dyn StringMatcher> {
    Box::new(ContainsMatcher)
}

fn build_regex(_: &MatcherConfig) -> Box<dyn StringMatcher> {
    Box::new(RegexMatcher)
}

fn build_expect_empty(_: &MatcherConfig) -> Box<dyn StringMatcher> {
    Box::new(ExpectEmptyMatcher)
}

pub fn strategy_names() -> impl Iterator<Item = &'static str> {
    STRATEGIES.iter().map(|(name, _)| *name)
}

/// Creates the strategy registered as `name`.
pub fn create(name: &str, config: &MatcherConfig) -> Result<Box<dyn StringMatcher>> {
    let key = name.trim().to_ascii_lowercase();
    match STRATEGIES.iter().find(|(n, _)| *n == key) {
        Some((_, constructor)) => Ok(constructor(config)),
        None => bail!(
            "Unknown matcher strategy {:?} (available: {})",
            name,
            strategy_names().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Creates the strategy selected in the config.
pub fn from_config(config: &MatcherConfig) -> Result<Box<dyn StringMatcher>> {
    for name in &config.composite {
        if !name.trim().eq_ignore_ascii_case("composite") {
            create(name, config)?;
        }
    }
    create(&config.strategy, config)
}

fn build_composite(config: &MatcherConfig) -> Box<dyn StringMatcher> {
    let mut strategies = Vec::new();
    for name in &config.composite {
        if name.trim().eq_ignore_ascii_case("composite") {
            warn!("Ignoring nested composite strategy");
            continue;
        }
        match create(name, config) {
            Ok(s) => strategies.push(s),
            Err(e) => warn!("{}", e),
        }
    }
    Box::new(CompositeMatcher::new(strategies))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_registered_name_constructs() {
        let config = MatcherConfig::default();
        for name in strategy_names() {
            assert_eq!(create(name, &config).unwrap().name(), name);
        }
    }

    #[test]
    fn test_unknown_strategy() {
        let err = create("phonetic", &MatcherConfig::default()).err().unwrap();
        assert!(err.to_string().contains("phonetic"));
    }

    #[test]
    fn test_from_config_rejects_unknown_sub_strategy() {
        let config = MatcherConfig {
            composite: vec!["exact".into(), "soundex".into()],
            ..MatcherConfig::default()
        };
        assert!(from_config(&config).is_err());
    }

    #[test]
    fn test_threshold_comes_from_config() {
        let strict = MatcherConfig {
            strategy: "fuzzy".into(),
            fuzzy_threshold: 1.0,
            ..MatcherConfig::default()
        };
        let loose = MatcherConfig {
            fuzzy_threshold: 0.5,
            ..strict.clone()
        };
        assert!(!from_config(&strict).unwrap().evaluate("Welcome", "Welcom").passed);
        assert!(from_config(&loose).unwrap().evaluate("Welcome", "Welcom").passed);
    }
}
