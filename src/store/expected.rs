//! Localized expected strings: one `<locale>.json` object per locale.

use log::{debug, info, warn};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LoadError;

/// String id → text for one locale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringTable {
    entries: HashMap<String, String>,
}

impl StringTable {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        serde_json::from_str(content).map_err(|e| LoadError::json(path, e))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StringTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<'de> Deserialize<'de> for StringTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor)
    }
}

struct TableVisitor;

impl<'de> Visitor<'de> for TableVisitor {
    type Value = StringTable;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping string ids to text")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<StringTable, A::Error> {
        let mut entries = HashMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            let value: serde_json::Value = map.next_value()?;
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => {
                    return Err(de::Error::custom(format!("null value for {:?}", key)));
                }
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(de::Error::custom(format!(
                        "value for {:?} must be a string",
                        key
                    )));
                }
            };
            if entries.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key {:?}", key)));
            }
            entries.insert(key, text);
        }
        Ok(StringTable { entries })
    }
}

/// Expected texts for the source locale and the active locale.
#[derive(Debug, Clone)]
pub struct ExpectedStringStore {
    source_locale: String,
    tables: HashMap<String, StringTable>,
}

impl ExpectedStringStore {
    /// Loads `<dir>/<source_locale>.json` and `<dir>/<active_locale>.json`.
    ///
    /// Both files are mandatory. Ids present in the source locale but missing
    /// from the active one are logged; lookups for them produce ERROR records.
    pub fn load(dir: &Path, source_locale: &str, active_locale: &str) -> Result<Self, LoadError> {
        let active_path = locale_file(dir, active_locale);
        if !active_path.exists() {
            return Err(LoadError::LocaleNotFound {
                locale: active_locale.to_string(),
                path: active_path,
            });
        }
        let source_path = locale_file(dir, source_locale);
        if !source_path.exists() {
            return Err(LoadError::SourceLocaleMissing {
                locale: source_locale.to_string(),
                path: source_path,
            });
        }

        let mut tables = HashMap::new();
        let source = StringTable::read(&source_path)?;
        info!(
            "Loaded {} expected strings for {} from {}",
            source.len(),
            source_locale,
            source_path.display()
        );
        tables.insert(source_locale.to_string(), source);

        if active_locale != source_locale {
            let active = StringTable::read(&active_path)?;
            info!(
                "Loaded {} expected strings for {} from {}",
                active.len(),
                active_locale,
                active_path.display()
            );
            tables.insert(active_locale.to_string(), active);
        }

        let store = Self {
            source_locale: source_locale.to_string(),
            tables,
        };
        store.report_untranslated(active_locale);
        Ok(store)
    }

    /// Builds a store from in-memory tables. The source locale must be present.
    pub fn from_tables(source_locale: &str, tables: HashMap<String, StringTable>) -> Option<Self> {
        tables.contains_key(source_locale).then(|| Self {
            source_locale: source_locale.to_string(),
            tables,
        })
    }

    pub fn get(&self, locale: &str, id: &str) -> Option<&str> {
        self.tables.get(locale).and_then(|t| t.get(id))
    }

    pub fn table(&self, locale: &str) -> Option<&StringTable> {
        self.tables.get(locale)
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.tables.contains_key(locale)
    }

    pub fn source_locale(&self) -> &str {
        &self.source_locale
    }

    /// Source-locale ids without a text in `locale`, sorted.
    pub fn untranslated(&self, locale: &str) -> Vec<&str> {
        let (Some(source), Some(target)) = (self.tables.get(&self.source_locale), self.tables.get(locale)) else {
            return Vec::new();
        };
        let mut missing: Vec<&str> = source.ids().filter(|id| !target.contains(id)).collect();
        missing.sort_unstable();
        missing
    }

    fn report_untranslated(&self, locale: &str) {
        let missing = self.untranslated(locale);
        if missing.is_empty() {
            return;
        }
        warn!(
            "{} of {} source strings have no {} translation",
            missing.len(),
            self.tables.get(&self.source_locale).map_or(0, StringTable::len),
            locale
        );
        for id in missing {
            debug!("Untranslated in {}: {}", locale, id);
        }
    }
}

fn locale_file(dir: &Path, locale: &str) -> PathBuf {
    dir.join(format!("{}.json", locale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, locale: &str, content: &str) {
        fs::write(dir.join(format!("{}.json", locale)), content).unwrap();
    }

    #[test]
    fn test_load_source_and_active() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en-US", r#"{"WELCOME_TITLE": "Welcome", "COUNT": 3}"#);
        write(dir.path(), "de-DE", r#"{"WELCOME_TITLE": "Willkommen"}"#);

        let store = ExpectedStringStore::load(dir.path(), "en-US", "de-DE").unwrap();
        assert_eq!(store.get("de-DE", "WELCOME_TITLE"), Some("Willkommen"));
        assert_eq!(store.get("en-US", "COUNT"), Some("3"));
        assert_eq!(store.get("de-DE", "COUNT"), None);
        assert_eq!(store.untranslated("de-DE"), vec!["COUNT"]);
    }

    #[test]
    fn test_missing_active_locale_is_fatal() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en-US", r#"{"A": "a"}"#);
        assert!(matches!(
            ExpectedStringStore::load(dir.path(), "en-US", "fr-FR"),
            Err(LoadError::LocaleNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_source_locale_is_fatal() {
        let dir = tempdir().unwrap();
        write(dir.path(), "fr-FR", r#"{"A": "a"}"#);
        assert!(matches!(
            ExpectedStringStore::load(dir.path(), "en-US", "fr-FR"),
            Err(LoadError::SourceLocaleMissing { .. })
        ));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en-US", r#"{"A": "a", "A": "b"}"#);
        match ExpectedStringStore::load(dir.path(), "en-US", "en-US") {
            Err(LoadError::InvalidJson { message, .. }) => assert!(message.contains("duplicate")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_null_and_nested_values_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en-US", r#"{"A": null}"#);
        assert!(ExpectedStringStore::load(dir.path(), "en-US", "en-US").is_err());

        write(dir.path(), "en-US", r#"{"A": ["x"]}"#);
        assert!(ExpectedStringStore::load(dir.path(), "en-US", "en-US").is_err());
    }

    #[test]
    fn test_empty_text_is_kept() {
        let dir = tempdir().unwrap();
        write(dir.path(), "en-US", r#"{"BLANK": ""}"#);
        let store = ExpectedStringStore::load(dir.path(), "en-US", "en-US").unwrap();
        assert_eq!(store.get("en-US", "BLANK"), Some(""));
    }
}
