//! Test protocol: the ordered list of (step, screen, string) rows.

use log::info;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use super::csv::CsvTable;
use super::is_json;
use crate::error::LoadError;
use crate::model::{ProtocolRow, TestStep};

const STEP_COLUMN: &str = "StepID";
const SCREEN_COLUMN: &str = "ScreenID";
const STRING_COLUMN: &str = "ExpectedStringID";

/// Rows of a protocol in file order.
///
/// Rows sharing a (step, screen) pair are also grouped into one [`TestStep`]
/// at the position of their first appearance. Grouping never changes the
/// order in which [`rows`](Self::rows) are validated.
#[derive(Debug, Clone)]
pub struct ProtocolStore {
    rows: Vec<ProtocolRow>,
    steps: Vec<TestStep>,
}

#[derive(Deserialize)]
struct JsonRow {
    step_id: serde_json::Value,
    screen_id: serde_json::Value,
    expected_string_id: serde_json::Value,
}

impl ProtocolStore {
    /// Loads a protocol from CSV, or from a JSON array when the file ends in `.json`.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let rows = if is_json(path) {
            read_json_rows(path)?
        } else {
            read_csv_rows(path)?
        };
        let store = Self::from_rows(path, rows)?;

        info!(
            "Loaded {} protocol rows in {} steps from {}",
            store.rows.len(),
            store.steps.len(),
            path.display()
        );
        Ok(store)
    }

    /// Builds the store from already parsed rows, rejecting empty protocols
    /// and repeated (step, screen, string) rows.
    pub fn from_rows(path: &Path, rows: Vec<ProtocolRow>) -> Result<Self, LoadError> {
        if rows.is_empty() {
            return Err(LoadError::EmptyProtocol {
                path: path.to_path_buf(),
            });
        }

        let mut seen: HashSet<&ProtocolRow> = HashSet::new();
        for row in &rows {
            if !seen.insert(row) {
                return Err(LoadError::DuplicateKey {
                    path: path.to_path_buf(),
                    key: format!(
                        "{}/{}/{}",
                        row.step_id, row.screen_id, row.expected_string_id
                    ),
                });
            }
        }

        let mut order: Vec<(String, String)> = Vec::new();
        let mut grouped: HashMap<(String, String), Vec<String>> = HashMap::new();
        for row in &rows {
            let key = (row.step_id.clone(), row.screen_id.clone());
            let ids = grouped.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            ids.push(row.expected_string_id.clone());
        }

        let steps = order
            .into_iter()
            .filter_map(|key| {
                let ids = grouped.remove(&key)?;
                Some(TestStep::new(key.0, key.1, ids))
            })
            .collect();

        Ok(Self { rows, steps })
    }

    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    /// Every (step, screen, string) row in file order.
    pub fn rows(&self) -> impl Iterator<Item = ProtocolRow> + '_ {
        self.rows.iter().cloned()
    }

    /// Number of protocol rows, which is also the number of records a run produces.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Looks up a step by its step and screen identifiers.
    pub fn get(&self, step_id: &str, screen_id: &str) -> Option<&TestStep> {
        self.steps
            .iter()
            .find(|s| s.step_id() == step_id && s.screen_id() == screen_id)
    }
}

fn read_csv_rows(path: &Path) -> Result<Vec<ProtocolRow>, LoadError> {
    let table = CsvTable::read(path)?;
    let cols = table.require_columns(&[STEP_COLUMN, SCREEN_COLUMN, STRING_COLUMN])?;
    let names = [STEP_COLUMN, SCREEN_COLUMN, STRING_COLUMN];

    let mut rows = Vec::with_capacity(table.records.len());
    for record in &table.records {
        let mut values = [String::new(), String::new(), String::new()];
        for (i, &col) in cols.iter().enumerate() {
            let value = record.get(col);
            if value.is_empty() {
                return Err(LoadError::MissingField {
                    path: path.to_path_buf(),
                    row: record.line,
                    field: names[i].to_string(),
                });
            }
            values[i] = value.to_string();
        }
        let [step_id, screen_id, expected_string_id] = values;
        rows.push(ProtocolRow {
            step_id,
            screen_id,
            expected_string_id,
        });
    }
    Ok(rows)
}

fn read_json_rows(path: &Path) -> Result<Vec<ProtocolRow>, LoadError> {
    let content = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let parsed: Vec<JsonRow> = serde_json::from_str(&content).map_err(|e| LoadError::json(path, e))?;

    parsed
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| -> Result<ProtocolRow, LoadError> {
            let field = |name: &str, value: serde_json::Value| -> Result<String, LoadError> {
                json_scalar(&value)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| LoadError::MissingField {
                        path: path.to_path_buf(),
                        row: idx + 1,
                        field: name.to_string(),
                    })
            };
            Ok(ProtocolRow {
                step_id: field("step_id", raw.step_id)?,
                screen_id: field("screen_id", raw.screen_id)?,
                expected_string_id: field("expected_string_id", raw.expected_string_id)?,
            })
        })
        .collect()
}

/// Renders a JSON string or number as trimmed text. Ids like `1` are common
/// in hand-written protocol files.
pub(crate) fn json_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
