//! Coordinate table: (step, screen, string) → bounding box.

use anyhow::Context;
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use super::csv::{format_record, CsvTable};
use super::is_json;
use super::protocol::json_scalar;
use crate::error::LoadError;
use crate::model::{Coordinate, ProtocolRow};

/// CSV header of the coordinate table.
pub const CSV_HEADER: &str = "StepID,ScreenID,ExpectedStringID,Left,Top,Right,Bottom";

const COLUMNS: [&str; 7] = [
    "StepID",
    "ScreenID",
    "ExpectedStringID",
    "Left",
    "Top",
    "Right",
    "Bottom",
];

/// Lookup key of an annotated region.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    pub step_id: String,
    pub screen_id: String,
    pub string_id: String,
}

impl CoordinateKey {
    pub fn new(step_id: &str, screen_id: &str, string_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            screen_id: screen_id.to_string(),
            string_id: string_id.to_string(),
        }
    }
}

impl From<&ProtocolRow> for CoordinateKey {
    fn from(row: &ProtocolRow) -> Self {
        Self::new(&row.step_id, &row.screen_id, &row.expected_string_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoordinateStore {
    entries: HashMap<CoordinateKey, Coordinate>,
}

#[derive(Deserialize)]
struct JsonEntry {
    step_id: serde_json::Value,
    screen_id: serde_json::Value,
    expected_string_id: serde_json::Value,
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl CoordinateStore {
    /// Loads the coordinate table from CSV, or JSON when the file ends in `.json`.
    ///
    /// A missing file gives an empty store: every pair then reports
    /// "coordinate not found".
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            warn!(
                "Coordinate file {} not found; all pairs will lack coordinates",
                path.display()
            );
            return Ok(Self::default());
        }

        let entries = if is_json(path) {
            read_json_entries(path)?
        } else {
            read_csv_entries(path)?
        };
        let store = Self::from_entries(path, entries)?;

        info!(
            "Loaded {} coordinate mappings from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    /// Builds the store, rejecting repeated keys.
    pub fn from_entries(
        path: &Path,
        entries: Vec<(CoordinateKey, Coordinate)>,
    ) -> Result<Self, LoadError> {
        let mut map = HashMap::with_capacity(entries.len());
        for (key, coordinate) in entries {
            if map.contains_key(&key) {
                return Err(LoadError::DuplicateKey {
                    path: path.to_path_buf(),
                    key: format!("{}/{}/{}", key.step_id, key.screen_id, key.string_id),
                });
            }
            map.insert(key, coordinate);
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, step_id: &str, screen_id: &str, string_id: &str) -> Option<Coordinate> {
        self.entries
            .get(&CoordinateKey::new(step_id, screen_id, string_id))
            .copied()
    }

    pub fn get_row(&self, row: &ProtocolRow) -> Option<Coordinate> {
        self.entries.get(&CoordinateKey::from(row)).copied()
    }

    pub fn contains(&self, row: &ProtocolRow) -> bool {
        self.entries.contains_key(&CoordinateKey::from(row))
    }

    pub fn keys(&self) -> impl Iterator<Item = &CoordinateKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_csv_entries(path: &Path) -> Result<Vec<(CoordinateKey, Coordinate)>, LoadError> {
    let table = CsvTable::read(path)?;
    let cols = table.require_columns(&COLUMNS)?;

    let mut entries = Vec::with_capacity(table.records.len());
    for record in &table.records {
        for (i, &col) in cols.iter().enumerate() {
            if record.get(col).is_empty() {
                return Err(LoadError::MissingField {
                    path: path.to_path_buf(),
                    row: record.line,
                    field: COLUMNS[i].to_string(),
                });
            }
        }

        let mut bounds = [0i64; 4];
        for (i, bound) in bounds.iter_mut().enumerate() {
            let raw = record.get(cols[3 + i]);
            *bound = raw.parse::<i64>().map_err(|_| LoadError::InvalidValue {
                path: path.to_path_buf(),
                row: record.line,
                field: COLUMNS[3 + i].to_string(),
                value: raw.to_string(),
            })?;
        }

        let coordinate = Coordinate::from_signed(bounds[0], bounds[1], bounds[2], bounds[3])
            .map_err(|source| LoadError::InvalidCoordinate {
                path: path.to_path_buf(),
                row: record.line,
                source,
            })?;
        let key = CoordinateKey::new(record.get(cols[0]), record.get(cols[1]), record.get(cols[2]));
        entries.push((key, coordinate));
    }
    Ok(entries)
}

fn read_json_entries(path: &Path) -> Result<Vec<(CoordinateKey, Coordinate)>, LoadError> {
    let content = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let parsed: Vec<JsonEntry> =
        serde_json::from_str(&content).map_err(|e| LoadError::json(path, e))?;

    parsed
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| -> Result<(CoordinateKey, Coordinate), LoadError> {
            let row = idx + 1;
            let id = |name: &str, value: &serde_json::Value| {
                json_scalar(value)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| LoadError::MissingField {
                        path: path.to_path_buf(),
                        row,
                        field: name.to_string(),
                    })
            };
            let key = CoordinateKey {
                step_id: id("step_id", &raw.step_id)?,
                screen_id: id("screen_id", &raw.screen_id)?,
                string_id: id("expected_string_id", &raw.expected_string_id)?,
            };
            let coordinate = Coordinate::from_signed(raw.left, raw.top, raw.right, raw.bottom)
                .map_err(|source| LoadError::InvalidCoordinate {
                    path: path.to_path_buf(),
                    row,
                    source,
                })?;
            Ok((key, coordinate))
        })
        .collect()
}

/// Initializes the coordinate CSV with a header if it doesn't exist or is empty.
///
/// Existing content is preserved.
pub fn init_csv(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing coordinate file")?;
        let reader = BufReader::new(file);
        if reader.lines().next().is_some() {
            return Ok(());
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create coordinate file directory")?;
    }
    let mut file = File::create(path).context("Failed to create coordinate file")?;
    writeln!(file, "{}", CSV_HEADER).context("Failed to write coordinate header")?;
    Ok(())
}

/// Appends one annotated region to the coordinate CSV.
///
/// Opens the file in append mode for each write, so annotations already
/// entered survive an interrupted session.
pub fn append_to_csv(path: &Path, key: &CoordinateKey, coordinate: &Coordinate) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open coordinate file for append")?;

    let line = format_record(&[
        key.step_id.clone(),
        key.screen_id.clone(),
        key.string_id.clone(),
        coordinate.left().to_string(),
        coordinate.top().to_string(),
        coordinate.right().to_string(),
        coordinate.bottom().to_string(),
    ]);

    writeln!(file, "{}", line).context("Failed to write coordinate row")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_csv() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "coords.csv",
            "StepID,ScreenID,ExpectedStringID,Left,Top,Right,Bottom\nS1,SCR1,WELCOME_TITLE,10,10,200,40\n",
        );
        let store = CoordinateStore::load(&path).unwrap();
        let c = store.get("S1", "SCR1", "WELCOME_TITLE").unwrap();
        assert_eq!((c.left(), c.top(), c.right(), c.bottom()), (10, 10, 200, 40));
        assert!(store.get("S1", "SCR1", "OTHER").is_none());
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = CoordinateStore::load(&dir.path().join("absent.csv")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_inverted_box_rejected() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "coords.csv",
            "StepID,ScreenID,ExpectedStringID,Left,Top,Right,Bottom\nS1,SCR1,A,200,10,10,40\n",
        );
        match CoordinateStore::load(&path) {
            Err(LoadError::InvalidCoordinate { row, .. }) => assert_eq!(row, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_bound_rejected() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "coords.csv",
            "StepID,ScreenID,ExpectedStringID,Left,Top,Right,Bottom\nS1,SCR1,A,ten,10,200,40\n",
        );
        assert!(matches!(
            CoordinateStore::load(&path),
            Err(LoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "coords.csv",
            "StepID,ScreenID,ExpectedStringID,Left,Top,Right,Bottom\nS1,SCR1,A,0,0,5,5\nS1,SCR1,A,1,1,6,6\n",
        );
        assert!(matches!(
            CoordinateStore::load(&path),
            Err(LoadError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "coords.json",
            r#"[{"step_id":"S1","screen_id":"SCR1","expected_string_id":"A","left":0,"top":0,"right":5,"bottom":5}]"#,
        );
        let store = CoordinateStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("S1", "SCR1", "A").unwrap().area(), 25);
    }

    #[test]
    fn test_append_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coords.csv");
        init_csv(&path).unwrap();
        init_csv(&path).unwrap();

        let key = CoordinateKey::new("S1", "SCR1", "TITLE, MAIN");
        let coordinate = Coordinate::new(1, 2, 30, 40).unwrap();
        append_to_csv(&path, &key, &coordinate).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let store = CoordinateStore::load(&path).unwrap();
        assert_eq!(store.get("S1", "SCR1", "TITLE, MAIN"), Some(coordinate));
    }
}
