//! Minimal CSV support for the protocol, coordinate and report tables.
//!
//! Fields are separated by commas. Quoted fields may contain commas,
//! newlines and doubled quotes (`""`).

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LoadError;

/// One parsed record with the 1-based line number it started on.
#[derive(Debug, Clone)]
pub struct CsvRecord {
    pub line: usize,
    pub fields: Vec<String>,
}

impl CsvRecord {
    /// Returns the trimmed field at `idx`, or "" if the row is short.
    pub fn get(&self, idx: usize) -> &str {
        self.fields.get(idx).map(|s| s.trim()).unwrap_or("")
    }

    fn is_blank(&self) -> bool {
        self.fields.iter().all(|f| f.trim().is_empty())
    }
}

/// A CSV file split into header and data records.
#[derive(Debug)]
pub struct CsvTable {
    pub path: PathBuf,
    pub header: Vec<String>,
    pub records: Vec<CsvRecord>,
}

impl CsvTable {
    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        Ok(Self::parse(path, &content))
    }

    /// Parses CSV text. Blank lines are skipped. A file without any line
    /// yields an empty header.
    pub fn parse(path: &Path, content: &str) -> Self {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut records = parse_records(content).into_iter();
        let header = records
            .next()
            .map(|r| r.fields.into_iter().map(|f| f.trim().to_string()).collect())
            .unwrap_or_default();
        let records = records.filter(|r| !r.is_blank()).collect();

        Self {
            path: path.to_path_buf(),
            header,
            records,
        }
    }

    /// Finds the column whose header matches `name`, ignoring case,
    /// underscores and spaces ("StepID" == "step_id" == "Step ID").
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = header_key(name);
        self.header.iter().position(|h| header_key(h) == wanted)
    }

    /// Resolves all `names` to column indices or reports the missing ones.
    pub fn require_columns(&self, names: &[&str]) -> Result<Vec<usize>, LoadError> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column(name) {
                Some(idx) => found.push(idx),
                None => missing.push(*name),
            }
        }

        if !missing.is_empty() {
            return Err(LoadError::MissingColumns {
                path: self.path.clone(),
                columns: missing.join(", "),
            });
        }
        Ok(found)
    }
}

fn header_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Splits CSV text into records, honouring quoted fields.
pub fn parse_records(content: &str) -> Vec<CsvRecord> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push(CsvRecord {
                    line: record_line,
                    fields: std::mem::take(&mut fields),
                });
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        records.push(CsvRecord {
            line: record_line,
            fields,
        });
    }

    records
}

/// Quotes a field if it contains a separator, quote or line break.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Formats one CSV line (without the trailing newline).
pub fn format_record<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}
