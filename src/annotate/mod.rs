//! Console annotation: records string bounding boxes into the coordinate table.
//!
//! Prompts are written to `W` and answers read from `R`, so a session can run
//! on stdin/stdout or on scripted input.

use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::model::Coordinate;
use crate::store::coordinates::{append_to_csv, init_csv};
use crate::store::{CoordinateKey, CoordinateStore, ProtocolStore};
use crate::validation::ScreenshotLocator;

/// Counts reported at the end of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationStats {
    pub screens: usize,
    pub added: usize,
    pub skipped: usize,
}

enum Answer {
    Text(String),
    Quit,
}

enum Bounds {
    Region(Coordinate),
    Skip,
    Quit,
}

pub struct AnnotationSession<R, W> {
    input: R,
    output: W,
    coordinates_path: PathBuf,
    known: HashSet<CoordinateKey>,
    screen_ids: Vec<String>,
}

impl<R: BufRead, W: Write> AnnotationSession<R, W> {
    /// Opens a session appending to `coordinates_path`. Keys already in
    /// `existing` are refused so the table stays loadable.
    pub fn new(input: R, output: W, coordinates_path: &Path, existing: &CoordinateStore) -> Result<Self> {
        init_csv(coordinates_path)?;
        Ok(Self {
            input,
            output,
            coordinates_path: coordinates_path.to_path_buf(),
            known: existing.keys().cloned().collect(),
            screen_ids: Vec::new(),
        })
    }

    /// Resolves screenshot names against the screen ids used in `protocol`.
    pub fn with_protocol(mut self, protocol: &ProtocolStore) -> Self {
        let mut ids: Vec<String> = protocol.steps().iter().map(|s| s.screen_id().to_string()).collect();
        ids.sort();
        ids.dedup();
        self.screen_ids = ids;
        self
    }

    /// Screen id recorded for a screenshot with file stem `stem`.
    ///
    /// A protocol screen id equal to the stem wins, then the longest one
    /// contained in it (`01_SCR2_login` becomes `SCR2`). Without a match the
    /// stem itself is used.
    pub fn screen_id_for(&self, stem: &str) -> String {
        if self.screen_ids.is_empty() || self.screen_ids.iter().any(|id| id == stem) {
            return stem.to_string();
        }
        match self
            .screen_ids
            .iter()
            .filter(|id| stem.contains(id.as_str()))
            .max_by_key(|id| id.len())
        {
            Some(id) => id.clone(),
            None => {
                warn!("{} matches no protocol screen id; using it as is", stem);
                stem.to_string()
            }
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Walks every screenshot, asking for a step id and then any number of
    /// (string id, bounds) entries.
    pub fn annotate_screens(&mut self, screenshots: &[PathBuf]) -> Result<AnnotationStats> {
        let mut stats = AnnotationStats::default();

        'screens: for path in screenshots {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let screen_id = self.screen_id_for(stem);
            let (width, height) = match image::image_dimensions(path) {
                Ok(dims) => dims,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            stats.screens += 1;
            writeln!(
                self.output,
                "\nScreen {} ({}x{}): {}",
                screen_id,
                width,
                height,
                path.display()
            )?;

            let step_id = match self.ask("Step id (empty to skip screen, q to quit): ")? {
                Answer::Quit => break,
                Answer::Text(s) if s.is_empty() => continue,
                Answer::Text(s) => s,
            };

            loop {
                let string_id = match self.ask("String id (empty to finish screen, q to quit): ")? {
                    Answer::Quit => break 'screens,
                    Answer::Text(s) if s.is_empty() => break,
                    Answer::Text(s) => s,
                };

                let key = CoordinateKey::new(&step_id, &screen_id, &string_id);
                if self.known.contains(&key) {
                    writeln!(self.output, "{}/{}/{} is already annotated", step_id, screen_id, string_id)?;
                    stats.skipped += 1;
                    continue;
                }

                match self.ask_bounds(width, height)? {
                    Bounds::Region(coordinate) => self.save(key, &coordinate, &mut stats)?,
                    Bounds::Skip => stats.skipped += 1,
                    Bounds::Quit => break 'screens,
                }
            }
        }

        info!(
            "Annotation finished: {} added, {} skipped over {} screens",
            stats.added, stats.skipped, stats.screens
        );
        Ok(stats)
    }

    /// Prompts only for protocol rows that have no coordinate yet, in protocol order.
    pub fn annotate_missing(
        &mut self,
        protocol: &ProtocolStore,
        locator: &ScreenshotLocator,
    ) -> Result<AnnotationStats> {
        let mut stats = AnnotationStats::default();
        let mut current_screen: Option<String> = None;

        for row in protocol.rows() {
            let key = CoordinateKey::from(&row);
            if self.known.contains(&key) {
                continue;
            }

            let Some(path) = locator.locate(&row.screen_id) else {
                writeln!(self.output, "No screenshot for screen {}; skipping {}", row.screen_id, row.expected_string_id)?;
                stats.skipped += 1;
                continue;
            };
            let (width, height) = image::image_dimensions(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;

            if current_screen.as_deref() != Some(row.screen_id.as_str()) {
                stats.screens += 1;
                writeln!(self.output, "\nScreen {} ({}x{}): {}", row.screen_id, width, height, path.display())?;
                current_screen = Some(row.screen_id.clone());
            }
            writeln!(self.output, "{} / {}", row.step_id, row.expected_string_id)?;

            match self.ask_bounds(width, height)? {
                Bounds::Region(coordinate) => self.save(key, &coordinate, &mut stats)?,
                Bounds::Skip => stats.skipped += 1,
                Bounds::Quit => break,
            }
        }

        info!(
            "Annotation finished: {} added, {} skipped",
            stats.added, stats.skipped
        );
        Ok(stats)
    }

    fn save(&mut self, key: CoordinateKey, coordinate: &Coordinate, stats: &mut AnnotationStats) -> Result<()> {
        append_to_csv(&self.coordinates_path, &key, coordinate)?;
        writeln!(self.output, "Saved {} {}", key.string_id, coordinate)?;
        self.known.insert(key);
        stats.added += 1;
        Ok(())
    }

    /// Reads one trimmed line. End of input counts as quit.
    fn ask(&mut self, prompt: &str) -> Result<Answer> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Answer::Quit);
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(Answer::Quit);
        }
        Ok(Answer::Text(line.to_string()))
    }

    /// Asks until the bounds parse and fit the image, or the user skips or quits.
    fn ask_bounds(&mut self, width: u32, height: u32) -> Result<Bounds> {
        loop {
            let text = match self.ask("left top right bottom (empty to skip): ")? {
                Answer::Quit => return Ok(Bounds::Quit),
                Answer::Text(s) if s.is_empty() => return Ok(Bounds::Skip),
                Answer::Text(s) => s,
            };
            match parse_bounds(&text, width, height) {
                Ok(coordinate) => return Ok(Bounds::Region(coordinate)),
                Err(message) => writeln!(self.output, "Invalid bounds: {}", message)?,
            }
        }
    }
}

/// Parses `left top right bottom` (spaces and/or commas) and checks it
/// against the image size.
pub fn parse_bounds(text: &str, width: u32, height: u32) -> Result<Coordinate, String> {
    let values = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|_| format!("{:?} is not an integer", s)))
        .collect::<Result<Vec<_>, _>>()?;

    let [left, top, right, bottom] = values[..] else {
        return Err(format!("expected 4 numbers, got {}", values.len()));
    };
    let coordinate = Coordinate::from_signed(left, top, right, bottom).map_err(|e| e.to_string())?;
    if !coordinate.fits_within(width, height) {
        return Err(format!("{} exceeds image size {}x{}", coordinate, width, height));
    }
    Ok(coordinate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProtocolRow;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn screenshot(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(320, 240, Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(
            parse_bounds("10 10 200 40", 320, 240).unwrap(),
            Coordinate::new(10, 10, 200, 40).unwrap()
        );
        assert!(parse_bounds("10, 10, 200, 40", 320, 240).is_ok());
        assert!(parse_bounds("10 10 200", 320, 240).is_err());
        assert!(parse_bounds("10 10 five 40", 320, 240).is_err());
        assert!(parse_bounds("200 10 10 40", 320, 240).is_err());
        assert!(parse_bounds("10 10 400 40", 320, 240).is_err());
    }

    #[test]
    fn test_annotate_screens_appends_rows() {
        let dir = tempdir().unwrap();
        let shot = screenshot(dir.path(), "SCR1.png");
        let csv = dir.path().join("coords.csv");

        let script = "S1\nWELCOME_TITLE\n10 10 999 40\n10 10 200 40\nSUBTITLE\n\n\n";
        let mut session =
            AnnotationSession::new(Cursor::new(script), Vec::new(), &csv, &CoordinateStore::default())
                .unwrap();
        let stats = session.annotate_screens(&[shot]).unwrap();
        assert_eq!(
            stats,
            AnnotationStats {
                screens: 1,
                added: 1,
                skipped: 1
            }
        );

        let output = String::from_utf8(session.into_output()).unwrap();
        assert!(output.contains("Invalid bounds"));

        let store = CoordinateStore::load(&csv).unwrap();
        assert_eq!(
            store.get("S1", "SCR1", "WELCOME_TITLE"),
            Some(Coordinate::new(10, 10, 200, 40).unwrap())
        );
    }

    fn protocol_on(screens: &[&str]) -> ProtocolStore {
        let rows = screens
            .iter()
            .map(|screen| ProtocolRow {
                step_id: "S1".into(),
                screen_id: screen.to_string(),
                expected_string_id: "TITLE".into(),
            })
            .collect();
        ProtocolStore::from_rows(Path::new("p.csv"), rows).unwrap()
    }

    #[test]
    fn test_screen_id_resolved_from_protocol() {
        let dir = tempdir().unwrap();
        let shot = screenshot(dir.path(), "01_SCR2_login.png");
        let csv = dir.path().join("coords.csv");

        let mut session = AnnotationSession::new(
            Cursor::new("S1\nTITLE\n10 10 200 40\n\n"),
            Vec::new(),
            &csv,
            &CoordinateStore::default(),
        )
        .unwrap()
        .with_protocol(&protocol_on(&["SCR1", "SCR2"]));
        session.annotate_screens(&[shot]).unwrap();

        let output = String::from_utf8(session.into_output()).unwrap();
        assert!(output.contains("Screen SCR2 (320x240)"));
        let store = CoordinateStore::load(&csv).unwrap();
        assert!(store.get("S1", "SCR2", "TITLE").is_some());
        assert!(store.get("S1", "01_SCR2_login", "TITLE").is_none());
    }

    #[test]
    fn test_screen_id_for_prefers_exact_then_longest() {
        let dir = tempdir().unwrap();
        let csv = dir.path().join("coords.csv");
        let session = AnnotationSession::new(Cursor::new(""), Vec::new(), &csv, &CoordinateStore::default())
            .unwrap()
            .with_protocol(&protocol_on(&["SCR1", "SCR12", "login"]));

        assert_eq!(session.screen_id_for("login"), "login");
        assert_eq!(session.screen_id_for("03_SCR12_settings"), "SCR12");
        assert_eq!(session.screen_id_for("unrelated"), "unrelated");

        let plain = AnnotationSession::new(Cursor::new(""), Vec::new(), &csv, &CoordinateStore::default())
            .unwrap();
        assert_eq!(plain.screen_id_for("01_SCR2_login"), "01_SCR2_login");
    }

    #[test]
    fn test_quit_stops_session() {
        let dir = tempdir().unwrap();
        let first = screenshot(dir.path(), "SCR1.png");
        let second = screenshot(dir.path(), "SCR2.png");
        let csv = dir.path().join("coords.csv");

        let mut session =
            AnnotationSession::new(Cursor::new("q\n"), Vec::new(), &csv, &CoordinateStore::default())
                .unwrap();
        let stats = session.annotate_screens(&[first, second]).unwrap();
        assert_eq!(stats.screens, 1);
        assert_eq!(stats.added, 0);
        assert!(CoordinateStore::load(&csv).unwrap().is_empty());
    }

    #[test]
    fn test_annotate_missing_only_prompts_unannotated_rows() {
        let dir = tempdir().unwrap();
        screenshot(dir.path(), "SCR1.png");
        let csv = dir.path().join("coords.csv");
        init_csv(&csv).unwrap();
        append_to_csv(
            &csv,
            &CoordinateKey::new("S1", "SCR1", "DONE"),
            &Coordinate::new(0, 0, 5, 5).unwrap(),
        )
        .unwrap();
        let existing = CoordinateStore::load(&csv).unwrap();

        let rows = ["DONE", "TODO", "LATER"]
            .iter()
            .map(|id| ProtocolRow {
                step_id: "S1".into(),
                screen_id: "SCR1".into(),
                expected_string_id: id.to_string(),
            })
            .collect();
        let protocol = ProtocolStore::from_rows(Path::new("p.csv"), rows).unwrap();
        let locator = ScreenshotLocator::new(dir.path());

        let mut session =
            AnnotationSession::new(Cursor::new("1 2 30 40\n\n"), Vec::new(), &csv, &existing).unwrap();
        let stats = session.annotate_missing(&protocol, &locator).unwrap();
        assert_eq!((stats.added, stats.skipped), (1, 1));

        let output = String::from_utf8(session.into_output()).unwrap();
        assert!(!output.contains("S1 / DONE"));
        assert!(output.contains("S1 / TODO"));

        let store = CoordinateStore::load(&csv).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get("S1", "SCR1", "LATER").is_none());
    }
}
