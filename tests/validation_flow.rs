use anyhow::Result;
use image::{GrayImage, Rgba, RgbaImage};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

use ocr_string_validator::config::MatcherConfig;
use ocr_string_validator::matcher;
use ocr_string_validator::model::{ExtractionResult, Status};
use ocr_string_validator::ocr::preprocess::Grayscale;
use ocr_string_validator::ocr::TextExtractor;
use ocr_string_validator::report::{self, ReportRow};
use ocr_string_validator::store::{CoordinateStore, ExpectedStringStore, ProtocolStore};
use ocr_string_validator::validation::ScreenshotLocator;
use ocr_string_validator::{ValidationRecord, Validator, ValidatorConfig};

/// Reads the region as rendered text: a region containing any dark pixel
/// reads as "Welcome", anything else as nothing.
struct StubExtractor;

impl TextExtractor for StubExtractor {
    fn name(&self) -> &str {
        "stub"
    }

    fn extract(&self, image: &GrayImage, _language: &str) -> Result<ExtractionResult> {
        let has_text = image.pixels().any(|p| p[0] < 128);
        let (text, confidence) = if has_text { ("Welcome", 0.91) } else { ("", 0.0) };
        Ok(ExtractionResult::new(text, confidence, Duration::from_millis(3)))
    }
}

struct Project {
    dir: TempDir,
}

impl Project {
    /// SCR1.png is 320x120 white with a dark block inside (10,10)-(200,40).
    fn new(protocol: &str, coordinates: &str, en_us: &str) -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("screenshots")).unwrap();
        fs::create_dir_all(root.join("expected_strings")).unwrap();
        fs::write(root.join("test_protocol.csv"), protocol).unwrap();
        fs::write(root.join("string_coordinates.csv"), coordinates).unwrap();
        fs::write(root.join("expected_strings").join("en-US.json"), en_us).unwrap();

        let screenshot = RgbaImage::from_fn(320, 120, |x, y| {
            if (20..190).contains(&x) && (15..35).contains(&y) {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        screenshot.save(root.join("screenshots").join("SCR1.png")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self) -> Vec<ValidationRecord> {
        let root = self.root();
        let protocol = ProtocolStore::load(&root.join("test_protocol.csv")).unwrap();
        let coordinates = CoordinateStore::load(&root.join("string_coordinates.csv")).unwrap();
        let expected = ExpectedStringStore::load(&root.join("expected_strings"), "en-US", "en-US").unwrap();

        let mut validator = Validator::new(
            Arc::new(StubExtractor),
            Box::new(Grayscale),
            matcher::from_config(&MatcherConfig::default()).unwrap(),
            ScreenshotLocator::new(&root.join("screenshots")),
        );
        validator
            .validate(&protocol, &coordinates, &expected, "en-US")
            .unwrap()
    }
}

const COORDINATES: &str = "StepID,ScreenID,ExpectedStringID,Left,Top,Right,Bottom\n\
                           S1,SCR1,WELCOME_TITLE,10,10,200,40\n\
                           S1,SCR1,FOOTER,10,80,200,110\n";

#[test]
fn welcome_title_passes() {
    let project = Project::new(
        "StepID,ScreenID,ExpectedStringID\nS1,SCR1,WELCOME_TITLE\n",
        COORDINATES,
        r#"{"WELCOME_TITLE": "Welcome"}"#,
    );
    let records = project.run();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status(), Status::Pass);
    assert_eq!(record.step_id(), "S1");
    assert_eq!(record.expected_text(), Some("Welcome"));
    assert_eq!(record.extracted_text(), Some("Welcome"));
    assert!(record.confidence().unwrap() > 0.0);
    assert_eq!(record.strategy(), Some("composite(exact)"));
}

#[test]
fn missing_expected_string_is_an_error_row() {
    let project = Project::new(
        "StepID,ScreenID,ExpectedStringID\nS1,SCR1,WELCOME_TITLE\n",
        COORDINATES,
        r#"{"SOMETHING_ELSE": "Hello"}"#,
    );
    let records = project.run();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status(), Status::Error);
    assert_eq!(records[0].step_id(), "S1");
    assert!(records[0].reason().unwrap().contains("expected string not found"));
}

#[test]
fn every_protocol_row_yields_one_record() {
    let project = Project::new(
        "StepID,ScreenID,ExpectedStringID\n\
         S1,SCR1,WELCOME_TITLE\n\
         S1,SCR1,FOOTER\n\
         S1,SCR1,NOT_ANNOTATED\n\
         S2,SCR2,WELCOME_TITLE\n\
         S3,SCR1,WELCOME_TITLE\n",
        COORDINATES,
        r#"{"WELCOME_TITLE": "Welcome", "FOOTER": "Terms", "NOT_ANNOTATED": "x"}"#,
    );
    let records = project.run();

    assert_eq!(records.len(), 5);
    let statuses: Vec<Status> = records.iter().map(|r| r.status()).collect();
    assert_eq!(
        statuses,
        vec![Status::Pass, Status::Fail, Status::Error, Status::Error, Status::Error]
    );
    assert_eq!(records[2].reason().as_deref(), Some("coordinate not found"));
    assert_eq!(records[3].reason().as_deref(), Some("coordinate not found"));
}

#[test]
fn reports_read_back_with_same_ids_and_statuses() {
    let project = Project::new(
        "StepID,ScreenID,ExpectedStringID\nS1,SCR1,WELCOME_TITLE\nS1,SCR1,FOOTER\nS1,SCR1,MISSING\n",
        COORDINATES,
        r#"{"WELCOME_TITLE": "Welcome", "FOOTER": "Terms, \"conditions\""}"#,
    );
    let records = project.run();
    let original = report::rows_from_records(&records);

    let config = ValidatorConfig {
        output_dir: project.root().join("out"),
        ..ValidatorConfig::default()
    };
    let formats = vec!["csv".to_string(), "json".to_string()];
    let written = report::write_reports(&config, &formats, None, &records).unwrap();

    for path in written {
        let rows: Vec<ReportRow> = report::read_report(&path).unwrap();
        assert_eq!(rows.len(), original.len(), "{}", path.display());
        for (read, orig) in rows.iter().zip(&original) {
            assert_eq!(
                (&read.step_id, &read.screen_id, &read.string_id, read.status),
                (&orig.step_id, &orig.screen_id, &orig.string_id, orig.status)
            );
            assert_eq!(read.expected_text, orig.expected_text);
            assert_eq!(read.error, orig.error);
            assert_eq!(read.timestamp, orig.timestamp);
        }
    }
}
