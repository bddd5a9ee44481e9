//! Tesseract backend driven through its command-line interface.

use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use log::debug;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::setup;
use super::{ExtractionTimeout, TextExtractor};
use crate::config::TesseractConfig;
use crate::model::ExtractionResult;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A word recognized by Tesseract, with its position in the layout tree.
#[derive(Debug, Clone, PartialEq)]
struct TsvWord {
    line: (u32, u32, u32),
    text: String,
    confidence: f32,
}

/// Recognized text of one region, lines joined with `\n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Mean word confidence in [0, 1]; 0 when no word was found
    pub confidence: f32,
}

pub struct TesseractExtractor {
    executable: PathBuf,
    tessdata_dir: Option<PathBuf>,
    psm: u8,
    extra_args: Vec<String>,
    download_missing: bool,
}

impl TesseractExtractor {
    pub fn new(config: &TesseractConfig) -> Result<Self> {
        let executable = setup::find_tesseract_executable(config.executable.as_deref())?;
        debug!("Using Tesseract at {}", executable.display());
        Ok(Self {
            executable,
            tessdata_dir: setup::tessdata_dir(config.tessdata_dir.as_deref(), config.download_missing),
            psm: config.psm,
            extra_args: config.extra_args.clone(),
            download_missing: config.download_missing,
        })
    }

    /// Builds `tesseract <input> <output_base> [--tessdata-dir D] -l L --psm N ... tsv`.
    /// Tesseract writes the result to `<output_base>.tsv`.
    fn command(&self, input: &Path, output_base: &Path, language: &str) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(input).arg(output_base);
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("-l")
            .arg(language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .args(&self.extra_args)
            .arg("tsv");
        cmd
    }

    fn run(&self, image: &GrayImage, language: &str, timeout: Option<Duration>) -> Result<ExtractionResult> {
        let start = Instant::now();

        let work = tempfile::tempdir().context("Failed to create Tesseract work directory")?;
        let input = work.path().join("region.png");
        let output_base = work.path().join("result");
        let stderr_path = work.path().join("stderr.txt");
        image
            .save(&input)
            .context("Failed to write region for Tesseract")?;

        let stderr = File::create(&stderr_path)?;
        let mut child = self
            .command(&input, &output_base, language)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .spawn()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        let status = wait_with_deadline(&mut child, timeout.map(|t| (start + t, t)))?;
        if !status.success() {
            let message = fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(anyhow!("Tesseract failed ({}): {}", status, message.trim()));
        }

        let tsv = fs::read_to_string(output_base.with_extension("tsv"))
            .context("Tesseract produced no TSV output")?;
        let recognition = parse_tsv(&tsv);
        Ok(ExtractionResult::new(
            recognition.text,
            recognition.confidence,
            start.elapsed(),
        ))
    }
}

impl TextExtractor for TesseractExtractor {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn prepare(&self, language: &str) -> Result<()> {
        match (&self.tessdata_dir, self.download_missing) {
            (Some(dir), true) => setup::ensure_traineddata(dir, language),
            _ => Ok(()),
        }
    }

    fn extract(&self, image: &GrayImage, language: &str) -> Result<ExtractionResult> {
        self.run(image, language, None)
    }

    fn extract_within(
        &self,
        image: &GrayImage,
        language: &str,
        timeout: Duration,
    ) -> Result<ExtractionResult> {
        self.run(image, language, Some(timeout))
    }
}

/// Waits for `child` to exit. With a `(deadline, budget)` the child is killed
/// and reaped once the deadline passes, and [`ExtractionTimeout`] is returned.
fn wait_with_deadline(child: &mut Child, deadline: Option<(Instant, Duration)>) -> Result<ExitStatus> {
    let Some((deadline, budget)) = deadline else {
        return Ok(child.wait()?);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            if let Err(e) = child.kill() {
                debug!("kill after timeout failed: {}", e);
            }
            child.wait()?;
            return Err(ExtractionTimeout(budget).into());
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Parses Tesseract TSV output.
///
/// Only word rows (level 5) with a non-negative confidence count. Words
/// sharing a (block, paragraph, line) triple are joined with spaces.
pub fn parse_tsv(tsv: &str) -> Recognition {
    let mut words: Vec<TsvWord> = Vec::new();

    for row in tsv.lines().skip(1) {
        // level, page_num, block_num, par_num, line_num, word_num,
        // left, top, width, height, conf, text
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }

        let confidence: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        let text = fields[11].trim();
        if confidence < 0.0 || text.is_empty() {
            continue;
        }

        let num = |i: usize| fields[i].trim().parse::<u32>().unwrap_or(0);
        words.push(TsvWord {
            line: (num(2), num(3), num(4)),
            text: text.to_string(),
            confidence,
        });
    }

    if words.is_empty() {
        return Recognition {
            text: String::new(),
            confidence: 0.0,
        };
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current_line = None;
    for word in &words {
        if current_line == Some(word.line) {
            if let Some(last) = lines.last_mut() {
                last.push(' ');
                last.push_str(&word.text);
            }
        } else {
            lines.push(word.text.clone());
            current_line = Some(word.line);
        }
    }

    let mean = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
    Recognition {
        text: lines.join("\n"),
        confidence: (mean / 100.0).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        std::iter::once(HEADER)
            .chain(rows.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_parse_single_line() {
        let out = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t200\t40\t-1\t",
            "4\t1\t1\t1\t1\t0\t5\t5\t150\t30\t-1\t",
            "5\t1\t1\t1\t1\t1\t5\t5\t70\t30\t96.0\tSave",
            "5\t1\t1\t1\t1\t2\t80\t5\t70\t30\t90.0\tsettings",
        ]);
        let result = parse_tsv(&out);
        assert_eq!(result.text, "Save settings");
        assert!((result.confidence - 0.93).abs() < 1e-4);
    }

    #[test]
    fn test_parse_multiple_lines() {
        let out = tsv(&[
            "5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t80\tFirst",
            "5\t1\t1\t1\t2\t1\t0\t20\t10\t10\t60\tSecond",
            "5\t1\t1\t1\t2\t2\t20\t20\t10\t10\t70\tline",
        ]);
        let result = parse_tsv(&out);
        assert_eq!(result.text, "First\nSecond line");
        assert!((result.confidence - 0.70).abs() < 1e-4);
    }

    #[test]
    fn test_parse_skips_negative_confidence_and_blank_words() {
        let out = tsv(&[
            "5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t-1\tghost",
            "5\t1\t1\t1\t1\t2\t0\t0\t10\t10\t50\t  ",
        ]);
        let result = parse_tsv(&out);
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_overrunning_process_is_killed() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        let start = Instant::now();
        let budget = Duration::from_millis(50);

        let err = wait_with_deadline(&mut child, Some((start + budget, budget))).unwrap_err();
        assert_eq!(err.downcast_ref::<ExtractionTimeout>(), Some(&ExtractionTimeout(budget)));
        assert!(start.elapsed() < Duration::from_secs(2));
        // Reaped: nothing left to wait for.
        assert!(child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_finishing_in_time_is_not_killed() {
        let mut child = Command::new("true").spawn().unwrap();
        let start = Instant::now();
        let budget = Duration::from_secs(5);
        let status = wait_with_deadline(&mut child, Some((start + budget, budget))).unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_parse_empty_output() {
        assert_eq!(parse_tsv("").text, "");
        assert_eq!(parse_tsv(HEADER).confidence, 0.0);
    }
}
