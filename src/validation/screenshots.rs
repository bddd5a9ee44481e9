//! Finding a screen's screenshot and cutting regions out of it.

use anyhow::{Context, Result};
use image::RgbaImage;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Coordinate;
use crate::ocr::crop_region;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Maps screen ids to screenshot files in one directory.
///
/// `<dir>/<screen_id>.<ext>` is preferred. Otherwise the first file (by name)
/// whose stem contains the screen id is used.
#[derive(Debug, Clone)]
pub struct ScreenshotLocator {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl ScreenshotLocator {
    pub fn new(dir: &Path) -> Self {
        let files = list_images(dir).unwrap_or_else(|e| {
            warn!("Cannot read screenshot directory {}: {}", dir.display(), e);
            Vec::new()
        });
        debug!("{} screenshots in {}", files.len(), dir.display());
        Self {
            dir: dir.to_path_buf(),
            files,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn locate(&self, screen_id: &str) -> Option<&Path> {
        if screen_id.is_empty() {
            return None;
        }
        for ext in IMAGE_EXTENSIONS {
            if let Some(exact) = self
                .files
                .iter()
                .find(|p| stem(p) == screen_id && has_extension(p, ext))
            {
                return Some(exact.as_path());
            }
        }
        self.files
            .iter()
            .find(|p| stem(p).contains(screen_id))
            .map(PathBuf::as_path)
    }
}

fn stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
}

/// Sorted image files directly inside `dir`.
pub fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && IMAGE_EXTENSIONS.iter().any(|ext| has_extension(p, ext)))
        .collect();
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Decodes the screenshot and returns a copy of one region.
///
/// The decoded screenshot is dropped before returning.
pub fn load_region(path: &Path, coordinate: &Coordinate) -> Result<RgbaImage> {
    let screenshot = image::open(path)
        .with_context(|| format!("cannot open {}", path.display()))?
        .to_rgba8();
    crop_region(&screenshot, coordinate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_exact_name_preferred() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "SCR1_old.png");
        touch(dir.path(), "SCR1.jpg");
        touch(dir.path(), "notes.txt");

        let locator = ScreenshotLocator::new(dir.path());
        assert_eq!(locator.files().len(), 2);
        assert_eq!(locator.locate("SCR1").unwrap(), dir.path().join("SCR1.jpg"));
    }

    #[test]
    fn test_fallback_to_embedded_id() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "02_SCR2_settings.png");
        touch(dir.path(), "01_SCR2_login.png");

        let locator = ScreenshotLocator::new(dir.path());
        assert_eq!(
            locator.locate("SCR2").unwrap(),
            dir.path().join("01_SCR2_login.png")
        );
        assert!(locator.locate("SCR3").is_none());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let locator = ScreenshotLocator::new(&dir.path().join("absent"));
        assert!(locator.locate("SCR1").is_none());
    }

    #[test]
    fn test_load_region() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("SCR1.png");
        RgbaImage::from_fn(40, 20, |x, y| Rgba([x as u8, y as u8, 0, 255]))
            .save(&path)
            .unwrap();

        let region = load_region(&path, &Coordinate::new(5, 2, 15, 12).unwrap()).unwrap();
        assert_eq!(region.dimensions(), (10, 10));
        assert_eq!(region.get_pixel(0, 0)[0], 5);

        let outside = Coordinate::new(30, 10, 50, 30).unwrap();
        assert!(load_region(&path, &outside).is_err());
    }

    #[test]
    fn test_load_region_unreadable_file() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "SCR1.png");
        let coordinate = Coordinate::new(0, 0, 1, 1).unwrap();
        assert!(load_region(&dir.path().join("SCR1.png"), &coordinate).is_err());
    }
}
