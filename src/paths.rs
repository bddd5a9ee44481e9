use std::path::{Path, PathBuf};

use crate::config::ValidatorConfig;

const APP_DIR_NAME: &str = "ocr-string-validator";

/// Resolves a configured path against the data directory unless it is absolute.
fn under(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Returns the test protocol file: `<data_dir>/test_protocol.csv` by default.
pub fn protocol_file(config: &ValidatorConfig) -> PathBuf {
    under(&config.data_dir, &config.protocol_file)
}

/// Returns the coordinate table: `<data_dir>/string_coordinates.csv` by default.
pub fn coordinates_file(config: &ValidatorConfig) -> PathBuf {
    under(&config.data_dir, &config.coordinates_file)
}

/// Returns the expected strings directory: `<data_dir>/expected_strings/`
pub fn expected_strings_dir(config: &ValidatorConfig) -> PathBuf {
    under(&config.data_dir, &config.expected_strings_dir)
}

/// Returns the expected strings file of one locale: `<expected_strings_dir>/<locale>.json`
pub fn expected_strings_file(config: &ValidatorConfig, locale: &str) -> PathBuf {
    expected_strings_dir(config).join(format!("{}.json", locale))
}

/// Returns the screenshots directory: `<data_dir>/screenshots/`
pub fn screenshots_dir(config: &ValidatorConfig) -> PathBuf {
    under(&config.data_dir, &config.screenshots_dir)
}

/// Returns the report path for a format: `<output_dir>/results-<locale>.<ext>`
pub fn results_file(config: &ValidatorConfig, extension: &str) -> PathBuf {
    config
        .output_dir
        .join(format!("results-{}.{}", config.locale, extension))
}

/// Returns the status chart path: `<output_dir>/results-<locale>-chart.png`
pub fn chart_file(config: &ValidatorConfig) -> PathBuf {
    config
        .output_dir
        .join(format!("results-{}-chart.png", config.locale))
}

/// Returns the per-user tessdata cache: `<data_local_dir>/ocr-string-validator/tessdata/`
pub fn tessdata_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("tessdata")
}

/// Ensures the output directory exists. Call before writing reports.
pub fn ensure_output_dir(config: &ValidatorConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_resolve_under_data_dir() {
        let config = ValidatorConfig {
            data_dir: PathBuf::from("/srv/data"),
            ..Default::default()
        };
        assert_eq!(protocol_file(&config), PathBuf::from("/srv/data/test_protocol.csv"));
        assert_eq!(
            expected_strings_file(&config, "fr-FR"),
            PathBuf::from("/srv/data/expected_strings/fr-FR.json")
        );
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let config = ValidatorConfig {
            data_dir: PathBuf::from("/srv/data"),
            screenshots_dir: PathBuf::from("/mnt/shots"),
            ..Default::default()
        };
        assert_eq!(screenshots_dir(&config), PathBuf::from("/mnt/shots"));
    }

    #[test]
    fn test_results_file_encodes_locale() {
        let config = ValidatorConfig {
            output_dir: PathBuf::from("out"),
            locale: "ja-JP".to_string(),
            ..Default::default()
        };
        assert_eq!(results_file(&config, "html"), PathBuf::from("out/results-ja-JP.html"));
    }
}
