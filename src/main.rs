//! `ocr-validate`: validation and annotation entry points.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::io;
use std::path::Path;
use std::process::ExitCode;

use cli::{Cli, Commands};
use ocr_string_validator::annotate::AnnotationSession;
use ocr_string_validator::config::ValidatorConfig;
use ocr_string_validator::report::{self, chart, Summary};
use ocr_string_validator::store::{CoordinateStore, ExpectedStringStore, ProtocolStore};
use ocr_string_validator::validation::{screenshots, LoggingObserver, ProgressObserver, ScreenshotLocator, Validator};
use ocr_string_validator::{logging, matcher, ocr, paths};

/// Exit status when a strict run contains FAIL or ERROR records.
const EXIT_NOT_ALL_PASSED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let settings = |cli_config: &Path, data_dir: Option<&Path>| -> Result<ValidatorConfig> {
        let mut config = ValidatorConfig::load(cli_config)?;
        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }
        logging::init(&config.log_level, config.log_file.as_deref())?;
        logging::install_panic_hook();
        Ok(config)
    };
    let data_dir = cli.data_dir.as_deref();

    match cli.command {
        Commands::Validate {
            locale,
            output,
            formats,
            chart,
            strict,
        } => {
            let mut config = settings(&cli.config, data_dir)?;
            if let Some(locale) = locale {
                config.locale = locale;
            }
            if !formats.is_empty() {
                config.report_formats = formats.iter().map(|f| f.as_str().to_string()).collect();
            }
            config.chart |= chart;
            validate(&config, output.as_deref(), strict)
        }
        Commands::Annotate { missing } => annotate(&settings(&cli.config, data_dir)?, missing),
        Commands::Matchers => {
            let config = settings(&cli.config, data_dir)?;
            for name in matcher::strategy_names() {
                if name == config.matcher.strategy {
                    println!("{} (configured)", name);
                } else {
                    println!("{}", name);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            strategy,
            threshold,
            expected,
            actual,
        } => {
            let mut matcher_config = settings(&cli.config, data_dir)?.matcher;
            if let Some(t) = threshold {
                if !(0.0..=1.0).contains(&t) {
                    bail!("--threshold must be within 0.0-1.0, got {}", t);
                }
                matcher_config.fuzzy_threshold = t;
            }
            let name = strategy.unwrap_or_else(|| matcher_config.strategy.clone());
            let outcome = matcher::create(&name, &matcher_config)?.evaluate(&expected, &actual);
            match outcome.score {
                Some(score) => println!("{} {} (score {:.3})", outcome.status(), outcome.strategy, score),
                None => println!("{} {}", outcome.status(), outcome.strategy),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { force } => init_config(&cli.config, force),
    }
}

fn validate(config: &ValidatorConfig, output: Option<&Path>, strict: bool) -> Result<ExitCode> {
    let protocol = ProtocolStore::load(&paths::protocol_file(config))?;
    let coordinates = CoordinateStore::load(&paths::coordinates_file(config))?;
    let expected = ExpectedStringStore::load(
        &paths::expected_strings_dir(config),
        &config.source_locale,
        &config.locale,
    )?;

    let extractor = ocr::create_extractor(config)?;
    let mut validator = Validator::from_config(config, extractor)?;
    validator.add_observer(Box::new(LoggingObserver));
    validator.add_observer(Box::new(ProgressObserver::stdout()));

    let records = validator.validate(&protocol, &coordinates, &expected, &config.locale)?;

    paths::ensure_output_dir(config)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;
    let written = report::write_reports(config, &config.report_formats, output, &records)?;

    let summary = Summary::from_rows(&report::rows_from_records(&records));
    if config.chart {
        let chart_path = paths::chart_file(config);
        let title = format!("Validation results: {}", config.locale);
        match chart::render_status_chart(&summary, &title, &chart_path) {
            Ok(()) => info!("Wrote chart to {}", chart_path.display()),
            Err(e) => warn!("Chart not written: {:#}", e),
        }
    }

    println!();
    print!("{}", summary);
    for path in &written {
        println!("Report: {}", path.display());
    }

    if strict && !summary.all_passed() {
        return Ok(ExitCode::from(EXIT_NOT_ALL_PASSED));
    }
    Ok(ExitCode::SUCCESS)
}

fn annotate(config: &ValidatorConfig, missing: bool) -> Result<ExitCode> {
    let coordinates_path = paths::coordinates_file(config);
    let existing = CoordinateStore::load(&coordinates_path)?;
    let screenshots_dir = paths::screenshots_dir(config);

    let protocol_path = paths::protocol_file(config);
    let protocol = if missing || protocol_path.exists() {
        Some(ProtocolStore::load(&protocol_path)?)
    } else {
        None
    };

    let stdin = io::stdin();
    let mut session = AnnotationSession::new(stdin.lock(), io::stdout(), &coordinates_path, &existing)?;
    if let Some(protocol) = &protocol {
        session = session.with_protocol(protocol);
    }

    let stats = if let Some(protocol) = protocol.as_ref().filter(|_| missing) {
        let locator = ScreenshotLocator::new(&screenshots_dir);
        session.annotate_missing(protocol, &locator)?
    } else {
        let files = screenshots::list_images(&screenshots_dir)
            .with_context(|| format!("Cannot read screenshots in {}", screenshots_dir.display()))?;
        if files.is_empty() {
            bail!("No screenshots found in {}", screenshots_dir.display());
        }
        session.annotate_screens(&files)?
    };

    println!(
        "\n{} regions added, {} skipped. Coordinates: {}",
        stats.added,
        stats.skipped,
        coordinates_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn init_config(path: &Path, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ValidatorConfig::default().save(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(ExitCode::SUCCESS)
}
