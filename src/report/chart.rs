//! Stacked PASS/FAIL/ERROR bars per screen, rendered with plotters.

use anyhow::{bail, Context, Result};
use plotters::prelude::*;
use std::path::Path;

use super::Summary;
use crate::model::Status;

const CHART_HEIGHT: u32 = 480;
const BAR_WIDTH: u32 = 90;

fn status_color(status: Status) -> RGBColor {
    match status {
        Status::Pass => RGBColor(76, 175, 80),
        Status::Fail => RGBColor(229, 57, 53),
        Status::Error => RGBColor(255, 179, 0),
    }
}

/// One stacked segment: screen index, status and its [bottom, top) range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    screen: u32,
    status: Status,
    bottom: u32,
    top: u32,
}

fn segments(summary: &Summary) -> Vec<Segment> {
    let mut segments = Vec::new();
    for (i, screen) in summary.screens.iter().enumerate() {
        let mut bottom = 0u32;
        for status in Status::ALL {
            let count = match status {
                Status::Pass => screen.passed,
                Status::Fail => screen.failed,
                Status::Error => screen.errors,
            } as u32;
            if count == 0 {
                continue;
            }
            segments.push(Segment {
                screen: i as u32,
                status,
                bottom,
                top: bottom + count,
            });
            bottom += count;
        }
    }
    segments
}

/// Renders the per-screen status chart as a PNG.
pub fn render_status_chart(summary: &Summary, title: &str, output_path: &Path) -> Result<()> {
    if summary.screens.is_empty() {
        bail!("No records to chart");
    }

    let screen_count = summary.screens.len() as u32;
    let max_total = summary.screens.iter().map(|s| s.total()).max().unwrap_or(1) as u32;
    let width = (160 + BAR_WIDTH * screen_count).clamp(480, 2400);

    let root = BitMapBackend::new(output_path, (width, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).context("Failed to fill chart background")?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..screen_count).into_segmented(), 0u32..(max_total + 1))?;

    let labels: Vec<&str> = summary.screens.iter().map(|s| s.screen_id.as_str()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Strings")
        .x_desc("Screen")
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                labels.get(*i as usize).map(|s| s.to_string()).unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .draw()?;

    let segments = segments(summary);
    for status in Status::ALL {
        let color = status_color(status);
        chart
            .draw_series(segments.iter().filter(|s| s.status == status).map(|s| {
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(s.screen), s.bottom),
                        (SegmentValue::Exact(s.screen + 1), s.top),
                    ],
                    color.filled(),
                );
                bar.set_margin(0, 0, 10, 10);
                bar
            }))?
            .label(status.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present().context("Failed to save chart")?;
    Ok(())
}
