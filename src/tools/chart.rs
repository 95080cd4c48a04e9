//! Dilution chart rendering
//!
//! Draws a stock-vs-diluent bar for one dilution step and encodes it as PNG.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{DynamicImage, ImageFormat, RgbImage};
use serde::Serialize;
use thiserror::Error;

use crate::models::DilutionPlan;

// ============================================================================
// Color Constants (RGB 0-255)
// ============================================================================

const COLOR_CONTAINER: (u8, u8, u8) = (211, 211, 211); // Light grey
const COLOR_STOCK: (u8, u8, u8) = (76, 175, 80); // Green
const COLOR_DILUENT: (u8, u8, u8) = (33, 150, 243); // Blue
const COLOR_LABEL: (u8, u8, u8) = (0, 0, 0);

/// Reference canvas the layout below is expressed in
const BASE_WIDTH: f64 = 400.0;
const BASE_HEIGHT: f64 = 300.0;

pub const DEFAULT_CHART_WIDTH: u32 = 400;
pub const DEFAULT_CHART_HEIGHT: u32 = 300;
/// Largest accepted chart width or height, in pixels
pub const MAX_CHART_DIMENSION: u32 = 4096;

/// Chart error types
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Invalid volumes for chart: stock={stock}, diluent={diluent}")]
    InvalidVolumes { stock: f64, diluent: f64 },

    #[error("Invalid chart size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Drawing error: {0}")]
    Drawing(String),

    #[error("PNG encoding error: {0}")]
    Encoding(#[from] image::ImageError),

    #[error("Chart file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives one call per dilution step, in step order
pub trait StepRenderer {
    fn render(&mut self, stock_volume: f64, diluent_volume: f64, step_index: u8) -> Result<(), ChartError>;
}

/// Render every step of a plan in order
///
/// Waits `pacing` between consecutive steps; a zero duration renders
/// back-to-back.
pub async fn render_plan<R>(renderer: &mut R, plan: &DilutionPlan, pacing: Duration) -> Result<(), ChartError>
where
    R: StepRenderer + ?Sized,
{
    for (i, step) in plan.steps.iter().enumerate() {
        if i > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
        renderer.render(step.stock_volume, step.diluent_volume, step.step_index)?;
    }
    Ok(())
}

/// A chart produced by [`PngChartRenderer`]
#[derive(Debug, Clone, Serialize)]
pub struct RenderedChart {
    pub step_index: u8,
    pub stock_volume: f64,
    pub diluent_volume: f64,
    #[serde(skip)]
    pub png: Vec<u8>,
    pub file_path: Option<PathBuf>,
}

/// Renders each step to PNG bytes, optionally also writing them to a directory
#[derive(Debug)]
pub struct PngChartRenderer {
    width: u32,
    height: u32,
    output_dir: Option<PathBuf>,
    file_stem: String,
    charts: Vec<RenderedChart>,
}

impl PngChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            output_dir: None,
            file_stem: format!("dilution-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S%3f")),
            charts: Vec::new(),
        }
    }

    /// Also write every chart to `dir` as `<stem>-step<N>.png`
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn charts(&self) -> &[RenderedChart] {
        &self.charts
    }

    pub fn into_charts(self) -> Vec<RenderedChart> {
        self.charts
    }
}

impl StepRenderer for PngChartRenderer {
    fn render(&mut self, stock_volume: f64, diluent_volume: f64, step_index: u8) -> Result<(), ChartError> {
        let png = generate_step_chart(stock_volume, diluent_volume, step_index, self.width, self.height)?;

        let file_path = match &self.output_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(format!("{}-step{}.png", self.file_stem, step_index));
                std::fs::write(&path, &png)?;
                tracing::info!("Wrote step {} chart to {}", step_index, path.display());
                Some(path)
            }
            None => None,
        };

        self.charts.push(RenderedChart {
            step_index,
            stock_volume,
            diluent_volume,
            png,
            file_path,
        });
        Ok(())
    }
}

// ============================================================================
// Chart Generation (plotters)
// ============================================================================

/// Fractions of the container taken by stock and diluent
fn bar_fractions(stock_volume: f64, diluent_volume: f64) -> (f64, f64) {
    let total = stock_volume + diluent_volume;
    if total <= 0.0 {
        return (0.0, 0.0);
    }
    let stock = (stock_volume / total).clamp(0.0, 1.0);
    let diluent = (diluent_volume / total).clamp(0.0, 1.0 - stock);
    (stock, diluent)
}

/// Generate the bar chart for one step as PNG bytes
pub fn generate_step_chart(
    stock_volume: f64,
    diluent_volume: f64,
    step_index: u8,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, ChartError> {
    use plotters::prelude::*;

    if !stock_volume.is_finite() || !diluent_volume.is_finite() || stock_volume < 0.0 || diluent_volume < 0.0 {
        return Err(ChartError::InvalidVolumes {
            stock: stock_volume,
            diluent: diluent_volume,
        });
    }
    if width == 0 || height == 0 || width > MAX_CHART_DIMENSION || height > MAX_CHART_DIMENSION {
        return Err(ChartError::InvalidSize { width, height });
    }
    let buffer_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or(ChartError::InvalidSize { width, height })?;

    let sx = width as f64 / BASE_WIDTH;
    let sy = height as f64 / BASE_HEIGHT;
    let px = |x: f64, y: f64| ((x * sx).round() as i32, (y * sy).round() as i32);

    let (stock_fraction, diluent_fraction) = bar_fractions(stock_volume, diluent_volume);
    let stock_height = stock_fraction * 200.0;
    let diluent_height = diluent_fraction * 200.0;

    let rgb = |(r, g, b): (u8, u8, u8)| RGBColor(r, g, b);

    let mut buffer = vec![0u8; buffer_len];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| ChartError::Drawing(e.to_string()))?;

        // Container for the total volume
        root.draw(&Rectangle::new(
            [px(50.0, 50.0), px(350.0, 250.0)],
            rgb(COLOR_CONTAINER).filled(),
        ))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

        // Stock fills from the bottom
        if stock_height > 0.0 {
            root.draw(&Rectangle::new(
                [px(50.0, 250.0 - stock_height), px(350.0, 250.0)],
                rgb(COLOR_STOCK).filled(),
            ))
            .map_err(|e| ChartError::Drawing(e.to_string()))?;
        }

        // Diluent stacked on top of the stock
        if diluent_height > 0.0 {
            root.draw(&Rectangle::new(
                [
                    px(50.0, 250.0 - stock_height - diluent_height),
                    px(350.0, 250.0 - stock_height),
                ],
                rgb(COLOR_DILUENT).filled(),
            ))
            .map_err(|e| ChartError::Drawing(e.to_string()))?;
        }

        let font_size = (16.0 * sy).max(8.0);
        let labels = [
            (format!("Step {}:", step_index), px(10.0, 30.0 - 16.0)),
            (format!("Stock DNA: {:.2} µL", stock_volume), px(60.0, 270.0 - 16.0)),
            (format!("Diluent: {:.2} µL", diluent_volume), px(60.0, 290.0 - 16.0)),
        ];
        for (label, pos) in labels {
            let style = ("sans-serif", font_size).into_font().color(&rgb(COLOR_LABEL));
            // Labels need a system font; the bars are still useful without them
            if let Err(e) = root.draw(&Text::new(label, pos, style)) {
                tracing::warn!("Skipping chart label: {}", e);
            }
        }

        root.present().map_err(|e| ChartError::Drawing(e.to_string()))?;
    }

    let img = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| ChartError::Drawing("Failed to create image from buffer".to_string()))?;

    let mut png_bytes = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;

    Ok(png_bytes)
}
