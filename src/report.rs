//! Plots of sweep results
//!
//! Figures are drawn with `plotters`. SVG is always available; PNG output needs the `bitmap`
//! feature, which brings in the bitmap backend and its font rendering.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::config::ImageFormat;
use crate::error::{Error, Result};
use crate::factor::Factor;
use crate::sweep::{BestOf, SweepResult, SweepResults};

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

const NUM_BINS: usize = 20;
const FONT: &str = "sans-serif";

/// Something that can be drawn on any plotters backend
trait Figure {
    fn size(&self) -> (u32, u32);

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static;
}

/// Histogram of the accuracies of one value, in percent
struct Histogram {
    caption: String,
    percentages: Vec<f64>,
    mean: f64,
}

impl Histogram {
    fn new<V>(caption: String, result: &SweepResult<V>) -> Self {
        Histogram {
            caption,
            percentages: result.percentages(),
            mean: 100.0 * result.mean,
        }
    }

    fn draw_on<DB>(&self, area: &DrawingArea<DB, Shift>, caption_size: u32) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let (low, high) = histogram_range(&self.percentages);
        let bin_width = (high - low) / NUM_BINS as f64;
        let counts = bin_counts(&self.percentages, low, bin_width, NUM_BINS);
        let max_count = counts.iter().copied().max().unwrap_or(0) as f64;
        let y_max = max_count * 1.15 + 1.0;

        let mut chart = ChartBuilder::on(area)
            .caption(&self.caption, (FONT, caption_size).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(low..high, 0.0..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Accuracy [%]")
            .y_desc("Occurrences")
            .draw()?;

        chart.draw_series(counts.iter().enumerate().map(|(i, count)| {
            let x0 = low + i as f64 * bin_width;
            let x1 = x0 + bin_width;
            Rectangle::new([(x0, 0.0), (x1, *count as f64)], BLUE.mix(0.6).filled())
        }))?;
        chart.draw_series(counts.iter().enumerate().map(|(i, count)| {
            let x0 = low + i as f64 * bin_width;
            let x1 = x0 + bin_width;
            Rectangle::new([(x0, 0.0), (x1, *count as f64)], BLACK.stroke_width(1))
        }))?;

        chart.plotting_area().draw(&Text::new(
            format!("mean: {:.1}%", self.mean),
            (low + 0.03 * (high - low), y_max * 0.95),
            (FONT, 16).into_font(),
        ))?;

        Ok(())
    }
}

impl Figure for Histogram {
    fn size(&self) -> (u32, u32) {
        (640, 480)
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        self.draw_on(root, 22)
    }
}

/// Accuracies of every value as boxplots with the trend of the means
struct Boxplots {
    labels: Vec<String>,
    accuracies: Vec<Vec<f64>>,
    means: Vec<f64>,
    x_label: String,
}

impl Boxplots {
    fn new<V: fmt::Display>(results: &SweepResults<V>, factor: Factor) -> Self {
        Boxplots {
            labels: results.values().map(|v| v.to_string()).collect(),
            accuracies: results.iter().map(|r| r.accuracies.to_vec()).collect(),
            means: results.iter().map(|r| r.mean).collect(),
            x_label: factor.axis_label().to_string(),
        }
    }

    fn draw_on<DB>(&self, area: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let all = self.accuracies.iter().flatten().copied();
        let (low, high) = all.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
            (lo.min(a), hi.max(a))
        });
        let pad = ((high - low) * 0.1).max(0.02);
        let y_range = (low - pad) as f32..(high + pad) as f32;
        let last = self.labels.len().saturating_sub(1) as u32;

        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..last).into_segmented(), y_range)?;

        let labels = &self.labels;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&|value| match value {
                SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                    labels.get(*i as usize).cloned().unwrap_or_default()
                }
                SegmentValue::Last => String::new(),
            })
            .x_desc(self.x_label.as_str())
            .y_desc("Accuracy")
            .draw()?;

        chart.draw_series(self.accuracies.iter().enumerate().map(|(i, accuracies)| {
            let quartiles = Quartiles::new(accuracies.as_slice());
            Boxplot::new_vertical(SegmentValue::CenterOf(i as u32), &quartiles)
        }))?;

        let trend = self
            .means
            .iter()
            .enumerate()
            .map(|(i, mean)| (SegmentValue::CenterOf(i as u32), *mean as f32));
        chart.draw_series(LineSeries::new(trend.clone(), RED.mix(0.7).stroke_width(2)))?;
        chart.draw_series(trend.map(|point| Circle::new(point, 3, RED.filled())))?;

        Ok(())
    }
}

/// Best value histogram next to the boxplots of all values
struct Comparison {
    title: String,
    best: Histogram,
    all: Boxplots,
}

impl Figure for Comparison {
    fn size(&self) -> (u32, u32) {
        (1500, 420)
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let root = root.titled(&self.title, (FONT, 26))?;
        let width = root.dim_in_pixel().0 as i32;
        let (left, right) = root.split_horizontally(width * 4 / 12);

        self.best.draw_on(&left, 18)?;
        self.all.draw_on(&right)
    }
}

/// One histogram per value, side by side
struct Panels {
    title: String,
    panels: Vec<Histogram>,
}

impl Figure for Panels {
    fn size(&self) -> (u32, u32) {
        (460 * self.panels.len().max(1) as u32, 420)
    }

    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let root = root.titled(&self.title, (FONT, 26))?;
        let areas = root.split_evenly((1, self.panels.len().max(1)));
        for (panel, area) in self.panels.iter().zip(areas.iter()) {
            panel.draw_on(area, 18)?;
        }

        Ok(())
    }
}

/// Writes figures of sweep results into one directory
#[derive(Debug, Clone)]
pub struct Reporter {
    dir: PathBuf,
    format: ImageFormat,
}

impl Reporter {
    /// Create the output directory and its parents if needed
    pub fn create(dir: impl Into<PathBuf>, format: ImageFormat) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| Error::OutputDir {
            path: dir.clone(),
            source,
        })?;

        Ok(Reporter { dir, format })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Path of the image with the given stem
    pub fn path(&self, stem: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", stem, self.format.extension()))
    }

    /// Histogram of the accuracies of one value
    pub fn distribution<V>(
        &self,
        stem: &str,
        title: &str,
        result: &SweepResult<V>,
    ) -> Result<PathBuf> {
        let figure = Histogram::new(title.to_string(), result);
        self.save(stem, &figure)
    }

    /// Histogram of the best value next to boxplots of all values
    pub fn comparison<V: fmt::Display>(
        &self,
        stem: &str,
        title: &str,
        results: &SweepResults<V>,
        best: &BestOf<V>,
        factor: Factor,
    ) -> Result<PathBuf> {
        let best_result = SweepResult {
            value: &best.value,
            accuracies: best.accuracies.clone(),
            mean: best.mean,
        };
        let figure = Comparison {
            title: title.to_string(),
            best: Histogram::new(factor.best_caption(&best.value), &best_result),
            all: Boxplots::new(results, factor),
        };
        self.save(stem, &figure)
    }

    /// One histogram per value in a single row
    pub fn panels<V: fmt::Display>(
        &self,
        stem: &str,
        title: &str,
        results: &SweepResults<V>,
        factor: Factor,
    ) -> Result<PathBuf> {
        let figure = Panels {
            title: title.to_string(),
            panels: results
                .iter()
                .map(|result| Histogram::new(factor.describe(&result.value), result))
                .collect(),
        };
        self.save(stem, &figure)
    }

    fn save<F: Figure>(&self, stem: &str, figure: &F) -> Result<PathBuf> {
        let path = self.path(stem);
        let outcome = match self.format {
            ImageFormat::Svg => {
                render(SVGBackend::new(&path, figure.size()).into_drawing_area(), figure)
            }
            #[cfg(feature = "bitmap")]
            ImageFormat::Png => {
                render(BitMapBackend::new(&path, figure.size()).into_drawing_area(), figure)
            }
            #[cfg(not(feature = "bitmap"))]
            ImageFormat::Png => Err("png output needs the `bitmap` feature".into()),
        };

        outcome.map_err(|err| Error::Render {
            path: path.clone(),
            message: err.to_string(),
        })?;
        debug!("wrote {}", path.display());

        Ok(path)
    }
}

fn render<DB, F>(root: DrawingArea<DB, Shift>, figure: &F) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    F: Figure,
{
    root.fill(&WHITE)?;
    figure.draw(&root)?;
    root.present()?;

    Ok(())
}

/// Bounds of the histogram, widened when every value is the same
fn histogram_range(values: &[f64]) -> (f64, f64) {
    let (low, high) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !low.is_finite() || !high.is_finite() {
        (0.0, 100.0)
    } else if high - low < 1e-9 {
        (low - 0.5, high + 0.5)
    } else {
        (low, high)
    }
}

/// Number of values in each bin, the maximum lands in the last bin
fn bin_counts(values: &[f64], min_value: f64, bin_width: f64, num_bins: usize) -> Vec<usize> {
    let mut bins = vec![0; num_bins];
    for &value in values {
        let bin_index = ((value - min_value) / bin_width).floor() as usize;
        bins[bin_index.min(num_bins - 1)] += 1;
    }
    bins
}
