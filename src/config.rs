//! Sweep configuration
//!
//! The configuration is a JSON document naming the datasets to analyse, the ranges swept for
//! every factor, the seeds of the Monte-Carlo repetitions and where the plots are written.
//!
//! ```json
//! {
//!   "datasets": [
//!     { "path": "data/iono_x1.csv",
//!       "depth": { "start": 2, "end": 12, "step": 2 },
//!       "pca": { "start": 1, "end": 8, "step": 1 } }
//!   ],
//!   "seeds": { "low": 1, "high": 100 },
//!   "outliers": { "max": 40, "step": 5 },
//!   "output_dir": "results",
//!   "multiplicity": [
//!     { "factors": [1, 2], "files": ["data/iono_x1.csv", "data/iono_x2.csv"], "group": "ionosphere" }
//!   ]
//! }
//! ```
use std::fs;
use std::path::{Path, PathBuf};

use serde_crate::Deserialize;

use crate::dataset::base_label;
use crate::error::{Error, Result};
use crate::forest::{MaxFeatures, RandomForestParams};

/// An inclusive range of swept values
///
/// The values are `start, start + step, ...` up to `end`. When `end` does not fall on the step
/// grid it is appended as an extra point, so the declared end is always evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct ParamRange {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl ParamRange {
    pub fn new(start: usize, end: usize, step: usize) -> Self {
        ParamRange { start, end, step }
    }

    /// A range evaluating a single value
    pub fn single(value: usize) -> Self {
        ParamRange::new(value, value, 1)
    }

    pub fn check(&self) -> Result<()> {
        if self.step == 0 || self.end < self.start {
            Err(Error::InvalidRange {
                start: self.start,
                end: self.end,
                step: self.step,
            })
        } else {
            Ok(())
        }
    }

    /// Generate the swept values in increasing order
    pub fn values(&self) -> Result<Vec<usize>> {
        self.check()?;

        let mut values: Vec<usize> = (self.start..=self.end).step_by(self.step).collect();
        if values.last() != Some(&self.end) {
            values.push(self.end);
        }

        Ok(values)
    }
}

/// Inclusive range of Monte-Carlo seeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct SeedRange {
    pub low: u64,
    pub high: u64,
}

impl SeedRange {
    pub fn new(low: u64, high: u64) -> Self {
        SeedRange { low, high }
    }

    pub fn seeds(&self) -> Result<Vec<u64>> {
        if self.high < self.low {
            return Err(Error::Config(format!(
                "seed range {}..={} is empty",
                self.low, self.high
            )));
        }

        Ok((self.low..=self.high).collect())
    }
}

/// Percentages of flipped training labels, always starting at 0%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct OutlierRange {
    pub max: usize,
    pub step: usize,
}

impl OutlierRange {
    pub fn new(max: usize, step: usize) -> Self {
        OutlierRange { max, step }
    }

    pub fn range(&self) -> ParamRange {
        ParamRange::new(0, self.max, self.step)
    }

    pub fn values(&self) -> Result<Vec<usize>> {
        if self.max > 100 {
            return Err(Error::Config(format!(
                "outlier percentage {} exceeds 100",
                self.max
            )));
        }

        self.range().values()
    }
}

/// A dataset file and the ranges swept on it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub depth: ParamRange,
    pub pca: ParamRange,
}

/// Datasets of one base dataset built with different multiplicity factors
///
/// `factors` and `files` are parallel lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct MultiplicityComparison {
    pub factors: Vec<usize>,
    pub files: Vec<PathBuf>,
    pub group: String,
}

/// One point of a multiplicity comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplicityLevel {
    pub factor: usize,
    pub path: PathBuf,
}

impl std::fmt::Display for MultiplicityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.factor)
    }
}

impl MultiplicityComparison {
    pub fn check(&self) -> Result<()> {
        if self.factors.is_empty() {
            Err(Error::Config(format!(
                "multiplicity comparison `{}` has no factors",
                self.group
            )))
        } else if self.factors.len() != self.files.len() {
            Err(Error::Config(format!(
                "multiplicity comparison `{}` lists {} factors but {} files",
                self.group,
                self.factors.len(),
                self.files.len()
            )))
        } else {
            Ok(())
        }
    }

    /// Label of the base dataset, taken from the first file name
    pub fn base_label(&self) -> Result<String> {
        self.files
            .first()
            .map(|path| base_label(path))
            .ok_or_else(|| Error::Config(format!("multiplicity comparison `{}` has no files", self.group)))
    }

    pub fn levels(&self) -> Vec<MultiplicityLevel> {
        self.factors
            .iter()
            .zip(&self.files)
            .map(|(&factor, path)| MultiplicityLevel {
                factor,
                path: path.clone(),
            })
            .collect()
    }
}

/// Settings of the random forest fitted in every trial
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(crate = "serde_crate", default)]
pub struct ForestSettings {
    pub n_trees: usize,
    pub max_features: MaxFeatures,
    pub bootstrap_proportion: f64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        ForestSettings {
            n_trees: 100,
            max_features: MaxFeatures::Sqrt,
            bootstrap_proportion: 1.0,
        }
    }
}

impl ForestSettings {
    /// Forest hyperparameters for a trial with the given depth and seed
    pub fn params(&self, max_depth: usize, seed: u64) -> RandomForestParams {
        RandomForestParams::new()
            .n_trees(self.n_trees)
            .max_depth(Some(max_depth))
            .max_features(self.max_features)
            .bootstrap_proportion(self.bootstrap_proportion)
            .seed(seed)
    }
}

/// Format of the rendered images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Svg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

fn default_validation_ratio() -> f64 {
    0.2
}

/// The complete configuration of an analysis run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct SweepConfig {
    pub datasets: Vec<DatasetConfig>,
    pub seeds: SeedRange,
    pub outliers: OutlierRange,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub multiplicity: Vec<MultiplicityComparison>,
    #[serde(default)]
    pub forest: ForestSettings,
    #[serde(default = "default_validation_ratio")]
    pub validation_ratio: f64,
    #[serde(default)]
    pub image_format: ImageFormat,
}

/// One multiplicity comparison in the flat layout
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct FlatComparison {
    #[serde(rename = "M")]
    pub factors: Vec<usize>,
    #[serde(rename = "FILES")]
    pub files: Vec<PathBuf>,
    #[serde(rename = "CONJUNTO", deserialize_with = "group_name")]
    pub group: String,
}

/// Flat configuration layout with one list per range bound
///
/// ```json
/// {
///   "DATASET_FILES": ["data/iono_x1.csv"],
///   "MAX_DEPTH_MIN": [2], "MAX_DEPTH_MAX": [12], "MAX_DEPTH_STEP": [2],
///   "SEED1": 1, "SEED2": 100,
///   "OUTLIERS_PERCENT": 40, "OUTLIERS_STEP": 5,
///   "PCA1": [1], "PCA2": [8], "PCA_STEP": [1],
///   "SAVE_DIR": "results/",
///   "MULTIPLICIDAD": [
///     { "M": [1, 2], "FILES": ["data/iono_x1.csv", "data/iono_x2.csv"], "CONJUNTO": "ionosphere" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FlatConfig {
    pub dataset_files: Vec<PathBuf>,
    pub max_depth_min: Vec<usize>,
    pub max_depth_max: Vec<usize>,
    pub max_depth_step: Vec<usize>,
    #[serde(rename = "SEED1")]
    pub seed_low: u64,
    #[serde(rename = "SEED2")]
    pub seed_high: u64,
    pub outliers_percent: usize,
    pub outliers_step: usize,
    #[serde(rename = "PCA1")]
    pub pca_min: Vec<usize>,
    #[serde(rename = "PCA2")]
    pub pca_max: Vec<usize>,
    pub pca_step: Vec<usize>,
    pub save_dir: PathBuf,
    #[serde(rename = "MULTIPLICIDAD", default)]
    pub multiplicity: Vec<FlatComparison>,
}

/// Group names may be written as strings or numbers
fn group_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde_crate::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(name) => name,
        other => other.to_string(),
    })
}

impl TryFrom<FlatConfig> for SweepConfig {
    type Error = Error;

    fn try_from(flat: FlatConfig) -> Result<Self> {
        let n_datasets = flat.dataset_files.len();
        let lists = [
            ("MAX_DEPTH_MIN", flat.max_depth_min.len()),
            ("MAX_DEPTH_MAX", flat.max_depth_max.len()),
            ("MAX_DEPTH_STEP", flat.max_depth_step.len()),
            ("PCA1", flat.pca_min.len()),
            ("PCA2", flat.pca_max.len()),
            ("PCA_STEP", flat.pca_step.len()),
        ];
        if let Some((name, len)) = lists.iter().find(|(_, len)| *len != n_datasets) {
            return Err(Error::Config(format!(
                "{} lists {} entries for {} dataset files",
                name, len, n_datasets
            )));
        }

        let datasets = (0..n_datasets)
            .map(|i| DatasetConfig {
                path: flat.dataset_files[i].clone(),
                depth: ParamRange::new(
                    flat.max_depth_min[i],
                    flat.max_depth_max[i],
                    flat.max_depth_step[i],
                ),
                pca: ParamRange::new(flat.pca_min[i], flat.pca_max[i], flat.pca_step[i]),
            })
            .collect();
        let multiplicity = flat
            .multiplicity
            .into_iter()
            .map(|comparison| MultiplicityComparison {
                factors: comparison.factors,
                files: comparison.files,
                group: comparison.group,
            })
            .collect();

        Ok(SweepConfig {
            datasets,
            seeds: SeedRange::new(flat.seed_low, flat.seed_high),
            outliers: OutlierRange::new(flat.outliers_percent, flat.outliers_step),
            output_dir: flat.save_dir,
            multiplicity,
            forest: ForestSettings::default(),
            validation_ratio: default_validation_ratio(),
            image_format: ImageFormat::default(),
        })
    }
}

impl SweepConfig {
    /// Read and check a configuration file
    ///
    /// Both the nested layout and the flat upper-case layout of [`FlatConfig`] are accepted.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let format_error = |source| Error::ConfigFormat {
            path: path.to_path_buf(),
            source,
        };

        let value: serde_json::Value = serde_json::from_str(&content).map_err(format_error)?;
        let config = if value.get("DATASET_FILES").is_some() {
            let flat: FlatConfig = serde_json::from_value(value).map_err(format_error)?;
            SweepConfig::try_from(flat)?
        } else {
            serde_json::from_value(value).map_err(format_error)?
        };
        config.check()?;

        Ok(config)
    }

    /// Check ranges and parallel lists before any work is done
    pub fn check(&self) -> Result<()> {
        for dataset in &self.datasets {
            dataset.depth.check()?;
            dataset.pca.check()?;
            if dataset.depth.start == 0 {
                return Err(Error::Config(format!(
                    "depth range of `{}` starts at 0",
                    dataset.path.display()
                )));
            }
            if dataset.pca.start == 0 {
                return Err(Error::Config(format!(
                    "PCA range of `{}` starts at 0 components",
                    dataset.path.display()
                )));
            }
        }
        self.seeds.seeds()?;
        self.outliers.values()?;
        for comparison in &self.multiplicity {
            comparison.check()?;
        }
        if !(self.validation_ratio > 0.0 && self.validation_ratio < 1.0) {
            return Err(Error::Config(format!(
                "validation ratio {} is outside (0, 1)",
                self.validation_ratio
            )));
        }
        if cfg!(not(feature = "bitmap")) && self.image_format == ImageFormat::Png {
            return Err(Error::Config(
                "png output needs the `bitmap` feature, use `svg` instead".into(),
            ));
        }

        Ok(())
    }
}
