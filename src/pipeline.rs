//! The complete analysis
//!
//! Every dataset is swept over depth first. The best depth is then kept fixed while the label
//! noise and the number of principal components are swept. Once all datasets are done, the best
//! depth of each base dataset is used for its multiplicity comparisons.
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use linfa::dataset::Records;
use linfa::Dataset;
use log::{info, warn};
use ndarray::Ix1;

use crate::config::{DatasetConfig, MultiplicityComparison, MultiplicityLevel, SweepConfig};
use crate::dataset::{base_label, dataset_stem, load_csv};
use crate::error::{Error, Result};
use crate::factor::Factor;
use crate::report::Reporter;
use crate::sweep::{BestOf, MonteCarlo, SweepResult, SweepResults, Trial};
use crate::trial::{DepthTrial, FixedDepthTrial, LabelNoiseTrial, ProjectionTrial};

/// Comparisons with fewer values are drawn as one histogram per value
const MIN_BOXPLOT_VALUES: usize = 4;

/// Best depth of every base dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BestDepthTable {
    depths: BTreeMap<String, usize>,
}

impl BestDepthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the best depth of a base dataset, replacing an earlier entry
    pub fn insert(&mut self, label: impl Into<String>, depth: usize) {
        let label = label.into();
        if let Some(previous) = self.depths.insert(label.clone(), depth) {
            warn!(
                "best depth {} of `{}` replaces the earlier {}",
                depth, label, previous
            );
        }
    }

    pub fn get(&self, label: &str) -> Result<usize> {
        self.depths
            .get(label)
            .copied()
            .ok_or_else(|| Error::UnknownBaseDataset(label.to_string()))
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.depths.iter().map(|(label, depth)| (label.as_str(), *depth))
    }
}

impl fmt::Display for BestDepthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (label, depth)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", label, depth)?;
        }
        write!(f, "}}")
    }
}

/// Results of one factor
#[derive(Debug, Clone, PartialEq)]
pub struct FactorReport<V> {
    pub factor: Factor,
    pub results: SweepResults<V>,
    pub best: BestOf<V>,
    /// Path of the figure comparing all values
    pub figure: PathBuf,
}

/// Results of the three sweeps on one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetReport {
    pub path: PathBuf,
    pub base_label: String,
    pub output_dir: PathBuf,
    pub depth: FactorReport<usize>,
    pub outliers: FactorReport<usize>,
    pub components: FactorReport<usize>,
}

/// Results of one multiplicity comparison
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplicityReport {
    pub group: String,
    pub base_label: String,
    pub depth: usize,
    pub output_dir: PathBuf,
    pub multiplicity: FactorReport<MultiplicityLevel>,
}

/// Everything computed by [`run`]
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub datasets: Vec<DatasetReport>,
    pub best_depths: BestDepthTable,
    pub multiplicity: Vec<MultiplicityReport>,
}

/// Run the complete analysis described by `config`
///
/// Figures are written as soon as a sweep finishes, so the output of completed datasets survives
/// a failure on a later one.
pub fn run(config: &SweepConfig) -> Result<AnalysisReport> {
    config.check()?;
    let engine = MonteCarlo::new(config.seeds.seeds()?, config.validation_ratio)?;
    info!(
        "{} datasets, {} seeds, {} multiplicity comparisons",
        config.datasets.len(),
        engine.seeds().len(),
        config.multiplicity.len()
    );

    let mut best_depths = BestDepthTable::new();
    let mut datasets = Vec::with_capacity(config.datasets.len());
    for dataset_config in &config.datasets {
        let report = analyse_dataset(config, &engine, dataset_config)?;
        best_depths.insert(report.base_label.clone(), report.depth.best.value);
        datasets.push(report);
    }

    println!();
    println!("Best depths: {}", best_depths);

    let mut multiplicity = Vec::with_capacity(config.multiplicity.len());
    for comparison in &config.multiplicity {
        multiplicity.push(analyse_multiplicity(
            config,
            &engine,
            comparison,
            &best_depths,
        )?);
    }

    Ok(AnalysisReport {
        datasets,
        best_depths,
        multiplicity,
    })
}

fn analyse_dataset(
    config: &SweepConfig,
    engine: &MonteCarlo,
    dataset_config: &DatasetConfig,
) -> Result<DatasetReport> {
    let path = &dataset_config.path;
    print_header(&path.display().to_string());
    info!("analysing {}", path.display());

    let dataset = load_csv(path)?;
    let n_features = dataset.nfeatures();
    if dataset_config.pca.end > n_features {
        return Err(Error::Config(format!(
            "PCA range of `{}` ends at {} components but the dataset has {} features",
            path.display(),
            dataset_config.pca.end,
            n_features
        )));
    }

    let output_dir = config.output_dir.join(dataset_stem(path));
    let reporter = Reporter::create(&output_dir, config.image_format)?;
    let forest = config.forest;
    let n_seeds = engine.seeds().len();

    let depth = sweep_factor(
        engine,
        &dataset,
        &reporter,
        Factor::Depth,
        &dataset_config.depth.values()?,
        &DepthTrial { forest },
        n_seeds,
    )?;
    let best_depth = depth.best.value;

    let outliers = sweep_factor(
        engine,
        &dataset,
        &reporter,
        Factor::Outliers,
        &config.outliers.values()?,
        &LabelNoiseTrial {
            depth: best_depth,
            forest,
        },
        n_seeds,
    )?;

    let components = sweep_factor(
        engine,
        &dataset,
        &reporter,
        Factor::Components,
        &dataset_config.pca.values()?,
        &ProjectionTrial {
            depth: best_depth,
            forest,
        },
        n_seeds,
    )?;

    Ok(DatasetReport {
        path: path.clone(),
        base_label: base_label(path),
        output_dir,
        depth,
        outliers,
        components,
    })
}

fn analyse_multiplicity(
    config: &SweepConfig,
    engine: &MonteCarlo,
    comparison: &MultiplicityComparison,
    best_depths: &BestDepthTable,
) -> Result<MultiplicityReport> {
    let label = comparison.base_label()?;
    let depth = best_depths.get(&label)?;
    print_header(&format!("{} ({}), max_depth {}", comparison.group, label, depth));
    info!(
        "multiplicity comparison `{}` over {} datasets",
        comparison.group,
        comparison.files.len()
    );

    let output_dir = config.output_dir.join("multiplicity").join(&label);
    let reporter = Reporter::create(&output_dir, config.image_format)?;
    let factor = Factor::Multiplicity;

    let results = engine.run_with_loader(
        &comparison.levels(),
        |level: &MultiplicityLevel| load_csv(&level.path),
        &FixedDepthTrial {
            depth,
            forest: config.forest,
        },
        |result| observe(&reporter, factor, result),
    )?;
    let best = results.best()?;
    println!("{}", factor.best_summary(&best.value, best.mean));

    let title = factor.aggregate_title(&comparison.group);
    let figure = if results.len() < MIN_BOXPLOT_VALUES {
        reporter.panels(factor.aggregate_stem(), &title, &results, factor)?
    } else {
        reporter.comparison(factor.aggregate_stem(), &title, &results, &best, factor)?
    };

    Ok(MultiplicityReport {
        group: comparison.group.clone(),
        base_label: label,
        depth,
        output_dir,
        multiplicity: FactorReport {
            factor,
            results,
            best,
            figure,
        },
    })
}

/// Sweep one factor, writing a histogram per value and the comparison of all values
fn sweep_factor<V, T>(
    engine: &MonteCarlo,
    dataset: &Dataset<f64, usize, Ix1>,
    reporter: &Reporter,
    factor: Factor,
    values: &[V],
    trial: &T,
    title_context: impl fmt::Display,
) -> Result<FactorReport<V>>
where
    V: Clone + fmt::Display,
    T: Trial<V>,
{
    info!("sweeping {} over {} values", factor, values.len());
    let results = engine.run(dataset, values, trial, |result| {
        observe(reporter, factor, result)
    })?;

    let best = results.best()?;
    println!("{}", factor.best_summary(&best.value, best.mean));
    let figure = reporter.comparison(
        factor.aggregate_stem(),
        &factor.aggregate_title(title_context),
        &results,
        &best,
        factor,
    )?;

    Ok(FactorReport {
        factor,
        results,
        best,
        figure,
    })
}

fn observe<V: fmt::Display>(
    reporter: &Reporter,
    factor: Factor,
    result: &SweepResult<V>,
) -> Result<()> {
    reporter.distribution(
        &factor.image_stem(&result.value),
        &factor.value_title(&result.value),
        result,
    )?;
    println!("{}", factor.summary(&result.value, result.mean));

    Ok(())
}

fn print_header(name: &str) {
    println!();
    println!("{:>18}{}", "", name);
    println!("{}", "-".repeat(84));
}
