//! Trials of the swept factors
//!
//! Every trial perturbs a split the way its factor prescribes, fits a random forest on the
//! training part and returns the accuracy on the validation part.
use linfa::prelude::*;
use log::debug;
use ndarray::{Array1, Array2, Ix1};
use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

use crate::config::ForestSettings;
use crate::error::{Error, Result};
use crate::pca::Pca;
use crate::sweep::{Split, Trial};

/// Fit a forest with `max_depth` on `train` and return its accuracy on `valid`
pub fn fit_and_score(
    train: &Dataset<f64, usize, Ix1>,
    valid: &Dataset<f64, usize, Ix1>,
    max_depth: usize,
    seed: u64,
    forest: &ForestSettings,
) -> Result<f64> {
    let model = forest.params(max_depth, seed).fit(train)?;
    let predictions: Array1<usize> = model.predict(&valid.records);
    let cm = predictions.confusion_matrix(valid)?;

    Ok(cm.accuracy() as f64)
}

/// Flip `percent` percent of the binary labels
///
/// `floor(percent * n / 100)` distinct positions are drawn from `rng` and flipped with
/// `label = 1 - label`. The input is left untouched.
pub fn flip_labels(
    labels: &Array1<usize>,
    percent: usize,
    rng: &mut impl Rng,
) -> Result<Array1<usize>> {
    if percent > 100 {
        return Err(Error::Parameters(format!(
            "cannot flip {}% of the labels",
            percent
        )));
    }

    let mut flipped = labels.to_owned();
    let n_outliers = percent * labels.len() / 100;
    if n_outliers == 0 {
        return Ok(flipped);
    }
    if let Some(&label) = labels.iter().find(|&&label| label > 1) {
        return Err(Error::NonBinaryLabels(label));
    }

    for idx in sample(rng, labels.len(), n_outliers) {
        flipped[idx] = 1 - flipped[idx];
    }

    Ok(flipped)
}

/// Sweeps the maximum depth of the trees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthTrial {
    pub forest: ForestSettings,
}

impl Trial<usize> for DepthTrial {
    fn score(&self, split: Split, depth: &usize, seed: u64) -> Result<f64> {
        fit_and_score(&split.train, &split.valid, *depth, seed, &self.forest)
    }
}

/// Sweeps the percentage of flipped training labels at a fixed depth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelNoiseTrial {
    pub depth: usize,
    pub forest: ForestSettings,
}

impl Trial<usize> for LabelNoiseTrial {
    fn score(&self, split: Split, percent: &usize, seed: u64) -> Result<f64> {
        let Split { train, valid } = split;
        let mut rng = StdRng::seed_from_u64(seed);
        let targets = flip_labels(&train.targets, *percent, &mut rng)?;
        let train = Dataset::new(train.records, targets);

        fit_and_score(&train, &valid, self.depth, seed, &self.forest)
    }
}

/// Sweeps the number of principal components kept at a fixed depth
///
/// The projection is fitted on the training features only and applied to both parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionTrial {
    pub depth: usize,
    pub forest: ForestSettings,
}

impl Trial<usize> for ProjectionTrial {
    fn score(&self, split: Split, components: &usize, seed: u64) -> Result<f64> {
        let Split { train, valid } = split;
        let pca = Pca::params(*components).fit(&train)?;
        debug!(
            "{} components explain {:.3} of the variance",
            components,
            pca.explained_variance_ratio().sum()
        );

        let train_records: Array2<f64> = pca.predict(&train.records);
        let valid_records: Array2<f64> = pca.predict(&valid.records);
        let train = Dataset::new(train_records, train.targets);
        let valid = Dataset::new(valid_records, valid.targets);

        fit_and_score(&train, &valid, self.depth, seed, &self.forest)
    }
}

/// Fits every value's data at the same depth, the swept value only selects the dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDepthTrial {
    pub depth: usize,
    pub forest: ForestSettings,
}

impl<V> Trial<V> for FixedDepthTrial {
    fn score(&self, split: Split, _value: &V, seed: u64) -> Result<f64> {
        fit_and_score(&split.train, &split.valid, self.depth, seed, &self.forest)
    }
}
