//! Random Forest Classifier
//!
//! An ensemble of decision trees, each trained on a bootstrap sample of the rows and a random
//! subspace of the features. Predictions are the majority vote of the trees; ties go to the
//! smallest label so that predictions never depend on iteration order.

use std::collections::BTreeMap;

use linfa::prelude::*;
use linfa::{Float, ParamGuard};
use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};
use serde_crate::Deserialize;

use crate::error::{Error, Result};
use crate::tree::{DecisionTree, DecisionTreeParams};

/// Number of features offered to every tree
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`
    Sqrt,
    /// every feature
    All,
    /// `floor(fraction * n_features)`
    Fraction(f64),
}

impl MaxFeatures {
    /// Size of the feature subspace, at least one
    pub fn count(&self, n_features: usize) -> usize {
        let count = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fraction(fraction) => (n_features as f64 * fraction).floor() as usize,
        };

        count.clamp(1, n_features.max(1))
    }
}

/// A fitted random forest
#[derive(Debug, Clone)]
pub struct RandomForest<F: Float> {
    trees: Vec<DecisionTree<F>>,
    features: Vec<Vec<usize>>,
}

impl<F: Float> RandomForest<F> {
    pub fn params() -> RandomForestParams {
        RandomForestParams::new()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Feature indices each tree was trained on
    pub fn feature_subsets(&self) -> &[Vec<usize>] {
        &self.features
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestValidParams {
    n_trees: usize,
    max_depth: Option<usize>,
    max_features: MaxFeatures,
    bootstrap_proportion: f64,
    seed: u64,
}

impl RandomForestValidParams {
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    pub fn bootstrap_proportion(&self) -> f64 {
        self.bootstrap_proportion
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Unchecked random forest hyperparameters
///
/// Defaults: 100 trees, unlimited depth, `sqrt` features per tree, bootstrap samples as large as
/// the training set, seed 42.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestParams(RandomForestValidParams);

impl RandomForestParams {
    pub fn new() -> Self {
        Self(RandomForestValidParams {
            n_trees: 100,
            max_depth: None,
            max_features: MaxFeatures::Sqrt,
            bootstrap_proportion: 1.0,
            seed: 42,
        })
    }

    pub fn n_trees(mut self, n_trees: usize) -> Self {
        self.0.n_trees = n_trees;
        self
    }

    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.0.max_depth = max_depth;
        self
    }

    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.0.max_features = max_features;
        self
    }

    pub fn bootstrap_proportion(mut self, proportion: f64) -> Self {
        self.0.bootstrap_proportion = proportion;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamGuard for RandomForestParams {
    type Checked = RandomForestValidParams;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.n_trees == 0 {
            Err(Error::Parameters("number of trees must be positive".into()))
        } else if self.0.max_depth == Some(0) {
            Err(Error::Parameters("maximum depth must be positive".into()))
        } else if self.0.bootstrap_proportion > 1.0 || self.0.bootstrap_proportion <= 0.0 {
            Err(Error::Parameters(format!(
                "bootstrap proportion should be in (0, 1], but was {}",
                self.0.bootstrap_proportion
            )))
        } else if let MaxFeatures::Fraction(fraction) = self.0.max_features {
            if fraction > 0.0 && fraction <= 1.0 {
                Ok(&self.0)
            } else {
                Err(Error::Parameters(format!(
                    "feature fraction should be in (0, 1], but was {}",
                    fraction
                )))
            }
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

impl<F: Float> Fit<Array2<F>, Array1<usize>, Error> for RandomForestValidParams {
    type Object = RandomForest<F>;

    fn fit(&self, dataset: &DatasetBase<Array2<F>, Array1<usize>>) -> Result<Self::Object> {
        let n_samples = dataset.nsamples();
        let n_features = dataset.nfeatures();
        if n_samples == 0 {
            return Err(linfa::error::Error::NotEnoughSamples.into());
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let bootstrap_size = ((n_samples as f64) * self.bootstrap_proportion).ceil() as usize;
        let n_sub = self.max_features.count(n_features);

        let mut trees = Vec::with_capacity(self.n_trees);
        let mut features = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            // rows with replacement
            let rows: Vec<usize> = (0..bootstrap_size)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();
            // features without replacement
            let mut selected = sample(&mut rng, n_features, n_sub).into_vec();
            selected.sort_unstable();

            let records = dataset
                .records
                .select(Axis(0), &rows)
                .select(Axis(1), &selected);
            let targets = dataset.targets.select(Axis(0), &rows);
            let tree = DecisionTreeParams::new()
                .max_depth(self.max_depth)
                .fit(&Dataset::new(records, targets))?;

            trees.push(tree);
            features.push(selected);
        }

        Ok(RandomForest { trees, features })
    }
}

impl<F: Float> PredictInplace<Array2<F>, Array1<usize>> for RandomForest<F> {
    fn predict_inplace(&self, x: &Array2<F>, y: &mut Array1<usize>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of outputs."
        );

        let mut votes = vec![BTreeMap::new(); x.nrows()];
        for (tree, selected) in self.trees.iter().zip(&self.features) {
            let sub_x = x.select(Axis(1), selected);
            let predictions: Array1<usize> = tree.predict(&sub_x);
            for (ballot, label) in votes.iter_mut().zip(predictions.iter()) {
                *ballot.entry(*label).or_insert(0usize) += 1;
            }
        }

        for (target, ballot) in y.iter_mut().zip(votes.iter()) {
            *target = majority(ballot);
        }
    }

    fn default_target(&self, x: &Array2<F>) -> Array1<usize> {
        Array1::zeros(x.nrows())
    }
}

/// Label with the most votes, the smallest one on ties
fn majority(ballot: &BTreeMap<usize, usize>) -> usize {
    let mut winner = (0, 0);
    for (&label, &count) in ballot {
        if count > winner.1 {
            winner = (label, count);
        }
    }
    winner.0
}
