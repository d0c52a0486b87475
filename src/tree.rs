//! Classification trees
//!
//! CART trees grown with the Gini impurity. Class frequencies live in ordered maps, so the grown
//! tree and its predictions never depend on hashing order. A leaf predicts the most frequent
//! class of its samples, the smallest label on ties.
use std::cmp::Ordering;
use std::collections::BTreeMap;

use linfa::prelude::*;
use linfa::{Float, ParamGuard};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};

use crate::error::{Error, Result};

type ClassCounts = BTreeMap<usize, usize>;

/// Hyperparameters of a [`DecisionTree`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionTreeValidParams {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    min_impurity_decrease: f64,
}

impl DecisionTreeValidParams {
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    pub fn min_impurity_decrease(&self) -> f64 {
        self.min_impurity_decrease
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionTreeParams(DecisionTreeValidParams);

impl DecisionTreeParams {
    pub fn new() -> Self {
        Self(DecisionTreeValidParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_impurity_decrease: 1e-5,
        })
    }

    /// Sets the optional limit to the depth of the decision tree
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.0.max_depth = max_depth;
        self
    }

    /// Sets the minimum number of samples required to split a node
    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.0.min_samples_split = min_samples_split;
        self
    }

    /// Sets the minimum number of samples required in each child of a split
    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.0.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Sets the minimum Gini decrease a split has to achieve
    pub fn min_impurity_decrease(mut self, min_impurity_decrease: f64) -> Self {
        self.0.min_impurity_decrease = min_impurity_decrease;
        self
    }
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamGuard for DecisionTreeParams {
    type Checked = DecisionTreeValidParams;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.max_depth == Some(0) {
            Err(Error::Parameters("maximum depth must be positive".into()))
        } else if self.0.min_samples_split < 2 {
            Err(Error::Parameters(format!(
                "minimum samples to split should be at least 2, but was {}",
                self.0.min_samples_split
            )))
        } else if self.0.min_samples_leaf == 0 {
            Err(Error::Parameters(
                "minimum samples per leaf must be positive".into(),
            ))
        } else if !(self.0.min_impurity_decrease >= 0.0) {
            Err(Error::Parameters(format!(
                "minimum impurity decrease should be non-negative, but was {}",
                self.0.min_impurity_decrease
            )))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TreeNode<F> {
    Leaf {
        prediction: usize,
    },
    Split {
        feature: usize,
        threshold: F,
        left: Box<TreeNode<F>>,
        right: Box<TreeNode<F>>,
    },
}

impl<F: Float> TreeNode<F> {
    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn num_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.num_leaves() + right.num_leaves(),
        }
    }
}

/// A fitted classification tree
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree<F> {
    root: TreeNode<F>,
    num_features: usize,
}

impl<F: Float> DecisionTree<F> {
    pub fn params() -> DecisionTreeParams {
        DecisionTreeParams::new()
    }

    /// Length of the longest path from the root to a leaf
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn num_leaves(&self) -> usize {
        self.root.num_leaves()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    fn predict_row(&self, row: ArrayView1<F>) -> usize {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { prediction } => return *prediction,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Best split found for a node
struct Candidate<F> {
    feature: usize,
    threshold: F,
    impurity: f64,
}

impl DecisionTreeValidParams {
    fn grow<F: Float>(
        &self,
        records: &Array2<F>,
        targets: &Array1<usize>,
        rows: Vec<usize>,
        depth: usize,
    ) -> TreeNode<F> {
        let counts = class_counts(targets, &rows);
        let prediction = modal_class(&counts);

        let at_max_depth = self.max_depth.map_or(false, |max_depth| depth >= max_depth);
        if rows.len() < self.min_samples_split || counts.len() < 2 || at_max_depth {
            return TreeNode::Leaf { prediction };
        }

        let best = match self.best_split(records, targets, &rows, &counts) {
            Some(best) => best,
            None => return TreeNode::Leaf { prediction },
        };
        if gini_impurity(&counts, rows.len()) - best.impurity < self.min_impurity_decrease {
            return TreeNode::Leaf { prediction };
        }

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&row| records[(row, best.feature)] <= best.threshold);
        if left.is_empty() || right.is_empty() {
            return TreeNode::Leaf { prediction };
        }

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(records, targets, left, depth + 1)),
            right: Box::new(self.grow(records, targets, right, depth + 1)),
        }
    }

    fn best_split<F: Float>(
        &self,
        records: &Array2<F>,
        targets: &Array1<usize>,
        rows: &[usize],
        counts: &ClassCounts,
    ) -> Option<Candidate<F>> {
        let n_samples = rows.len();
        let mut best: Option<Candidate<F>> = None;

        for feature in 0..records.ncols() {
            let mut sorted = rows.to_vec();
            sorted.sort_by(|&a, &b| {
                records[(a, feature)]
                    .partial_cmp(&records[(b, feature)])
                    .unwrap_or(Ordering::Equal)
            });

            // move the samples one by one from the right to the left side
            let mut left = ClassCounts::new();
            let mut right = counts.clone();
            for i in 0..n_samples - 1 {
                let label = targets[sorted[i]];
                *left.entry(label).or_insert(0) += 1;
                if let Some(count) = right.get_mut(&label) {
                    *count -= 1;
                }

                let value = records[(sorted[i], feature)];
                let next = records[(sorted[i + 1], feature)];
                // equal values end up on the same side
                if next <= value {
                    continue;
                }

                let n_left = i + 1;
                let n_right = n_samples - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let impurity = (n_left as f64 * gini_impurity(&left, n_left)
                    + n_right as f64 * gini_impurity(&right, n_right))
                    / n_samples as f64;
                if best.as_ref().map_or(true, |best| impurity < best.impurity) {
                    best = Some(Candidate {
                        feature,
                        threshold: (value + next) / F::cast(2.0),
                        impurity,
                    });
                }
            }
        }

        best
    }
}

impl<F: Float> Fit<Array2<F>, Array1<usize>, Error> for DecisionTreeValidParams {
    type Object = DecisionTree<F>;

    fn fit(&self, dataset: &DatasetBase<Array2<F>, Array1<usize>>) -> Result<Self::Object> {
        if dataset.nsamples() == 0 {
            return Err(linfa::error::Error::NotEnoughSamples.into());
        }

        let rows = (0..dataset.nsamples()).collect();
        let root = self.grow(&dataset.records, &dataset.targets, rows, 0);

        Ok(DecisionTree {
            root,
            num_features: dataset.nfeatures(),
        })
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array1<usize>>
    for DecisionTree<F>
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<usize>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of outputs."
        );

        for (row, target) in x.rows().into_iter().zip(y.iter_mut()) {
            *target = self.predict_row(row);
        }
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<usize> {
        Array1::zeros(x.nrows())
    }
}

fn class_counts(targets: &Array1<usize>, rows: &[usize]) -> ClassCounts {
    let mut counts = ClassCounts::new();
    for &row in rows {
        *counts.entry(targets[row]).or_insert(0) += 1;
    }
    counts
}

/// Most frequent class, the smallest label on ties
fn modal_class(counts: &ClassCounts) -> usize {
    let mut winner = (0, 0);
    for (&label, &count) in counts {
        if count > winner.1 {
            winner = (label, count);
        }
    }
    winner.0
}

/// One minus the sum of the squared class probabilities
fn gini_impurity(counts: &ClassCounts, n_samples: usize) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n_samples = n_samples as f64;
    let purity: f64 = counts
        .values()
        .map(|&count| count as f64 / n_samples)
        .map(|p| p * p)
        .sum();

    1.0 - purity
}
