//! Principal Component Analysis
//!
//! Principal Component Analysis reduces the dimensionality of the data while retaining most of
//! the variance. The embedding is given by the leading eigenvectors of the covariance matrix of
//! the centred training records, computed with the symmetric eigensolver of `linfa-linalg`.
//!
//! # Example
//!
//! ```
//! use forest_sweep::pca::Pca;
//! use linfa::traits::{Fit, Predict};
//! use linfa::Dataset;
//! use ndarray::{array, Array1, Array2};
//!
//! let dataset = Dataset::new(
//!     array![[1., 2.], [2., 4.1], [3., 5.9], [4., 8.2]],
//!     Array1::<usize>::zeros(4),
//! );
//!
//! // project along the line which maximizes the spread of the data
//! let embedding = Pca::params(1).fit(&dataset).unwrap();
//! let reduced: Array2<f64> = embedding.predict(&dataset.records);
//! assert_eq!(reduced.ncols(), 1);
//! ```
use linfa::{
    dataset::Records,
    traits::{Fit, PredictInplace},
    DatasetBase, ParamGuard,
};
use linfa_linalg::eigh::Eigh;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2};

use crate::error::{Error, Result};

/// Pincipal Component Analysis parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcaValidParams {
    embedding_size: usize,
}

impl PcaValidParams {
    pub fn embedding_size(&self) -> usize {
        self.embedding_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcaParams(PcaValidParams);

impl ParamGuard for PcaParams {
    type Checked = PcaValidParams;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.embedding_size == 0 {
            Err(Error::Parameters(
                "PCA needs at least one component".into(),
            ))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

/// Fit a PCA model given a dataset
///
/// The records are centred with their mean; the embedding keeps the `embedding_size`
/// eigenvectors of the covariance matrix with the largest eigenvalues. Every component is
/// oriented so that its largest coefficient is positive.
impl<T, D: Data<Elem = f64>> Fit<ArrayBase<D, Ix2>, T, Error> for PcaValidParams {
    type Object = Pca;

    fn fit(&self, dataset: &DatasetBase<ArrayBase<D, Ix2>, T>) -> Result<Pca> {
        let x = dataset.records();
        let (n_samples, n_features) = (x.nsamples(), x.nfeatures());
        if n_samples == 0 {
            return Err(linfa::error::Error::NotEnoughSamples.into());
        }
        if self.embedding_size > n_features {
            return Err(Error::Parameters(format!(
                "cannot keep {} components of {} features",
                self.embedding_size, n_features
            )));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or(linfa::error::Error::NotEnoughSamples)?;
        let centered = x - &mean;
        let dof = (n_samples.max(2) - 1) as f64;
        let covariance = centered.t().dot(&centered) / dof;

        let (eigvals, eigvecs) = covariance.eigh()?;
        let mut order: Vec<usize> = (0..eigvals.len()).collect();
        order.sort_by(|&a, &b| eigvals[b].total_cmp(&eigvals[a]));
        order.truncate(self.embedding_size);

        let mut embedding = eigvecs.select(Axis(1), &order).reversed_axes();
        for mut component in embedding.rows_mut() {
            let pivot = component
                .iter()
                .copied()
                .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            if pivot < 0.0 {
                component.mapv_inplace(|v| -v);
            }
        }
        let variance = order.iter().map(|&i| eigvals[i].max(0.0)).collect();
        let total_variance = eigvals.iter().map(|v| v.max(0.0)).sum();

        Ok(Pca {
            embedding,
            variance,
            total_variance,
            mean,
        })
    }
}

/// Fitted Principal Component Analysis model
///
/// The model contains the mean and hyperplane for the projection of data.
#[derive(Debug, Clone)]
pub struct Pca {
    embedding: Array2<f64>,
    variance: Array1<f64>,
    total_variance: f64,
    mean: Array1<f64>,
}

impl Pca {
    /// Create default parameter set
    ///
    /// # Parameters
    ///
    ///  * `embedding_size`: the target dimensionality
    pub fn params(embedding_size: usize) -> PcaParams {
        PcaParams(PcaValidParams { embedding_size })
    }

    /// Number of kept components
    pub fn embedding_size(&self) -> usize {
        self.embedding.nrows()
    }

    /// Return the amount of explained variance per component
    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.variance
    }

    /// Return the fraction of the total variance explained by each component
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        if self.total_variance > 0.0 {
            &self.variance / self.total_variance
        } else {
            Array1::zeros(self.variance.len())
        }
    }
}

/// Project a matrix to lower dimensional space
///
/// The projection first centers and then projects the data.
impl<D: Data<Elem = f64>> PredictInplace<ArrayBase<D, Ix2>, Array2<f64>> for Pca {
    fn predict_inplace(&self, records: &ArrayBase<D, Ix2>, targets: &mut Array2<f64>) {
        assert_eq!(
            targets.dim(),
            (records.nrows(), self.embedding.nrows()),
            "The number of data points must match the number of outputs."
        );
        *targets = (records - &self.mean).dot(&self.embedding.t());
    }

    fn default_target(&self, records: &ArrayBase<D, Ix2>) -> Array2<f64> {
        Array2::zeros((records.nrows(), self.embedding.nrows()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::two_class_blobs;
    use approx::assert_abs_diff_eq;
    use linfa::prelude::Predict;
    use linfa::Dataset;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn dominant_direction_is_found() {
        // points along the diagonal with a little noise across it
        let records = array![
            [0.0, 0.1],
            [1.0, 0.9],
            [2.0, 2.1],
            [3.0, 2.9],
            [4.0, 4.0]
        ];
        let dataset = Dataset::new(records, Array1::<usize>::zeros(5));
        let pca = Pca::params(1).fit(&dataset).unwrap();

        let component = pca.embedding.row(0);
        assert_abs_diff_eq!(component[0], component[1], epsilon = 0.05);
        assert!(component[0] > 0.0);
        assert!(pca.explained_variance_ratio()[0] > 0.99);
    }

    #[test]
    fn full_rank_keeps_all_variance() {
        let mut rng = StdRng::seed_from_u64(9);
        let dataset = two_class_blobs(30, 4, 2.0, &mut rng);
        let pca = Pca::params(4).fit(&dataset).unwrap();

        assert_eq!(pca.embedding_size(), 4);
        assert_abs_diff_eq!(pca.explained_variance_ratio().sum(), 1.0, epsilon = 1e-9);
        let variance = pca.explained_variance();
        assert!(variance.windows(2).into_iter().all(|w| w[0] >= w[1]));

        // an orthonormal rotation keeps pairwise distances
        let projected: Array2<f64> = pca.predict(&dataset.records);
        let original = &dataset.records.row(0) - &dataset.records.row(1);
        let rotated = &projected.row(0) - &projected.row(1);
        assert_abs_diff_eq!(original.dot(&original), rotated.dot(&rotated), epsilon = 1e-8);
    }

    #[test]
    fn projection_is_centred() {
        let mut rng = StdRng::seed_from_u64(10);
        let dataset = two_class_blobs(20, 3, 5.0, &mut rng);
        let pca = Pca::params(2).fit(&dataset).unwrap();

        let projected: Array2<f64> = pca.predict(&dataset.records);
        assert_eq!(projected.dim(), (40, 2));
        for mean in projected.mean_axis(Axis(0)).unwrap().iter() {
            assert_abs_diff_eq!(*mean, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn invalid_embedding_sizes() {
        let dataset = Dataset::new(array![[1.0, 2.0], [3.0, 1.0]], array![0usize, 1]);
        assert!(Pca::params(0).fit(&dataset).is_err());
        assert!(Pca::params(3).fit(&dataset).is_err());
    }
}
