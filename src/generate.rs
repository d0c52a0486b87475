//! Utility functions for randomly generating datasets

use linfa::Dataset;
use ndarray::{concatenate, s, Array, Array1, Array2, ArrayBase, Axis, Data, Ix1};
use ndarray_rand::{
    rand::Rng,
    rand_distr::{Distribution, StandardNormal},
    RandomExt,
};

use crate::error::Result;

/// Two Gaussian blobs with labels `0` and `1`
///
/// Class `0` is centred at the origin and class `1` at `distance` along every feature axis.
/// Rows are ordered by class: the first `blob_size` rows have label `0`.
pub fn two_class_blobs(
    blob_size: usize,
    n_features: usize,
    distance: f64,
    rng: &mut impl Rng,
) -> Dataset<f64, usize, Ix1> {
    let origin = Array1::<f64>::zeros(n_features);
    let shifted = Array1::from_elem(n_features, distance);

    let mut records = Array2::zeros((2 * blob_size, n_features));
    records
        .slice_mut(s![..blob_size, ..])
        .assign(&make_blob(blob_size, &origin, StandardNormal, rng));
    records
        .slice_mut(s![blob_size.., ..])
        .assign(&make_blob(blob_size, &shifted, StandardNormal, rng));

    let targets = Array1::from_shape_fn(2 * blob_size, |i| usize::from(i >= blob_size));

    Dataset::new(records, targets)
}

/// Stack `factor` copies of every row, the multiplicity of an augmented dataset
pub fn replicate(
    dataset: &Dataset<f64, usize, Ix1>,
    factor: usize,
) -> Result<Dataset<f64, usize, Ix1>> {
    let factor = factor.max(1);
    let records = concatenate(Axis(0), &vec![dataset.records.view(); factor])?;
    let targets = concatenate(Axis(0), &vec![dataset.targets.view(); factor])?;

    Ok(Dataset::new(records, targets))
}

/// Generate `blob_size` data points (a "blob") around `blob_centroid` using the given distribution.
fn make_blob(
    blob_size: usize,
    blob_centroid: &ArrayBase<impl Data<Elem = f64>, Ix1>,
    distribution: impl Distribution<f64>,
    rng: &mut impl Rng,
) -> Array2<f64> {
    let shape = (blob_size, blob_centroid.len());
    let origin_blob: Array2<f64> = Array::random_using(shape, distribution, rng);
    origin_blob + blob_centroid
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn blobs_have_balanced_labels() {
        let mut rng = StdRng::seed_from_u64(1);
        let dataset = two_class_blobs(50, 4, 3.0, &mut rng);

        assert_eq!(dataset.records.dim(), (100, 4));
        assert_eq!(dataset.targets.iter().filter(|&&l| l == 1).count(), 50);
        assert_eq!(dataset.targets[0], 0);
        assert_eq!(dataset.targets[99], 1);
    }

    #[test]
    fn replicate_stacks_rows() {
        let mut rng = StdRng::seed_from_u64(2);
        let dataset = two_class_blobs(5, 3, 1.0, &mut rng);
        let tripled = replicate(&dataset, 3).unwrap();

        assert_eq!(tripled.records.nrows(), 30);
        assert_eq!(tripled.targets.len(), 30);
        assert_eq!(tripled.records.row(12), dataset.records.row(2));
        assert_eq!(tripled.targets[12], dataset.targets[2]);
    }
}
