//! Monte-Carlo sweeps
//!
//! A sweep evaluates a [`Trial`] for every swept value and every seed. Each seed draws its own
//! random train/validation split, so the accuracies of one value form an empirical distribution
//! whose mean is used to pick the best value.
//!
//! The split only depends on the seed. Two sweeps over the same dataset and seeds therefore see
//! exactly the same splits, which makes the accuracies of different axes comparable.
use std::borrow::Borrow;
use std::fmt;

use linfa::dataset::Records;
use linfa::Dataset;
use log::{debug, trace};
use ndarray::{s, Array1, Ix1};
use rand::{rngs::StdRng, SeedableRng};

use crate::error::{Error, Result};

/// Training and validation part of a dataset
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset<f64, usize, Ix1>,
    pub valid: Dataset<f64, usize, Ix1>,
}

/// Shuffle the dataset with `seed` and split off `validation_ratio` of the rows
///
/// The validation part receives `ceil(n * validation_ratio)` rows, the training part the rest.
/// Both parts must hold at least one row.
pub fn split(
    dataset: &Dataset<f64, usize, Ix1>,
    seed: u64,
    validation_ratio: f64,
) -> Result<Split> {
    let n_samples = dataset.nsamples();
    let n_valid = (validation_ratio * n_samples as f64).ceil() as usize;
    let n_train = n_samples.saturating_sub(n_valid);
    if n_valid == 0 || n_train == 0 {
        return Err(Error::Parameters(format!(
            "cannot split {} samples into {} training and {} validation samples",
            n_samples, n_train, n_valid
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let shuffled = dataset.shuffle(&mut rng);
    let train = Dataset::new(
        shuffled.records.slice(s![..n_train, ..]).to_owned(),
        shuffled.targets.slice(s![..n_train]).to_owned(),
    );
    let valid = Dataset::new(
        shuffled.records.slice(s![n_train.., ..]).to_owned(),
        shuffled.targets.slice(s![n_train..]).to_owned(),
    );

    Ok(Split { train, valid })
}

/// Fit a model on the training part of a split and score it on the validation part
///
/// Any random source used by a trial must be seeded from `seed`.
pub trait Trial<V> {
    fn score(&self, split: Split, value: &V, seed: u64) -> Result<f64>;
}

impl<V, T> Trial<V> for T
where
    T: Fn(Split, &V, u64) -> Result<f64>,
{
    fn score(&self, split: Split, value: &V, seed: u64) -> Result<f64> {
        self(split, value, seed)
    }
}

/// Accuracies of a single swept value, one per seed
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult<V> {
    pub value: V,
    pub accuracies: Array1<f64>,
    pub mean: f64,
}

impl<V> SweepResult<V> {
    pub fn new(value: V, accuracies: Array1<f64>) -> Result<Self> {
        let mean = accuracies.mean().ok_or_else(|| {
            Error::Parameters("a sweep result needs at least one accuracy".into())
        })?;

        Ok(SweepResult {
            value,
            accuracies,
            mean,
        })
    }

    /// Accuracies scaled to percent
    pub fn percentages(&self) -> Vec<f64> {
        self.accuracies.iter().map(|a| 100.0 * a).collect()
    }
}

/// The best value of a sweep
#[derive(Debug, Clone, PartialEq)]
pub struct BestOf<V> {
    pub value: V,
    pub mean: f64,
    pub accuracies: Array1<f64>,
    /// Position of the value in sweep order
    pub index: usize,
}

/// Results of a sweep in sweep order
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResults<V> {
    results: Vec<SweepResult<V>>,
}

impl<V> Default for SweepResults<V> {
    fn default() -> Self {
        SweepResults {
            results: Vec::new(),
        }
    }
}

impl<V> SweepResults<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: SweepResult<V>) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SweepResult<V>> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[SweepResult<V>] {
        &self.results
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.results.iter().map(|result| &result.value)
    }

    /// Mean accuracy of every value
    pub fn means(&self) -> Array1<f64> {
        self.results.iter().map(|result| result.mean).collect()
    }
}

impl<V: Clone> SweepResults<V> {
    pub fn best(&self) -> Result<BestOf<V>> {
        select_best(self)
    }
}

impl<V> FromIterator<SweepResult<V>> for SweepResults<V> {
    fn from_iter<I: IntoIterator<Item = SweepResult<V>>>(iter: I) -> Self {
        SweepResults {
            results: iter.into_iter().collect(),
        }
    }
}

impl<'a, V> IntoIterator for &'a SweepResults<V> {
    type Item = &'a SweepResult<V>;
    type IntoIter = std::slice::Iter<'a, SweepResult<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Value with the highest mean accuracy
///
/// The first maximal value in sweep order wins ties. Values with a NaN mean are skipped.
pub fn select_best<V: Clone>(results: &SweepResults<V>) -> Result<BestOf<V>> {
    let mut best: Option<(usize, &SweepResult<V>)> = None;
    for (index, result) in results.iter().enumerate() {
        if result.mean.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if result.mean <= current.mean => {}
            _ => best = Some((index, result)),
        }
    }

    best.map(|(index, result)| BestOf {
        value: result.value.clone(),
        mean: result.mean,
        accuracies: result.accuracies.clone(),
        index,
    })
    .ok_or(Error::EmptySweep)
}

/// Repeated random sub-sampling over a fixed list of seeds
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarlo {
    seeds: Vec<u64>,
    validation_ratio: f64,
}

impl MonteCarlo {
    pub fn new(seeds: Vec<u64>, validation_ratio: f64) -> Result<Self> {
        if seeds.is_empty() {
            return Err(Error::Parameters("a sweep needs at least one seed".into()));
        }
        if !(validation_ratio > 0.0 && validation_ratio < 1.0) {
            return Err(Error::Parameters(format!(
                "validation ratio should be in (0, 1), but was {}",
                validation_ratio
            )));
        }

        Ok(MonteCarlo {
            seeds,
            validation_ratio,
        })
    }

    pub fn seeds(&self) -> &[u64] {
        &self.seeds
    }

    pub fn validation_ratio(&self) -> f64 {
        self.validation_ratio
    }

    /// Sweep `values` on a single dataset
    ///
    /// `observer` receives every finished result before the next value is evaluated.
    pub fn run<V, T, O>(
        &self,
        dataset: &Dataset<f64, usize, Ix1>,
        values: &[V],
        trial: &T,
        observer: O,
    ) -> Result<SweepResults<V>>
    where
        V: Clone + fmt::Display,
        T: Trial<V> + ?Sized,
        O: FnMut(&SweepResult<V>) -> Result<()>,
    {
        self.run_with_loader(values, |_| Ok(dataset), trial, observer)
    }

    /// Sweep `values` where every value brings its own dataset
    pub fn run_with_loader<V, D, L, T, O>(
        &self,
        values: &[V],
        mut loader: L,
        trial: &T,
        mut observer: O,
    ) -> Result<SweepResults<V>>
    where
        V: Clone + fmt::Display,
        D: Borrow<Dataset<f64, usize, Ix1>>,
        L: FnMut(&V) -> Result<D>,
        T: Trial<V> + ?Sized,
        O: FnMut(&SweepResult<V>) -> Result<()>,
    {
        let mut results = SweepResults::new();
        for value in values {
            let dataset = loader(value)?;
            let dataset: &Dataset<f64, usize, Ix1> = dataset.borrow();

            let mut accuracies = Array1::zeros(self.seeds.len());
            for (accuracy, &seed) in accuracies.iter_mut().zip(&self.seeds) {
                let split = split(dataset, seed, self.validation_ratio)?;
                *accuracy = trial.score(split, value, seed)?;
                if !accuracy.is_finite() {
                    return Err(Error::Parameters(format!(
                        "value {} seed {} scored a non-finite accuracy",
                        value, seed
                    )));
                }
                trace!("value {} seed {}: accuracy {:.4}", value, seed, accuracy);
            }

            let result = SweepResult::new(value.clone(), accuracies)?;
            debug!("value {}: mean accuracy {:.4}", value, result.mean);
            observer(&result)?;
            results.push(result);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::two_class_blobs;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn result(value: usize, accuracies: Array1<f64>) -> SweepResult<usize> {
        SweepResult::new(value, accuracies).unwrap()
    }

    #[test]
    fn best_of_known_means() {
        let results: SweepResults<usize> = vec![
            result(2, array![0.6, 0.8]),
            result(5, array![0.9, 0.94]),
            result(8, array![0.85, 0.85]),
        ]
        .into_iter()
        .collect();

        let best = select_best(&results).unwrap();
        assert_eq!(best.value, 5);
        assert_eq!(best.index, 1);
        assert_abs_diff_eq!(best.mean, 0.92, epsilon = 1e-12);
        assert_eq!(best.accuracies, array![0.9, 0.94]);
    }

    #[test]
    fn ties_go_to_first_value() {
        let results: SweepResults<usize> = vec![
            result(3, array![0.8, 0.8]),
            result(7, array![0.7, 0.9]),
        ]
        .into_iter()
        .collect();

        let best = results.best().unwrap();
        assert_eq!(best.value, 3);
        assert_eq!(best.index, 0);
    }

    #[test]
    fn empty_sweep_has_no_best() {
        let results = SweepResults::<usize>::new();
        assert!(matches!(select_best(&results), Err(Error::EmptySweep)));
    }

    #[test]
    fn nan_means_are_never_selected() {
        let results: SweepResults<usize> = vec![
            result(1, array![0.6]),
            result(2, array![f64::NAN]),
            result(3, array![0.5]),
        ]
        .into_iter()
        .collect();
        assert_eq!(select_best(&results).unwrap().value, 1);

        let only_nan: SweepResults<usize> = vec![result(1, array![f64::NAN])].into_iter().collect();
        assert!(matches!(select_best(&only_nan), Err(Error::EmptySweep)));
    }

    fn zeros(n_samples: usize) -> Dataset<f64, usize, Ix1> {
        Dataset::new(Array2::zeros((n_samples, 2)), Array1::zeros(n_samples))
    }

    #[test]
    fn validation_part_is_rounded_up() {
        let split_351 = split(&zeros(351), 1, 0.2).unwrap();
        assert_eq!(split_351.train.nsamples(), 280);
        assert_eq!(split_351.valid.nsamples(), 71);

        let split_4 = split(&zeros(4), 1, 0.2).unwrap();
        assert_eq!(split_4.train.nsamples(), 3);
        assert_eq!(split_4.valid.nsamples(), 1);
    }

    #[test]
    fn splits_need_rows_on_both_sides() {
        assert!(matches!(split(&zeros(1), 1, 0.2), Err(Error::Parameters(_))));
        assert!(split(&zeros(0), 1, 0.2).is_err());
    }

    #[test]
    fn tiny_datasets_never_score_nan() {
        let engine = MonteCarlo::new(vec![1, 2], 0.2).unwrap();
        let trial = |split: Split, _value: &usize, _seed: u64| -> Result<f64> {
            Ok(split.valid.nsamples() as f64)
        };
        let results = engine.run(&zeros(4), &[1usize], &trial, |_| Ok(())).unwrap();
        assert_eq!(results.as_slice()[0].accuracies, array![1.0, 1.0]);

        let nan_trial =
            |_split: Split, _value: &usize, _seed: u64| -> Result<f64> { Ok(f64::NAN) };
        assert!(engine
            .run(&zeros(10), &[1usize], &nan_trial, |_| Ok(()))
            .is_err());
    }

    #[test]
    fn splits_depend_only_on_the_seed() {
        let mut rng = StdRng::seed_from_u64(1);
        let dataset = two_class_blobs(50, 2, 1.0, &mut rng);

        let a = split(&dataset, 17, 0.2).unwrap();
        let b = split(&dataset, 17, 0.2).unwrap();
        let c = split(&dataset, 18, 0.2).unwrap();
        assert_eq!(a.train.nsamples(), 80);
        assert_eq!(a.valid.nsamples(), 20);
        assert_eq!(a.train.records, b.train.records);
        assert_eq!(a.valid.targets, b.valid.targets);
        assert_ne!(a.train.records, c.train.records);
    }

    #[test]
    fn every_seed_is_scored() {
        let mut rng = StdRng::seed_from_u64(2);
        let dataset = two_class_blobs(10, 2, 1.0, &mut rng);
        let engine = MonteCarlo::new(vec![1, 2, 3, 4], 0.2).unwrap();

        let trial = |_split: Split, value: &usize, seed: u64| -> Result<f64> {
            Ok((*value as f64 + seed as f64) / 10.0)
        };
        let mut observed = Vec::new();
        let results = engine
            .run(&dataset, &[1usize, 3], &trial, |result| {
                observed.push(result.value);
                Ok(())
            })
            .unwrap();

        assert_eq!(observed, vec![1, 3]);
        assert_eq!(results.len(), 2);
        assert_eq!(results.as_slice()[0].accuracies, array![0.2, 0.3, 0.4, 0.5]);
        assert_abs_diff_eq!(results.as_slice()[1].mean, 0.55, epsilon = 1e-12);
        assert_eq!(results.values().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn trial_errors_abort_the_sweep() {
        let mut rng = StdRng::seed_from_u64(3);
        let dataset = two_class_blobs(10, 2, 1.0, &mut rng);
        let engine = MonteCarlo::new(vec![1, 2], 0.2).unwrap();

        let trial = |_split: Split, value: &usize, _seed: u64| -> Result<f64> {
            if *value > 1 {
                Err(Error::Parameters("too large".into()))
            } else {
                Ok(1.0)
            }
        };
        let mut calls = 0;
        let outcome = engine.run(&dataset, &[1usize, 2, 3], &trial, |_| {
            calls += 1;
            Ok(())
        });

        assert!(outcome.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn loader_is_called_per_value() {
        let engine = MonteCarlo::new(vec![5], 0.5).unwrap();
        let trial = |split: Split, _value: &usize, _seed: u64| -> Result<f64> {
            Ok(split.train.nsamples() as f64)
        };

        let results = engine
            .run_with_loader(
                &[2usize, 4],
                |&size| {
                    let mut rng = StdRng::seed_from_u64(0);
                    Ok(two_class_blobs(size, 2, 1.0, &mut rng))
                },
                &trial,
                |_| Ok(()),
            )
            .unwrap();

        assert_eq!(results.means(), array![2.0, 4.0]);
    }

    #[test]
    fn invalid_engines() {
        assert!(MonteCarlo::new(vec![], 0.2).is_err());
        assert!(MonteCarlo::new(vec![1], 0.0).is_err());
        assert!(MonteCarlo::new(vec![1], 1.0).is_err());
    }
}
