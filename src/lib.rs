//! `forest-sweep` measures how the accuracy of a random forest responds to experimental factors.
//!
//! For every dataset of a [`SweepConfig`] the analysis runs Monte-Carlo sweeps over
//!
//! * the maximum depth of the trees,
//! * the share of training labels flipped to simulate outliers,
//! * the number of principal components the features are reduced to,
//!
//! and afterwards compares replicated versions of a base dataset ("multiplicity"). Every swept
//! value is evaluated on one random train/validation split per seed. The value with the best mean
//! accuracy is selected, and the accuracy distributions are plotted to disk.
//!
//! The factors are swept greedily: the best depth is selected first and then kept fixed for the
//! remaining factors.
//!
//! ## Example
//!
//! ```no_run
//! use forest_sweep::{pipeline, SweepConfig};
//!
//! let config = SweepConfig::from_file("sweep.json")?;
//! let report = pipeline::run(&config)?;
//! for (dataset, depth) in report.best_depths.iter() {
//!     println!("{}: {}", dataset, depth);
//! }
//! # Ok::<(), forest_sweep::Error>(())
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod factor;
pub mod forest;
pub mod generate;
pub mod pca;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod sweep;
pub mod tree;
pub mod trial;

pub use config::SweepConfig;
pub use error::{Error, Result};
pub use forest::{RandomForest, RandomForestParams};
pub use pipeline::{AnalysisReport, BestDepthTable};
