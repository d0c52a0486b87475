//! Error types in forest-sweep
//!

use std::path::PathBuf;

use thiserror::Error;

use ndarray::ShapeError;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("invalid range {start}..={end} with step {step}: step must be positive and end must not precede start")]
    InvalidRange {
        start: usize,
        end: usize,
        step: usize,
    },
    #[error("cannot read configuration `{path}`: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration `{path}`: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cannot read dataset `{path}`: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("cannot parse dataset `{path}` into a table: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: ndarray_csv::ReadError,
    },
    #[error("dataset `{path}` is unusable: {reason}")]
    Dataset { path: PathBuf, reason: String },
    #[error("label {value} in row {row} of `{path}` is not a non-negative integer")]
    InvalidLabel {
        path: PathBuf,
        row: usize,
        value: f64,
    },
    #[error("label noise needs binary 0/1 labels, found label {0}")]
    NonBinaryLabels(usize),
    #[error("no best depth recorded for base dataset `{0}`")]
    UnknownBaseDataset(String),
    #[error("no swept value has a mean accuracy to select")]
    EmptySweep,
    #[error("cannot create output directory `{path}`: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot render `{path}`: {message}")]
    Render { path: PathBuf, message: String },
    #[error(transparent)]
    Linfa(#[from] linfa::error::Error),
    #[error(transparent)]
    Linalg(#[from] linfa_linalg::LinalgError),
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
}
