//! Loading labeled tables
//!
//! Datasets are headerless CSV files. Every column but the last holds a numeric feature, the last
//! column holds the class label of the row.

use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use linfa::Dataset;
use ndarray::{s, Array1, Array2, Ix1};
use ndarray_csv::Array2Reader;

use crate::error::{Error, Result};

/// Read a headerless CSV file into records and `usize` labels
pub fn load_csv(path: impl AsRef<Path>) -> Result<Dataset<f64, usize, Ix1>> {
    let path = path.as_ref();
    let csv_error = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    // extract ndarray
    let array: Array2<f64> = reader
        .deserialize_array2_dynamic()
        .map_err(|source| Error::Table {
            path: path.to_path_buf(),
            source,
        })?;
    let (nrows, ncols) = array.dim();

    if nrows == 0 {
        return Err(Error::Dataset {
            path: path.to_path_buf(),
            reason: "no rows".into(),
        });
    }
    if ncols < 2 {
        return Err(Error::Dataset {
            path: path.to_path_buf(),
            reason: format!("{} column(s), need at least one feature and a label", ncols),
        });
    }

    let records = array.slice(s![.., ..ncols - 1]).to_owned();
    let targets = array
        .column(ncols - 1)
        .iter()
        .enumerate()
        .map(|(row, &value)| {
            if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
                Ok(value as usize)
            } else {
                Err(Error::InvalidLabel {
                    path: path.to_path_buf(),
                    row,
                    value,
                })
            }
        })
        .collect::<Result<Array1<usize>>>()?;

    Ok(Dataset::new(records, targets))
}

/// Write records and labels in the layout read by [`load_csv`]
pub fn save_csv(dataset: &Dataset<f64, usize, Ix1>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let csv_error = |source| Error::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_error)?;
    for (record, label) in dataset.records.rows().into_iter().zip(dataset.targets.iter()) {
        let mut fields: Vec<String> = record.iter().map(|x| x.to_string()).collect();
        fields.push(label.to_string());
        writer.write_record(&fields).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| Error::Csv {
        path: path.to_path_buf(),
        source: source.into(),
    })?;

    Ok(())
}

/// File name up to its first `.`, used to name the output directory of a dataset
pub fn dataset_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match name.split_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}

/// Stem up to its first `_`, shared by all variants of the same base dataset
pub fn base_label(path: &Path) -> String {
    let stem = dataset_stem(path);

    match stem.split_once('_') {
        Some((base, _)) => base.to_string(),
        None => stem,
    }
}
