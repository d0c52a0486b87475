use std::fs;
use std::path::Path;
use std::process::Command;

use forest_sweep::dataset::save_csv;
use forest_sweep::generate::{replicate, two_class_blobs};
use forest_sweep::{pipeline, Error, SweepConfig};
use rand::{rngs::StdRng, SeedableRng};
use serde_json::json;

fn write_blobs(path: &Path, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let dataset = two_class_blobs(50, 4, 1.5, &mut rng);
    save_csv(&dataset, path).unwrap();
}

fn write_config(dir: &Path, config: serde_json::Value) -> SweepConfig {
    let path = dir.join("sweep.json");
    fs::write(&path, config.to_string()).unwrap();
    SweepConfig::from_file(&path).unwrap()
}

fn image_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn single_dataset_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("blobs_x1.csv");
    write_blobs(&data, 1);
    let out = tmp.path().join("out");

    let config = write_config(
        tmp.path(),
        json!({
            "datasets": [
                { "path": data,
                  "depth": { "start": 2, "end": 4, "step": 1 },
                  "pca": { "start": 4, "end": 4, "step": 1 } }
            ],
            "seeds": { "low": 1, "high": 2 },
            "outliers": { "max": 0, "step": 1 },
            "output_dir": out,
            "forest": { "n_trees": 10 }
        }),
    );

    let report = pipeline::run(&config).unwrap();

    assert_eq!(
        image_names(&out.join("blobs_x1")),
        vec![
            "max_depth.svg",
            "outliers.svg",
            "pca.svg",
            "rf_d2.svg",
            "rf_d3.svg",
            "rf_d4.svg",
            "rf_n4.svg",
            "rf_o0.svg",
        ]
    );
    assert_eq!(report.best_depths.len(), 1);

    let dataset = &report.datasets[0];
    assert_eq!(dataset.base_label, "blobs");
    assert_eq!(dataset.depth.results.len(), 3);
    assert_eq!(report.best_depths.get("blobs").unwrap(), dataset.depth.best.value);
    assert_eq!(dataset.outliers.best.value, 0);
    assert_eq!(dataset.components.best.accuracies.len(), 2);
    assert!(report.multiplicity.is_empty());
}

#[test]
fn repeated_runs_are_identical() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("blobs.csv");
    write_blobs(&data, 2);

    let config = write_config(
        tmp.path(),
        json!({
            "datasets": [
                { "path": data,
                  "depth": { "start": 1, "end": 3, "step": 2 },
                  "pca": { "start": 2, "end": 3, "step": 1 } }
            ],
            "seeds": { "low": 5, "high": 7 },
            "outliers": { "max": 20, "step": 10 },
            "output_dir": tmp.path().join("out"),
            "forest": { "n_trees": 8 }
        }),
    );

    let first = pipeline::run(&config).unwrap();
    let second = pipeline::run(&config).unwrap();
    assert_eq!(first.datasets[0].depth.results, second.datasets[0].depth.results);
    assert_eq!(
        first.datasets[0].outliers.results,
        second.datasets[0].outliers.results
    );
    assert_eq!(
        first.datasets[0].components.results,
        second.datasets[0].components.results
    );
}

#[test]
fn multiplicity_uses_best_depth_of_base_dataset() {
    let tmp = tempfile::tempdir().unwrap();
    let single = tmp.path().join("blobs_x1.csv");
    let double = tmp.path().join("blobs_x2.csv");
    let mut rng = StdRng::seed_from_u64(3);
    let dataset = two_class_blobs(30, 3, 2.0, &mut rng);
    save_csv(&dataset, &single).unwrap();
    save_csv(&replicate(&dataset, 2).unwrap(), &double).unwrap();
    let out = tmp.path().join("out");

    let config = write_config(
        tmp.path(),
        json!({
            "datasets": [
                { "path": single,
                  "depth": { "start": 2, "end": 3, "step": 1 },
                  "pca": { "start": 1, "end": 2, "step": 1 } }
            ],
            "seeds": { "low": 1, "high": 2 },
            "outliers": { "max": 10, "step": 10 },
            "output_dir": out,
            "multiplicity": [
                { "factors": [1, 2], "files": [single, double], "group": "two blobs" }
            ],
            "forest": { "n_trees": 8 }
        }),
    );

    let report = pipeline::run(&config).unwrap();
    let comparison = &report.multiplicity[0];
    assert_eq!(comparison.base_label, "blobs");
    assert_eq!(comparison.depth, report.best_depths.get("blobs").unwrap());
    assert_eq!(comparison.multiplicity.results.len(), 2);

    let dir = out.join("multiplicity").join("blobs");
    assert_eq!(image_names(&dir), vec!["mul.svg", "rf_m1.svg", "rf_m2.svg"]);
    // fewer than four values are drawn side by side without a best histogram
    let figure = fs::read_to_string(dir.join("mul.svg")).unwrap();
    assert!(!figure.contains("Best: multiplicity"));
}

#[test]
fn four_multiplicities_are_compared_with_boxplots() {
    let tmp = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(6);
    let dataset = two_class_blobs(20, 3, 2.0, &mut rng);
    let files: Vec<_> = (1..=4)
        .map(|factor| {
            let path = tmp.path().join(format!("blobs_x{}.csv", factor));
            save_csv(&replicate(&dataset, factor).unwrap(), &path).unwrap();
            path
        })
        .collect();
    let out = tmp.path().join("out");

    let config = write_config(
        tmp.path(),
        json!({
            "datasets": [
                { "path": files[0],
                  "depth": { "start": 2, "end": 3, "step": 1 },
                  "pca": { "start": 3, "end": 3, "step": 1 } }
            ],
            "seeds": { "low": 1, "high": 2 },
            "outliers": { "max": 0, "step": 1 },
            "output_dir": out,
            "multiplicity": [
                { "factors": [1, 2, 3, 4], "files": files, "group": "blobs" }
            ],
            "forest": { "n_trees": 6 }
        }),
    );

    let report = pipeline::run(&config).unwrap();
    assert_eq!(report.multiplicity[0].multiplicity.results.len(), 4);

    let dir = out.join("multiplicity").join("blobs");
    assert_eq!(
        image_names(&dir),
        vec!["mul.svg", "rf_m1.svg", "rf_m2.svg", "rf_m3.svg", "rf_m4.svg"]
    );
    let figure = fs::read_to_string(dir.join("mul.svg")).unwrap();
    assert!(figure.contains("Best: multiplicity"));
}

#[test]
fn tiny_datasets_are_rejected_instead_of_scored() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("tiny.csv");
    fs::write(&data, "0.5,1.0,0\n").unwrap();

    let config = write_config(
        tmp.path(),
        json!({
            "datasets": [
                { "path": data,
                  "depth": { "start": 1, "end": 1, "step": 1 },
                  "pca": { "start": 1, "end": 1, "step": 1 } }
            ],
            "seeds": { "low": 1, "high": 1 },
            "outliers": { "max": 0, "step": 1 },
            "output_dir": tmp.path().join("out")
        }),
    );

    assert!(matches!(pipeline::run(&config), Err(Error::Parameters(_))));
}

#[test]
fn unknown_base_dataset_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("blobs_x1.csv");
    write_blobs(&data, 4);

    let config = write_config(
        tmp.path(),
        json!({
            "datasets": [
                { "path": data,
                  "depth": { "start": 2, "end": 2, "step": 1 },
                  "pca": { "start": 1, "end": 1, "step": 1 } }
            ],
            "seeds": { "low": 1, "high": 1 },
            "outliers": { "max": 0, "step": 1 },
            "output_dir": tmp.path().join("out"),
            "multiplicity": [
                { "factors": [1], "files": ["other_x1.csv"], "group": "other" }
            ],
            "forest": { "n_trees": 4 }
        }),
    );

    assert!(matches!(
        pipeline::run(&config),
        Err(Error::UnknownBaseDataset(label)) if label == "other"
    ));
}

#[test]
fn too_many_components_are_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("blobs.csv");
    write_blobs(&data, 5);

    let config = write_config(
        tmp.path(),
        json!({
            "datasets": [
                { "path": data,
                  "depth": { "start": 2, "end": 2, "step": 1 },
                  "pca": { "start": 1, "end": 5, "step": 1 } }
            ],
            "seeds": { "low": 1, "high": 1 },
            "outliers": { "max": 0, "step": 1 },
            "output_dir": tmp.path().join("out")
        }),
    );

    assert!(matches!(pipeline::run(&config), Err(Error::Config(_))));
}

#[test]
fn cli_rejects_bad_invocations() {
    let binary = env!("CARGO_BIN_EXE_forest-sweep");

    let missing = Command::new(binary)
        .arg("does/not/exist.json")
        .output()
        .unwrap();
    assert_eq!(missing.status.code(), Some(1));

    let no_args = Command::new(binary).output().unwrap();
    assert_eq!(no_args.status.code(), Some(1));

    let too_many = Command::new(binary).args(["a.json", "b.json"]).output().unwrap();
    assert_eq!(too_many.status.code(), Some(1));

    let help = Command::new(binary).arg("--help").output().unwrap();
    assert_eq!(help.status.code(), Some(0));
}
