//! End-to-end download runs against a scripted fetcher (no network).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use libloan_core::{DatasetError, RowSource, StreamError};
use libloan_download::{Config, Fetcher, run};
use tempfile::TempDir;

/// Serves bodies by url; unknown urls fail with a network error.
#[derive(Default)]
struct Scripted {
    bodies: HashMap<String, String>,
    calls: Vec<String>,
}

impl Scripted {
    fn serve(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }
}

impl Fetcher for Scripted {
    fn fetch(&mut self, url: &str) -> Result<String, StreamError> {
        self.calls.push(url.to_string());
        self.bodies.get(url).cloned().ok_or(StreamError::Http {
            status: None,
            message: "connection reset".to_string(),
        })
    }
}

fn write_dataset(dir: &Path, rows: &[(&str, bool)]) -> PathBuf {
    let mut text = String::from("LibraryName,Year,Month,Url,ValidUrl,SaveAt\n");
    for (i, (name, valid)) in rows.iter().enumerate() {
        let flag = if *valid { "True" } else { "False" };
        text.push_str(&format!(
            "Lib,2023,{},https://example.org/{name},{flag},{name}.csv\n",
            i + 1
        ));
    }
    let path = dir.join("datasource.csv");
    fs::write(&path, text).unwrap();
    path
}

fn config(dataset: PathBuf) -> Config {
    Config {
        dataset,
        ..Default::default()
    }
}

#[test]
fn invalid_row_is_never_attempted() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(dir.path(), &[("a", true), ("b", true), ("c", false)]);
    let before = fs::read_to_string(&dataset).unwrap();

    let mut fetcher = Scripted::default()
        .serve("https://example.org/a", "x\n1\n")
        .serve("https://example.org/b", "x\n2\n");
    let summary = run(&config(dataset.clone()), &mut fetcher, None).unwrap();

    assert_eq!(summary.selected, 2);
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.dataset_rewrites, 0);
    assert_eq!(
        fetcher.calls,
        vec!["https://example.org/a", "https://example.org/b"]
    );
    assert!(dir.path().join("a.csv").exists());
    assert!(dir.path().join("b.csv").exists());
    assert!(!dir.path().join("c.csv").exists());
    assert_eq!(fs::read_to_string(&dataset).unwrap(), before);
}

#[test]
fn failed_fetch_invalidates_row_and_run_continues() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(dir.path(), &[("a", true), ("b", true), ("c", true)]);

    let mut fetcher = Scripted::default()
        .serve("https://example.org/a", "x\n1\n")
        .serve("https://example.org/c", "x\n3\n");
    let summary = run(&config(dataset.clone()), &mut fetcher, None).unwrap();

    assert_eq!(summary.selected, 3);
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.invalidated, 1);
    assert_eq!(summary.dataset_rewrites, 1);
    assert!(!dir.path().join("b.csv").exists());
    assert!(dir.path().join("c.csv").exists());

    let reloaded = RowSource::load(&dataset).unwrap();
    let valid: Vec<bool> = reloaded.rows().iter().map(|r| r.valid_url).collect();
    assert_eq!(valid, vec![true, false, true]);
}

#[test]
fn rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(dir.path(), &[("a", true), ("b", true)]);
    let mut fetcher = Scripted::default()
        .serve("https://example.org/a", "x\n1\n")
        .serve("https://example.org/b", "x\n2\n");

    run(&config(dataset.clone()), &mut fetcher, None).unwrap();
    assert_eq!(fetcher.calls.len(), 2);

    let summary = run(&config(dataset), &mut fetcher, None).unwrap();
    assert_eq!(summary.selected, 0);
    assert_eq!(fetcher.calls.len(), 2);
}

#[test]
fn invalidated_row_is_skipped_on_next_run() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(dir.path(), &[("a", true)]);

    let mut failing = Scripted::default();
    run(&config(dataset.clone()), &mut failing, None).unwrap();
    assert_eq!(failing.calls.len(), 1);

    let mut serving = Scripted::default().serve("https://example.org/a", "x\n1\n");
    let summary = run(&config(dataset), &mut serving, None).unwrap();
    assert_eq!(summary.selected, 0);
    assert!(serving.calls.is_empty());
}

#[test]
fn empty_destination_is_downloaded_again() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(dir.path(), &[("a", true)]);
    fs::write(dir.path().join("a.csv"), "").unwrap();

    let mut fetcher = Scripted::default().serve("https://example.org/a", "x\n1\n");
    let summary = run(&config(dataset), &mut fetcher, None).unwrap();
    assert_eq!(summary.downloaded, 1);
    assert_eq!(fs::read_to_string(dir.path().join("a.csv")).unwrap(), "x\n1\n");
}

#[test]
fn malformed_dataset_fails_before_any_fetch() {
    let dir = TempDir::new().unwrap();
    let dataset = dir.path().join("datasource.csv");
    fs::write(
        &dataset,
        "LibraryName,Year,Month,Url,ValidUrl\nLib,2023,1,https://example.org/a,True\n",
    )
    .unwrap();

    let mut fetcher = Scripted::default();
    let err = run(&config(dataset), &mut fetcher, None).unwrap_err();
    let dataset_err = err.downcast_ref::<DatasetError>().unwrap();
    assert!(matches!(dataset_err, DatasetError::Malformed { .. }));
    assert!(fetcher.calls.is_empty());
}

#[test]
fn failed_dataset_rewrite_stops_the_run() {
    let dir = TempDir::new().unwrap();
    let dataset = write_dataset(dir.path(), &[("a", true), ("b", true)]);
    // the rewrite goes through `datasource.csv.tmp`; a directory there blocks it
    fs::create_dir(dir.path().join("datasource.csv.tmp")).unwrap();
    let before = fs::read_to_string(&dataset).unwrap();

    let mut fetcher = Scripted::default().serve("https://example.org/b", "x\n2\n");
    let err = run(&config(dataset.clone()), &mut fetcher, None).unwrap_err();

    let dataset_err = err.downcast_ref::<DatasetError>().unwrap();
    assert!(matches!(dataset_err, DatasetError::Persistence { .. }));
    assert_eq!(fetcher.calls, vec!["https://example.org/a"]);
    assert!(!dir.path().join("b.csv").exists());
    assert_eq!(fs::read_to_string(&dataset).unwrap(), before);
}
