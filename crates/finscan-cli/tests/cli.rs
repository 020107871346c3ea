use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const HYDRO: &str = concat!(
    "HYDRO QUEBEC\n",
    "Date: 2023-01-15\n",
    "Invoice No: INV-2023-001\n",
    "Subtotal: $120.00\n",
    "Total: $137.50\n",
);

/// Command isolated from the user's configuration directory.
fn finscan(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("finscan").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env("HOME", home);
    cmd
}

fn seed_store(home: &Path) -> std::path::PathBuf {
    let store = home.join("aliases.json");
    finscan(home)
        .args(["alias", "--store"])
        .arg(&store)
        .args(["add", "HYDRO-QUÉBEC", "HYDRO QUEBEC", "HQ"])
        .assert()
        .success();
    store
}

#[test]
fn process_prints_json_record() {
    let tmp = TempDir::new().unwrap();
    let store = seed_store(tmp.path());
    let input = tmp.path().join("invoice.txt");
    fs::write(&input, HYDRO).unwrap();

    let output = finscan(tmp.path())
        .arg("process")
        .arg(&input)
        .arg("--alias-store")
        .arg(&store)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["company"], "HYDRO-QUÉBEC");
    assert_eq!(json["total"], "137.50");
    assert_eq!(json["date"], "2023-01-15");
    assert_eq!(json["identifier"], "INV-2023-001");
    assert_eq!(json["tier"], "high");
    assert!(json["confidence"].as_f64().unwrap() >= 0.9);
}

#[test]
fn process_without_store_leaves_company_absent() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("invoice.txt");
    fs::write(&input, HYDRO).unwrap();

    let output = finscan(tmp.path()).arg("process").arg(&input).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["company"].is_null());
    assert_eq!(json["total"], "137.50");
    assert!(json["warnings"].as_array().is_some_and(|w| !w.is_empty()));
}

#[test]
fn process_json_lines_scale_confidence() {
    let tmp = TempDir::new().unwrap();
    let store = seed_store(tmp.path());
    let lines: Vec<serde_json::Value> = HYDRO
        .lines()
        .map(|l| serde_json::json!({ "text": l, "confidence": 0.5 }))
        .collect();
    let input = tmp.path().join("invoice.json");
    fs::write(&input, serde_json::json!({ "lines": lines }).to_string()).unwrap();

    let output = finscan(tmp.path())
        .arg("process")
        .arg(&input)
        .arg("--alias-store")
        .arg(&store)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let confidence = json["confidence"].as_f64().unwrap();
    assert!((confidence - 0.4675).abs() < 1e-3, "{}", confidence);
}

#[test]
fn process_reports_rename_plan() {
    let tmp = TempDir::new().unwrap();
    let store = seed_store(tmp.path());
    let input = tmp.path().join("scan.TXT");
    fs::write(&input, HYDRO).unwrap();

    finscan(tmp.path())
        .arg("process")
        .arg(&input)
        .arg("--alias-store")
        .arg(&store)
        .args(["--rename-template", "{company}_{date}_{total}"])
        .assert()
        .success()
        .stderr(predicate::str::contains("HYDRO-QUÉBEC_2023-01-15_137.50.txt"));
}

#[test]
fn process_missing_input_fails() {
    let tmp = TempDir::new().unwrap();

    finscan(tmp.path())
        .args(["process", "does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn alias_add_list_and_test() {
    let tmp = TempDir::new().unwrap();
    let store = seed_store(tmp.path());

    let output = finscan(tmp.path())
        .args(["alias", "--store"])
        .arg(&store)
        .args(["list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing["HYDRO-QUÉBEC"], serde_json::json!(["HQ", "HYDRO QUEBEC"]));

    finscan(tmp.path())
        .args(["alias", "test", "  hydro   quebec "])
        .arg("--store")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("HYDRO-QUÉBEC").and(predicate::str::contains("exact")));

    finscan(tmp.path())
        .args(["alias", "--store"])
        .arg(&store)
        .args(["test", "ACME WIDGETS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("does not resolve"));
}

#[test]
fn alias_rejects_duplicate_across_canonicals() {
    let tmp = TempDir::new().unwrap();
    let store = seed_store(tmp.path());

    finscan(tmp.path())
        .args(["alias", "--store"])
        .arg(&store)
        .args(["add", "HEADQUARTERS INC", "hq"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already maps to"));

    // The failed update leaves the persisted store untouched.
    let content = fs::read_to_string(&store).unwrap();
    assert!(!content.contains("HEADQUARTERS INC"));
}

#[test]
fn alias_remove_canonical_cascades() {
    let tmp = TempDir::new().unwrap();
    let store = seed_store(tmp.path());

    finscan(tmp.path())
        .args(["alias", "--store"])
        .arg(&store)
        .args(["remove-canonical", "HYDRO-QUÉBEC"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 alias(es)"));

    finscan(tmp.path())
        .args(["alias", "--store"])
        .arg(&store)
        .args(["test", "HQ"])
        .assert()
        .success()
        .stdout(predicate::str::contains("does not resolve"));
}

#[test]
fn config_init_set_get() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("finscan.json");
    let config = config.to_str().unwrap();

    finscan(tmp.path())
        .args(["--config", config, "config", "init"])
        .assert()
        .success();

    finscan(tmp.path())
        .args(["--config", config, "config", "set", "extraction.label_window", "7"])
        .assert()
        .success();

    finscan(tmp.path())
        .args(["--config", config, "config", "get", "extraction.label_window"])
        .assert()
        .success()
        .stdout(predicate::str::diff("7\n"));

    finscan(tmp.path())
        .args(["--config", config, "config", "set", "extraction.fuzzy_threshold", "2"])
        .assert()
        .failure();

    finscan(tmp.path())
        .args(["--config", config, "config", "get", "extraction.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn config_init_refuses_overwrite() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("finscan.json");
    fs::write(&config, "{}").unwrap();

    finscan(tmp.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn batch_writes_outputs_and_summary() {
    let tmp = TempDir::new().unwrap();
    let store = seed_store(tmp.path());
    let scans = tmp.path().join("scans");
    fs::create_dir(&scans).unwrap();
    fs::write(scans.join("a.txt"), HYDRO).unwrap();
    fs::write(scans.join("b.txt"), "nothing useful here\n").unwrap();
    let out = tmp.path().join("out");

    finscan(tmp.path())
        .arg("batch")
        .arg(format!("{}/*.txt", scans.display()))
        .arg("--output-dir")
        .arg(&out)
        .arg("--summary")
        .arg("--alias-store")
        .arg(&store)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 2 files"));

    let a: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("a.json")).unwrap()).unwrap();
    assert_eq!(a["file"], "a.txt");
    assert_eq!(a["company"], "HYDRO-QUÉBEC");
    assert!(out.join("b.json").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    let rows: Vec<&str> = summary.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("a.txt,success,HYDRO-QUÉBEC,137.50,2023-01-15,INV-2023-001,"));
    assert!(rows[2].starts_with("b.txt,success,,,,"));
}

#[test]
fn batch_applies_renames_with_suffixes() {
    let tmp = TempDir::new().unwrap();
    let store = seed_store(tmp.path());
    let scans = tmp.path().join("scans");
    fs::create_dir(&scans).unwrap();
    fs::write(scans.join("a.txt"), HYDRO).unwrap();
    fs::write(scans.join("b.txt"), HYDRO).unwrap();
    fs::write(scans.join("c.txt"), "Total: $5.00\n").unwrap();

    let rename = |expected: &str| {
        finscan(tmp.path())
            .arg("batch")
            .arg(format!("{}/*.txt", scans.display()))
            .arg("--alias-store")
            .arg(&store)
            .args(["--rename", "{company}_{date}_{total}", "--apply"])
            .assert()
            .success()
            .stdout(predicate::str::contains(expected.to_string()));
    };

    rename("2 renamed");

    let listing = || {
        let mut names: Vec<String> = fs::read_dir(&scans)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    };
    let expected = vec![
        "HYDRO-QUÉBEC_2023-01-15_137.50.txt".to_string(),
        "HYDRO-QUÉBEC_2023-01-15_137.50_1.txt".to_string(),
        "c.txt".to_string(),
    ];
    assert_eq!(listing(), expected);

    // A second run leaves already-renamed files where they are.
    rename("2 planned");
    assert_eq!(listing(), expected);
}

#[test]
fn batch_without_matches_fails() {
    let tmp = TempDir::new().unwrap();

    finscan(tmp.path())
        .arg("batch")
        .arg(format!("{}/*.txt", tmp.path().display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}
