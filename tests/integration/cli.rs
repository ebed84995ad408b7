// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use tempfile::TempDir;

use crate::*;

#[test]
fn test_help_is_printed() {
    let cmd = sctcal().arg("--help").ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    for sub_command in ["pedestal", "calibrate", "extract", "db-info"] {
        assert!(stdout.contains(sub_command), "{stdout}");
    }
}

#[test]
fn test_no_subcommand_is_an_error() {
    let cmd = sctcal().ok();
    assert!(cmd.is_err());
}

#[test]
fn test_errors_go_to_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let output = tmp_dir.path().join("peds.json");
    let cmd = sctcal()
        .args([
            "pedestal",
            "--events",
            "/does/not/exist.json",
            "--output",
            &output.display().to_string(),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: "), "{stderr}");
    assert!(stderr.contains("unavailable"), "{stderr}");
    assert!(!output.exists());
}

#[test]
fn test_dry_run() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let events = make_events_database(tmp_dir.path(), 450);
    let output = tmp_dir.path().join("peds.json");
    let cmd = sctcal()
        .args([
            "pedestal",
            "-e",
            &events.display().to_string(),
            "-o",
            &output.display().to_string(),
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(!output.exists());
}

#[test]
fn test_save_toml_reproduces_a_run() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let events = make_events_database(tmp_dir.path(), 450);
    let output = tmp_dir.path().join("peds.json");
    let toml = tmp_dir.path().join("args.toml");
    let cmd = sctcal()
        .args([
            "pedestal",
            "-e",
            &events.display().to_string(),
            "-o",
            &output.display().to_string(),
            "--channels",
            "7",
            "--save-toml",
            &toml.display().to_string(),
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    assert!(toml.exists());
    assert!(!output.exists());

    // Running from the saved arguments does the same thing.
    let cmd = sctcal()
        .args(["pedestal", &toml.display().to_string(), "--no-progress-bars"])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let db = Database::open(&output).unwrap();
    assert_eq!(db.metadata().channels, Some(vec![7]));
}
