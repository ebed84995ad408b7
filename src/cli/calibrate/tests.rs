// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use clap::Parser;
use indoc::formatdoc;
use tempfile::TempDir;

use super::CalibrateArgs;
use crate::{
    calibrate::ChargeWindow,
    constants::N_CELLS,
    io::database::{Database, CALIBRATED_EVENT_KEYS, PEDESTAL_KEYS},
    pedestal::PedestalRow,
    tests::{test_selection, write_events_database, TEST_NUM_EVENTS, TEST_NUM_SAMPLES},
    SctcalError,
};

/// Write a pedestal database where every cell of every triple is `value`.
fn write_flat_pedestals(dir: &Path, value: f64) -> PathBuf {
    let path = dir.join("peds.json");
    let mut db = Database::new();
    for triple in test_selection().triples() {
        db.insert(&triple, PedestalRow::try_from(vec![value; N_CELLS]).unwrap())
            .unwrap();
    }
    db.metadata_mut().stamp(PEDESTAL_KEYS);
    db.save(&path, false).unwrap();
    path
}

#[test]
fn test_calibrate_from_cli() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let events = write_events_database(tmp_dir.path(), 500);
    let pedestals = write_flat_pedestals(tmp_dir.path(), 400.0);
    let output = tmp_dir.path().join("calibrated.json");

    let events_string = events.display().to_string();
    let pedestals_string = pedestals.display().to_string();
    let output_string = output.display().to_string();
    #[rustfmt::skip]
    let args = CalibrateArgs::parse_from([
        "calibrate",
        "--events", &events_string,
        "--pedestals", &pedestals_string,
        "--charge-window", "-4", "4",
        "--output", &output_string,
    ]);
    args.run(false).unwrap();

    let db = Database::open(&output).unwrap();
    let metadata = db.metadata();
    assert_eq!(metadata.keys.as_deref(), Some(CALIBRATED_EVENT_KEYS));
    assert_eq!(metadata.charge_interval, Some(ChargeWindow::new(4, 4)));
    assert_eq!(metadata.ped_name.as_deref(), Some(pedestals_string.as_str()));

    for triple in test_selection().triples() {
        let events = db.events(&triple).unwrap();
        assert_eq!(events.num_events(), TEST_NUM_EVENTS);
        let cal = events.calibrated.as_ref().unwrap();
        for i in 0..TEST_NUM_EVENTS {
            assert_abs_diff_eq!(cal.calibrated_waveform[(i, 0)], 100.0);
            assert_abs_diff_eq!(cal.amplitude[i], 500.0);
            assert_eq!(cal.position[i], TEST_NUM_SAMPLES / 2);
            // 4 samples of 100 either side of the peak.
            assert_abs_diff_eq!(cal.charge[i], 1300.0);
        }
    }
}

#[test]
fn test_pedestals_from_the_same_run_calibrate_to_zero() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let events = write_events_database(tmp_dir.path(), 480);
    let events_string = events.display().to_string();
    let pedestals = tmp_dir.path().join("peds.yaml");
    let pedestals_string = pedestals.display().to_string();
    let output = tmp_dir.path().join("calibrated.yaml");
    let output_string = output.display().to_string();

    crate::cli::pedestal::PedestalArgs::parse_from([
        "pedestal",
        "-e",
        &events_string,
        "-o",
        &pedestals_string,
    ])
    .run(false)
    .unwrap();
    CalibrateArgs::parse_from([
        "calibrate",
        "-e",
        &events_string,
        "-p",
        &pedestals_string,
        "-o",
        &output_string,
    ])
    .run(false)
    .unwrap();

    // No cell is visited by more than one event, so every pedestal is exactly
    // the sample that was stored in it.
    let db = Database::open(&output).unwrap();
    for triple in test_selection().triples() {
        let cal = db.events(&triple).unwrap().calibrated.clone().unwrap();
        assert!(cal.calibrated_waveform.iter().all(|&s| s == 0.0));
        assert!(cal.charge.iter().all(|&c| c == 0.0));
        assert!(cal.position.iter().all(|&p| p == 0));
    }
}

#[test]
fn test_missing_pedestals() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let events = write_events_database(tmp_dir.path(), 500);
    let events_string = events.display().to_string();
    let output = tmp_dir.path().join("calibrated.json");
    let output_string = output.display().to_string();

    let result = CalibrateArgs::parse_from(["calibrate", "-e", &events_string, "-o", &output_string])
        .parse();
    assert!(matches!(result, Err(SctcalError::Calibrate(_))));

    // A database of events isn't a pedestal database.
    let result = CalibrateArgs::parse_from([
        "calibrate",
        "-e",
        &events_string,
        "-p",
        &events_string,
        "-o",
        &output_string,
    ])
    .parse();
    assert!(matches!(
        result,
        Err(SctcalError::Calibrate(msg)) if msg.contains("doesn't hold pedestals")
    ));
    assert!(!output.exists());
}

#[test]
fn test_missing_pedestal_branch_writes_nothing() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let events = write_events_database(tmp_dir.path(), 500);
    let events_string = events.display().to_string();
    let output = tmp_dir.path().join("calibrated.json");
    let output_string = output.display().to_string();

    // Pedestals for module 118 only.
    let pedestals = tmp_dir.path().join("peds.json");
    let mut db = Database::new();
    for triple in test_selection().triples() {
        if triple.module == 118 {
            db.insert(&triple, PedestalRow::try_from(vec![0.0; N_CELLS]).unwrap())
                .unwrap();
        }
    }
    db.metadata_mut().stamp(PEDESTAL_KEYS);
    db.save(&pedestals, false).unwrap();
    let pedestals_string = pedestals.display().to_string();

    let result = CalibrateArgs::parse_from([
        "calibrate",
        "-e",
        &events_string,
        "-p",
        &pedestals_string,
        "-o",
        &output_string,
    ])
    .run(false);
    assert!(matches!(
        result,
        Err(SctcalError::Calibrate(msg)) if msg.contains("Module121/Chip0/Channel0")
    ));
    assert!(!output.exists());
}

#[test]
fn test_charge_window_from_arg_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let events = write_events_database(tmp_dir.path(), 500);
    let pedestals = write_flat_pedestals(tmp_dir.path(), 400.0);
    let arg_file = tmp_dir.path().join("args.json");
    std::fs::write(
        &arg_file,
        formatdoc! {r#"
            {{
                "input": {{ "events": "{}" }},
                "pedestals": "{}",
                "charge_window": [2, 3, 4],
                "output": {{ "output": "{}" }}
            }}
        "#,
            events.display(),
            pedestals.display(),
            tmp_dir.path().join("out.json").display()
        },
    )
    .unwrap();
    let arg_file_string = arg_file.display().to_string();

    let args = CalibrateArgs::parse_from(["calibrate", &arg_file_string])
        .merge()
        .unwrap();
    assert_eq!(args.charge_window, Some(vec![2, 3, 4]));
    assert!(matches!(
        args.clone().parse(),
        Err(SctcalError::Calibrate(msg)) if msg.contains("exactly 2 bounds")
    ));

    // The command line wins.
    let args = CalibrateArgs::parse_from(["calibrate", &arg_file_string, "--charge-window", "1", "2"])
        .merge()
        .unwrap();
    let params = args.parse().unwrap();
    assert_eq!(params.window, ChargeWindow::new(1, 2));
}
