// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pedestals, then calibration, then inspection, all through the binary.

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use crate::*;

#[test]
fn test_pedestal_then_calibrate() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let dark = make_events_database(&tmp_dir.path().join("dark"), 450);
    let peds = tmp_dir.path().join("peds.yaml");

    let cmd = sctcal()
        .args([
            "pedestal",
            "-e",
            &dark.display().to_string(),
            "-o",
            &peds.display().to_string(),
            "--comments",
            "dark run",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let db = Database::open(&peds).unwrap();
    assert_eq!(db.metadata().run, Some(412));
    assert_eq!(db.metadata().comments.as_deref(), Some("dark run"));
    assert_eq!(db.branches().count(), selection().triples().len());

    // Calibrate the same events; every cell was only visited once, so all
    // that's left is nothing.
    let calibrated = tmp_dir.path().join("calibrated.json");
    let cmd = sctcal()
        .args([
            "calibrate",
            "-e",
            &dark.display().to_string(),
            "-p",
            &peds.display().to_string(),
            "-o",
            &calibrated.display().to_string(),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));

    let db = Database::open(&calibrated).unwrap();
    for triple in selection().triples() {
        let events = db.events(&triple).unwrap();
        let cal = events.calibrated.as_ref().unwrap();
        for &s in cal.calibrated_waveform.iter() {
            assert_abs_diff_eq!(s, 0.0);
        }
    }
}

#[test]
fn test_calibrate_against_other_pedestals() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let dark = make_events_database(&tmp_dir.path().join("dark"), 450);
    let laser = make_events_database(&tmp_dir.path().join("laser"), 470);
    let peds = tmp_dir.path().join("peds.json");
    let calibrated = tmp_dir.path().join("calibrated.json");

    for args in [
        vec![
            "pedestal".to_string(),
            "-e".to_string(),
            dark.display().to_string(),
            "-o".to_string(),
            peds.display().to_string(),
        ],
        vec![
            "calibrate".to_string(),
            "-e".to_string(),
            laser.display().to_string(),
            "-p".to_string(),
            peds.display().to_string(),
            "--charge-window".to_string(),
            "2".to_string(),
            "2".to_string(),
            "-o".to_string(),
            calibrated.display().to_string(),
        ],
    ] {
        let cmd = sctcal().args(&args).arg("--no-progress-bars").ok();
        assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    }

    let db = Database::open(&calibrated).unwrap();
    let triple = selection().triples()[3];
    let events = db.events(&triple).unwrap();
    let cal = events.calibrated.as_ref().unwrap();
    for i in 0..NUM_EVENTS {
        // Both runs have their pulses in the same samples, so the difference
        // is a flat 20 counts.
        assert_abs_diff_eq!(cal.amplitude[i], 20.0);
        assert_eq!(cal.position[i], 0);
        // The peak is the first sample, so only 2 samples after it are added.
        assert_abs_diff_eq!(cal.charge[i], 60.0);
    }

    let cmd = sctcal()
        .args([
            "db-info",
            &calibrated.display().to_string(),
            "--filter",
            "Chip3",
            "Channel15",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", get_cmd_output(cmd));
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Module118/Chip3/Channel15/charge"), "{stdout}");
    assert!(!stdout.contains("Chip0/Channel7/"), "{stdout}");
    assert!(stdout.contains("charge_interval"), "{stdout}");
}
