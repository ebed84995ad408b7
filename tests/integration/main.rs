// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod cli;
mod workflow;

use std::{
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};

use sct_calibrate::{
    io::database::EVENT_KEYS, Database, EventSet, IndexSelection, RawEvent, Selection,
};

const NUM_EVENTS: usize = 16;
const NUM_SAMPLES: usize = 40;

fn sctcal() -> Command {
    Command::cargo_bin("sctcal").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

fn selection() -> Selection {
    Selection {
        modules: IndexSelection::single(118),
        chips: IndexSelection::try_from(vec![0, 3]).unwrap(),
        channels: IndexSelection::try_from(vec![7, 15]).unwrap(),
    }
}

/// Write a database of raw events into `dir`. Each waveform sits at `level`
/// ADC counts, with a pulse whose position depends on the event.
fn make_events_database(dir: &Path, level: u16) -> PathBuf {
    let selection = selection();
    let mut db = Database::new();
    for triple in selection.triples() {
        let mut events = EventSet::new(NUM_EVENTS, NUM_SAMPLES, false);
        for i in 0..NUM_EVENTS {
            let mut samples = vec![level; NUM_SAMPLES];
            samples[10 + i] = level + 250;
            events.set_raw(
                i,
                &RawEvent {
                    event_index: i,
                    block: ((i * 13) % 512) as u16,
                    phase: (i * 2) as i32,
                    timestamp: 1_000_000 + i as u64,
                    samples,
                },
            );
        }
        db.insert(&triple, events).unwrap();
    }
    let metadata = db.metadata_mut();
    metadata.stamp(EVENT_KEYS);
    metadata.set_selection(&selection);
    metadata.run = Some(412);
    metadata.num_events = Some(NUM_EVENTS);
    metadata.waveform_length = Some(NUM_SAMPLES);

    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join("run412.json");
    db.save(&path, false).unwrap();
    path
}
