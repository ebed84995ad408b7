// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests.

use std::path::{Path, PathBuf};

use crate::{
    event::{EventSet, RawEvent},
    io::database::{Database, EVENT_KEYS},
    selection::{IndexSelection, Selection},
};

pub(crate) const TEST_NUM_EVENTS: usize = 8;
pub(crate) const TEST_NUM_SAMPLES: usize = 32;

/// The modules, chips and channels stored by [`events_database`].
pub(crate) fn test_selection() -> Selection {
    Selection {
        modules: IndexSelection::try_from(vec![118, 121]).unwrap(),
        chips: IndexSelection::try_from(vec![0, 1]).unwrap(),
        channels: IndexSelection::try_from(vec![0, 1, 2]).unwrap(),
    }
}

/// A flat waveform at `level` ADC counts with a pulse of 900 counts in the
/// middle.
pub(crate) fn synthetic_event(event: usize, level: u16) -> RawEvent {
    let mut samples = vec![level; TEST_NUM_SAMPLES];
    samples[TEST_NUM_SAMPLES / 2] = 900;
    RawEvent {
        event_index: event,
        block: ((event * 11) % 512) as u16,
        phase: (event % 32) as i32,
        timestamp: 5_000 * event as u64,
        samples,
    }
}

/// A database of raw events, as written by the extract mode.
pub(crate) fn events_database(level: u16) -> Database {
    let selection = test_selection();
    let mut db = Database::new();
    for triple in selection.triples() {
        let mut events = EventSet::new(TEST_NUM_EVENTS, TEST_NUM_SAMPLES, false);
        for i in 0..TEST_NUM_EVENTS {
            events.set_raw(i, &synthetic_event(i, level));
        }
        db.insert(&triple, events).unwrap();
    }

    let metadata = db.metadata_mut();
    metadata.stamp(EVENT_KEYS);
    metadata.set_selection(&selection);
    metadata.run = Some(320);
    metadata.num_events = Some(TEST_NUM_EVENTS);
    metadata.waveform_length = Some(TEST_NUM_SAMPLES);
    db
}

/// Write [`events_database`] into `dir`.
pub(crate) fn write_events_database(dir: &Path, level: u16) -> PathBuf {
    let path = dir.join("events.json");
    events_database(level).save(&path, false).unwrap();
    path
}
