// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Raw and calibrated events, and the column-oriented container that holds all
//! of a channel's events.

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/// One acquisition of one channel, as delivered by a raw-event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub event_index: usize,

    /// The acquisition block the first sample was stored in.
    pub block: u16,

    /// The offset of the first sample within its block.
    pub phase: i32,

    pub timestamp: u64,

    /// Raw ADC samples.
    pub samples: Vec<u16>,
}

/// A raw event after pedestal subtraction.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedEvent {
    pub raw: RawEvent,

    /// Pedestal-subtracted samples, rounded to 2 decimal places.
    pub calibrated_samples: Vec<f64>,

    /// The largest calibrated sample.
    pub amplitude: f64,

    /// The (first) index of the largest calibrated sample.
    pub position: usize,

    /// The sum of calibrated samples in the charge window around the peak.
    pub charge: f64,
}

/// Every event of one (module, chip, channel) triple, stored column-wise. The
/// names of the serialised fields are the names of the arrays in a database
/// branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSet {
    pub event: Vec<usize>,
    pub block: Vec<u16>,
    pub phase: Vec<i32>,
    pub timestamp: Vec<u64>,

    /// Raw samples with shape (num events, num samples).
    pub waveform: Array2<u16>,

    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub calibrated: Option<CalibratedColumns>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedColumns {
    /// Calibrated samples with shape (num events, num samples).
    #[serde(rename = "calibratedWaveform")]
    pub calibrated_waveform: Array2<f64>,
    pub amplitude: Vec<f64>,
    pub position: Vec<usize>,
    pub charge: Vec<f64>,
}

impl EventSet {
    /// Allocate space for `num_events` events of `num_samples` samples each.
    pub fn new(num_events: usize, num_samples: usize, calibrated: bool) -> EventSet {
        EventSet {
            event: vec![0; num_events],
            block: vec![0; num_events],
            phase: vec![0; num_events],
            timestamp: vec![0; num_events],
            waveform: Array2::zeros((num_events, num_samples)),
            calibrated: calibrated.then(|| CalibratedColumns {
                calibrated_waveform: Array2::zeros((num_events, num_samples)),
                amplitude: vec![0.0; num_events],
                position: vec![0; num_events],
                charge: vec![0.0; num_events],
            }),
        }
    }

    pub fn num_events(&self) -> usize {
        self.event.len()
    }

    pub fn num_samples(&self) -> usize {
        self.waveform.len_of(Axis(1))
    }

    /// Store a raw event in row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds or the number of samples doesn't match
    /// this set.
    pub fn set_raw(&mut self, i: usize, raw: &RawEvent) {
        self.event[i] = raw.event_index;
        self.block[i] = raw.block;
        self.phase[i] = raw.phase;
        self.timestamp[i] = raw.timestamp;
        self.waveform
            .row_mut(i)
            .assign(&ArrayView1::from(raw.samples.as_slice()));
    }

    /// Store a calibrated event (and its raw event) in row `i`. If this set
    /// wasn't allocated for calibrated events, only the raw event is stored.
    pub fn set_calibrated(&mut self, i: usize, cal: &CalibratedEvent) {
        self.set_raw(i, &cal.raw);
        if let Some(columns) = self.calibrated.as_mut() {
            columns
                .calibrated_waveform
                .row_mut(i)
                .assign(&ArrayView1::from(cal.calibrated_samples.as_slice()));
            columns.amplitude[i] = cal.amplitude;
            columns.position[i] = cal.position;
            columns.charge[i] = cal.charge;
        }
    }

    /// Get the raw event in row `i`, if it exists.
    pub fn raw_event(&self, i: usize) -> Option<RawEvent> {
        if i >= self.num_events() {
            return None;
        }

        Some(RawEvent {
            event_index: self.event[i],
            block: self.block[i],
            phase: self.phase[i],
            timestamp: self.timestamp[i],
            samples: self.waveform.row(i).to_vec(),
        })
    }

    /// Check that every column agrees on the number of events.
    pub(crate) fn is_consistent(&self) -> bool {
        let n = self.num_events();
        let raw_ok = self.block.len() == n
            && self.phase.len() == n
            && self.timestamp.len() == n
            && self.waveform.len_of(Axis(0)) == n;
        let cal_ok = self.calibrated.as_ref().map_or(true, |c| {
            c.calibrated_waveform.dim() == self.waveform.dim()
                && c.amplitude.len() == n
                && c.position.len() == n
                && c.charge.len() == n
        });
        raw_ok && cal_ok
    }
}
