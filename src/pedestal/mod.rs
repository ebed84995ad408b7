// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Learning per-cell pedestals from a calibration run.
//!
//! Every physical cell of a channel has its own baseline. During a pedestal
//! run, each sample of each event is traced back to the cell that stored it
//! (see [`CellAddressMapper`]) and accumulated into that cell's running sum;
//! the pedestal of a cell is then the mean of everything that landed on it.
//!
//! Samples at or below [`SPIKE_THRESHOLD`] are data spikes and are dropped.


use log::trace;
use thiserror::Error;

use crate::{
    cells::{CellAddressMapper, CellMapError},
    constants::{N_CELLS, ROUNDING_DECIMALS, SPIKE_THRESHOLD},
    event::RawEvent,
    math::round_decimals,
};

/// The pedestal of every physical cell of one channel, indexed by physical
/// cell id. Always exactly [`N_CELLS`] long.
#[derive(Debug, Clone, PartialEq)]
pub struct PedestalRow(Vec<f64>);

impl PedestalRow {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }

    /// Get the pedestal of each cell backing an acquisition window, in sample
    /// order.
    pub fn window(
        &self,
        mapper: &CellAddressMapper,
        block: usize,
        phase: i32,
        window_length: usize,
    ) -> Result<Vec<f64>, CellMapError> {
        let cells = mapper.cells_for_window(block, phase, window_length)?;
        Ok(cells.into_iter().map(|c| self.0[c]).collect())
    }
}

impl TryFrom<Vec<f64>> for PedestalRow {
    type Error = PedestalError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        if values.len() != N_CELLS {
            return Err(PedestalError::BadLength {
                expected: N_CELLS,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PedestalError::NotFinite);
        }
        Ok(PedestalRow(values))
    }
}

impl std::ops::Index<usize> for PedestalRow {
    type Output = f64;

    fn index(&self, cell: usize) -> &f64 {
        &self.0[cell]
    }
}

/// Running per-cell sums and counts for one (module, chip, channel) triple.
/// Each triple gets its own accumulator, so triples can be processed
/// independently.
#[derive(Debug, Clone)]
pub struct PedestalAccumulator {
    sum: Vec<f64>,
    count: Vec<u32>,

    /// The number of events ingested.
    num_events: usize,

    /// The number of samples dropped as spikes.
    num_rejected: usize,
}

impl PedestalAccumulator {
    pub fn new() -> PedestalAccumulator {
        PedestalAccumulator {
            sum: vec![0.0; N_CELLS],
            count: vec![0; N_CELLS],
            num_events: 0,
            num_rejected: 0,
        }
    }

    /// Add an event's samples to the cells that stored them.
    pub fn ingest(
        &mut self,
        event: &RawEvent,
        mapper: &CellAddressMapper,
    ) -> Result<(), CellMapError> {
        let cells =
            mapper.cells_for_window(usize::from(event.block), event.phase, event.samples.len())?;

        if event.samples.iter().all(|&s| s > SPIKE_THRESHOLD) {
            for (&cell, &sample) in cells.iter().zip(event.samples.iter()) {
                self.sum[cell] += f64::from(sample);
                self.count[cell] += 1;
            }
        } else {
            // At least one spike; only keep the good samples.
            for (&cell, &sample) in cells.iter().zip(event.samples.iter()) {
                if sample > SPIKE_THRESHOLD {
                    self.sum[cell] += f64::from(sample);
                    self.count[cell] += 1;
                } else {
                    self.num_rejected += 1;
                }
            }
            trace!(
                "Event {} contained data spikes; {} samples rejected so far",
                event.event_index,
                self.num_rejected
            );
        }
        self.num_events += 1;

        Ok(())
    }

    pub fn num_events(&self) -> usize {
        self.num_events
    }

    pub fn num_rejected(&self) -> usize {
        self.num_rejected
    }

    /// The number of cells that have never had a sample land on them.
    pub fn num_empty_cells(&self) -> usize {
        self.count.iter().filter(|&&c| c == 0).count()
    }

    /// Turn the sums into means. Cells without any samples get a pedestal of 0.
    pub fn finalize(self) -> PedestalRow {
        let means = self
            .sum
            .iter()
            .zip(self.count.iter())
            .map(|(&sum, &count)| {
                if count > 0 {
                    round_decimals(sum / f64::from(count), ROUNDING_DECIMALS)
                } else {
                    0.0
                }
            })
            .collect();
        PedestalRow(means)
    }
}

impl Default for PedestalAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PedestalError {
    #[error("Expected a pedestal row with {expected} cells, but it had {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("The pedestal row contains non-finite values")]
    NotFinite,
}
