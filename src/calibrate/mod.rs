// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pedestal subtraction and per-event feature extraction.
//!
//! Each sample of an event has the pedestal of the physical cell that stored
//! it subtracted. From the calibrated waveform, the peak amplitude, the peak
//! position and the charge (the sum of samples in a window around the peak)
//! are extracted.


use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cells::{CellAddressMapper, CellMapError},
    constants::{DEFAULT_CHARGE_LOWER, DEFAULT_CHARGE_UPPER, ROUNDING_DECIMALS},
    event::{CalibratedEvent, RawEvent},
    math::{first_argmax, round_decimals},
    pedestal::PedestalRow,
};

/// The samples summed into an event's charge. `lower` samples before the peak
/// and `upper` samples after it are included, as well as the peak itself.
/// Windows that would run off either end of the event are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeWindow {
    pub lower: usize,
    pub upper: usize,
}

impl ChargeWindow {
    pub fn new(lower: usize, upper: usize) -> ChargeWindow {
        ChargeWindow { lower, upper }
    }

    /// Parse user-supplied bounds. There must be exactly two; the magnitudes of
    /// negative bounds are used.
    pub fn from_bounds(bounds: &[i64]) -> Result<ChargeWindow, ChargeWindowError> {
        match bounds {
            [lower, upper] => Ok(ChargeWindow {
                lower: lower.unsigned_abs() as usize,
                upper: upper.unsigned_abs() as usize,
            }),
            _ => Err(ChargeWindowError::WrongNumberOfBounds(bounds.len())),
        }
    }

    /// The inclusive range of sample indices integrated for a peak at
    /// `position`, for an event with `num_samples` samples.
    ///
    /// # Panics
    ///
    /// Panics if `num_samples` is 0.
    pub fn bounds(&self, position: usize, num_samples: usize) -> (usize, usize) {
        let last = num_samples - 1;
        let (start, end) = if position < self.lower {
            (0, position + self.upper)
        } else if position + self.upper >= num_samples {
            (position - self.lower, last)
        } else {
            (position - self.lower, position + self.upper)
        };
        (start, end.min(last))
    }

    /// Sum the samples of the window around `position`.
    pub fn integrate(&self, samples: &[f64], position: usize) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let (start, end) = self.bounds(position, samples.len());
        samples[start..=end].iter().sum()
    }
}

impl Default for ChargeWindow {
    fn default() -> Self {
        ChargeWindow {
            lower: DEFAULT_CHARGE_LOWER,
            upper: DEFAULT_CHARGE_UPPER,
        }
    }
}

impl std::fmt::Display for ChargeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "-{}, +{}", self.lower, self.upper)
    }
}

/// Calibrates the events of a single (module, chip, channel) triple.
#[derive(Debug, Clone, Copy)]
pub struct EventCalibrator<'a> {
    mapper: &'a CellAddressMapper,
    pedestal: &'a PedestalRow,
    window: ChargeWindow,
}

impl<'a> EventCalibrator<'a> {
    pub fn new(
        mapper: &'a CellAddressMapper,
        pedestal: &'a PedestalRow,
        window: ChargeWindow,
    ) -> EventCalibrator<'a> {
        EventCalibrator {
            mapper,
            pedestal,
            window,
        }
    }

    pub fn window(&self) -> ChargeWindow {
        self.window
    }

    pub fn calibrate(&self, event: RawEvent) -> Result<CalibratedEvent, CalibrateError> {
        calibrate(event, self.pedestal, self.mapper, self.window)
    }
}

/// Subtract pedestals from an event and extract its amplitude, peak position
/// and charge.
pub fn calibrate(
    event: RawEvent,
    pedestal: &PedestalRow,
    mapper: &CellAddressMapper,
    window: ChargeWindow,
) -> Result<CalibratedEvent, CalibrateError> {
    if event.samples.is_empty() {
        return Err(CalibrateError::NoSamples {
            event: event.event_index,
        });
    }

    let cells =
        mapper.cells_for_window(usize::from(event.block), event.phase, event.samples.len())?;
    let calibrated_samples: Vec<f64> = event
        .samples
        .iter()
        .zip(cells)
        .map(|(&sample, cell)| {
            round_decimals(f64::from(sample) - pedestal[cell], ROUNDING_DECIMALS)
        })
        .collect();

    // Can't fail; the samples aren't empty.
    let (position, amplitude) = first_argmax(&calibrated_samples).unwrap_or((0, 0.0));
    let charge = window.integrate(&calibrated_samples, position);

    Ok(CalibratedEvent {
        raw: event,
        calibrated_samples,
        amplitude,
        position,
        charge,
    })
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrateError {
    #[error("Event {event} has no samples")]
    NoSamples { event: usize },

    #[error(transparent)]
    CellMap(#[from] CellMapError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChargeWindowError {
    #[error("The charge window must have exactly 2 bounds (lower, upper), but {0} were given")]
    WrongNumberOfBounds(usize),
}
