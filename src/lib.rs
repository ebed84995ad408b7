// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Pedestal calibration for switched-capacitor-array camera readout chips.

Each channel of a readout chip stores its samples in 16384 storage cells,
visited in a wired permutation of 512 blocks of 32 cells. The per-cell
baseline ("pedestal") is learned from a calibration run and subtracted from
physics-run events, after which the amplitude, peak position and charge of
each event can be extracted.
 */

pub mod calibrate;
pub mod cells;
mod cli;
pub mod constants;
pub mod event;
pub mod io;
pub(crate) mod math;
pub mod pedestal;
pub mod runner;
pub mod selection;
#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

lazy_static::lazy_static! {
    /// Should progress bars be drawn?
    pub static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}

// Re-exports.
pub use calibrate::{ChargeWindow, EventCalibrator};
pub use cells::CellAddressMapper;
pub use cli::{Sctcal, SctcalError};
pub use event::{CalibratedEvent, EventSet, RawEvent};
pub use io::{
    database::Database,
    read::{DatabaseEventSource, RawEventSource},
};
pub use pedestal::{PedestalAccumulator, PedestalRow};
pub use runner::{CalibrationRunner, RunMode};
pub use selection::{IndexSelection, Selection, Triple};
