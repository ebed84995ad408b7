// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

The storage geometry of the readout chip is fixed; every physical cell of a
channel belongs to exactly one block.
 */

/// The number of storage blocks on each channel of a readout chip.
pub const N_BLOCKS: usize = 512;

/// The number of storage cells in a block.
pub const N_CELLS_PER_BLOCK: usize = 32;

/// The total number of physical storage cells on a channel.
pub const N_CELLS: usize = N_BLOCKS * N_CELLS_PER_BLOCK;

/// Raw ADC samples at or below this value are treated as data spikes and never
/// contribute to a pedestal.
pub const SPIKE_THRESHOLD: u16 = 100;

/// The number of readout chips on a camera module.
pub const CHIPS_PER_MODULE: u32 = 4;

/// The number of channels on a readout chip.
pub const CHANNELS_PER_CHIP: u32 = 16;

/// The default number of samples before the peak included in the integrated
/// charge.
pub const DEFAULT_CHARGE_LOWER: usize = 8;

/// The default number of samples after the peak included in the integrated
/// charge.
pub const DEFAULT_CHARGE_UPPER: usize = 8;

/// The number of decimal places kept in pedestals and calibrated waveforms.
pub(crate) const ROUNDING_DECIMALS: i32 = 2;
