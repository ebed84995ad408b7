// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sources of raw events.
//!
//! Decoding the raw data packets of a run is done elsewhere; anything that can
//! hand over one channel's samples for one event can be calibrated.

mod database;
mod error;

pub use database::DatabaseEventSource;
pub use error::ReadError;

use crate::{event::RawEvent, selection::Triple};

/// Where one channel's waveform lives in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLocation {
    pub triple: Triple,

    /// The linear index of the data packet holding the waveform.
    pub packet: usize,

    /// The position of the waveform within its packet.
    pub channel_in_packet: usize,
}

pub trait RawEventSource: Sync + Send {
    /// The number of events in the run.
    fn num_events(&self) -> usize;

    /// The number of samples in each waveform.
    fn num_samples(&self) -> usize;

    /// The size of a raw data packet [bytes], if the source is packet based.
    fn packet_size(&self) -> Option<usize>;

    /// A description of the source, e.g. a file name.
    fn name(&self) -> String;

    /// Read one channel's waveform (and its block, phase and timestamp) for a
    /// single event.
    fn read_event(&self, event: usize, location: &PacketLocation) -> Result<RawEvent, ReadError>;
}
