// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Which modules, chips and channels to process, and where their data lives in
//! raw packets.


use std::{fmt, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use vec1::Vec1;

use crate::constants::{CHANNELS_PER_CHIP, CHIPS_PER_MODULE};

/// A non-empty list of module, chip or channel numbers. A user may supply
/// either a single integer or a list of integers; anything else is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IndexSelection(Vec1<u32>);

impl IndexSelection {
    pub fn single(i: u32) -> IndexSelection {
        IndexSelection(Vec1::new(i))
    }

    /// Every index in `0..n`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    pub fn range(n: u32) -> IndexSelection {
        IndexSelection(Vec1::try_from_vec((0..n).collect()).expect("n is not 0"))
    }

    pub fn as_slice(&self) -> &[u32] {
        self.0.as_slice()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl TryFrom<Vec<u32>> for IndexSelection {
    type Error = SelectionError;

    fn try_from(v: Vec<u32>) -> Result<Self, Self::Error> {
        let duplicates = v.iter().duplicates().join(", ");
        if !duplicates.is_empty() {
            return Err(SelectionError::Duplicate { duplicates });
        }
        Vec1::try_from_vec(v)
            .map(IndexSelection)
            .map_err(|_| SelectionError::Empty)
    }
}

impl TryFrom<&serde_json::Value> for IndexSelection {
    type Error = SelectionError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        fn as_index(v: &serde_json::Value) -> Option<u32> {
            v.as_u64().and_then(|i| u32::try_from(i).ok())
        }

        let type_error = || SelectionError::InputType {
            got: value.to_string(),
        };
        match value {
            serde_json::Value::Number(_) => as_index(value)
                .map(IndexSelection::single)
                .ok_or_else(type_error),
            serde_json::Value::Array(values) => {
                let indices = values
                    .iter()
                    .map(as_index)
                    .collect::<Option<Vec<u32>>>()
                    .ok_or_else(type_error)?;
                IndexSelection::try_from(indices)
            }
            _ => Err(type_error()),
        }
    }
}

impl<'de> Deserialize<'de> for IndexSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        IndexSelection::try_from(&value).map_err(serde::de::Error::custom)
    }
}

/// Parse "5" or "1,2,3" (whitespace is ignored).
impl FromStr for IndexSelection {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let indices = s
            .split(',')
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<u32>().map_err(|_| SelectionError::InputType {
                    got: s.to_string(),
                })
            })
            .collect::<Result<Vec<u32>, _>>()?;
        IndexSelection::try_from(indices)
    }
}

impl fmt::Display for IndexSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// A single calibration unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    /// The position of `module` in the run's module list; modules are listed
    /// in the order used during data taking.
    pub module_index: usize,
    pub module: u32,
    pub chip: u32,
    pub channel: u32,
}

impl Triple {
    /// The name of this triple's group in a database.
    pub fn branch_name(&self) -> String {
        format!(
            "Module{}/Chip{}/Channel{}",
            self.module, self.chip, self.channel
        )
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "module {}, chip {}, channel {}",
            self.module, self.chip, self.channel
        )
    }
}

/// The modules, chips and channels of a run to be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub modules: IndexSelection,
    pub chips: IndexSelection,
    pub channels: IndexSelection,
}

impl Selection {
    /// Select `modules` with every chip and every channel.
    pub fn all_channels(modules: IndexSelection) -> Selection {
        Selection {
            modules,
            chips: IndexSelection::range(CHIPS_PER_MODULE),
            channels: IndexSelection::range(CHANNELS_PER_CHIP),
        }
    }

    /// Every triple, ordered by module, then chip, then channel.
    pub fn triples(&self) -> Vec<Triple> {
        let mut triples =
            Vec::with_capacity(self.modules.len() * self.chips.len() * self.channels.len());
        for (module_index, &module) in self.modules.as_slice().iter().enumerate() {
            for &chip in self.chips.as_slice() {
                for &channel in self.channels.as_slice() {
                    triples.push(Triple {
                        module_index,
                        module,
                        chip,
                        channel,
                    });
                }
            }
        }
        triples
    }
}

/// How channels are packed into raw data packets. Each packet holds the
/// waveforms of a fixed number of consecutive channels of one chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLayout {
    pub channels_per_packet: usize,
}

impl PacketLayout {
    /// Work out the layout from the packet size [bytes] and the number of
    /// samples per waveform. A packet has a 10-word header and every waveform
    /// has a 1-word header, with 2-byte words.
    pub fn new(packet_size: usize, num_samples: usize) -> Result<PacketLayout, SelectionError> {
        let channels_per_packet =
            ((0.5 * packet_size as f64 - 10.0) / (num_samples as f64 + 1.0)).floor();
        if channels_per_packet < 1.0 {
            return Err(SelectionError::BadPacketSize {
                packet_size,
                num_samples,
            });
        }
        Ok(PacketLayout {
            channels_per_packet: channels_per_packet as usize,
        })
    }

    /// The linear index of the packet holding `triple`'s waveform.
    pub fn packet_index(&self, triple: &Triple) -> usize {
        let chip_index = CHIPS_PER_MODULE as usize * triple.module_index + triple.chip as usize;
        chip_index * CHANNELS_PER_CHIP as usize / self.channels_per_packet
            + triple.channel as usize / self.channels_per_packet
    }

    /// The position of `triple`'s waveform within its packet.
    pub fn channel_in_packet(&self, triple: &Triple) -> usize {
        triple.channel as usize % self.channels_per_packet
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Input must be an integer or a list of integers, got {got}")]
    InputType { got: String },

    #[error("The list of indices is empty")]
    Empty,

    #[error("Indices may only be given once, but these were repeated: {duplicates}")]
    Duplicate { duplicates: String },

    #[error("A packet of {packet_size} bytes can't hold a waveform of {num_samples} samples")]
    BadPacketSize {
        packet_size: usize,
        num_samples: usize,
    },
}
