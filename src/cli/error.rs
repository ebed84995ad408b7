// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all sctcal-related errors. This should be the *only* error
//! enum that is publicly visible.

use thiserror::Error;

use super::{
    calibrate::CalibrateArgsError,
    common::{InputEventsArgsError, OutputDbArgsError},
};
use crate::{
    io::{database::DatabaseError, read::ReadError},
    runner::{RunError, TripleError},
    selection::SelectionError,
};

/// The *only* publicly visible error from sctcal.
#[derive(Error, Debug)]
pub enum SctcalError {
    /// An error related to building pedestals.
    #[error("{0}")]
    Pedestal(String),

    /// An error related to calibrating events.
    #[error("{0}\n\nCheck that the pedestal database was made with the same modules, chips and channels")]
    Calibrate(String),

    /// An error related to the module, chip and channel selection.
    #[error("{0}\n\nModules, chips and channels are given as a single integer or a list of integers, e.g. --modules 118,121")]
    Selection(String),

    /// An error related to reading raw events.
    #[error("{0}")]
    EventSource(String),

    /// An error related to reading or writing a database.
    #[error("{0}")]
    Database(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files can be made with --save-toml")]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

// Binary sub-command errors.

impl From<InputEventsArgsError> for SctcalError {
    fn from(e: InputEventsArgsError) -> Self {
        let s = e.to_string();
        match e {
            InputEventsArgsError::NoEvents => Self::EventSource(s),
            InputEventsArgsError::NoModules { .. } => Self::Selection(s),
        }
    }
}

impl From<OutputDbArgsError> for SctcalError {
    fn from(e: OutputDbArgsError) -> Self {
        match e {
            OutputDbArgsError::NoOutput => Self::Generic(e.to_string()),
            OutputDbArgsError::Database(e) => Self::from(e),
        }
    }
}

impl From<CalibrateArgsError> for SctcalError {
    fn from(e: CalibrateArgsError) -> Self {
        let s = e.to_string();
        match e {
            CalibrateArgsError::NoPedestals => Self::Calibrate(s),
            CalibrateArgsError::ChargeWindow(_) => Self::Calibrate(s),
            CalibrateArgsError::NotPedestals { .. } => Self::Calibrate(s),
        }
    }
}

// Library errors.

impl From<RunError> for SctcalError {
    fn from(e: RunError) -> Self {
        let s = e.to_string();
        match e {
            RunError::Triple { err, .. } => match err {
                TripleError::Read(_) => Self::EventSource(s),
                TripleError::CellMap(_) => Self::Pedestal(s),
                TripleError::Calibrate(_) | TripleError::Database(_) => Self::Calibrate(s),
            },
            RunError::NoSamples(_) => Self::EventSource(s),
            RunError::Abandoned => Self::Generic(s),
            RunError::Selection(e) => Self::from(e),
            RunError::Database(_) => Self::Database(s),
        }
    }
}

impl From<ReadError> for SctcalError {
    fn from(e: ReadError) -> Self {
        match e {
            ReadError::Database(e) => Self::from(e),
            _ => Self::EventSource(e.to_string()),
        }
    }
}

impl From<DatabaseError> for SctcalError {
    fn from(e: DatabaseError) -> Self {
        let s = e.to_string();
        match e {
            DatabaseError::IO(_) => Self::Generic(s),
            _ => Self::Database(s),
        }
    }
}

impl From<SelectionError> for SctcalError {
    fn from(e: SelectionError) -> Self {
        let s = e.to_string();
        match e {
            SelectionError::InputType { .. }
            | SelectionError::Empty
            | SelectionError::Duplicate { .. } => Self::Selection(s),
            SelectionError::BadPacketSize { .. } => Self::EventSource(s),
        }
    }
}

impl From<std::io::Error> for SctcalError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
