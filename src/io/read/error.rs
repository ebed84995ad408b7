// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from reading raw events.

use thiserror::Error;

use crate::io::database::DatabaseError;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Raw event source '{name}' is unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },

    #[error("Event {event} doesn't exist for {triple}")]
    EventOutOfRange { event: usize, triple: String },

    #[error("Expected {expected} samples in event {event}, but got {actual}")]
    SampleCountMismatch {
        event: usize,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
