// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Raw events read back from an event database.

use std::path::Path;

use log::debug;

use super::{PacketLocation, RawEventSource, ReadError};
use crate::{
    event::RawEvent,
    io::database::{Branch, Database, DatabaseError},
};

/// Serves the raw events of a database written without calibration (or the
/// raw part of a calibrated one). Events are looked up by triple; packet
/// addressing isn't needed.
pub struct DatabaseEventSource {
    db: Database,
    name: String,
    num_events: usize,
    num_samples: usize,
}

impl DatabaseEventSource {
    /// Open an event database as a raw-event source.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<DatabaseEventSource, ReadError> {
        let path = path.as_ref();
        let db = Database::open(path).map_err(|e| match e {
            DatabaseError::NotFound { .. } | DatabaseError::IO(_) => {
                ReadError::SourceUnavailable {
                    name: path.display().to_string(),
                    reason: e.to_string(),
                }
            }
            e => ReadError::Database(e),
        })?;
        Self::new(db, path.display().to_string())
    }

    /// Use an in-memory event database as a raw-event source. The number of
    /// events and samples come from the database's attributes, or failing
    /// that, its first event branch.
    pub fn new(db: Database, name: String) -> Result<DatabaseEventSource, ReadError> {
        let first_events = db.branches().find_map(|(_, branch)| match branch {
            Branch::Events(events) => Some((events.num_events(), events.num_samples())),
            Branch::Pedestal { .. } => None,
        });

        let metadata = db.metadata();
        let (num_events, num_samples) = match (metadata.num_events(), metadata.waveform_length())
        {
            (Ok(e), Ok(s)) => (e, s),
            _ => first_events.ok_or_else(|| ReadError::SourceUnavailable {
                name: name.clone(),
                reason: "the database doesn't contain any events".to_string(),
            })?,
        };
        debug!("{name}: {num_events} events of {num_samples} samples");

        Ok(DatabaseEventSource {
            db,
            name,
            num_events,
            num_samples,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl RawEventSource for DatabaseEventSource {
    fn num_events(&self) -> usize {
        self.num_events
    }

    fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn packet_size(&self) -> Option<usize> {
        self.db.metadata().packet_size
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn read_event(&self, event: usize, location: &PacketLocation) -> Result<RawEvent, ReadError> {
        let events = self.db.events(&location.triple)?;
        events
            .raw_event(event)
            .ok_or_else(|| ReadError::EventOutOfRange {
                event,
                triple: location.triple.to_string(),
            })
    }
}
