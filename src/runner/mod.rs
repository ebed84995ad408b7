// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Driving pedestal building and event calibration over every selected
//! (module, chip, channel) triple of a run.
//!
//! Triples are independent of each other, so they are processed in parallel;
//! each one owns its accumulator or output arrays. Nothing is written to the
//! output database until every triple has succeeded.


use std::collections::HashMap;

use crossbeam_utils::atomic::AtomicCell;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;
use scopeguard::defer_on_unwind;
use thiserror::Error;

use crate::{
    calibrate::{CalibrateError, ChargeWindow, EventCalibrator},
    cells::{CellAddressMapper, CellMapError},
    event::{EventSet, RawEvent},
    io::{
        database::{
            Branch, Database, DatabaseError, CALIBRATED_EVENT_KEYS, EVENT_KEYS, PEDESTAL_KEYS,
        },
        read::{PacketLocation, RawEventSource, ReadError},
    },
    pedestal::{PedestalAccumulator, PedestalRow},
    selection::{PacketLayout, Selection, SelectionError, Triple},
    PROGRESS_BARS,
};

/// How often (in events) a worker checks whether another worker has failed.
const ERROR_CHECK_INTERVAL: usize = 256;

/// What to do with each triple's events.
#[derive(Debug, Clone, Copy)]
pub enum RunMode<'a> {
    /// Learn a pedestal row for each triple.
    Pedestal,

    /// Subtract the pedestals in the given database from every event and
    /// extract amplitudes, positions and charges.
    Calibrate {
        pedestals: &'a Database,
        window: ChargeWindow,
    },

    /// Copy the raw events without calibrating them.
    Extract,
}

impl RunMode<'_> {
    fn description(&self) -> &'static str {
        match self {
            RunMode::Pedestal => "Building pedestals",
            RunMode::Calibrate { .. } => "Calibrating events",
            RunMode::Extract => "Extracting events",
        }
    }
}

pub struct CalibrationRunner<'a> {
    source: &'a dyn RawEventSource,
    selection: Selection,
    mode: RunMode<'a>,
    mapper: CellAddressMapper,

    /// The run number, recorded in the output database.
    pub run: Option<u64>,

    /// Free-text comments recorded in the output database.
    pub comments: Option<String>,
}

impl<'a> CalibrationRunner<'a> {
    pub fn new(
        source: &'a dyn RawEventSource,
        selection: Selection,
        mode: RunMode<'a>,
    ) -> CalibrationRunner<'a> {
        CalibrationRunner {
            source,
            selection,
            mode,
            mapper: CellAddressMapper::new(),
            run: None,
            comments: None,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Process every selected triple and add the results to `db`. If anything
    /// goes wrong, `db` is left untouched.
    pub fn run(&self, db: &mut Database) -> Result<(), RunError> {
        let num_events = self.source.num_events();
        let num_samples = self.source.num_samples();
        if num_samples == 0 {
            return Err(RunError::NoSamples(self.source.name()));
        }
        let layout = match self.source.packet_size() {
            Some(packet_size) => PacketLayout::new(packet_size, num_samples)?,
            None => PacketLayout {
                channels_per_packet: 1,
            },
        };
        let triples = self.selection.triples();
        info!(
            "{} from {} ({} events of {} samples, {} triples)",
            self.mode.description(),
            self.source.name(),
            num_events,
            num_samples,
            triples.len()
        );

        // Get all of the pedestals up front; a missing one should stop the run
        // before any work is done.
        let pedestals: HashMap<Triple, PedestalRow> = match self.mode {
            RunMode::Calibrate { pedestals, .. } => triples
                .iter()
                .map(|triple| {
                    pedestals
                        .pedestal(triple)
                        .map(|row| (*triple, row))
                        .map_err(|e| RunError::triple(triple, None, e))
                })
                .collect::<Result<_, _>>()?,
            _ => HashMap::new(),
        };

        // Progress bars.
        let multi_progress = MultiProgress::with_draw_target(if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        });
        let event_progress = multi_progress.add(
            ProgressBar::new((num_events * triples.len()) as _)
                .with_style(
                    ProgressStyle::default_bar()
                        .template("{msg:18}: [{wide_bar:.blue}] {percent:>3}% ({elapsed_precise}<{eta_precise})").unwrap()
                        .progress_chars("=> "),
                )
                .with_position(0)
                .with_message(self.mode.description()),
        );
        let triple_progress = multi_progress.add(
            ProgressBar::new(triples.len() as _)
                .with_style(
                    ProgressStyle::default_bar()
                        .template("{msg:18}: [{wide_bar:.blue}] {pos:3}/{len:3} triples").unwrap()
                        .progress_chars("=> "),
                )
                .with_position(0)
                .with_message("Channels finished"),
        );

        // Use a variable to track whether any workers have an issue.
        let error = AtomicCell::new(false);
        let results: Vec<Result<Option<(Triple, Branch)>, RunError>> = triples
            .par_iter()
            .map(|triple| {
                // If a panic happens, update our atomic error.
                defer_on_unwind! { error.store(true); }
                if error.load() {
                    return Ok(None);
                }

                let location = PacketLocation {
                    triple: *triple,
                    packet: layout.packet_index(triple),
                    channel_in_packet: layout.channel_in_packet(triple),
                };
                let result = self.process_triple(
                    &location,
                    num_events,
                    num_samples,
                    pedestals.get(triple),
                    &error,
                    &event_progress,
                );
                // Let the other workers see the failure so they can abandon
                // their work early.
                if result.is_err() {
                    error.store(true);
                }
                triple_progress.inc(1);
                result.map(|branch| branch.map(|b| (*triple, b)))
            })
            .collect();
        event_progress.abandon();
        triple_progress.abandon();

        let mut branches = Vec::with_capacity(results.len());
        for result in results {
            if let Some(branch) = result? {
                branches.push(branch);
            }
        }
        if branches.len() != triples.len() {
            // Only possible if a worker panicked.
            return Err(RunError::Abandoned);
        }

        db.commit(branches)?;
        self.write_metadata(db, num_events, num_samples, &layout);
        info!("{} complete", self.mode.description());

        Ok(())
    }

    /// Run a single triple through the state machine. `Ok(None)` means that
    /// another triple failed and this one was abandoned.
    fn process_triple(
        &self,
        location: &PacketLocation,
        num_events: usize,
        num_samples: usize,
        pedestal: Option<&PedestalRow>,
        error: &AtomicCell<bool>,
        progress: &ProgressBar,
    ) -> Result<Option<Branch>, RunError> {
        let triple = &location.triple;
        debug!("Processing {num_events} events from {triple}");

        let read = |i: usize| -> Result<RawEvent, RunError> {
            let event = self
                .source
                .read_event(i, location)
                .map_err(|e| RunError::triple(triple, Some(i), e))?;
            if event.samples.len() != num_samples {
                return Err(RunError::triple(
                    triple,
                    Some(i),
                    ReadError::SampleCountMismatch {
                        event: i,
                        expected: num_samples,
                        actual: event.samples.len(),
                    },
                ));
            }
            Ok(event)
        };
        let abandon = |i: usize| i % ERROR_CHECK_INTERVAL == 0 && error.load();

        let branch = match (self.mode, pedestal) {
            (RunMode::Pedestal, _) => {
                let mut acc = PedestalAccumulator::new();
                for i in 0..num_events {
                    if abandon(i) {
                        return Ok(None);
                    }
                    let event = read(i)?;
                    acc.ingest(&event, &self.mapper)
                        .map_err(|e| RunError::triple(triple, Some(i), e))?;
                    progress.inc(1);
                }
                debug!(
                    "{triple}: {} samples rejected as spikes, {} cells without data",
                    acc.num_rejected(),
                    acc.num_empty_cells()
                );
                Branch::from(acc.finalize())
            }

            (RunMode::Calibrate { window, .. }, Some(pedestal)) => {
                let calibrator = EventCalibrator::new(&self.mapper, pedestal, window);
                let mut events = EventSet::new(num_events, num_samples, true);
                for i in 0..num_events {
                    if abandon(i) {
                        return Ok(None);
                    }
                    let cal = calibrator
                        .calibrate(read(i)?)
                        .map_err(|e| RunError::triple(triple, Some(i), e))?;
                    events.set_calibrated(i, &cal);
                    progress.inc(1);
                }
                Branch::from(events)
            }

            (RunMode::Calibrate { .. }, None) => {
                return Err(RunError::triple(
                    triple,
                    None,
                    DatabaseError::MissingBranch {
                        branch: triple.branch_name(),
                    },
                ))
            }

            (RunMode::Extract, _) => {
                let mut events = EventSet::new(num_events, num_samples, false);
                for i in 0..num_events {
                    if abandon(i) {
                        return Ok(None);
                    }
                    events.set_raw(i, &read(i)?);
                    progress.inc(1);
                }
                Branch::from(events)
            }
        };

        Ok(Some(branch))
    }

    fn write_metadata(
        &self,
        db: &mut Database,
        num_events: usize,
        num_samples: usize,
        layout: &PacketLayout,
    ) {
        let metadata = db.metadata_mut();
        let keys = match self.mode {
            RunMode::Pedestal => PEDESTAL_KEYS,
            RunMode::Calibrate { pedestals, window } => {
                metadata.ped_name = pedestals.metadata().name.clone();
                metadata.charge_interval = Some(window);
                CALIBRATED_EVENT_KEYS
            }
            RunMode::Extract => EVENT_KEYS,
        };
        metadata.stamp(keys);
        metadata.set_selection(&self.selection);
        metadata.run = self.run;
        metadata.comments = self.comments.clone();
        metadata.run_path = Some(self.source.name());
        metadata.waveform_length = Some(num_samples);
        metadata.num_events = Some(num_events);
        metadata.packet_size = self.source.packet_size();
        metadata.channels_per_packet = metadata.packet_size.map(|_| layout.channels_per_packet);
    }
}

fn event_context(event: &Option<usize>) -> String {
    match event {
        Some(e) => format!(", event {e}"),
        None => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Error processing {triple}{}: {err}", event_context(.event))]
    Triple {
        triple: Triple,
        event: Option<usize>,
        #[source]
        err: TripleError,
    },

    #[error("The raw-event source '{0}' has no samples in its waveforms")]
    NoSamples(String),

    #[error("Processing was abandoned before every triple was finished")]
    Abandoned,

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl RunError {
    fn triple<E: Into<TripleError>>(triple: &Triple, event: Option<usize>, err: E) -> RunError {
        RunError::Triple {
            triple: *triple,
            event,
            err: err.into(),
        }
    }
}

/// Errors that can happen while processing a single triple.
#[derive(Error, Debug)]
pub enum TripleError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    CellMap(#[from] CellMapError),

    #[error(transparent)]
    Calibrate(#[from] CalibrateError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
