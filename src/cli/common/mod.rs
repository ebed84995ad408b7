// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Common arguments for command-line interfaces. The `pedestal`, `calibrate`
//! and `extract` subcommands all read raw events and write a database, so the
//! same input and output arguments are shared between them.

mod printers;

pub(super) use printers::InfoPrinter;
pub(crate) use printers::{display_warnings, Warn};

use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use super::SctcalError;
use crate::{
    constants::{CHANNELS_PER_CHIP, CHIPS_PER_MODULE},
    io::{
        database::{Database, DatabaseError, DatabaseType, DATABASE_TYPES_COMMA_SEPARATED},
        read::{DatabaseEventSource, RawEventSource},
    },
    runner::{CalibrationRunner, RunMode},
    selection::{IndexSelection, Selection},
};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    static ref EVENTS_HELP: String =
        format!("Path to the database holding the run's raw events. Supported formats: {}", *DATABASE_TYPES_COMMA_SEPARATED);

    static ref OUTPUT_HELP: String =
        format!("Path to the output database. Supported formats: {}", *DATABASE_TYPES_COMMA_SEPARATED);

    static ref CHIPS_HELP: String =
        format!("The chips to process, e.g. 0,2. Default: the chips recorded with the events, otherwise all {CHIPS_PER_MODULE}");

    static ref CHANNELS_HELP: String =
        format!("The channels to process, e.g. 0,1,15. Default: the channels recorded with the events, otherwise all {CHANNELS_PER_CHIP}");
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

macro_rules! unpack_arg_file {
    ($arg_file:expr) => ({
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match toml::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(SctcalError::ArgFile(format!(
                            "Couldn't decode toml structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match serde_json::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(SctcalError::ArgFile(format!(
                            "Couldn't decode json structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }

            _ => {
                return Err(SctcalError::ArgFile(format!(
                    "Argument file '{:?}' doesn't have a recognised file extension! Valid extensions are: {}", $arg_file, *ARG_FILE_TYPES_COMMA_SEPARATED)
                ))
            }
        }
    });
}

/// Where the raw events come from and which of them to use.
#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct InputEventsArgs {
    #[clap(short, long, help = EVENTS_HELP.as_str(), help_heading = "INPUT EVENTS")]
    pub(super) events: Option<PathBuf>,

    /// The modules to process, in the order they were read out, e.g. 118,121.
    /// Default: the modules recorded with the events.
    #[clap(short, long, help_heading = "SELECTION")]
    pub(super) modules: Option<IndexSelection>,

    #[clap(long, help = CHIPS_HELP.as_str(), help_heading = "SELECTION")]
    pub(super) chips: Option<IndexSelection>,

    #[clap(long, help = CHANNELS_HELP.as_str(), help_heading = "SELECTION")]
    pub(super) channels: Option<IndexSelection>,
}

impl InputEventsArgs {
    /// Prefer our own values over `other`'s.
    pub(super) fn merge(self, other: InputEventsArgs) -> InputEventsArgs {
        InputEventsArgs {
            events: self.events.or(other.events),
            modules: self.modules.or(other.modules),
            chips: self.chips.or(other.chips),
            channels: self.channels.or(other.channels),
        }
    }

    pub(super) fn parse(self) -> Result<(DatabaseEventSource, Selection), SctcalError> {
        let InputEventsArgs {
            events,
            modules,
            chips,
            channels,
        } = self;

        let events = events.ok_or(InputEventsArgsError::NoEvents)?;
        let source = DatabaseEventSource::open(&events)?;
        let metadata = source.database().metadata();
        let recorded =
            |v: &Option<Vec<u32>>| v.clone().and_then(|v| IndexSelection::try_from(v).ok());

        let modules = modules
            .or_else(|| recorded(&metadata.modules))
            .ok_or_else(|| InputEventsArgsError::NoModules {
                file: events.display().to_string(),
            })?;
        let chips = chips
            .or_else(|| recorded(&metadata.chips))
            .unwrap_or_else(|| IndexSelection::range(CHIPS_PER_MODULE));
        let channels = channels
            .or_else(|| recorded(&metadata.channels))
            .unwrap_or_else(|| IndexSelection::range(CHANNELS_PER_CHIP));

        if metadata.ped_name.is_some() {
            format!(
                "'{}' holds calibrated events; only its raw waveforms are used",
                events.display()
            )
            .warn();
        }

        Ok((
            source,
            Selection {
                modules,
                chips,
                channels,
            },
        ))
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum InputEventsArgsError {
    #[error("No raw-event database was supplied")]
    NoEvents,

    #[error("No modules were specified, and '{file}' doesn't record which modules it holds")]
    NoModules { file: String },
}

/// Where the results go.
#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct OutputDbArgs {
    #[clap(short, long, help = OUTPUT_HELP.as_str(), help_heading = "OUTPUT")]
    pub(super) output: Option<PathBuf>,

    /// Overwrite the output database if it already exists.
    #[clap(long, help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) overwrite: bool,

    /// The run number to record in the output database. Default: the run
    /// recorded with the events.
    #[clap(long, help_heading = "OUTPUT")]
    pub(super) run: Option<u64>,

    /// Comments to record in the output database.
    #[clap(long, help_heading = "OUTPUT")]
    pub(super) comments: Option<String>,
}

impl OutputDbArgs {
    /// Prefer our own values over `other`'s.
    pub(super) fn merge(self, other: OutputDbArgs) -> OutputDbArgs {
        OutputDbArgs {
            output: self.output.or(other.output),
            overwrite: self.overwrite || other.overwrite,
            run: self.run.or(other.run),
            comments: self.comments.or(other.comments),
        }
    }

    /// Check the output database's type and that it isn't going to clobber
    /// anything, so that a whole run isn't done only to fail at the end.
    pub(super) fn parse(self) -> Result<OutputDbParams, OutputDbArgsError> {
        let OutputDbArgs {
            output,
            overwrite,
            run,
            comments,
        } = self;

        let path = output.ok_or(OutputDbArgsError::NoOutput)?;
        DatabaseType::from_path(&path)?;
        if path.exists() {
            if !overwrite {
                return Err(DatabaseError::FileExists {
                    file: path.display().to_string(),
                }
                .into());
            }
            format!("Will overwrite the existing file '{}'", path.display()).warn();
        }

        Ok(OutputDbParams {
            path,
            overwrite,
            run,
            comments,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum OutputDbArgsError {
    #[error("No output database was specified")]
    NoOutput,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub(super) struct OutputDbParams {
    pub(super) path: PathBuf,
    pub(super) overwrite: bool,
    pub(super) run: Option<u64>,
    pub(super) comments: Option<String>,
}

/// Everything needed to run the runner over a run's events and save the
/// result.
pub(super) struct RunParams {
    pub(super) source: DatabaseEventSource,
    pub(super) selection: Selection,
    pub(super) output: OutputDbParams,
}

impl RunParams {
    pub(super) fn new(
        input_args: InputEventsArgs,
        output_args: OutputDbArgs,
    ) -> Result<RunParams, SctcalError> {
        let (source, selection) = input_args.parse()?;
        let mut output = output_args.parse()?;
        if output.run.is_none() {
            output.run = source.database().metadata().run;
        }
        Ok(RunParams {
            source,
            selection,
            output,
        })
    }

    /// Describe the run to the user.
    pub(super) fn print_info(&self, title: &'static str, extra: Vec<String>) {
        let mut printer = InfoPrinter::new(title.into());
        let mut input_block = vec![format!("Events from {}", self.source.name()).into()];
        input_block.push(
            format!(
                "{} events, {} samples per waveform",
                self.source.num_events(),
                self.source.num_samples()
            )
            .into(),
        );
        if let Some(run) = self.output.run {
            input_block.push(format!("Run {run}").into());
        }
        printer.push_block(input_block);
        printer.push_block(vec![
            format!("Modules: {}", self.selection.modules).into(),
            format!("Chips: {}", self.selection.chips).into(),
            format!("Channels: {}", self.selection.channels).into(),
        ]);
        for line in extra {
            printer.push_line(line.into());
        }
        printer.push_line(format!("Writing to {}", self.output.path.display()).into());
        printer.display();
    }

    pub(super) fn run(self, mode: RunMode) -> Result<(), SctcalError> {
        let RunParams {
            source,
            selection,
            output,
        } = self;

        let mut runner = CalibrationRunner::new(&source, selection, mode);
        runner.run = output.run;
        runner.comments = output.comments;
        let mut db = Database::new();
        runner.run(&mut db)?;

        if let Some(parent) = output.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating directory {}", parent.display());
                std::fs::create_dir_all(parent).map_err(DatabaseError::from)?;
            }
        }
        db.save(&output.path, output.overwrite)?;
        info!("Wrote {}", output.path.display());
        Ok(())
    }
}
