// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::{
    display_warnings, InputEventsArgs, OutputDbArgs, RunParams, ARG_FILE_HELP,
};
use crate::{constants::SPIKE_THRESHOLD, runner::RunMode, SctcalError};

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct PedestalArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "input")]
    #[serde(default)]
    pub(super) input_args: InputEventsArgs,

    #[clap(flatten)]
    #[serde(rename = "output")]
    #[serde(default)]
    pub(super) output_args: OutputDbArgs,
}

impl PedestalArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    pub(super) fn merge(self) -> Result<PedestalArgs, SctcalError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let PedestalArgs {
                args_file: _,
                input_args,
                output_args,
            } = unpack_arg_file!(arg_file);

            Ok(PedestalArgs {
                args_file: None,
                input_args: cli_args.input_args.merge(input_args),
                output_args: cli_args.output_args.merge(output_args),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<RunParams, SctcalError> {
        debug!("{:#?}", self);

        let PedestalArgs {
            args_file: _,
            input_args,
            output_args,
        } = self;

        let params = RunParams::new(input_args, output_args)?;
        params.print_info(
            "Building pedestals",
            vec![format!(
                "Samples at or below {SPIKE_THRESHOLD} ADC counts are rejected as spikes"
            )],
        );
        display_warnings();

        Ok(params)
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), SctcalError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run(RunMode::Pedestal)
    }
}
