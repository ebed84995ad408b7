// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::{
    display_warnings, InputEventsArgs, OutputDbArgs, RunParams, Warn, ARG_FILE_HELP,
};
use crate::{
    calibrate::{ChargeWindow, ChargeWindowError},
    constants::{DEFAULT_CHARGE_LOWER, DEFAULT_CHARGE_UPPER},
    io::database::{Database, PEDESTAL_KEYS},
    runner::RunMode,
    SctcalError,
};

lazy_static::lazy_static! {
    static ref CHARGE_WINDOW_HELP: String =
        format!("The number of samples before and after the peak to sum into the charge. Default: {DEFAULT_CHARGE_LOWER} {DEFAULT_CHARGE_UPPER}");
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct CalibrateArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "input")]
    #[serde(default)]
    pub(super) input_args: InputEventsArgs,

    /// Path to the pedestal database made by the "pedestal" subcommand.
    #[clap(short, long, help_heading = "CALIBRATION")]
    pub(super) pedestals: Option<PathBuf>,

    #[clap(
        long, number_of_values = 2, allow_hyphen_values = true,
        value_names = &["LOWER", "UPPER"],
        help = CHARGE_WINDOW_HELP.as_str(),
        help_heading = "CALIBRATION"
    )]
    pub(super) charge_window: Option<Vec<i64>>,

    #[clap(flatten)]
    #[serde(rename = "output")]
    #[serde(default)]
    pub(super) output_args: OutputDbArgs,
}

pub(super) struct CalibrateParams {
    pub(super) run_params: RunParams,
    pub(super) pedestals: Database,
    pub(super) window: ChargeWindow,
}

impl CalibrateArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    pub(super) fn merge(self) -> Result<CalibrateArgs, SctcalError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let CalibrateArgs {
                args_file: _,
                input_args,
                pedestals,
                charge_window,
                output_args,
            } = unpack_arg_file!(arg_file);

            Ok(CalibrateArgs {
                args_file: None,
                input_args: cli_args.input_args.merge(input_args),
                pedestals: cli_args.pedestals.or(pedestals),
                charge_window: cli_args.charge_window.or(charge_window),
                output_args: cli_args.output_args.merge(output_args),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<CalibrateParams, SctcalError> {
        debug!("{:#?}", self);

        let CalibrateArgs {
            args_file: _,
            input_args,
            pedestals,
            charge_window,
            output_args,
        } = self;

        let window = match charge_window {
            Some(bounds) => {
                if bounds.iter().any(|&b| b < 0) {
                    format!(
                        "Negative charge-window bounds {bounds:?} are used as sample counts; only their magnitudes matter"
                    )
                    .warn();
                }
                ChargeWindow::from_bounds(&bounds).map_err(CalibrateArgsError::from)?
            }
            None => ChargeWindow::default(),
        };

        let pedestals_file = pedestals.ok_or(CalibrateArgsError::NoPedestals)?;
        let pedestals = Database::open(&pedestals_file)?;
        match pedestals.metadata().keys.as_deref() {
            Some(PEDESTAL_KEYS) => (),
            Some(keys) => {
                return Err(CalibrateArgsError::NotPedestals {
                    file: pedestals_file.display().to_string(),
                    keys: keys.to_string(),
                }
                .into())
            }
            None => format!(
                "'{}' doesn't say what it holds; assuming it holds pedestals",
                pedestals_file.display()
            )
            .warn(),
        }

        let run_params = RunParams::new(input_args, output_args)?;
        run_params.print_info(
            "Calibrating events",
            vec![
                format!("Pedestals from {}", pedestals_file.display()),
                format!("Charge window: {window} samples around the peak"),
            ],
        );
        display_warnings();

        Ok(CalibrateParams {
            run_params,
            pedestals,
            window,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), SctcalError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let CalibrateParams {
            run_params,
            pedestals,
            window,
        } = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        run_params.run(RunMode::Calibrate {
            pedestals: &pedestals,
            window,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum CalibrateArgsError {
    #[error("No pedestal database was supplied")]
    NoPedestals,

    #[error("'{file}' doesn't hold pedestals (it holds: {keys})")]
    NotPedestals { file: String, keys: String },

    #[error(transparent)]
    ChargeWindow(#[from] ChargeWindowError),
}
