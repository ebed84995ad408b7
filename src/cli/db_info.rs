// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use super::common::InfoPrinter;
use crate::{io::database::Database, SctcalError};

#[derive(Parser, Debug)]
pub(super) struct DbInfoArgs {
    /// Path to the database to inspect.
    #[clap(name = "DATABASE", parse(from_os_str))]
    database: PathBuf,

    /// Only list branches whose names contain all of these strings, e.g.
    /// --filter Module118 Channel3
    #[clap(short, long, multiple_values(true))]
    filter: Vec<String>,

    /// Don't list any branches.
    #[clap(long)]
    no_branches: bool,
}

impl DbInfoArgs {
    pub(super) fn run(self) -> Result<(), SctcalError> {
        let db = Database::open(&self.database)?;

        let mut printer = InfoPrinter::new(format!("{}", self.database.display()).into());
        printer.push_block(
            db.attributes()
                .into_iter()
                .map(|(name, value)| format!("{name}: {value}").into())
                .collect(),
        );
        printer.display();

        if !self.no_branches {
            let filter_by: Vec<&str> = self.filter.iter().map(|s| s.as_str()).collect();
            let names = db.branch_names(&filter_by);
            info!("{} matching branches", names.len());
            for name in names {
                info!("  {name}");
            }
        }

        Ok(())
    }
}
