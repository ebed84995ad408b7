// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Hierarchical databases of pedestals and events.
//!
//! A database is a set of branches, one per (module, chip, channel) triple,
//! addressed by names like "Module118/Chip2/Channel13". A branch holds either
//! a "pedestal" array, or the arrays "event", "block", "phase", "timestamp"
//! and "waveform" (plus "calibratedWaveform", "amplitude", "position" and
//! "charge" when the events were calibrated). Run-level attributes are kept
//! alongside the branches.
//!
//! Databases are kept in memory and written out as json or yaml, depending on
//! the file extension.

mod error;

pub use error::DatabaseError;

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    calibrate::ChargeWindow,
    event::EventSet,
    pedestal::PedestalRow,
    selection::{IndexSelection, Selection, Triple},
};

/// The array names of a pedestal database.
pub const PEDESTAL_KEYS: &str = "pedestal";

/// The array names of an uncalibrated event database.
pub const EVENT_KEYS: &str = "event, block, phase, timestamp, waveform";

/// The array names of a calibrated event database.
pub const CALIBRATED_EVENT_KEYS: &str =
    "event, block, phase, timestamp, waveform, calibratedWaveform, amplitude, position, charge";

const STRUCTURE: &str = "Module#/Chip#/Channel#/'keys'";

lazy_static::lazy_static! {
    pub static ref DATABASE_TYPES_COMMA_SEPARATED: String = DatabaseType::iter().join(", ");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum DatabaseType {
    #[strum(serialize = "json")]
    Json,

    #[strum(serialize = "yaml", serialize = "yml")]
    Yaml,
}

impl DatabaseType {
    /// Work out the database type from a file's extension.
    pub fn from_path(path: &Path) -> Result<DatabaseType, DatabaseError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        DatabaseType::from_str(&ext).map_err(|_| DatabaseError::UnsupportedExt {
            ext,
            supported: DATABASE_TYPES_COMMA_SEPARATED.clone(),
        })
    }
}

/// Run-level attributes of a database. Everything is optional so that partial
/// databases can still be read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: Option<String>,
    pub date: Option<String>,
    pub created_by: Option<String>,
    pub comments: Option<String>,
    pub run: Option<u64>,
    pub run_path: Option<String>,
    pub modules: Option<Vec<u32>>,
    pub chips: Option<Vec<u32>>,
    pub channels: Option<Vec<u32>>,
    pub channels_per_packet: Option<usize>,
    pub packet_size: Option<usize>,
    pub waveform_length: Option<usize>,
    pub num_events: Option<usize>,
    pub keys: Option<String>,
    pub structure: Option<String>,

    /// The pedestal database used to calibrate events.
    pub ped_name: Option<String>,
    pub charge_interval: Option<ChargeWindow>,
}

impl Metadata {
    /// Fill in the attributes describing who made the database and when, and
    /// how it is laid out.
    pub fn stamp(&mut self, keys: &str) {
        self.date = Some(chrono::Local::now().to_string());
        self.created_by = std::env::var("USER").ok();
        self.keys = Some(keys.to_string());
        self.structure = Some(STRUCTURE.to_string());
    }

    pub fn set_selection(&mut self, selection: &Selection) {
        self.modules = Some(selection.modules.as_slice().to_vec());
        self.chips = Some(selection.chips.as_slice().to_vec());
        self.channels = Some(selection.channels.as_slice().to_vec());
    }

    /// The modules, chips and channels recorded in the database.
    pub fn selection(&self) -> Result<Selection, DatabaseError> {
        let get = |v: &Option<Vec<u32>>, name| {
            v.clone()
                .and_then(|v| IndexSelection::try_from(v).ok())
                .ok_or(DatabaseError::MissingMetadata(name))
        };
        Ok(Selection {
            modules: get(&self.modules, "modules")?,
            chips: get(&self.chips, "chips")?,
            channels: get(&self.channels, "channels")?,
        })
    }

    pub fn num_events(&self) -> Result<usize, DatabaseError> {
        self.num_events.ok_or(DatabaseError::MissingMetadata("num_events"))
    }

    pub fn waveform_length(&self) -> Result<usize, DatabaseError> {
        self.waveform_length
            .ok_or(DatabaseError::MissingMetadata("waveform_length"))
    }
}

/// The contents of one (module, chip, channel) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Branch {
    Pedestal { pedestal: Vec<f64> },
    Events(EventSet),
}

impl Branch {
    /// The names of the arrays in this branch.
    pub fn array_names(&self) -> &'static [&'static str] {
        match self {
            Branch::Pedestal { .. } => &["pedestal"],
            Branch::Events(EventSet {
                calibrated: None, ..
            }) => &["block", "event", "phase", "timestamp", "waveform"],
            Branch::Events(_) => &[
                "amplitude",
                "block",
                "calibratedWaveform",
                "charge",
                "event",
                "phase",
                "position",
                "timestamp",
                "waveform",
            ],
        }
    }
}

impl From<PedestalRow> for Branch {
    fn from(row: PedestalRow) -> Self {
        Branch::Pedestal {
            pedestal: row.into_vec(),
        }
    }
}

impl From<EventSet> for Branch {
    fn from(events: EventSet) -> Self {
        Branch::Events(events)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(rename = "attributes")]
    metadata: Metadata,

    branches: BTreeMap<String, Branch>,
}

impl Database {
    pub fn new() -> Database {
        Database::default()
    }

    /// Load an existing database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Database, DatabaseError> {
        let path = path.as_ref();
        let db_type = DatabaseType::from_path(path)?;
        debug!("Reading {db_type} database {}", path.display());

        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DatabaseError::NotFound {
                file: path.display().to_string(),
            },
            _ => DatabaseError::IO(e),
        })?;
        let buf = BufReader::new(file);
        let decode_err = |err: String| DatabaseError::Decode {
            file: path.display().to_string(),
            err,
        };
        let db: Database = match db_type {
            DatabaseType::Json => {
                serde_json::from_reader(buf).map_err(|e| decode_err(e.to_string()))?
            }
            DatabaseType::Yaml => {
                serde_yaml::from_reader(buf).map_err(|e| decode_err(e.to_string()))?
            }
        };

        for (name, branch) in &db.branches {
            if let Branch::Events(events) = branch {
                if !events.is_consistent() {
                    return Err(DatabaseError::InconsistentEvents {
                        branch: name.clone(),
                    });
                }
            }
        }
        trace!("Read {} branches", db.branches.len());

        Ok(db)
    }

    /// Write the database to `path`. Unless `overwrite` is true, an existing
    /// file is an error. The database is written to a temporary file first so
    /// that an incomplete database never appears at `path`.
    pub fn save<P: AsRef<Path>>(&mut self, path: P, overwrite: bool) -> Result<(), DatabaseError> {
        let path = path.as_ref();
        let db_type = DatabaseType::from_path(path)?;
        if path.exists() && !overwrite {
            return Err(DatabaseError::FileExists {
                file: path.display().to_string(),
            });
        }
        self.metadata.name = Some(path.display().to_string());

        let mut tmp_path = PathBuf::from(path);
        tmp_path.set_extension(format!("{db_type}.tmp"));
        debug!("Writing {db_type} database {}", path.display());
        // Don't leave a half-written file behind if anything fails.
        let tmp_path = scopeguard::guard(tmp_path, |tmp_path| {
            trace!("Removing {}", tmp_path.display());
            let _ = std::fs::remove_file(tmp_path);
        });
        {
            let mut buf = BufWriter::new(File::create(&*tmp_path)?);
            match db_type {
                DatabaseType::Json => serde_json::to_writer(&mut buf, &*self)?,
                DatabaseType::Yaml => serde_yaml::to_writer(&mut buf, &*self)?,
            }
            buf.flush()?;
        }
        std::fs::rename(&*tmp_path, path)?;
        scopeguard::ScopeGuard::into_inner(tmp_path);

        Ok(())
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Every (module, chip, channel) group, ordered by name.
    pub fn branches(&self) -> impl Iterator<Item = (&String, &Branch)> {
        self.branches.iter()
    }

    pub fn get_branch(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    fn branch(&self, triple: &Triple) -> Result<&Branch, DatabaseError> {
        let name = triple.branch_name();
        self.branches
            .get(&name)
            .ok_or(DatabaseError::MissingBranch { branch: name })
    }

    /// Get the pedestal row of a triple.
    pub fn pedestal(&self, triple: &Triple) -> Result<PedestalRow, DatabaseError> {
        match self.branch(triple)? {
            Branch::Pedestal { pedestal } => {
                PedestalRow::try_from(pedestal.clone()).map_err(|err| DatabaseError::Pedestal {
                    branch: triple.branch_name(),
                    err,
                })
            }
            Branch::Events(_) => Err(DatabaseError::MissingArray {
                branch: triple.branch_name(),
                array: "pedestal",
            }),
        }
    }

    /// Get the events of a triple.
    pub fn events(&self, triple: &Triple) -> Result<&EventSet, DatabaseError> {
        match self.branch(triple)? {
            Branch::Events(events) => Ok(events),
            Branch::Pedestal { .. } => Err(DatabaseError::MissingArray {
                branch: triple.branch_name(),
                array: "event",
            }),
        }
    }

    /// Add a new branch. Existing branches are never replaced.
    pub fn insert<B: Into<Branch>>(
        &mut self,
        triple: &Triple,
        branch: B,
    ) -> Result<(), DatabaseError> {
        self.commit(vec![(*triple, branch.into())])
    }

    /// Add many branches at once. If any of the branches already exists, or
    /// appears more than once in `branches`, nothing is added.
    pub fn commit(&mut self, branches: Vec<(Triple, Branch)>) -> Result<(), DatabaseError> {
        if let Some(branch) = branches
            .iter()
            .map(|(t, _)| t.branch_name())
            .duplicates()
            .next()
        {
            return Err(DatabaseError::BranchExists { branch });
        }
        if let Some((triple, _)) = branches
            .iter()
            .find(|(t, _)| self.branches.contains_key(&t.branch_name()))
        {
            return Err(DatabaseError::BranchExists {
                branch: triple.branch_name(),
            });
        }
        for (triple, branch) in branches {
            self.branches.insert(triple.branch_name(), branch);
        }
        Ok(())
    }

    /// The names of every group and array in the database, like
    /// "Module118", "Module118/Chip2" and "Module118/Chip2/Channel13/pedestal".
    /// Only names containing every string of `filter_by` are returned.
    pub fn branch_names(&self, filter_by: &[&str]) -> Vec<String> {
        let mut names = std::collections::BTreeSet::new();
        for (name, branch) in &self.branches {
            let mut prefix = String::new();
            for part in name.split('/') {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(part);
                names.insert(prefix.clone());
            }
            for array in branch.array_names() {
                names.insert(format!("{name}/{array}"));
            }
        }

        names
            .into_iter()
            .filter(|n| filter_by.iter().all(|f| n.contains(f)))
            .collect()
    }

    /// All set attributes as (name, value) pairs, sorted by name.
    pub fn attributes(&self) -> Vec<(String, String)> {
        let value = match serde_json::to_value(&self.metadata) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => return vec![],
        };
        value
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s,
                    v => v.to_string(),
                };
                (k, v)
            })
            .sorted()
            .collect()
    }
}
