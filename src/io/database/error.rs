// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading or writing databases.

use thiserror::Error;

use crate::pedestal::PedestalError;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Tried to use a database file with an unsupported extension '{ext}'! Supported extensions are: {supported}")]
    UnsupportedExt { ext: String, supported: String },

    #[error("File '{file}' not found. Check name and/or path")]
    NotFound { file: String },

    #[error("The file '{file}' already exists; refusing to overwrite it")]
    FileExists { file: String },

    #[error("The database has no branch '{branch}'")]
    MissingBranch { branch: String },

    #[error("Branch '{branch}' has no '{array}' array")]
    MissingArray { branch: String, array: &'static str },

    #[error("Branch '{branch}' already exists")]
    BranchExists { branch: String },

    #[error("The database is missing the '{0}' attribute")]
    MissingMetadata(&'static str),

    #[error("The arrays of branch '{branch}' don't agree on the number of events")]
    InconsistentEvents { branch: String },

    #[error("Branch '{branch}': {err}")]
    Pedestal { branch: String, err: PedestalError },

    #[error("Couldn't decode the database {file}:\n{err}")]
    Decode { file: String, err: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
