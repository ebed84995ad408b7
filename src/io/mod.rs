// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff: reading raw events and the hierarchical database that holds
//! pedestals and events.

pub mod database;
pub mod read;
