// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Exported Tables
//!
//! The set of tables is compiled in. It is not read from configuration and it
//! cannot be changed per invocation, so every run touches the same tables in
//! the same order.
//!
//! Each table also owns the naming conventions derived from it: the scratch
//! file it is serialized to and the key it is uploaded under.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A table that the pipeline exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    Customers,
    People,
    Organizations,
}

impl TableName {
    /// Every exported table, in processing order.
    pub const ALL: [TableName; 3] = [
        TableName::Customers,
        TableName::People,
        TableName::Organizations,
    ];

    /// The identifier used in SQL and in file and object names.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Customers => "customers",
            TableName::People => "people",
            TableName::Organizations => "organizations",
        }
    }

    /// Full-table projection query. Table names are compile-time constants,
    /// so they are interpolated as-is.
    pub fn select_all_sql(&self) -> String {
        format!("SELECT * FROM {}", self.as_str())
    }

    /// Scratch location of this table's artifact: `<dir>/<table>_results.csv`.
    pub fn artifact_path(&self, scratch_dir: &Path) -> PathBuf {
        scratch_dir.join(format!("{}_results.csv", self.as_str()))
    }

    /// Destination key in the bucket: `table_<table>.csv`.
    pub fn object_key(&self) -> String {
        format!("table_{}.csv", self.as_str())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
