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

//! # Delimited Serializer
//!
//! Turns a table's rows into the text artifact that gets uploaded.
//!
//! The default `Raw` dialect is the format downstream consumers already read:
//! values joined by `,`, rows joined by `\n`, no header, no trailing newline and
//! no quoting at all. A value that itself contains a comma or a newline shifts
//! the columns of its line. That is part of the format and is kept as is.
//!
//! `Quoted` is opt-in and writes RFC 4180 style output through the `csv` crate,
//! quoting only the fields that need it.

use crate::domain::entities::{Artifact, Row};
use crate::domain::errors::{ExportError, Result};
use crate::domain::tables::TableName;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use log::info;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvDialect {
    /// Comma-joined values, newline-joined rows, nothing escaped.
    #[default]
    Raw,
    /// Fields containing `,`, `"` or newlines are quoted.
    Quoted,
}

pub struct DelimitedSerializer {
    dialect: CsvDialect,
}

impl DelimitedSerializer {
    pub fn new(dialect: CsvDialect) -> Self {
        Self { dialect }
    }

    pub fn serialize(&self, table: TableName, rows: &[Row]) -> Result<Vec<u8>> {
        match self.dialect {
            CsvDialect::Raw => Ok(Self::serialize_raw(rows)),
            CsvDialect::Quoted => Self::serialize_quoted(rows).map_err(|reason| {
                ExportError::SerializationError {
                    table: table.to_string(),
                    reason,
                }
            }),
        }
    }

    /// Serializes `rows` and writes them to `<scratch_dir>/<table>_results.csv`,
    /// replacing whatever an earlier run left there.
    pub fn write_artifact(
        &self,
        table: TableName,
        rows: &[Row],
        scratch_dir: &Path,
    ) -> Result<Artifact> {
        let data = self.serialize(table, rows)?;

        let path = table.artifact_path(scratch_dir);
        let write_error = |target: &Path, e: std::io::Error| ExportError::SerializationError {
            table: table.to_string(),
            reason: format!("{}: {}", target.display(), e),
        };
        fs::create_dir_all(scratch_dir).map_err(|e| write_error(scratch_dir, e))?;
        fs::write(&path, &data).map_err(|e| write_error(&path, e))?;
        info!("CSV file created at: {}", path.display());

        Ok(Artifact {
            path,
            bytes: data.len() as u64,
        })
    }

    fn serialize_raw(rows: &[Row]) -> Vec<u8> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>()
            .join("\n")
            .into_bytes()
    }

    fn serialize_quoted(rows: &[Row]) -> std::result::Result<Vec<u8>, String> {
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        for row in rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))
                .map_err(|e| e.to_string())?;
        }

        wtr.into_inner().map_err(|e| e.to_string())
    }
}
