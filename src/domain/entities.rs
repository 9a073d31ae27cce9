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

//! # Domain Entities
//!
//! The "Nouns" of the exporter: the values a query returns, the per-table job
//! that moves through the pipeline, and the results it leaves behind.
//!
//! A `TableExportJob` is a small state machine:
//!
//! ```text
//! Pending -> Extracted -> Serialized -> Uploaded
//!     \          \            \
//!      `----------`------------`--> Failed
//! ```
//!
//! The orchestrator only ever moves a job forward; a job is never re-created
//! within a run.

use crate::domain::tables::TableName;
use base64::{engine::general_purpose, Engine as _};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A single column value as delivered by the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    /// Arbitrary-precision numbers are kept in the database's own decimal text.
    Number(String),
    Float(f64),
    Timestamp(NaiveDateTime),
    Binary(Vec<u8>),
}

/// The default textual representation used when a row is serialized.
///
/// `Null` renders as nothing, so a null column shows up as an empty field.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(s) | Value::Number(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.6f")),
            Value::Binary(b) => f.write_str(&general_purpose::STANDARD.encode(b)),
        }
    }
}

/// Column values in the order of the query's projection.
pub type Row = Vec<Value>;

/// Lifecycle stage of a `TableExportJob`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Extracted,
    Serialized,
    Uploaded,
    Failed,
}

/// Serialized output of one table sitting in scratch storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
    pub bytes: u64,
}

/// What the object store acknowledged for a finished upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReceipt {
    pub key: String,
    pub bytes: u64,
    pub e_tag: Option<String>,
    pub version: Option<String>,
}

/// All state the pipeline keeps for one table during a run.
#[derive(Debug)]
pub struct TableExportJob {
    table: TableName,
    rows: Vec<Row>,
    artifact: Option<Artifact>,
    receipt: Option<UploadReceipt>,
    status: JobStatus,
    error: Option<String>,
}

impl TableExportJob {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            rows: Vec::new(),
            artifact: None,
            receipt: None,
            status: JobStatus::Pending,
            error: None,
        }
    }

    pub fn table(&self) -> TableName {
        self.table
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn receipt(&self) -> Option<&UploadReceipt> {
        self.receipt.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `Pending -> Extracted`.
    pub fn mark_extracted(&mut self, rows: Vec<Row>) {
        debug_assert_eq!(self.status, JobStatus::Pending);
        self.rows = rows;
        self.status = JobStatus::Extracted;
    }

    /// `Extracted -> Serialized`. The artifact must be fully written by now.
    pub fn mark_serialized(&mut self, artifact: Artifact) {
        debug_assert_eq!(self.status, JobStatus::Extracted);
        self.artifact = Some(artifact);
        self.status = JobStatus::Serialized;
    }

    /// `Serialized -> Uploaded`.
    pub fn mark_uploaded(&mut self, receipt: UploadReceipt) {
        debug_assert_eq!(self.status, JobStatus::Serialized);
        self.receipt = Some(receipt);
        self.status = JobStatus::Uploaded;
    }

    /// Moves any non-terminal job to `Failed`. A job that already finished
    /// keeps its state.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        if self.is_finished() {
            return;
        }
        self.error = Some(reason.into());
        self.status = JobStatus::Failed;
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Uploaded | JobStatus::Failed)
    }

    /// Produces the read-only result for a finished job.
    pub fn to_result(&self) -> ExportResult {
        let outcome = if self.status == JobStatus::Uploaded {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        ExportResult {
            table: self.table,
            object_key: self.table.object_key(),
            outcome,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failure,
}

/// The final word on one table. Logged, never returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportResult {
    pub table: TableName,
    pub object_key: String,
    pub outcome: Outcome,
    pub error: Option<String>,
}

/// Terminal status of a run, shaped like the invocation response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl RunStatus {
    pub const SUCCESS_MESSAGE: &'static str = "Data exported successfully and uploaded to S3";

    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: Self::SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn failure(error: &dyn std::error::Error) -> Self {
        Self {
            status_code: 500,
            body: format!("Error: {}", error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}
