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

//! Core error definitions for the S3 exporter.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used by every stage of the pipeline: connecting, querying, serializing and
//! uploading.

use thiserror::Error;

/// Error types encountered during an export run.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The database refused or could not establish a connection.
    #[error("Connection failed for {table}: {reason}")]
    ConnectionOpenError { table: String, reason: String },

    #[error("Query failed for {table}: {reason}")]
    QueryError { table: String, reason: String },

    /// Releasing a connection failed. Only ever logged, never propagated.
    #[error("Closing connection for {table} failed: {reason}")]
    ConnectionCloseError { table: String, reason: String },

    #[error("Serialization failed for {table}: {reason}")]
    SerializationError { table: String, reason: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Upload of {key} failed: {reason}")]
    UploadError { key: String, reason: String },

    /// The upload phase was requested while some job had not been serialized.
    #[error("Upload phase blocked: {0}")]
    UploadGateClosed(String),
}

/// Failure reported by a database driver, before the pipeline adds the table
/// it was working on.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct DatabaseError(pub String);

impl From<oracle::Error> for DatabaseError {
    fn from(e: oracle::Error) -> Self {
        DatabaseError(e.to_string())
    }
}

/// A specialized Result type for the S3 exporter.
pub type Result<T> = std::result::Result<T, ExportError>;
