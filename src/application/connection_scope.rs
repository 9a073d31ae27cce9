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

//! # Connection Scope
//!
//! Every table query gets its own connection, and that connection must be
//! released no matter how the query ends. Two pieces make that work:
//!
//! 1. **`ConnectionGuard`**: owns the session handle. Calling `release` closes it
//!    and reports how the close went. If the guard is dropped without being
//!    released (an early return, a panic unwinding through the caller), `Drop`
//!    closes it instead.
//! 2. **`Scoped<T>`**: the return value of `with_connection`. It keeps the
//!    outcome of the work and the outcome of the cleanup side by side, so a
//!    failed close can never overwrite a query error or turn a success into
//!    a failure.

use crate::config::Credentials;
use crate::domain::errors::{ExportError, Result};
use crate::domain::tables::TableName;
use crate::ports::database_port::{DatabasePort, SqlConnection};
use log::{debug, warn};

/// How releasing the connection went.
#[derive(Debug)]
pub enum Cleanup {
    /// The connection was closed cleanly.
    Released,
    /// Closing failed. Logged; never merged into the operation's result.
    Failed(ExportError),
    /// No connection was ever opened.
    NotAcquired,
}

/// Result of a scoped operation together with its cleanup outcome.
#[derive(Debug)]
pub struct Scoped<T> {
    pub outcome: Result<T>,
    pub cleanup: Cleanup,
}

impl<T> Scoped<T> {
    /// Drops the cleanup half and returns what the operation produced.
    pub fn into_outcome(self) -> Result<T> {
        self.outcome
    }
}

/// Owns an open connection until it is released.
pub struct ConnectionGuard {
    table: TableName,
    conn: Option<Box<dyn SqlConnection>>,
}

impl ConnectionGuard {
    pub fn new(table: TableName, conn: Box<dyn SqlConnection>) -> Self {
        Self {
            table,
            conn: Some(conn),
        }
    }

    /// Borrow of the live session.
    ///
    /// The handle is only taken out in `release` or `Drop`, both of which
    /// consume the guard, so it is always present here.
    pub fn connection(&mut self) -> &mut dyn SqlConnection {
        match self.conn.as_mut() {
            Some(conn) => conn.as_mut(),
            None => unreachable!("connection taken before the guard was consumed"),
        }
    }

    /// Closes the connection and reports the outcome. Failures are logged here
    /// and handed back, never raised.
    pub fn release(mut self) -> Cleanup {
        self.close_inner()
    }

    fn close_inner(&mut self) -> Cleanup {
        let Some(conn) = self.conn.take() else {
            return Cleanup::NotAcquired;
        };
        match conn.close() {
            Ok(()) => {
                debug!("Connection for {} released", self.table);
                Cleanup::Released
            }
            Err(e) => {
                let err = ExportError::ConnectionCloseError {
                    table: self.table.to_string(),
                    reason: e.to_string(),
                };
                warn!("{}", err);
                Cleanup::Failed(err)
            }
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.conn.is_some() {
            debug!("Releasing connection for {} on unwind", self.table);
            let _ = self.close_inner();
        }
    }
}

/// Opens a connection for `table`, runs `f` against it and always releases it.
///
/// An open failure becomes `ExportError::ConnectionOpenError` in `outcome`,
/// with `Cleanup::NotAcquired`.
pub fn with_connection<T, F>(
    database: &dyn DatabasePort,
    credentials: &Credentials,
    table: TableName,
    f: F,
) -> Scoped<T>
where
    F: FnOnce(&mut dyn SqlConnection) -> Result<T>,
{
    let conn = match database.connect(credentials) {
        Ok(conn) => conn,
        Err(e) => {
            return Scoped {
                outcome: Err(ExportError::ConnectionOpenError {
                    table: table.to_string(),
                    reason: e.to_string(),
                }),
                cleanup: Cleanup::NotAcquired,
            }
        }
    };

    let mut guard = ConnectionGuard::new(table, conn);
    let outcome = f(guard.connection());
    let cleanup = guard.release();

    Scoped { outcome, cleanup }
}
