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

//! Pulls every row of one table through a scoped connection.

use crate::application::connection_scope::{with_connection, Cleanup};
use crate::config::Credentials;
use crate::domain::entities::Row;
use crate::domain::errors::{ExportError, Result};
use crate::domain::tables::TableName;
use crate::ports::database_port::DatabasePort;
use log::{debug, info};
use std::sync::Arc;

pub struct TableExporter {
    database: Arc<dyn DatabasePort>,
}

impl TableExporter {
    pub fn new(database: Arc<dyn DatabasePort>) -> Self {
        Self { database }
    }

    /// Runs `SELECT * FROM <table>` and materializes the whole result.
    ///
    /// No paging and no retry: a failed query surfaces as `QueryError` and
    /// the connection is still released.
    pub fn export(&self, table: TableName, credentials: &Credentials) -> Result<Vec<Row>> {
        let sql = table.select_all_sql();
        info!("Querying {}: {}", table, sql);

        let scoped = with_connection(self.database.as_ref(), credentials, table, |conn| {
            conn.query_all(&sql).map_err(|e| ExportError::QueryError {
                table: table.to_string(),
                reason: e.to_string(),
            })
        });

        if let Cleanup::Failed(e) = &scoped.cleanup {
            debug!("Ignoring cleanup failure for {}: {}", table, e);
        }

        let rows = scoped.into_outcome()?;
        info!("Query Result for {}: {} rows", table, rows.len());
        debug!("Rows for {}: {:?}", table, rows);
        Ok(rows)
    }
}
