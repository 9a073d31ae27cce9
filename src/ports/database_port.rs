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

//! # Database Port
//!
//! The contract for "execute SQL, return rows". The pipeline never talks to a
//! driver directly: anything that can open a connection and run a query can
//! be plugged in, whether it is Oracle or a mock used in tests.

use crate::config::Credentials;
use crate::domain::entities::Row;
use crate::domain::errors::DatabaseError;

/// Opens connections. One call per table query.
pub trait DatabasePort: Send + Sync {
    fn connect(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<Box<dyn SqlConnection>, DatabaseError>;
}

/// A single open database session.
pub trait SqlConnection: Send {
    /// Runs `sql` and materializes every row it returns.
    fn query_all(&mut self, sql: &str) -> std::result::Result<Vec<Row>, DatabaseError>;

    /// Releases the session. Consumes the handle so it cannot be closed twice.
    fn close(self: Box<Self>) -> std::result::Result<(), DatabaseError>;
}
