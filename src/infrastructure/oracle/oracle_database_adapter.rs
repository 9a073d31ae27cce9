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

//! Infrastructure adapter that runs queries against Oracle.

use crate::config::Credentials;
use crate::domain::entities::{Row, Value};
use crate::domain::errors::DatabaseError;
use crate::ports::database_port::{DatabasePort, SqlConnection};
use ::oracle::sql_type::{OracleType, Timestamp};
use ::oracle::Connection;
use chrono::NaiveDate;
use log::info;

/// Concrete implementation of `DatabasePort` for Oracle databases.
///
/// Opens a fresh, unpooled connection on every call so that each table query
/// owns exactly one session for exactly as long as it runs.
pub struct OracleDatabaseAdapter {
    prefetch_rows: u32,
}

impl OracleDatabaseAdapter {
    pub fn new(prefetch_rows: u32) -> Self {
        Self { prefetch_rows }
    }
}

impl DatabasePort for OracleDatabaseAdapter {
    fn connect(
        &self,
        credentials: &Credentials,
    ) -> std::result::Result<Box<dyn SqlConnection>, DatabaseError> {
        info!(
            "Connecting to {} as {}",
            credentials.connection_string, credentials.username
        );
        let conn = Connection::connect(
            &credentials.username,
            &credentials.password,
            &credentials.connection_string,
        )?;
        Ok(Box::new(OracleSession {
            conn,
            prefetch_rows: self.prefetch_rows,
        }))
    }
}

struct OracleSession {
    conn: Connection,
    prefetch_rows: u32,
}

impl SqlConnection for OracleSession {
    fn query_all(&mut self, sql: &str) -> std::result::Result<Vec<Row>, DatabaseError> {
        let mut stmt = self
            .conn
            .statement(sql)
            .prefetch_rows(self.prefetch_rows)
            .build()?;

        let rows = stmt.query(&[])?;
        let col_types: Vec<OracleType> = rows
            .column_info()
            .iter()
            .map(|c| c.oracle_type().clone())
            .collect();

        let mut out = Vec::new();
        for row_res in rows {
            let row = row_res?;
            let mut values = Vec::with_capacity(col_types.len());
            for (i, otype) in col_types.iter().enumerate() {
                values.push(to_value(&row, i, otype)?);
            }
            out.push(values);
        }
        Ok(out)
    }

    fn close(self: Box<Self>) -> std::result::Result<(), DatabaseError> {
        self.conn.close()?;
        Ok(())
    }
}

/// Reads column `i` of `row` into a `Value`, picking the fetch type from the
/// column's Oracle type.
fn to_value(
    row: &::oracle::Row,
    i: usize,
    otype: &OracleType,
) -> std::result::Result<Value, DatabaseError> {
    let value = match otype {
        OracleType::Int64 => row.get::<_, Option<i64>>(i)?.map(Value::Integer),
        OracleType::Number(_, _) | OracleType::Float(_) => {
            row.get::<_, Option<String>>(i)?.map(Value::Number)
        }
        OracleType::BinaryFloat | OracleType::BinaryDouble => {
            row.get::<_, Option<f64>>(i)?.map(Value::Float)
        }
        OracleType::Date
        | OracleType::Timestamp(_)
        | OracleType::TimestampTZ(_)
        | OracleType::TimestampLTZ(_) => row
            .get::<_, Option<Timestamp>>(i)?
            .map(|ts| timestamp_value(&ts)),
        OracleType::Raw(_) | OracleType::BLOB => {
            row.get::<_, Option<Vec<u8>>>(i)?.map(Value::Binary)
        }
        _ => row.get::<_, Option<String>>(i)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Converts an Oracle timestamp to a naive date-time. Dates chrono cannot
/// represent fall back to Oracle's own text form.
fn timestamp_value(ts: &Timestamp) -> Value {
    NaiveDate::from_ymd_opt(ts.year(), ts.month(), ts.day())
        .and_then(|d| {
            d.and_hms_micro_opt(ts.hour(), ts.minute(), ts.second(), ts.nanosecond() / 1000)
        })
        .map(Value::Timestamp)
        .unwrap_or_else(|| Value::Text(ts.to_string()))
}
