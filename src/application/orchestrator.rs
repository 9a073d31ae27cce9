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

//! The core application logic that drives a whole export run.
//!
//! A run has two phases:
//!
//! 1. **Extraction**: each table, in order, is queried and serialized to
//!    scratch storage. The first failure ends the run; nothing is uploaded,
//!    not even the tables that were already serialized.
//! 2. **Upload**: entered only through `UploadGate`, which checks that every
//!    job reached `Serialized`. Each artifact is uploaded in order. By default
//!    the first failed upload stops the rest.
//!
//! Whatever happens, the run is folded into one `RunStatus`.

use crate::application::serializer::{CsvDialect, DelimitedSerializer};
use crate::application::table_exporter::TableExporter;
use crate::config::{AppConfig, Credentials, UploadFailurePolicy};
use crate::domain::entities::{ExportResult, JobStatus, Outcome, RunStatus, TableExportJob};
use crate::domain::errors::{ExportError, Result};
use crate::domain::tables::TableName;
use crate::ports::database_port::DatabasePort;
use crate::ports::storage_port::StoragePort;
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Run-level check between the two phases.
pub struct UploadGate;

impl UploadGate {
    /// Opens only when every job is `Serialized`.
    pub fn check(jobs: &[TableExportJob]) -> Result<()> {
        let blocked: Vec<String> = jobs
            .iter()
            .filter(|j| j.status() != JobStatus::Serialized)
            .map(|j| format!("{} is {:?}", j.table(), j.status()))
            .collect();

        if blocked.is_empty() {
            Ok(())
        } else {
            Err(ExportError::UploadGateClosed(blocked.join(", ")))
        }
    }
}

/// Everything a run produced: one result per table, plus the error that
/// ended it, if any.
#[derive(Debug)]
pub struct RunOutcome {
    pub results: Vec<ExportResult>,
    pub failure: Option<ExportError>,
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        match &self.failure {
            None => RunStatus::success(),
            Some(e) => RunStatus::failure(e),
        }
    }
}

/// Drives the fixed table list through extract, serialize and upload.
pub struct PipelineOrchestrator {
    exporter: TableExporter,
    serializer: DelimitedSerializer,
    storage: Arc<dyn StoragePort>,
    credentials: Credentials,
    scratch_dir: PathBuf,
    upload_failure: UploadFailurePolicy,
    tables: Vec<TableName>,
}

impl PipelineOrchestrator {
    pub fn new(
        database: Arc<dyn DatabasePort>,
        storage: Arc<dyn StoragePort>,
        config: &AppConfig,
    ) -> Result<Self> {
        let dialect = if config.export.quote_fields {
            CsvDialect::Quoted
        } else {
            CsvDialect::Raw
        };

        Ok(Self {
            exporter: TableExporter::new(database),
            serializer: DelimitedSerializer::new(dialect),
            storage,
            credentials: config.credentials()?,
            scratch_dir: config.export.scratch_dir(),
            upload_failure: config.export.upload_failure,
            tables: TableName::ALL.to_vec(),
        })
    }

    #[cfg(test)]
    fn with_tables(mut self, tables: &[TableName]) -> Self {
        self.tables = tables.to_vec();
        self
    }

    /// Runs the pipeline and reduces it to the invocation response.
    pub fn run(&self) -> RunStatus {
        let start_time = Instant::now();
        info!("Starting export of {} tables...", self.tables.len());

        let outcome = self.execute();
        self.log_summary(&outcome, start_time.elapsed().as_secs_f64());

        let status = outcome.status();
        match &outcome.failure {
            None => info!("{}", status.body),
            Some(e) => error!("Export run failed: {}", e),
        }
        status
    }

    /// Runs both phases and returns the per-table results.
    pub fn execute(&self) -> RunOutcome {
        let mut jobs: Vec<TableExportJob> =
            self.tables.iter().copied().map(TableExportJob::new).collect();

        let failure = self.run_phases(&mut jobs).err();

        if let Some(e) = &failure {
            let reason = format!("run aborted: {}", e);
            for job in jobs.iter_mut().filter(|j| !j.is_finished()) {
                job.mark_failed(reason.clone());
            }
        }

        RunOutcome {
            results: jobs.iter().map(TableExportJob::to_result).collect(),
            failure,
        }
    }

    fn run_phases(&self, jobs: &mut [TableExportJob]) -> Result<()> {
        self.extraction_phase(jobs)?;
        UploadGate::check(jobs)?;
        self.upload_phase(jobs)
    }

    fn extraction_phase(&self, jobs: &mut [TableExportJob]) -> Result<()> {
        for job in jobs.iter_mut() {
            if let Err(e) = self.extract_one(job) {
                error!("Extraction failed for {}: {}", job.table(), e);
                job.mark_failed(e.to_string());
                return Err(e);
            }
        }
        Ok(())
    }

    fn extract_one(&self, job: &mut TableExportJob) -> Result<()> {
        let table = job.table();
        let rows = self.exporter.export(table, &self.credentials)?;
        job.mark_extracted(rows);

        let artifact = self
            .serializer
            .write_artifact(table, job.rows(), &self.scratch_dir)?;
        job.mark_serialized(artifact);
        Ok(())
    }

    fn upload_phase(&self, jobs: &mut [TableExportJob]) -> Result<()> {
        let mut first_error: Option<ExportError> = None;

        for job in jobs.iter_mut() {
            let key = job.table().object_key();
            let Some(artifact) = job.artifact().cloned() else {
                let err = ExportError::UploadGateClosed(format!(
                    "{} is {:?} with no artifact",
                    job.table(),
                    job.status()
                ));
                job.mark_failed(err.to_string());
                return Err(err);
            };

            match self.storage.upload(&artifact.path, &key) {
                Ok(receipt) => {
                    info!("CSV file uploaded with object key: {}", receipt.key);
                    job.mark_uploaded(receipt);
                }
                Err(e) => {
                    error!("Upload failed for {}: {}", job.table(), e);
                    job.mark_failed(e.to_string());
                    match self.upload_failure {
                        UploadFailurePolicy::Abort => return Err(e),
                        UploadFailurePolicy::Continue => {
                            first_error.get_or_insert(e);
                        }
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn log_summary(&self, outcome: &RunOutcome, duration_secs: f64) {
        for r in &outcome.results {
            match &r.error {
                None => info!("{} -> {}: {:?}", r.table, r.object_key, r.outcome),
                Some(e) => error!("{} -> {}: {:?} ({})", r.table, r.object_key, r.outcome, e),
            }
        }
        let uploaded = outcome
            .results
            .iter()
            .filter(|r| r.outcome == Outcome::Success)
            .count();
        info!(
            "Export finished in {:.2}s. {}/{} tables uploaded.",
            duration_secs,
            uploaded,
            outcome.results.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::connection_scope::test_support::FakeDatabase;
    use crate::config::{DatabaseConfig, ExportConfig, StorageConfig};
    use crate::domain::entities::{UploadReceipt, Value};
    use std::path::Path;
    use std::sync::Mutex;

    /// Records every upload; can be told to reject specific keys.
    #[derive(Default)]
    struct RecordingStorage {
        uploads: Mutex<Vec<(String, String)>>,
        attempts: Mutex<Vec<String>>,
        reject: Vec<String>,
    }

    impl RecordingStorage {
        fn rejecting(keys: &[&str]) -> Self {
            Self {
                reject: keys.iter().map(|k| k.to_string()).collect(),
                ..Self::default()
            }
        }

        fn keys(&self) -> Vec<String> {
            self.uploads.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
        }
    }

    impl StoragePort for RecordingStorage {
        fn upload(&self, artifact_path: &Path, object_key: &str) -> Result<UploadReceipt> {
            self.attempts.lock().unwrap().push(object_key.to_string());
            if self.reject.iter().any(|k| k == object_key) {
                return Err(ExportError::UploadError {
                    key: object_key.to_string(),
                    reason: "Access Denied".into(),
                });
            }
            let body = std::fs::read_to_string(artifact_path)?;
            let bytes = body.len() as u64;
            self.uploads
                .lock()
                .unwrap()
                .push((object_key.to_string(), body));
            Ok(UploadReceipt {
                key: object_key.to_string(),
                bytes,
                e_tag: None,
                version: None,
            })
        }
    }

    fn config(scratch: &Path, policy: UploadFailurePolicy) -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                username: "TEST".to_string(),
                password: Some("secret".to_string()),
                connection_string: Some("localhost/XE".to_string()),
                ..DatabaseConfig::default()
            },
            storage: StorageConfig {
                bucket: "exports".to_string(),
                ..StorageConfig::default()
            },
            export: ExportConfig {
                scratch_dir: Some(scratch.to_str().unwrap().to_string()),
                quote_fields: false,
                upload_failure: policy,
            },
        }
    }

    fn populated_db() -> FakeDatabase {
        FakeDatabase::default()
            .with_table(
                "customers",
                vec![
                    vec![Value::Integer(1), Value::Text("Acme".into())],
                    vec![Value::Integer(2), Value::Text("Globex".into())],
                ],
            )
            .with_table("people", vec![vec![Value::Text("Ada".into()), Value::Null]])
            .with_table("organizations", vec![])
    }

    #[test]
    fn test_orchestrator_run_success() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(RecordingStorage::default());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(populated_db()),
            storage.clone(),
            &config(dir.path(), UploadFailurePolicy::Abort),
        )
        .unwrap();

        let status = orchestrator.run();
        assert_eq!(status, RunStatus::success());
        assert_eq!(
            storage.keys(),
            vec!["table_customers.csv", "table_people.csv", "table_organizations.csv"]
        );

        let uploads = storage.uploads.lock().unwrap();
        assert_eq!(uploads[0].1, "1,Acme\n2,Globex");
        assert_eq!(uploads[1].1, "Ada,");
        assert_eq!(uploads[2].1, "");
    }

    #[test]
    fn test_query_failure_at_any_position_blocks_all_uploads() {
        for failing in TableName::ALL {
            let dir = tempfile::tempdir().unwrap();
            let db = Arc::new(
                populated_db().failing(failing.as_str(), "ORA-00942: table or view does not exist"),
            );
            let storage = Arc::new(RecordingStorage::default());
            let orchestrator = PipelineOrchestrator::new(
                db.clone(),
                storage.clone(),
                &config(dir.path(), UploadFailurePolicy::Abort),
            )
            .unwrap();

            let outcome = orchestrator.execute();
            assert!(outcome.failure.is_some());
            assert!(storage.attempts.lock().unwrap().is_empty(), "failing {}", failing);

            // Tables after the failing one are never queried.
            let position = TableName::ALL.iter().position(|t| *t == failing).unwrap();
            assert_eq!(db.ledger().queries.len(), position + 1);
            let ledger = db.ledger();
            assert_eq!(ledger.opened, ledger.closed);
        }
    }

    #[test]
    fn test_last_table_failure_reports_its_message() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(
            populated_db().failing("organizations", "ORA-00942: table or view does not exist"),
        );
        let storage = Arc::new(RecordingStorage::default());
        let orchestrator = PipelineOrchestrator::new(
            db,
            storage.clone(),
            &config(dir.path(), UploadFailurePolicy::Abort),
        )
        .unwrap();

        let outcome = orchestrator.execute();
        let status = outcome.status();
        assert_eq!(status.status_code, 500);
        assert_eq!(
            status.body,
            "Error: Query failed for organizations: ORA-00942: table or view does not exist"
        );
        assert!(storage.keys().is_empty());

        // Earlier artifacts stay behind in scratch storage.
        assert!(dir.path().join("customers_results.csv").exists());
        assert!(outcome.results.iter().all(|r| r.outcome == Outcome::Failure));
        assert_eq!(outcome.results.len(), 3);
    }

    #[test]
    fn test_scratch_write_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch_is_a_file");
        std::fs::write(&scratch, "not a directory").unwrap();

        let storage = Arc::new(RecordingStorage::default());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(populated_db()),
            storage.clone(),
            &config(&scratch, UploadFailurePolicy::Abort),
        )
        .unwrap();

        let status = orchestrator.run();
        assert_eq!(status.status_code, 500);
        assert!(
            status.body.starts_with("Error: Serialization failed for customers:"),
            "{}",
            status.body
        );
        assert!(storage.attempts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_upload_phase_rejects_job_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(RecordingStorage::default());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(populated_db()),
            storage.clone(),
            &config(dir.path(), UploadFailurePolicy::Continue),
        )
        .unwrap();

        let mut jobs = vec![TableExportJob::new(TableName::Customers)];
        let err = orchestrator.upload_phase(&mut jobs).unwrap_err();

        assert!(matches!(err, ExportError::UploadGateClosed(ref m) if m.contains("customers")));
        assert_eq!(jobs[0].status(), JobStatus::Failed);
        assert!(jobs[0].to_result().error.is_some());
        assert!(storage.attempts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_connection_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(FakeDatabase {
            refuse_connect: Some("ORA-12541: TNS:no listener".into()),
            ..populated_db()
        });
        let storage = Arc::new(RecordingStorage::default());
        let orchestrator = PipelineOrchestrator::new(
            db,
            storage.clone(),
            &config(dir.path(), UploadFailurePolicy::Abort),
        )
        .unwrap();

        let status = orchestrator.run();
        assert_eq!(
            status.body,
            "Error: Connection failed for customers: ORA-12541: TNS:no listener"
        );
        assert!(storage.attempts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_close_failure_does_not_fail_run() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(FakeDatabase {
            fail_close: true,
            ..populated_db()
        });
        let storage = Arc::new(RecordingStorage::default());
        let orchestrator = PipelineOrchestrator::new(
            db.clone(),
            storage.clone(),
            &config(dir.path(), UploadFailurePolicy::Abort),
        )
        .unwrap();

        assert!(orchestrator.run().is_success());
        assert_eq!(db.ledger().closed, 3);
        assert_eq!(storage.keys().len(), 3);
    }

    #[test]
    fn test_upload_failure_aborts_remaining_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(RecordingStorage::rejecting(&["table_people.csv"]));
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(populated_db()),
            storage.clone(),
            &config(dir.path(), UploadFailurePolicy::Abort),
        )
        .unwrap();

        let outcome = orchestrator.execute();
        assert_eq!(
            outcome.status().body,
            "Error: Upload of table_people.csv failed: Access Denied"
        );
        assert_eq!(
            *storage.attempts.lock().unwrap(),
            vec!["table_customers.csv", "table_people.csv"]
        );
        assert_eq!(storage.keys(), vec!["table_customers.csv"]);

        let outcomes: Vec<Outcome> = outcome.results.iter().map(|r| r.outcome).collect();
        assert_eq!(outcomes, vec![Outcome::Success, Outcome::Failure, Outcome::Failure]);
    }

    #[test]
    fn test_upload_failure_continue_policy() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(RecordingStorage::rejecting(&["table_customers.csv"]));
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(populated_db()),
            storage.clone(),
            &config(dir.path(), UploadFailurePolicy::Continue),
        )
        .unwrap();

        let outcome = orchestrator.execute();
        assert_eq!(outcome.status().status_code, 500);
        assert_eq!(
            storage.keys(),
            vec!["table_people.csv", "table_organizations.csv"]
        );
        let outcomes: Vec<Outcome> = outcome.results.iter().map(|r| r.outcome).collect();
        assert_eq!(outcomes, vec![Outcome::Failure, Outcome::Success, Outcome::Success]);
    }

    #[test]
    fn test_order_is_deterministic_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(populated_db());
        let mut seen = Vec::new();

        for _ in 0..3 {
            let storage = Arc::new(RecordingStorage::default());
            let orchestrator = PipelineOrchestrator::new(
                db.clone(),
                storage.clone(),
                &config(dir.path(), UploadFailurePolicy::Abort),
            )
            .unwrap();
            assert!(orchestrator.run().is_success());
            seen.push(storage.keys());
        }

        assert!(seen.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(
            db.ledger().queries,
            [
                "SELECT * FROM customers",
                "SELECT * FROM people",
                "SELECT * FROM organizations",
            ]
            .repeat(3)
        );
    }

    #[test]
    fn test_subset_of_tables() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(RecordingStorage::default());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(populated_db()),
            storage.clone(),
            &config(dir.path(), UploadFailurePolicy::Abort),
        )
        .unwrap()
        .with_tables(&[TableName::People]);

        let outcome = orchestrator.execute();
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(storage.keys(), vec!["table_people.csv"]);
    }

    #[test]
    fn test_upload_gate() {
        let mut ready = TableExportJob::new(TableName::Customers);
        ready.mark_extracted(vec![]);
        ready.mark_serialized(crate::domain::entities::Artifact {
            path: PathBuf::from("/tmp/customers_results.csv"),
            bytes: 0,
        });
        assert!(UploadGate::check(std::slice::from_ref(&ready)).is_ok());

        let pending = TableExportJob::new(TableName::People);
        let err = UploadGate::check(&[ready, pending]).unwrap_err();
        assert!(matches!(err, ExportError::UploadGateClosed(ref m) if m.contains("people")));
    }
}
