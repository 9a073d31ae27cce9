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

//! # Configuration
//!
//! Settings are constant for the whole run. They come from one of two places:
//! 1. **A config file** (YAML or JSON, picked by extension) passed with `--config`.
//! 2. **Environment variables**, the way a scheduled job is usually deployed
//!    (`ORACLE_USERNAME`, `ORACLE_PASSWORD`, `ORACLE_CONNECTION_STRING`,
//!    `S3_BUCKET_NAME`, ...).
//!
//! Command-line flags are applied on top of either source. The resulting
//! `AppConfig` is built once in `main` and handed to every component.

use crate::domain::errors::{ExportError, Result};
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    pub username: String,
    /// Falls back to the `ORACLE_PASSWORD` environment variable when absent.
    pub password: Option<String>,
    /// Full connect string. Takes precedence over host/port/service.
    pub connection_string: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub service: Option<String>,
    pub prefetch_rows: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: Option<String>,
    /// Endpoint of an S3-compatible service (MinIO, LocalStack, ...).
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExportConfig {
    pub scratch_dir: Option<String>,
    /// Quote fields that contain delimiters instead of writing them raw.
    #[serde(default)]
    pub quote_fields: bool,
    #[serde(default)]
    pub upload_failure: UploadFailurePolicy,
}

/// What the upload phase does after one upload fails.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadFailurePolicy {
    /// Stop at the first failed upload.
    #[default]
    Abort,
    /// Keep uploading the remaining tables; the run still fails.
    Continue,
}

/// Database login passed through to the driver untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub connection_string: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("connection_string", &self.connection_string)
            .finish()
    }
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    // Overrides for ad-hoc runs
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub connection_string: Option<String>,
    #[arg(long)]
    pub bucket: Option<String>,
    #[arg(long)]
    pub scratch_dir: Option<String>,
    /// Quote fields containing commas, quotes or newlines
    #[arg(long)]
    pub quote_fields: bool,
    /// Attempt every upload even after one has failed
    #[arg(long)]
    pub continue_on_upload_error: bool,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ExportError::ConfigError(format!("Cannot open {}: {}", path, e)))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents).map_err(|e| ExportError::ConfigError(e.to_string()))?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ExportError::ConfigError(e.to_string()))?
        };

        Ok(config)
    }

    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source. Missing values are
    /// left empty so that CLI flags can still fill them before `validate`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("ORACLE_PORT") {
            Some(p) => Some(p.trim().parse::<u16>().map_err(|e| {
                ExportError::ConfigError(format!("ORACLE_PORT '{}' is not a port: {}", p, e))
            })?),
            None => None,
        };

        Ok(Self {
            database: DatabaseConfig {
                username: lookup("ORACLE_USERNAME").unwrap_or_default(),
                password: lookup("ORACLE_PASSWORD"),
                connection_string: lookup("ORACLE_CONNECTION_STRING"),
                host: lookup("ORACLE_HOST"),
                port,
                service: lookup("ORACLE_SERVICE"),
                prefetch_rows: None,
            },
            storage: StorageConfig {
                bucket: lookup("S3_BUCKET_NAME").unwrap_or_default(),
                region: lookup("AWS_REGION"),
                endpoint: lookup("S3_ENDPOINT"),
            },
            export: ExportConfig {
                scratch_dir: lookup("SCRATCH_DIR"),
                ..ExportConfig::default()
            },
        })
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(u) = &args.username {
            self.database.username = u.clone();
        }
        if let Some(p) = &args.password {
            self.database.password = Some(p.clone());
        }
        if let Some(c) = &args.connection_string {
            self.database.connection_string = Some(c.clone());
        }
        if let Some(b) = &args.bucket {
            self.storage.bucket = b.clone();
        }
        if let Some(d) = &args.scratch_dir {
            self.export.scratch_dir = Some(d.clone());
        }
        if args.quote_fields {
            self.export.quote_fields = true;
        }
        if args.continue_on_upload_error {
            self.export.upload_failure = UploadFailurePolicy::Continue;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.username.trim().is_empty() {
            return Err(ExportError::ConfigError("database username is required".into()));
        }
        if self.database.port == Some(0) {
            return Err(ExportError::ConfigError("database port must be non-zero".into()));
        }
        if self.database.get_connection_string().is_none() {
            return Err(ExportError::ConfigError(
                "set database.connection_string or host/port/service".into(),
            ));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(ExportError::ConfigError("storage bucket is required".into()));
        }
        Ok(())
    }

    /// Resolves the login for the run. The password is read from the
    /// environment when the config does not carry one.
    pub fn credentials(&self) -> Result<Credentials> {
        let connection_string = self.database.get_connection_string().ok_or_else(|| {
            ExportError::ConfigError("no database connection information".into())
        })?;
        let password = self
            .database
            .password
            .clone()
            .or_else(|| std::env::var("ORACLE_PASSWORD").ok())
            .unwrap_or_default();

        Ok(Credentials {
            username: self.database.username.clone(),
            password,
            connection_string,
        })
    }
}

impl DatabaseConfig {
    /// Explicit connect string, or an easy-connect `host:port/service`.
    pub fn get_connection_string(&self) -> Option<String> {
        if let Some(c) = self.connection_string.as_ref().filter(|c| !c.trim().is_empty()) {
            return Some(c.clone());
        }
        match (&self.host, &self.service) {
            (Some(host), Some(service)) if !host.is_empty() && !service.is_empty() => Some(
                format!("{}:{}/{}", host, self.port.unwrap_or(1521), service),
            ),
            _ => None,
        }
    }
}

impl ExportConfig {
    /// Directory that holds the per-table artifacts; the system temp dir by default.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }
}
