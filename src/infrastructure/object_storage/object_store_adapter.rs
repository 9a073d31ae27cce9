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

//! # Object Store Adapter
//!
//! Implements `StoragePort` on top of the `object_store` crate. Production runs
//! use the S3 backend; tests plug in `InMemory`.
//!
//! The rest of the pipeline is synchronous, so the adapter owns a
//! current-thread Tokio runtime and blocks on each put. Only one upload is in
//! flight at any time.
//!
//! Each artifact is sent as one `put` of the complete file. S3 either stores
//! the whole object under the key or nothing at all, and the client is built
//! with retries disabled so every upload is a single attempt.

use crate::config::StorageConfig;
use crate::domain::entities::UploadReceipt;
use crate::domain::errors::{ExportError, Result};
use crate::ports::storage_port::StoragePort;
use log::info;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload, RetryConfig};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

pub struct ObjectStoreAdapter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    runtime: Runtime,
}

impl ObjectStoreAdapter {
    /// Wraps any object store. `bucket` is only used in log messages.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            store,
            bucket: bucket.into(),
            runtime,
        })
    }

    /// Builds an S3 client for `config.bucket`. Credentials and any unset
    /// region come from the standard `AWS_*` environment.
    pub fn s3(config: &StorageConfig) -> Result<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_retry(RetryConfig {
                max_retries: 0,
                ..RetryConfig::default()
            });

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| ExportError::ConfigError(format!("Failed to create S3 client: {}", e)))?;

        Self::new(Arc::new(store), config.bucket.clone())
    }
}

impl StoragePort for ObjectStoreAdapter {
    fn upload(&self, artifact_path: &Path, object_key: &str) -> Result<UploadReceipt> {
        let upload_error = |reason: String| ExportError::UploadError {
            key: object_key.to_string(),
            reason,
        };

        let data = std::fs::read(artifact_path)
            .map_err(|e| upload_error(format!("cannot read {}: {}", artifact_path.display(), e)))?;
        let bytes = data.len() as u64;

        let location = ObjectPath::from(object_key);
        let put = self
            .runtime
            .block_on(self.store.put(&location, PutPayload::from(data)))
            .map_err(|e| upload_error(e.to_string()))?;

        info!(
            "File uploaded successfully: s3://{}/{} ({} bytes, etag {:?})",
            self.bucket, object_key, bytes, put.e_tag
        );

        Ok(UploadReceipt {
            key: object_key.to_string(),
            bytes,
            e_tag: put.e_tag,
            version: put.version,
        })
    }
}
