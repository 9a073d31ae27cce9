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

//! Port for durably storing a finished artifact under a key.

use crate::domain::entities::UploadReceipt;
use crate::domain::errors::Result;
use std::path::Path;

pub trait StoragePort: Send + Sync {
    /// Sends the whole file at `artifact_path` to the store under `object_key`.
    ///
    /// One attempt only. On failure nothing is stored under the key and the
    /// error is an `ExportError::UploadError`.
    fn upload(&self, artifact_path: &Path, object_key: &str) -> Result<UploadReceipt>;
}
