//! Content addressing stage.
//!
//! Files are pinned on a content-addressed store and identified by the CID the
//! store hands back. `PinningService` is the seam; `PinataClient` talks to a
//! Pinata-compatible HTTP API and `fakes::MemoryPinningService` stays in memory.

mod pinata;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::submission::DatasetFile;

pub use pinata::PinataClient;

/// Result type for pinning operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// What a pinning endpoint reports after a successful pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinReceipt {
    pub cid: String,
    /// Bytes the endpoint accounted for, including any directory wrapper
    pub pinned_size: u64,
    /// Endpoint-supplied timestamp, passed through untouched
    pub timestamp: String,
}

/// Output of the content addressing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAddressResult {
    pub cid: String,
    pub size: u64,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

/// Content-addressed pinning backend.
///
/// Implementations must not retry on their own; a failed call surfaces
/// straight to the workflow.
#[async_trait]
pub trait PinningService: Send + Sync {
    /// Pin a single file under the logical `name`.
    async fn pin_file(&self, file: &DatasetFile, name: &str) -> StorageResult<PinReceipt>;

    /// Pin several files wrapped in one directory called `directory`.
    async fn pin_directory(
        &self,
        files: &[DatasetFile],
        directory: &str,
    ) -> StorageResult<PinReceipt>;

    /// Pin a JSON document.
    async fn pin_json(&self, value: &serde_json::Value, name: &str) -> StorageResult<PinReceipt>;

    /// Remove a pin.
    async fn unpin(&self, cid: &str) -> StorageResult<()>;

    /// Raw pin listing for a CID, as reported by the backend.
    async fn pin_status(&self, cid: &str) -> StorageResult<serde_json::Value>;
}

/// Pin a submission's files: one file is pinned on its own, several are
/// pinned as a directory named `name`.
pub async fn address_files(
    service: &dyn PinningService,
    files: &[DatasetFile],
    name: &str,
) -> StorageResult<ContentAddressResult> {
    let receipt = match files {
        [] => return Err(StorageError::NoFiles),
        [single] => service.pin_file(single, name).await?,
        many => service.pin_directory(many, name).await?,
    };

    tracing::debug!(cid = %receipt.cid, pinned_size = receipt.pinned_size, "pinned");

    Ok(ContentAddressResult {
        cid: receipt.cid,
        size: receipt.pinned_size,
        name: name.to_string(),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{MemoryPinningService, PinCall};

    #[tokio::test]
    async fn test_single_file_pinned_individually() {
        let service = MemoryPinningService::new();
        let files = vec![DatasetFile::new("scan.dcm", vec![7; 64])];

        let result = address_files(&service, &files, "Test Scan").await.unwrap();

        assert_eq!(result.name, "Test Scan");
        assert_eq!(result.size, 64);
        assert!(!result.cid.is_empty());
        assert!(matches!(
            service.calls().as_slice(),
            [PinCall::File { name, .. }] if name == "Test Scan"
        ));
    }

    #[tokio::test]
    async fn test_many_files_pinned_as_directory() {
        let service = MemoryPinningService::new();
        let files = vec![
            DatasetFile::new("a.csv", vec![1; 10]),
            DatasetFile::new("b.csv", vec![2; 20]),
        ];

        let result = address_files(&service, &files, "tables").await.unwrap();

        assert_eq!(result.size, 30);
        match service.calls().as_slice() {
            [PinCall::Directory { name, paths }] => {
                assert_eq!(name, "tables");
                assert_eq!(paths, &vec!["tables/a.csv".to_string(), "tables/b.csv".to_string()]);
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_files_is_an_error() {
        let service = MemoryPinningService::new();
        let err = address_files(&service, &[], "x").await.unwrap_err();
        assert!(matches!(err, StorageError::NoFiles));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_surfaces_body() {
        let service = MemoryPinningService::failing("quota exceeded");
        let files = vec![DatasetFile::new("a.csv", vec![1])];
        let err = address_files(&service, &files, "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Pinata upload failed: quota exceeded");
    }
}
