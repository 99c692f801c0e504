//! In-memory fakes for the pinning and session seams
//!
//! Provides `MemoryPinningService` and `MemorySessionStore`, which satisfy the
//! trait contracts without any network or filesystem access. The CLI's
//! offline mode uses `MemoryPinningService` too.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::digest::sha256_hex;
use crate::error::{SessionError, StorageError};
use crate::session::{SessionRecord, SessionStore};
use crate::storage::{PinReceipt, PinningService, StorageResult};
use crate::submission::DatasetFile;

// ---------------------------------------------------------------------------
// MemoryPinningService
// ---------------------------------------------------------------------------

/// One call observed by `MemoryPinningService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinCall {
    File { name: String, size: u64 },
    Directory { name: String, paths: Vec<String> },
    Json { name: String },
    Unpin { cid: String },
    Status { cid: String },
}

#[derive(Debug, Default)]
struct PinState {
    pins: HashMap<String, (String, u64)>,
    calls: Vec<PinCall>,
}

/// Pinning service that keeps pins in a `HashMap<cid, (name, size)>`.
///
/// CIDs are `bafy` followed by the first 52 hex digits of a SHA-256 over the
/// pinned content, so identical content yields identical CIDs. They are not
/// real IPFS CIDs.
#[derive(Debug, Default)]
pub struct MemoryPinningService {
    state: Mutex<PinState>,
    failure: Option<String>,
}

impl MemoryPinningService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service that rejects every pin with `body`, like a non-2xx endpoint.
    pub fn failing(body: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(PinState::default()),
            failure: Some(body.into()),
        }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<PinCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn is_pinned(&self, cid: &str) -> bool {
        self.state.lock().unwrap().pins.contains_key(cid)
    }

    pub fn pin_count(&self) -> usize {
        self.state.lock().unwrap().pins.len()
    }

    fn check_failure(&self, operation: &'static str) -> StorageResult<()> {
        match &self.failure {
            Some(body) => Err(StorageError::Rejected {
                operation,
                status: 500,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }

    fn store(&self, call: PinCall, content: &[u8], name: &str, size: u64) -> PinReceipt {
        let cid = format!("bafy{}", &sha256_hex(content)[..52]);
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.pins.insert(cid.clone(), (name.to_string(), size));
        PinReceipt {
            cid,
            pinned_size: size,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    fn record(&self, call: PinCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl PinningService for MemoryPinningService {
    async fn pin_file(&self, file: &DatasetFile, name: &str) -> StorageResult<PinReceipt> {
        let call = PinCall::File {
            name: name.to_string(),
            size: file.size(),
        };
        if let Err(e) = self.check_failure("Pinata upload") {
            self.record(call);
            return Err(e);
        }
        Ok(self.store(call, file.bytes(), name, file.size()))
    }

    async fn pin_directory(
        &self,
        files: &[DatasetFile],
        directory: &str,
    ) -> StorageResult<PinReceipt> {
        let paths: Vec<String> = files
            .iter()
            .map(|f| format!("{}/{}", directory, f.name()))
            .collect();
        let call = PinCall::Directory {
            name: directory.to_string(),
            paths: paths.clone(),
        };
        if let Err(e) = self.check_failure("Pinata upload") {
            self.record(call);
            return Err(e);
        }

        let mut content = Vec::new();
        for (path, file) in paths.iter().zip(files) {
            content.extend_from_slice(path.as_bytes());
            content.push(0);
            content.extend_from_slice(file.bytes());
        }
        let size = files.iter().map(DatasetFile::size).sum();
        Ok(self.store(call, &content, directory, size))
    }

    async fn pin_json(&self, value: &serde_json::Value, name: &str) -> StorageResult<PinReceipt> {
        let call = PinCall::Json {
            name: name.to_string(),
        };
        if let Err(e) = self.check_failure("Pinata JSON upload") {
            self.record(call);
            return Err(e);
        }
        let content = serde_json::to_vec(value)
            .map_err(|e| StorageError::MalformedResponse(e.to_string()))?;
        let size = content.len() as u64;
        Ok(self.store(call, &content, name, size))
    }

    async fn unpin(&self, cid: &str) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(PinCall::Unpin {
            cid: cid.to_string(),
        });
        match state.pins.remove(cid) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound {
                cid: cid.to_string(),
            }),
        }
    }

    async fn pin_status(&self, cid: &str) -> StorageResult<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(PinCall::Status {
            cid: cid.to_string(),
        });
        let rows: Vec<serde_json::Value> = state
            .pins
            .get(cid)
            .map(|(name, size)| {
                json!({
                    "ipfs_pin_hash": cid,
                    "size": size,
                    "metadata": { "name": name },
                })
            })
            .into_iter()
            .collect();
        Ok(json!({ "count": rows.len(), "rows": rows }))
    }
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// Session store that keeps the record in memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, SessionError> {
        Ok(self.record.lock().unwrap().clone())
    }

    fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        *self.record.lock().unwrap() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}
