//! Pinata HTTP client
//!
//! Talks to a Pinata-compatible pinning API:
//!
//! - `POST /pinning/pinFileToIPFS` (multipart) for files and directories
//! - `POST /pinning/pinJSONToIPFS` for JSON documents
//! - `DELETE /pinning/unpin/<cid>`
//! - `GET /data/pinList?hashContains=<cid>`
//!
//! Non-2xx bodies are returned verbatim inside `StorageError::Rejected`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::{PinReceipt, PinningService, StorageResult};
use crate::config::PinningConfig;
use crate::error::StorageError;
use crate::submission::DatasetFile;

const USER_AGENT: &str = concat!("veritas-core/", env!("CARGO_PKG_VERSION"));

/// Wire shape of a successful pin response.
#[derive(Debug, Deserialize)]
struct PinataResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
    #[serde(rename = "PinSize")]
    pin_size: u64,
    #[serde(rename = "Timestamp", default)]
    timestamp: String,
}

impl From<PinataResponse> for PinReceipt {
    fn from(r: PinataResponse) -> Self {
        PinReceipt {
            cid: r.ipfs_hash,
            pinned_size: r.pin_size,
            timestamp: r.timestamp,
        }
    }
}

/// Pinata client for pinning operations
pub struct PinataClient {
    config: PinningConfig,
    http_client: reqwest::Client,
}

impl PinataClient {
    pub fn new(config: PinningConfig) -> StorageResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(PinataClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> StorageResult<Self> {
        Self::new(PinningConfig::from_env())
    }

    pub fn config(&self) -> &PinningConfig {
        &self.config
    }

    /// Public gateway URL for a CID, optionally pointing at a file inside a
    /// pinned directory.
    pub fn gateway_url(&self, cid: &str, filename: Option<&str>) -> String {
        match filename {
            Some(name) => format!("{}/ipfs/{}/{}", self.config.gateway_url, cid, name),
            None => format!("{}/ipfs/{}", self.config.gateway_url, cid),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.jwt {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_form(&self, form: Form, operation: &'static str) -> StorageResult<PinReceipt> {
        let request = self
            .http_client
            .post(self.endpoint("/pinning/pinFileToIPFS"))
            .multipart(form);
        let response = self.authorized(request).send().await?;
        read_receipt(response, operation).await
    }
}

fn file_part(file: &DatasetFile, file_name: String) -> Part {
    Part::bytes(file.bytes().to_vec()).file_name(file_name)
}

async fn ensure_success(response: Response, operation: &'static str) -> StorageResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Rejected {
        operation,
        status: status.as_u16(),
        body,
    })
}

async fn read_receipt(response: Response, operation: &'static str) -> StorageResult<PinReceipt> {
    let response = ensure_success(response, operation).await?;
    let parsed: PinataResponse = response
        .json()
        .await
        .map_err(|e| StorageError::MalformedResponse(e.to_string()))?;
    Ok(parsed.into())
}

#[async_trait]
impl PinningService for PinataClient {
    async fn pin_file(&self, file: &DatasetFile, name: &str) -> StorageResult<PinReceipt> {
        info!(file = %file.name(), size = file.size(), "Pinning file");

        let form = Form::new()
            .part("file", file_part(file, file.name().to_string()))
            .text(
                "pinataMetadata",
                json!({ "name": name, "keyvalues": {} }).to_string(),
            )
            .text("pinataOptions", json!({ "cidVersion": 1 }).to_string());

        self.post_form(form, "Pinata upload").await
    }

    async fn pin_directory(
        &self,
        files: &[DatasetFile],
        directory: &str,
    ) -> StorageResult<PinReceipt> {
        info!(directory = %directory, files = files.len(), "Pinning directory");

        // Keep the `/` in `directory/name` literal so the endpoint sees a path.
        let mut form = Form::new().percent_encode_noop();
        for file in files {
            form = form.part(
                "file",
                file_part(file, format!("{}/{}", directory, file.name())),
            );
        }
        let form = form
            .text("pinataMetadata", json!({ "name": directory }).to_string())
            .text(
                "pinataOptions",
                json!({ "cidVersion": 1, "wrapWithDirectory": true }).to_string(),
            );

        self.post_form(form, "Pinata upload").await
    }

    async fn pin_json(&self, value: &serde_json::Value, name: &str) -> StorageResult<PinReceipt> {
        debug!(name = %name, "Pinning JSON document");

        let body = json!({
            "pinataContent": value,
            "pinataMetadata": { "name": name },
            "pinataOptions": { "cidVersion": 1 },
        });
        let request = self
            .http_client
            .post(self.endpoint("/pinning/pinJSONToIPFS"))
            .json(&body);
        let response = self.authorized(request).send().await?;
        read_receipt(response, "Pinata JSON upload").await
    }

    async fn unpin(&self, cid: &str) -> StorageResult<()> {
        info!(cid = %cid, "Unpinning");

        let request = self
            .http_client
            .delete(self.endpoint(&format!("/pinning/unpin/{}", cid)));
        let response = self.authorized(request).send().await?;
        ensure_success(response, "Pinata unpin").await?;
        Ok(())
    }

    async fn pin_status(&self, cid: &str) -> StorageResult<serde_json::Value> {
        let request = self
            .http_client
            .get(self.endpoint("/data/pinList"))
            .query(&[("hashContains", cid)]);
        let response = self.authorized(request).send().await?;
        let response = ensure_success(response, "Pinata pin status").await?;
        response
            .json()
            .await
            .map_err(|e| StorageError::MalformedResponse(e.to_string()))
    }
}
