//! Submission input: dataset files plus listing metadata.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SubmissionError;

/// One dataset file held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct DatasetFile {
    name: String,
    bytes: Vec<u8>,
}

impl DatasetFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming it after its final path component.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercased text after the last `.` in the name, if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

impl std::fmt::Debug for DatasetFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetFile")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Listing metadata entered by the contributor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    /// Decimal NEAR amount, e.g. `"1"` or `"2.5"`
    pub price: String,
    pub license: String,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: "Computer Vision".to_string(),
            price: "1".to_string(),
            license: "MIT".to_string(),
        }
    }
}

impl DatasetMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Everything one submission needs.
#[derive(Debug, Clone)]
pub struct SubmissionInput {
    pub files: Vec<DatasetFile>,
    pub metadata: DatasetMetadata,
}

impl SubmissionInput {
    pub fn new(files: Vec<DatasetFile>, metadata: DatasetMetadata) -> Self {
        Self { files, metadata }
    }

    /// Enforce the submission preconditions: at least one file and a non-blank title.
    pub fn check_preconditions(&self) -> Result<(), SubmissionError> {
        if self.files.is_empty() {
            return Err(SubmissionError::Precondition(
                "Please select at least one file".to_string(),
            ));
        }
        if self.metadata.title.trim().is_empty() {
            return Err(SubmissionError::Precondition(
                "Please enter a title".to_string(),
            ));
        }
        Ok(())
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(DatasetFile::size).sum()
    }

    /// The file the validation stage scores.
    pub fn representative(&self) -> Option<&DatasetFile> {
        self.files.first()
    }
}
