//! Validation stage: heuristic dataset scoring.
//!
//! The dataset type comes from a fixed extension table. The score combines
//! file size (up to 50 points, one per MiB), format recognition (30 points if
//! known, 10 otherwise) and a quality jitter in `[0, 20)`. The four checks are
//! thresholds on that score, not independent inspections of the data.
//!
//! The certificate is a SHA-256 over `name-size-timestamp`. It does not depend
//! on file contents and proves nothing about them.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::digest::{is_prefixed_digest, prefixed_sha256};
use crate::error::ValidationError;
use crate::submission::DatasetFile;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const MAX_SIZE_POINTS: f64 = 50.0;
const KNOWN_FORMAT_POINTS: f64 = 30.0;
const UNKNOWN_FORMAT_POINTS: f64 = 10.0;
const MAX_JITTER: f64 = 20.0;
pub const VALID_THRESHOLD: u8 = 50;

/// Coarse dataset classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DatasetType {
    Genomic,
    Clinical,
    Imaging,
    Protein,
    General,
}

impl DatasetType {
    pub fn name(&self) -> &'static str {
        match self {
            DatasetType::Genomic => "genomic",
            DatasetType::Clinical => "clinical",
            DatasetType::Imaging => "imaging",
            DatasetType::Protein => "protein",
            DatasetType::General => "general",
        }
    }

    /// Community standards datasets of this type are expected to follow.
    pub fn standards(&self) -> &'static [&'static str] {
        match self {
            DatasetType::Genomic => &["FASTA", "VCF 4.2", "GFF3", "BAM/SAM"],
            DatasetType::Clinical => &["FHIR R4", "HL7 v3", "OMOP CDM v5"],
            DatasetType::Imaging => &["DICOM 3.0", "NIfTI-1"],
            DatasetType::Protein => &["PDB", "mmCIF"],
            DatasetType::General => &["CSV RFC 4180", "JSON Schema"],
        }
    }

    /// Field names a record of this type usually carries.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            DatasetType::Genomic => &["sequence_id", "sequence", "quality_score", "annotations"],
            DatasetType::Clinical => &["patient_id", "diagnosis_code", "treatment", "outcome"],
            DatasetType::Imaging => &["patient_id", "modality", "body_part", "slice_thickness"],
            DatasetType::Protein => &["pdb_id", "chain", "residue", "coordinates"],
            DatasetType::General => &["id", "data", "timestamp", "metadata"],
        }
    }
}

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up a lowercase extension in the classifier table.
///
/// `None` means the format is not recognised; such files are treated as
/// `General` but score as unknown.
pub fn classify_extension(extension: &str) -> Option<DatasetType> {
    let ty = match extension {
        "fasta" | "fastq" | "vcf" | "bam" | "sam" | "bed" => DatasetType::Genomic,
        "hl7" | "fhir" => DatasetType::Clinical,
        "dcm" | "dicom" | "nii" | "nifti" => DatasetType::Imaging,
        "pdb" | "cif" | "mmcif" => DatasetType::Protein,
        "csv" | "json" | "xml" | "parquet" => DatasetType::General,
        _ => return None,
    };
    Some(ty)
}

/// Source of the random quality jitter added to every score.
pub trait QualityJitter: Send {
    /// A value in `[0, 20)`. Out-of-range values are tolerated; the score is clamped.
    fn sample(&mut self) -> f64;
}

/// Jitter drawn uniformly from `[0, 20)`.
pub struct RandomJitter {
    rng: StdRng,
}

impl RandomJitter {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl QualityJitter for RandomJitter {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(0.0..MAX_JITTER)
    }
}

/// Constant jitter, for reproducible scores.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl QualityJitter for FixedJitter {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationChecks {
    pub format: bool,
    pub schema: bool,
    pub integrity: bool,
    pub standards: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetadata {
    /// Rough estimate: one record per 100 bytes
    pub record_count: u64,
    pub fields: Vec<String>,
    pub standards: Vec<String>,
    pub warnings: Vec<String>,
}

/// Output of the validation stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub validation_type: DatasetType,
    /// 0..=100
    pub score: u8,
    pub checks: ValidationChecks,
    pub metadata: ValidationMetadata,
    pub certificate: String,
    pub timestamp: DateTime<Utc>,
}

/// Combine size, format recognition and jitter into a score in `[0, 100]`.
pub fn score(size_bytes: u64, known_format: bool, jitter: f64) -> u8 {
    let size_points = (size_bytes as f64 / BYTES_PER_MIB).min(MAX_SIZE_POINTS);
    let format_points = if known_format {
        KNOWN_FORMAT_POINTS
    } else {
        UNKNOWN_FORMAT_POINTS
    };
    let total = (size_points + format_points + jitter).round();
    if total.is_nan() {
        return 0;
    }
    total.clamp(0.0, 100.0) as u8
}

fn checks_for(score: u8, known_format: bool) -> ValidationChecks {
    ValidationChecks {
        format: known_format,
        schema: score >= 40,
        integrity: score >= 30,
        standards: known_format && score >= 60,
    }
}

fn warnings_for(score: u8, known_format: bool) -> Vec<String> {
    let mut warnings = Vec::new();
    if !known_format {
        warnings.push("File format not in standard scientific dataset formats".to_string());
    }
    if score < 60 {
        warnings.push("Dataset quality score below recommended threshold".to_string());
    }
    if score < 40 {
        warnings.push("Consider adding metadata documentation".to_string());
    }
    warnings
}

/// Score one representative file.
///
/// Zero-byte files are rejected outright.
pub fn validate_dataset(
    file: &DatasetFile,
    jitter: &mut dyn QualityJitter,
) -> Result<ValidationResult, ValidationError> {
    if file.size() == 0 {
        return Err(ValidationError::EmptyFile {
            name: file.name().to_string(),
        });
    }

    let detected = file.extension().as_deref().and_then(classify_extension);
    let known_format = detected.is_some();
    let validation_type = detected.unwrap_or(DatasetType::General);

    let score = score(file.size(), known_format, jitter.sample());
    let timestamp = Utc::now();
    let certificate = prefixed_sha256(
        format!(
            "{}-{}-{}",
            file.name(),
            file.size(),
            timestamp.timestamp_millis()
        )
        .as_bytes(),
    );

    tracing::debug!(
        file = %file.name(),
        dataset_type = %validation_type,
        known_format,
        score,
        "validated"
    );

    Ok(ValidationResult {
        is_valid: score >= VALID_THRESHOLD,
        validation_type,
        score,
        checks: checks_for(score, known_format),
        metadata: ValidationMetadata {
            record_count: file.size() / 100,
            fields: validation_type.fields().iter().map(|s| s.to_string()).collect(),
            standards: validation_type
                .standards()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            warnings: warnings_for(score, known_format),
        },
        certificate,
        timestamp,
    })
}

/// Shape check only: `0x` followed by 64 hex digits.
pub fn verify_certificate(certificate: &str) -> bool {
    is_prefixed_digest(certificate)
}

/// Display tier for a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ValidationTier {
    Unverified,
    Partial,
    Validated,
    Verified,
}

impl ValidationTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => ValidationTier::Verified,
            60..=79 => ValidationTier::Validated,
            40..=59 => ValidationTier::Partial,
            _ => ValidationTier::Unverified,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValidationTier::Verified => "Verified",
            ValidationTier::Validated => "Validated",
            ValidationTier::Partial => "Partial",
            ValidationTier::Unverified => "Unverified",
        }
    }
}
