//! Proof stage.
//!
//! **Placeholder, not cryptography.** `MockGroth16` fills a Groth16-shaped
//! structure with random integers; no circuit, no pairing, no soundness.
//! `verify_proof` checks structure and echoes the public signals back. A real
//! proving scheme can replace `MockGroth16` behind `ProofGenerator` as long as
//! it keeps the same public-signal layout:
//!
//! ```text
//! [total_size, file_count, quality_score, checksum_prefix]
//! ```
//!
//! The checksum is SHA-256 over the concatenated hex digests of each file's
//! first 1 KiB. It is not a Merkle root and supports no inclusion proofs.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::digest::{prefixed_sha256, sha256_hex, strip_hex_prefix, HEX_PREFIX};
use crate::error::ProofError;
use crate::submission::DatasetFile;

/// Bytes of each file that feed the checksum.
pub const CHECKSUM_WINDOW: usize = 1024;

/// Hex digits of the checksum exposed as a public signal.
pub const CHECKSUM_PREFIX_LEN: usize = 16;

const FIELD_ELEMENT_BOUND: u64 = 1_000_000_000_000_000;

/// Groth16-shaped proof body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofData {
    pub pi_a: Vec<String>,
    pub pi_b: Vec<Vec<String>>,
    pub pi_c: Vec<String>,
    pub protocol: String,
    pub curve: String,
}

/// Output of the proof stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZkProof {
    pub proof: ProofData,
    pub public_signals: Vec<String>,
    pub proof_hash: String,
    pub verified: bool,
    pub timestamp: DateTime<Utc>,
}

/// Properties echoed back by verification.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProofProperties {
    pub file_size: u64,
    pub file_count: u64,
    pub quality_score: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofVerification {
    pub valid: bool,
    pub properties: ProofProperties,
}

impl ProofVerification {
    fn invalid() -> Self {
        Self {
            valid: false,
            properties: ProofProperties::default(),
        }
    }
}

/// Produces a proof over a file set and its quality score.
pub trait ProofGenerator: Send {
    fn generate(&mut self, files: &[DatasetFile], quality_score: u8) -> Result<ZkProof, ProofError>;
}

/// Fabricated Groth16/bn128 proof. See the module docs.
pub struct MockGroth16 {
    rng: StdRng,
}

impl Default for MockGroth16 {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGroth16 {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn field_elements(&mut self, count: usize) -> Vec<String> {
        (0..count)
            .map(|_| self.rng.gen_range(0..FIELD_ELEMENT_BOUND).to_string())
            .collect()
    }
}

impl ProofGenerator for MockGroth16 {
    fn generate(&mut self, files: &[DatasetFile], quality_score: u8) -> Result<ZkProof, ProofError> {
        if files.is_empty() {
            return Err(ProofError::NoFiles);
        }

        let total_size: u64 = files.iter().map(DatasetFile::size).sum();
        let checksum = dataset_checksum(files);
        let checksum_prefix: String = strip_hex_prefix(&checksum)
            .chars()
            .take(CHECKSUM_PREFIX_LEN)
            .collect();

        let proof = ProofData {
            pi_a: self.field_elements(3),
            pi_b: vec![self.field_elements(2), self.field_elements(2)],
            pi_c: self.field_elements(3),
            protocol: "groth16".to_string(),
            curve: "bn128".to_string(),
        };
        let public_signals = vec![
            total_size.to_string(),
            files.len().to_string(),
            quality_score.to_string(),
            checksum_prefix,
        ];
        let proof_hash = hash_proof(&proof, &public_signals)?;

        tracing::debug!(proof_hash = %proof_hash, files = files.len(), "proof generated");

        Ok(ZkProof {
            proof,
            public_signals,
            proof_hash,
            verified: true,
            timestamp: Utc::now(),
        })
    }
}

/// `0x`-prefixed checksum over the first 1 KiB of each file, in order.
pub fn dataset_checksum(files: &[DatasetFile]) -> String {
    let combined: String = files
        .iter()
        .map(|f| {
            let window = &f.bytes()[..f.bytes().len().min(CHECKSUM_WINDOW)];
            sha256_hex(window)
        })
        .collect();
    prefixed_sha256(combined.as_bytes())
}

fn hash_proof(proof: &ProofData, public_signals: &[String]) -> Result<String, ProofError> {
    // serde_json maps are key-sorted, so the encoding is stable.
    let body = serde_json::to_vec(&json!({
        "proof": proof,
        "publicSignals": public_signals,
    }))?;
    Ok(prefixed_sha256(&body))
}

/// Structural check of a proof. Never errors.
///
/// Valid iff `pi_a` has 3 entries, `pi_b` 2, `pi_c` 3, there are at least 3
/// public signals and the hash starts with `0x`. Signals are read by their
/// leading digits (`"12abc"` reads as 12); a signal with none reads as 0.
pub fn verify_proof(zk: &ZkProof) -> ProofVerification {
    let well_formed = zk.proof.pi_a.len() == 3
        && zk.proof.pi_b.len() == 2
        && zk.proof.pi_c.len() == 3
        && zk.public_signals.len() >= 3
        && zk.proof_hash.starts_with(HEX_PREFIX);

    if !well_formed {
        return ProofVerification::invalid();
    }

    let signal = |i: usize| leading_integer(&zk.public_signals[i]);
    ProofVerification {
        valid: true,
        properties: ProofProperties {
            file_size: signal(0),
            file_count: signal(1),
            quality_score: signal(2),
        },
    }
}

fn leading_integer(signal: &str) -> u64 {
    let trimmed = signal.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().unwrap_or(0)
}

/// Like [`verify_proof`], for untrusted JSON. Anything that does not decode
/// into a proof is reported invalid.
pub fn verify_proof_json(value: &serde_json::Value) -> ProofVerification {
    match serde_json::from_value::<ZkProof>(value.clone()) {
        Ok(zk) => verify_proof(&zk),
        Err(e) => {
            tracing::debug!(error = %e, "proof did not decode");
            ProofVerification::invalid()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<DatasetFile> {
        vec![
            DatasetFile::new("a.csv", vec![1; 3000]),
            DatasetFile::new("b.csv", vec![2; 10]),
        ]
    }

    #[test]
    fn test_proof_shape() {
        let zk = MockGroth16::seeded(1).generate(&files(), 77).unwrap();
        assert_eq!(zk.proof.pi_a.len(), 3);
        assert_eq!(zk.proof.pi_b.len(), 2);
        assert!(zk.proof.pi_b.iter().all(|row| row.len() == 2));
        assert_eq!(zk.proof.pi_c.len(), 3);
        assert_eq!(zk.proof.protocol, "groth16");
        assert_eq!(zk.proof.curve, "bn128");
        assert!(crate::digest::is_prefixed_digest(&zk.proof_hash));
        assert!(zk.verified);
    }

    #[test]
    fn test_field_elements_below_bound() {
        let zk = MockGroth16::seeded(9).generate(&files(), 1).unwrap();
        for e in zk.proof.pi_a.iter().chain(zk.proof.pi_c.iter()) {
            assert!(e.parse::<u64>().unwrap() < FIELD_ELEMENT_BOUND);
        }
    }

    #[test]
    fn test_public_signals_layout() {
        let zk = MockGroth16::seeded(2).generate(&files(), 64).unwrap();
        let checksum = dataset_checksum(&files());
        assert_eq!(zk.public_signals[0], "3010");
        assert_eq!(zk.public_signals[1], "2");
        assert_eq!(zk.public_signals[2], "64");
        assert_eq!(zk.public_signals[3], &checksum[2..18]);
        assert_eq!(zk.public_signals[3].len(), CHECKSUM_PREFIX_LEN);
    }

    #[test]
    fn test_checksum_only_reads_first_kib() {
        let mut tail_a = vec![5u8; CHECKSUM_WINDOW];
        let mut tail_b = tail_a.clone();
        tail_a.extend_from_slice(b"first tail");
        tail_b.extend_from_slice(b"second tail");
        let a = dataset_checksum(&[DatasetFile::new("x", tail_a)]);
        let b = dataset_checksum(&[DatasetFile::new("x", tail_b)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_checksum_is_order_sensitive() {
        let mut reversed = files();
        reversed.reverse();
        assert_ne!(dataset_checksum(&files()), dataset_checksum(&reversed));
    }

    #[test]
    fn test_checksum_matches_manual_computation() {
        let f = DatasetFile::new("x", b"hello".to_vec());
        let expected = prefixed_sha256(sha256_hex(b"hello").as_bytes());
        assert_eq!(dataset_checksum(&[f]), expected);
    }

    #[test]
    fn test_proof_hash_covers_signals() {
        let zk = MockGroth16::seeded(3).generate(&files(), 10).unwrap();
        let mut signals = zk.public_signals.clone();
        assert_eq!(hash_proof(&zk.proof, &signals).unwrap(), zk.proof_hash);
        signals[2] = "11".to_string();
        assert_ne!(hash_proof(&zk.proof, &signals).unwrap(), zk.proof_hash);
    }

    #[test]
    fn test_no_files_rejected() {
        let err = MockGroth16::seeded(0).generate(&[], 10).unwrap_err();
        assert!(matches!(err, ProofError::NoFiles));
    }

    #[test]
    fn test_unparseable_signals_read_as_zero() {
        let mut zk = MockGroth16::seeded(4).generate(&files(), 10).unwrap();
        zk.public_signals[0] = "lots".to_string();
        let v = verify_proof(&zk);
        assert!(v.valid);
        assert_eq!(v.properties.file_size, 0);
        assert_eq!(v.properties.file_count, 2);
    }

    #[test]
    fn test_signals_read_by_leading_digits() {
        let mut zk = MockGroth16::seeded(4).generate(&files(), 10).unwrap();
        zk.public_signals[0] = "12abc".to_string();
        zk.public_signals[1] = " 7 files".to_string();
        let v = verify_proof(&zk);
        assert_eq!(v.properties.file_size, 12);
        assert_eq!(v.properties.file_count, 7);
        assert_eq!(v.properties.quality_score, 10);
    }

    #[test]
    fn test_hash_without_prefix_is_invalid() {
        let mut zk = MockGroth16::seeded(5).generate(&files(), 10).unwrap();
        zk.proof_hash = zk.proof_hash[2..].to_string();
        assert_eq!(verify_proof(&zk), ProofVerification::invalid());
    }

    #[test]
    fn test_garbage_json_is_invalid() {
        let v = verify_proof_json(&json!({ "proof": "nope" }));
        assert!(!v.valid);
        assert_eq!(v.properties, ProofProperties::default());
    }
}
