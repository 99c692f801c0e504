//! Marketplace listing drafts and display helpers.
//!
//! A `ListingDraft` carries exactly what the marketplace contract's
//! `list_dataset` call takes. Prices are decimal NEAR strings converted to
//! yoctoNEAR (10^24 per NEAR).

use serde::{Deserialize, Serialize};

use crate::error::ListingError;
use crate::workflow::CompletedSubmission;

const YOCTO_DECIMALS: usize = 24;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub filecoin_cid: String,
    pub bio_validated: bool,
    pub zk_proof_hash: String,
    /// yoctoNEAR, serialized as a string like the contract's `Balance`
    #[serde(with = "u128_string")]
    pub price: u128,
    pub license: String,
}

impl ListingDraft {
    pub fn from_outcome(done: &CompletedSubmission) -> Result<Self, ListingError> {
        Ok(Self {
            title: done.metadata.title.clone(),
            description: done.metadata.description.clone(),
            category: done.metadata.category.clone(),
            filecoin_cid: done.content_address.cid.clone(),
            bio_validated: done.validation.is_valid,
            zk_proof_hash: done.proof.proof_hash.clone(),
            price: parse_near_amount(&done.metadata.price)?,
            license: done.metadata.license.clone(),
        })
    }
}

mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a decimal NEAR amount (`"1"`, `"0.25"`) into yoctoNEAR.
pub fn parse_near_amount(amount: &str) -> Result<u128, ListingError> {
    let invalid = || ListingError::InvalidPrice(amount.to_string());
    let trimmed = amount.trim();
    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
        || frac.len() > YOCTO_DECIMALS
    {
        return Err(invalid());
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_padded = format!("{:0<width$}", frac, width = YOCTO_DECIMALS);
    let frac: u128 = frac_padded.parse().map_err(|_| invalid())?;

    whole
        .checked_mul(10u128.pow(YOCTO_DECIMALS as u32))
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)
}

/// Human-readable size with binary units, e.g. `2 MB`, `1.5 KB`, `0 Bytes`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Shorten a hash or CID to `start...end`. Short inputs are returned unchanged.
pub fn truncate_hash(hash: &str, start_chars: usize, end_chars: usize) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= start_chars + end_chars {
        return hash.to_string();
    }
    let head: String = chars[..start_chars].iter().collect();
    let tail: String = chars[chars.len() - end_chars..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_NEAR: u128 = 1_000_000_000_000_000_000_000_000;

    #[test]
    fn test_parse_near_amount() {
        assert_eq!(parse_near_amount("1").unwrap(), ONE_NEAR);
        assert_eq!(parse_near_amount("2.5").unwrap(), 2 * ONE_NEAR + ONE_NEAR / 2);
        assert_eq!(parse_near_amount(".25").unwrap(), ONE_NEAR / 4);
        assert_eq!(parse_near_amount(" 0 ").unwrap(), 0);
        assert_eq!(parse_near_amount("0.000000000000000000000001").unwrap(), 1);
    }

    #[test]
    fn test_parse_near_amount_rejects_garbage() {
        for bad in ["", ".", "-1", "1e3", "abc", "1.2.3", "0.0000000000000000000000001"] {
            assert!(parse_near_amount(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_near_amount_overflow() {
        assert!(parse_near_amount("1000000000000000000").is_err());
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_file_size(1024u64.pow(5)), "1024 TB");
    }

    #[test]
    fn test_truncate_hash() {
        assert_eq!(
            truncate_hash("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi", 8, 6),
            "bafybeig...5fbzdi"
        );
        assert_eq!(truncate_hash("short", 8, 6), "short");
    }

    #[test]
    fn test_price_serialized_as_string() {
        let draft = ListingDraft {
            title: "t".into(),
            description: String::new(),
            category: "Genomic".into(),
            filecoin_cid: "bafy".into(),
            bio_validated: true,
            zk_proof_hash: "0x00".into(),
            price: ONE_NEAR,
            license: "MIT".into(),
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["price"], "1000000000000000000000000");
        let back: ListingDraft = serde_json::from_value(json).unwrap();
        assert_eq!(back, draft);
    }
}
