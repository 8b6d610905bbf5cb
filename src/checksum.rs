//! Payload digests computed at append time and re-checked on load.
//!
//! Two algorithms are supported. [`ChecksumAlgorithm::Legacy`] is the 32-bit
//! shift-and-subtract string hash older logs were written with; it only hints
//! at accidental corruption and must not back integrity decisions.
//! [`ChecksumAlgorithm::Sha256`] is the default for new operations and is
//! stored with a `sha256:` prefix so both kinds can coexist in one log.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

const SHA256_PREFIX: &str = "sha256:";

/// Digest used for new operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumAlgorithm {
    /// 32-bit rotate hash rendered as hex. Not collision resistant.
    Legacy,
    /// SHA-256 rendered as `sha256:<hex>`.
    #[default]
    Sha256,
}

impl ChecksumAlgorithm {
    /// Detects the algorithm a stored checksum was produced with.
    pub fn detect(checksum: &str) -> Self {
        if checksum.starts_with(SHA256_PREFIX) {
            Self::Sha256
        } else {
            Self::Legacy
        }
    }
}

/// Computes the checksum of `payload` with `algorithm`.
///
/// `serde_json` keeps object keys sorted, so equal payloads always encode to
/// the same bytes.
pub fn compute(payload: &Value, algorithm: ChecksumAlgorithm) -> String {
    let encoded = payload.to_string();
    match algorithm {
        ChecksumAlgorithm::Legacy => legacy_hash(&encoded),
        ChecksumAlgorithm::Sha256 => {
            let digest = Sha256::digest(encoded.as_bytes());
            format!("{SHA256_PREFIX}{}", hex::encode(digest))
        }
    }
}

/// Returns true when `checksum` matches `payload` under the algorithm the
/// checksum string was written with.
pub fn verify(payload: &Value, checksum: &str) -> bool {
    compute(payload, ChecksumAlgorithm::detect(checksum)) == checksum
}

fn legacy_hash(input: &str) -> String {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    format!("{:x}", hash.unsigned_abs())
}
