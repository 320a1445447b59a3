//! Digest selection for certificate fingerprints

use std::fmt;
use std::str::FromStr;

use ring::digest;
use serde::{Deserialize, Serialize};

use crate::error::FingerprintError;

/// Digest applied to the certificate's DER bytes.
///
/// The default is SHA-1 because that is the digest UniFi OS consoles report in
/// the `fingerprint` field of `/api/userCertificates`, and deduplication
/// compares against that value verbatim. Historically this digest was labelled
/// SHA-256 in places even though SHA-1 was computed; select
/// [`FingerprintAlgorithm::Sha256`] explicitly only for stores that report
/// 256-bit fingerprints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAlgorithm {
    /// 160-bit SHA-1, 20 colon-separated pairs
    #[default]
    Sha1,
    /// 256-bit SHA-256, 32 colon-separated pairs
    Sha256,
}

impl FingerprintAlgorithm {
    /// `ring` digest backing this algorithm
    #[must_use]
    pub fn digest_algorithm(self) -> &'static digest::Algorithm {
        match self {
            Self::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => &digest::SHA256,
        }
    }

    /// Lower-case name as accepted by [`FromStr`]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for FingerprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FingerprintAlgorithm {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            other => Err(FingerprintError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}
