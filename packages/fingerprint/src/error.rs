//! Error types for fingerprint computation

use thiserror::Error;

/// Failures while turning PEM text into a fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    /// The input contains no PEM block
    #[error("failed to decode PEM block: {0}")]
    Decode(String),

    /// The PEM block does not hold a well-formed X.509 certificate
    #[error("failed to parse certificate: {0}")]
    Parse(String),

    /// The algorithm name is not one of the supported digests
    #[error("unsupported fingerprint algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Result type for fingerprint operations
pub type Result<T> = std::result::Result<T, FingerprintError>;
