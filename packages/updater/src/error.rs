//! Error types for the certificate updater

use thiserror::Error;
use unicert_fingerprint::FingerprintError;
use unicert_unifi::UnifiError;

/// Errors that end an updater run
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// Controller login, transport or certificate API failure
    #[error(transparent)]
    Unifi(#[from] UnifiError),

    /// The desired certificate could not be fingerprinted
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// The certificate secret could not be read
    #[error("{0}")]
    Secret(String),

    /// Missing or inconsistent settings
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The store does not report the target as its only active certificate
    #[error(
        "certificate {expected} should be the only active certificate, store reports active: [{}]",
        .active.join(", ")
    )]
    ActivationAnomaly {
        /// Certificate that was activated
        expected: String,
        /// Identifiers the store reports as active
        active: Vec<String>,
    },
}

/// Result type for updater operations
pub type Result<T> = std::result::Result<T, UpdaterError>;
