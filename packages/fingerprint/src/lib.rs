//! Certificate fingerprints used as content-addressed identity keys
//!
//! A fingerprint is a digest over a certificate's DER encoding, rendered as
//! colon-separated upper-case hexadecimal pairs (`58:95:C6:EA:...`). Any change
//! to the encoded certificate, including a renewed validity window with the same
//! key material, yields a different fingerprint.

#![forbid(unsafe_code)]

mod algorithm;
mod calculator;
mod error;

pub use algorithm::FingerprintAlgorithm;
pub use calculator::{CertificateSummary, Fingerprinter, colon_hex, fingerprint};
pub use error::{FingerprintError, Result};
