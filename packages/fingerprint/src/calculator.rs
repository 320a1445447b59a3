//! PEM decoding, certificate parsing and digest formatting

use std::time::SystemTime;

use der::Decode;
use ring::digest;
use x509_cert::Certificate;

use crate::algorithm::FingerprintAlgorithm;
use crate::error::{FingerprintError, Result};

/// Compute the fingerprint of a PEM certificate with the default digest
///
/// # Errors
///
/// Returns [`FingerprintError::Decode`] when no PEM block is present and
/// [`FingerprintError::Parse`] when the block is not a valid certificate.
pub fn fingerprint(certificate_pem: &str) -> Result<String> {
    Fingerprinter::default().fingerprint(certificate_pem)
}

/// Render bytes as colon-separated upper-case hex pairs
#[must_use]
pub fn colon_hex(bytes: &[u8]) -> String {
    let encoded = hex::encode_upper(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 2);
    for (i, pair) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.extend(pair.iter().map(|&b| char::from(b)));
    }
    out
}

/// Identity and validity of a parsed certificate, for logging and reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSummary {
    /// Colon-separated fingerprint
    pub fingerprint: String,
    /// Subject distinguished name in RFC 4514 form
    pub subject: String,
    /// Start of the validity window
    pub not_before: SystemTime,
    /// End of the validity window
    pub not_after: SystemTime,
}

/// Stateless fingerprint calculator bound to one digest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fingerprinter {
    algorithm: FingerprintAlgorithm,
}

impl Fingerprinter {
    /// Create a calculator for the given digest
    #[must_use]
    pub const fn new(algorithm: FingerprintAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Digest used by this calculator
    #[must_use]
    pub const fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    /// Fingerprint the first certificate block in `certificate_pem`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - no PEM block can be decoded
    /// - the block's DER does not parse as an X.509 certificate
    pub fn fingerprint(&self, certificate_pem: &str) -> Result<String> {
        let (der, _) = decode_certificate(certificate_pem)?;
        Ok(self.fingerprint_der(&der))
    }

    /// Fingerprint raw DER bytes without parsing them
    #[must_use]
    pub fn fingerprint_der(&self, der: &[u8]) -> String {
        colon_hex(digest::digest(self.algorithm.digest_algorithm(), der).as_ref())
    }

    /// Fingerprint plus subject and validity window
    ///
    /// # Errors
    ///
    /// Same conditions as [`Fingerprinter::fingerprint`].
    pub fn summarize(&self, certificate_pem: &str) -> Result<CertificateSummary> {
        let (der, certificate) = decode_certificate(certificate_pem)?;
        let validity = &certificate.tbs_certificate.validity;
        Ok(CertificateSummary {
            fingerprint: self.fingerprint_der(&der),
            subject: certificate.tbs_certificate.subject.to_string(),
            not_before: validity.not_before.to_system_time(),
            not_after: validity.not_after.to_system_time(),
        })
    }
}

/// Decode one PEM block and parse it, returning the raw DER alongside
fn decode_certificate(certificate_pem: &str) -> Result<(Vec<u8>, Certificate)> {
    let block = pem::parse(certificate_pem.as_bytes())
        .map_err(|e| FingerprintError::Decode(e.to_string()))?;
    let der = block.into_contents();
    let certificate =
        Certificate::from_der(&der).map_err(|e| FingerprintError::Parse(e.to_string()))?;
    Ok((der, certificate))
}
