//! Certificate store wire types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Certificate as reported by `/api/userCertificates`
///
/// The store assigns `id` and derives every other field from the uploaded PEM.
/// Fields missing from a response default to empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateRecord {
    /// Store-assigned identifier, never reused
    pub id: String,
    /// Display name given at upload
    pub name: String,
    /// Serial number as rendered by the controller
    pub serial_number: String,
    /// Colon-separated fingerprint computed by the controller
    pub fingerprint: String,
    /// Subject attributes
    pub subject: Subject,
    /// Issuer attributes
    pub issuer: Issuer,
    /// Subject alternative names
    #[serde(rename = "subject_alt_name")]
    pub subject_alt: SubjectAlt,
    /// Start of the validity window
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window
    pub valid_to: Option<DateTime<Utc>>,
    /// Whether the console currently serves this certificate
    pub active: bool,
    /// Upload time
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time
    pub updated_at: Option<DateTime<Utc>>,
}

/// Certificate subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    /// Common name
    #[serde(rename = "CN")]
    pub common_name: String,
}

/// Certificate issuer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issuer {
    /// Country
    #[serde(rename = "C")]
    pub country: String,
    /// Organization
    #[serde(rename = "O")]
    pub organization: String,
    /// Common name
    #[serde(rename = "CN")]
    pub common_name: String,
}

/// Subject alternative names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectAlt {
    /// DNS names
    #[serde(rename = "DNS")]
    pub dns: Vec<String>,
}

/// Payload for uploading a certificate
#[derive(Debug, Clone, Serialize)]
pub struct CreateCertificate<'a> {
    /// Display name
    pub name: &'a str,
    /// Certificate chain PEM
    pub cert: &'a str,
    /// Private key PEM
    pub key: &'a str,
}

/// Responses arrive either bare or wrapped in the classic `{meta, data}` envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

/// Single records inside an envelope arrive as a one-element `data` array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_first(self) -> Option<T> {
        match self {
            Self::Many(items) => items.into_iter().next(),
            Self::One(item) => Some(item),
        }
    }
}
