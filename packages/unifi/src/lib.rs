//! UniFi controller client: session handling and the certificate API
//!
//! - [`Session`] detects the controller flavor by probing login endpoints and
//!   carries cookies and the CSRF token across requests
//! - [`CertificateClient`] implements [`CertificateStore`] over a session
//! - [`Transport`] is the HTTP seam; [`ReqwestTransport`] and
//!   [`RetryingTransport`] are the provided implementations

#![forbid(unsafe_code)]

pub mod certificates;
pub mod endpoints;
mod error;
pub mod retry;
pub mod session;
pub mod token;
pub mod transport;
pub mod types;

pub use certificates::{CertificateClient, CertificateStore};
pub use error::{LoginAttempt, Result, UnifiError};
pub use retry::{RetryPolicy, RetryingTransport};
pub use session::{Credentials, Flavor, LoginEndpoint, Session, SessionState};
pub use token::{csrf_token_from_jwt, unverified_claim, unverified_payload};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, TlsMode, Transport, TransportConfig};
pub use types::{CertificateRecord, Issuer, Subject, SubjectAlt};
