//! Certificate repository on UniFi OS consoles

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info};

use crate::endpoints;
use crate::error::{Result, UnifiError};
use crate::session::Session;
use crate::transport::Transport;
use crate::types::{CertificateRecord, CreateCertificate, Envelope, OneOrMany};

/// Remote certificate store operations
///
/// The store is authoritative; implementations return snapshots in server order.
#[async_trait]
pub trait CertificateStore: Send {
    /// All stored certificates, in the order the store reports them
    async fn list(&mut self) -> Result<Vec<CertificateRecord>>;

    /// Upload a certificate and key under `name`
    async fn create(
        &mut self,
        name: &str,
        certificate_pem: &str,
        key_pem: &str,
    ) -> Result<CertificateRecord>;

    /// Mark `id` active; exclusivity is the store's business, re-list to confirm
    async fn activate(&mut self, id: &str) -> Result<()>;

    /// Remove `id`
    async fn delete(&mut self, id: &str) -> Result<()>;
}

/// [`CertificateStore`] backed by an authenticated [`Session`]
#[derive(Debug)]
pub struct CertificateClient<T> {
    session: Session<T>,
}

impl<T: Transport> CertificateClient<T> {
    /// Wrap a session; it must be logged in before any operation is used
    pub fn new(session: Session<T>) -> Self {
        Self { session }
    }

    /// Mutably borrow the session, e.g. to log out
    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }
}

#[async_trait]
impl<T: Transport> CertificateStore for CertificateClient<T> {
    async fn list(&mut self) -> Result<Vec<CertificateRecord>> {
        self.session.require_certificate_api("ListCertificates")?;

        let certificates: Envelope<Vec<CertificateRecord>> = self
            .session
            .request(Method::GET, endpoints::CERTIFICATES, None)
            .await?;
        let certificates = certificates.into_inner();

        debug!(count = certificates.len(), "Listed certificates");
        Ok(certificates)
    }

    async fn create(
        &mut self,
        name: &str,
        certificate_pem: &str,
        key_pem: &str,
    ) -> Result<CertificateRecord> {
        self.session.require_certificate_api("CreateCertificate")?;

        let payload = serde_json::to_value(CreateCertificate {
            name,
            cert: certificate_pem,
            key: key_pem,
        })?;
        let created: Envelope<OneOrMany<CertificateRecord>> = self
            .session
            .request(Method::POST, endpoints::CERTIFICATES, Some(&payload))
            .await?;
        let created = created
            .into_inner()
            .into_first()
            .filter(|record| !record.id.is_empty())
            .ok_or_else(|| {
                UnifiError::UnexpectedResponse(
                    "create response did not contain a certificate id".to_string(),
                )
            })?;

        info!(id = %created.id, name, "Certificate successfully created");
        Ok(created)
    }

    async fn activate(&mut self, id: &str) -> Result<()> {
        self.session.require_certificate_api("ActivateCertificate")?;

        let payload = serde_json::json!({ "active": true });
        self.session
            .send(Method::PUT, &endpoints::certificate_status(id), Some(&payload))
            .await?;

        info!(id, "Certificate successfully activated");
        Ok(())
    }

    async fn delete(&mut self, id: &str) -> Result<()> {
        self.session.require_certificate_api("DeleteCertificate")?;

        self.session
            .send(Method::DELETE, &endpoints::certificate(id), None)
            .await?;

        info!(id, "Certificate successfully deleted");
        Ok(())
    }
}
