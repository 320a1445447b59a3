//! Sources for the desired certificate and private key
//!
//! Both sources read the `kubernetes.io/tls` layout: PEM certificate chain
//! under `tls.crt`, PEM private key under `tls.key`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{Result, UpdaterError};

/// Secret entry holding the certificate chain
pub const CERTIFICATE_ENTRY: &str = "tls.crt";
/// Secret entry holding the private key
pub const KEY_ENTRY: &str = "tls.key";

/// Certificate and key pair to install on the console
#[derive(Clone)]
pub struct CertificateBundle {
    /// PEM certificate, leaf first
    pub certificate_pem: String,
    /// PEM private key, wiped on drop
    pub key_pem: Zeroizing<String>,
}

impl CertificateBundle {
    /// Bundle a certificate with its key
    pub fn new(certificate_pem: impl Into<String>, key_pem: impl Into<String>) -> Self {
        Self {
            certificate_pem: certificate_pem.into(),
            key_pem: Zeroizing::new(key_pem.into()),
        }
    }

    /// Build a bundle from raw secret entries
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::Secret`] if either entry is absent or not UTF-8.
    pub fn from_entries(certificate: Option<&[u8]>, key: Option<&[u8]>) -> Result<Self> {
        let (Some(certificate), Some(key)) = (certificate, key) else {
            return Err(UpdaterError::Secret(
                "secret is missing tls.crt or tls.key".to_string(),
            ));
        };

        let certificate = std::str::from_utf8(certificate)
            .map_err(|e| UpdaterError::Secret(format!("{CERTIFICATE_ENTRY} is not valid UTF-8: {e}")))?;
        let key = std::str::from_utf8(key)
            .map_err(|_| UpdaterError::Secret(format!("{KEY_ENTRY} is not valid UTF-8")))?;

        Ok(Self::new(certificate, key))
    }
}

impl fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("certificate_pem", &format_args!("{} bytes", self.certificate_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Supplies the certificate bundle for a run
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Read the current certificate and key
    async fn fetch(&self) -> Result<CertificateBundle>;
}

/// Reads a namespaced Kubernetes TLS secret
#[derive(Clone)]
pub struct KubeSecretSource {
    client: Client,
    namespace: String,
    name: String,
}

impl KubeSecretSource {
    /// Source backed by an existing client
    pub fn new(client: Client, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Source using the in-cluster or kubeconfig client
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::Secret`] if no Kubernetes configuration is found.
    pub async fn try_default(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| UpdaterError::Secret(format!("failed to create Kubernetes client: {e}")))?;
        Ok(Self::new(client, namespace, name))
    }
}

impl fmt::Debug for KubeSecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeSecretSource")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretSource for KubeSecretSource {
    async fn fetch(&self) -> Result<CertificateBundle> {
        debug!(namespace = %self.namespace, secret = %self.name, "Fetching certificate secret");

        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        let secret = secrets.get(&self.name).await.map_err(|e| {
            UpdaterError::Secret(format!(
                "failed to fetch secret '{}/{}': {e}",
                self.namespace, self.name
            ))
        })?;

        let data = secret.data.unwrap_or_default();
        let bundle = CertificateBundle::from_entries(
            data.get(CERTIFICATE_ENTRY).map(|v| v.0.as_slice()),
            data.get(KEY_ENTRY).map(|v| v.0.as_slice()),
        )?;

        info!(namespace = %self.namespace, secret = %self.name, "Certificate and key fetched");
        Ok(bundle)
    }
}

/// Reads `tls.crt` and `tls.key` from a directory, e.g. a mounted secret volume
#[derive(Debug, Clone)]
pub struct FileSecretSource {
    dir: PathBuf,
}

impl FileSecretSource {
    /// Source reading from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory being read
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_entry(&self, entry: &str) -> Result<Option<Vec<u8>>> {
        let path = self.dir.join(entry);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(UpdaterError::Secret(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }
}

#[async_trait]
impl SecretSource for FileSecretSource {
    async fn fetch(&self) -> Result<CertificateBundle> {
        let certificate = self.read_entry(CERTIFICATE_ENTRY).await?;
        let key = Zeroizing::new(self.read_entry(KEY_ENTRY).await?);

        let bundle = CertificateBundle::from_entries(certificate.as_deref(), key.as_deref())?;

        info!(dir = %self.dir.display(), "Certificate and key read from directory");
        Ok(bundle)
    }
}
