//! HTTP transport seam
//!
//! The session layer only needs "send a request, get a status, headers and a
//! body back". [`ReqwestTransport`] is the production implementation; TLS mode,
//! timeouts and retries are decided by whoever builds the transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Url};

use crate::error::{Result, UnifiError};

/// Outgoing request, fully decorated by the session
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: Url,
    /// Request headers, including `Cookie` and CSRF headers
    pub headers: HeaderMap,
    /// Serialized JSON body
    pub body: Option<Vec<u8>>,
    /// Whether a retry policy may treat 404 as transient for this request
    pub retry_not_found: bool,
}

/// Response as seen by the session
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// Numeric status code
    pub status: u16,
    /// Response headers; repeated headers such as `Set-Cookie` keep every value
    pub headers: HeaderMap,
    /// Raw body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded lossily as UTF-8
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Anything that can execute one HTTP exchange
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request
    ///
    /// # Errors
    ///
    /// Returns [`UnifiError::Network`] when no response was received. Non-2xx
    /// statuses are returned as responses, not errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request).await
    }
}

/// Certificate verification applied to the controller connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Verify against the platform's web PKI roots
    System,
    /// Accept any certificate; consoles ship with self-signed certificates
    DangerAcceptInvalid,
}

/// Settings for building a [`ReqwestTransport`]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Certificate verification mode
    pub tls: TlsMode,
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent header
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(30),
            user_agent: concat!("unicert/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// `reqwest` backed transport
///
/// Cookies are deliberately not stored by the client; the session owns its jar.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport from `config`
    ///
    /// # Errors
    ///
    /// Returns [`UnifiError::HttpClientInit`] if the TLS backend cannot be set up.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone());

        if config.tls == TlsMode::DangerAcceptInvalid {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| UnifiError::HttpClientInit {
            source: Box::new(e),
            context: "Failed to initialize HTTP client for the UniFi controller",
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UnifiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| UnifiError::Network(format!("failed to read response body: {e}")))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
