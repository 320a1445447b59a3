//! Controller session state and the authenticated request primitive
//!
//! A [`Session`] starts unauthenticated. [`Session::login`] probes the candidate
//! login endpoints in order and binds the session to the flavor of the first
//! one that answers 2xx. From then on every request carries the jar's cookies
//! and, when one is held, the CSRF token. An expired session surfaces as a
//! [`UnifiError::Status`] with 401; it is never re-established silently.

use std::fmt;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, SET_COOKIE};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::endpoints::{
    CSRF_HEADER, LOGIN_LEGACY, LOGIN_LEGACY_SITE, LOGIN_OS, LOGOUT_LEGACY, LOGOUT_OS,
    SESSION_COOKIE, UPDATED_CSRF_HEADER,
};
use crate::error::{LoginAttempt, Result, UnifiError};
use crate::token::csrf_token_from_jwt;
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// API dialect a session is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// UniFi OS console (UDM, UCG, Cloud Key Gen2+)
    UnifiOs,
    /// Standalone network application or pre-OS firmware
    Legacy,
}

impl Flavor {
    /// Whether `/api/userCertificates` is available
    #[must_use]
    pub const fn supports_certificates(self) -> bool {
        matches!(self, Self::UnifiOs)
    }

    const fn logout_path(self) -> &'static str {
        match self {
            Self::UnifiOs => LOGOUT_OS,
            Self::Legacy => LOGOUT_LEGACY,
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnifiOs => f.write_str("UniFi OS"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No login has succeeded, or the session was logged out
    Unauthenticated,
    /// Bound to a flavor by a successful login
    Authenticated(Flavor),
}

/// One login endpoint to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEndpoint {
    path: String,
}

impl LoginEndpoint {
    /// Endpoint at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Endpoint path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Flavor a successful login here binds to; only the modern endpoint is OS
    #[must_use]
    pub fn flavor(&self) -> Flavor {
        if self.path == LOGIN_OS {
            Flavor::UnifiOs
        } else {
            Flavor::Legacy
        }
    }

    /// Default probe order, most specific first
    #[must_use]
    pub fn defaults(site: &str) -> Vec<Self> {
        vec![
            Self::new(LOGIN_OS),
            Self::new(LOGIN_LEGACY),
            Self::new(LOGIN_LEGACY_SITE.replace("{site}", site)),
        ]
    }
}

/// Username and password for the controller's local account
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Credentials for `username`
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Account name
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize, Default)]
struct LoginResponse {
    #[serde(default)]
    unique_id: Option<String>,
    #[serde(default, rename = "csrfToken")]
    csrf_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Session with one controller
///
/// Not shared between controllers or tasks; each controller gets its own.
pub struct Session<T> {
    base_url: String,
    credentials: Credentials,
    transport: T,
    login_endpoints: Vec<LoginEndpoint>,
    cookies: Jar,
    token: Option<Zeroizing<String>>,
    csrf_token: Option<String>,
    flavor: Option<Flavor>,
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("login_endpoints", &self.login_endpoints)
            .field("has_token", &self.token.is_some())
            .field("has_csrf_token", &self.csrf_token.is_some())
            .field("flavor", &self.flavor)
            .finish()
    }
}

impl<T: Transport> Session<T> {
    /// Unauthenticated session against `base_url` using the default site
    ///
    /// # Errors
    ///
    /// Returns [`UnifiError::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, credentials: Credentials, transport: T) -> Result<Self> {
        Self::with_site(base_url, "default", credentials, transport)
    }

    /// Unauthenticated session whose site-scoped legacy login targets `site`
    ///
    /// # Errors
    ///
    /// Returns [`UnifiError::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn with_site(
        base_url: &str,
        site: &str,
        credentials: Credentials,
        transport: T,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| UnifiError::InvalidUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            base_url,
            credentials,
            transport,
            login_endpoints: LoginEndpoint::defaults(site),
            cookies: Jar::default(),
            token: None,
            csrf_token: None,
            flavor: None,
        })
    }

    /// Replace the login probe order
    #[must_use]
    pub fn with_login_endpoints(mut self, endpoints: Vec<LoginEndpoint>) -> Self {
        self.login_endpoints = endpoints;
        self
    }

    /// Controller base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.flavor
            .map_or(SessionState::Unauthenticated, SessionState::Authenticated)
    }

    /// Flavor bound by the last successful login
    #[must_use]
    pub fn flavor(&self) -> Option<Flavor> {
        self.flavor
    }

    /// Whether the session is bound to a UniFi OS console
    #[must_use]
    pub fn is_unifi_os(&self) -> bool {
        self.flavor == Some(Flavor::UnifiOs)
    }

    /// Session token taken from the `TOKEN` cookie
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(|token| token.as_str())
    }

    /// CSRF token currently attached to requests
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Probe the login endpoints and bind the session to the first that succeeds
    ///
    /// Individual endpoint failures are logged and skipped. Any previous session
    /// state is discarded first.
    ///
    /// # Errors
    ///
    /// Returns [`UnifiError::AuthExhausted`] when every candidate fails.
    pub async fn login(&mut self) -> Result<Flavor> {
        info!(base_url = %self.base_url, "Attempting to log in to the UniFi API");
        self.reset();

        let payload = serde_json::to_vec(&serde_json::json!({
            "username": self.credentials.username,
            "password": self.credentials.password.as_str(),
        }))?;

        let mut attempts = Vec::with_capacity(self.login_endpoints.len());
        for endpoint in self.login_endpoints.clone() {
            // A rejected candidate may still have set cookies.
            self.cookies = Jar::default();
            self.token = None;
            self.csrf_token = None;
            match self
                .exchange(Method::POST, endpoint.path(), Some(payload.clone()))
                .await
            {
                Ok(response) => {
                    let flavor = endpoint.flavor();
                    self.establish(&response);
                    self.flavor = Some(flavor);
                    info!(
                        endpoint = endpoint.path(),
                        flavor = %flavor,
                        has_csrf_token = self.csrf_token.is_some(),
                        "Login successful"
                    );
                    return Ok(flavor);
                }
                Err(e) => {
                    warn!(endpoint = endpoint.path(), error = %e, "Login attempt failed");
                    attempts.push(LoginAttempt {
                        endpoint: endpoint.path().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.reset();
        Err(UnifiError::AuthExhausted { attempts })
    }

    /// End the session on the controller and forget all session state
    ///
    /// Local state is cleared even when the controller rejects the request.
    ///
    /// # Errors
    ///
    /// Returns the controller's error for the logout request, if any.
    pub async fn logout(&mut self) -> Result<()> {
        let Some(flavor) = self.flavor else {
            return Ok(());
        };

        let outcome = self
            .exchange(Method::POST, flavor.logout_path(), None)
            .await
            .map(|_| ());
        self.reset();

        match &outcome {
            Ok(()) => info!("Logged out of the UniFi API"),
            Err(e) => warn!(error = %e, "Logout request failed, session state cleared"),
        }
        outcome
    }

    /// Flavor of the session, failing if it is unauthenticated or cannot run `operation`
    ///
    /// # Errors
    ///
    /// [`UnifiError::NotAuthenticated`] before login, [`UnifiError::NotSupported`]
    /// on flavors without the certificate API.
    pub fn require_certificate_api(&self, operation: &'static str) -> Result<Flavor> {
        let flavor = self.flavor.ok_or(UnifiError::NotAuthenticated)?;
        if flavor.supports_certificates() {
            Ok(flavor)
        } else {
            Err(UnifiError::NotSupported { operation, flavor })
        }
    }

    /// Authenticated request returning the raw response
    ///
    /// # Errors
    ///
    /// [`UnifiError::NotAuthenticated`] before login, [`UnifiError::Status`] for
    /// non-2xx answers, transport errors otherwise.
    pub async fn send(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse> {
        if self.flavor.is_none() {
            return Err(UnifiError::NotAuthenticated);
        }
        let body = body.map(serde_json::to_vec).transpose()?;
        self.exchange(method, path, body).await
    }

    /// Authenticated request decoding a JSON response
    ///
    /// # Errors
    ///
    /// As [`Session::send`], plus [`UnifiError::Serialization`] for bodies that
    /// do not decode into `R`.
    pub async fn request<R: DeserializeOwned>(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<R> {
        let response = self.send(method, path, body).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    fn url(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| UnifiError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Decorate, send, absorb cookies and CSRF rotation, then check the status
    async fn exchange(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        let url = self.url(path)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(cookie) = self.cookies.cookies(&url) {
            headers.insert(COOKIE, cookie);
        }
        if let Some(csrf) = &self.csrf_token {
            match HeaderValue::from_str(csrf) {
                Ok(value) => {
                    headers.insert(CSRF_HEADER, value);
                }
                Err(_) => warn!("Held CSRF token is not a valid header value, omitting it"),
            }
        }

        // Login probes and deletes take 404 as a final answer.
        let retry_not_found = self.flavor.is_some() && method != Method::DELETE;

        debug!(method = %method, path, "Sending controller request");
        let response = self
            .transport
            .execute(HttpRequest {
                method,
                url: url.clone(),
                headers,
                body,
                retry_not_found,
            })
            .await?;

        self.absorb_cookies(&response, &url);
        self.refresh_csrf(&response.headers);

        if !response.is_success() {
            return Err(UnifiError::Status {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response)
    }

    fn absorb_cookies(&mut self, response: &HttpResponse, url: &Url) {
        let mut set_cookies = response.headers.get_all(SET_COOKIE).iter().peekable();
        if set_cookies.peek().is_none() {
            return;
        }
        self.cookies.set_cookies(&mut set_cookies, url);
        if let Some(token) = self.cookie_value(SESSION_COOKIE) {
            self.token = Some(Zeroizing::new(token));
        }
    }

    /// Adopt a rotated CSRF token from the response headers
    fn refresh_csrf(&mut self, headers: &HeaderMap) {
        let rotated = [UPDATED_CSRF_HEADER, CSRF_HEADER]
            .iter()
            .filter_map(|name| headers.get(*name))
            .filter_map(|value| value.to_str().ok())
            .find(|value| !value.is_empty());

        if let Some(rotated) = rotated {
            if self.csrf_token.as_deref() != Some(rotated) {
                self.csrf_token = Some(rotated.to_string());
                debug!("CSRF token updated");
            }
        }
    }

    fn cookie_value(&self, name: &str) -> Option<String> {
        let url = Url::parse(&format!("{}/", self.base_url)).ok()?;
        let header = self.cookies.cookies(&url)?;
        header.to_str().ok()?.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    /// Record token and CSRF value after a successful login response
    fn establish(&mut self, response: &HttpResponse) {
        self.token = self.cookie_value(SESSION_COOKIE).map(Zeroizing::new);

        let login: LoginResponse = serde_json::from_slice(&response.body).unwrap_or_else(|e| {
            debug!(error = %e, "Login response body is not a login object");
            LoginResponse::default()
        });
        if let Some(unique_id) = &login.unique_id {
            debug!(unique_id = %unique_id, "Controller identified the account");
        }

        let from_jwt = |label: &str, token: &str| match csrf_token_from_jwt(token) {
            Ok(csrf) => csrf,
            Err(e) => {
                debug!(source = label, error = %e, "No CSRF token readable from token");
                None
            }
        };

        let csrf = login
            .csrf_token
            .filter(|csrf| !csrf.is_empty())
            .or_else(|| {
                login
                    .access_token
                    .as_deref()
                    .and_then(|token| from_jwt("access_token", token))
            })
            .or_else(|| {
                self.token
                    .as_deref()
                    .filter(|token| token.contains('.'))
                    .and_then(|token| from_jwt(SESSION_COOKIE, token))
            });

        if let Some(csrf) = csrf {
            self.csrf_token = Some(csrf);
        }
    }

    fn reset(&mut self) {
        self.cookies = Jar::default();
        self.token = None;
        self.csrf_token = None;
        self.flavor = None;
    }
}
