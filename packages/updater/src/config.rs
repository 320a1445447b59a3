//! Command line and environment configuration
//!
//! Every flag falls back to an environment variable, which is how the
//! container is normally configured.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use unicert_fingerprint::{FingerprintAlgorithm, Fingerprinter};
use unicert_unifi::{Credentials, RetryPolicy, TlsMode, TransportConfig};

use crate::error::{Result, UpdaterError};
use crate::lifecycle::retention_limit;
use crate::logging::LoggingTransformer;

/// Settings for one updater run
#[derive(Debug, Clone, Parser)]
#[command(
    name = "unifi-cert-updater",
    version,
    about = "Upload, activate and prune TLS certificates on a UniFi console"
)]
pub struct Config {
    /// Controller base URL, e.g. https://192.168.1.1
    #[arg(long, env = "UNIFI_API_URL")]
    pub unifi_api_url: Option<String>,

    /// Local controller account
    #[arg(long, env = "UNIFI_USERNAME")]
    pub unifi_username: Option<String>,

    /// Password for the controller account
    #[arg(long, env = "UNIFI_PASSWORD", hide_env_values = true)]
    pub unifi_password: Option<String>,

    /// Site used by the site-scoped legacy login
    #[arg(long = "site", env = "UNIFI_SITE", default_value = "default")]
    pub site: String,

    /// Namespace of the TLS secret
    #[arg(long, env = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Name of the TLS secret
    #[arg(long, env = "SECRET_NAME")]
    pub secret_name: Option<String>,

    /// Read tls.crt and tls.key from this directory instead of the cluster
    #[arg(long, env = "SECRET_DIR")]
    pub secret_dir: Option<PathBuf>,

    /// Certificates to keep on the console; 0 means the default
    #[arg(long, env = "MAX_CERTS", default_value_t = 5)]
    pub max_certs: usize,

    /// Digest for certificate fingerprints (sha1 or sha256)
    #[arg(long, env = "FINGERPRINT_ALGORITHM", default_value = "sha1")]
    pub fingerprint_algorithm: FingerprintAlgorithm,

    /// Accept self-signed controller certificates
    #[arg(long, env = "UNIFI_INSECURE_TLS", default_value_t = true, action = ArgAction::Set)]
    pub insecure_tls: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "UNIFI_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Retries for transient controller failures
    #[arg(long, env = "UNIFI_RETRY_MAX", default_value_t = 5)]
    pub retry_max: u32,

    /// debug, info, warn or error
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log the planned changes without touching the store
    #[arg(long, env = "DRY_RUN", default_value_t = false, action = ArgAction::Set)]
    pub dry_run: bool,
}

impl Config {
    /// Check that every required setting is present
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::Configuration`] naming all missing variables.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if is_blank(self.unifi_api_url.as_deref()) {
            missing.push("UNIFI_API_URL");
        }
        if is_blank(self.unifi_username.as_deref()) {
            missing.push("UNIFI_USERNAME");
        }
        if is_blank(self.unifi_password.as_deref()) {
            missing.push("UNIFI_PASSWORD");
        }
        if self.secret_dir.is_none() {
            if is_blank(self.namespace.as_deref()) {
                missing.push("NAMESPACE");
            }
            if is_blank(self.secret_name.as_deref()) {
                missing.push("SECRET_NAME");
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(UpdaterError::Configuration(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )))
        }
    }

    /// Controller base URL
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::Configuration`] when unset.
    pub fn api_url(&self) -> Result<&str> {
        required(self.unifi_api_url.as_deref(), "UNIFI_API_URL")
    }

    /// Controller credentials
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::Configuration`] when either part is unset.
    pub fn credentials(&self) -> Result<Credentials> {
        let username = required(self.unifi_username.as_deref(), "UNIFI_USERNAME")?;
        let password = required(self.unifi_password.as_deref(), "UNIFI_PASSWORD")?;
        Ok(Credentials::new(username, password))
    }

    /// Effective retention cap
    #[must_use]
    pub fn max_certificates(&self) -> usize {
        retention_limit(self.max_certs)
    }

    /// Fingerprint calculator for the configured digest
    #[must_use]
    pub fn fingerprinter(&self) -> Fingerprinter {
        Fingerprinter::new(self.fingerprint_algorithm)
    }

    /// HTTP client settings
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            tls: if self.insecure_tls {
                TlsMode::DangerAcceptInvalid
            } else {
                TlsMode::System
            },
            timeout: Duration::from_secs(self.request_timeout_secs),
            ..TransportConfig::default()
        }
    }

    /// Default policy with the configured retry count
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max,
            ..RetryPolicy::default()
        }
    }

    /// Baseline log filter from `LOG_LEVEL`
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        LoggingTransformer::parse_level(&self.log_level)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(UpdaterError::Configuration(format!(
            "missing required environment variable: {name}"
        ))),
    }
}
