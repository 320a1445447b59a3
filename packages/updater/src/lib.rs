//! Certificate lifecycle for UniFi consoles
//!
//! Fetches the desired certificate from a secret, uploads it unless the store
//! already holds the same fingerprint, activates it and prunes old
//! certificates down to a retention cap. The active certificate is never
//! pruned.

#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod lifecycle;
pub mod logging;
pub mod secret;

pub use config::Config;
pub use error::{Result, UpdaterError};
pub use lifecycle::{
    Activation, DEFAULT_MAX_CERTIFICATES, LifecycleDecision, PrunePlan, Resolution, RunReport,
    Updater, plan, retention_limit,
};
pub use logging::LoggingTransformer;
pub use secret::{CertificateBundle, FileSecretSource, KubeSecretSource, SecretSource};
