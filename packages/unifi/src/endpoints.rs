//! Controller REST paths

/// UniFi OS login, the modern endpoint
pub const LOGIN_OS: &str = "/api/auth/login";
/// Standalone network application login
pub const LOGIN_LEGACY: &str = "/api/login";
/// Site-scoped legacy login, `{site}` is substituted
pub const LOGIN_LEGACY_SITE: &str = "/api/s/{site}/login";

/// UniFi OS logout
pub const LOGOUT_OS: &str = "/api/auth/logout";
/// Legacy logout
pub const LOGOUT_LEGACY: &str = "/api/logout";

/// List and create user certificates
pub const CERTIFICATES: &str = "/api/userCertificates";

/// Certificate resource path
#[must_use]
pub fn certificate(id: &str) -> String {
    format!("{CERTIFICATES}/{id}")
}

/// Certificate activation path
#[must_use]
pub fn certificate_status(id: &str) -> String {
    format!("{CERTIFICATES}/{id}/status")
}

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "TOKEN";
/// Header carrying the CSRF token in both directions
pub const CSRF_HEADER: &str = "x-csrf-token";
/// Response header some firmware uses when rotating the CSRF token
pub const UPDATED_CSRF_HEADER: &str = "x-updated-csrf-token";
/// JWT claim holding the CSRF token
pub const CSRF_CLAIM: &str = "csrfToken";
