//! Unverified claim extraction from JWT-shaped tokens
//!
//! UniFi OS hands out its session as a JWT whose payload repeats the CSRF token.
//! Reading that claim is a convenience only: the signature is not checked and
//! nothing here establishes trust. Authentication rests on the session cookie.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;

use crate::endpoints::CSRF_CLAIM;
use crate::error::{Result, UnifiError};

/// Decode the payload segment of `token` into a JSON object
///
/// # Errors
///
/// Returns [`UnifiError::TokenFormat`] if the token has fewer than two
/// dot-separated segments, the payload is not URL-safe base64, or it does not
/// decode to a JSON object.
pub fn unverified_payload(token: &str) -> Result<serde_json::Map<String, Value>> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) => payload,
        _ => {
            return Err(UnifiError::TokenFormat(
                "expected at least two dot-separated segments".to_string(),
            ));
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| UnifiError::TokenFormat(format!("payload is not base64url: {e}")))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(UnifiError::TokenFormat(
            "payload is not a JSON object".to_string(),
        )),
        Err(e) => Err(UnifiError::TokenFormat(format!(
            "payload is not valid JSON: {e}"
        ))),
    }
}

/// Read a string claim without verifying the token
///
/// A claim that is absent or not a string yields `Ok(None)`.
///
/// # Errors
///
/// Same conditions as [`unverified_payload`].
pub fn unverified_claim(token: &str, claim: &str) -> Result<Option<String>> {
    let claims = unverified_payload(token)?;
    Ok(claims
        .get(claim)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string))
}

/// Read the `csrfToken` claim
///
/// # Errors
///
/// Same conditions as [`unverified_payload`].
pub fn csrf_token_from_jwt(token: &str) -> Result<Option<String>> {
    unverified_claim(token, CSRF_CLAIM)
}
