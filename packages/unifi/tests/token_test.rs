//! Unverified JWT claim extraction

#![allow(clippy::unwrap_used, clippy::expect_used)]

use base64::{Engine as _, engine::general_purpose::URL_SAFE, engine::general_purpose::URL_SAFE_NO_PAD};
use unicert_unifi::{UnifiError, csrf_token_from_jwt, unverified_claim, unverified_payload};

fn token_with_payload(payload: &[u8]) -> String {
    format!("e30.{}.sig", URL_SAFE_NO_PAD.encode(payload))
}

#[test]
fn test_reads_csrf_claim() {
    let token = token_with_payload(br#"{"csrfToken":"abc-123","exp":1}"#);

    assert_eq!(csrf_token_from_jwt(&token).unwrap(), Some("abc-123".to_string()));
}

#[test]
fn test_signature_segment_is_optional() {
    let token = format!("e30.{}", URL_SAFE_NO_PAD.encode(br#"{"csrfToken":"x"}"#));

    assert_eq!(csrf_token_from_jwt(&token).unwrap(), Some("x".to_string()));
}

#[test]
fn test_padded_payload_is_accepted() {
    let token = format!("e30.{}.sig", URL_SAFE.encode(br#"{"csrfToken":"pad"}"#));

    assert_eq!(csrf_token_from_jwt(&token).unwrap(), Some("pad".to_string()));
}

#[test]
fn test_missing_or_non_string_claim_is_none() {
    let token = token_with_payload(br#"{"csrfToken":42,"sub":"user"}"#);

    assert_eq!(csrf_token_from_jwt(&token).unwrap(), None);
    assert_eq!(unverified_claim(&token, "sub").unwrap(), Some("user".to_string()));
    assert_eq!(unverified_claim(&token, "aud").unwrap(), None);
}

#[test]
fn test_single_segment_is_token_format_error() {
    let err = csrf_token_from_jwt("onlyonesegment").unwrap_err();

    assert!(matches!(err, UnifiError::TokenFormat(_)));
}

#[test]
fn test_invalid_base64_is_token_format_error() {
    let err = csrf_token_from_jwt("e30.***.sig").unwrap_err();

    assert!(matches!(err, UnifiError::TokenFormat(_)));
}

#[test]
fn test_non_json_payload_is_token_format_error() {
    let token = token_with_payload(b"not json");

    assert!(matches!(
        unverified_payload(&token),
        Err(UnifiError::TokenFormat(_))
    ));
}

#[test]
fn test_non_object_payload_is_token_format_error() {
    let token = token_with_payload(b"[1,2,3]");

    assert!(matches!(
        unverified_payload(&token),
        Err(UnifiError::TokenFormat(_))
    ));
}
