//! Deterministic upload signatures.
//!
//! The CDN verifies an upload by recomputing the same digest: every signed
//! parameter sorted by key, joined as `key=value` pairs with `&`, followed
//! directly by the API secret, hashed with SHA-1 and hex-encoded.

use crate::error::SignerError;
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// Builds the string that is hashed, without the secret.
pub fn signature_payload(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Signs `params` plus `timestamp`. A client-supplied `timestamp` is replaced.
pub fn sign_params(params: &BTreeMap<String, String>, timestamp: i64, secret: &str) -> String {
    let mut params = params.clone();
    params.insert("timestamp".to_string(), timestamp.to_string());

    let mut hasher = Sha1::new();
    hasher.update(signature_payload(&params).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extracts `paramsToSign` from a request body.
///
/// An empty body or a missing field signs nothing. Values must be strings,
/// numbers or booleans.
///
/// # Errors
///
/// Returns [`SignerError::InvalidPayload`] for malformed JSON, a body or
/// `paramsToSign` that is not an object, or a nested value.
pub fn params_from_body(body: &[u8]) -> Result<BTreeMap<String, String>, SignerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }

    let parsed: Value = serde_json::from_slice(body).map_err(|e| {
        log::debug!("Rejected signature request body: {}", e);
        SignerError::InvalidPayload
    })?;

    let Value::Object(body) = parsed else {
        return Err(SignerError::InvalidPayload);
    };
    match body.get("paramsToSign") {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(key, value)| Ok((key.clone(), scalar_to_string(value)?)))
            .collect(),
        Some(_) => Err(SignerError::InvalidPayload),
    }
}

fn scalar_to_string(value: &Value) -> Result<String, SignerError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        _ => Err(SignerError::InvalidPayload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn matches_known_vector() {
        let p = params(&[("upload_preset", "unsigned_preset"), ("folder", "tuus-imago")]);
        assert_eq!(
            sign_params(&p, 1_700_000_000, "shh"),
            "e81b454f184c670396f9a20ae8e9ab08e73bf564"
        );
    }

    #[test]
    fn server_timestamp_replaces_client_value() {
        let with_client = params(&[
            ("upload_preset", "unsigned_preset"),
            ("folder", "tuus-imago"),
            ("timestamp", "1"),
        ]);
        let without = params(&[("upload_preset", "unsigned_preset"), ("folder", "tuus-imago")]);
        assert_eq!(
            sign_params(&with_client, 1_700_000_000, "shh"),
            sign_params(&without, 1_700_000_000, "shh")
        );
    }

    #[test]
    fn payload_is_sorted_and_joined() {
        let p = params(&[("b", "2"), ("a", "1"), ("c", "x,y")]);
        assert_eq!(signature_payload(&p), "a=1&b=2&c=x,y");
    }

    #[test]
    fn body_scalars_are_stringified() {
        let body = br#"{"paramsToSign":{"n":3,"flag":true,"custom_coordinates":"0,0,400,400"}}"#;
        let p = params_from_body(body).unwrap();
        assert_eq!(p["n"], "3");
        assert_eq!(p["flag"], "true");
        assert_eq!(
            sign_params(&p, 1_700_000_000, "shh"),
            "5cdc9220ac2306e09b13c3c48e2c8b73261d0fc5"
        );
    }

    #[test]
    fn whole_floats_print_like_integers() {
        let p = params_from_body(br#"{"paramsToSign":{"a":2.0,"b":2.5}}"#).unwrap();
        assert_eq!(p["a"], "2");
        assert_eq!(p["b"], "2.5");
    }

    #[test]
    fn empty_or_missing_params_sign_nothing() {
        assert!(params_from_body(b"").unwrap().is_empty());
        assert!(params_from_body(b"{}").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(matches!(params_from_body(b"{not json"), Err(SignerError::InvalidPayload)));
        assert!(matches!(
            params_from_body(br#"{"paramsToSign":{"a":{"b":1}}}"#),
            Err(SignerError::InvalidPayload)
        ));
        assert!(matches!(
            params_from_body(br#"{"paramsToSign":[1,2]}"#),
            Err(SignerError::InvalidPayload)
        ));
        let non_objects: [&[u8]; 4] = [b"null", b"[]", b"42", br#""text""#];
        for body in non_objects {
            assert!(matches!(params_from_body(body), Err(SignerError::InvalidPayload)));
        }
    }
}
