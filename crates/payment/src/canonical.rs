//! Canonical query strings and their HMAC-SHA512 signature.
//!
//! Parameters are kept in a `BTreeMap` so iteration is already in ascending
//! key order. Two strings are produced from the same map: a form-encoded one
//! that goes into the redirect URL and a raw one that is signed.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha512;
use url::form_urlencoded::byte_serialize;

use crate::error::PaymentError;

type HmacSha512 = Hmac<Sha512>;

/// Gateway parameters in canonical order.
pub type PaymentParams = BTreeMap<String, String>;

/// Name of the signature parameter appended to the query.
pub const SECURE_HASH: &str = "vnp_SecureHash";

/// Name of the optional hash-algorithm parameter sent back by the gateway.
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

fn join<F>(params: &PaymentParams, render: F) -> String
where
    F: Fn(&str) -> String,
{
    params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", render(key), render(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Form-encoded `key=value` pairs joined by `&`; spaces become `+`.
pub fn encoded_query(params: &PaymentParams) -> String {
    join(params, encode)
}

/// Unencoded `key=value` pairs joined by `&`. This is what gets signed.
pub fn raw_query(params: &PaymentParams) -> String {
    join(params, str::to_string)
}

/// Lowercase hex HMAC-SHA512 of `data` under `key`.
pub fn hmac_sha512_hex(key: &str, data: &str) -> Result<String, PaymentError> {
    let mut mac = HmacSha512::new_from_slice(key.as_bytes()).map_err(|_| PaymentError::InvalidKey)?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Signs `params` and returns the full redirect query including the signature.
pub fn signed_query(params: &PaymentParams, key: &str) -> Result<String, PaymentError> {
    let signature = hmac_sha512_hex(key, &raw_query(params))?;
    Ok(format!(
        "{}&{SECURE_HASH}={signature}",
        encoded_query(params)
    ))
}

/// Checks `signature` against the raw canonical form of `params`.
///
/// Hex case is ignored. The comparison runs in constant time.
pub fn verify(params: &PaymentParams, key: &str, signature: &str) -> Result<bool, PaymentError> {
    let mut mac = HmacSha512::new_from_slice(key.as_bytes()).map_err(|_| PaymentError::InvalidKey)?;
    mac.update(raw_query(params).as_bytes());
    match hex::decode(signature.to_ascii_lowercase()) {
        Ok(bytes) => Ok(mac.verify_slice(&bytes).is_ok()),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> PaymentParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_keys_are_sorted_and_empty_values_dropped() {
        let p = params(&[("vnp_b", "2"), ("vnp_a", "1"), ("vnp_BankCode", "")]);
        assert_eq!(raw_query(&p), "vnp_a=1&vnp_b=2");
        assert_eq!(encoded_query(&p), "vnp_a=1&vnp_b=2");
    }

    #[test]
    fn test_encoded_and_raw_variants_differ() {
        let p = params(&[
            ("vnp_OrderInfo", "Thanh toan don hang:42"),
            ("vnp_ReturnUrl", "http://shop/return?x=1"),
        ]);
        assert_eq!(
            raw_query(&p),
            "vnp_OrderInfo=Thanh toan don hang:42&vnp_ReturnUrl=http://shop/return?x=1"
        );
        assert_eq!(
            encoded_query(&p),
            "vnp_OrderInfo=Thanh+toan+don+hang%3A42&vnp_ReturnUrl=http%3A%2F%2Fshop%2Freturn%3Fx%3D1"
        );
    }

    #[test]
    fn test_hmac_sha512_known_vector() {
        // RFC 4231 test case 2
        let digest = hmac_sha512_hex("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            digest,
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn test_signed_query_appends_signature() {
        let p = params(&[("vnp_Amount", "2500"), ("vnp_TxnRef", "abc")]);
        let query = signed_query(&p, "key").unwrap();
        let expected = hmac_sha512_hex("key", "vnp_Amount=2500&vnp_TxnRef=abc").unwrap();
        assert_eq!(
            query,
            format!("vnp_Amount=2500&vnp_TxnRef=abc&vnp_SecureHash={expected}")
        );
    }

    #[test]
    fn test_verify_ignores_hex_case_and_detects_tampering() {
        let mut p = params(&[("vnp_Amount", "2500"), ("vnp_TxnRef", "abc")]);
        let signature = hmac_sha512_hex("key", &raw_query(&p)).unwrap();

        assert!(verify(&p, "key", &signature).unwrap());
        assert!(verify(&p, "key", &signature.to_uppercase()).unwrap());
        assert!(!verify(&p, "other", &signature).unwrap());
        assert!(!verify(&p, "key", "zz").unwrap());

        p.insert("vnp_Amount".to_string(), "1".to_string());
        assert!(!verify(&p, "key", &signature).unwrap());
    }

    #[test]
    fn test_verify_rejects_non_hex_signature() {
        let p = params(&[("vnp_Amount", "2500"), ("vnp_TxnRef", "abc")]);
        let raw = raw_query(&p);

        // Pick a key whose digest has a byte with a zero high nibble.
        let (key, signature) = (0..100)
            .map(|i| format!("key{i}"))
            .map(|key| {
                let signature = hmac_sha512_hex(&key, &raw).unwrap();
                (key, signature)
            })
            .find(|(_, signature)| {
                signature.as_bytes().chunks(2).any(|pair| pair[0] == b'0')
            })
            .unwrap();

        let plus_signed: String = signature
            .as_bytes()
            .chunks(2)
            .map(|pair| match pair {
                [b'0', low] => format!("+{}", *low as char),
                _ => String::from_utf8_lossy(pair).into_owned(),
            })
            .collect();

        assert_ne!(plus_signed, signature);
        assert!(verify(&p, &key, &signature).unwrap());
        assert!(!verify(&p, &key, &plus_signed).unwrap());
    }
}
