// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature schemes.
//!
//! * `twilio`: base64(HMAC-SHA1(secret, url + sorted form key/value pairs)).
//! * `hmac-sha256`: hex(HMAC-SHA256(secret, url + raw body)).
//!
//! Both are carried in the `X-Twilio-Signature` header. Comparison goes
//! through [`Mac::verify_slice`], which is constant time.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use courier_config::SignatureScheme;
use courier_core::CourierError;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// The string Twilio signs: the full URL followed by every form parameter,
/// sorted by name, as `name + value` with no separators.
fn twilio_signing_input(url: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();
    let mut input = String::from(url);
    for (key, value) in sorted {
        input.push_str(key);
        input.push_str(value);
    }
    input
}

fn twilio_mac(
    secret: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<HmacSha1, CourierError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| CourierError::Internal(format!("failed to initialize HMAC: {e}")))?;
    mac.update(twilio_signing_input(url, params).as_bytes());
    Ok(mac)
}

fn sha256_mac(secret: &str, url: &str, body: &[u8]) -> Result<HmacSha256, CourierError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CourierError::Internal(format!("failed to initialize HMAC: {e}")))?;
    mac.update(url.as_bytes());
    mac.update(body);
    Ok(mac)
}

/// Computes a `twilio` scheme signature.
pub fn twilio_signature(
    secret: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, CourierError> {
    let mac = twilio_mac(secret, url, params)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Computes an `hmac-sha256` scheme signature.
pub fn hmac_sha256_signature(secret: &str, url: &str, body: &[u8]) -> Result<String, CourierError> {
    let mac = sha256_mac(secret, url, body)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies `provided` against the signature of a webhook request.
///
/// `url` is the full URL the provider called, query string included, and
/// `body` the raw request body. Any mismatch or undecodable signature is
/// [`CourierError::AuthenticationFailed`].
pub fn verify_signature(
    scheme: SignatureScheme,
    secret: &str,
    url: &str,
    body: &[u8],
    provided: &str,
) -> Result<(), CourierError> {
    let provided = provided.trim();
    if provided.is_empty() {
        return Err(CourierError::AuthenticationFailed("missing signature".into()));
    }

    match scheme {
        SignatureScheme::Twilio => {
            let expected = STANDARD
                .decode(provided)
                .map_err(|_| CourierError::AuthenticationFailed("signature is not base64".into()))?;
            let params: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
                .map_err(|e| CourierError::MalformedPayload(format!("form body: {e}")))?;
            twilio_mac(secret, url, &params)?
                .verify_slice(&expected)
                .map_err(|_| CourierError::AuthenticationFailed("signature mismatch".into()))
        }
        SignatureScheme::HmacSha256 => {
            let expected = hex::decode(provided)
                .map_err(|_| CourierError::AuthenticationFailed("signature is not hex".into()))?;
            sha256_mac(secret, url, body)?
                .verify_slice(&expected)
                .map_err(|_| CourierError::AuthenticationFailed("signature mismatch".into()))
        }
    }
}
