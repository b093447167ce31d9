//! `ACS3-HMAC-SHA256` request signing for OpenAPI RPC calls.
//!
//! Signing is pure: the caller supplies the timestamp and nonce, so the
//! same inputs always yield the same `Authorization` header.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use urlencoding::encode;

use super::error::EssError;

type HmacSha256 = Hmac<Sha256>;

/// Signature algorithm name sent in the `Authorization` header.
pub(crate) const SIGNATURE_ALGORITHM: &str = "ACS3-HMAC-SHA256";

const METHOD: &str = "POST";
const CANONICAL_URI: &str = "/";

/// Inputs that vary per request.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RequestContext<'a> {
    pub(crate) host: &'a str,
    pub(crate) action: &'a str,
    pub(crate) version: &'a str,
    /// `x-acs-date`, formatted as `%Y-%m-%dT%H:%M:%SZ` in UTC.
    pub(crate) timestamp: &'a str,
    pub(crate) nonce: &'a str,
}

/// Query string and headers for one signed call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct SignedRequest {
    pub(crate) query: String,
    /// Headers to send, excluding `host` which the transport derives from
    /// the URL.
    pub(crate) headers: Vec<(&'static str, String)>,
}

pub(crate) struct RequestSigner<'a> {
    access_key_id: &'a str,
    access_key_secret: &'a str,
}

impl<'a> RequestSigner<'a> {
    pub(crate) const fn new(access_key_id: &'a str, access_key_secret: &'a str) -> Self {
        Self {
            access_key_id,
            access_key_secret,
        }
    }

    pub(crate) fn sign(
        &self,
        context: RequestContext<'_>,
        params: &BTreeMap<String, String>,
    ) -> Result<SignedRequest, EssError> {
        let query = canonical_query(params);
        let payload_hash = sha256_hex(b"");
        let signed: [(&'static str, &str); 6] = [
            ("host", context.host),
            ("x-acs-action", context.action),
            ("x-acs-content-sha256", payload_hash.as_str()),
            ("x-acs-date", context.timestamp),
            ("x-acs-signature-nonce", context.nonce),
            ("x-acs-version", context.version),
        ];

        let canonical_headers: String = signed
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();
        let signed_headers = signed
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{METHOD}\n{CANONICAL_URI}\n{query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
        );
        let string_to_sign = format!(
            "{SIGNATURE_ALGORITHM}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );
        let signature =
            hmac_sha256_hex(self.access_key_secret.as_bytes(), string_to_sign.as_bytes())?;
        let authorization = format!(
            "{SIGNATURE_ALGORITHM} Credential={},SignedHeaders={signed_headers},Signature={signature}",
            self.access_key_id
        );

        let mut headers: Vec<(&'static str, String)> = signed
            .iter()
            .filter(|(name, _)| *name != "host")
            .map(|(name, value)| (*name, (*value).to_owned()))
            .collect();
        headers.push(("authorization", authorization));
        Ok(SignedRequest { query, headers })
    }
}

/// Encodes parameters as a query string sorted by key. Keys and values are
/// RFC 3986 percent-encoded; only unreserved characters pass through.
pub(crate) fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub(crate) fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> Result<String, EssError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|err| EssError::Signing {
        message: err.to_string(),
    })?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
