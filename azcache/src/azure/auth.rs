//! Shared Key request signing for the Blob service.
//!
//! The signature is base64(HMAC-SHA256(account key, string-to-sign)) where the
//! string-to-sign is the verb, eleven standard headers, the canonicalized
//! `x-ms-*` headers and the canonicalized resource, newline separated.
use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::header::{self, HeaderMap};
use reqwest::Method;
use sha2::Sha256;
use url::Url;

use crate::CacheError;

type HmacSha256 = Hmac<Sha256>;

/// Headers that take part in the signature, in signing order. `Date` is
/// always sent as `x-ms-date` so its slot stays empty.
const SIGNED_HEADERS: [&str; 11] = [
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
    "range",
];

#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Vec<u8>,
}

impl SharedKeyCredential {
    /// Decode the base64 account key. An undecodable key means the client can
    /// never authenticate, so it is reported as a connection failure.
    pub fn new(account: &str, key: &str) -> Result<Self, CacheError> {
        let key = STANDARD.decode(key.trim()).map_err(|e| {
            CacheError::Connection(format!("account key is not valid base64: {e}"))
        })?;
        if key.is_empty() {
            return Err(CacheError::Connection("account key is empty".into()));
        }
        Ok(Self {
            account: account.to_string(),
            key,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn sign(&self, string_to_sign: &str) -> Result<String, CacheError> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| {
            CacheError::Connection(format!("HMAC key error: {e}"))
        })?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Value for the `Authorization` header of a request.
    pub fn authorization(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<String, CacheError> {
        let string_to_sign = string_to_sign(&self.account, method, url, headers);
        let signature = self.sign(&string_to_sign)?;
        Ok(format!("SharedKey {}:{}", self.account, signature))
    }
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

pub fn string_to_sign(
    account: &str,
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
) -> String {
    let mut parts = Vec::with_capacity(SIGNED_HEADERS.len() + 3);
    parts.push(method.as_str().to_string());

    for name in SIGNED_HEADERS {
        let value = headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        // a zero Content-Length is signed as empty
        if name == header::CONTENT_LENGTH.as_str() && value == "0" {
            parts.push(String::new());
        } else {
            parts.push(value.to_string());
        }
    }

    parts.push(canonicalized_headers(headers));
    parts.push(canonicalized_resource(account, url));
    parts.join("\n")
}

/// `x-ms-*` headers, lower-cased and sorted, one `name:value` per line.
/// The trailing newline is supplied by the join in [`string_to_sign`].
fn canonicalized_headers(headers: &HeaderMap) -> String {
    let mut ms_headers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers {
        let name = name.as_str();
        if !name.starts_with("x-ms-") {
            continue;
        }
        if let Ok(value) = value.to_str() {
            ms_headers.entry(name).or_default().push(value.trim());
        }
    }

    ms_headers
        .into_iter()
        .map(|(name, values)| format!("{name}:{}", values.join(",")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn canonicalized_resource(account: &str, url: &Url) -> String {
    let mut resource = format!("/{account}{}", url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        resource.push('\n');
        resource.push_str(&name);
        resource.push(':');
        resource.push_str(&values.join(","));
    }
    resource
}
