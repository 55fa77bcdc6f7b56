//! Credentials and request signing
//!
//! Every signature is `access_key:urlsafe_base64(hmac_sha1(secret_key, data))`.
//! What `data` is depends on the use:
//! - management requests sign `path?query\n` plus the form body
//! - upload tokens sign the base64-encoded put policy
//! - private download URLs sign the URL including its `e=` deadline

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use sha1::Sha1;
use std::fmt;

type HmacSha1 = Hmac<Sha1>;

/// Bytes escaped in the key part of a download URL.
///
/// `/` and dot segments pass through untouched so the path names the key
/// verbatim; `%` is escaped so a key is never decoded into another one.
const KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'[')
    .add(b']')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Content type whose body takes part in the management signature
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Access key / secret key pair
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    /// Create credentials from an access key and a secret key
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// The public half of the pair
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Sign arbitrary data
    pub fn sign(&self, data: &[u8]) -> String {
        format!("{}:{}", self.access_key, URL_SAFE.encode(self.digest(data)))
    }

    /// Sign the base64 encoding of `data` and append the encoding
    pub fn sign_with_data(&self, data: &[u8]) -> String {
        let encoded = URL_SAFE.encode(data);
        format!("{}:{}", self.sign(encoded.as_bytes()), encoded)
    }

    /// Signature for a management request.
    ///
    /// `path_and_query` is the request target without scheme and host. The body
    /// only takes part when it is a url-encoded form.
    pub fn sign_request(&self, path_and_query: &str, content_type: Option<&str>, body: &[u8]) -> String {
        let mut data = Vec::with_capacity(path_and_query.len() + 1 + body.len());
        data.extend_from_slice(path_and_query.as_bytes());
        data.push(b'\n');
        if content_type == Some(FORM_CONTENT_TYPE) && !body.is_empty() {
            data.extend_from_slice(body);
        }
        self.sign(&data)
    }

    /// Value of the `Authorization` header for a management request
    pub fn authorization(&self, path_and_query: &str, content_type: Option<&str>, body: &[u8]) -> String {
        format!("QBox {}", self.sign_request(path_and_query, content_type, body))
    }

    /// Verify a signature produced by [`Credentials::sign`]
    pub fn verify(&self, data: &[u8], signature: &str) -> bool {
        let Some((access_key, encoded)) = signature.split_once(':') else {
            return false;
        };
        if access_key != self.access_key {
            return false;
        }
        let Ok(raw) = URL_SAFE.decode(encoded) else {
            return false;
        };

        let mut mac = self.mac();
        mac.update(data);
        mac.verify_slice(&raw).is_ok()
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    /// HMAC keyed with the secret key.
    ///
    /// HMAC hashes or pads keys of any length, so `new_from_slice` cannot fail
    /// for `Hmac<Sha1>`; only fixed-key MACs reject a length.
    fn mac(&self) -> HmacSha1 {
        HmacSha1::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC accepts keys of any length")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Public URL for `key` under `domain`.
///
/// The key is escaped, never normalised: `a/../b` stays three segments. A `?`
/// starts a processing query (`a.jpg?imageView2/...`) that is kept as given.
pub fn make_public_url(domain: &str, key: &str) -> String {
    let (path, query) = match key.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (key, None),
    };

    let mut url = format!(
        "{}/{}",
        domain.trim_end_matches('/'),
        utf8_percent_encode(path, KEY_ENCODE_SET)
    );
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Private, time-limited download URL for `key` under `domain`
pub fn make_private_url(credentials: &Credentials, domain: &str, key: &str, deadline: i64) -> String {
    let public_url = make_public_url(domain, key);
    let separator = if public_url.contains('?') { '&' } else { '?' };
    let url_to_sign = format!("{}{}e={}", public_url, separator, deadline);
    let token = credentials.sign(url_to_sign.as_bytes());
    format!("{}&token={}", url_to_sign, token)
}
