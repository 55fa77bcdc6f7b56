//! Upload put policy and upload tokens

use crate::auth::Credentials;
use crate::{ClientError, Result};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde::{Deserialize, Serialize};

/// Lifetime of an upload token when none is given (seconds)
pub const DEFAULT_TOKEN_EXPIRES: u64 = 3600;

/// Upload authorization policy
///
/// Serialized to JSON, base64-encoded and signed to form an upload token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutPolicy {
    /// `bucket` or `bucket:key`
    pub scope: String,
    /// Unix timestamp after which the token is rejected
    pub deadline: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub return_body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub persistent_ops: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub persistent_pipeline: String,
}

impl PutPolicy {
    /// Policy for `scope` with the default lifetime
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..Default::default()
        }
    }

    /// Bucket part of the scope
    pub fn bucket(&self) -> &str {
        self.scope.split_once(':').map_or(&self.scope, |(bucket, _)| bucket)
    }

    /// Key the scope is bound to, if any
    pub fn key(&self) -> Option<&str> {
        self.scope.split_once(':').map(|(_, key)| key)
    }

    /// Sign the policy into an upload token valid for `expires` seconds from now
    pub fn upload_token_with_expires(&self, credentials: &Credentials, expires: u64) -> Result<String> {
        let mut policy = self.clone();
        if policy.deadline == 0 {
            policy.deadline = chrono::Utc::now().timestamp() as u64 + expires;
        }
        let json = serde_json::to_vec(&policy)?;
        Ok(credentials.sign_with_data(&json))
    }

    /// Sign the policy into an upload token valid for an hour
    pub fn upload_token(&self, credentials: &Credentials) -> Result<String> {
        self.upload_token_with_expires(credentials, DEFAULT_TOKEN_EXPIRES)
    }

    /// Recover the policy carried by an upload token.
    ///
    /// Only the layout is checked; verifying the signature needs the secret key.
    pub fn decode_token(token: &str) -> Result<Self> {
        let mut parts = token.splitn(3, ':');
        let (Some(_), Some(_), Some(encoded)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ClientError::InvalidToken("expected access_key:sign:policy".to_string()));
        };
        let json = URL_SAFE
            .decode(encoded)
            .map_err(|e| ClientError::InvalidToken(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}
