//! HTTP implementation of the delegate managers

use crate::{
    auth::{Credentials, FORM_CONTENT_TYPE},
    config::{Config, Endpoints},
    managers::{BucketManager, FormUploader, OperationManager},
    types::*,
    ClientError, Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use bytes::Bytes;
use reqwest::{header, multipart, Client, Response};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::form_urlencoded;

/// Header carrying the backend request id
const REQUEST_ID_HEADER: &str = "X-Reqid";

/// Bucket, operation and upload managers over the Kodo HTTP API.
///
/// One instance backs all three traits and shares a single connection pool.
#[derive(Clone)]
pub struct HttpManagers {
    http: Client,
    credentials: Credentials,
    endpoints: Endpoints,
}

impl HttpManagers {
    /// Create managers for the hosts selected by `config`
    pub fn new(credentials: Credentials, config: &Config) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            config
                .user_agent
                .parse()
                .map_err(|_| ClientError::Config(format!("invalid user agent: {}", config.user_agent)))?,
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            http,
            credentials,
            endpoints: config.endpoints(),
        })
    }

    /// Resolved base URLs
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    // ==================== Helper Methods ====================

    /// Signed management request against `base`
    async fn management_request(
        &self,
        method: reqwest::Method,
        base: &str,
        path_and_query: &str,
        form: Option<String>,
    ) -> Result<Response> {
        let url = format!("{}{}", base, path_and_query);
        let body = form.unwrap_or_default();
        let authorization =
            self.credentials
                .authorization(path_and_query, Some(FORM_CONTENT_TYPE), body.as_bytes());

        debug!("Sending {} request to {}", method, url);
        let response = self
            .http
            .request(method, &url)
            .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(header::AUTHORIZATION, authorization)
            .body(body)
            .send()
            .await?;

        check_response(response).await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFilesRet {
    #[serde(default)]
    marker: String,
    #[serde(default)]
    common_prefixes: Vec<String>,
    #[serde(default)]
    items: Vec<ListItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PfopRet {
    persistent_id: String,
}

#[async_trait]
impl BucketManager for HttpManagers {
    #[instrument(skip(self))]
    async fn list_files(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        limit: usize,
    ) -> Result<ListPage> {
        // the serializer is not Send and must not live across an await
        let path = {
            let mut query = form_urlencoded::Serializer::new(String::new());
            query.append_pair("bucket", bucket);
            if !prefix.is_empty() {
                query.append_pair("prefix", prefix);
            }
            if !delimiter.is_empty() {
                query.append_pair("delimiter", delimiter);
            }
            if !marker.is_empty() {
                query.append_pair("marker", marker);
            }
            if limit > 0 {
                query.append_pair("limit", &limit.to_string());
            }
            format!("/list?{}", query.finish())
        };

        let response = self
            .management_request(reqwest::Method::POST, &self.endpoints.rsf, &path, None)
            .await?;
        let ret: ListFilesRet = response.json().await?;

        Ok(ListPage {
            items: ret.items,
            common_prefixes: ret.common_prefixes,
            has_next: !ret.marker.is_empty(),
            next_marker: ret.marker,
        })
    }

    #[instrument(skip(self))]
    async fn stat(&self, bucket: &str, key: &str) -> Result<FileInfo> {
        let path = format!("/stat/{}", encoded_entry(bucket, key));
        let response = self
            .management_request(reqwest::Method::POST, &self.endpoints.rs, &path, None)
            .await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl OperationManager for HttpManagers {
    #[instrument(skip(self))]
    async fn pfop(&self, request: &PfopRequest) -> Result<String> {
        let form = {
            let mut form = form_urlencoded::Serializer::new(String::new());
            form.append_pair("bucket", &request.bucket);
            form.append_pair("key", &request.key);
            form.append_pair("fops", &request.fops);
            if !request.notify_url.is_empty() {
                form.append_pair("notifyURL", &request.notify_url);
            }
            if request.force {
                form.append_pair("force", "1");
            }
            if !request.pipeline.is_empty() {
                form.append_pair("pipeline", &request.pipeline);
            }
            form.finish()
        };

        let response = self
            .management_request(reqwest::Method::POST, &self.endpoints.api, "/pfop/", Some(form))
            .await?;
        let ret: PfopRet = response.json().await?;
        Ok(ret.persistent_id)
    }

    #[instrument(skip(self))]
    async fn prefop(&self, persistent_id: &str) -> Result<PrefopRet> {
        let url = format!("{}/status/get/prefop", self.endpoints.api);

        debug!("Sending GET request to {}", url);
        let response = self
            .http
            .get(&url)
            .query(&[("id", persistent_id)])
            .send()
            .await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl FormUploader for HttpManagers {
    #[instrument(skip(self, upload_token, data, extra), fields(size = data.len()))]
    async fn put(
        &self,
        upload_token: &str,
        key: &str,
        data: Bytes,
        extra: &PutExtra,
    ) -> Result<serde_json::Value> {
        let up = self
            .endpoints
            .up
            .as_deref()
            .ok_or_else(|| ClientError::Config("zone has no upload hosts".to_string()))?;

        let mut form = multipart::Form::new()
            .text("token", upload_token.to_string())
            .text("key", key.to_string());

        for (name, value) in &extra.params {
            if name.starts_with("x:") && !value.is_empty() {
                form = form.text(name.clone(), value.clone());
            }
        }

        let mut file = multipart::Part::bytes(data.to_vec()).file_name(key.to_string());
        if let Some(mime) = &extra.mime_type {
            file = file.mime_str(mime)?;
        }
        form = form.part("file", file);

        let url = format!("{}/", up);
        debug!("Sending POST request to {}", url);
        let response = self.http.post(&url).multipart(form).send().await?;
        let response = check_response(response).await?;
        Ok(response.json().await?)
    }
}

/// `urlsafe_base64("bucket:key")`, the entry addressing used by management calls
pub fn encoded_entry(bucket: &str, key: &str) -> String {
    URL_SAFE.encode(format!("{}:{}", bucket, key))
}

async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = response.text().await.unwrap_or_default();
    Err(ClientError::from_response(&text, status.as_u16(), request_id))
}
