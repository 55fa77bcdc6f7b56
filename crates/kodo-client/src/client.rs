//! Main client implementation

use crate::{
    auth::{self, Credentials},
    http::HttpManagers,
    managers::{BucketManager, FormUploader, OperationManager},
    policy::PutPolicy,
    types::*,
    ClientError, Config, Result,
};
use bytes::Bytes;
use std::sync::{Arc, OnceLock};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument, warn};

/// Lifetime of signed download URLs (seconds)
pub const URL_EXPIRES_SECS: i64 = 60 * 60;

/// Initial buffer size for `writer`; larger objects grow the buffer as they stream in
const READ_CHUNK_CAPACITY: u64 = 4 * 1024 * 1024;

static DEFAULT_CLIENT: OnceLock<Client> = OnceLock::new();

/// Kodo object storage client
///
/// Holds the credentials, target bucket and download domain, and forwards
/// every call to its bucket manager, operation manager and uploader. The
/// client is immutable once built and can be shared freely across tasks.
pub struct Client {
    credentials: Credentials,
    bucket: String,
    domain: String,
    config: Config,
    bucket_manager: Arc<dyn BucketManager>,
    operation_manager: Arc<dyn OperationManager>,
    uploader: Arc<dyn FormUploader>,
}

impl Client {
    /// Create a client talking to the hosts selected by `config`.
    ///
    /// No request is made; credentials and hosts are not validated here.
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        bucket: impl Into<String>,
        domain: impl Into<String>,
        config: Config,
    ) -> Result<Self> {
        Self::builder(access_key, secret_key, bucket, domain)
            .config(config)
            .build()
    }

    /// Start building a client, e.g. to inject substitute managers
    pub fn builder(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        bucket: impl Into<String>,
        domain: impl Into<String>,
    ) -> ClientBuilder {
        ClientBuilder {
            credentials: Credentials::new(access_key, secret_key),
            bucket: bucket.into(),
            domain: domain.into(),
            config: Config::default(),
            bucket_manager: None,
            operation_manager: None,
            uploader: None,
        }
    }

    /// Target bucket
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Default download domain
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    // ==================== Uploads ====================

    /// Write `fsize` bytes read from `reader` to `key`.
    ///
    /// With `overwrite` the upload token is bound to `key` and replaces an
    /// existing object; otherwise the token covers the whole bucket and the
    /// backend refuses to replace an existing key.
    #[instrument(skip(self, reader, options), fields(bucket = %self.bucket))]
    pub async fn writer<R>(
        &self,
        key: &str,
        mut reader: R,
        fsize: u64,
        overwrite: bool,
        options: WriteOptions,
    ) -> Result<State>
    where
        R: AsyncRead + Unpin + Send,
    {
        let policy = self.put_policy(key, overwrite, &options)?;

        // grow with the data actually read; `fsize` is only an upper bound here
        let mut data = Vec::with_capacity(fsize.min(READ_CHUNK_CAPACITY) as usize);
        (&mut reader).take(fsize).read_to_end(&mut data).await?;
        if data.len() as u64 != fsize {
            return Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("stream ended after {} of {} bytes", data.len(), fsize),
            )));
        }

        self.upload(key, Bytes::from(data), policy, options.extra_params).await
    }

    /// Write a byte buffer to `key`; see [`Client::writer`]
    #[instrument(skip(self, data, options), fields(bucket = %self.bucket))]
    pub async fn push(
        &self,
        key: &str,
        data: impl Into<Bytes> + Send,
        overwrite: bool,
        options: WriteOptions,
    ) -> Result<State> {
        let policy = self.put_policy(key, overwrite, &options)?;
        self.upload(key, data.into(), policy, options.extra_params).await
    }

    /// Build the put policy for a write; fails before any I/O on bad options
    fn put_policy(&self, key: &str, overwrite: bool, options: &WriteOptions) -> Result<PutPolicy> {
        let (pipeline, fops) = match (&options.pipeline, &options.fops) {
            (Some(pipeline), Some(fops)) => (pipeline.clone(), fops.clone()),
            (None, None) => (String::new(), String::new()),
            _ => return Err(ClientError::MissingFops),
        };

        let scope = if overwrite {
            format!("{}:{}", self.bucket, key)
        } else {
            self.bucket.clone()
        };

        let (return_body, callback_body) = match &options.return_body {
            Some(body) => (body.clone(), body.clone()),
            None => (DEFAULT_RETURN_BODY.to_string(), String::new()),
        };

        Ok(PutPolicy {
            scope,
            return_body,
            callback_body,
            callback_url: options.callback_url.clone().unwrap_or_default(),
            persistent_ops: fops,
            persistent_pipeline: pipeline,
            ..Default::default()
        })
    }

    async fn upload(
        &self,
        key: &str,
        data: Bytes,
        policy: PutPolicy,
        mut params: std::collections::HashMap<String, String>,
    ) -> Result<State> {
        params.insert(NAME_PARAM.to_string(), key.to_string());
        let extra = PutExtra {
            params,
            mime_type: None,
        };

        let token = policy.upload_token(&self.credentials)?;
        debug!(scope = %policy.scope, size = data.len(), "uploading");
        let ret = self.uploader.put(&token, key, data, &extra).await?;
        Ok(serde_json::from_value(ret)?)
    }

    // ==================== Listing ====================

    /// List keys under `prefix`.
    ///
    /// Returns the keys and a marker to resume from; the marker is empty once
    /// the listing is exhausted. When `max_keys` is reached the marker of the
    /// page *after* the current one is returned, so the rest of that page is
    /// skipped on resume.
    ///
    /// A backend error ends the listing early without being reported: the keys
    /// gathered so far come back together with the marker that failed, so the
    /// caller can retry from there.
    #[instrument(skip(self, options), fields(bucket = %self.bucket))]
    pub async fn key_list(&self, prefix: &str, options: ListOptions) -> (Vec<String>, String) {
        let ListOptions {
            max_keys,
            page_size,
            mut marker,
            delimiter,
        } = options;
        let max_keys = max_keys.unwrap_or(usize::MAX);
        let mut keys = Vec::new();
        if max_keys == 0 {
            return (keys, marker);
        }

        loop {
            let page = match self
                .bucket_manager
                .list_files(&self.bucket, prefix, &delimiter, &marker, page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, marker = %marker, collected = keys.len(), "listing stopped early");
                    return (keys, marker);
                }
            };

            for item in page.items {
                keys.push(item.key);
                if keys.len() >= max_keys {
                    return (keys, page.next_marker);
                }
            }

            if !page.has_next {
                return (keys, String::new());
            }
            marker = page.next_marker;
        }
    }

    /// Check whether `key` exists.
    ///
    /// Any failure, not only "not found", yields `false`.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn key_exist(&self, key: &str) -> bool {
        match self.bucket_manager.stat(&self.bucket, key).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "stat failed");
                false
            }
        }
    }

    // ==================== Download URLs ====================

    /// Signed download URL for `key` on the client's domain, valid for an hour
    pub fn url_for(&self, key: &str) -> String {
        self.key_url(&self.domain, key)
    }

    /// Signed download URL for `key` on `domain`, valid for an hour
    pub fn key_url(&self, domain: &str, key: &str) -> String {
        let deadline = chrono::Utc::now().timestamp() + URL_EXPIRES_SECS;
        auth::make_private_url(&self.credentials, domain, key, deadline)
    }

    // ==================== Persistent Operations ====================

    /// Run `fops` on `key` through `pipeline`; returns the persistent id
    #[instrument(skip(self, options), fields(bucket = %self.bucket))]
    pub async fn fop(
        &self,
        key: &str,
        fops: &str,
        pipeline: &str,
        options: FopOptions,
    ) -> Result<String> {
        let request = PfopRequest {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            fops: fops.to_string(),
            pipeline: pipeline.to_string(),
            notify_url: options.notify_url.unwrap_or_default(),
            force: options.force,
        };
        self.operation_manager.pfop(&request).await
    }

    /// Current status of a persistent operation job
    #[instrument(skip(self))]
    pub async fn prefop(&self, persistent_id: &str) -> Result<FopState> {
        let ret = self.operation_manager.prefop(persistent_id).await?;
        Ok(FopState::from(ret))
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    credentials: Credentials,
    bucket: String,
    domain: String,
    config: Config,
    bucket_manager: Option<Arc<dyn BucketManager>>,
    operation_manager: Option<Arc<dyn OperationManager>>,
    uploader: Option<Arc<dyn FormUploader>>,
}

impl ClientBuilder {
    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use a custom bucket manager
    pub fn bucket_manager(mut self, manager: Arc<dyn BucketManager>) -> Self {
        self.bucket_manager = Some(manager);
        self
    }

    /// Use a custom operation manager
    pub fn operation_manager(mut self, manager: Arc<dyn OperationManager>) -> Self {
        self.operation_manager = Some(manager);
        self
    }

    /// Use a custom uploader
    pub fn uploader(mut self, uploader: Arc<dyn FormUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Use one backend for all three managers
    pub fn backend<B>(self, backend: B) -> Self
    where
        B: BucketManager + OperationManager + FormUploader + 'static,
    {
        let backend = Arc::new(backend);
        self.bucket_manager(backend.clone())
            .operation_manager(backend.clone())
            .uploader(backend)
    }

    /// Build the client; managers not supplied talk HTTP
    pub fn build(self) -> Result<Client> {
        let (bucket_manager, operation_manager, uploader) =
            match (self.bucket_manager, self.operation_manager, self.uploader) {
                (Some(b), Some(o), Some(u)) => (b, o, u),
                (b, o, u) => {
                    let http = Arc::new(HttpManagers::new(self.credentials.clone(), &self.config)?);
                    (
                        b.unwrap_or_else(|| http.clone() as Arc<dyn BucketManager>),
                        o.unwrap_or_else(|| http.clone() as Arc<dyn OperationManager>),
                        u.unwrap_or_else(|| http as Arc<dyn FormUploader>),
                    )
                }
            };

        Ok(Client {
            credentials: self.credentials,
            bucket: self.bucket,
            domain: self.domain,
            config: self.config,
            bucket_manager,
            operation_manager,
            uploader,
        })
    }
}

/// Install the process-wide default client
pub fn init_default_client(
    access_key: impl Into<String>,
    secret_key: impl Into<String>,
    bucket: impl Into<String>,
    domain: impl Into<String>,
    config: Config,
) -> Result<&'static Client> {
    let client = Client::new(access_key, secret_key, bucket, domain, config)?;
    DEFAULT_CLIENT
        .set(client)
        .map_err(|_| ClientError::Config("default client already initialised".to_string()))?;
    DEFAULT_CLIENT
        .get()
        .ok_or_else(|| ClientError::Config("default client missing after init".to_string()))
}

/// The process-wide default client, if one was installed
pub fn default_client() -> Option<&'static Client> {
    DEFAULT_CLIENT.get()
}
