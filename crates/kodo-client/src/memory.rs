//! In-memory backend for testing and offline use
//!
//! Implements all three manager traits over a sorted in-process map. Upload
//! tokens are decoded (not verified) so that scope and return body behave as
//! they do against a real backend.

use crate::{
    error::{CODE_FILE_EXISTS, CODE_NO_SUCH_ENTRY},
    etag,
    managers::{BucketManager, FormUploader, OperationManager},
    policy::PutPolicy,
    types::*,
    ClientError, Result,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

/// Return body the backend falls back to when a policy carries none
const BACKEND_RETURN_BODY: &str = r#"{"hash":"$(etag)","key":"$(key)"}"#;

/// Description of a job whose commands all succeeded
const FOP_DONE: &str = "The fop was completed successfully";

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    hash: String,
    mime_type: String,
    put_time: i64,
}

#[derive(Default)]
struct Inner {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    jobs: HashMap<String, PrefopRet>,
    job_seq: u64,
}

/// An in-memory object store
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBackend {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly, bypassing upload tokens
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let object = stored(data.into(), None);
        self.inner
            .write()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
    }

    /// Contents of an object
    pub fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.inner
            .read()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.data.clone())
    }

    /// Number of objects in a bucket
    pub fn len(&self, bucket: &str) -> usize {
        self.inner
            .read()
            .buckets
            .get(bucket)
            .map_or(0, |objects| objects.len())
    }

    /// Check if a bucket holds no objects
    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }

    /// Replace the recorded status of a job, e.g. to simulate a failure
    pub fn set_job_status(&self, status: PrefopRet) {
        self.inner.write().jobs.insert(status.id.clone(), status);
    }

    fn submit_job(&self, inner: &mut Inner, request: &PfopRequest) -> String {
        inner.job_seq += 1;
        let id = format!("z0.{:016x}", inner.job_seq);

        let items = request
            .fops
            .split(';')
            .filter(|cmd| !cmd.is_empty())
            .enumerate()
            .map(|(i, cmd)| PrefopItem {
                cmd: cmd.to_string(),
                code: 0,
                desc: FOP_DONE.to_string(),
                key: format!("{}.{}", request.key, i),
                ..Default::default()
            })
            .collect();

        inner.jobs.insert(
            id.clone(),
            PrefopRet {
                id: id.clone(),
                code: 0,
                desc: FOP_DONE.to_string(),
                input_key: request.key.clone(),
                input_bucket: request.bucket.clone(),
                pipeline: request.pipeline.clone(),
                items,
            },
        );
        id
    }
}

fn stored(data: Bytes, mime_type: Option<&str>) -> StoredObject {
    StoredObject {
        hash: etag::compute(&data),
        mime_type: mime_type.unwrap_or("application/octet-stream").to_string(),
        put_time: chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() / 100,
        data,
    }
}

fn api_error(code: u16, message: &str) -> ClientError {
    ClientError::Api {
        code,
        message: message.to_string(),
        request_id: None,
    }
}

/// Substitute `$(name)` variables of a return body template
fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("$(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find(')') {
            Some(end) => {
                let value = vars.get(&after[..end]).map(String::as_str).unwrap_or("");
                // escape for the JSON string the variable usually sits in
                let quoted = serde_json::Value::String(value.to_string()).to_string();
                out.push_str(&quoted[1..quoted.len() - 1]);
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[async_trait]
impl BucketManager for MemoryBackend {
    async fn list_files(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: &str,
        limit: usize,
    ) -> Result<ListPage> {
        let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
        let start = if marker.is_empty() {
            Bound::Unbounded
        } else {
            let raw = URL_SAFE_NO_PAD
                .decode(marker)
                .map_err(|_| api_error(400, "invalid marker"))?;
            let key = String::from_utf8(raw).map_err(|_| api_error(400, "invalid marker"))?;
            Bound::Excluded(key)
        };

        let inner = self.inner.read();
        let Some(objects) = inner.buckets.get(bucket) else {
            return Err(api_error(631, "no such bucket"));
        };

        let mut page = ListPage::default();
        let mut last_key: Option<&str> = None;
        let mut candidates = objects
            .range::<String, _>((start, Bound::Unbounded))
            .filter(|(key, _)| key.starts_with(prefix))
            .peekable();

        loop {
            if page.items.len() + page.common_prefixes.len() >= limit {
                break;
            }
            let Some((key, object)) = candidates.next() else {
                break;
            };
            last_key = Some(key.as_str());

            let grouped = if delimiter.is_empty() {
                None
            } else {
                key[prefix.len()..]
                    .find(delimiter)
                    .map(|pos| key[..prefix.len() + pos + delimiter.len()].to_string())
            };

            match grouped {
                Some(common) => {
                    // swallow the rest of the group so it counts once
                    while let Some(&(next, _)) = candidates.peek() {
                        if !next.starts_with(&common) {
                            break;
                        }
                        last_key = Some(next.as_str());
                        candidates.next();
                    }
                    page.common_prefixes.push(common);
                }
                None => page.items.push(ListItem {
                    key: key.clone(),
                    hash: object.hash.clone(),
                    fsize: object.data.len() as i64,
                    mime_type: object.mime_type.clone(),
                    put_time: object.put_time,
                    storage_type: 0,
                }),
            }
        }

        page.has_next = candidates.peek().is_some();
        if page.has_next {
            if let Some(key) = last_key {
                page.next_marker = URL_SAFE_NO_PAD.encode(key);
            }
        }
        Ok(page)
    }

    async fn stat(&self, bucket: &str, key: &str) -> Result<FileInfo> {
        let inner = self.inner.read();
        inner
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| FileInfo {
                hash: object.hash.clone(),
                fsize: object.data.len() as i64,
                mime_type: object.mime_type.clone(),
                put_time: object.put_time,
                storage_type: 0,
            })
            .ok_or_else(|| api_error(CODE_NO_SUCH_ENTRY, "no such file or directory"))
    }
}

#[async_trait]
impl OperationManager for MemoryBackend {
    async fn pfop(&self, request: &PfopRequest) -> Result<String> {
        let mut inner = self.inner.write();
        let exists = inner
            .buckets
            .get(&request.bucket)
            .is_some_and(|objects| objects.contains_key(&request.key));
        if !exists {
            return Err(api_error(CODE_NO_SUCH_ENTRY, "no such file or directory"));
        }
        if request.fops.is_empty() {
            return Err(api_error(400, "invalid fops"));
        }
        Ok(self.submit_job(&mut inner, request))
    }

    async fn prefop(&self, persistent_id: &str) -> Result<PrefopRet> {
        self.inner
            .read()
            .jobs
            .get(persistent_id)
            .cloned()
            .ok_or_else(|| api_error(CODE_NO_SUCH_ENTRY, "no such persistent id"))
    }
}

#[async_trait]
impl FormUploader for MemoryBackend {
    async fn put(
        &self,
        upload_token: &str,
        key: &str,
        data: Bytes,
        extra: &PutExtra,
    ) -> Result<serde_json::Value> {
        let policy = PutPolicy::decode_token(upload_token).map_err(|_| api_error(401, "bad token"))?;
        if (policy.deadline as i64) < chrono::Utc::now().timestamp() {
            return Err(api_error(401, "token out of date"));
        }
        if let Some(scoped) = policy.key() {
            if scoped != key {
                return Err(api_error(403, "key doesn't match with scope"));
            }
        }

        let bucket = policy.bucket().to_string();
        let object = stored(data, extra.mime_type.as_deref());
        let mut vars: HashMap<String, String> = extra
            .params
            .iter()
            .filter(|(name, _)| name.starts_with("x:"))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        vars.insert("key".to_string(), key.to_string());
        vars.insert("etag".to_string(), object.hash.clone());
        vars.insert("fsize".to_string(), object.data.len().to_string());
        vars.insert("bucket".to_string(), bucket.clone());
        vars.insert("mimeType".to_string(), object.mime_type.clone());

        let mut inner = self.inner.write();
        let objects = inner.buckets.entry(bucket.clone()).or_default();
        if policy.key().is_none() && objects.contains_key(key) {
            return Err(api_error(CODE_FILE_EXISTS, "file exists"));
        }
        objects.insert(key.to_string(), object);

        if !policy.persistent_ops.is_empty() {
            let request = PfopRequest {
                bucket,
                key: key.to_string(),
                fops: policy.persistent_ops.clone(),
                pipeline: policy.persistent_pipeline.clone(),
                notify_url: String::new(),
                force: true,
            };
            let id = self.submit_job(&mut inner, &request);
            vars.insert("persistentId".to_string(), id);
        }

        let template = if policy.return_body.is_empty() {
            BACKEND_RETURN_BODY
        } else {
            &policy.return_body
        };
        Ok(serde_json::from_str(&render_template(template, &vars))?)
    }
}
