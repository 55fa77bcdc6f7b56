//! Common types for the client

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Return body used when the caller does not supply one.
///
/// Callback consumers parse this exact shape; do not reformat it.
pub const DEFAULT_RETURN_BODY: &str =
    r#"{"key":"$(key)","hash":"$(etag)","fsize":"$(fsize)","bucket":"$(bucket)","name":"$(x:name)"}"#;

/// Extra parameter the destination key is echoed through
pub const NAME_PARAM: &str = "x:name";

/// Default page size of a list request
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Outcome of an upload, as echoed back by the return body
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub fsize: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub name: String,
}

/// Status of a persistent operation job
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FopState {
    pub id: String,
    pub code: i32,
    pub desc: String,
    pub res: Vec<FopResult>,
}

/// Result of one command inside a persistent operation job
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FopResult {
    pub code: i32,
    pub desc: String,
    pub res_key: String,
    pub cmd: String,
    pub err: String,
}

impl FopState {
    /// Job finished and every command succeeded
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Job is still queued or running
    pub fn is_pending(&self) -> bool {
        self.code == 1 || self.code == 2
    }
}

/// One entry of a list page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub key: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub fsize: i64,
    #[serde(default)]
    pub mime_type: String,
    /// Upload time in units of 100ns
    #[serde(default)]
    pub put_time: i64,
    /// Storage class
    #[serde(default, rename = "type")]
    pub storage_type: i32,
}

/// One page of a listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<ListItem>,
    pub common_prefixes: Vec<String>,
    /// Marker of the following page; empty on the last page
    pub next_marker: String,
    pub has_next: bool,
}

/// Object metadata returned by a stat call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub fsize: i64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub put_time: i64,
    #[serde(default, rename = "type")]
    pub storage_type: i32,
}

/// Raw job status as reported by the backend
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefopRet {
    pub id: String,
    pub code: i32,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub input_key: String,
    #[serde(default)]
    pub input_bucket: String,
    #[serde(default)]
    pub pipeline: String,
    #[serde(default)]
    pub items: Vec<PrefopItem>,
}

/// Raw status of one command of a job
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefopItem {
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub key: String,
}

impl From<PrefopRet> for FopState {
    fn from(ret: PrefopRet) -> Self {
        Self {
            id: ret.id,
            code: ret.code,
            desc: ret.desc,
            res: ret
                .items
                .into_iter()
                .map(|item| FopResult {
                    code: item.code,
                    desc: item.desc,
                    res_key: item.key,
                    cmd: item.cmd,
                    err: item.error,
                })
                .collect(),
        }
    }
}

/// Persistent operation request handed to the operation manager
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PfopRequest {
    pub bucket: String,
    pub key: String,
    pub fops: String,
    pub pipeline: String,
    pub notify_url: String,
    pub force: bool,
}

/// Extra form fields sent with an upload
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutExtra {
    /// User variables; only `x:`-prefixed, non-empty entries are sent
    pub params: HashMap<String, String>,
    pub mime_type: Option<String>,
}

/// Optional settings of a write
#[derive(Clone, Debug, Default)]
pub struct WriteOptions {
    /// Processing queue the persistent operations run on
    pub pipeline: Option<String>,
    /// Persistent operations to run after upload, `;`-separated
    pub fops: Option<String>,
    /// User variables, e.g. `x:owner`
    pub extra_params: HashMap<String, String>,
    /// Custom return body; also used as the callback body
    pub return_body: Option<String>,
    /// Callback URL the backend posts the upload result to
    pub callback_url: Option<String>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fops` on `pipeline` after the upload
    pub fn with_persistent_ops(mut self, pipeline: impl Into<String>, fops: impl Into<String>) -> Self {
        self.pipeline = Some(pipeline.into());
        self.fops = Some(fops.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.insert(key.into(), value.into());
        self
    }

    pub fn with_return_body(mut self, body: impl Into<String>) -> Self {
        self.return_body = Some(body.into());
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }
}

/// Optional settings of a listing
#[derive(Clone, Debug)]
pub struct ListOptions {
    /// Stop once this many keys are collected; `None` lists everything
    pub max_keys: Option<usize>,
    /// Keys requested per page
    pub page_size: usize,
    /// Resume from this marker
    pub marker: String,
    /// Group keys sharing a prefix up to this delimiter
    pub delimiter: String,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            max_keys: None,
            page_size: DEFAULT_PAGE_SIZE,
            marker: String::new(),
            delimiter: String::new(),
        }
    }
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }
}

/// Optional settings of a persistent operation trigger
#[derive(Clone, Debug)]
pub struct FopOptions {
    /// URL notified when the job finishes
    pub notify_url: Option<String>,
    /// Re-run even if an identical job already ran
    pub force: bool,
}

impl Default for FopOptions {
    fn default() -> Self {
        Self {
            notify_url: None,
            force: true,
        }
    }
}

impl FopOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = Some(url.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}
