//! # Kodo Client
//!
//! A thin client for Kodo object storage.
//!
//! ## Features
//!
//! - **Uploads**: form uploads with signed, time-limited upload tokens,
//!   optional persistent operations and callbacks
//! - **Listing**: prefix listing with resumable markers
//! - **Signed URLs**: private download URLs valid for an hour
//! - **Persistent operations**: trigger processing jobs and query their status
//! - **Pluggable backend**: the bucket manager, operation manager and uploader
//!   are traits; [`MemoryBackend`] stands in for the real service in tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use kodo_client::{Client, Config, ListOptions, WriteOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Client::new(
//!         "access-key",
//!         "secret-key",
//!         "my-bucket",
//!         "http://cdn.example.com",
//!         Config::new().with_https(true),
//!     )?;
//!
//!     // Upload, replacing any existing object
//!     let state = client.push("hello.txt", &b"Hello, World!"[..], true, WriteOptions::default()).await?;
//!     println!("stored {} ({})", state.key, state.hash);
//!
//!     // List and sign
//!     let (keys, _marker) = client.key_list("hello", ListOptions::default()).await;
//!     for key in keys {
//!         println!("{}", client.url_for(&key));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
mod client;
pub mod config;
mod error;
pub mod etag;
pub mod http;
pub mod managers;
pub mod memory;
pub mod policy;
mod types;

pub use auth::Credentials;
pub use client::{default_client, init_default_client, Client, ClientBuilder, URL_EXPIRES_SECS};
pub use config::{Config, Endpoints, Settings, ZoneConf};
pub use error::{ClientError, Result, CODE_FILE_EXISTS, CODE_NO_SUCH_ENTRY};
pub use http::HttpManagers;
pub use managers::{BucketManager, FormUploader, OperationManager};
pub use memory::MemoryBackend;
pub use policy::PutPolicy;
pub use types::*;
