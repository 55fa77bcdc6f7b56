//! End-to-end client tests over the in-memory backend
//!
//! Run with: cargo test --test client_tests

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use kodo_client::{
    etag, Client, ClientError, FopOptions, ListOptions, MemoryBackend, PrefopItem, PrefopRet,
    WriteOptions,
};

const BUCKET: &str = "media";
const DOMAIN: &str = "http://cdn.example.com";

fn setup() -> (Client, MemoryBackend) {
    let backend = MemoryBackend::new();
    let client = Client::builder("ak", "sk", BUCKET, DOMAIN)
        .backend(backend.clone())
        .build()
        .unwrap();
    (client, backend)
}

#[tokio::test]
async fn test_upload_round_trip() {
    let (client, backend) = setup();

    let state = client
        .push("docs/readme.md", &b"# Hello"[..], false, WriteOptions::default())
        .await
        .unwrap();

    assert_eq!(state.key, "docs/readme.md");
    assert_eq!(state.name, "docs/readme.md");
    assert_eq!(state.bucket, BUCKET);
    assert_eq!(state.fsize, "7");
    assert_eq!(state.hash, etag::compute(b"# Hello"));
    assert_eq!(backend.get(BUCKET, "docs/readme.md").unwrap().as_ref(), b"# Hello");
    assert!(client.key_exist("docs/readme.md").await);
}

#[tokio::test]
async fn test_overwrite_controls_replacement() {
    let (client, backend) = setup();
    backend.insert(BUCKET, "a.txt", "old");

    let err = client
        .push("a.txt", &b"new"[..], false, WriteOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_file_exists());
    assert_eq!(backend.get(BUCKET, "a.txt").unwrap().as_ref(), b"old");

    client
        .push("a.txt", &b"new"[..], true, WriteOptions::default())
        .await
        .unwrap();
    assert_eq!(backend.get(BUCKET, "a.txt").unwrap().as_ref(), b"new");
}

#[tokio::test]
async fn test_writer_streams_exact_size() {
    let (client, backend) = setup();
    let payload = b"0123456789abcdef";

    // only the first `fsize` bytes are uploaded
    let state = client
        .writer("partial.bin", &payload[..], 10, true, WriteOptions::default())
        .await
        .unwrap();
    assert_eq!(state.fsize, "10");
    assert_eq!(backend.get(BUCKET, "partial.bin").unwrap().as_ref(), b"0123456789");

    let err = client
        .writer("short.bin", &payload[..], 64, true, WriteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
    assert!(backend.get(BUCKET, "short.bin").is_none());
}

#[tokio::test]
async fn test_upload_with_persistent_ops() {
    let (client, _backend) = setup();

    let options = WriteOptions::new()
        .with_persistent_ops("transcode", "avthumb/mp4;vframe/jpg/offset/1")
        .with_return_body(r#"{"key":"$(key)","persistentId":"$(persistentId)"}"#);
    let state = client
        .push("clip.mov", &b"movie"[..], true, options)
        .await
        .unwrap();
    // fields missing from a custom return body come back empty
    assert_eq!(state.key, "clip.mov");
    assert!(state.hash.is_empty());
    assert!(state.name.is_empty());

    let options = WriteOptions::new().with_persistent_ops("transcode", "avthumb/mp4");
    client
        .push("clip2.mov", &b"movie"[..], true, options)
        .await
        .unwrap();

    let id = client
        .fop("clip2.mov", "avthumb/mp4;vframe/jpg/offset/1", "transcode", FopOptions::default())
        .await
        .unwrap();
    let state = client.prefop(&id).await.unwrap();
    assert!(state.is_success());
    assert_eq!(state.res.len(), 2);
    assert_eq!(state.res[1].cmd, "vframe/jpg/offset/1");
}

#[tokio::test]
async fn test_pipeline_without_fops_rejected() {
    let (client, backend) = setup();

    let mut options = WriteOptions::new();
    options.pipeline = Some("transcode".to_string());
    let err = client
        .push("a.txt", &b"data"[..], true, options)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::MissingFops));
    assert!(backend.is_empty(BUCKET));
}

#[tokio::test]
async fn test_key_list_pages_and_resumes() {
    let (client, backend) = setup();
    for i in 0..7 {
        backend.insert(BUCKET, &format!("logs/{:02}", i), "x");
    }
    backend.insert(BUCKET, "other", "x");

    let (keys, marker) = client
        .key_list("logs/", ListOptions::new().with_page_size(3).with_max_keys(4))
        .await;
    assert_eq!(keys, vec!["logs/00", "logs/01", "logs/02", "logs/03"]);
    // the marker points past the second page, so logs/04 and logs/05 are skipped
    assert_eq!(marker, URL_SAFE.encode("logs/05").trim_end_matches('='));

    let (rest, marker) = client
        .key_list("logs/", ListOptions::new().with_page_size(3).with_marker(marker))
        .await;
    assert_eq!(rest, vec!["logs/06"]);
    assert!(marker.is_empty());
}

#[tokio::test]
async fn test_key_list_with_delimiter() {
    let (client, backend) = setup();
    for key in ["a/1", "a/2", "b/1", "top.txt"] {
        backend.insert(BUCKET, key, "x");
    }

    let (keys, marker) = client
        .key_list("", ListOptions::new().with_delimiter("/"))
        .await;
    assert_eq!(keys, vec!["top.txt"]);
    assert!(marker.is_empty());
}

#[tokio::test]
async fn test_key_list_unknown_bucket_is_empty() {
    let backend = MemoryBackend::new();
    let client = Client::builder("ak", "sk", "missing", DOMAIN)
        .backend(backend)
        .build()
        .unwrap();

    let (keys, marker) = client.key_list("", ListOptions::default()).await;
    assert!(keys.is_empty());
    assert!(marker.is_empty());
    assert!(!client.key_exist("anything").await);
}

#[tokio::test]
async fn test_failed_job_status() {
    let (client, backend) = setup();
    backend.insert(BUCKET, "clip.mov", "movie");

    let id = client
        .fop("clip.mov", "avthumb/mp4", "transcode", FopOptions::default())
        .await
        .unwrap();
    backend.set_job_status(PrefopRet {
        id: id.clone(),
        code: 3,
        desc: "The fop is failed".to_string(),
        input_key: "clip.mov".to_string(),
        input_bucket: BUCKET.to_string(),
        pipeline: "transcode".to_string(),
        items: vec![PrefopItem {
            cmd: "avthumb/mp4".to_string(),
            code: 3,
            error: "unsupported codec".to_string(),
            ..Default::default()
        }],
    });

    let state = client.prefop(&id).await.unwrap();
    assert!(!state.is_success());
    assert!(!state.is_pending());
    assert_eq!(state.res[0].err, "unsupported codec");

    let err = client
        .fop("missing.mov", "avthumb/mp4", "transcode", FopOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test_log::test]
fn test_signed_urls() {
    let (client, _backend) = setup();

    let url = client.url_for("docs/a b.txt");
    assert!(url.starts_with("http://cdn.example.com/docs/a%20b.txt?e="));
    assert!(url.contains("&token=ak:"));

    let other = client.key_url("https://img.example.com", "x.png");
    assert!(other.starts_with("https://img.example.com/x.png?e="));
}
