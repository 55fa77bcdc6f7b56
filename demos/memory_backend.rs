//! Offline example using the in-memory backend
//!
//! Every client call runs against an in-process store, so no credentials or
//! network access are needed.
//!
//! Run with: cargo run --example memory_backend

use kodo_client::{Client, FopOptions, ListOptions, MemoryBackend, WriteOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let backend = MemoryBackend::new();
    let client = Client::builder("ak", "sk", "media", "http://cdn.example.com")
        .backend(backend.clone())
        .build()?;

    // Upload with a persistent operation attached
    let options = WriteOptions::new()
        .with_persistent_ops("transcode", "avthumb/mp4")
        .with_param("x:owner", "demo");
    let state = client
        .push("videos/intro.mov", bytes::Bytes::from_static(b"not really a movie"), true, options)
        .await?;
    println!("Stored {}: {}", state.key, serde_json::to_string_pretty(&state)?);

    for key in ["videos/outro.mov", "images/logo.png", "readme.txt"] {
        backend.insert("media", key, "placeholder");
    }

    let (keys, marker) = client.key_list("videos/", ListOptions::default()).await;
    println!("videos/: {:?} (marker {:?})", keys, marker);

    let (top, _) = client
        .key_list("", ListOptions::new().with_delimiter("/"))
        .await;
    println!("top level: {:?}", top);

    let id = client
        .fop("videos/outro.mov", "avthumb/mp4;vframe/jpg/offset/1", "transcode", FopOptions::default())
        .await?;
    let status = client.prefop(&id).await?;
    println!("job {}: {} ({} results)", status.id, status.desc, status.res.len());

    println!("signed: {}", client.url_for("readme.txt"));
    Ok(())
}
