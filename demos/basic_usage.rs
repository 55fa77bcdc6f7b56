//! Basic usage example for the Kodo client
//!
//! This example demonstrates:
//! - Loading settings from `KODO_*` environment variables (or a `.env` file)
//! - Uploading objects with and without overwrite
//! - Listing keys with a resumable marker
//! - Signing download URLs
//! - Triggering a persistent operation and polling its status
//!
//! Run with: cargo run --example basic_usage

use kodo_client::{Client, FopOptions, ListOptions, Settings, WriteOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kodo_client=debug".parse()?))
        .init();

    println!("🚀 Kodo Storage - Basic Usage Example\n");

    // KODO_ACCESS_KEY, KODO_SECRET_KEY, KODO_BUCKET, KODO_DOMAIN
    let settings = Settings::from_env()?;
    let client = Client::new(
        settings.access_key.clone(),
        settings.secret_key.clone(),
        settings.bucket.clone(),
        settings.domain.clone(),
        settings.config(),
    )?;

    // ==================== Uploads ====================

    println!("📤 Uploading 'demo/hello.txt'...");
    let state = client
        .push("demo/hello.txt", &b"Hello, Kodo!"[..], true, WriteOptions::default())
        .await?;
    println!("   ✅ Stored {} ({} bytes, hash {})", state.key, state.fsize, state.hash);

    println!("\n📤 Uploading 'demo/hello.txt' again without overwrite...");
    match client
        .push("demo/hello.txt", &b"Hello again"[..], false, WriteOptions::default())
        .await
    {
        Ok(_) => println!("   ⚠️  Unexpectedly replaced"),
        Err(e) if e.is_file_exists() => println!("   ✅ Refused: {}", e),
        Err(e) => println!("   ⚠️  {}", e),
    }

    for i in 1..=3 {
        client
            .push(
                &format!("demo/file{}.txt", i),
                format!("Content of file {}", i).into_bytes(),
                true,
                WriteOptions::default(),
            )
            .await?;
    }
    println!("   ✅ Uploaded 3 additional files");

    // ==================== Listing ====================

    println!("\n📋 Listing keys with prefix 'demo/', two at a time...");
    let (keys, marker) = client
        .key_list("demo/", ListOptions::new().with_page_size(2).with_max_keys(2))
        .await;
    for key in &keys {
        println!("   - {}", key);
    }
    if !marker.is_empty() {
        let (rest, _) = client
            .key_list("demo/", ListOptions::new().with_marker(marker))
            .await;
        for key in &rest {
            println!("   - {} (resumed)", key);
        }
    }

    println!("\n🔍 'demo/missing.txt' exists: {}", client.key_exist("demo/missing.txt").await);

    // ==================== Download URLs ====================

    println!("\n🔗 Signed URL for 'demo/hello.txt':");
    println!("   {}", client.url_for("demo/hello.txt"));

    // ==================== Persistent Operations ====================

    if let Ok(pipeline) = std::env::var("KODO_PIPELINE") {
        println!("\n⚙️  Converting 'demo/hello.txt' to a QR code image...");
        let id = client
            .fop("demo/hello.txt", "qrcode/0", &pipeline, FopOptions::default())
            .await?;
        println!("   Persistent id: {}", id);

        let state = client.prefop(&id).await?;
        println!("   Status {}: {}", state.code, state.desc);
        for result in &state.res {
            println!("   - {} -> {} ({})", result.cmd, result.res_key, result.code);
        }
    }

    println!("\n✨ Done!");
    Ok(())
}
