//! Manual smoke test against a real storage account (or Azurite).
//!
//! Uploads a file, downloads it back, compares, deletes it and checks that
//! the key is gone.
//!
//! ```text
//! cargo run --example smoke -- [--config azcache.yml] [--container cache] in.png [out.png]
//! ```
//!
//! Without `--config`, credentials come from `AZURESTORAGE_ACCOUNT_NAME` and
//! `AZURESTORAGE_ACCESS_KEY` (a `.env` file is honoured).
use anyhow::{bail, Context};
use azcache::config::{ConfigFile, Configurable};
use azcache::{BlobCache, CacheConfig, ResponseCache};
use clap::Parser;
use std::path::PathBuf;

const KEY: &str = "mykey";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML file with an `azure:` section
    #[arg(long)]
    config: Option<PathBuf>,

    /// Container to use instead of the configured one
    #[arg(long)]
    container: Option<String>,

    /// File to upload
    input: PathBuf,

    /// Where to write the downloaded copy
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let mut config = match &args.config {
        Some(path) => CacheConfig::from_config(ConfigFile::open(path)?.config())?,
        None => CacheConfig::from_env()?,
    };
    if let Some(container) = args.container {
        azcache::config::validate_container_name(&container)?;
        config.container_name = container;
    }

    println!("***** CREATION *****");
    let cache = BlobCache::new(config).await?;
    println!("Container has been created: {}", cache.container_created());

    let payload = std::fs::read(&args.input)
        .with_context(|| format!("read {}", args.input.display()))?;

    println!("***** SET *****");
    cache.try_set(KEY, &payload).await?;

    println!("***** GET *****");
    let Some(downloaded) = cache.get(KEY).await else {
        bail!("got nothing back after upload");
    };
    if downloaded != payload {
        bail!(
            "downloaded {} bytes, uploaded {}",
            downloaded.len(),
            payload.len()
        );
    }
    if let Some(output) = &args.output {
        std::fs::write(output, &downloaded)
            .with_context(|| format!("write {}", output.display()))?;
    }

    println!("***** DELETE *****");
    println!("Blob existed: {}", cache.delete(KEY).await);

    println!("***** CHECK-DELETE *****");
    if cache.get(KEY).await.is_some() {
        bail!("{KEY} is still present after delete");
    }
    println!("File correctly deleted");
    Ok(())
}
