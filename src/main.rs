//! bsonjson command-line tool
//!
//! Converts BSON streams to tagged JSON and back, filters embedded
//! `Content` payloads, and runs the fetch pipeline that combines both.
//!
//! # Usage
//!
//! ```bash
//! bsonjson to-json -f store.bson -o store.json -v
//! bsonjson filter -f store.json pet
//! bsonjson to-bson -f store.json store.out.bson
//! bsonjson fetch -u https://example.com/rooms/living.bson -t living
//! ```

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use bsonjson::cli::CliInterface;
use bsonjson::config::Config;
use bsonjson::error::{BsonJsonError, Result};

/// Application entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Run the selected subcommand
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(cli.config())?;
    cli.run().await
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging from the effective configuration
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to
/// stderr so that base64 output on stdout stays clean.
fn initialize_logging(config: &Config) -> Result<()> {
    let logging = &config.logging;
    let level = LevelFilter::from_level(logging.level.to_tracing_level());
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);
    let mut layers: Vec<BoxedLayer> = vec![if logging.timestamps {
        stderr.boxed()
    } else {
        stderr.without_time().boxed()
    }];

    if let Some(path) = &logging.file_path {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| BsonJsonError::io(path, e))?;
        layers.push(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| BsonJsonError::Generic(format!("Failed to initialize logging: {}", e)))
}
