//! Resource pipeline
//!
//! One run downloads a BSON resource, converts it to tagged JSON, filters
//! the embedded payloads, converts it back and returns the result as
//! base64 text:
//!
//! ```text
//! fetch -> <data_dir>/<name>
//!       -> <results_dir>/<template>.json   (converted, then filtered in place)
//!       -> <data_dir>/<name>.bson          (re-encoded)
//!       -> base64
//! ```
//!
//! The downloaded and re-encoded files are always deleted when the run
//! ends. The JSON file is deleted too unless `keep_intermediate` is set.

mod cleanup;
mod fetch;

pub use cleanup::TransientFiles;
pub use fetch::{HttpFetcher, ResourceFetcher, file_name_from_url};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::codec::encode_base64;
use crate::config::Config;
use crate::converter::{
    ConvertOptions, DocumentConverter, convert_file_to_bson, convert_file_to_json,
};
use crate::error::{BsonJsonError, Result};
use crate::filter::{FilterReport, PayloadFilter};
use crate::utils::format::format_duration;
use crate::utils::fs::ensure_dir_exists;

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    /// Standard padded base64 of the re-encoded BSON stream
    pub base64: String,

    /// What the filter pass did
    pub report: FilterReport,

    /// Number of documents in the resource
    pub documents: usize,
}

/// Fetch, convert, filter and re-encode a remote resource
pub struct Pipeline<F: ResourceFetcher> {
    fetcher: F,
    converter: DocumentConverter,
    filter: PayloadFilter,
    validate: bool,
    data_dir: PathBuf,
    results_dir: PathBuf,
    keep_intermediate: bool,
}

impl<F: ResourceFetcher> Pipeline<F> {
    pub fn new(fetcher: F, config: &Config) -> Self {
        Self {
            fetcher,
            converter: DocumentConverter::new(config.convert.indent),
            filter: PayloadFilter::new(config.filter.search_key.clone())
                .with_indent(config.convert.indent),
            validate: config.convert.validate,
            data_dir: config.pipeline.data_dir.clone(),
            results_dir: config.pipeline.results_dir.clone(),
            keep_intermediate: config.pipeline.keep_intermediate,
        }
    }

    /// Run the whole pipeline for one resource
    ///
    /// # Arguments
    /// * `url` - Resource location; its last path segment names the local file
    /// * `template` - Name of the intermediate JSON file
    /// * `output` - Optional file receiving the base64 text
    pub async fn run(
        &self,
        url: &str,
        template: &str,
        output: Option<&Path>,
    ) -> Result<PipelineOutput> {
        let started = Instant::now();

        validate_template(template)?;
        let download = self.data_dir.join(file_name_from_url(url)?);
        let reencoded = with_appended_extension(&download, "bson");
        let json_path = self.results_dir.join(format!("{template}.json"));

        let mut transient = TransientFiles::new();
        transient.track(&download);
        transient.track(&reencoded);
        transient.track(&json_path);
        if self.keep_intermediate {
            transient.release(&json_path);
        }

        ensure_dir_exists(&self.data_dir)?;
        ensure_dir_exists(&self.results_dir)?;

        let bytes = self.fetcher.fetch(url).await?;
        fs::write(&download, &bytes).map_err(|e| BsonJsonError::io(&download, e))?;
        info!("Saved {} to {}", url, download.display());

        let options = ConvertOptions {
            overwrite: true,
            validate: self.validate,
        };
        let documents = convert_file_to_json(&self.converter, &download, &json_path, options)?;
        let report = self.filter.filter_file(&json_path)?;
        convert_file_to_bson(&self.converter, &json_path, &reencoded)?;

        let encoded = fs::read(&reencoded).map_err(|e| BsonJsonError::io(&reencoded, e))?;
        let base64 = encode_base64(&encoded);

        if let Some(path) = output {
            fs::write(path, &base64).map_err(|e| BsonJsonError::io(path, e))?;
            info!("Base64 content saved to {}", path.display());
        }

        info!(
            "Pipeline for {} finished in {}",
            url,
            format_duration(started.elapsed())
        );

        Ok(PipelineOutput {
            base64,
            report,
            documents,
        })
    }
}

/// Template names become file names inside `results_dir`
fn validate_template(template: &str) -> Result<()> {
    let unsafe_name = template.is_empty()
        || template == "."
        || template == ".."
        || template.contains(['/', '\\']);
    if unsafe_name {
        return Err(BsonJsonError::Generic(format!(
            "Invalid template name '{template}': must be a plain file name"
        )));
    }
    Ok(())
}

/// `file.bson` -> `file.bson.bson`
fn with_appended_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_base64;
    use crate::converter::{decode_stream, encode_stream};
    use crate::error::FetchError;
    use async_trait::async_trait;
    use bson::spec::BinarySubtype;
    use bson::{Binary, Bson, doc};
    use std::collections::HashMap;
    use tempfile::TempDir;

    const URL: &str = "https://assets.example.com/rooms/living.bson";

    struct MemoryFetcher {
        resources: HashMap<String, Vec<u8>>,
    }

    impl MemoryFetcher {
        fn serving(url: &str, bytes: Vec<u8>) -> Self {
            Self {
                resources: HashMap::from([(url.to_string(), bytes)]),
            }
        }
    }

    #[async_trait]
    impl ResourceFetcher for MemoryFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.resources.get(url).cloned().ok_or_else(|| {
                FetchError::BadStatus {
                    url: url.to_string(),
                    status: 404,
                }
                .into()
            })
        }
    }

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.pipeline.data_dir = dir.path().join("data");
        config.pipeline.results_dir = dir.path().join("results");
        config
    }

    fn resource() -> Vec<u8> {
        let payload = serde_json::json!({
            "Elements": [
                { "AssetName": "carpet" },
                { "AssetName": "sofa", "InventoryId": null },
                { "AssetName": "lamp", "InventoryId": 12 }
            ]
        });
        let content = Binary {
            subtype: BinarySubtype::Generic,
            bytes: serde_json::to_vec(&payload).unwrap(),
        };
        encode_stream(&[doc! { "Name": "living", "Content": content }]).unwrap()
    }

    fn dir_is_empty(path: &Path) -> bool {
        fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(true)
    }

    #[test]
    fn test_appended_extension() {
        assert_eq!(
            with_appended_extension(Path::new("data/living.bson"), "bson"),
            PathBuf::from("data/living.bson.bson")
        );
    }

    #[tokio::test]
    async fn test_run_filters_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let pipeline = Pipeline::new(MemoryFetcher::serving(URL, resource()), &config);

        let output = pipeline.run(URL, "living", None).await.unwrap();
        assert_eq!(output.documents, 1);
        assert_eq!(output.report.transformed, 1);
        assert_eq!(output.report.removed_elements, 2);

        let docs = decode_stream(&decode_base64(&output.base64).unwrap()).unwrap();
        let Some(Bson::Binary(content)) = docs[0].get("Content") else {
            panic!("Content should be binary");
        };
        let inner: serde_json::Value = serde_json::from_slice(&content.bytes).unwrap();
        assert_eq!(
            inner,
            serde_json::json!({ "Elements": [ { "AssetName": "sofa", "InventoryId": null } ] })
        );

        assert!(dir_is_empty(&config.pipeline.data_dir));
        assert!(dir_is_empty(&config.pipeline.results_dir));
    }

    #[tokio::test]
    async fn test_keep_intermediate_and_output_file() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.pipeline.keep_intermediate = true;
        let out = dir.path().join("living.b64");
        let pipeline = Pipeline::new(MemoryFetcher::serving(URL, resource()), &config);

        let output = pipeline.run(URL, "living", Some(out.as_path())).await.unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), output.base64);
        assert!(config.pipeline.results_dir.join("living.json").exists());
        assert!(dir_is_empty(&config.pipeline.data_dir));
    }

    #[tokio::test]
    async fn test_failed_run_still_cleans_up() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let pipeline = Pipeline::new(MemoryFetcher::serving(URL, vec![1, 2, 3]), &config);

        let err = pipeline.run(URL, "living", None).await.unwrap_err();
        assert!(matches!(err, BsonJsonError::Structural(_)));
        assert!(dir_is_empty(&config.pipeline.data_dir));
        assert!(dir_is_empty(&config.pipeline.results_dir));
    }

    #[tokio::test]
    async fn test_template_cannot_leave_results_dir() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let pipeline = Pipeline::new(MemoryFetcher::serving(URL, resource()), &config);

        for template in ["../escape", "a/b", "a\\b", "..", ""] {
            let err = pipeline.run(URL, template, None).await.unwrap_err();
            assert!(matches!(err, BsonJsonError::Generic(_)), "{template}");
        }
        assert!(!dir.path().join("escape.json").exists());
        assert!(dir_is_empty(&config.pipeline.data_dir));
    }

    #[tokio::test]
    async fn test_missing_resource() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let pipeline = Pipeline::new(MemoryFetcher::serving(URL, resource()), &config);

        let err = pipeline
            .run("https://assets.example.com/rooms/other.bson", "other", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BsonJsonError::Fetch(FetchError::BadStatus { status: 404, .. })
        ));
    }
}
