//! Command-line interface for bsonjson
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Dispatch of the conversion, filter and fetch commands

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::{Config, LogLevel};
use crate::converter::{
    ConvertOptions, DocumentConverter, convert_file_to_bson, convert_file_to_json,
    default_json_output_path,
};
use crate::error::{BsonJsonError, Result};
use crate::filter::PayloadFilter;
use crate::pipeline::{HttpFetcher, Pipeline};

/// Command-line arguments for bsonjson
#[derive(Parser, Debug)]
#[command(name = "bsonjson")]
#[command(author, version, about = "BSON <-> tagged JSON conversion and payload filtering")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for bsonjson
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a BSON file to tagged JSON
    ToJson {
        /// BSON file to convert
        #[arg(short = 'f', long = "file", value_name = "FILE")]
        file: PathBuf,

        /// Output JSON file (defaults to the input with a .json extension)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,

        /// Overwrite the output file without asking
        #[arg(short = 'y', long = "yes")]
        yes: bool,

        /// Validate the BSON stream before converting
        #[arg(short = 'v', long = "validate")]
        validate: bool,
    },

    /// Convert a tagged JSON file to BSON
    ToBson {
        /// JSON file to convert
        #[arg(short = 'f', long = "file", value_name = "FILE")]
        file: PathBuf,

        /// Output BSON file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Remove matching elements from embedded Content payloads, in place
    Filter {
        /// JSON file to filter
        #[arg(short = 'f', long = "file", value_name = "FILE")]
        file: PathBuf,

        /// Substring searched in AssetName (defaults to the configured key)
        #[arg(value_name = "SEARCH")]
        search_key: Option<String>,
    },

    /// Download a BSON resource, filter it and print it as base64
    Fetch {
        /// Resource URL
        #[arg(short = 'u', long = "url", value_name = "URL")]
        url: String,

        /// Name of the intermediate JSON file
        #[arg(short = 't', long = "template", value_name = "NAME")]
        template: String,

        /// File receiving the base64 text (printed when omitted)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface from the process arguments
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    ///
    /// # Arguments
    /// * `args` - Command-line arguments
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;

        if let Err(e) = config.validate() {
            eprintln!("Warning: Configuration validation failed: {}", e);
            eprintln!("Using default configuration instead.");
            config = Config::default();
        }

        Self::apply_args_to_config(&mut config, args);

        Ok(config)
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.quiet {
            LogLevel::Error
        } else {
            args.log_level.unwrap_or(config.logging.level)
        };

        if let Commands::ToJson { validate: true, .. } = args.command {
            config.convert.validate = true;
        }
    }

    /// Execute the selected subcommand
    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Commands::ToJson {
                file, output, yes, ..
            } => self.to_json(file, output.as_deref(), *yes),
            Commands::ToBson { file, output } => self.to_bson(file, output),
            Commands::Filter { file, search_key } => self.filter(file, search_key.as_deref()),
            Commands::Fetch {
                url,
                template,
                output,
            } => self.fetch(url, template, output.as_deref()).await,
            Commands::Config { show, validate } => self.handle_config_command(*show, *validate),
        }
    }

    fn converter(&self) -> DocumentConverter {
        DocumentConverter::new(self.config.convert.indent)
    }

    fn to_json(&self, input: &Path, output: Option<&Path>, yes: bool) -> Result<()> {
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_json_output_path(input));

        let mut overwrite = yes;
        if output.exists() && !yes {
            if !confirm_overwrite(&output)? {
                info!("Operation cancelled by user.");
                return Ok(());
            }
            overwrite = true;
        }

        let options = ConvertOptions {
            overwrite,
            validate: self.config.convert.validate,
        };
        convert_file_to_json(&self.converter(), input, &output, options)?;
        Ok(())
    }

    fn to_bson(&self, input: &Path, output: &Path) -> Result<()> {
        convert_file_to_bson(&self.converter(), input, output)?;
        Ok(())
    }

    fn filter(&self, file: &Path, search_key: Option<&str>) -> Result<()> {
        let search_key = search_key.unwrap_or(self.config.filter.search_key.as_str());
        let report = PayloadFilter::new(search_key)
            .with_indent(self.config.convert.indent)
            .filter_file(file)?;

        if !report.is_clean() {
            warn!(
                "{} payloads could not be decoded and were left unchanged",
                report.failures.len()
            );
        }
        Ok(())
    }

    async fn fetch(&self, url: &str, template: &str, output: Option<&Path>) -> Result<()> {
        let fetcher = HttpFetcher::new(&self.config.fetch)?;
        let result = Pipeline::new(fetcher, &self.config)
            .run(url, template, output)
            .await?;

        if output.is_none() {
            println!("{}", result.base64);
        }
        Ok(())
    }

    /// Handle config subcommand
    ///
    /// # Arguments
    /// * `show` - Whether to show configuration
    /// * `validate` - Whether to validate configuration
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file();
        }

        if show || !validate {
            self.show_config()?;
        }

        Ok(())
    }

    /// Validate configuration file
    fn validate_config_file(&self) {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist, defaults apply");
            return;
        }

        match Config::load_from_file(Some(path.as_path())) {
            Ok(config) => match config.validate() {
                Ok(()) => println!("Configuration is valid"),
                Err(e) => println!("Configuration validation failed: {}", e),
            },
            Err(e) => println!("Failed to load configuration: {}", e),
        }
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("Configuration file: {}", path.display());
        println!();
        println!("=== Effective Configuration ===");
        println!();
        println!("{}", self.config.to_toml_string()?);
        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }
}

/// Ask before replacing an existing output file
///
/// # Returns
/// * `Result<bool>` - True if the user answered `y`
pub fn confirm_overwrite(path: &Path) -> Result<bool> {
    print!(
        "File '{}' already exists. Overwrite? (y/n): ",
        path.display()
    );
    io::stdout()
        .flush()
        .map_err(|e| BsonJsonError::Generic(format!("Failed to flush stdout: {}", e)))?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| BsonJsonError::Generic(format!("Failed to read input: {}", e)))?;

    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_to_json_args() {
        let args = parse(&["bsonjson", "to-json", "-f", "room.bson", "-y", "-v"]);
        match args.command {
            Commands::ToJson {
                file,
                output,
                yes,
                validate,
            } => {
                assert_eq!(file, PathBuf::from("room.bson"));
                assert!(output.is_none());
                assert!(yes);
                assert!(validate);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_to_bson_args() {
        let args = parse(&["bsonjson", "to-bson", "-f", "room.json", "room.bson"]);
        assert!(matches!(
            args.command,
            Commands::ToBson { ref file, ref output }
                if file == Path::new("room.json") && output == Path::new("room.bson")
        ));
    }

    #[test]
    fn test_to_bson_requires_output() {
        assert!(CliArgs::try_parse_from(["bsonjson", "to-bson", "-f", "room.json"]).is_err());
    }

    #[test]
    fn test_filter_args() {
        let args = parse(&["bsonjson", "filter", "-f", "room.json"]);
        assert!(matches!(
            args.command,
            Commands::Filter {
                search_key: None,
                ..
            }
        ));

        let args = parse(&["bsonjson", "filter", "-f", "room.json", "lamp"]);
        assert!(matches!(
            args.command,
            Commands::Filter { search_key: Some(ref key), .. } if key == "lamp"
        ));
    }

    #[test]
    fn test_fetch_args() {
        let args = parse(&[
            "bsonjson",
            "fetch",
            "-u",
            "https://example.com/a.bson",
            "-t",
            "living",
            "-o",
            "out.txt",
        ]);
        match args.command {
            Commands::Fetch {
                url,
                template,
                output,
            } => {
                assert_eq!(url, "https://example.com/a.bson");
                assert_eq!(template, "living");
                assert_eq!(output, Some(PathBuf::from("out.txt")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_fetch_requires_template() {
        assert!(CliArgs::try_parse_from(["bsonjson", "fetch", "-u", "https://x/y"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["bsonjson", "config", "--show", "-l", "debug", "-q"]);
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert!(args.quiet);
    }

    #[test]
    fn test_args_override_config() {
        let mut config = Config::default();
        let args = parse(&["bsonjson", "-l", "trace", "to-json", "-f", "a.bson", "-v"]);
        CliInterface::apply_args_to_config(&mut config, &args);
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert!(config.convert.validate);

        let mut config = Config::default();
        let args = parse(&["bsonjson", "-q", "-l", "trace", "config"]);
        CliInterface::apply_args_to_config(&mut config, &args);
        assert_eq!(config.logging.level, LogLevel::Error);
    }
}
