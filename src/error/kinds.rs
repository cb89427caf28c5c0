use std::path::PathBuf;
use std::{fmt, io};

use super::path::{FieldPath, PathSegment};

/// Crate-wide `Result` type using [`BsonJsonError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, BsonJsonError>;

/// Top-level error type for bsonjson operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum BsonJsonError {
    /// The BSON byte stream is not a well-formed sequence of documents.
    Structural(StructuralError),

    /// A value could not be converted between BSON and tagged JSON.
    Conversion(ConversionError),

    /// Configuration errors.
    Config(ConfigError),

    /// Resource download errors.
    Fetch(FetchError),

    /// File read or write failure.
    Io { path: PathBuf, source: io::Error },

    /// Intermediate JSON text could not be parsed or rendered.
    InvalidJson {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },

    /// Output file exists and overwriting was not allowed.
    OutputExists(PathBuf),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Structural decode failure of a concatenated BSON stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralError {
    /// Byte offset of the offending document
    pub offset: usize,

    /// Zero-based position of the offending document in the stream
    pub document: usize,

    /// What was wrong with it
    pub reason: String,
}

/// Conversion failures between BSON values and tagged JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// A recognized type tag carries a malformed payload.
    InvalidTagPayload {
        tag: &'static str,
        path: FieldPath,
        reason: String,
    },

    /// The BSON value has no representation in the tag vocabulary.
    UnsupportedType {
        path: FieldPath,
        type_name: &'static str,
    },

    /// A JSON number does not fit any BSON numeric type.
    NumberOutOfRange { path: FieldPath, value: String },

    /// A top-level value that must be a document is not one.
    NotADocument { path: FieldPath },

    /// The BSON serializer rejected a document.
    Unencodable { path: FieldPath, reason: String },
}

/// Failure to decode one embedded `Content` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterError {
    /// Location of the `Content` field
    pub path: FieldPath,

    /// What went wrong
    pub reason: FilterFailure,
}

/// Why an embedded payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterFailure {
    /// `$binary` is present but not a string.
    NotAString,

    /// Payload is not valid base64.
    InvalidBase64(String),

    /// Decoded bytes are not UTF-8 text.
    InvalidUtf8(String),

    /// Decoded text is not JSON.
    InvalidJson(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Resource download errors.
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    RequestFailed { url: String, reason: String },

    /// The server answered with a non-success status.
    BadStatus { url: String, status: u16 },

    /// The URL is not usable.
    InvalidUrl(String),
}

impl ConversionError {
    /// Record that this error happened below `segment`.
    pub fn within(mut self, segment: PathSegment) -> Self {
        match &mut self {
            ConversionError::InvalidTagPayload { path, .. }
            | ConversionError::UnsupportedType { path, .. }
            | ConversionError::NumberOutOfRange { path, .. }
            | ConversionError::NotADocument { path }
            | ConversionError::Unencodable { path, .. } => path.prepend(segment),
        }
        self
    }

    /// Shorthand for [`ConversionError::within`] with a mapping key.
    pub fn within_key(self, key: &str) -> Self {
        self.within(PathSegment::Key(key.to_string()))
    }

    /// Shorthand for [`ConversionError::within`] with a sequence index.
    pub fn within_index(self, index: usize) -> Self {
        self.within(PathSegment::Index(index))
    }

    pub fn invalid_tag(tag: &'static str, reason: impl Into<String>) -> Self {
        ConversionError::InvalidTagPayload {
            tag,
            path: FieldPath::root(),
            reason: reason.into(),
        }
    }

    pub fn path(&self) -> &FieldPath {
        match self {
            ConversionError::InvalidTagPayload { path, .. }
            | ConversionError::UnsupportedType { path, .. }
            | ConversionError::NumberOutOfRange { path, .. }
            | ConversionError::NotADocument { path }
            | ConversionError::Unencodable { path, .. } => path,
        }
    }
}

impl BsonJsonError {
    /// Attach a file path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BsonJsonError::Io {
            path: path.into(),
            source,
        }
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for BsonJsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BsonJsonError::Structural(e) => write!(f, "{e}"),
            BsonJsonError::Conversion(e) => write!(f, "Conversion error: {e}"),
            BsonJsonError::Config(e) => write!(f, "Configuration error: {e}"),
            BsonJsonError::Fetch(e) => write!(f, "Fetch error: {e}"),
            BsonJsonError::Io { path, source } => {
                write!(f, "I/O error on '{}': {source}", path.display())
            }
            BsonJsonError::InvalidJson {
                path: Some(path),
                source,
            } => write!(f, "Invalid JSON in '{}': {source}", path.display()),
            BsonJsonError::InvalidJson { path: None, source } => {
                write!(f, "Invalid JSON: {source}")
            }
            BsonJsonError::OutputExists(path) => write!(
                f,
                "File '{}' already exists. Use '-y' to overwrite.",
                path.display()
            ),
            BsonJsonError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Structurally invalid BSON: document {} at byte {}: {}",
            self.document, self.offset, self.reason
        )
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::InvalidTagPayload { tag, path, reason } => {
                write!(f, "invalid {tag} payload at {path}: {reason}")
            }
            ConversionError::UnsupportedType { path, type_name } => {
                write!(f, "BSON type {type_name} at {path} has no JSON tag form")
            }
            ConversionError::NumberOutOfRange { path, value } => {
                write!(f, "number {value} at {path} does not fit a BSON integer")
            }
            ConversionError::NotADocument { path } => {
                write!(f, "value at {path} is not a document")
            }
            ConversionError::Unencodable { path, reason } => {
                write!(f, "cannot encode document at {path}: {reason}")
            }
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot decode payload at {}: {}", self.path, self.reason)
    }
}

impl fmt::Display for FilterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterFailure::NotAString => write!(f, "$binary is not a string"),
            FilterFailure::InvalidBase64(msg) => write!(f, "invalid base64: {msg}"),
            FilterFailure::InvalidUtf8(msg) => write!(f, "invalid UTF-8: {msg}"),
            FilterFailure::InvalidJson(msg) => write!(f, "invalid JSON: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::RequestFailed { url, reason } => {
                write!(f, "GET {url} failed: {reason}")
            }
            FetchError::BadStatus { url, status } => {
                write!(f, "GET {url} returned status {status}")
            }
            FetchError::InvalidUrl(url) => write!(f, "Invalid URL: {url}"),
        }
    }
}

impl std::error::Error for BsonJsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BsonJsonError::Io { source, .. } => Some(source),
            BsonJsonError::InvalidJson { source, .. } => Some(source),
            _ => None,
        }
    }
}
impl std::error::Error for StructuralError {}
impl std::error::Error for ConversionError {}
impl std::error::Error for FilterError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for FetchError {}

/* ========================= Conversions to BsonJsonError ========================= */

impl From<StructuralError> for BsonJsonError {
    fn from(err: StructuralError) -> Self {
        BsonJsonError::Structural(err)
    }
}

impl From<ConversionError> for BsonJsonError {
    fn from(err: ConversionError) -> Self {
        BsonJsonError::Conversion(err)
    }
}

impl From<ConfigError> for BsonJsonError {
    fn from(err: ConfigError) -> Self {
        BsonJsonError::Config(err)
    }
}

impl From<FetchError> for BsonJsonError {
    fn from(err: FetchError) -> Self {
        BsonJsonError::Fetch(err)
    }
}
