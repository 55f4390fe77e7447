//! Image editing output, and how it becomes something the page can show.
//!
//! Hosted image models don't promise a reply shape: a bare URL, a list of
//! URLs, a file handle with a URL and a readable body, or raw bytes all turn
//! up. [`TransformResult::classify`] sorts the raw JSON into one of those
//! shapes once, at the client boundary, and [`normalize`] reduces any shape to
//! a [`DisplayArtifact`] without ever failing.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use base64::Engine;
use base64::engine::general_purpose;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::HeraldryError;
use crate::notice::Notice;

/// Pending result of a [`ByteReader`].
pub type ReadFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, HeraldryError>> + Send>>;

/// A one-shot read of an output's bytes.
///
/// Reading consumes the reader: the underlying body may be a stream or a
/// download and is only ever read once.
pub struct ByteReader {
    read: Box<dyn FnOnce() -> ReadFuture + Send>,
}

impl ByteReader {
    /// Wraps an async read.
    pub fn new<F, Fut>(read: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<u8>, HeraldryError>> + Send + 'static,
    {
        Self {
            read: Box::new(move || Box::pin(read())),
        }
    }

    /// Bytes that are already in memory.
    pub fn in_memory(bytes: Vec<u8>) -> Self {
        Self::new(move || async move { Ok(bytes) })
    }

    /// Base64 text, optionally wrapped in a `data:` URI, decoded on read.
    pub fn base64(encoded: String) -> Self {
        Self::new(move || async move {
            let payload = match encoded.split_once(";base64,") {
                Some((prefix, payload)) if prefix.starts_with("data:") => payload,
                _ => encoded.as_str(),
            };
            general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|err| HeraldryError::Inference(format!("Undecodable image data: {err}")))
        })
    }

    /// Reads the bytes, consuming the reader.
    pub async fn read(self) -> Result<Vec<u8>, HeraldryError> {
        (self.read)().await
    }
}

impl fmt::Debug for ByteReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ByteReader")
    }
}

/// Where a [`TransformResult::UrlObject`] keeps its URL.
pub enum UrlAccessor {
    /// A plain field
    Field(String),
    /// Computed on demand
    Method(Box<dyn FnOnce() -> String + Send>),
}

impl UrlAccessor {
    fn resolve(self) -> String {
        match self {
            UrlAccessor::Method(url) => url(),
            UrlAccessor::Field(url) => url,
        }
    }
}

impl fmt::Debug for UrlAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlAccessor::Field(url) => f.debug_tuple("Field").field(url).finish(),
            UrlAccessor::Method(_) => f.write_str("Method"),
        }
    }
}

/// An image editing model's reply, classified by shape.
#[derive(Debug)]
pub enum TransformResult {
    /// A bare URL string
    Url(String),
    /// A list of results; only the first one is ever shown
    Sequence(Vec<TransformResult>),
    /// Something with a URL, and maybe a readable body
    UrlObject {
        /// the URL
        url: UrlAccessor,
        /// the body, when it can be read
        reader: Option<ByteReader>,
    },
    /// Only a readable body
    ByteObject(ByteReader),
    /// Anything else
    Unknown(Value),
}

/// String form of an output that is nothing but bytes.
const BINARY_OUTPUT: &str = "<binary output>";

/// Keys that carry inline base64 image data.
const INLINE_DATA_KEYS: [&str; 2] = ["b64_json", "data"];

impl TransformResult {
    /// Sorts a model's raw JSON output into a shape.
    ///
    /// With a `file_reader`, a top-level `http(s)` URL is treated as a file
    /// handle whose body can be fetched through the reader it builds.
    pub fn classify(value: Value, file_reader: Option<&dyn Fn(&str) -> ByteReader>) -> Self {
        match value {
            Value::String(url) => match file_reader {
                Some(make_reader) if is_http_url(&url) => {
                    let reader = make_reader(&url);
                    TransformResult::UrlObject {
                        url: UrlAccessor::Field(url),
                        reader: Some(reader),
                    }
                }
                _ => TransformResult::Url(url),
            },
            Value::Array(items) if !items.is_empty() => TransformResult::Sequence(
                items
                    .into_iter()
                    .map(|item| Self::classify(item, None))
                    .collect(),
            ),
            Value::Object(mut map) => {
                let inline = INLINE_DATA_KEYS.iter().find_map(|key| match map.get(*key) {
                    Some(Value::String(data)) => Some(data.clone()),
                    _ => None,
                });
                match map.remove("url") {
                    Some(Value::String(url)) => TransformResult::UrlObject {
                        url: UrlAccessor::Field(url),
                        reader: inline.map(ByteReader::base64),
                    },
                    other => {
                        if let Some(other) = other {
                            map.insert("url".to_string(), other);
                        }
                        match inline {
                            Some(data) => TransformResult::ByteObject(ByteReader::base64(data)),
                            None => TransformResult::Unknown(Value::Object(map)),
                        }
                    }
                }
            }
            other => TransformResult::Unknown(other),
        }
    }
}

impl fmt::Display for TransformResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformResult::Url(url) => f.write_str(url),
            TransformResult::Sequence(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            TransformResult::UrlObject {
                url: UrlAccessor::Field(url),
                ..
            } => f.write_str(url),
            TransformResult::UrlObject { .. } => f.write_str("<file output>"),
            TransformResult::ByteObject(_) => f.write_str(BINARY_OUTPUT),
            TransformResult::Unknown(value) => write!(f, "{value}"),
        }
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

/// A transformed portrait, ready to show and maybe download.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayArtifact {
    /// Where the image can be shown from
    pub url: Option<String>,
    /// The image itself, when it could be read
    pub bytes: Option<Vec<u8>>,
}

impl DisplayArtifact {
    /// True when there's nothing to show or download.
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.bytes.is_none()
    }

    /// The URL, but only when a browser could load it.
    pub fn linkable_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|url| is_http_url(url) || url.starts_with("data:"))
    }
}

/// Reduces any reply shape to a URL and, when readable, the bytes.
///
/// Never fails: an unrecognised shape becomes its string form, and a failed
/// read only loses the bytes, with a warning added to `notices`.
pub async fn normalize(result: TransformResult, notices: &mut Vec<Notice>) -> DisplayArtifact {
    let (url, reader) = match result {
        TransformResult::UrlObject { url, reader } => (url.resolve(), reader),
        TransformResult::ByteObject(reader) => {
            (fallback_url(BINARY_OUTPUT.to_string()), Some(reader))
        }
        other => (extract_url(other), None),
    };

    let bytes = match reader {
        Some(reader) => match reader.read().await {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!("Download not available: {}", err);
                notices.push(Notice::warning(format!("Download not available: {err}")));
                None
            }
        },
        None => None,
    };

    let url = Some(url).filter(|url| !url.trim().is_empty());
    DisplayArtifact { url, bytes }
}

fn extract_url(result: TransformResult) -> String {
    match result {
        TransformResult::UrlObject { url, .. } => url.resolve(),
        TransformResult::Sequence(items) => {
            let mut items = items.into_iter();
            match items.next() {
                Some(first) => extract_url(first),
                None => fallback_url("[]".to_string()),
            }
        }
        TransformResult::Url(url) => url,
        other => {
            debug!("Unrecognised image output: {other:?}");
            fallback_url(other.to_string())
        }
    }
}

fn fallback_url(url: String) -> String {
    warn!("Unrecognised image output shape, falling back to {url:?}");
    url
}
