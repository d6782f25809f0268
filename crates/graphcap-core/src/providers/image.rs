//! Image input for vision completions.

use crate::error::{ProviderError, ProviderResult};
use base64::Engine;
use std::path::{Path, PathBuf};

/// An image given to a vision completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// A file to read and base64-encode
    Path(PathBuf),
    /// A `data:` URI or an already base64-encoded payload
    Encoded(String),
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&str> for ImageInput {
    /// Strings starting with `data:` are treated as encoded images, anything
    /// else as a file path.
    fn from(s: &str) -> Self {
        if s.starts_with("data:") {
            Self::Encoded(s.to_string())
        } else {
            Self::Path(PathBuf::from(s))
        }
    }
}

impl From<String> for ImageInput {
    fn from(s: String) -> Self {
        if s.starts_with("data:") {
            Self::Encoded(s)
        } else {
            Self::Path(PathBuf::from(s))
        }
    }
}

/// Base64 image data ready to embed in a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl EncodedImage {
    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

impl ImageInput {
    /// Resolve the input to base64 data.
    ///
    /// Files are read and encoded. For encoded input the payload after
    /// `base64,` is used as-is, or the whole string when there is no such
    /// marker.
    pub async fn encode(&self) -> ProviderResult<EncodedImage> {
        match self {
            Self::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|source| ProviderError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(EncodedImage {
                    data: base64::engine::general_purpose::STANDARD.encode(bytes),
                    media_type: media_type_for_path(path).to_string(),
                })
            }
            Self::Encoded(s) => {
                let (media_type, data) = match s.split_once("base64,") {
                    Some((prefix, payload)) => (media_type_for_data_uri(prefix), payload),
                    None => ("image/jpeg", s.as_str()),
                };
                Ok(EncodedImage {
                    data: data.to_string(),
                    media_type: media_type.to_string(),
                })
            }
        }
    }
}

fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        other => {
            tracing::warn!("Unknown image extension {other:?}, defaulting to image/jpeg");
            "image/jpeg"
        }
    }
}

/// Media type from a `data:image/png;` prefix.
fn media_type_for_data_uri(prefix: &str) -> &str {
    prefix
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .filter(|mime| !mime.is_empty())
        .unwrap_or("image/jpeg")
}
