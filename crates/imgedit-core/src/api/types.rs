//! Request and response types exchanged with the backend

use std::path::Path;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier the backend assigns to an uploaded image.
///
/// The backend is not consistent about the JSON type, so both strings and
/// numbers are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl std::str::FromStr for ImageId {
    type Err = std::convert::Infallible;

    /// Integers become [`ImageId::Number`], anything else [`ImageId::Text`]
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        Ok(s.parse::<i64>()
            .map(Self::Number)
            .unwrap_or_else(|_| Self::Text(s.to_string())))
    }
}

impl From<i64> for ImageId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ImageId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ImageId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Response body of `POST /upload`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_id: Option<ImageId>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    /// Image URL, only when the upload succeeded
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|_| self.success)
    }

    /// Image identifier, only when the upload succeeded
    pub fn image_id(&self) -> Option<&ImageId> {
        self.image_id.as_ref().filter(|_| self.success)
    }

    /// Turn a `success: false` body into [`Error::Rejected`]
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::Rejected(
                self.message.unwrap_or_else(|| "Upload failed".to_string()),
            ))
        }
    }
}

/// JSON body of `POST /generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub text: String,
    /// Serialized as `null` when absent
    pub image_id: Option<ImageId>,
    pub continuous_edit: bool,
}

impl GenerateRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_id: None,
            continuous_edit: false,
        }
    }

    pub fn with_image_id(mut self, image_id: Option<ImageId>) -> Self {
        self.image_id = image_id;
        self
    }

    pub fn continuous_edit(mut self, enabled: bool) -> Self {
        self.continuous_edit = enabled;
        self
    }
}

/// JSON body of `POST /generate_from_text`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPrompt {
    pub prompt: String,
}

/// Response body of the generation endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GenerationResponse {
    /// Result text, only when generation succeeded
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref().filter(|_| self.success)
    }

    /// Generated image path, only when generation succeeded
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|_| self.success)
    }

    /// Turn a `success: false` body into [`Error::Rejected`]
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(Error::Rejected(
                self.message.unwrap_or_else(|| "Generation failed".to_string()),
            ))
        }
    }
}

/// A response as received from the transport, body parsed but not unwrapped
#[derive(Debug, Clone)]
pub struct RawResponse<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub data: T,
}

impl<T> RawResponse<T> {
    pub fn into_data(self) -> T {
        self.data
    }
}

/// An image file ready to be sent as a multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Wrap in-memory bytes; the mime type is guessed from the file name
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::InvalidRequest(format!("Not a file path: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(file_name, bytes))
    }

    /// Size in whole kilobytes, rounded
    pub fn size_kb(&self) -> u64 {
        (self.bytes.len() as f64 / 1024.0).round() as u64
    }

    pub(crate) fn into_part(self) -> Result<reqwest::multipart::Part> {
        reqwest::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime_type)
            .map_err(|e| Error::InvalidRequest(format!("Invalid mime type: {}", e)))
    }
}
