//! HTTP client for the image generation backend
//!
//! Every operation is a single request/response round trip. There is no
//! retry and no caching; failures go through the response interceptor and
//! are returned to the caller.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Client as HttpClient, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};

use super::interceptor;
use super::types::{
    GenerateRequest, GenerationResponse, ImageFile, ImageId, RawResponse, TextPrompt,
    UploadResponse,
};
use super::url::{resolve_image_url, with_trailing_slash};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 90;

/// Client for the backend's upload and generation endpoints
#[derive(Clone)]
pub struct ApiClient {
    http_client: HttpClient,
    base_url: String,
    image_base_url: String,
    timeout_secs: u64,
    upload_timeout_secs: u64,
    download_dir: PathBuf,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("image_base_url", &self.image_base_url)
            .finish()
    }
}

/// Builder for ApiClient
pub struct ApiClientBuilder {
    base_url: Option<String>,
    image_base_url: Option<String>,
    timeout_secs: Option<u64>,
    upload_timeout_secs: Option<u64>,
    download_dir: Option<PathBuf>,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            image_base_url: None,
            timeout_secs: None,
            upload_timeout_secs: None,
            download_dir: None,
        }
    }

    /// Set the API base URL, e.g. `http://localhost:8000/api`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the base URL relative image paths are resolved against
    pub fn image_base_url(mut self, url: impl Into<String>) -> Self {
        self.image_base_url = Some(url.into());
        self
    }

    /// Set the default request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Set the timeout for generation requests carrying an upload
    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.upload_timeout_secs = Some(secs);
        self
    }

    /// Set the directory downloads are written to
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Build the ApiClient
    pub fn build(self) -> Result<ApiClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("API base URL is not set".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("Invalid API base URL {}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API base URL must be an http(s) URL, got: {}",
                base_url
            )));
        }

        // Images are served from the root of the API host unless told otherwise
        let image_base_url = with_trailing_slash(
            &self
                .image_base_url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| parsed.origin().ascii_serialization()),
        );

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(ApiClient {
            http_client,
            base_url,
            image_base_url,
            timeout_secs,
            upload_timeout_secs: self
                .upload_timeout_secs
                .unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS),
            download_dir: self.download_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

impl ApiClient {
    /// Create a new builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Create a client from a configuration snapshot
    pub fn from_config(config: &Config) -> Result<Self> {
        ApiClientBuilder::new()
            .base_url(&config.api_base_url)
            .image_base_url(&config.image_base_url)
            .timeout_secs(config.timeout_secs)
            .upload_timeout_secs(config.upload_timeout_secs)
            .download_dir(&config.download_dir)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn image_base_url(&self) -> &str {
        &self.image_base_url
    }

    pub fn download_dir(&self) -> &std::path::Path {
        &self.download_dir
    }

    /// Upload an image as multipart field `file` to `POST /upload`
    pub async fn upload_image(&self, file: ImageFile) -> Result<UploadResponse> {
        debug!(file = %file.file_name, size_kb = file.size_kb(), "Uploading image");

        let form = Form::new().part("file", file.into_part()?);
        let request = self.http_client.post(self.endpoint("/upload")).multipart(form);

        let response: RawResponse<UploadResponse> =
            self.dispatch(request, self.timeout_secs).await?;

        info!(success = response.data.success, "Upload finished");
        Ok(response.data)
    }

    /// Request a generation from text, optionally editing an uploaded image
    ///
    /// Posts `{text, imageId, continuousEdit}` to `POST /generate`.
    pub async fn generate_image(
        &self,
        text: &str,
        image_id: Option<ImageId>,
        continuous_edit: bool,
    ) -> Result<GenerationResponse> {
        let payload = GenerateRequest::new(text)
            .with_image_id(image_id)
            .continuous_edit(continuous_edit);

        debug!(
            image_id = ?payload.image_id,
            continuous_edit = payload.continuous_edit,
            "Sending generation request"
        );

        let request = self.http_client.post(self.endpoint("/generate")).json(&payload);
        let response: RawResponse<GenerationResponse> =
            self.dispatch(request, self.timeout_secs).await?;

        Ok(response.data)
    }

    /// Text-only generation via `POST /generate_from_text`
    ///
    /// Returns the transport response as-is; the body is not unwrapped.
    pub async fn generate_from_text(&self, prompt: &str) -> Result<RawResponse<GenerationResponse>> {
        let payload = TextPrompt {
            prompt: prompt.to_string(),
        };

        debug!("Sending text generation request");

        let request = self
            .http_client
            .post(self.endpoint("/generate_from_text"))
            .json(&payload);
        self.dispatch(request, self.timeout_secs).await
    }

    /// Image-to-image generation: multipart `{file, prompt}` to `POST /generate`
    ///
    /// Uses the extended upload timeout. Returns the transport response as-is.
    pub async fn generate_from_image(
        &self,
        file: ImageFile,
        prompt: &str,
    ) -> Result<RawResponse<GenerationResponse>> {
        let url = self.endpoint("/generate");

        info!(
            file = %file.file_name,
            mime_type = %file.mime_type,
            size_kb = file.size_kb(),
            url = %url,
            "Preparing image generation request"
        );

        let form = Form::new()
            .part("file", file.into_part()?)
            .text("prompt", prompt.to_string());

        let request = self
            .http_client
            .post(url)
            .multipart(form)
            .timeout(Duration::from_secs(self.upload_timeout_secs));
        self.dispatch(request, self.upload_timeout_secs).await
    }

    /// Resolve a backend image path to a full URL. Pure.
    pub fn full_image_url(&self, path: &str) -> String {
        resolve_image_url(&self.image_base_url, path)
    }

    pub(crate) fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http_client
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request; every failure passes through the interceptor
    async fn dispatch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout_secs: u64,
    ) -> Result<RawResponse<T>> {
        execute(request, timeout_secs)
            .await
            .map_err(interceptor::on_error)
    }
}

async fn execute<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout_secs: u64,
) -> Result<RawResponse<T>> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(e, timeout_secs))?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(e, timeout_secs))?;

    if !status.is_success() {
        return Err(Error::Status {
            status,
            message: interceptor::server_message(&body),
        });
    }

    let data = serde_json::from_slice(&body).map_err(|e| Error::Decode(e.to_string()))?;

    Ok(RawResponse {
        status,
        headers,
        data,
    })
}

pub(crate) fn transport_error(err: reqwest::Error, timeout_secs: u64) -> Error {
    if err.is_timeout() {
        Error::Timeout(timeout_secs)
    } else if err.is_builder() {
        Error::InvalidRequest(err.to_string())
    } else {
        Error::NoResponse(err)
    }
}
