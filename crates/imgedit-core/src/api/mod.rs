//! API client for the image generation backend
//!
//! Endpoints consumed (relative to the API base URL):
//! - `POST /upload` — multipart `file`
//! - `POST /generate` — JSON `{text, imageId, continuousEdit}` or multipart `{file, prompt}`
//! - `POST /generate_from_text` — JSON `{prompt}`

mod client;
pub mod interceptor;
mod types;
pub mod url;

pub use client::{ApiClient, ApiClientBuilder};
pub(crate) use client::transport_error;
pub use interceptor::describe_error;
pub use types::{
    GenerateRequest, GenerationResponse, ImageFile, ImageId, RawResponse, TextPrompt,
    UploadResponse,
};
pub use url::resolve_image_url;
