//! Image editing session
//!
//! Ties the API client to a chat history: an uploaded image becomes the
//! editing context, each prompt is prefixed with the configured text, and
//! every reply (or failure) is appended to the history.

use tracing::{debug, info};

use crate::api::{ApiClient, GenerationResponse, ImageFile, ImageId, UploadResponse, describe_error};
use crate::config::{Config, ImageConstraints};
use crate::error::{Error, Result};
use crate::preprocess::prepare_upload;

use super::{ChatHistory, ChatMessage};

/// Prepend `prefix` to the user's text
pub fn compose_prompt(prefix: &str, text: &str) -> String {
    let prefix = prefix.trim();
    let text = text.trim();
    if prefix.is_empty() {
        text.to_string()
    } else if text.is_empty() {
        prefix.to_string()
    } else {
        format!("{} {}", prefix, text)
    }
}

/// Chat-driven editing of one image at a time
#[derive(Debug)]
pub struct EditSession {
    client: ApiClient,
    history: ChatHistory,
    prompt_prefix: String,
    continuous_edit: bool,
    constraints: Option<ImageConstraints>,
    current_url: Option<String>,
}

impl EditSession {
    pub fn new(client: ApiClient, prompt_prefix: impl Into<String>) -> Self {
        Self {
            client,
            history: ChatHistory::new(),
            prompt_prefix: prompt_prefix.into(),
            continuous_edit: false,
            constraints: None,
            current_url: None,
        }
    }

    /// Session using the configured prompt prefix and image constraints
    pub fn from_config(client: ApiClient, config: &Config) -> Self {
        Self::new(client, config.default_prompt_prefix.clone())
            .with_constraints(Some(config.image.clone()))
    }

    /// Resize and re-encode attached images before upload
    pub fn with_constraints(mut self, constraints: Option<ImageConstraints>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn set_continuous_edit(&mut self, enabled: bool) {
        self.continuous_edit = enabled;
    }

    pub fn continuous_edit(&self) -> bool {
        self.continuous_edit
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn current_image_id(&self) -> Option<&ImageId> {
        self.history.last_image_id()
    }

    /// Resolved URL of the image currently being edited
    pub fn current_image_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Forget the history and the current image
    pub fn reset(&mut self) {
        self.history.clear();
        self.current_url = None;
    }

    /// Upload an image and make it the editing context
    pub async fn attach_image(&mut self, file: ImageFile) -> Result<UploadResponse> {
        let file = self.prepare(file)?;
        let file_name = file.file_name.clone();

        let outcome = self
            .client
            .upload_image(file)
            .await
            .and_then(UploadResponse::into_result);

        match outcome {
            Ok(response) => {
                let url = self
                    .client
                    .full_image_url(response.image_url().unwrap_or_default());
                let id = response.image_id().cloned();

                info!(file = %file_name, image_id = ?id, "Image attached");

                self.history.push(
                    ChatMessage::user(format!("Uploaded {}", file_name)).with_image(&url, id),
                );
                self.current_url = Some(url);
                Ok(response)
            }
            Err(e) => {
                self.history
                    .push_system(format!("Upload failed: {}", describe_error(&e)));
                Err(e)
            }
        }
    }

    /// Send a prompt, editing the current image if there is one
    pub async fn send(&mut self, text: &str) -> Result<GenerationResponse> {
        if text.trim().is_empty() && self.current_url.is_none() {
            return Err(Error::InvalidRequest(
                "Enter a description or attach an image first".to_string(),
            ));
        }

        let prompt = compose_prompt(&self.prompt_prefix, text);
        let image_id = self.current_image_id().cloned();

        debug!(image_id = ?image_id, continuous_edit = self.continuous_edit, "Sending prompt");
        self.history.push_user(text.trim());

        let outcome = self
            .client
            .generate_image(&prompt, image_id, self.continuous_edit)
            .await
            .and_then(GenerationResponse::into_result);

        self.record_reply(outcome)
    }

    /// Send an image together with a prompt in one multipart request
    pub async fn send_with_image(&mut self, file: ImageFile, text: &str) -> Result<GenerationResponse> {
        let file = self.prepare(file)?;
        let prompt = compose_prompt(&self.prompt_prefix, text);

        self.history
            .push_user(format!("{} [{}]", text.trim(), file.file_name).trim().to_string());

        let outcome = self
            .client
            .generate_from_image(file, &prompt)
            .await
            .and_then(|raw| raw.into_data().into_result());

        self.record_reply(outcome)
    }

    fn prepare(&self, file: ImageFile) -> Result<ImageFile> {
        match &self.constraints {
            Some(constraints) => prepare_upload(&file, constraints),
            None => Ok(file),
        }
    }

    fn record_reply(&mut self, outcome: Result<GenerationResponse>) -> Result<GenerationResponse> {
        match outcome {
            Ok(response) => {
                let content = response
                    .result()
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or("Image generated")
                    .to_string();

                let mut reply = ChatMessage::system(content);
                if let Some(path) = response.image_url() {
                    let url = self.client.full_image_url(path);
                    reply = reply.with_image(&url, None);

                    // Continuous editing keeps working on the latest result;
                    // the identifier stays on the upload message
                    if self.continuous_edit {
                        self.current_url = Some(url);
                    }
                }
                self.history.push(reply);
                Ok(response)
            }
            Err(e) => {
                self.history
                    .push_system(format!("Generation failed: {}", describe_error(&e)));
                Err(e)
            }
        }
    }
}
