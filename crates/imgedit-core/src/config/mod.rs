//! Configuration loaded once at startup
//!
//! Values come from an optional `config.toml`, then environment variables
//! override them. The resulting snapshot is read-only; install it with
//! [`Config::install`] to make it the process-wide configuration.

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::api::url::with_trailing_slash;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_IMAGE_BASE_URL: &str = "http://localhost:8000/";
const DEFAULT_PROMPT_PREFIX: &str = "Do not include any text in the image.";

static CONFIG: OnceLock<Config> = OnceLock::new();

/// imgedit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the backend API, without trailing slash
    pub api_base_url: String,
    /// Base URL images are served from, always ending in `/`
    pub image_base_url: String,
    /// Text prepended to every prompt typed in a chat session
    pub default_prompt_prefix: String,
    pub image: ImageConstraints,
    /// Timeout for ordinary requests
    pub timeout_secs: u64,
    /// Timeout for generation requests that carry an image upload
    pub upload_timeout_secs: u64,
    /// Where downloaded images are written
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConstraints {
    pub max_width: u32,
    pub max_height: u32,
    pub format: ImageFormat,
}

/// Encoding used for images prepared for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
}

impl ImageFormat {
    /// Parse from string or file extension
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::WebP => write!(f, "webp"),
        }
    }
}

impl Default for ImageConstraints {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 768,
            format: ImageFormat::Jpeg,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            default_prompt_prefix: DEFAULT_PROMPT_PREFIX.to_string(),
            image: ImageConstraints::default(),
            timeout_secs: 60,
            upload_timeout_secs: 90,
            download_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("IMGEDIT_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("imgedit")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load `config.toml` if present, then apply environment overrides
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        let base = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        base.with_overrides(|key| env::var(key).ok())
    }

    /// Build from defaults and an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Config::default().with_overrides(lookup)
    }

    /// Apply `IMGEDIT_*` overrides and normalize. Empty values count as unset.
    pub fn with_overrides<F>(mut self, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("IMGEDIT_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(url) = var("IMGEDIT_IMAGE_BASE_URL") {
            self.image_base_url = url;
        }
        if let Some(prefix) = var("IMGEDIT_DEFAULT_PROMPT_PREFIX") {
            self.default_prompt_prefix = prefix;
        }
        // Unparsable dimensions fall back to what is already set
        if let Some(width) = var("IMGEDIT_IMAGE_MAX_WIDTH").and_then(|v| v.trim().parse().ok()) {
            self.image.max_width = width;
        }
        if let Some(height) = var("IMGEDIT_IMAGE_MAX_HEIGHT").and_then(|v| v.trim().parse().ok()) {
            self.image.max_height = height;
        }
        if let Some(format) = var("IMGEDIT_IMAGE_FORMAT") {
            self.image.format = ImageFormat::parse(&format)
                .ok_or_else(|| anyhow!("Unsupported image format: {}. Use jpeg, png or webp", format))?;
        }
        if let Some(secs) = var("IMGEDIT_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid IMGEDIT_TIMEOUT_SECS value: {}", secs))?;
        }
        if let Some(secs) = var("IMGEDIT_UPLOAD_TIMEOUT_SECS") {
            self.upload_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid IMGEDIT_UPLOAD_TIMEOUT_SECS value: {}", secs))?;
        }
        if let Some(dir) = var("IMGEDIT_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }

        self.normalize();
        self.validate()?;
        Ok(self)
    }

    fn normalize(&mut self) {
        if self.api_base_url.trim().is_empty() {
            self.api_base_url = DEFAULT_API_BASE_URL.to_string();
        }
        if self.image_base_url.trim().is_empty() {
            self.image_base_url = DEFAULT_IMAGE_BASE_URL.to_string();
        }

        let trimmed = self.api_base_url.trim().trim_end_matches('/').to_string();
        self.api_base_url = trimmed;

        self.image_base_url = with_trailing_slash(self.image_base_url.trim());
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (key, url) in [
            ("api_base_url", &self.api_base_url),
            ("image_base_url", &self.image_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow!("{} must be an http(s) URL, got: {}", key, url));
            }
        }
        if self.timeout_secs == 0 || self.upload_timeout_secs == 0 {
            return Err(anyhow!("Timeouts must be at least one second"));
        }
        if self.image.max_width == 0 || self.image.max_height == 0 {
            return Err(anyhow!("Image dimensions must be positive"));
        }
        Ok(())
    }

    /// Make this the process-wide configuration.
    ///
    /// The first installed snapshot wins; later calls return it unchanged.
    pub fn install(self) -> &'static Config {
        CONFIG.get_or_init(|| self)
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "api_base_url" => Ok(self.api_base_url.clone()),
            "image_base_url" => Ok(self.image_base_url.clone()),
            "default_prompt_prefix" => Ok(self.default_prompt_prefix.clone()),
            "image.max_width" => Ok(self.image.max_width.to_string()),
            "image.max_height" => Ok(self.image.max_height.to_string()),
            "image.format" => Ok(self.image.format.to_string()),
            "timeout_secs" => Ok(self.timeout_secs.to_string()),
            "upload_timeout_secs" => Ok(self.upload_timeout_secs.to_string()),
            "download_dir" => Ok(self.download_dir.display().to_string()),
            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `imgedit config list` to see available keys.",
                key
            )),
        }
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "api_base_url",
            "image_base_url",
            "default_prompt_prefix",
            "image.max_width",
            "image.max_height",
            "image.format",
            "timeout_secs",
            "upload_timeout_secs",
            "download_dir",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }
}
