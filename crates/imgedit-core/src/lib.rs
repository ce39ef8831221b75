//! imgedit Core Library
//!
//! This crate provides the core functionality for imgedit, including:
//! - API client for the image generation backend (upload, generate, URL resolution)
//! - Downloading generated images
//! - Client-side image preparation against the configured constraints
//! - Chat history and the continuous-edit session
//! - Configuration loaded once from `config.toml` and the environment

pub mod api;
pub mod chat;
pub mod config;
pub mod download;
pub mod error;
pub mod preprocess;

pub use error::{Error, Result};
