//! HTTP transport for the local model-serving backend.
//!
//! This crate owns request building, response parsing, and failure
//! classification for the backend's JSON endpoints only. It contains no
//! session state and no credential storage; callers pass the credential per
//! request and the auth gate decides when to do so.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod url;

pub use client::OllamaApiClient;
pub use config::OllamaApiConfig;
pub use error::classify_status;
pub use url::normalize_base_url;
