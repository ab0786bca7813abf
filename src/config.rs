//! Endpoint, model, and credential configuration.
//!
//! There is no configuration file. Defaults point at the public generation
//! endpoints; the environment can override endpoints, models, and the
//! optional bearer token.

use std::env;
use std::time::Duration;

use crate::render::RenderConfig;

/// Configuration for the whole generation pipeline.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Chat-completion endpoint for composition generation
    pub text_endpoint: String,
    /// Model identifier sent with the chat request
    pub text_model: String,
    /// Image endpoint; the percent-encoded prompt is appended as a path segment
    pub image_endpoint: String,
    /// Model identifier sent as the image request's `model` query parameter
    pub image_model: String,
    /// Optional bearer token for both endpoints
    pub api_key: Option<String>,
    /// Per-request timeout for both upstream calls
    pub request_timeout: Duration,
    /// Skip the cover request entirely when false
    pub fetch_cover: bool,
    /// Offline renderer settings
    pub render: RenderConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            text_endpoint: "https://gen.pollinations.ai/v1/chat/completions".to_string(),
            text_model: "qwen-coder".to_string(),
            image_endpoint: "https://gen.pollinations.ai/image".to_string(),
            image_model: "zimage".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(60),
            fetch_cover: true,
            render: RenderConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Default configuration overlaid with environment overrides.
    ///
    /// `ARIA_API_KEY` wins over `POLLINATIONS_API_KEY`; empty values count
    /// as unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(key) = env_nonempty("ARIA_API_KEY").or_else(|| env_nonempty("POLLINATIONS_API_KEY")) {
            config.api_key = Some(key);
        }
        if let Some(endpoint) = env_nonempty("ARIA_TEXT_ENDPOINT") {
            config.text_endpoint = endpoint;
        }
        if let Some(model) = env_nonempty("ARIA_TEXT_MODEL") {
            config.text_model = model;
        }
        if let Some(endpoint) = env_nonempty("ARIA_IMAGE_ENDPOINT") {
            config.image_endpoint = endpoint;
        }
        if let Some(model) = env_nonempty("ARIA_IMAGE_MODEL") {
            config.image_model = model;
        }

        config
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_public_endpoints() {
        let config = GeneratorConfig::default();
        assert!(config.text_endpoint.starts_with("https://"));
        assert_eq!(config.text_model, "qwen-coder");
        assert!(config.api_key.is_none());
        assert!(config.fetch_cover);
    }
}
