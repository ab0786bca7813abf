//! Cover requestor.
//!
//! Fetches album art for a style description from an image-generation
//! endpoint. The prompt is a fixed visual template parameterized by the
//! style string, percent-encoded into the request path. This call is
//! independent of composition generation; the workflow treats its failure
//! as a missing cover, never as a failed generation.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::config::GeneratorConfig;
use crate::error::{Error, Result};

/// Raw image bytes plus the content type the endpoint declared.
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl CoverImage {
    /// File extension matching the content type.
    pub fn extension(&self) -> &'static str {
        let content_type = self.content_type.to_ascii_lowercase();
        if content_type.contains("jpeg") || content_type.contains("jpg") {
            "jpg"
        } else if content_type.contains("webp") {
            "webp"
        } else if content_type.contains("gif") {
            "gif"
        } else {
            "png"
        }
    }
}

/// Client for the image-generation dependency.
pub struct CoverClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl CoverClient {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.image_endpoint.clone(),
            model: config.image_model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Request a cover image for a style description.
    pub async fn request(&self, style: &str) -> Result<CoverImage> {
        let prompt = cover_prompt(style);
        let encoded = utf8_percent_encode(&prompt, NON_ALPHANUMERIC);
        let url = format!(
            "{}/{}?model={}",
            self.endpoint.trim_end_matches('/'),
            encoded,
            self.model
        );

        let mut builder = self.http.get(&url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/png")
            .to_string();

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body: "image endpoint returned an empty body".to_string(),
            });
        }

        Ok(CoverImage { bytes, content_type })
    }
}

/// The fixed visual prompt, parameterized by the style string.
fn cover_prompt(style: &str) -> String {
    format!(
        "Abstract album cover art for {style} music, dreamy, motion blur effect, \
         soft focus, ethereal, atmospheric, blurred movement, cinematic, \
         artistic photography, defocused, gaussian blur"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_content_type() {
        let image = |content_type: &str| CoverImage {
            bytes: vec![0],
            content_type: content_type.to_string(),
        };
        assert_eq!(image("image/png").extension(), "png");
        assert_eq!(image("image/jpeg").extension(), "jpg");
        assert_eq!(image("IMAGE/WEBP").extension(), "webp");
        assert_eq!(image("application/octet-stream").extension(), "png");
    }

    #[test]
    fn prompt_embeds_the_style() {
        let prompt = cover_prompt("epic orchestral");
        assert!(prompt.contains("epic orchestral"));
        assert!(prompt.contains("album cover art"));
    }
}
