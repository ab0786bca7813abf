//! Composition requestor.
//!
//! Asks a chat-completion endpoint to emit a JSON `MusicComposition` for a
//! style description. The reply is free text from a third-party model, so
//! parsing is two-tier: try the extracted message content as JSON directly,
//! then fall back to the first balanced `{...}` region inside it. Whatever
//! parses is normalized before use; the prompt contract is not trusted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::composition::MusicComposition;
use crate::config::GeneratorConfig;
use crate::error::{Error, Result};

/// Client for the text-generation dependency.
pub struct ComposerClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: String,
}

impl ComposerClient {
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.text_endpoint.clone(),
            model: config.text_model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Request a composition for a style description.
    ///
    /// The returned composition is already normalized.
    pub async fn request(&self, style: &str) -> Result<MusicComposition> {
        let prompt = composition_prompt(style);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        // the service wraps content in a chat envelope; a bare reply is
        // treated as the content itself
        let content = match serde_json::from_str::<ChatResponse>(&body) {
            Ok(envelope) => envelope
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .filter(|content| !content.is_empty())
                .unwrap_or(body),
            Err(_) => body,
        };

        debug!(reply = %content, "composition reply");
        let mut composition = parse_composition(&content)?;
        debug!(
            bpm = composition.bpm,
            duration = composition.duration,
            tracks = composition.tracks.len(),
            notes = composition.note_count(),
            "received composition"
        );
        composition.normalize();
        Ok(composition)
    }
}

/// Parse a composition from reply text: direct JSON first, then the first
/// balanced `{...}` region inside the text.
pub fn parse_composition(content: &str) -> Result<MusicComposition> {
    if let Ok(composition) = serde_json::from_str::<MusicComposition>(content) {
        return Ok(composition);
    }

    let Some(candidate) = extract_json_object(content) else {
        return Err(Error::MalformedResponse(
            "reply contains no JSON object".to_string(),
        ));
    };
    serde_json::from_str::<MusicComposition>(candidate)
        .map_err(|e| Error::MalformedResponse(format!("embedded JSON did not parse: {e}")))
}

/// First balanced `{...}` region of `text`, string literals respected.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// The instruction sent to the text-generation service.
fn composition_prompt(style: &str) -> String {
    format!(
        r#"Generate a JSON music composition for a {style} style song.
The JSON should have this structure:
{{
  "bpm": <tempo number between 60-180>,
  "duration": <duration in seconds, 20-40>,
  "tracks": [
    {{
      "instrument": "<one of: synth, amsynth, fmsynth, duosynth, membrane, metal, pluck, piano>",
      "volume": <volume in dB, -20 to 0>,
      "notes": [
        {{"note": "<note like C4, D#5, etc>", "duration": "<duration like 4n, 8n, 2n>", "time": "<time in format 0:0:0>"}}
      ]
    }}
  ]
}}

Create a rich composition with at least 3-5 different instruments playing harmonically. Include melody, bass, chords, and percussion. Use varied note durations and create interesting musical phrases. Ensure the music fills the entire specified duration (20-40 seconds) and that all tracks contain notes throughout that period. Make it sound like {style} music. Only respond with valid JSON, no additional text."#
    )
}
