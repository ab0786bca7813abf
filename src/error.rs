//! Error types for the generation pipeline.

use thiserror::Error;

/// Error type covering every stage of the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("style description is empty")]
    EmptyStyle,

    #[error("a generation is already in flight")]
    Busy,

    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("could not parse a composition from the upstream reply: {0}")]
    MalformedResponse(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("render failed: {0}")]
    Render(String),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
