//! # Aria - Prompt-to-Music Generation
//!
//! Aria turns a free-text music-style description into a short rendered
//! piece of music plus a matching cover image. It orchestrates two
//! third-party generation services and an offline synthesis engine into one
//! workflow per trigger:
//!
//! - **Composition request**: a chat-completion endpoint is asked to emit a
//!   structured composition (tempo, duration, instrument tracks with timed
//!   notes) as JSON, recovered defensively from free text.
//! - **Cover request**: an image endpoint renders album art for the same
//!   style string. Its failure costs only the cover.
//! - **Offline render**: the composition is synthesized against a fixed set
//!   of virtual instruments and mixed down to a WAV blob, in a bounded
//!   amount of work rather than wall-clock playback time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use aria::config::GeneratorConfig;
//! use aria::workflow::Generator;
//!
//! # async fn demo() -> aria::Result<()> {
//! let generator = Generator::new(GeneratorConfig::from_env())?;
//! let generation = generator.generate("chill lo-fi with warm keys").await?;
//! println!(
//!     "{} tracks, {:.0}s of audio",
//!     generation.composition.tracks.len(),
//!     generation.audio.duration,
//! );
//! # Ok(())
//! # }
//! ```
//!
//! Rendering alone needs no network:
//!
//! ```
//! use aria::composition::MusicComposition;
//! use aria::render::{RenderConfig, Renderer};
//!
//! let composition: MusicComposition = serde_json::from_str(
//!     r#"{"bpm": 120, "duration": 20, "tracks": []}"#,
//! ).unwrap();
//! let audio = Renderer::new(RenderConfig::default()).render(&composition).unwrap();
//! assert_eq!(audio.content_type, "audio/wav");
//! ```

pub mod artifact;
pub mod compose;
pub mod composition;
pub mod config;
pub mod cover;
pub mod error;
pub mod instrument;
pub mod playback;
pub mod render;
pub mod theory;
pub mod workflow;

pub use error::{Error, Result};
pub use workflow::{Generation, Generator};
