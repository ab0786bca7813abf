//! Orchestration of one generation workflow.
//!
//! A generation is a single linear pipeline per trigger: validate the style
//! string, request cover art and a composition from their upstreams, render
//! the composition offline, and hand back the result. The cover request is
//! joined concurrently with the composition request and its failure only
//! costs the cover; a composition or render failure aborts the run. An
//! atomic gate refuses a second workflow while one is in flight and is
//! released on every exit path, so a failed run leaves the generator idle.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::compose::ComposerClient;
use crate::composition::MusicComposition;
use crate::config::GeneratorConfig;
use crate::cover::{CoverClient, CoverImage};
use crate::error::{Error, Result};
use crate::render::{RenderedAudio, Renderer};

/// The outcome of one successful workflow run.
#[derive(Debug)]
pub struct Generation {
    pub style: String,
    pub composition: MusicComposition,
    pub audio: RenderedAudio,
    /// Missing when the cover request failed or was disabled
    pub cover: Option<CoverImage>,
}

/// Owns the upstream clients and the renderer; one workflow at a time.
pub struct Generator {
    composer: ComposerClient,
    cover: CoverClient,
    renderer: Renderer,
    fetch_cover: bool,
    in_flight: AtomicBool,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Ok(Self {
            composer: ComposerClient::new(&config)?,
            cover: CoverClient::new(&config)?,
            renderer: Renderer::new(config.render.clone()),
            fetch_cover: config.fetch_cover,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Run the full pipeline for a style description.
    ///
    /// The style is validated before any network call; an empty string
    /// never reaches an upstream.
    pub async fn generate(&self, style: &str) -> Result<Generation> {
        let style = validated(style)?;
        let _guard = self.acquire()?;

        info!(style, "starting generation");
        let (cover, composition) =
            tokio::join!(self.request_cover(style), self.composer.request(style));
        let composition = composition?;

        self.finish(style, composition, cover)
    }

    /// Run the pipeline from a locally supplied composition, skipping the
    /// composition request. The cover request and render behave as in
    /// [`Generator::generate`].
    pub async fn generate_from(
        &self,
        style: &str,
        mut composition: MusicComposition,
    ) -> Result<Generation> {
        let style = validated(style)?;
        let _guard = self.acquire()?;

        info!(style, "rendering supplied composition");
        composition.normalize();
        let cover = self.request_cover(style).await;

        self.finish(style, composition, cover)
    }

    fn finish(
        &self,
        style: &str,
        composition: MusicComposition,
        cover: Option<CoverImage>,
    ) -> Result<Generation> {
        let audio = self.renderer.render(&composition)?;
        info!(
            style,
            seconds = audio.duration,
            events = audio.stats.scheduled_events,
            "generation complete"
        );
        Ok(Generation {
            style: style.to_string(),
            composition,
            audio,
            cover,
        })
    }

    /// Cover failure is logged and degrades to `None`; it never aborts the
    /// workflow.
    async fn request_cover(&self, style: &str) -> Option<CoverImage> {
        if !self.fetch_cover {
            return None;
        }
        match self.cover.request(style).await {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(error = %e, "cover generation failed, continuing without one");
                None
            }
        }
    }

    fn acquire(&self) -> Result<InFlightGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::Busy);
        }
        Ok(InFlightGuard(&self.in_flight))
    }
}

fn validated(style: &str) -> Result<&str> {
    let style = style.trim();
    if style.is_empty() {
        return Err(Error::EmptyStyle);
    }
    Ok(style)
}

/// Releases the in-flight gate when dropped, whatever the exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_styles_are_rejected_before_anything_else() {
        assert!(matches!(validated(""), Err(Error::EmptyStyle)));
        assert!(matches!(validated("   \t  "), Err(Error::EmptyStyle)));
        assert_eq!(validated("  ambient  ").unwrap(), "ambient");
    }
}
