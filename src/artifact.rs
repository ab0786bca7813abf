//! Artifact ownership for generation results.
//!
//! Each generation produces an audio blob, usually a cover image, and the
//! composition it was rendered from. The store owns at most one
//! generation's files at a time: writing a new generation first deletes the
//! previous one's files, and dropping the store releases whatever it still
//! holds. Nothing accumulates across repeated runs.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::composition::MusicComposition;
use crate::cover::CoverImage;
use crate::error::Result;
use crate::render::RenderedAudio;

/// Filesystem-safe basename derived from a style description.
///
/// Whitespace runs become single underscores, path-hostile characters are
/// dropped, and the result is lowercased and length-bounded. An empty style
/// falls back to `untitled`.
pub fn artifact_basename(style: &str) -> String {
    let mut base = String::new();
    let mut last_was_separator = true;
    for c in style.trim().to_lowercase().chars() {
        if c.is_whitespace() {
            if !last_was_separator {
                base.push('_');
                last_was_separator = true;
            }
        } else if c.is_alphanumeric() || c == '_' || c == '-' {
            base.push(c);
            last_was_separator = false;
        }
    }
    let base: String = base.trim_end_matches('_').chars().take(64).collect();
    if base.is_empty() {
        "untitled".to_string()
    } else {
        base
    }
}

/// Paths written for one generation.
#[derive(Debug, Clone)]
pub struct StoredArtifacts {
    pub audio: PathBuf,
    pub cover: Option<PathBuf>,
    pub composition: PathBuf,
}

/// Owns the latest generation's files, releasing the previous set on
/// replacement and everything on drop.
pub struct ArtifactStore {
    dir: PathBuf,
    current: Vec<PathBuf>,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            current: Vec::new(),
        })
    }

    /// Write one generation's artifacts, replacing whatever was stored
    /// before.
    pub fn store(
        &mut self,
        style: &str,
        audio: &RenderedAudio,
        cover: Option<&CoverImage>,
        composition: &MusicComposition,
    ) -> Result<StoredArtifacts> {
        self.release_current();

        let base = artifact_basename(style);

        let audio_path = self.dir.join(format!("{base}_music.wav"));
        fs::write(&audio_path, &audio.bytes)?;
        self.current.push(audio_path.clone());

        let cover_path = match cover {
            Some(image) => {
                let path = self.dir.join(format!("{base}_cover.{}", image.extension()));
                fs::write(&path, &image.bytes)?;
                self.current.push(path.clone());
                Some(path)
            }
            None => None,
        };

        let composition_path = self.dir.join(format!("{base}_composition.json"));
        let json = serde_json::to_string_pretty(composition)
            .unwrap_or_else(|_| "{}".to_string());
        fs::write(&composition_path, json)?;
        self.current.push(composition_path.clone());

        debug!(dir = %self.dir.display(), base, "stored generation artifacts");

        Ok(StoredArtifacts {
            audio: audio_path,
            cover: cover_path,
            composition: composition_path,
        })
    }

    /// Paths currently owned by the store.
    pub fn paths(&self) -> &[PathBuf] {
        &self.current
    }

    /// Release everything the store holds.
    pub fn clear(&mut self) {
        self.release_current();
    }

    /// Relinquish ownership of the current files, leaving them on disk.
    ///
    /// This is the "download" path: once persisted, the files outlive the
    /// store and the session.
    pub fn persist(mut self) -> Vec<PathBuf> {
        self.current.drain(..).collect()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn release_current(&mut self) {
        for path in self.current.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "released artifact"),
                Err(e) => warn!(path = %path.display(), error = %e, "could not release artifact"),
            }
        }
    }
}

impl Drop for ArtifactStore {
    fn drop(&mut self) {
        self.release_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basenames_are_filesystem_safe() {
        assert_eq!(artifact_basename("chill lo-fi"), "chill_lo-fi");
        assert_eq!(artifact_basename("  Epic   Orchestral  "), "epic_orchestral");
        assert_eq!(artifact_basename("drum & bass / 174bpm"), "drum_bass_174bpm");
        assert_eq!(artifact_basename(""), "untitled");
        assert_eq!(artifact_basename("///"), "untitled");
    }

    #[test]
    fn basenames_are_length_bounded() {
        let long = "x".repeat(500);
        assert!(artifact_basename(&long).chars().count() <= 64);
    }
}
