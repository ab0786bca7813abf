//! The structured music description produced by the composition requestor
//! and consumed by the renderer.
//!
//! The shape mirrors what the text-generation endpoint is asked to emit: a
//! tempo, a total duration, and a list of instrument tracks each holding a
//! timed note sequence. The generator is a third party, so nothing here is
//! trusted: `normalize` clamps every numeric field into its documented range
//! and drops events the transport cannot place.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::theory;

/// Documented tempo range the composition prompt asks for.
pub const MIN_BPM: f32 = 60.0;
pub const MAX_BPM: f32 = 180.0;

/// Documented duration range, in seconds.
pub const MIN_DURATION: f32 = 20.0;
pub const MAX_DURATION: f32 = 40.0;

/// Track volume clamp, in dB.
pub const MIN_VOLUME_DB: f32 = -40.0;
pub const MAX_VOLUME_DB: f32 = 6.0;

/// A complete piece: tempo, length, and one note sequence per instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicComposition {
    #[serde(default)]
    pub bpm: f32,
    #[serde(default)]
    pub duration: f32,
    #[serde(default)]
    pub tracks: Vec<InstrumentTrack>,
}

/// One instrument's part within a composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentTrack {
    pub instrument: String,
    /// Volume offset in dB, applied to every note of the track
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub notes: Vec<NoteEvent>,
}

/// A single pitch/duration/start-time instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Pitch name, e.g. "C4" or "D#5"
    pub note: String,
    /// Symbolic note length, e.g. "8n"
    pub duration: String,
    /// Transport position, e.g. "0:2:0"
    pub time: String,
}

impl MusicComposition {
    /// Clamp every numeric field into its documented range and drop note
    /// events the transport cannot place inside the piece.
    ///
    /// Never fails; violations are logged and repaired. An empty track list
    /// survives normalization and renders as silence.
    pub fn normalize(&mut self) {
        let bpm = clamp_or(self.bpm, MIN_BPM, MAX_BPM, 120.0);
        if bpm != self.bpm {
            warn!(got = self.bpm, using = bpm, "composition bpm out of range");
            self.bpm = bpm;
        }

        let duration = clamp_or(self.duration, MIN_DURATION, MAX_DURATION, 30.0);
        if duration != self.duration {
            warn!(got = self.duration, using = duration, "composition duration out of range");
            self.duration = duration;
        }

        for track in &mut self.tracks {
            if let Some(volume) = track.volume {
                let clamped = clamp_or(volume, MIN_VOLUME_DB, MAX_VOLUME_DB, 0.0);
                if clamped != volume {
                    warn!(
                        instrument = %track.instrument,
                        got = volume,
                        using = clamped,
                        "track volume out of range"
                    );
                    track.volume = Some(clamped);
                }
            }

            let before = track.notes.len();
            let bpm = self.bpm;
            let duration = self.duration;
            track.notes.retain(|event| {
                match theory::transport_time_seconds(&event.time, bpm) {
                    // events the transport cannot place at all are kept for
                    // the renderer to skip with a diagnostic
                    None => true,
                    Some(start) => start <= duration,
                }
            });
            if track.notes.len() != before {
                warn!(
                    instrument = %track.instrument,
                    dropped = before - track.notes.len(),
                    "dropped note events beyond the composition duration"
                );
            }
        }
    }

    /// Total number of note events across all tracks.
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|track| track.notes.len()).sum()
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(note: &str, duration: &str, time: &str) -> NoteEvent {
        NoteEvent {
            note: note.to_string(),
            duration: duration.to_string(),
            time: time.to_string(),
        }
    }

    #[test]
    fn missing_tracks_deserialize_to_empty() {
        let composition: MusicComposition =
            serde_json::from_str(r#"{"bpm": 120, "duration": 30}"#).unwrap();
        assert!(composition.tracks.is_empty());
    }

    #[test]
    fn normalize_clamps_ranges() {
        let mut composition = MusicComposition {
            bpm: 300.0,
            duration: 5.0,
            tracks: vec![InstrumentTrack {
                instrument: "synth".to_string(),
                volume: Some(-80.0),
                notes: vec![],
            }],
        };
        composition.normalize();
        assert_eq!(composition.bpm, MAX_BPM);
        assert_eq!(composition.duration, MIN_DURATION);
        assert_eq!(composition.tracks[0].volume, Some(MIN_VOLUME_DB));
    }

    #[test]
    fn normalize_repairs_non_finite_numbers() {
        let mut composition = MusicComposition {
            bpm: f32::NAN,
            duration: f32::INFINITY,
            tracks: vec![],
        };
        composition.normalize();
        assert_eq!(composition.bpm, 120.0);
        assert_eq!(composition.duration, 30.0);
    }

    #[test]
    fn normalize_drops_events_past_the_end() {
        let mut composition = MusicComposition {
            bpm: 120.0,
            duration: 20.0,
            tracks: vec![InstrumentTrack {
                instrument: "synth".to_string(),
                volume: None,
                notes: vec![
                    event("C4", "4n", "0:0:0"),
                    // bar 40 at 120 bpm starts at 80 s, well past 20 s
                    event("C4", "4n", "40:0:0"),
                    // unplaceable time survives for the renderer to skip
                    event("C4", "4n", "later"),
                ],
            }],
        };
        composition.normalize();
        assert_eq!(composition.tracks[0].notes.len(), 2);
        assert_eq!(composition.note_count(), 2);
    }
}
