//! Renderer properties: bounded output length, graceful handling of
//! malformed compositions, and independence from note count.

use std::time::{Duration, Instant};

use aria::composition::{InstrumentTrack, MusicComposition, NoteEvent};
use aria::render::{RenderConfig, Renderer};

fn event(note: &str, duration: &str, time: &str) -> NoteEvent {
    NoteEvent {
        note: note.to_string(),
        duration: duration.to_string(),
        time: time.to_string(),
    }
}

fn track(instrument: &str, notes: Vec<NoteEvent>) -> InstrumentTrack {
    InstrumentTrack {
        instrument: instrument.to_string(),
        volume: None,
        notes,
    }
}

#[test]
fn empty_composition_renders_silence_of_the_written_duration() {
    let composition = MusicComposition {
        bpm: 120.0,
        duration: 5.0,
        tracks: vec![],
    };
    let audio = Renderer::new(RenderConfig::default()).render(&composition).unwrap();
    assert_eq!(audio.stats.sample_count, (6.0f32 * 44100.0).ceil() as usize);
    assert_eq!(audio.stats.peak, 0.0);
    assert_eq!(audio.stats.scheduled_events, 0);
}

#[test]
fn unknown_instrument_falls_back_and_still_sounds() {
    let composition = MusicComposition {
        bpm: 120.0,
        duration: 4.0,
        tracks: vec![track("kazoo", vec![event("C4", "2n", "0:0:0")])],
    };
    let audio = Renderer::new(RenderConfig::default()).render(&composition).unwrap();
    assert_eq!(audio.stats.scheduled_events, 1);
    assert!(audio.stats.rms > 0.001, "fallback voice was silent");
}

#[test]
fn unreadable_events_are_skipped_not_fatal() {
    let composition = MusicComposition {
        bpm: 120.0,
        duration: 4.0,
        tracks: vec![track(
            "synth",
            vec![
                event("C4", "4n", "0:0:0"),
                event("X9", "4n", "0:1:0"),
                event("D4", "4n", "not a time"),
                event("E4", "4n", "99:0:0"),
            ],
        )],
    };
    let audio = Renderer::new(RenderConfig::default()).render(&composition).unwrap();
    assert_eq!(audio.stats.scheduled_events, 1);
    assert_eq!(audio.stats.skipped_events, 3);
    assert!(audio.stats.rms > 0.0);
}

#[test]
fn runaway_durations_are_hard_capped() {
    let composition = MusicComposition {
        bpm: 120.0,
        duration: 100_000.0,
        tracks: vec![],
    };
    let config = RenderConfig::default();
    let cap = ((config.max_duration + config.tail_seconds) * config.sample_rate as f32).ceil() as usize;
    let audio = Renderer::new(config).render(&composition).unwrap();
    assert_eq!(audio.stats.sample_count, cap);
}

#[test]
fn non_finite_durations_render_only_the_tail() {
    let composition = MusicComposition {
        bpm: 120.0,
        duration: f32::NAN,
        tracks: vec![],
    };
    let audio = Renderer::new(RenderConfig::default()).render(&composition).unwrap();
    assert_eq!(audio.stats.sample_count, 44100);
}

#[test]
fn render_cost_does_not_scale_with_wall_clock_duration() {
    // a ten-second piece must render in far less than ten seconds; the
    // renderer computes samples instead of waiting out playback
    let dense_notes: Vec<NoteEvent> = (0..80)
        .map(|i| event("A3", "8n", &format!("{}:{}:0", i / 8, (i % 8) / 2)))
        .collect();
    let composition = MusicComposition {
        bpm: 120.0,
        duration: 10.0,
        tracks: vec![track("fmsynth", dense_notes)],
    };

    let started = Instant::now();
    let audio = Renderer::new(RenderConfig::default()).render(&composition).unwrap();
    let elapsed = started.elapsed();

    assert!(audio.stats.scheduled_events > 0);
    assert!(
        elapsed < Duration::from_secs(8),
        "render took {elapsed:?} for a 10s piece"
    );
}

#[test]
fn note_count_does_not_change_output_length() {
    let sparse = MusicComposition {
        bpm: 120.0,
        duration: 6.0,
        tracks: vec![track("synth", vec![event("C4", "4n", "0:0:0")])],
    };
    let dense = MusicComposition {
        bpm: 120.0,
        duration: 6.0,
        tracks: vec![track(
            "synth",
            (0..48)
                .map(|i| event("C4", "16n", &format!("{}:{}:{}", i / 16, (i / 4) % 4, i % 4)))
                .collect(),
        )],
    };

    let renderer = Renderer::new(RenderConfig::default());
    let a = renderer.render(&sparse).unwrap();
    let b = renderer.render(&dense).unwrap();
    assert_eq!(a.stats.sample_count, b.stats.sample_count);
}

#[test]
fn mixed_tracks_stay_within_full_scale() {
    let chord: Vec<NoteEvent> = ["C3", "E3", "G3", "C4", "E4", "G4"]
        .iter()
        .map(|note| event(note, "1n", "0:0:0"))
        .collect();
    let composition = MusicComposition {
        bpm: 120.0,
        duration: 4.0,
        tracks: vec![
            track("synth", chord.clone()),
            track("duosynth", chord.clone()),
            track("piano", chord),
        ],
    };
    let audio = Renderer::new(RenderConfig::default()).render(&composition).unwrap();
    assert!(audio.stats.peak <= 1.0 + 1e-4, "peak {}", audio.stats.peak);
    assert!(audio.stats.rms > 0.01);
}
