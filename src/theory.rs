//! Resolution of symbolic musical tokens into concrete values.
//!
//! Compositions arrive with pitches as note names (`"D#5"`), note lengths as
//! subdivision tokens (`"8n"`, `"4n."`, `"2t"`, `"1m"`), and start times as
//! transport positions (`"bar:beat:sixteenth"`). The renderer needs hertz
//! and seconds. All three resolvers return `None` for tokens they cannot
//! make sense of; the caller decides whether to skip or substitute.
//!
//! Assumes 4/4 time throughout, matching the transport the compositions are
//! written against.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // letter + optional accidental + octave, e.g. "C4", "d#5", "Bb2", "A-1"
    static ref NOTE_RE: Regex = Regex::new(r"^([A-Ga-g])([#b]?)(-?\d{1,2})$").unwrap();
}

/// Frequency in Hz for a note name, equal temperament, A4 = 440 Hz.
///
/// Case-insensitive. Returns `None` for anything that is not a note name or
/// that falls outside the MIDI range.
pub fn note_frequency(name: &str) -> Option<f32> {
    let caps = NOTE_RE.captures(name.trim())?;

    let letter = caps.get(1)?.as_str().to_ascii_lowercase();
    let semitone: i32 = match letter.as_bytes()[0] {
        b'c' => 0,
        b'd' => 2,
        b'e' => 4,
        b'f' => 5,
        b'g' => 7,
        b'a' => 9,
        b'b' => 11,
        _ => return None,
    };
    let accidental: i32 = match caps.get(2)?.as_str() {
        "#" => 1,
        "b" => -1,
        _ => 0,
    };
    let octave: i32 = caps.get(3)?.as_str().parse().ok()?;

    // C4 = 60, A4 = 69
    let midi = (octave + 1) * 12 + semitone + accidental;
    if !(0..=127).contains(&midi) {
        return None;
    }

    Some(440.0 * 2f32.powf((midi as f32 - 69.0) / 12.0))
}

/// Seconds for a symbolic note-length token at the given tempo.
///
/// `<n>n` is a straight 1/n division of a whole note, `<n>t` the triplet
/// version (2/3 of straight), `<n>m` is n whole measures, and a trailing
/// `.` multiplies by 1.5. Bare numbers are taken as literal seconds.
pub fn note_length_seconds(token: &str, bpm: f32) -> Option<f32> {
    if bpm <= 0.0 || !bpm.is_finite() {
        return None;
    }
    let token = token.trim().to_ascii_lowercase();
    if token.is_empty() {
        return None;
    }

    if let Ok(seconds) = token.parse::<f32>() {
        return (seconds.is_finite() && seconds >= 0.0).then_some(seconds);
    }

    let (token, dot) = match token.strip_suffix('.') {
        Some(rest) => (rest, 1.5),
        None => (token.as_str(), 1.0),
    };

    let unit = token.chars().last()?;
    let digits = &token[..token.len() - unit.len_utf8()];
    let n: f32 = digits.parse().ok()?;
    if n <= 0.0 || !n.is_finite() {
        return None;
    }

    let whole = 4.0 * 60.0 / bpm;
    let base = match unit {
        'n' => whole / n,
        't' => whole / n * (2.0 / 3.0),
        'm' => whole * n,
        _ => return None,
    };

    Some(base * dot)
}

/// Seconds for a transport position token at the given tempo.
///
/// Accepts `bar:beat:sixteenth` (sixteenth optional, fields may be
/// fractional) in 4/4, or a bare number of seconds.
pub fn transport_time_seconds(token: &str, bpm: f32) -> Option<f32> {
    if bpm <= 0.0 || !bpm.is_finite() {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if !token.contains(':') {
        let seconds: f32 = token.parse().ok()?;
        return (seconds.is_finite() && seconds >= 0.0).then_some(seconds);
    }

    let mut parts = token.split(':');
    let bars: f32 = parts.next()?.trim().parse().ok()?;
    let beats: f32 = match parts.next() {
        Some(s) => s.trim().parse().ok()?,
        None => 0.0,
    };
    let sixteenths: f32 = match parts.next() {
        Some(s) => s.trim().parse().ok()?,
        None => 0.0,
    };
    if parts.next().is_some() {
        return None;
    }
    if bars < 0.0 || beats < 0.0 || sixteenths < 0.0 {
        return None;
    }

    let beat = 60.0 / bpm;
    let seconds = bars * 4.0 * beat + beats * beat + sixteenths * beat / 4.0;
    seconds.is_finite().then_some(seconds)
}
