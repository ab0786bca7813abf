//! Tests for composition recovery from upstream reply text and for
//! defensive normalization of untrusted compositions.

use aria::compose::parse_composition;
use aria::composition::{MusicComposition, MAX_BPM, MIN_DURATION};
use aria::Error;

const COMPOSITION: &str = r#"{
  "bpm": 120,
  "duration": 30,
  "tracks": [
    {
      "instrument": "synth",
      "volume": -6,
      "notes": [
        {"note": "C4", "duration": "4n", "time": "0:0:0"},
        {"note": "E4", "duration": "4n", "time": "0:1:0"},
        {"note": "G4", "duration": "2n", "time": "0:2:0"}
      ]
    },
    {
      "instrument": "membrane",
      "notes": [
        {"note": "C2", "duration": "8n", "time": "0:0:0"}
      ]
    }
  ]
}"#;

#[test]
fn direct_json_parses() {
    let composition = parse_composition(COMPOSITION).unwrap();
    assert_eq!(composition.bpm, 120.0);
    assert_eq!(composition.duration, 30.0);
    assert_eq!(composition.tracks.len(), 2);
    assert_eq!(composition.tracks[0].volume, Some(-6.0));
    assert_eq!(composition.tracks[1].volume, None);
    assert_eq!(composition.note_count(), 4);
}

#[test]
fn json_embedded_in_chat_prose_is_recovered() {
    let reply = format!(
        "Sure! Here is a composition for you:\n\n{COMPOSITION}\n\nEnjoy the music!"
    );
    let composition = parse_composition(&reply).unwrap();
    assert_eq!(composition.bpm, 120.0);
    assert_eq!(composition.note_count(), 4);
}

#[test]
fn compact_inline_json_is_recovered() {
    let reply = r#"Here is the result: {"bpm":120,"duration":25,"tracks":[{"instrument":"pluck","notes":[{"note":"A3","duration":"8n","time":"0:0:0"}]}]} thanks"#;
    let composition = parse_composition(reply).unwrap();
    assert_eq!(composition.duration, 25.0);
    assert_eq!(composition.tracks[0].instrument, "pluck");
}

#[test]
fn refusal_text_is_malformed() {
    let err = parse_composition("I am unable to produce music notation.").unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[test]
fn truncated_json_is_malformed() {
    let truncated = &COMPOSITION[..COMPOSITION.len() / 2];
    assert!(parse_composition(truncated).is_err());
}

#[test]
fn normalization_clamps_out_of_contract_values() {
    let reply = r#"{"bpm": 999, "duration": 3, "tracks": [{"instrument": "synth", "volume": -200, "notes": []}]}"#;
    let mut composition = parse_composition(reply).unwrap();
    composition.normalize();
    assert_eq!(composition.bpm, MAX_BPM);
    assert_eq!(composition.duration, MIN_DURATION);
    assert!(composition.tracks[0].volume.unwrap() >= -40.0);
}

#[test]
fn missing_tracks_become_an_empty_degenerate_composition() {
    let mut composition: MusicComposition =
        serde_json::from_str(r#"{"bpm": 100, "duration": 30}"#).unwrap();
    composition.normalize();
    assert!(composition.tracks.is_empty());
    assert_eq!(composition.note_count(), 0);
}
