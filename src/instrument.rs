//! Virtual instrument voices.
//!
//! Each supported synthesis kind is one variant of a closed enum, with one
//! voice function per variant. `from_name` maps the instrument identifiers
//! the composition generator is asked to use onto variants; anything it does
//! not recognize falls back to the plain synth so one bad instrument name
//! never fails a whole render.
//!
//! # Voices
//!
//! - `synth` - triangle oscillator with an ADSR envelope
//! - `amsynth` - sine carrier, amplitude-modulated by a harmonic partner
//! - `fmsynth` - 2-operator FM with a decaying modulation index
//! - `duosynth` - two detuned saws, one carrying vibrato
//! - `membrane` - pitch-swept sine drum with a noise click
//! - `metal` - inharmonic partial stack with fast staggered decay
//! - `pluck` - Karplus-Strong string (noise-excited averaged delay line)
//! - `piano` - harmonic stack with fast attack and exponential decay

use std::f32::consts::TAU;

use rand::Rng;
use tracing::warn;

/// The closed set of synthesis kinds a track can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrument {
    Synth,
    AmSynth,
    FmSynth,
    DuoSynth,
    Membrane,
    Metal,
    Pluck,
    Piano,
}

impl Instrument {
    /// Map an instrument identifier onto a variant, case-insensitively.
    ///
    /// Unknown names fall back to [`Instrument::Synth`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "synth" => Self::Synth,
            "amsynth" => Self::AmSynth,
            "fmsynth" => Self::FmSynth,
            "duosynth" => Self::DuoSynth,
            "membrane" | "membranesynth" => Self::Membrane,
            "metal" | "metalsynth" => Self::Metal,
            "pluck" | "plucksynth" => Self::Pluck,
            "piano" => Self::Piano,
            other => {
                warn!(instrument = other, "unknown instrument, using synth");
                Self::Synth
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Synth => "synth",
            Self::AmSynth => "amsynth",
            Self::FmSynth => "fmsynth",
            Self::DuoSynth => "duosynth",
            Self::Membrane => "membrane",
            Self::Metal => "metal",
            Self::Pluck => "pluck",
            Self::Piano => "piano",
        }
    }

    /// Synthesize one note as a mono buffer, release tail included.
    ///
    /// `duration` is the held length in seconds; the buffer runs a little
    /// longer so envelopes can close. Degenerate inputs yield an empty
    /// buffer rather than an error.
    pub fn render_note(&self, freq: f32, duration: f32, sample_rate: f32) -> Vec<f32> {
        if !(freq > 0.0) || !(sample_rate > 0.0) || !duration.is_finite() || duration < 0.0 {
            return Vec::new();
        }
        let duration = duration.min(60.0);

        let mut voice = match self {
            Self::Synth => synth_voice(freq, duration, sample_rate),
            Self::AmSynth => am_voice(freq, duration, sample_rate),
            Self::FmSynth => fm_voice(freq, duration, sample_rate),
            Self::DuoSynth => duo_voice(freq, duration, sample_rate),
            Self::Membrane => membrane_voice(freq, duration, sample_rate),
            Self::Metal => metal_voice(freq, duration, sample_rate),
            Self::Pluck => pluck_voice(freq, duration, sample_rate),
            Self::Piano => piano_voice(freq, duration, sample_rate),
        };

        fade_tail(&mut voice, sample_rate, 0.01);
        voice
    }
}

/// Envelope level while the note is held.
fn held_level(t: f32, attack: f32, decay: f32, sustain: f32) -> f32 {
    if t < attack {
        t / attack
    } else if t < attack + decay {
        1.0 - (1.0 - sustain) * (t - attack) / decay
    } else {
        sustain
    }
}

/// Linear ADSR; release starts at `duration` from wherever the held level is.
fn adsr(t: f32, duration: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> f32 {
    if t < duration {
        held_level(t, attack, decay, sustain)
    } else {
        let progress = (t - duration) / release;
        if progress >= 1.0 {
            0.0
        } else {
            held_level(duration, attack, decay, sustain) * (1.0 - progress)
        }
    }
}

/// Ramp the last `seconds` of a buffer to zero so no voice ends on a click.
fn fade_tail(samples: &mut [f32], sample_rate: f32, seconds: f32) {
    let fade = ((seconds * sample_rate) as usize).min(samples.len());
    if fade == 0 {
        return;
    }
    let start = samples.len() - fade;
    for i in 0..fade {
        samples[start + i] *= 1.0 - i as f32 / fade as f32;
    }
}

fn buffer_for(duration: f32, release: f32, sample_rate: f32) -> Vec<f32> {
    vec![0.0; ((duration + release) * sample_rate).ceil() as usize]
}

fn synth_voice(freq: f32, duration: f32, sample_rate: f32) -> Vec<f32> {
    let release = 0.25;
    let mut out = buffer_for(duration, release, sample_rate);
    let mut phase = 0.0f32;
    for (i, sample) in out.iter_mut().enumerate() {
        let t = i as f32 / sample_rate;
        let tri = 4.0 * (phase - 0.5).abs() - 1.0;
        *sample = 0.35 * tri * adsr(t, duration, 0.008, 0.12, 0.7, release);
        phase += freq / sample_rate;
        phase -= phase.floor();
    }
    out
}

fn am_voice(freq: f32, duration: f32, sample_rate: f32) -> Vec<f32> {
    let release = 0.3;
    // harmonicity 3: the modulator sits a twelfth above the carrier
    let mod_freq = freq * 3.0;
    let mut out = buffer_for(duration, release, sample_rate);
    let mut carrier = 0.0f32;
    let mut modulator = 0.0f32;
    for (i, sample) in out.iter_mut().enumerate() {
        let t = i as f32 / sample_rate;
        let tremolo = 0.75 + 0.25 * (TAU * modulator).sin();
        *sample = 0.35 * (TAU * carrier).sin() * tremolo * adsr(t, duration, 0.01, 0.1, 0.6, release);
        carrier += freq / sample_rate;
        carrier -= carrier.floor();
        modulator += mod_freq / sample_rate;
        modulator -= modulator.floor();
    }
    out
}

fn fm_voice(freq: f32, duration: f32, sample_rate: f32) -> Vec<f32> {
    let release = 0.25;
    let ratio = 2.0;
    let index = 2.0;
    let mut out = buffer_for(duration, release, sample_rate);
    let mut carrier = 0.0f32;
    let mut modulator = 0.0f32;
    for (i, sample) in out.iter_mut().enumerate() {
        let t = i as f32 / sample_rate;
        // brightness settles as the note sustains
        let depth = index * (0.3 + 0.7 * (-t * 3.0).exp());
        let wave = (TAU * carrier + depth * (TAU * modulator).sin()).sin();
        *sample = 0.35 * wave * adsr(t, duration, 0.005, 0.15, 0.6, release);
        carrier += freq / sample_rate;
        carrier -= carrier.floor();
        modulator += freq * ratio / sample_rate;
        modulator -= modulator.floor();
    }
    out
}

fn duo_voice(freq: f32, duration: f32, sample_rate: f32) -> Vec<f32> {
    let release = 0.3;
    let detune = 0.006;
    let vibrato_rate = 5.5;
    let vibrato_depth = 0.005;
    let mut out = buffer_for(duration, release, sample_rate);
    let mut phase_a = 0.0f32;
    let mut phase_b = 0.37f32;
    for (i, sample) in out.iter_mut().enumerate() {
        let t = i as f32 / sample_rate;
        let saw_a = 2.0 * phase_a - 1.0;
        let saw_b = 2.0 * phase_b - 1.0;
        *sample = 0.22 * (saw_a + saw_b) * adsr(t, duration, 0.02, 0.1, 0.75, release);
        let vibrato = 1.0 + vibrato_depth * (TAU * vibrato_rate * t).sin();
        phase_a += freq * (1.0 - detune) / sample_rate;
        phase_a -= phase_a.floor();
        phase_b += freq * (1.0 + detune) * vibrato / sample_rate;
        phase_b -= phase_b.floor();
    }
    out
}

fn membrane_voice(freq: f32, duration: f32, sample_rate: f32) -> Vec<f32> {
    // percussive: body length tracks the written duration only loosely
    let body = (duration + 0.3).clamp(0.35, 1.2);
    let mut out = vec![0.0; (body * sample_rate).ceil() as usize];
    let mut rng = rand::thread_rng();
    let mut phase = 0.0f32;
    for (i, sample) in out.iter_mut().enumerate() {
        let t = i as f32 / sample_rate;
        // pitch sweeps from 2.5x down to the base frequency
        let swept = freq * (1.0 + 1.5 * (-t / 0.04).exp());
        let body_amp = (-t * 7.0).exp();
        let click = rng.gen_range(-1.0f32..1.0) * 0.1 * (-t / 0.01).exp();
        *sample = 0.8 * ((TAU * phase).sin() * body_amp + click);
        phase += swept / sample_rate;
        phase -= phase.floor();
    }
    out
}

fn metal_voice(freq: f32, duration: f32, sample_rate: f32) -> Vec<f32> {
    // modal bell partials, deliberately inharmonic
    const RATIOS: [f32; 4] = [1.0, 2.76, 5.40, 8.93];
    const WEIGHTS: [f32; 4] = [1.0, 0.7, 0.5, 0.35];
    let body = (duration + 0.4).clamp(0.4, 1.5);
    let mut out = vec![0.0; (body * sample_rate).ceil() as usize];
    let mut phases = [0.0f32; 4];
    for (i, sample) in out.iter_mut().enumerate() {
        let t = i as f32 / sample_rate;
        let mut acc = 0.0;
        for (k, (&ratio, &weight)) in RATIOS.iter().zip(WEIGHTS.iter()).enumerate() {
            // higher partials ring out faster
            acc += weight * (TAU * phases[k]).sin() * (-t * (4.0 + k as f32 * 3.0)).exp();
            phases[k] += freq * ratio / sample_rate;
            phases[k] -= phases[k].floor();
        }
        *sample = 0.25 * acc;
    }
    out
}

fn pluck_voice(freq: f32, duration: f32, sample_rate: f32) -> Vec<f32> {
    let body = (duration + 0.3).clamp(0.3, 2.5);
    let mut out = vec![0.0; (body * sample_rate).ceil() as usize];

    // noise-excited delay line, averaged feedback for string damping
    let period = ((sample_rate / freq).round() as usize).max(2);
    let mut rng = rand::thread_rng();
    let mut delay: Vec<f32> = (0..period).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    let decay = 0.996;
    let mut pos = 0usize;
    for sample in out.iter_mut() {
        let next = (pos + 1) % period;
        let filtered = decay * 0.5 * (delay[pos] + delay[next]);
        delay[pos] = filtered;
        *sample = 0.4 * filtered;
        pos = next;
    }
    out
}

fn piano_voice(freq: f32, duration: f32, sample_rate: f32) -> Vec<f32> {
    const WEIGHTS: [f32; 6] = [1.0, 0.55, 0.33, 0.2, 0.12, 0.08];
    let release = 0.25;
    let mut out = buffer_for(duration, release, sample_rate);
    let mut phases = [0.0f32; 6];
    for (i, sample) in out.iter_mut().enumerate() {
        let t = i as f32 / sample_rate;
        let mut acc = 0.0;
        for (k, &weight) in WEIGHTS.iter().enumerate() {
            let partial = (k + 1) as f32;
            acc += weight * (TAU * phases[k]).sin() * (-t * (0.8 + 0.7 * partial)).exp();
            // slight stretch mimics string inharmonicity
            phases[k] += freq * partial * (1.0 + 0.0004 * partial * partial) / sample_rate;
            phases[k] -= phases[k].floor();
        }
        let attack = (t / 0.003).min(1.0);
        let gate = if t < duration {
            1.0
        } else {
            (1.0 - (t - duration) / release).max(0.0)
        };
        *sample = 0.3 * acc * attack * gate;
    }
    out
}
