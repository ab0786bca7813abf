//! Local audio playback through the default output device.
//!
//! Streams a rendered mono buffer to whatever device cpal finds, adapting
//! the rate by stepped resampling when the device does not run at the
//! render rate. Playback blocks the calling thread and is hard-capped at
//! the buffer length plus two seconds, so a stalled device cannot hang the
//! caller indefinitely.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use crate::error::{Error, Result};

struct Playback {
    samples: Vec<f32>,
    position: f32,
    step: f32,
    finished: bool,
}

/// Play a mono buffer, blocking until it has been streamed out.
pub fn play_buffer(samples: &[f32], sample_rate: u32) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::AudioDevice("no audio output device found".to_string()))?;
    let config = device
        .default_output_config()
        .map_err(|e| Error::AudioDevice(format!("no usable output config: {e}")))?;
    info!(
        device = device.name().unwrap_or_else(|_| "unknown".to_string()),
        rate = config.sample_rate().0,
        "playing through default output"
    );

    let device_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let state = Arc::new(Mutex::new(Playback {
        samples: samples.to_vec(),
        position: 0.0,
        step: sample_rate as f32 / device_rate as f32,
        finished: false,
    }));

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            build_stream::<f32>(&device, &config.into(), state.clone(), channels)
        }
        cpal::SampleFormat::I16 => {
            build_stream::<i16>(&device, &config.into(), state.clone(), channels)
        }
        cpal::SampleFormat::U16 => {
            build_stream::<u16>(&device, &config.into(), state.clone(), channels)
        }
        other => {
            return Err(Error::AudioDevice(format!(
                "unsupported sample format {other:?}"
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| Error::AudioDevice(format!("could not start stream: {e}")))?;

    // bounded wait: buffer length plus a margin, never longer
    let cap = Duration::from_secs_f32(samples.len() as f32 / sample_rate as f32 + 2.0);
    let started = Instant::now();
    loop {
        std::thread::sleep(Duration::from_millis(50));
        let done = state.lock().map(|s| s.finished).unwrap_or(true);
        if done || started.elapsed() > cap {
            break;
        }
    }

    Ok(())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    state: Arc<Mutex<Playback>>,
    channels: usize,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut state = match state.lock() {
                    Ok(state) => state,
                    Err(_) => return,
                };
                for frame in data.chunks_mut(channels) {
                    let index = state.position as usize;
                    let value = if index < state.samples.len() {
                        state.samples[index]
                    } else {
                        state.finished = true;
                        0.0
                    };
                    for out in frame.iter_mut() {
                        *out = T::from_sample(value);
                    }
                    state.position += state.step;
                }
            },
            |err| error!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| Error::AudioDevice(format!("could not build stream: {e}")))?;

    Ok(stream)
}

/// Decode a WAV file to mono samples and play it.
pub fn play_wav(path: &Path) -> Result<()> {
    let (samples, sample_rate) = load_wav(path)?;
    play_buffer(&samples, sample_rate)
}

/// Read a WAV file as mono f32 samples, downmixing multi-channel files.
pub fn load_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| Error::AudioDevice(format!("could not open {}: {e}", path.display())))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::AudioDevice(format!("could not decode {}: {e}", path.display())))?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 / max))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::AudioDevice(format!("could not decode {}: {e}", path.display())))?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok((samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wav_round_trips_a_mono_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("aria_playback_test.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..2205 {
            let t = i as f32 / 22050.0;
            let v = (std::f32::consts::TAU * 440.0 * t).sin() * 0.5;
            writer.write_sample((v * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let (samples, rate) = load_wav(&path).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(samples.len(), 2205);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        assert!(peak > 0.4 && peak < 0.6, "peak {peak}");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_files_do_not_panic() {
        assert!(load_wav(Path::new("/nonexistent/nothing.wav")).is_err());
    }
}
