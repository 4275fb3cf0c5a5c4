//! Audio feedback module
//!
//! Short cues confirm that an activation registered, which matters when the
//! user cannot look away from the scanner to check. Tones are generated at
//! startup so no binary assets ship with the crate.

use crate::config::AudioFeedbackConfig;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::path::PathBuf;

const SAMPLE_RATE: u32 = 44100;

/// Sound event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEvent {
    /// Any accepted activation
    Activate,
    /// A YES answer committed something
    Confirm,
    /// A NO answer dismissed the prompt
    Cancel,
    /// Speech or another host action failed
    Error,
}

/// Audio feedback player
pub struct AudioFeedback {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    volume: f32,
    theme: SoundTheme,
}

/// WAV data per event; an empty buffer means silent
struct SoundTheme {
    activate: Vec<u8>,
    confirm: Vec<u8>,
    cancel: Vec<u8>,
    error: Vec<u8>,
}

impl SoundTheme {
    fn sound(&self, event: SoundEvent) -> &[u8] {
        match event {
            SoundEvent::Activate => &self.activate,
            SoundEvent::Confirm => &self.confirm,
            SoundEvent::Cancel => &self.cancel,
            SoundEvent::Error => &self.error,
        }
    }
}

impl AudioFeedback {
    /// Open the default output device and load the configured theme
    pub fn new(config: &AudioFeedbackConfig) -> Result<Self, String> {
        if !config.enabled {
            return Err("Audio feedback is disabled".to_string());
        }

        let theme = load_theme(&config.theme)?;

        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| format!("Failed to open audio output: {}", e))?;

        Ok(Self {
            _stream: stream,
            stream_handle,
            volume: config.volume.clamp(0.0, 1.0),
            theme,
        })
    }

    /// Play the cue for `event` without waiting for it to finish
    pub fn play(&self, event: SoundEvent) {
        let data = self.theme.sound(event);
        if data.is_empty() {
            return;
        }

        if let Err(e) = self.play_wav(data) {
            tracing::warn!("Failed to play {:?} cue: {}", event, e);
        }
    }

    fn play_wav(&self, data: &[u8]) -> Result<(), String> {
        let source = Decoder::new(Cursor::new(data.to_vec()))
            .map_err(|e| format!("Failed to decode audio: {}", e))?
            .amplify(self.volume);

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| format!("Failed to create audio sink: {}", e))?;

        sink.append(source);
        sink.detach();

        Ok(())
    }
}

/// Load a sound theme by name or directory path
fn load_theme(theme_name: &str) -> Result<SoundTheme, String> {
    match theme_name {
        "default" => Ok(default_theme()),
        "subtle" => Ok(subtle_theme()),
        "mechanical" => Ok(mechanical_theme()),
        path => load_custom_theme(path),
    }
}

/// Load `activate.wav`, `confirm.wav`, `cancel.wav` and `error.wav` from a
/// directory; missing files leave that event silent
fn load_custom_theme(path: &str) -> Result<SoundTheme, String> {
    let dir = PathBuf::from(path);
    if !dir.is_dir() {
        return Err(format!("Theme directory not found: {}", path));
    }

    let load = |name: &str| std::fs::read(dir.join(name)).unwrap_or_default();

    Ok(SoundTheme {
        activate: load("activate.wav"),
        confirm: load("confirm.wav"),
        cancel: load("cancel.wav"),
        error: load("error.wav"),
    })
}

// === Sound Generation ===

/// Sine segments played back to back, with a linear fade at both ends
fn tones(segments: &[(f32, u32)], fade_ms: u32) -> Vec<u8> {
    let mut samples: Vec<i16> = Vec::new();
    let mut phase = 0.0f32;

    for &(frequency, duration_ms) in segments {
        let count = (SAMPLE_RATE * duration_ms / 1000) as usize;
        let step = 2.0 * std::f32::consts::PI * frequency / SAMPLE_RATE as f32;
        for _ in 0..count {
            samples.push((phase.sin() * 16000.0) as i16);
            phase = (phase + step) % (2.0 * std::f32::consts::PI);
        }
    }

    apply_fade(&mut samples, (SAMPLE_RATE * fade_ms / 1000) as usize);
    encode_wav(&samples, SAMPLE_RATE)
}

fn apply_fade(samples: &mut [i16], fade: usize) {
    let len = samples.len();
    let fade = fade.min(len / 2);
    if fade == 0 {
        return;
    }
    for i in 0..fade {
        let gain = i as f32 / fade as f32;
        samples[i] = (samples[i] as f32 * gain) as i16;
        samples[len - 1 - i] = (samples[len - 1 - i] as f32 * gain) as i16;
    }
}

/// Short burst of alternating samples with exponential decay
fn click(duration_ms: u32) -> Vec<u8> {
    let count = (SAMPLE_RATE * duration_ms / 1000) as usize;
    let samples: Vec<i16> = (0..count)
        .map(|i| {
            let envelope = (-5.0 * i as f32 / count as f32).exp();
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            (sign * envelope * 12000.0) as i16
        })
        .collect();
    encode_wav(&samples, SAMPLE_RATE)
}

/// Encode mono 16-bit PCM as WAV
fn encode_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut wav = Vec::with_capacity(44 + data_len as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    wav
}

// === Built-in Themes ===

/// Clear tones; the activation boop is the most frequent sound so it is short
fn default_theme() -> SoundTheme {
    SoundTheme {
        activate: tones(&[(660.0, 70)], 10),
        confirm: tones(&[(523.0, 80), (784.0, 100)], 15),
        cancel: tones(&[(784.0, 80), (523.0, 100)], 15),
        error: tones(&[(300.0, 100), (200.0, 120)], 30),
    }
}

fn subtle_theme() -> SoundTheme {
    SoundTheme {
        activate: tones(&[(1200.0, 35)], 8),
        confirm: tones(&[(1000.0, 50)], 10),
        cancel: tones(&[(700.0, 50)], 10),
        error: tones(&[(400.0, 50), (300.0, 50)], 15),
    }
}

fn mechanical_theme() -> SoundTheme {
    SoundTheme {
        activate: click(15),
        confirm: click(30),
        cancel: click(20),
        error: tones(&[(150.0, 150)], 20),
    }
}
