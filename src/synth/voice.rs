// Voice synthesis - Procedural percussion + tonal undertone
//
// Each of the four voices renders a short PCM buffer that mixes a percussive
// component (damped sine / noise) with a sine at a fixed musical pitch:
//   x = drum_gain * drum + note_gain * note
// The buffer is rendered once per gain setting and replayed on every trigger.

use crate::synth::envelope::{EnvelopeParams, PercussiveEnvelope, ms_to_samples};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Number of rhythmic voices
pub const VOICE_COUNT: usize = 4;

/// Output headroom applied before conversion to 16-bit
const HEADROOM: f64 = 0.9;

/// The four rhythmic voices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceKind {
    /// Blue lane, fires on every step unless muted
    Kick,
    /// Orange lane
    Snare,
    /// Green lane
    HatOpen,
    /// Pink lane
    HatClosed,
}

impl VoiceKind {
    pub const ALL: [VoiceKind; VOICE_COUNT] = [
        VoiceKind::Kick,
        VoiceKind::Snare,
        VoiceKind::HatOpen,
        VoiceKind::HatClosed,
    ];

    /// Stable index used for per-voice arrays
    pub fn index(self) -> usize {
        match self {
            VoiceKind::Kick => 0,
            VoiceKind::Snare => 1,
            VoiceKind::HatOpen => 2,
            VoiceKind::HatClosed => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Short lowercase name, used for persisted keys and command parsing
    pub fn name(self) -> &'static str {
        match self {
            VoiceKind::Kick => "kick",
            VoiceKind::Snare => "snare",
            VoiceKind::HatOpen => "hat_open",
            VoiceKind::HatClosed => "hat_closed",
        }
    }

    /// Accepts the voice name or its lane colour
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "kick" | "blue" => Some(VoiceKind::Kick),
            "snare" | "orange" => Some(VoiceKind::Snare),
            "hat_open" | "hatopen" | "open" | "green" => Some(VoiceKind::HatOpen),
            "hat_closed" | "hatclosed" | "closed" | "pink" => Some(VoiceKind::HatClosed),
            _ => None,
        }
    }

    /// Synthesis recipe for this voice
    pub fn synth_params(self) -> SynthParams {
        match self {
            VoiceKind::Kick => SynthParams::new(80.0, 440.0, 180.0, 2.0, 150.0),
            VoiceKind::Snare => SynthParams::new(2000.0, 261.63, 140.0, 1.0, 120.0),
            VoiceKind::HatOpen => SynthParams::new(8000.0, 329.63, 120.0, 1.0, 100.0),
            VoiceKind::HatClosed => SynthParams::new(8000.0, 392.0, 60.0, 1.0, 40.0),
        }
    }

    /// Percussive and tonal components for one sample
    #[inline]
    fn components(self, tone_base: f64, tone_note: f64, noise: f64) -> (f64, f64) {
        match self {
            VoiceKind::Kick => (0.7 * tone_base + 0.1 * noise, 0.3 * tone_note),
            VoiceKind::Snare => (0.8 * noise, 0.3 * tone_note),
            VoiceKind::HatOpen => (0.8 * noise, 0.35 * tone_note),
            VoiceKind::HatClosed => (0.7 * noise, 0.4 * tone_note),
        }
    }
}

impl fmt::Display for VoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Synthesis parameters for one voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthParams {
    /// Frequency of the percussive sine (only audible on the kick)
    pub base_freq_hz: f64,
    /// Fixed pitch of the tonal undertone
    pub note_freq_hz: f64,
    /// Total buffer duration in milliseconds
    pub duration_ms: f64,
    pub envelope: EnvelopeParams,
}

impl SynthParams {
    pub fn new(
        base_freq_hz: f64,
        note_freq_hz: f64,
        duration_ms: f64,
        attack_ms: f64,
        decay_ms: f64,
    ) -> Self {
        Self {
            base_freq_hz,
            note_freq_hz,
            duration_ms,
            envelope: EnvelopeParams::new(attack_ms, decay_ms),
        }
    }

    /// Buffer length in samples, never zero
    pub fn len_samples(&self, sample_rate: f64) -> usize {
        ms_to_samples(self.duration_ms, sample_rate).max(1)
    }
}

/// Drum / note mix weights, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub drum: f64,
    pub note: f64,
}

impl Gains {
    pub fn new(drum: f64, note: f64) -> Self {
        Self {
            drum: clamp_unit(drum),
            note: clamp_unit(note),
        }
    }
}

impl Default for Gains {
    fn default() -> Self {
        Self {
            drum: 1.0,
            note: 0.5,
        }
    }
}

/// Clamp to [0, 1], mapping NaN to 0
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Rendered mono 16-bit buffer for one voice
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceBuffer {
    pub kind: VoiceKind,
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl VoiceBuffer {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Render the buffer for `kind` with its built-in recipe
pub fn synth_voice<R: Rng + ?Sized>(
    kind: VoiceKind,
    gains: Gains,
    sample_rate: u32,
    rng: &mut R,
) -> VoiceBuffer {
    synth_buffer(kind, &kind.synth_params(), gains, sample_rate, rng)
}

/// Render a voice buffer from explicit parameters
pub fn synth_buffer<R: Rng + ?Sized>(
    kind: VoiceKind,
    params: &SynthParams,
    gains: Gains,
    sample_rate: u32,
    rng: &mut R,
) -> VoiceBuffer {
    let sr = sample_rate as f64;
    let n = params.len_samples(sr);
    let envelope = PercussiveEnvelope::new(params.envelope, n, sr);

    let two_pi_base = 2.0 * PI * params.base_freq_hz / sr;
    let two_pi_note = 2.0 * PI * params.note_freq_hz / sr;
    let max_amplitude = i16::MAX as f64;

    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        let env = envelope.value(i);

        let tone_base = (two_pi_base * i as f64).sin();
        let tone_note = (two_pi_note * i as f64).sin();
        let noise: f64 = rng.gen_range(-1.0..=1.0);

        let (drum, note) = kind.components(tone_base, tone_note, noise);
        let x = gains.drum * drum + gains.note * note;

        let value = (env * x * HEADROOM * max_amplitude).round();
        samples.push(value.clamp(i16::MIN as f64, i16::MAX as f64) as i16);
    }

    VoiceBuffer {
        kind,
        samples,
        sample_rate,
    }
}
