// Glitch modulation - Per-trigger volume / pitch jitter for sampled voices

use crate::synth::voice::clamp_unit;
use rand::Rng;

const VOLUME_JITTER_SCALE: f64 = 4.0;
const PITCH_JITTER_SCALE: f64 = 1.5 / 4.0;

const VOLUME_RANGE: (f64, f64) = (0.0, 2.0);
const PITCH_RANGE: (f64, f64) = (0.5, 2.0);

/// Volume and playback-rate multipliers for one trigger
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlitchSample {
    pub volume: f32,
    pub pitch: f32,
}

impl GlitchSample {
    /// No modulation
    pub const NEUTRAL: GlitchSample = GlitchSample {
        volume: 1.0,
        pitch: 1.0,
    };

    /// Draw a fresh pair for `level` in [0, 1].
    ///
    /// One uniform draw in [-1, 1] is taken for volume and one for pitch on
    /// every call, even at level 0 where the jitter magnitude is zero.
    pub fn draw<R: Rng + ?Sized>(level: f64, rng: &mut R) -> Self {
        let level = clamp_unit(level);
        let volume_jitter = VOLUME_JITTER_SCALE * level;
        let pitch_jitter = PITCH_JITTER_SCALE * level;

        let volume_draw: f64 = rng.gen_range(-1.0..=1.0);
        let pitch_draw: f64 = rng.gen_range(-1.0..=1.0);

        let volume = (1.0 + volume_draw * volume_jitter).clamp(VOLUME_RANGE.0, VOLUME_RANGE.1);
        let pitch = (1.0 + pitch_draw * pitch_jitter).clamp(PITCH_RANGE.0, PITCH_RANGE.1);

        Self {
            volume: volume as f32,
            pitch: pitch as f32,
        }
    }
}

impl Default for GlitchSample {
    fn default() -> Self {
        Self::NEUTRAL
    }
}
