// Sampler voice - One-shot playback of a cached voice buffer or loaded sample
// Pitch is a playback-rate multiplier, read with linear interpolation

use crate::audio::format_conversion::i16_to_f32;
use crate::sampler::loader::Sample;
use crate::synth::voice::VoiceBuffer;
use std::sync::Arc;

/// Audio a voice plays on trigger
#[derive(Debug, Clone)]
pub enum PlaybackSource {
    /// Synthesized 16-bit buffer from the current voice bank
    Synth(Arc<VoiceBuffer>),
    /// Externally supplied sample
    Sample(Arc<Sample>),
}

impl PlaybackSource {
    pub fn len(&self) -> usize {
        match self {
            PlaybackSource::Synth(buffer) => buffer.samples.len(),
            PlaybackSource::Sample(sample) => sample.data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_rate(&self) -> u32 {
        match self {
            PlaybackSource::Synth(buffer) => buffer.sample_rate,
            PlaybackSource::Sample(sample) => sample.sample_rate,
        }
    }

    pub fn is_sample(&self) -> bool {
        matches!(self, PlaybackSource::Sample(_))
    }

    /// Frame `index` as f32 in [-1, 1], 0 past the end
    #[inline]
    fn frame(&self, index: usize) -> f32 {
        match self {
            PlaybackSource::Synth(buffer) => buffer
                .samples
                .get(index)
                .map(|&s| i16_to_f32(s))
                .unwrap_or(0.0),
            PlaybackSource::Sample(sample) => sample.data.get(index).copied().unwrap_or(0.0),
        }
    }
}

/// Plays one source from its start to its end, then goes idle.
///
/// A finished source stays referenced until the next `trigger` or
/// `force_stop` hands it back, so the caller decides where it is dropped.
#[derive(Debug, Clone)]
pub struct SamplerVoice {
    source: Option<PlaybackSource>,
    playing: bool,
    position: f64,
    pitch_step: f64,
    volume: f32,
    output_rate: f32,
}

impl SamplerVoice {
    pub fn new(output_rate: f32) -> Self {
        Self {
            source: None,
            playing: false,
            position: 0.0,
            pitch_step: 1.0,
            volume: 1.0,
            output_rate,
        }
    }

    /// Start `source` from the beginning, replacing whatever was playing, and
    /// return the replaced source.
    ///
    /// The read position advances by `pitch * source_rate / output_rate`
    /// per output frame.
    pub fn trigger(
        &mut self,
        source: PlaybackSource,
        volume: f32,
        pitch: f32,
    ) -> Option<PlaybackSource> {
        let rate_ratio = source.sample_rate() as f64 / self.output_rate.max(1.0) as f64;
        self.pitch_step = pitch.max(0.0) as f64 * rate_ratio;
        self.volume = volume;
        self.position = 0.0;
        let next = if source.is_empty() { None } else { Some(source) };
        self.playing = next.is_some();
        std::mem::replace(&mut self.source, next)
    }

    /// Silence the voice and return its source
    pub fn force_stop(&mut self) -> Option<PlaybackSource> {
        self.playing = false;
        self.position = 0.0;
        self.source.take()
    }

    pub fn is_active(&self) -> bool {
        self.playing
    }

    pub fn pitch_step(&self) -> f64 {
        self.pitch_step
    }

    pub fn next_sample(&mut self) -> f32 {
        if !self.playing {
            return 0.0;
        }
        let Some(source) = &self.source else {
            return 0.0;
        };

        let pos_integer = self.position as usize;
        let pos_fractional = self.position.fract() as f32;

        let sample1 = source.frame(pos_integer);
        let sample2 = source.frame(pos_integer + 1);
        let sample = sample1 + (sample2 - sample1) * pos_fractional;

        self.position += self.pitch_step;
        if self.position >= source.len() as f64 || self.pitch_step <= 0.0 {
            self.playing = false;
            self.position = 0.0;
        }

        sample * self.volume
    }
}
