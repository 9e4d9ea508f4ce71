// Voice bank - The four cached voice buffers for one gain setting
//
// Buffers are never patched in place: a gain change builds a whole new bank
// and the previous one is dropped once nothing plays from it anymore.

use crate::synth::voice::{Gains, VOICE_COUNT, VoiceBuffer, VoiceKind, synth_voice};
use rand::Rng;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct VoiceBank {
    gains: Gains,
    sample_rate: u32,
    buffers: [Arc<VoiceBuffer>; VOICE_COUNT],
}

impl VoiceBank {
    /// Render all four voices for `gains`
    pub fn build<R: Rng + ?Sized>(gains: Gains, sample_rate: u32, rng: &mut R) -> Self {
        let buffers = VoiceKind::ALL.map(|kind| Arc::new(synth_voice(kind, gains, sample_rate, rng)));
        Self {
            gains,
            sample_rate,
            buffers,
        }
    }

    /// Cached buffer for a voice
    pub fn buffer(&self, kind: VoiceKind) -> &Arc<VoiceBuffer> {
        &self.buffers[kind.index()]
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True if this bank was rendered for exactly these gains
    pub fn matches(&self, gains: Gains) -> bool {
        self.gains == gains
    }
}
