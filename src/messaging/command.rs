// Command types - Front end → sequencer, sequencer → audio callback

use crate::sampler::engine::PlaybackSource;
use crate::sequencer::state::VoiceSource;
use crate::synth::voice::VoiceKind;
use std::time::Instant;

/// User commands, applied in order on the scheduling thread
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    TogglePlay,
    SetSteps(usize),
    SetPulses { voice: VoiceKind, pulses: usize },
    RandomizePulses(VoiceKind),
    SetMuted { voice: VoiceKind, muted: bool },
    ToggleStep { voice: VoiceKind, step: usize },
    ReactivateAll,
    SetBpm(f64),
    /// Tap tempo; the instant is taken where the tap happened
    Tap(Instant),
    SetDrumGain(f64),
    SetNoteGain(f64),
    SetGlitch(f64),
    SetVoiceSource { voice: VoiceKind, source: VoiceSource },
    /// Load a sample and select it for the voice on success
    LoadSample { voice: VoiceKind, handle: String },
}

impl Command {
    /// True for commands that change the step grid, after which the front
    /// end re-enables every step
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Command::SetSteps(_) | Command::SetPulses { .. } | Command::RandomizePulses(_)
        )
    }
}

/// Messages for the audio callback
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    /// Start `source` on the voice's slot, cutting off what it was playing
    Trigger {
        voice: VoiceKind,
        source: PlaybackSource,
        volume: f32,
        pitch: f32,
    },
    /// Silence every slot
    StopAll,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_commands() {
        assert!(Command::SetSteps(8).is_structural());
        assert!(
            Command::SetPulses {
                voice: VoiceKind::Snare,
                pulses: 3
            }
            .is_structural()
        );
        assert!(Command::RandomizePulses(VoiceKind::HatOpen).is_structural());
        assert!(!Command::SetBpm(120.0).is_structural());
        assert!(!Command::ReactivateAll.is_structural());
    }
}
