// Voice playback path - Picks the source for each firing voice and hands it to the output
//
// A voice set to "sample" plays its loaded sample with a fresh glitch draw.
// Without a loaded sample it falls back to the synthesized buffer, which is
// played as-is: glitch never touches synthesized voices.

use crate::messaging::channels::{PlaybackProducer, RetiredConsumer};
use crate::messaging::command::PlaybackCommand;
use crate::sampler::engine::PlaybackSource;
use crate::sampler::loader::Sample;
use crate::sequencer::state::{SequencerState, VoiceSource};
use crate::sequencer::transport::StepTrigger;
use crate::synth::bank::VoiceBank;
use crate::synth::glitch::GlitchSample;
use crate::synth::voice::{VOICE_COUNT, VoiceKind};
use rand::Rng;
use ringbuf::traits::{Consumer, Producer};
use std::sync::Arc;

/// Where triggered voices go. Implementations must never block.
pub trait VoiceOutput: Send {
    /// Queue a command; false if it had to be dropped
    fn send(&mut self, command: PlaybackCommand) -> bool;
}

impl VoiceOutput for PlaybackProducer {
    fn send(&mut self, command: PlaybackCommand) -> bool {
        self.try_push(command).is_ok()
    }
}

/// Playback ring paired with the mixer's retire ring. Sources the callback
/// released are dropped here, on the sending thread.
pub struct RingOutput {
    commands: PlaybackProducer,
    retired: RetiredConsumer,
}

impl RingOutput {
    pub fn new(commands: PlaybackProducer, retired: RetiredConsumer) -> Self {
        Self { commands, retired }
    }

    /// Drop everything the callback has handed back; returns how many
    pub fn reclaim(&mut self) -> usize {
        self.retired.pop_iter().count()
    }
}

impl VoiceOutput for RingOutput {
    fn send(&mut self, command: PlaybackCommand) -> bool {
        self.reclaim();
        self.commands.try_push(command).is_ok()
    }
}

/// Output that discards everything, for runs without an audio device
#[derive(Debug, Default)]
pub struct NullOutput;

impl VoiceOutput for NullOutput {
    fn send(&mut self, _command: PlaybackCommand) -> bool {
        true
    }
}

/// Cached synth buffers plus the loaded sample of each voice
#[derive(Debug, Clone)]
pub struct VoicePlayer {
    bank: Arc<VoiceBank>,
    samples: [Option<Arc<Sample>>; VOICE_COUNT],
}

impl VoicePlayer {
    pub fn new(bank: VoiceBank) -> Self {
        Self {
            bank: Arc::new(bank),
            samples: Default::default(),
        }
    }

    pub fn bank(&self) -> &VoiceBank {
        &self.bank
    }

    /// Swap in a freshly built bank; the previous one is dropped once the
    /// mixer releases its buffers
    pub fn set_bank(&mut self, bank: VoiceBank) {
        self.bank = Arc::new(bank);
    }

    pub fn sample(&self, kind: VoiceKind) -> Option<&Arc<Sample>> {
        self.samples[kind.index()].as_ref()
    }

    pub fn set_sample(&mut self, kind: VoiceKind, sample: Option<Arc<Sample>>) {
        self.samples[kind.index()] = sample;
    }

    /// Source, volume and pitch for one trigger of `kind`
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        kind: VoiceKind,
        source: VoiceSource,
        glitch_level: f64,
        rng: &mut R,
    ) -> (PlaybackSource, GlitchSample) {
        match (source, self.sample(kind)) {
            (VoiceSource::Sample, Some(sample)) => (
                PlaybackSource::Sample(Arc::clone(sample)),
                GlitchSample::draw(glitch_level, rng),
            ),
            _ => (
                PlaybackSource::Synth(Arc::clone(self.bank.buffer(kind))),
                GlitchSample::NEUTRAL,
            ),
        }
    }

    /// Send one trigger per firing voice. Returns how many were accepted by
    /// the output; rejected triggers are dropped.
    pub fn play_step<R: Rng + ?Sized>(
        &self,
        trigger: &StepTrigger,
        state: &SequencerState,
        rng: &mut R,
        output: &mut dyn VoiceOutput,
    ) -> usize {
        let mut accepted = 0;
        for kind in VoiceKind::ALL {
            if !trigger.fired[kind.index()] {
                continue;
            }
            let (source, glitch) = self.resolve(kind, state.source(kind), state.glitch_level(), rng);
            let sent = output.send(PlaybackCommand::Trigger {
                voice: kind,
                source,
                volume: glitch.volume,
                pitch: glitch.pitch,
            });
            if sent {
                accepted += 1;
            } else {
                log::warn!("Playback queue full, dropped {} trigger", kind);
            }
        }
        accepted
    }
}
