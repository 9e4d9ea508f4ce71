// Mixer - Sums the four voice slots inside the audio callback
//
// One SamplerVoice per rhythmic voice: a new trigger cuts off the previous
// one on the same voice. Replaced sources go back through the retire ring and
// are dropped by the control thread; only a full or missing ring drops here.

use crate::audio::dsp_utils::{flush_denormals_to_zero, hard_clip};
use crate::messaging::channels::{PlaybackConsumer, RetiredProducer};
use crate::messaging::command::PlaybackCommand;
use crate::sampler::engine::{PlaybackSource, SamplerVoice};
use crate::synth::voice::VOICE_COUNT;
use ringbuf::traits::{Consumer, Producer};

pub struct Mixer {
    voices: [SamplerVoice; VOICE_COUNT],
    retired: Option<RetiredProducer>,
}

impl Mixer {
    pub fn new(output_rate: f32) -> Self {
        Self {
            voices: std::array::from_fn(|_| SamplerVoice::new(output_rate)),
            retired: None,
        }
    }

    /// Hand replaced sources to `retired` instead of dropping them in place
    pub fn with_retire(mut self, retired: RetiredProducer) -> Self {
        self.retired = Some(retired);
        self
    }

    pub fn handle(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Trigger {
                voice,
                source,
                volume,
                pitch,
            } => {
                let replaced = self.voices[voice.index()].trigger(source, volume, pitch);
                self.retire(replaced);
            }
            PlaybackCommand::StopAll => {
                for index in 0..VOICE_COUNT {
                    let stopped = self.voices[index].force_stop();
                    self.retire(stopped);
                }
            }
        }
    }

    fn retire(&mut self, source: Option<PlaybackSource>) {
        if let (Some(source), Some(retired)) = (source, self.retired.as_mut()) {
            // A full ring hands the source back and it drops here
            let _ = retired.try_push(source);
        }
    }

    /// Apply every queued command
    pub fn drain(&mut self, commands: &mut PlaybackConsumer) {
        while let Some(command) = commands.try_pop() {
            self.handle(command);
        }
    }

    /// Next mono output sample, clamped to [-1, 1]
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let sum: f32 = self.voices.iter_mut().map(SamplerVoice::next_sample).sum();
        hard_clip(flush_denormals_to_zero(sum))
    }

    /// Fill a mono buffer
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::{create_playback_channel, create_retire_channel};
    use crate::sampler::engine::PlaybackSource;
    use crate::sampler::loader::Sample;
    use crate::synth::voice::VoiceKind;
    use ringbuf::traits::Producer;
    use std::sync::Arc;

    fn constant(value: f32, len: usize) -> PlaybackSource {
        PlaybackSource::Sample(Arc::new(Sample {
            name: "const".to_string(),
            data: vec![value; len],
            sample_rate: 44100,
            channels: 1,
        }))
    }

    fn trigger(voice: VoiceKind, source: PlaybackSource) -> PlaybackCommand {
        PlaybackCommand::Trigger {
            voice,
            source,
            volume: 1.0,
            pitch: 1.0,
        }
    }

    #[test]
    fn test_voices_are_summed() {
        let mut mixer = Mixer::new(44100.0);
        mixer.handle(trigger(VoiceKind::Kick, constant(0.25, 8)));
        mixer.handle(trigger(VoiceKind::Snare, constant(0.5, 8)));
        assert_eq!(mixer.next_sample(), 0.75);
        assert_eq!(mixer.active_voices(), 2);
    }

    #[test]
    fn test_retrigger_replaces_same_voice() {
        let mut mixer = Mixer::new(44100.0);
        mixer.handle(trigger(VoiceKind::HatOpen, constant(0.25, 8)));
        mixer.handle(trigger(VoiceKind::HatOpen, constant(0.5, 8)));
        assert_eq!(mixer.active_voices(), 1);
        assert_eq!(mixer.next_sample(), 0.5);
    }

    #[test]
    fn test_output_is_clamped() {
        let mut mixer = Mixer::new(44100.0);
        for kind in VoiceKind::ALL {
            mixer.handle(trigger(kind, constant(0.9, 8)));
        }
        assert_eq!(mixer.next_sample(), 1.0);
    }

    #[test]
    fn test_stop_all() {
        let mut mixer = Mixer::new(44100.0);
        mixer.handle(trigger(VoiceKind::Kick, constant(0.5, 8)));
        mixer.handle(PlaybackCommand::StopAll);
        assert_eq!(mixer.active_voices(), 0);
        assert_eq!(mixer.next_sample(), 0.0);
    }

    #[test]
    fn test_drain_from_queue() {
        let (mut tx, mut rx) = create_playback_channel(8);
        assert!(tx.try_push(trigger(VoiceKind::HatClosed, constant(0.5, 4))).is_ok());

        let mut mixer = Mixer::new(44100.0);
        mixer.drain(&mut rx);
        let mut out = [0.0f32; 6];
        mixer.render(&mut out);
        assert_eq!(out, [0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_replaced_sources_leave_through_retire_ring() {
        let (retire_tx, mut retire_rx) = create_retire_channel(4);
        let mut mixer = Mixer::new(44100.0).with_retire(retire_tx);
        let first = Arc::new(Sample {
            name: "old bank".to_string(),
            data: vec![0.5; 2],
            sample_rate: 44100,
            channels: 1,
        });

        mixer.handle(trigger(VoiceKind::Kick, PlaybackSource::Sample(first.clone())));
        mixer.render(&mut [0.0f32; 4]);
        mixer.handle(trigger(VoiceKind::Kick, constant(0.25, 8)));
        mixer.handle(PlaybackCommand::StopAll);

        let retired: Vec<PlaybackSource> = retire_rx.pop_iter().collect();
        assert_eq!(retired.len(), 2);
        assert!(matches!(&retired[0], PlaybackSource::Sample(s) if Arc::ptr_eq(s, &first)));
        drop(retired);
        assert_eq!(Arc::strong_count(&first), 1);
    }
}
