// Integration test: the sequencer driven step by step with explicit instants
//
// No wall-clock sleeps: every tick is polled at a computed Instant, and the
// triggers that would reach the audio callback are collected.

use euclid_beats::messaging::{
    NotificationCategory, NotificationLevel, PlaybackCommand, SequencerEvent,
    create_event_channel,
};
use euclid_beats::sampler::PlaybackSource;
use euclid_beats::sequencer::VoiceOutput;
use euclid_beats::{Command, Sequencer, SequencerState, VoiceKind, VoiceSource};
use hound::{SampleFormat, WavSpec, WavWriter};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 8000;

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<PlaybackCommand>>>);

impl Recorder {
    fn take(&self) -> Vec<PlaybackCommand> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    fn take_voices(&self) -> Vec<VoiceKind> {
        self.take()
            .into_iter()
            .filter_map(|command| match command {
                PlaybackCommand::Trigger { voice, .. } => Some(voice),
                PlaybackCommand::StopAll => None,
            })
            .collect()
    }
}

impl VoiceOutput for Recorder {
    fn send(&mut self, command: PlaybackCommand) -> bool {
        self.0.lock().unwrap().push(command);
        true
    }
}

fn sequencer(state: SequencerState) -> (Sequencer, Recorder) {
    let recorder = Recorder::default();
    let sequencer = Sequencer::with_rng(
        state,
        Box::new(recorder.clone()),
        SAMPLE_RATE,
        StdRng::seed_from_u64(7),
    );
    (sequencer, recorder)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn write_wav(dir: &TempDir, name: &str) -> String {
    let path = dir.path().join(name);
    let spec = WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..256 {
        writer.write_sample(((i % 32) * 500) as i16).unwrap();
    }
    writer.finalize().unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_first_bar_at_default_tempo() {
    let (mut seq, out) = sequencer(SequencerState::new());
    let t0 = Instant::now();
    seq.handle(Command::Start, t0);

    assert!(seq.poll(t0 + ms(999)).is_none());

    // E(5, 16) puts the snare on 0, 3, 6, 9 and 12
    let mut snare_steps = Vec::new();
    for i in 0..16u64 {
        let trigger = seq.poll(t0 + ms(1000 * (i + 1))).expect("tick due");
        assert_eq!(trigger.step, i as usize);

        let voices = out.take_voices();
        assert_eq!(voices[0], VoiceKind::Kick);
        if voices.contains(&VoiceKind::Snare) {
            snare_steps.push(trigger.step);
        }
        assert!(!voices.contains(&VoiceKind::HatOpen));
    }
    assert_eq!(snare_steps, vec![0, 3, 6, 9, 12]);

    // Wraps back to step 0
    let trigger = seq.poll(t0 + ms(17_000)).unwrap();
    assert_eq!(trigger.step, 0);
}

#[test]
fn test_tempo_change_reschedules_from_now() {
    let (mut seq, _out) = sequencer(SequencerState::new());
    let t0 = Instant::now();
    seq.handle(Command::Start, t0);
    seq.poll(t0 + ms(1000));
    seq.poll(t0 + ms(2000));

    seq.handle(Command::SetBpm(120.0), t0 + ms(2300));
    assert_eq!(seq.state().bpm(), 120.0);
    assert_eq!(seq.next_deadline(), Some(t0 + ms(2800)));

    let trigger = seq.poll(t0 + ms(2800)).unwrap();
    assert_eq!(trigger.step, 2);
}

#[test]
fn test_tempo_is_clamped() {
    let (mut seq, _out) = sequencer(SequencerState::new());
    let t0 = Instant::now();
    seq.handle(Command::SetBpm(999.0), t0);
    assert_eq!(seq.state().bpm(), 260.0);
    seq.handle(Command::SetBpm(1.0), t0);
    assert_eq!(seq.state().bpm(), 40.0);
}

#[test]
fn test_tap_tempo_sets_bpm() {
    let (mut seq, _out) = sequencer(SequencerState::new());
    let base = Instant::now();
    for i in 0..4 {
        seq.handle(Command::Tap(base + ms(500 * i)), base + ms(500 * i));
    }
    assert!((seq.state().bpm() - 120.0).abs() < 1e-9);
}

#[test]
fn test_muted_and_toggled_steps_are_silent() {
    let (mut seq, out) = sequencer(SequencerState::new());
    let t0 = Instant::now();
    seq.handle(
        Command::SetMuted {
            voice: VoiceKind::Kick,
            muted: true,
        },
        t0,
    );
    seq.handle(
        Command::ToggleStep {
            voice: VoiceKind::Snare,
            step: 0,
        },
        t0,
    );
    seq.handle(Command::Start, t0);

    let trigger = seq.poll(t0 + ms(1000)).unwrap();
    assert!(!trigger.any_fired());
    assert!(out.take_voices().is_empty());

    seq.handle(Command::ReactivateAll, t0 + ms(1100));
    seq.handle(Command::Stop, t0 + ms(1100));
    seq.handle(Command::Start, t0 + ms(1100));
    seq.poll(t0 + ms(2100)).unwrap();
    assert_eq!(out.take_voices(), vec![VoiceKind::Snare]);
}

#[test]
fn test_shrinking_steps_while_running() {
    let (mut seq, _out) = sequencer(SequencerState::new());
    let t0 = Instant::now();
    seq.handle(Command::Start, t0);
    for i in 1..=11u64 {
        seq.poll(t0 + ms(1000 * i));
    }
    assert_eq!(seq.transport().step(), Some(10));

    seq.handle(Command::SetSteps(4), t0 + ms(11_500));
    assert!(seq.state().pulses_within_steps());
    assert_eq!(seq.state().pulses(VoiceKind::Snare), Some(4));

    // (10 + 1) % 4
    let trigger = seq.poll(t0 + ms(12_000)).unwrap();
    assert_eq!(trigger.step, 3);
}

#[test]
fn test_stop_halts_ticks() {
    let (mut seq, out) = sequencer(SequencerState::new());
    let t0 = Instant::now();
    seq.handle(Command::Start, t0);
    seq.handle(Command::Stop, t0 + ms(500));
    assert!(seq.poll(t0 + ms(5000)).is_none());
    assert!(seq.next_deadline().is_none());
    assert!(out.take().is_empty());

    let state = seq.shutdown();
    assert_eq!(state, SequencerState::new());
    assert!(matches!(out.take().as_slice(), [PlaybackCommand::StopAll]));
}

#[test]
fn test_loaded_sample_replaces_synth_voice() {
    let dir = TempDir::new().unwrap();
    let handle = write_wav(&dir, "snare.wav");

    let (mut seq, out) = sequencer(SequencerState::new());
    let t0 = Instant::now();
    seq.handle(
        Command::LoadSample {
            voice: VoiceKind::Snare,
            handle: handle.clone(),
        },
        t0,
    );
    assert_eq!(seq.state().source(VoiceKind::Snare), VoiceSource::Sample);
    assert_eq!(seq.state().sample_handle(VoiceKind::Snare), Some(handle.as_str()));

    seq.handle(Command::Start, t0);
    seq.poll(t0 + ms(1000)).unwrap();

    let commands = out.take();
    let snare = commands
        .iter()
        .find_map(|command| match command {
            PlaybackCommand::Trigger {
                voice: VoiceKind::Snare,
                source,
                volume,
                pitch,
            } => Some((source.clone(), *volume, *pitch)),
            _ => None,
        })
        .expect("snare fires on step 0");
    assert!(snare.0.is_sample());
    assert_eq!(snare.0.sample_rate(), 22050);
    // Glitch level 0 leaves the sample untouched
    assert_eq!((snare.1, snare.2), (1.0, 1.0));

    // Switching back to synth keeps the handle
    seq.handle(
        Command::SetVoiceSource {
            voice: VoiceKind::Snare,
            source: VoiceSource::Synth,
        },
        t0 + ms(1100),
    );
    assert_eq!(seq.state().sample_handle(VoiceKind::Snare), Some(handle.as_str()));
    seq.poll(t0 + ms(2000));
    seq.poll(t0 + ms(3000));
    seq.poll(t0 + ms(4000)).unwrap();
    let synth = out.take().into_iter().any(|command| {
        matches!(
            command,
            PlaybackCommand::Trigger {
                voice: VoiceKind::Snare,
                source: PlaybackSource::Synth(_),
                ..
            }
        )
    });
    assert!(synth);
}

#[test]
fn test_failed_load_keeps_synth_and_notifies() {
    let (events_tx, events_rx) = create_event_channel(16);
    let (seq, _out) = sequencer(SequencerState::new());
    let mut seq = seq.with_events(events_tx);

    seq.handle(
        Command::LoadSample {
            voice: VoiceKind::HatOpen,
            handle: "/definitely/not/here.wav".to_string(),
        },
        Instant::now(),
    );
    assert_eq!(seq.state().source(VoiceKind::HatOpen), VoiceSource::Synth);
    assert_eq!(seq.state().sample_handle(VoiceKind::HatOpen), None);

    let warning = events_rx.try_iter().find_map(|event| match event {
        SequencerEvent::Notification(n) => Some(n),
        _ => None,
    });
    let warning = warning.expect("a notification");
    assert_eq!(warning.level, NotificationLevel::Warning);
    assert_eq!(warning.category, NotificationCategory::Sample);
}

#[test]
fn test_glitch_modulates_sampled_voices_only() {
    let dir = TempDir::new().unwrap();
    let handle = write_wav(&dir, "kick.wav");

    let (mut seq, out) = sequencer(SequencerState::new());
    let t0 = Instant::now();
    seq.handle(
        Command::LoadSample {
            voice: VoiceKind::Kick,
            handle,
        },
        t0,
    );
    seq.handle(Command::SetGlitch(1.0), t0);
    seq.handle(Command::Start, t0);

    let mut kick_pitches = Vec::new();
    for i in 1..=8u64 {
        seq.poll(t0 + ms(1000 * i)).unwrap();
        for command in out.take() {
            if let PlaybackCommand::Trigger {
                voice,
                volume,
                pitch,
                ..
            } = command
            {
                assert!((0.0..=2.0).contains(&volume));
                assert!((0.5..=2.0).contains(&pitch));
                if voice == VoiceKind::Kick {
                    kick_pitches.push(pitch);
                } else {
                    assert_eq!((volume, pitch), (1.0, 1.0));
                }
            }
        }
    }
    assert_eq!(kick_pitches.len(), 8);
    assert!(kick_pitches.iter().any(|&p| p != 1.0));
}
