use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use euclid_beats::audio::Mixer;
use euclid_beats::messaging::PlaybackCommand;
use euclid_beats::sampler::{PlaybackSource, Sample};
use euclid_beats::sequencer::euclid::generate;
use euclid_beats::sequencer::{NullOutput, Sequencer, SequencerState};
use euclid_beats::synth::{Gains, GlitchSample, VoiceBank, VoiceKind, synth_voice};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Buffer synthesis runs on every gain change
fn bench_voice_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth_voice");
    let mut rng = StdRng::seed_from_u64(1);

    for kind in VoiceKind::ALL {
        group.bench_with_input(
            BenchmarkId::from_parameter(kind.name()),
            &kind,
            |b, &kind| {
                b.iter(|| black_box(synth_voice(kind, Gains::default(), 44100, &mut rng)));
            },
        );
    }
    group.finish();

    c.bench_function("voice_bank_build_48k", |b| {
        b.iter(|| black_box(VoiceBank::build(Gains::default(), 48000, &mut rng)));
    });
}

/// Pattern recompute happens on every structural command
fn bench_euclid_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("euclid");
    for steps in [8usize, 16, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, &steps| {
            b.iter(|| {
                for pulses in 0..=steps {
                    black_box(generate(black_box(steps), pulses));
                }
            });
        });
    }
    group.finish();
}

/// Mixer cost per callback (critical for real-time performance)
fn bench_mixer_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer");
    let buffer_size = 512;
    let mut rng = StdRng::seed_from_u64(2);
    let bank = VoiceBank::build(Gains::default(), 48000, &mut rng);
    let sample = PlaybackSource::Sample(Arc::new(Sample {
        name: "noise".to_string(),
        data: (0..48000).map(|i| ((i * 7919) % 2000) as f32 / 1000.0 - 1.0).collect(),
        sample_rate: 44100,
        channels: 1,
    }));

    for active in 1..=4usize {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_voices", active)),
            &buffer_size,
            |b, &size| {
                let mut out = vec![0.0f32; size];
                b.iter(|| {
                    let mut mixer = Mixer::new(48000.0);
                    for kind in VoiceKind::ALL.into_iter().take(active) {
                        let glitch = GlitchSample::draw(0.5, &mut rng);
                        let source = if kind == VoiceKind::Kick {
                            sample.clone()
                        } else {
                            PlaybackSource::Synth(Arc::clone(bank.buffer(kind)))
                        };
                        mixer.handle(PlaybackCommand::Trigger {
                            voice: kind,
                            source,
                            volume: glitch.volume,
                            pitch: glitch.pitch,
                        });
                    }
                    mixer.render(&mut out);
                    black_box(&out);
                });
            },
        );
    }
    group.finish();
}

/// One scheduler tick: transport advance plus trigger resolution
fn bench_sequencer_tick(c: &mut Criterion) {
    let mut state = SequencerState::new();
    state.set_pulses(VoiceKind::HatOpen, 7);
    state.set_pulses(VoiceKind::HatClosed, 11);
    let mut seq = Sequencer::with_rng(state, Box::new(NullOutput), 48000, StdRng::seed_from_u64(3));

    let mut now = Instant::now();
    seq.handle(euclid_beats::Command::Start, now);
    c.bench_function("sequencer_tick", |b| {
        b.iter(|| {
            now += Duration::from_secs(1);
            black_box(seq.poll(now));
        });
    });
}

criterion_group!(
    benches,
    bench_voice_synthesis,
    bench_euclid_generate,
    bench_mixer_render,
    bench_sequencer_tick
);
criterion_main!(benches);
