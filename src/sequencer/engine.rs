// Sequencer core - Applies commands, runs ticks and owns everything they touch
//
// Nothing in here reads a clock. The scheduling thread passes `now` into every
// call, which keeps the core deterministic under test.

use crate::messaging::channels::EventSender;
use crate::messaging::command::{Command, PlaybackCommand};
use crate::messaging::notification::{Notification, NotificationCategory, SequencerEvent};
use crate::sampler::loader::{Sample, SampleError, load_sample};
use crate::sequencer::playback::{VoiceOutput, VoicePlayer};
use crate::sequencer::state::{SequencerState, VoiceSource};
use crate::sequencer::tap_tempo::TapTempo;
use crate::sequencer::transport::{StepTrigger, Transport};
use crate::synth::bank::VoiceBank;
use crate::synth::voice::{Gains, VoiceKind};
use crossbeam_channel::Sender;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Instant;

/// Slow work that must stay off the tick path
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    BuildBank { gains: Gains, sample_rate: u32 },
    /// `select` switches the voice to its sample once loaded
    LoadSample {
        voice: VoiceKind,
        handle: String,
        select: bool,
    },
}

/// Outcome of a `Job`, handed back to the sequencer by value
#[derive(Debug)]
pub enum JobResult {
    BankReady(VoiceBank),
    SampleLoaded {
        voice: VoiceKind,
        handle: String,
        select: bool,
        result: Result<Sample, SampleError>,
    },
}

impl Job {
    pub fn run<R: Rng + ?Sized>(self, rng: &mut R) -> JobResult {
        match self {
            Job::BuildBank { gains, sample_rate } => {
                JobResult::BankReady(VoiceBank::build(gains, sample_rate, rng))
            }
            Job::LoadSample {
                voice,
                handle,
                select,
            } => {
                let result = load_sample(&handle);
                JobResult::SampleLoaded {
                    voice,
                    handle,
                    select,
                    result,
                }
            }
        }
    }
}

pub struct Sequencer {
    state: SequencerState,
    transport: Transport,
    tap_tempo: TapTempo,
    player: VoicePlayer,
    output: Box<dyn VoiceOutput>,
    events: Option<EventSender>,
    /// None runs jobs inline on the calling thread
    jobs: Option<Sender<Job>>,
    sample_rate: u32,
    epoch: Instant,
    rng: StdRng,
}

impl Sequencer {
    pub fn new(state: SequencerState, output: Box<dyn VoiceOutput>, sample_rate: u32) -> Self {
        Self::with_rng(state, output, sample_rate, StdRng::from_entropy())
    }

    /// Build with a given random source (seeded in tests)
    pub fn with_rng(
        state: SequencerState,
        output: Box<dyn VoiceOutput>,
        sample_rate: u32,
        mut rng: StdRng,
    ) -> Self {
        let bank = VoiceBank::build(state.gains(), sample_rate, &mut rng);
        Self {
            transport: Transport::new(state.bpm()),
            state,
            tap_tempo: TapTempo::new(),
            player: VoicePlayer::new(bank),
            output,
            events: None,
            jobs: None,
            sample_rate,
            epoch: Instant::now(),
            rng,
        }
    }

    /// Publish events to observers
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Hand slow jobs to a background worker
    pub fn with_jobs(mut self, jobs: Sender<Job>) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn player(&self) -> &VoicePlayer {
        &self.player
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.transport.next_deadline()
    }

    /// Apply one user command
    pub fn handle(&mut self, command: Command, now: Instant) {
        log::debug!("Command: {:?}", command);
        match command {
            Command::Start => {
                if self.transport.start(now) {
                    self.emit_transport();
                }
            }
            Command::Stop => {
                if self.transport.stop() {
                    self.emit_transport();
                }
            }
            Command::TogglePlay => {
                self.transport.toggle(now);
                self.emit_transport();
            }
            Command::SetSteps(steps) => {
                if self.state.set_steps(steps) {
                    self.emit_state();
                }
            }
            Command::SetPulses { voice, pulses } => {
                if self.state.set_pulses(voice, pulses) {
                    self.emit_state();
                }
            }
            Command::RandomizePulses(voice) => {
                if self.state.randomize_pulses(voice, &mut self.rng) {
                    self.emit_state();
                }
            }
            Command::SetMuted { voice, muted } => {
                if self.state.set_muted(voice, muted) {
                    self.emit_state();
                }
            }
            Command::ToggleStep { voice, step } => {
                if self.state.toggle_step(voice, step) {
                    self.emit_state();
                }
            }
            Command::ReactivateAll => {
                self.state.reactivate_all();
                self.emit_state();
            }
            Command::SetBpm(bpm) => self.apply_tempo(bpm, now),
            Command::Tap(at) => {
                let timestamp_ms = at.saturating_duration_since(self.epoch).as_millis() as u64;
                if let Some(bpm) = self.tap_tempo.register_tap(timestamp_ms) {
                    log::debug!("Tap tempo: {:.1} BPM", bpm);
                    self.apply_tempo(bpm, now);
                }
            }
            Command::SetDrumGain(gain) => {
                if self.state.set_drum_gain(gain) {
                    self.request_bank();
                    self.emit_state();
                }
            }
            Command::SetNoteGain(gain) => {
                if self.state.set_note_gain(gain) {
                    self.request_bank();
                    self.emit_state();
                }
            }
            Command::SetGlitch(level) => {
                self.state.set_glitch_level(level);
                self.emit_state();
            }
            Command::SetVoiceSource { voice, source } => {
                self.state.set_source(voice, source);
                self.emit_state();
            }
            Command::LoadSample { voice, handle } => self.submit(Job::LoadSample {
                voice,
                handle,
                select: true,
            }),
        }
    }

    /// Queue a load for every stored sample handle without changing the
    /// selected sources
    pub fn reload_samples(&mut self) {
        let pending: Vec<(VoiceKind, String)> = VoiceKind::ALL
            .iter()
            .filter_map(|&kind| {
                self.state
                    .sample_handle(kind)
                    .map(|handle| (kind, handle.to_string()))
            })
            .collect();

        for (voice, handle) in pending {
            self.submit(Job::LoadSample {
                voice,
                handle,
                select: false,
            });
        }
    }

    /// Take back the result of a background job
    pub fn complete(&mut self, result: JobResult) {
        match result {
            JobResult::BankReady(bank) => {
                if bank.matches(self.state.gains()) && bank.sample_rate() == self.sample_rate {
                    log::debug!("Voice bank rebuilt for {:?}", bank.gains());
                    self.player.set_bank(bank);
                } else {
                    log::debug!("Discarding stale voice bank for {:?}", bank.gains());
                }
            }
            JobResult::SampleLoaded {
                voice,
                handle,
                select,
                result,
            } => match result {
                Ok(sample) => {
                    log::info!(
                        "Loaded sample '{}' for {} ({} frames)",
                        sample.name,
                        voice,
                        sample.len()
                    );
                    let message = format!("{}: {}", voice, sample.name);
                    self.player.set_sample(voice, Some(Arc::new(sample)));
                    self.state.set_sample_handle(voice, Some(handle));
                    if select {
                        self.state.set_source(voice, VoiceSource::Sample);
                    }
                    self.notify(Notification::info(NotificationCategory::Sample, message));
                    self.emit_state();
                }
                Err(e) => {
                    log::warn!("Failed to load sample '{}' for {}: {}", handle, voice, e);
                    self.notify(Notification::warning(
                        NotificationCategory::Sample,
                        format!("Could not load sample for {}: {}", voice, e),
                    ));
                }
            },
        }
    }

    /// Tick if due, triggering the firing voices
    pub fn poll(&mut self, now: Instant) -> Option<StepTrigger> {
        let trigger = self.transport.poll(now, &self.state)?;
        log::trace!("Step {} fired {:?}", trigger.step, trigger.fired);
        self.player
            .play_step(&trigger, &self.state, &mut self.rng, self.output.as_mut());
        self.emit(SequencerEvent::Step(trigger));
        Some(trigger)
    }

    /// Stop the transport, silence the output and give back the final state
    pub fn shutdown(mut self) -> SequencerState {
        self.transport.stop();
        self.output.send(PlaybackCommand::StopAll);
        self.state
    }

    fn apply_tempo(&mut self, bpm: f64, now: Instant) {
        let applied = self.state.set_bpm(bpm);
        self.transport.set_tempo(applied, now);
        self.emit(SequencerEvent::Tempo(applied));
        self.emit_state();
    }

    fn request_bank(&mut self) {
        self.submit(Job::BuildBank {
            gains: self.state.gains(),
            sample_rate: self.sample_rate,
        });
    }

    fn submit(&mut self, job: Job) {
        let job = match &self.jobs {
            Some(jobs) => match jobs.send(job) {
                Ok(()) => return,
                Err(e) => {
                    log::warn!("Background worker gone, running job inline");
                    e.into_inner()
                }
            },
            None => job,
        };
        let result = job.run(&mut self.rng);
        self.complete(result);
    }

    fn emit_state(&self) {
        self.emit(SequencerEvent::StateChanged(Box::new(self.state.clone())));
    }

    fn emit_transport(&self) {
        log::info!("Transport {:?}", self.transport.state());
        self.emit(SequencerEvent::Transport(self.transport.state()));
    }

    fn notify(&self, notification: Notification) {
        self.emit(SequencerEvent::Notification(notification));
    }

    fn emit(&self, event: SequencerEvent) {
        if let Some(events) = &self.events {
            if events.try_send(event).is_err() {
                log::trace!("Observer queue full, event dropped");
            }
        }
    }
}
