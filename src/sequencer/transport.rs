// Transport - Run/stop state machine and step clock
// Owns the running step index and the deadline of the next tick

use crate::sequencer::state::{DEFAULT_BPM, SequencerState};
use crate::synth::voice::VOICE_COUNT;
use std::time::{Duration, Instant};

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Running,
}

impl TransportState {
    pub fn is_running(&self) -> bool {
        matches!(self, TransportState::Running)
    }
}

/// Outcome of one tick: the step that was reached and which voices fire on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTrigger {
    pub step: usize,
    /// Indexed by `VoiceKind::index`
    pub fired: [bool; VOICE_COUNT],
}

impl StepTrigger {
    pub fn any_fired(&self) -> bool {
        self.fired.iter().any(|&f| f)
    }
}

/// Step interval for a tempo: round(60 / bpm * 1000) ms
pub fn step_interval(bpm: f64) -> Duration {
    let bpm = if bpm.is_finite() && bpm > 0.0 {
        bpm
    } else {
        DEFAULT_BPM
    };
    Duration::from_millis((60.0 / bpm * 1000.0).round() as u64)
}

/// Transport controller
///
/// Time never comes from a clock inside the transport: every call takes the
/// current `Instant`, so the same code runs under the scheduler thread and in
/// tests with synthetic time.
#[derive(Debug, Clone)]
pub struct Transport {
    state: TransportState,
    /// None means "one before the first step"
    step: Option<usize>,
    interval: Duration,
    next_deadline: Option<Instant>,
}

impl Transport {
    pub fn new(bpm: f64) -> Self {
        Self {
            state: TransportState::Stopped,
            step: None,
            interval: step_interval(bpm),
            next_deadline: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Last step reached, None before the first tick of a run
    pub fn step(&self) -> Option<usize> {
        self.step
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the next tick is due, None while stopped
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_deadline
    }

    /// Stopped -> Running. The first tick is due one interval after `now`
    /// and lands on step 0. Returns false if already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state.is_running() {
            return false;
        }
        self.state = TransportState::Running;
        self.step = None;
        self.next_deadline = Some(now + self.interval);
        true
    }

    /// Running -> Stopped, cancelling the pending tick. Idempotent.
    pub fn stop(&mut self) -> bool {
        let was_running = self.state.is_running();
        self.state = TransportState::Stopped;
        self.next_deadline = None;
        was_running
    }

    /// Start if stopped, stop if running. Returns the new state.
    pub fn toggle(&mut self, now: Instant) -> TransportState {
        if self.state.is_running() {
            self.stop();
        } else {
            self.start(now);
        }
        self.state
    }

    /// Apply a new tempo. While running the pending tick is rescheduled to
    /// `now + new interval`; the step index is left alone.
    pub fn set_tempo(&mut self, bpm: f64, now: Instant) {
        self.interval = step_interval(bpm);
        if self.state.is_running() {
            self.next_deadline = Some(now + self.interval);
        }
    }

    /// Tick if the deadline has passed
    pub fn poll(&mut self, now: Instant, state: &SequencerState) -> Option<StepTrigger> {
        match self.next_deadline {
            Some(deadline) if now >= deadline => self.tick(now, state),
            _ => None,
        }
    }

    /// Advance one step unconditionally, read the firing voices from `state`
    /// and schedule the next tick one interval after `now`.
    ///
    /// The step count is read fresh on every tick, so an index left beyond a
    /// shrunken pattern wraps through the modulo.
    pub fn tick(&mut self, now: Instant, state: &SequencerState) -> Option<StepTrigger> {
        if !self.state.is_running() {
            return None;
        }

        let steps = state.steps().max(1);
        let step = self.step.map_or(0, |s| (s + 1) % steps);
        self.step = Some(step);
        self.next_deadline = Some(now + self.interval);

        Some(StepTrigger {
            step,
            fired: state.fired_at(step),
        })
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}
