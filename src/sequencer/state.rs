// Sequencer state - Steps, pulses, tempo, gains and voice sources
//
// All four voices are modelled the same way: a pattern, an active-step mask
// and a mute flag. The kick's pattern is constant all-true, the three other
// voices get a Euclidean pattern recomputed from (steps, pulses).

use crate::sequencer::euclid;
use crate::synth::voice::{Gains, VOICE_COUNT, VoiceKind, clamp_unit};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const MIN_STEPS: usize = 2;
pub const MAX_STEPS: usize = 32;
pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 260.0;

pub const DEFAULT_STEPS: usize = 16;
pub const DEFAULT_BPM: f64 = 60.0;
pub const DEFAULT_PULSES_SNARE: usize = 5;
pub const DEFAULT_PULSES_HAT_OPEN: usize = 0;
pub const DEFAULT_PULSES_HAT_CLOSED: usize = 0;

/// How a lane decides which steps carry a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rhythm {
    /// Hit on every step (kick)
    EveryStep,
    /// Euclidean distribution of `pulses` over the step count
    Euclidean { pulses: usize },
}

/// Which sound a voice plays when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VoiceSource {
    #[default]
    Synth,
    Sample,
}

/// One rhythmic voice
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceLane {
    kind: VoiceKind,
    rhythm: Rhythm,
    muted: bool,
    source: VoiceSource,
    sample_handle: Option<String>,
    pattern: Vec<bool>,
    active: Vec<bool>,
}

impl VoiceLane {
    fn new(kind: VoiceKind, rhythm: Rhythm, steps: usize) -> Self {
        let mut lane = Self {
            kind,
            rhythm,
            muted: false,
            source: VoiceSource::Synth,
            sample_handle: None,
            pattern: Vec::new(),
            active: vec![true; steps],
        };
        lane.recompute(steps);
        lane
    }

    fn recompute(&mut self, steps: usize) {
        self.pattern = match self.rhythm {
            Rhythm::EveryStep => vec![true; steps],
            Rhythm::Euclidean { pulses } => euclid::generate(steps, pulses),
        };
    }

    fn clamp_pulses(&mut self, steps: usize) {
        if let Rhythm::Euclidean { pulses } = &mut self.rhythm {
            *pulses = (*pulses).min(steps);
        }
    }

    pub fn kind(&self) -> VoiceKind {
        self.kind
    }

    pub fn rhythm(&self) -> Rhythm {
        self.rhythm
    }

    pub fn pulses(&self) -> Option<usize> {
        match self.rhythm {
            Rhythm::EveryStep => None,
            Rhythm::Euclidean { pulses } => Some(pulses),
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn source(&self) -> VoiceSource {
        self.source
    }

    pub fn sample_handle(&self) -> Option<&str> {
        self.sample_handle.as_deref()
    }

    pub fn pattern(&self) -> &[bool] {
        &self.pattern
    }

    /// Steps the user has not toggled off
    pub fn active_steps(&self) -> &[bool] {
        &self.active
    }

    /// Whether this lane fires on `step` (wrapped into the pattern length)
    pub fn fires_at(&self, step: usize) -> bool {
        if self.muted || self.pattern.is_empty() {
            return false;
        }
        let step = step % self.pattern.len();
        self.pattern[step] && self.active.get(step).copied().unwrap_or(true)
    }
}

/// Complete user-controllable sequencer state
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerState {
    steps: usize,
    bpm: f64,
    gains: Gains,
    glitch_level: f64,
    lanes: [VoiceLane; VOICE_COUNT],
}

impl SequencerState {
    pub fn new() -> Self {
        let steps = DEFAULT_STEPS;
        Self {
            steps,
            bpm: DEFAULT_BPM,
            gains: Gains::default(),
            glitch_level: 0.0,
            lanes: [
                VoiceLane::new(VoiceKind::Kick, Rhythm::EveryStep, steps),
                VoiceLane::new(
                    VoiceKind::Snare,
                    Rhythm::Euclidean {
                        pulses: DEFAULT_PULSES_SNARE,
                    },
                    steps,
                ),
                VoiceLane::new(
                    VoiceKind::HatOpen,
                    Rhythm::Euclidean {
                        pulses: DEFAULT_PULSES_HAT_OPEN,
                    },
                    steps,
                ),
                VoiceLane::new(
                    VoiceKind::HatClosed,
                    Rhythm::Euclidean {
                        pulses: DEFAULT_PULSES_HAT_CLOSED,
                    },
                    steps,
                ),
            ],
        }
    }

    // ---- structure ----

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Set the step count (clamped to [2, 32]).
    ///
    /// Pulse counts are re-clamped to the new step count before the patterns
    /// are recomputed. Active-step masks are resized, new steps start active.
    /// Returns false if nothing changed.
    pub fn set_steps(&mut self, steps: usize) -> bool {
        let steps = steps.clamp(MIN_STEPS, MAX_STEPS);
        if steps == self.steps {
            return false;
        }
        self.steps = steps;
        for lane in &mut self.lanes {
            lane.clamp_pulses(steps);
            lane.active.resize(steps, true);
            lane.recompute(steps);
        }
        true
    }

    pub fn lane(&self, kind: VoiceKind) -> &VoiceLane {
        &self.lanes[kind.index()]
    }

    pub fn lanes(&self) -> &[VoiceLane] {
        &self.lanes
    }

    fn lane_mut(&mut self, kind: VoiceKind) -> &mut VoiceLane {
        &mut self.lanes[kind.index()]
    }

    /// Pulse count of a Euclidean voice, None for the kick
    pub fn pulses(&self, kind: VoiceKind) -> Option<usize> {
        self.lane(kind).pulses()
    }

    /// Set the pulse count of a Euclidean voice (clamped to [0, steps]).
    ///
    /// Returns false for the kick, which has no pulse count, or if the value
    /// did not change.
    pub fn set_pulses(&mut self, kind: VoiceKind, pulses: usize) -> bool {
        let steps = self.steps;
        let lane = self.lane_mut(kind);
        let Rhythm::Euclidean { pulses: current } = lane.rhythm else {
            return false;
        };
        let pulses = pulses.min(steps);
        if pulses == current {
            return false;
        }
        lane.rhythm = Rhythm::Euclidean { pulses };
        lane.recompute(steps);
        true
    }

    /// Pick a uniform random pulse count in [0, steps]
    pub fn randomize_pulses<R: Rng + ?Sized>(&mut self, kind: VoiceKind, rng: &mut R) -> bool {
        if self.pulses(kind).is_none() {
            return false;
        }
        let pulses = rng.gen_range(0..=self.steps);
        self.set_pulses(kind, pulses);
        true
    }

    pub fn pattern(&self, kind: VoiceKind) -> &[bool] {
        self.lane(kind).pattern()
    }

    /// Flip the active flag of one step; false if `step` is out of range
    pub fn toggle_step(&mut self, kind: VoiceKind, step: usize) -> bool {
        let lane = self.lane_mut(kind);
        match lane.active.get_mut(step) {
            Some(active) => {
                *active = !*active;
                true
            }
            None => false,
        }
    }

    /// Re-enable every step of every voice
    pub fn reactivate_all(&mut self) {
        let steps = self.steps;
        for lane in &mut self.lanes {
            lane.active.clear();
            lane.active.resize(steps, true);
        }
    }

    pub fn is_muted(&self, kind: VoiceKind) -> bool {
        self.lane(kind).muted
    }

    pub fn set_muted(&mut self, kind: VoiceKind, muted: bool) -> bool {
        let lane = self.lane_mut(kind);
        let changed = lane.muted != muted;
        lane.muted = muted;
        changed
    }

    /// Which voices fire on `step`, indexed by `VoiceKind::index`
    pub fn fired_at(&self, step: usize) -> [bool; VOICE_COUNT] {
        VoiceKind::ALL.map(|kind| self.lane(kind).fires_at(step))
    }

    /// Pulse invariant: every pulse count fits in the step count
    pub fn pulses_within_steps(&self) -> bool {
        self.lanes
            .iter()
            .filter_map(VoiceLane::pulses)
            .all(|pulses| pulses <= self.steps)
    }

    // ---- tempo ----

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set the tempo, clamped to [40, 260]. NaN is ignored.
    /// Returns the tempo now in force.
    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        if !bpm.is_nan() {
            self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        }
        self.bpm
    }

    pub fn seconds_per_step(&self) -> f64 {
        60.0 / self.bpm
    }

    // ---- mix ----

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn set_drum_gain(&mut self, gain: f64) -> bool {
        let gains = Gains::new(gain, self.gains.note);
        let changed = gains != self.gains;
        self.gains = gains;
        changed
    }

    pub fn set_note_gain(&mut self, gain: f64) -> bool {
        let gains = Gains::new(self.gains.drum, gain);
        let changed = gains != self.gains;
        self.gains = gains;
        changed
    }

    pub fn glitch_level(&self) -> f64 {
        self.glitch_level
    }

    pub fn set_glitch_level(&mut self, level: f64) {
        self.glitch_level = clamp_unit(level);
    }

    // ---- sources ----

    pub fn source(&self, kind: VoiceKind) -> VoiceSource {
        self.lane(kind).source
    }

    pub fn set_source(&mut self, kind: VoiceKind, source: VoiceSource) {
        self.lane_mut(kind).source = source;
    }

    pub fn sample_handle(&self, kind: VoiceKind) -> Option<&str> {
        self.lane(kind).sample_handle()
    }

    pub fn set_sample_handle(&mut self, kind: VoiceKind, handle: Option<String>) {
        self.lane_mut(kind).sample_handle = handle;
    }
}

impl Default for SequencerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_defaults() {
        let state = SequencerState::new();
        assert_eq!(state.steps(), 16);
        assert_eq!(state.bpm(), 60.0);
        assert_eq!(state.pulses(VoiceKind::Kick), None);
        assert_eq!(state.pulses(VoiceKind::Snare), Some(5));
        assert_eq!(state.pulses(VoiceKind::HatOpen), Some(0));
        assert_eq!(state.pulses(VoiceKind::HatClosed), Some(0));
        assert_eq!(state.gains(), Gains::new(1.0, 0.5));
        assert!(state.pattern(VoiceKind::Kick).iter().all(|&hit| hit));
        for kind in VoiceKind::ALL {
            assert_eq!(state.source(kind), VoiceSource::Synth);
            assert_eq!(state.pattern(kind).len(), 16);
        }
    }

    #[test]
    fn test_steps_are_clamped() {
        let mut state = SequencerState::new();
        state.set_steps(1);
        assert_eq!(state.steps(), 2);
        state.set_steps(99);
        assert_eq!(state.steps(), 32);
    }

    #[test]
    fn test_shrinking_steps_reclamps_pulses() {
        let mut state = SequencerState::new();
        state.set_pulses(VoiceKind::Snare, 12);
        state.set_pulses(VoiceKind::HatClosed, 16);

        state.set_steps(4);
        assert!(state.pulses_within_steps());
        assert_eq!(state.pulses(VoiceKind::Snare), Some(4));
        assert_eq!(state.pulses(VoiceKind::HatClosed), Some(4));
        assert_eq!(state.pattern(VoiceKind::Snare), &[true; 4]);
        assert_eq!(state.lane(VoiceKind::Snare).active_steps().len(), 4);
    }

    #[test]
    fn test_growing_steps_keeps_pulses() {
        let mut state = SequencerState::new();
        state.set_pulses(VoiceKind::Snare, 3);
        state.set_steps(8);
        state.set_steps(32);
        assert_eq!(state.pulses(VoiceKind::Snare), Some(3));
        assert_eq!(euclid::pulse_count(state.pattern(VoiceKind::Snare)), 3);
        assert!(state.pattern(VoiceKind::Kick).iter().all(|&hit| hit));
        assert_eq!(state.pattern(VoiceKind::Kick).len(), 32);
    }

    #[test]
    fn test_pulses_clamped_to_steps() {
        let mut state = SequencerState::new();
        state.set_pulses(VoiceKind::HatOpen, 40);
        assert_eq!(state.pulses(VoiceKind::HatOpen), Some(16));
        assert!(!state.set_pulses(VoiceKind::Kick, 3));
    }

    #[test]
    fn test_randomize_pulses_stays_in_range() {
        let mut state = SequencerState::new();
        state.set_steps(7);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            assert!(state.randomize_pulses(VoiceKind::Snare, &mut rng));
            assert!(state.pulses(VoiceKind::Snare).unwrap() <= 7);
        }
        assert!(!state.randomize_pulses(VoiceKind::Kick, &mut rng));
    }

    #[test]
    fn test_kick_mute() {
        let mut state = SequencerState::new();
        assert!(state.fired_at(3)[VoiceKind::Kick.index()]);
        state.set_muted(VoiceKind::Kick, true);
        assert!(!state.fired_at(3)[VoiceKind::Kick.index()]);
    }

    #[test]
    fn test_toggle_and_reactivate() {
        let mut state = SequencerState::new();
        state.set_steps(8);
        state.set_pulses(VoiceKind::Snare, 4);
        assert!(state.lane(VoiceKind::Snare).fires_at(2));

        assert!(state.toggle_step(VoiceKind::Snare, 2));
        assert!(!state.lane(VoiceKind::Snare).fires_at(2));
        assert!(!state.toggle_step(VoiceKind::Snare, 8));

        state.toggle_step(VoiceKind::Kick, 0);
        assert!(!state.fired_at(0)[VoiceKind::Kick.index()]);

        state.reactivate_all();
        assert!(state.lane(VoiceKind::Snare).fires_at(2));
        assert!(state.fired_at(0)[VoiceKind::Kick.index()]);
    }

    #[test]
    fn test_fires_at_wraps_out_of_range_steps() {
        let mut state = SequencerState::new();
        state.set_steps(4);
        state.set_pulses(VoiceKind::Snare, 1);
        assert!(state.lane(VoiceKind::Snare).fires_at(4));
        assert!(!state.lane(VoiceKind::Snare).fires_at(5));
    }

    #[test]
    fn test_bpm_is_clamped() {
        let mut state = SequencerState::new();
        assert_eq!(state.set_bpm(10.0), 40.0);
        assert_eq!(state.set_bpm(900.0), 260.0);
        assert_eq!(state.set_bpm(f64::NAN), 260.0);
        state.set_bpm(120.0);
        assert!((state.seconds_per_step() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_gains_and_glitch_are_clamped() {
        let mut state = SequencerState::new();
        assert!(state.set_drum_gain(0.25));
        assert!(!state.set_drum_gain(0.25));
        state.set_note_gain(3.0);
        assert_eq!(state.gains(), Gains::new(0.25, 1.0));
        state.set_glitch_level(-1.0);
        assert_eq!(state.glitch_level(), 0.0);
        state.set_glitch_level(0.4);
        assert_eq!(state.glitch_level(), 0.4);
    }
}
