// State manager - Saving and restoring the sequencer state
//
// The state is flattened into a JSON object (see `types` for the keys).
// Restoring is lenient: a missing or mistyped key falls back to its default
// on its own, and every value goes back through the state's clamping setters.

use crate::project::store::StateStore;
use crate::project::types::*;
use crate::sequencer::state::{SequencerState, VoiceSource};
use crate::synth::voice::VoiceKind;
use chrono::Utc;
use serde_json::Value;

/// Project error types
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Invalid state structure: {0}")]
    InvalidStructure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of a restore
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredState {
    pub state: SequencerState,
    /// True if a saved state was found
    pub had_state: bool,
    /// Keys that were present but unusable and fell back to their default
    pub invalid_keys: Vec<String>,
}

impl RestoredState {
    /// Fresh default state, as if nothing had been saved
    pub fn defaults() -> Self {
        Self {
            state: SequencerState::new(),
            had_state: false,
            invalid_keys: Vec::new(),
        }
    }

    /// Sample handles to reload, with the voice they belong to
    pub fn sample_handles(&self) -> Vec<(VoiceKind, String)> {
        VoiceKind::ALL
            .into_iter()
            .filter_map(|kind| {
                self.state
                    .sample_handle(kind)
                    .map(|handle| (kind, handle.to_string()))
            })
            .collect()
    }
}

/// Saves and restores the sequencer state through a `StateStore`
pub struct StateManager<S: StateStore> {
    store: S,
}

impl<S: StateStore> StateManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn save(&mut self, state: &SequencerState) -> Result<(), ProjectError> {
        self.store.store(&encode_state(state))?;
        log::info!("Saved sequencer state ({} steps, {} BPM)", state.steps(), state.bpm());
        Ok(())
    }

    /// Load the saved state, or defaults if nothing was saved
    pub fn restore(&self) -> Result<RestoredState, ProjectError> {
        let restored = match self.store.load()? {
            Some(entries) => decode_state(&entries),
            None => RestoredState::defaults(),
        };

        if restored.had_state {
            log::info!(
                "Restored sequencer state ({} steps, {} BPM)",
                restored.state.steps(),
                restored.state.bpm()
            );
        }
        for key in &restored.invalid_keys {
            log::warn!("Ignoring invalid saved value for '{}'", key);
        }
        Ok(restored)
    }
}

/// Flatten the state into persisted entries
pub fn encode_state(state: &SequencerState) -> Entries {
    let mut entries = Entries::new();
    let mut put = |key: &str, value: Value| {
        entries.insert(key.to_string(), value);
    };

    put(HAS_STATE, Value::from(true));
    put(STEPS, Value::from(state.steps()));
    for kind in VoiceKind::ALL {
        if let (Some(key), Some(pulses)) = (pulses_key(kind), state.pulses(kind)) {
            put(key, Value::from(pulses));
        }
    }
    put(BPM, Value::from(state.bpm()));

    let gains = state.gains();
    put(DRUM_VOLUME, Value::from(to_percent(gains.drum)));
    put(NOTE_VOLUME, Value::from(to_percent(gains.note)));
    put(GLITCH_LEVEL, Value::from(state.glitch_level()));
    put(GLITCH_PROGRESS, Value::from(to_percent(state.glitch_level())));
    put(KICK_MUTED, Value::from(state.is_muted(VoiceKind::Kick)));

    for kind in VoiceKind::ALL {
        put(
            &sample_mode_key(kind),
            Value::from(state.source(kind) == VoiceSource::Sample),
        );
        put(
            &sample_uri_key(kind),
            state
                .sample_handle(kind)
                .map_or(Value::Null, |handle| Value::from(handle)),
        );
    }

    put(SAVED_AT, Value::from(Utc::now().to_rfc3339()));
    entries
}

/// Rebuild a state from persisted entries, key by key
pub fn decode_state(entries: &Entries) -> RestoredState {
    let mut reader = EntryReader {
        entries,
        invalid: Vec::new(),
    };
    let mut state = SequencerState::new();

    if reader.bool(HAS_STATE) != Some(true) {
        return RestoredState {
            state,
            had_state: false,
            invalid_keys: reader.invalid,
        };
    }

    // Steps first so pulse counts are clamped against the restored value
    if let Some(steps) = reader.count(STEPS) {
        state.set_steps(steps);
    }
    for kind in VoiceKind::ALL {
        let Some(key) = pulses_key(kind) else {
            continue;
        };
        if let Some(pulses) = reader.count(key) {
            state.set_pulses(kind, pulses);
        }
    }

    if let Some(bpm) = reader.number(BPM) {
        state.set_bpm(bpm);
    }
    if let Some(volume) = reader.number(DRUM_VOLUME) {
        state.set_drum_gain(volume / 100.0);
    }
    if let Some(volume) = reader.number(NOTE_VOLUME) {
        state.set_note_gain(volume / 100.0);
    }
    match reader.number(GLITCH_LEVEL) {
        Some(level) => state.set_glitch_level(level),
        None => {
            if let Some(progress) = reader.number(GLITCH_PROGRESS) {
                state.set_glitch_level(progress / 100.0);
            }
        }
    }
    if let Some(muted) = reader.bool(KICK_MUTED) {
        state.set_muted(VoiceKind::Kick, muted);
    }

    for kind in VoiceKind::ALL {
        if let Some(handle) = reader.string(&sample_uri_key(kind)) {
            if !handle.is_empty() {
                state.set_sample_handle(kind, Some(handle));
            }
        }
        if reader.bool(&sample_mode_key(kind)) == Some(true) {
            state.set_source(kind, VoiceSource::Sample);
        }
    }

    RestoredState {
        state,
        had_state: true,
        invalid_keys: reader.invalid,
    }
}

fn to_percent(unit: f64) -> i64 {
    (unit * 100.0).round() as i64
}

/// Typed lookups that record mistyped keys
struct EntryReader<'a> {
    entries: &'a Entries,
    invalid: Vec<String>,
}

impl EntryReader<'_> {
    fn get<T>(&mut self, key: &str, convert: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        let value = self.entries.get(key)?;
        let converted = convert(value);
        if converted.is_none() {
            self.invalid.push(key.to_string());
        }
        converted
    }

    fn bool(&mut self, key: &str) -> Option<bool> {
        self.get(key, Value::as_bool)
    }

    fn number(&mut self, key: &str) -> Option<f64> {
        self.get(key, |v| v.as_f64().filter(|n| n.is_finite()))
    }

    /// Non-negative integer; an oversized value saturates and is clamped later
    fn count(&mut self, key: &str) -> Option<usize> {
        self.get(key, |v| {
            v.as_u64()
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
        })
    }

    /// String value; null reads as absent
    fn string(&mut self, key: &str) -> Option<String> {
        self.get(key, |v| match v {
            Value::Null => Some(None),
            Value::String(s) => Some(Some(s.clone())),
            _ => None,
        })
        .flatten()
    }
}
