// Persisted state layout - Key names and the on-disk entry map

use crate::synth::voice::VoiceKind;
use serde_json::{Map, Value};

/// Flat key-value view of the saved state
pub type Entries = Map<String, Value>;

pub const HAS_STATE: &str = "has_state";
pub const STEPS: &str = "steps";
pub const PULSES_SNARE: &str = "pulses_snare";
pub const PULSES_HAT_OPEN: &str = "pulses_hat_open";
pub const PULSES_HAT_CLOSED: &str = "pulses_hat_closed";
pub const BPM: &str = "bpm";
/// Drum gain as a 0-100 slider value
pub const DRUM_VOLUME: &str = "drum_volume";
/// Note gain as a 0-100 slider value
pub const NOTE_VOLUME: &str = "note_volume";
pub const GLITCH_LEVEL: &str = "glitch_level";
/// Glitch level as a 0-100 slider value, read when `glitch_level` is absent
pub const GLITCH_PROGRESS: &str = "glitch_progress";
pub const KICK_MUTED: &str = "kick_muted";
/// Informational only, never read back
pub const SAVED_AT: &str = "saved_at";

/// Key of the pulse count of a Euclidean voice; None for the kick
pub fn pulses_key(kind: VoiceKind) -> Option<&'static str> {
    match kind {
        VoiceKind::Kick => None,
        VoiceKind::Snare => Some(PULSES_SNARE),
        VoiceKind::HatOpen => Some(PULSES_HAT_OPEN),
        VoiceKind::HatClosed => Some(PULSES_HAT_CLOSED),
    }
}

pub fn sample_mode_key(kind: VoiceKind) -> String {
    format!("sample_mode_{}", kind.name())
}

pub fn sample_uri_key(kind: VoiceKind) -> String {
    format!("sample_uri_{}", kind.name())
}
