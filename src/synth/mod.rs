// Synthesis module - Procedural drum voices and per-trigger glitch

pub mod bank;
pub mod envelope;
pub mod glitch;
pub mod voice;

pub use bank::VoiceBank;
pub use glitch::GlitchSample;
pub use voice::{Gains, VOICE_COUNT, VoiceBuffer, VoiceKind, synth_buffer, synth_voice};
