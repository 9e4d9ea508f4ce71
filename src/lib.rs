// Euclid Beats - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod messaging;
pub mod project;
pub mod sampler;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::engine::AudioEngine;
pub use config::AppConfig;
pub use messaging::{Command, Notification, SequencerEvent, create_event_channel};
pub use project::{JsonFileStore, StateManager};
pub use sequencer::{
    SchedulerHandle, Sequencer, SequencerState, StepTrigger, Transport, TransportState,
    VoiceSource,
};
pub use synth::{Gains, VoiceKind};
