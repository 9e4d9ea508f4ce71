// Sequencer module
// Euclidean patterns, sequencer state, transport, tap tempo and the scheduling thread

pub mod engine;
pub mod euclid;
pub mod playback;
pub mod scheduler;
pub mod state;
pub mod tap_tempo;
pub mod transport;

pub use engine::{Job, JobResult, Sequencer};
pub use playback::{NullOutput, RingOutput, VoiceOutput, VoicePlayer};
pub use scheduler::{SchedulerHandle, spawn};
pub use state::{Rhythm, SequencerState, VoiceLane, VoiceSource};
pub use tap_tempo::TapTempo;
pub use transport::{StepTrigger, Transport, TransportState, step_interval};
