// Audio module - CPAL output and input, mixing, recording

pub mod capture;
pub mod dsp_utils;
pub mod engine;
pub mod format_conversion;
pub mod mixer;
pub mod wav;

pub use capture::{CaptureError, CaptureSession, CapturedAudio, CpalCaptureReader};
pub use engine::{AudioEngine, AudioError};
pub use mixer::Mixer;
pub use wav::{WavError, save_recording};
