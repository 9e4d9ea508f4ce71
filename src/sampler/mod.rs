pub mod engine;
pub mod loader;

pub use engine::{PlaybackSource, SamplerVoice};
pub use loader::{Sample, SampleError, handle_to_path, load_sample, load_sample_file};
