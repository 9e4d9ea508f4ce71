// Persistence - Saving and restoring the sequencer state between runs

pub mod manager;
pub mod store;
pub mod types;

pub use manager::{ProjectError, RestoredState, StateManager, decode_state, encode_state};
pub use store::{JsonFileStore, MemoryStore, StateStore};
pub use types::Entries;
