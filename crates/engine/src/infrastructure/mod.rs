//! Infrastructure adapters for the outbound ports.

mod audio;
mod clock;
mod content;
mod persistence;

pub use audio::{AudioCommand, NullAudioSink, RecordingAudioSink};
pub use clock::{ManualClock, SystemClock};
pub use content::InMemoryContentSource;
pub use persistence::{InMemorySaveStore, JsonFileSaveStore};
