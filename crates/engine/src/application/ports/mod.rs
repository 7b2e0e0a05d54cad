//! Application ports.
//!
//! The engine core talks to the outside world (persistence backend, content
//! source, audio playback, wall clock) exclusively through these traits.

pub mod outbound;

pub use outbound::*;
