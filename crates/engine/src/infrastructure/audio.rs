//! Audio sink adapters.
//!
//! The engine treats audio as fire-and-forget; these adapters exist so the
//! core can run headless (null sink) and so tests can assert on cue order
//! (recording sink).

use std::sync::Mutex;

use tracing::debug;

use crate::application::ports::AudioSinkPort;

/// Discards all cues. Default for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudioSink;

impl AudioSinkPort for NullAudioSink {
    fn play_sound(&self, name: &str) {
        debug!(name, "audio: sound (discarded)");
    }

    fn play_music(&self, name: &str) {
        debug!(name, "audio: music (discarded)");
    }

    fn pause_all(&self) {}
    fn resume_all(&self) {}
    fn stop_all(&self) {}
}

/// One recorded audio command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCommand {
    Sound(String),
    Music(String),
    PauseAll,
    ResumeAll,
    StopAll,
}

/// Records every cue for later assertion.
#[derive(Debug, Default)]
pub struct RecordingAudioSink {
    commands: Mutex<Vec<AudioCommand>>,
}

impl RecordingAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<AudioCommand> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    fn record(&self, command: AudioCommand) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command);
        }
    }
}

impl AudioSinkPort for RecordingAudioSink {
    fn play_sound(&self, name: &str) {
        self.record(AudioCommand::Sound(name.to_string()));
    }

    fn play_music(&self, name: &str) {
        self.record(AudioCommand::Music(name.to_string()));
    }

    fn pause_all(&self) {
        self.record(AudioCommand::PauseAll);
    }

    fn resume_all(&self) {
        self.record(AudioCommand::ResumeAll);
    }

    fn stop_all(&self) {
        self.record(AudioCommand::StopAll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingAudioSink::new();
        sink.play_music("village_theme");
        sink.play_sound("door_creak");
        sink.pause_all();

        assert_eq!(
            sink.commands(),
            vec![
                AudioCommand::Music("village_theme".to_string()),
                AudioCommand::Sound("door_creak".to_string()),
                AudioCommand::PauseAll,
            ]
        );
    }
}
