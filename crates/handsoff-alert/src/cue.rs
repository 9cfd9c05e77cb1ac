//! Audio cue playback via an external player process.
//!
//! The "cue finished" signal is the player process exiting. Eligibility is
//! cleared when a cue starts and restored only by that exit, so at most one
//! cue plays at a time no matter how often the classifier fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Playback gate for the alert sound.
pub trait CuePlayer {
    /// Start the cue if no previous cue is still playing.
    /// Returns true if playback was started.
    fn try_play(&mut self) -> bool;

    /// Whether a new cue may start right now.
    fn eligible(&self) -> bool;
}

/// Plays the cue by spawning a configured player command (e.g. `paplay`).
///
/// Must be used from within a tokio runtime: the child is awaited on a
/// spawned task, and its exit restores eligibility.
pub struct ProcessCue {
    command: String,
    args: Vec<String>,
    can_play: Arc<AtomicBool>,
}

impl ProcessCue {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            can_play: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl CuePlayer for ProcessCue {
    fn try_play(&mut self) -> bool {
        if !self.can_play.swap(false, Ordering::SeqCst) {
            return false;
        }

        let can_play = self.can_play.clone();
        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.args(&self.args);
        let command = self.command.clone();

        tokio::spawn(async move {
            match cmd.status().await {
                Ok(status) if !status.success() => {
                    tracing::warn!(command = %command, code = ?status.code(), "cue player exited with error");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(command = %command, error = %e, "failed to run cue player");
                }
            }
            // Playback (or the attempt) is over; the next alert may sound.
            can_play.store(true, Ordering::SeqCst);
        });

        true
    }

    fn eligible(&self) -> bool {
        self.can_play.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_play_suppressed_until_exit() {
        // `sleep 1` keeps the "cue" playing long enough for the assertions.
        let mut cue = ProcessCue::new("sleep", vec!["1".to_string()]);
        assert!(cue.eligible());
        assert!(cue.try_play());
        assert!(!cue.eligible());
        assert!(!cue.try_play());
    }

    #[tokio::test]
    async fn test_eligibility_restored_after_exit() {
        let mut cue = ProcessCue::new("true", vec![]);
        assert!(cue.try_play());
        // Wait for the child to exit and the spawned task to flip the flag.
        for _ in 0..100 {
            if cue.eligible() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(cue.eligible());
        assert!(cue.try_play());
    }

    #[tokio::test]
    async fn test_missing_player_still_restores_eligibility() {
        let mut cue = ProcessCue::new("/nonexistent/player", vec![]);
        assert!(cue.try_play());
        for _ in 0..100 {
            if cue.eligible() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(cue.eligible());
    }
}
