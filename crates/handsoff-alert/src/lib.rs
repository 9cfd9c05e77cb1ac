//! handsoff-alert — audio cue and desktop notification delivery.
//!
//! The cue cooldown is governed by playback completion (the player process
//! exiting), not a timer; the notification cooldown is the notifier's own.

pub mod cue;
pub mod notify;
pub mod sink;

pub use cue::{CuePlayer, ProcessCue};
pub use notify::{DesktopNotifier, Notifier};
pub use sink::{run_alert_worker, AlertEvent, AlertSink, Alerter};
