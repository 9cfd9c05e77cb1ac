//! Alert sink — turns predictions into user-observable effects.
//!
//! The reaction itself is synchronous and runs on the engine thread; the
//! side effects (cue process, D-Bus notification) run on the tokio runtime,
//! fed through a bounded channel so the capture loop never blocks on them.

use crate::cue::CuePlayer;
use crate::notify::{Notifier, TOUCH_BODY, TOUCH_SUMMARY};
use handsoff_core::Label;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Event handed from the classify loop to the alert worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertEvent {
    Touched { confidence: f32 },
}

/// Reaction contract for one classification cycle.
pub trait AlertSink {
    /// React to the cycle's prediction. Always updates the flagged state;
    /// fires the cue and notification only on a qualifying touched result.
    fn react(&mut self, label: Label, touched_confidence: f32);
}

/// Production alert sink: sets the shared flagged state and forwards
/// qualifying cycles to the async alert worker.
pub struct Alerter {
    threshold: f32,
    flagged: Arc<AtomicBool>,
    tx: mpsc::Sender<AlertEvent>,
}

impl Alerter {
    /// `threshold` is the touched-confidence level that triggers an alert
    /// (strictly greater than).
    pub fn new(threshold: f32, tx: mpsc::Sender<AlertEvent>) -> Self {
        Self {
            threshold,
            flagged: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// Shared handle to the "currently flagged as touched" state, for
    /// status reporting.
    pub fn flagged_handle(&self) -> Arc<AtomicBool> {
        self.flagged.clone()
    }
}

impl AlertSink for Alerter {
    fn react(&mut self, label: Label, touched_confidence: f32) {
        if label == Label::Touched && touched_confidence > self.threshold {
            self.flagged.store(true, Ordering::SeqCst);
            // Drop the event if the worker is backed up; the next cycle
            // will produce a fresh one 200 ms later.
            if let Err(e) = self.tx.try_send(AlertEvent::Touched {
                confidence: touched_confidence,
            }) {
                tracing::debug!(error = %e, "alert event dropped");
            }
        } else {
            self.flagged.store(false, Ordering::SeqCst);
        }
    }
}

/// Async worker draining alert events: cue if eligible, notify every time.
///
/// Runs until the sending side (the engine) is dropped.
pub async fn run_alert_worker(
    mut rx: mpsc::Receiver<AlertEvent>,
    mut cue: impl CuePlayer,
    mut notifier: impl Notifier,
) {
    while let Some(event) = rx.recv().await {
        let AlertEvent::Touched { confidence } = event;
        let cue_started = cue.try_play();
        tracing::info!(confidence, cue_started, "touch alert");
        notifier.notify(TOUCH_SUMMARY, TOUCH_BODY).await;
    }
    tracing::debug!("alert worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    /// Cue fake with externally observable state: stays ineligible after
    /// the first play, as if the sound never finished.
    struct FakeCue {
        eligible: Arc<AtomicBool>,
        plays: Arc<AtomicUsize>,
    }

    impl FakeCue {
        fn new() -> Self {
            Self {
                eligible: Arc::new(AtomicBool::new(true)),
                plays: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CuePlayer for FakeCue {
        fn try_play(&mut self) -> bool {
            if self.eligible.swap(false, Ordering::SeqCst) {
                self.plays.fetch_add(1, Ordering::SeqCst);
                true
            } else {
                false
            }
        }

        fn eligible(&self) -> bool {
            self.eligible.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl Notifier for FakeNotifier {
        fn notify(
            &mut self,
            summary: &str,
            _body: &str,
        ) -> impl std::future::Future<Output = ()> + Send {
            self.sent.lock().unwrap().push(summary.to_string());
            std::future::ready(())
        }
    }

    #[test]
    fn test_react_flags_on_confident_touch() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut alerter = Alerter::new(0.8, tx);
        let flagged = alerter.flagged_handle();

        alerter.react(Label::Touched, 0.9);
        assert!(flagged.load(Ordering::SeqCst));
        assert_eq!(rx.try_recv().unwrap(), AlertEvent::Touched { confidence: 0.9 });
    }

    #[test]
    fn test_react_unflags_below_threshold() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut alerter = Alerter::new(0.8, tx);
        let flagged = alerter.flagged_handle();

        alerter.react(Label::Touched, 0.9);
        assert!(flagged.load(Ordering::SeqCst));

        // Exactly at the threshold does not qualify.
        alerter.react(Label::Touched, 0.8);
        assert!(!flagged.load(Ordering::SeqCst));

        alerter.react(Label::NotTouching, 0.1);
        assert!(!flagged.load(Ordering::SeqCst));

        // Only the first cycle produced an event.
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_react_ignores_confident_not_touching() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut alerter = Alerter::new(0.8, tx);
        let flagged = alerter.flagged_handle();

        alerter.react(Label::NotTouching, 0.95);
        assert!(!flagged.load(Ordering::SeqCst));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_worker_does_not_block_react() {
        let (tx, _rx) = mpsc::channel(1);
        let mut alerter = Alerter::new(0.8, tx);

        // Second send overflows the bounded channel; react must not panic
        // or block.
        alerter.react(Label::Touched, 0.9);
        alerter.react(Label::Touched, 0.9);
        assert!(alerter.flagged_handle().load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_worker_cue_once_notification_every_cycle() {
        let (tx, rx) = mpsc::channel(8);
        let cue = FakeCue::new();
        let plays = cue.plays.clone();
        let notifier = FakeNotifier::default();
        let sent = notifier.sent.clone();

        // Two qualifying cycles while the cue is still "playing".
        tx.send(AlertEvent::Touched { confidence: 0.9 }).await.unwrap();
        tx.send(AlertEvent::Touched { confidence: 0.85 }).await.unwrap();
        drop(tx);

        run_alert_worker(rx, cue, notifier).await;

        // Cue fired once; notifications on both cycles.
        assert_eq!(plays.load(Ordering::SeqCst), 1);
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_worker_exits_when_engine_drops() {
        let (tx, rx) = mpsc::channel(1);
        drop(tx);
        // Must return rather than hang.
        run_alert_worker(rx, FakeCue::new(), FakeNotifier::default()).await;
    }
}
