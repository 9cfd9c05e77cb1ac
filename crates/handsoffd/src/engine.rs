use handsoff_alert::{AlertSink, Alerter};
use handsoff_core::{
    Classifier, ClassifierError, EmbedderError, ImageEmbedder, KnnClassifier, Label,
    MobileNetEmbedder,
};
use handsoff_hw::{Camera, CameraError, FrameSource};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("capture unavailable: {0}")]
    Camera(#[from] CameraError),
    #[error("embedder error: {0}")]
    Embedder(#[from] EmbedderError),
    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("engine is busy; stop the active watch loop first")]
    Busy,
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Snapshot of engine state for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    /// "ready" or "watching".
    pub mode: String,
    pub examples_not_touch: usize,
    pub examples_touched: usize,
    /// Whether the last classified cycle qualified as a touch.
    pub flagged: bool,
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    Train {
        label: Label,
        repeat_count: usize,
        reply: oneshot::Sender<Result<usize, EngineError>>,
    },
    Watch {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Stop {
        reply: oneshot::Sender<bool>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Request a training pass: capture, embed, and store `repeat_count`
    /// labeled examples. Returns the number of examples added.
    pub async fn train(&self, label: Label, repeat_count: usize) -> Result<usize, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Train {
                label,
                repeat_count,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Start the perpetual classify loop. Returns once the loop is entered.
    pub async fn watch(&self) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Watch { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Cancel an active watch loop. Returns whether one was running.
    pub async fn stop(&self) -> Result<bool, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Stop { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    /// Fetch a status snapshot.
    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Status { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Opens the camera, loads the MobileNet model, discards warmup frames,
/// then enters the request loop. Fails fast at startup if the camera or
/// model is unavailable — there is no retry for a denied capture source.
pub fn spawn_engine(
    config: &crate::config::Config,
    alert_tx: mpsc::Sender<handsoff_alert::AlertEvent>,
) -> Result<EngineHandle, EngineError> {
    let camera = Camera::open(&config.camera_device)?;
    tracing::info!(
        device = %config.camera_device,
        width = camera.width,
        height = camera.height,
        fourcc = ?camera.fourcc,
        "camera opened"
    );

    let model_path = config.mobilenet_model_path();
    let embedder = MobileNetEmbedder::load(&model_path)?;
    tracing::info!(path = %model_path, "MobileNet embedder loaded");

    let classifier = KnnClassifier::with_k(config.knn_k);

    // Discard warmup frames for camera AGC/AE stabilization
    if config.warmup_frames > 0 {
        tracing::info!(count = config.warmup_frames, "discarding warmup frames");
        for _ in 0..config.warmup_frames {
            let _ = camera.capture_frame();
        }
    }

    let alerter = Alerter::new(config.touch_confidence, alert_tx);
    let flagged = alerter.flagged_handle();

    let train_interval = Duration::from_millis(config.train_interval_ms);
    let watch_interval = Duration::from_millis(config.watch_interval_ms);

    let (tx, rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("handsoff-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            run_engine_loop(
                rx,
                camera,
                embedder,
                classifier,
                alerter,
                flagged,
                train_interval,
                watch_interval,
            );
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    Ok(EngineHandle { tx })
}

/// Serve engine requests until the handle side is dropped.
///
/// The engine thread is the single owner of the capture source and the
/// example store, so training and classification can never race: a `Train`
/// that arrives while the watch loop is active is refused with `Busy`.
#[allow(clippy::too_many_arguments)]
fn run_engine_loop<S, E, C, A>(
    mut rx: mpsc::Receiver<EngineRequest>,
    mut source: S,
    mut embedder: E,
    mut classifier: C,
    mut sink: A,
    flagged: Arc<AtomicBool>,
    train_interval: Duration,
    watch_interval: Duration,
) where
    S: FrameSource,
    E: ImageEmbedder,
    C: Classifier,
    A: AlertSink,
{
    while let Some(req) = rx.blocking_recv() {
        match req {
            EngineRequest::Train {
                label,
                repeat_count,
                reply,
            } => {
                let result = run_train(
                    &mut source,
                    &mut embedder,
                    &mut classifier,
                    label,
                    repeat_count,
                    train_interval,
                );
                let _ = reply.send(result);
            }
            EngineRequest::Watch { reply } => {
                let _ = reply.send(Ok(()));
                tracing::info!("watch loop started");
                run_watch(
                    &mut rx,
                    &mut source,
                    &mut embedder,
                    &mut classifier,
                    &mut sink,
                    &flagged,
                    watch_interval,
                );
                tracing::info!("watch loop stopped");
            }
            EngineRequest::Stop { reply } => {
                // No watch loop active.
                let _ = reply.send(false);
            }
            EngineRequest::Status { reply } => {
                let _ = reply.send(make_status("ready", &classifier, &flagged));
            }
        }
    }
}

fn make_status<C: Classifier>(mode: &str, classifier: &C, flagged: &AtomicBool) -> EngineStatus {
    let counts = classifier.counts();
    EngineStatus {
        mode: mode.to_string(),
        examples_not_touch: counts.get(&Label::NotTouching).copied().unwrap_or(0),
        examples_touched: counts.get(&Label::Touched).copied().unwrap_or(0),
        flagged: flagged.load(Ordering::SeqCst),
    }
}

/// One training pass: `repeat_count` sequential capture-embed-store
/// iterations, pausing between captures so each embed sees a fresh frame.
///
/// Grows the example store by exactly `repeat_count` on success; any
/// capture or inference error aborts the pass.
fn run_train<S, E, C>(
    source: &mut S,
    embedder: &mut E,
    classifier: &mut C,
    label: Label,
    repeat_count: usize,
    interval: Duration,
) -> Result<usize, EngineError>
where
    S: FrameSource,
    E: ImageEmbedder,
    C: Classifier,
{
    tracing::info!(label = %label, count = repeat_count, "training pass started");

    for i in 0..repeat_count {
        let frame = source.capture()?;
        let embedding = embedder.embed(&frame.data, frame.width, frame.height)?;
        classifier.add_example(embedding, label)?;

        tracing::debug!(
            label = %label,
            progress = format!("{}/{repeat_count}", i + 1),
            "stored training example"
        );

        // Let the camera refresh before the next sample.
        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }

    tracing::info!(label = %label, total = classifier.len(), "training pass complete");
    Ok(repeat_count)
}

/// The perpetual classify loop: capture, embed, predict, react, pause.
///
/// Runs until a `Stop` request arrives or the request channel closes
/// (daemon teardown). Control requests are polled once per tick so the
/// loop stays cancellable without a second thread touching the camera.
fn run_watch<S, E, C, A>(
    rx: &mut mpsc::Receiver<EngineRequest>,
    source: &mut S,
    embedder: &mut E,
    classifier: &mut C,
    sink: &mut A,
    flagged: &Arc<AtomicBool>,
    interval: Duration,
) where
    S: FrameSource,
    E: ImageEmbedder,
    C: Classifier,
    A: AlertSink,
{
    loop {
        match rx.try_recv() {
            Ok(EngineRequest::Stop { reply }) => {
                let _ = reply.send(true);
                return;
            }
            Ok(EngineRequest::Status { reply }) => {
                let _ = reply.send(make_status("watching", classifier, flagged));
            }
            Ok(EngineRequest::Train { reply, .. }) => {
                let _ = reply.send(Err(EngineError::Busy));
            }
            Ok(EngineRequest::Watch { reply }) => {
                let _ = reply.send(Err(EngineError::Busy));
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return,
        }

        watch_tick(source, embedder, classifier, sink);

        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }
}

/// One classification cycle. Recoverable failures (capture hiccup, failed
/// inference) skip the cycle; the loop retries on the next cadence tick.
fn watch_tick<S, E, C, A>(source: &mut S, embedder: &mut E, classifier: &C, sink: &mut A)
where
    S: FrameSource,
    E: ImageEmbedder,
    C: Classifier,
    A: AlertSink,
{
    let frame = match source.capture() {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "capture failed; skipping cycle");
            return;
        }
    };

    let embedding = match embedder.embed(&frame.data, frame.width, frame.height) {
        Ok(embedding) => embedding,
        Err(e) => {
            tracing::warn!(error = %e, "embedding failed; skipping cycle");
            return;
        }
    };

    match classifier.predict(&embedding) {
        Ok(prediction) => {
            let confidence = prediction.confidence_for(Label::Touched);
            tracing::debug!(label = %prediction.label, confidence, "cycle classified");
            sink.react(prediction.label, confidence);
        }
        // Nothing trained yet: treat as not touching rather than crash.
        Err(ClassifierError::NotReady) => {
            sink.react(Label::NotTouching, 0.0);
        }
        Err(e) => {
            tracing::warn!(error = %e, "prediction failed; skipping cycle");
        }
    }
}
