use crate::engine::{EngineError, EngineHandle};
use handsoff_core::Label;
use zbus::interface;

/// D-Bus interface for the handsoff daemon.
///
/// Bus name: dev.handsoff.Handsoff1
/// Object path: /dev/handsoff/Handsoff1
pub struct HandsoffService {
    engine: EngineHandle,
    /// Default sample count when a Train call passes 0.
    default_samples: usize,
}

impl HandsoffService {
    pub fn new(engine: EngineHandle, default_samples: usize) -> Self {
        Self {
            engine,
            default_samples,
        }
    }
}

fn to_fdo(e: EngineError) -> zbus::fdo::Error {
    zbus::fdo::Error::Failed(e.to_string())
}

#[interface(name = "dev.handsoff.Handsoff1")]
impl HandsoffService {
    /// Run a training pass for the given label ("not_touch" or "touched").
    /// `samples` = 0 uses the configured default. Returns examples added.
    async fn train(&self, label: &str, samples: u32) -> zbus::fdo::Result<u32> {
        let label: Label = label
            .parse()
            .map_err(|e: handsoff_core::types::UnknownLabel| {
                zbus::fdo::Error::InvalidArgs(e.to_string())
            })?;
        let count = if samples == 0 {
            self.default_samples
        } else {
            samples as usize
        };

        tracing::info!(label = %label, count, "train requested");
        let added = self.engine.train(label, count).await.map_err(to_fdo)?;
        Ok(added as u32)
    }

    /// Start the perpetual classify loop.
    async fn watch(&self) -> zbus::fdo::Result<()> {
        tracing::info!("watch requested");
        self.engine.watch().await.map_err(to_fdo)
    }

    /// Stop an active classify loop. Returns whether one was running.
    async fn stop(&self) -> zbus::fdo::Result<bool> {
        tracing::info!("stop requested");
        self.engine.stop().await.map_err(to_fdo)
    }

    /// Return daemon status as a JSON string.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let status = self.engine.status().await.map_err(to_fdo)?;
        serde_json::to_string(&status)
            .map_err(|e| zbus::fdo::Error::Failed(format!("status serialization: {e}")))
    }
}
