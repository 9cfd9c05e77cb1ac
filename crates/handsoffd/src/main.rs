use anyhow::{Context, Result};
use handsoff_alert::{run_alert_worker, DesktopNotifier, ProcessCue};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;

use config::Config;
use dbus_interface::HandsoffService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("handsoffd starting");

    let config = Config::from_env();

    let (alert_tx, alert_rx) = mpsc::channel(16);

    // Fail fast: no camera or no model means the daemon cannot do anything.
    let engine = engine::spawn_engine(&config, alert_tx)
        .context("engine startup failed (camera or model unavailable)")?;

    let cue = ProcessCue::new(&config.cue_command, vec![config.cue_sound.clone()]);
    let notifier = DesktopNotifier::connect(config.notify_cooldown_ms)
        .await
        .context("failed to connect to the notification service")?;
    tokio::spawn(run_alert_worker(alert_rx, cue, notifier));

    let _conn = zbus::connection::Builder::session()?
        .name("dev.handsoff.Handsoff1")?
        .serve_at(
            "/dev/handsoff/Handsoff1",
            HandsoffService::new(engine, config.train_samples),
        )?
        .build()
        .await
        .context("failed to register on the session bus")?;

    tracing::info!("handsoffd ready");

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("handsoffd shutting down");

    Ok(())
}
