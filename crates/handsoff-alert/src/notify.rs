//! Desktop notifications over D-Bus (org.freedesktop.Notifications).

use std::collections::HashMap;
use std::time::{Duration, Instant};
use zbus::zvariant::Value;

/// Notification text for a detected touch.
pub const TOUCH_SUMMARY: &str = "Hands off!";
pub const TOUCH_BODY: &str = "You just touched your face.";

#[zbus::proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// Notification delivery with its own cooldown, independent of the audio cue.
pub trait Notifier {
    fn notify(&mut self, summary: &str, body: &str) -> impl std::future::Future<Output = ()> + Send;
}

/// Sends freedesktop notifications on the session bus.
///
/// A cooldown (default 3000 ms) suppresses bursts: every qualifying cycle
/// asks for a notification, but only one lands per cooldown window.
pub struct DesktopNotifier {
    proxy: NotificationsProxy<'static>,
    cooldown: Duration,
    last_sent: Option<Instant>,
    /// Server-assigned ID of the last notification, reused so repeats
    /// replace the previous popup instead of stacking.
    last_id: u32,
}

impl DesktopNotifier {
    pub async fn connect(cooldown_ms: u64) -> zbus::Result<Self> {
        let conn = zbus::Connection::session().await?;
        let proxy = NotificationsProxy::new(&conn).await?;
        Ok(Self {
            proxy,
            cooldown: Duration::from_millis(cooldown_ms),
            last_sent: None,
            last_id: 0,
        })
    }

    fn in_cooldown(&self) -> bool {
        matches!(self.last_sent, Some(t) if t.elapsed() < self.cooldown)
    }
}

impl Notifier for DesktopNotifier {
    async fn notify(&mut self, summary: &str, body: &str) {
        if self.in_cooldown() {
            tracing::debug!("notification suppressed by cooldown");
            return;
        }

        match self
            .proxy
            .notify(
                "handsoff",
                self.last_id,
                "face-surprise",
                summary,
                body,
                &[],
                HashMap::new(),
                -1,
            )
            .await
        {
            Ok(id) => {
                self.last_id = id;
                self.last_sent = Some(Instant::now());
                tracing::debug!(id, "notification sent");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to send notification");
            }
        }
    }
}
