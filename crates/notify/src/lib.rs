use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{debug, warn};

/// Delay between scheduling an alert and it firing.
pub const DEFAULT_ALERT_DELAY: Duration = Duration::from_secs(2);

const ALERT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// No usable notification channel on this platform (e.g. simulator).
    Unavailable,
}

/// A fired local alert, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub fired_at: DateTime<Utc>,
}

/// Device-level permission capability. Injected so the shell can bind a real
/// platform prompt while tests pin the outcome.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    async fn request_permission(&self) -> Permission;
}

/// Fixed-outcome channel for headless shells and tests.
pub struct StaticPermission(pub Permission);

impl StaticPermission {
    pub fn granted() -> Self {
        Self(Permission::Granted)
    }
}

#[async_trait]
impl AlertChannel for StaticPermission {
    async fn request_permission(&self) -> Permission {
        self.0
    }
}

/// Schedules fire-once local alerts with a fixed delay. Scheduling is a
/// best-effort side-channel: it never reports failure to the caller and never
/// gates the data-mutation flow. Until `register` resolves to `Granted`,
/// every `schedule` call is a silent no-op.
#[derive(Clone)]
pub struct AlertDispatcher {
    permission: Arc<RwLock<Permission>>,
    delay: Duration,
    events: broadcast::Sender<Alert>,
}

impl AlertDispatcher {
    pub fn new(delay: Duration) -> Self {
        let (events, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self {
            permission: Arc::new(RwLock::new(Permission::Unavailable)),
            delay,
            events,
        }
    }

    /// One-time device prompt. The outcome sticks for every later `schedule`
    /// call; a refusal is logged here once and degrades silently afterwards.
    pub async fn register(&self, channel: &dyn AlertChannel) -> Permission {
        let outcome = channel.request_permission().await;
        if let Ok(mut slot) = self.permission.write() {
            *slot = outcome;
        }
        match outcome {
            Permission::Granted => debug!("alert permission granted"),
            Permission::Denied => warn!("alert permission denied; alerts will be dropped"),
            Permission::Unavailable => {
                warn!("no alert channel on this platform; alerts will be dropped")
            }
        }
        outcome
    }

    pub fn permission(&self) -> Permission {
        self.permission
            .read()
            .map(|p| *p)
            .unwrap_or(Permission::Unavailable)
    }

    /// Enqueues one alert to fire after the configured delay. No retry, no
    /// delivery confirmation.
    pub fn schedule(&self, title: &str, body: &str) {
        if self.permission() != Permission::Granted {
            debug!(title, "dropping alert: permission not granted");
            return;
        }

        let events = self.events.clone();
        let delay = self.delay;
        let title = title.to_string();
        let body = body.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let alert = Alert {
                title,
                body,
                fired_at: Utc::now(),
            };
            if events.send(alert).is_err() {
                debug!("alert fired with no active listeners");
            }
        });
    }

    /// Attaches a listener. Dropping the receiver detaches it; nothing else
    /// needs releasing.
    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.events.subscribe()
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_DELAY)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
