//! View state controller for the category screen: in-memory list, form mode,
//! and the mutation -> reload -> alert sequencing.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error};

use notify::{Alert, AlertChannel, AlertDispatcher, Permission};
use shared::{
    domain::{Category, CategoryDraft, CategoryId},
    nav::NavHandle,
};
use storage::{CategoryStore, StoreError};

const ADD_ALERT_TITLE: &str = "New category added";

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no category selected for update")]
    NoSelection,
}

/// Which form the screen is showing. A single variant replaces the two
/// independent visibility booleans of the original mobile screen, so the add
/// and update forms can never be open at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Idle,
    Adding,
    Updating,
}

/// What the screen hands a form renderer: the values to seed the fields
/// with. Submission comes back through `submit_add` / `submit_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormProps {
    pub initial: CategoryDraft,
}

/// The category screen. Holds the displayed list (always a full reload of
/// the table, never an incremental patch), the form mode, and the alert
/// listener for the screen's mounted lifetime.
pub struct CategoryScreen {
    store: CategoryStore,
    alerts: AlertDispatcher,
    nav: NavHandle,
    categories: Vec<Category>,
    mode: UiMode,
    selected: Option<Category>,
    permission_notice: Option<String>,
    delivered: Arc<Mutex<Vec<Alert>>>,
    listener: Option<JoinHandle<()>>,
}

impl CategoryScreen {
    /// Mount sequence: the table already exists (ensured when the store was
    /// opened), so load it, request alert permission once, and attach the
    /// alert listener. The nav handle is held for the shell's benefit; the
    /// screen never drives a transition itself.
    pub async fn mount(
        store: CategoryStore,
        alerts: AlertDispatcher,
        channel: &dyn AlertChannel,
        nav: NavHandle,
    ) -> Result<Self, ScreenError> {
        let categories = store.list_all().await?;

        let permission = alerts.register(channel).await;
        let permission_notice = match permission {
            Permission::Granted => None,
            Permission::Denied => Some("Failed to get permission for notifications".to_string()),
            Permission::Unavailable => {
                Some("Must use a physical device for notifications".to_string())
            }
        };

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let listener = Some(spawn_alert_listener(&alerts, Arc::clone(&delivered)));

        Ok(Self {
            store,
            alerts,
            nav,
            categories,
            mode: UiMode::Idle,
            selected: None,
            permission_notice,
            delivered,
            listener,
        })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    pub fn nav(&self) -> &NavHandle {
        &self.nav
    }

    /// One-time user-facing message when alert registration was refused.
    /// After the shell shows it, alert failures stay silent.
    pub fn permission_notice(&self) -> Option<&str> {
        self.permission_notice.as_deref()
    }

    /// Alerts received while mounted, oldest first.
    pub fn delivered_alerts(&self) -> Vec<Alert> {
        self.delivered
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn open_add_form(&mut self) -> FormProps {
        self.mode = UiMode::Adding;
        FormProps {
            initial: CategoryDraft::default(),
        }
    }

    pub fn close_form(&mut self) {
        self.mode = UiMode::Idle;
        self.selected = None;
    }

    /// Add-form submission: the insert is awaited before the reload is
    /// issued, and the reload before the alert, so the displayed list can
    /// never run ahead of the write.
    pub async fn submit_add(&mut self, draft: CategoryDraft) -> Result<(), ScreenError> {
        let id = self.store.insert(&draft.title, &draft.description).await?;
        debug!(id = id.0, "category added");
        self.mode = UiMode::Idle;
        self.refresh().await?;
        self.alerts.schedule(ADD_ALERT_TITLE, &draft.description);
        Ok(())
    }

    /// Row tap in the list: remember the entity and open the update form
    /// pre-filled from it. `None` when the id is not currently displayed.
    pub fn select_for_update(&mut self, id: CategoryId) -> Option<FormProps> {
        let category = self.categories.iter().find(|c| c.id == id)?.clone();
        let props = FormProps {
            initial: CategoryDraft::from(&category),
        };
        self.selected = Some(category);
        self.mode = UiMode::Updating;
        Some(props)
    }

    /// Update-form submission. Both fields are written as supplied; an id
    /// that vanished since selection makes the write a storage-level no-op.
    pub async fn submit_update(&mut self, draft: CategoryDraft) -> Result<(), ScreenError> {
        let selected_id = self
            .selected
            .as_ref()
            .ok_or(ScreenError::NoSelection)?
            .id;
        let updated = self
            .store
            .update(selected_id, &draft.title, &draft.description)
            .await?;
        debug!(id = selected_id.0, updated, "category updated");
        self.refresh().await?;
        self.alerts.schedule(&draft.title, &draft.description);
        self.selected = None;
        self.mode = UiMode::Idle;
        Ok(())
    }

    /// Delete action from the list row. No alert for deletes.
    pub async fn remove(&mut self, id: CategoryId) -> Result<(), ScreenError> {
        let deleted = self.store.delete(id).await?;
        debug!(id = id.0, deleted, "category removed");
        self.refresh().await?;
        Ok(())
    }

    /// Full reload of the displayed list. On failure the previous list is
    /// kept; it stays stale until the next successful reload.
    async fn refresh(&mut self) -> Result<(), ScreenError> {
        match self.store.list_all().await {
            Ok(categories) => {
                self.categories = categories;
                Ok(())
            }
            Err(err) => {
                error!(%err, "category reload failed; keeping previous list");
                Err(err.into())
            }
        }
    }

    /// Detaches the alert listener. In-flight storage calls are not
    /// cancelled.
    pub fn unmount(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl Drop for CategoryScreen {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn spawn_alert_listener(
    alerts: &AlertDispatcher,
    delivered: Arc<Mutex<Vec<Alert>>>,
) -> JoinHandle<()> {
    let mut rx = alerts.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(alert) => {
                    debug!(title = %alert.title, "alert received");
                    if let Ok(mut log) = delivered.lock() {
                        log.push(alert);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "alert listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
