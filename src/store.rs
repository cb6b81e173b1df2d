//! Registry of mounted widgets.
//!
//! Every page load mounts one widget, addressed by a UUID for as long as the
//! page lives. Widgets are never shared between pages and never persisted;
//! idle ones are swept after a timeout.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::error::WidgetError;
use crate::widget::{ChatWidget, Document, WidgetSettings};

/// Default idle timeout (30 minutes).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct Slot {
    widget: ChatWidget,
    last_activity: DateTime<Utc>,
}

/// Thread-safe store for widgets.
#[derive(Debug, Clone)]
pub struct WidgetStore {
    inner: Arc<WidgetStoreInner>,
}

#[derive(Debug)]
struct WidgetStoreInner {
    widgets: RwLock<HashMap<String, Slot>>,
    settings: WidgetSettings,
}

impl Default for WidgetStore {
    fn default() -> Self {
        Self::new(WidgetSettings::default())
    }
}

impl WidgetStore {
    /// Create a store whose widgets all use `settings`.
    #[must_use]
    pub fn new(settings: WidgetSettings) -> Self {
        Self {
            inner: Arc::new(WidgetStoreInner {
                widgets: RwLock::new(HashMap::new()),
                settings,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> WidgetSettings {
        self.inner.settings
    }

    /// Mount a widget on a fresh chat page and register it.
    pub fn mount(&self) -> Result<ChatWidget, WidgetError> {
        let id = Uuid::new_v4().to_string();
        let widget = ChatWidget::mount(id.clone(), Document::chat_page(), self.inner.settings)?;
        self.widgets_mut().insert(
            id,
            Slot {
                widget: widget.clone(),
                last_activity: Utc::now(),
            },
        );
        Ok(widget)
    }

    /// Get a widget by ID, marking it active.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ChatWidget> {
        let mut guard = self.widgets_mut();
        let slot = guard.get_mut(id)?;
        slot.last_activity = Utc::now();
        Some(slot.widget.clone())
    }

    /// Remove a widget by ID.
    pub fn remove(&self, id: &str) -> Option<ChatWidget> {
        self.widgets_mut().remove(id).map(|slot| slot.widget)
    }

    /// Get the number of mounted widgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.widgets().len()
    }

    /// Check if there are no widgets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// List all widget IDs.
    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.widgets().keys().cloned().collect()
    }

    /// Remove widgets idle longer than `timeout`.
    ///
    /// Returns the number of widgets removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(timeout)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.cleanup_idle_since(cutoff)
    }

    /// Remove widgets whose last activity is at or before `cutoff`.
    ///
    /// A widget with a live subscriber belongs to an open page and is kept.
    pub fn cleanup_idle_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut guard = self.widgets_mut();
        let before = guard.len();
        guard.retain(|_, slot| {
            slot.last_activity > cutoff || slot.widget.subscriber_count() > 0
        });
        before - guard.len()
    }

    /// Periodically sweep idle widgets.
    pub fn spawn_sweeper(&self, every: Duration, idle_timeout: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let removed = store.cleanup_expired_with_timeout(idle_timeout);
                if removed > 0 {
                    info!(
                        name: "widget.store.swept",
                        removed,
                        remaining = store.len(),
                        "Idle widgets removed"
                    );
                }
            }
        })
    }

    fn widgets(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.inner
            .widgets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn widgets_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Slot>> {
        self.inner
            .widgets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
