//! Host-platform collaborator contracts.
//!
//! The tab platform and the notifier are external collaborators: the core
//! only depends on the narrow contracts here, and the binary (or a test)
//! supplies the implementation. Methods are synchronous and best-effort --
//! a tab that closed mid-operation surfaces as `None` or an error the
//! caller skips over, never as an abort.

use serde::{Deserialize, Serialize};

pub type TabId = u64;

/// An open tab as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
}

impl Tab {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self { id, url: url.into() }
    }
}

/// Load state carried by a navigation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// Inbound tab events from the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TabEvent {
    /// A tab became the focused tab of the focused window.
    Activated { tab_id: TabId },
    /// A tab's load state or URL changed. Fires for any tab, focused or
    /// not; the monitor filters to the focused one.
    Updated {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<LoadStatus>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

/// Tab enumeration and navigation, as the host platform exposes it.
pub trait TabPlatform: Send {
    /// The focused tab of the focused window, if any.
    fn active_tab(&self) -> Option<Tab>;

    /// Every open tab across all windows.
    fn all_tabs(&self) -> Vec<Tab>;

    /// Look up a single tab. `None` when it closed in the meantime.
    fn tab(&self, id: TabId) -> Option<Tab>;

    /// Navigate a tab to a new URL. Fire-and-forget; failures are the
    /// caller's to ignore.
    fn update_tab(&self, id: TabId, url: &str) -> Result<(), Box<dyn std::error::Error>>;
}

/// One-shot user notifications. No delivery guarantee.
pub trait Notifier: Send {
    fn notify(&self, title: &str, message: &str);
}

/// Notifier that drops everything. Useful where notifications are
/// configured off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _message: &str) {}
}
