//! Deterministic scenario replay.
//!
//! Drives the real supervisor handlers with a scripted tab platform, an
//! in-memory store, and synthetic calendar days, so a whole day of tab
//! switching and ticking replays in microseconds with reproducible results.
//! Backs `sitelimit-cli simulate` and the test suite.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::budget::{BudgetState, SettingsUpdate};
use crate::platform::{Notifier, Tab, TabEvent, TabId, TabPlatform};
use crate::storage::{Config, MemoryStore, StateStore};
use crate::supervisor::Supervisor;

/// In-memory tab platform with scripted focus changes and a redirect log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTabs {
    inner: Arc<Mutex<TabsInner>>,
}

#[derive(Debug, Default)]
struct TabsInner {
    tabs: Vec<Tab>,
    active: Option<TabId>,
    next_id: TabId,
    redirects: Vec<Redirect>,
}

/// One enforced redirect: which tab, and what it was showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub tab_id: TabId,
    pub from: String,
}

impl ScriptedTabs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new background tab. Ids are sequential from 1.
    pub fn open_url(&self, url: &str) -> TabId {
        let mut inner = self.inner.lock().expect("tabs mutex");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.tabs.push(Tab::new(id, url));
        id
    }

    /// Open a new tab and make it the focused one.
    pub fn focus_url(&self, url: &str) -> TabId {
        let id = self.open_url(url);
        self.inner.lock().expect("tabs mutex").active = Some(id);
        id
    }

    /// Every redirect issued so far.
    pub fn redirects(&self) -> Vec<Redirect> {
        self.inner.lock().expect("tabs mutex").redirects.clone()
    }
}

impl TabPlatform for ScriptedTabs {
    fn active_tab(&self) -> Option<Tab> {
        let inner = self.inner.lock().expect("tabs mutex");
        let active = inner.active?;
        inner.tabs.iter().find(|t| t.id == active).cloned()
    }

    fn all_tabs(&self) -> Vec<Tab> {
        self.inner.lock().expect("tabs mutex").tabs.clone()
    }

    fn tab(&self, id: TabId) -> Option<Tab> {
        let inner = self.inner.lock().expect("tabs mutex");
        inner.tabs.iter().find(|t| t.id == id).cloned()
    }

    fn update_tab(&self, id: TabId, url: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut inner = self.inner.lock().expect("tabs mutex");
        let tab = inner
            .tabs
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| format!("no tab with id {id}"))?;
        let from = std::mem::replace(&mut tab.url, url.to_string());
        inner.redirects.push(Redirect { tab_id: id, from });
        Ok(())
    }
}

/// Notifier that counts deliveries and keeps the last message.
#[derive(Debug, Clone, Default)]
pub struct CountingNotifier {
    count: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<(String, String)>>>,
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<(String, String)> {
        self.last.lock().ok()?.clone()
    }
}

impl Notifier for CountingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last.lock() {
            *last = Some((title.to_string(), message.to_string()));
        }
    }
}

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Foreground a new tab showing this URL.
    Focus(String),
    /// Foreground a tab with no tracked content.
    Blur,
    /// Let the armed countdown tick this many times. Ticks while the
    /// countdown is disarmed are simply not delivered, matching the
    /// interval being dropped.
    Ticks(u64),
    /// Push a settings update through the reconciler.
    Settings(SettingsUpdate),
    /// Restart the process on the given calendar day: reload from the
    /// store and re-run the daily reset.
    Restart(NaiveDate),
}

/// A replayable scenario: a starting record, a starting day, and steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub day: NaiveDate,
    #[serde(default)]
    pub state: BudgetState,
    pub steps: Vec<Step>,
}

/// State observed right after a step ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: Step,
    pub time_left: u64,
    pub counting: bool,
    pub blocked_today: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub steps: Vec<StepOutcome>,
    pub final_state: BudgetState,
    pub redirects: Vec<Redirect>,
    pub notifications: usize,
}

/// Replay a scenario from scratch and report what happened.
pub fn run_scenario(scenario: &Scenario) -> SimulationReport {
    let tabs = ScriptedTabs::new();
    let notifier = CountingNotifier::default();
    let store = MemoryStore::new();
    let _ = store.save(&scenario.state);

    let mut supervisor = Supervisor::new(
        tabs.clone(),
        notifier.clone(),
        store,
        Config::default(),
    );
    supervisor.bootstrap_at(scenario.day);

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for step in &scenario.steps {
        match step {
            Step::Focus(url) => {
                let tab_id = tabs.focus_url(url);
                supervisor.handle_tab_event(TabEvent::Activated { tab_id });
            }
            Step::Blur => {
                let tab_id = tabs.focus_url("about:blank");
                supervisor.handle_tab_event(TabEvent::Activated { tab_id });
            }
            Step::Ticks(count) => {
                for _ in 0..*count {
                    if !supervisor.counting() {
                        break;
                    }
                    supervisor.handle_tick();
                }
            }
            Step::Settings(update) => {
                supervisor.apply_settings(update);
            }
            Step::Restart(day) => {
                supervisor.bootstrap_at(*day);
            }
        }
        steps.push(StepOutcome {
            step: step.clone(),
            time_left: supervisor.state().time_left,
            counting: supervisor.counting(),
            blocked_today: supervisor.state().blocked_today,
        });
    }

    SimulationReport {
        steps,
        final_state: supervisor.state().clone(),
        redirects: tabs.redirects(),
        notifications: notifier.count(),
    }
}
