//! The serialized-access boundary around the budget state.
//!
//! One `Supervisor` owns the engine, the foreground-tab bookkeeping, and the
//! collaborator handles. Tab events, control messages, and the one-second
//! tick are independent asynchronous sources; `run` multiplexes them onto
//! the synchronous handlers below, so every mutation happens on one logical
//! event loop and every handler sees fresh state. The handlers are plain
//! methods on purpose -- the deterministic simulator and the tests drive
//! them directly, without a runtime.
//!
//! Stopping the countdown is nothing more than disarming the interval; a
//! tick already in flight re-validates against `decide()` inside the engine
//! and no-ops when the condition lapsed.

use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::budget::{BudgetEngine, BudgetState, SettingsUpdate, StoredState, TickOutcome};
use crate::domain::extract_domain;
use crate::events::Event;
use crate::platform::{LoadStatus, Notifier, Tab, TabEvent, TabId, TabPlatform};
use crate::storage::{Config, StateStore};

/// A control-surface message paired with its reply channel.
pub type ControlRequest = (Value, oneshot::Sender<Value>);

const CONTROL_ACTION_KEY: &str = "action";
const UPDATE_SETTINGS_ACTION: &str = "update-settings";

/// Owns the budget state machine and reconciles it with the outside world.
pub struct Supervisor<P, N, S> {
    engine: BudgetEngine,
    platform: P,
    notifier: N,
    store: S,
    config: Config,
    focused_tab: Option<TabId>,
}

impl<P: TabPlatform, N: Notifier, S: StateStore> Supervisor<P, N, S> {
    pub fn new(platform: P, notifier: N, store: S, config: Config) -> Self {
        Self {
            engine: BudgetEngine::new(BudgetState::default()),
            platform,
            notifier,
            store,
            config,
            focused_tab: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &BudgetState {
        self.engine.state()
    }

    /// Whether the one-second tick source should currently be armed.
    pub fn counting(&self) -> bool {
        self.engine.counting()
    }

    // ── Bootstrap ────────────────────────────────────────────────────

    /// Load the stored record, run the daily reset, and sync with whatever
    /// tab is foregrounded right now. Safe to re-run; the reset is
    /// idempotent within a day.
    pub fn bootstrap(&mut self) {
        self.bootstrap_at(Local::now().date_naive());
    }

    /// Bootstrap against an explicit calendar day (simulator, tests).
    pub fn bootstrap_at(&mut self, today: NaiveDate) {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "failed to load stored state, starting from defaults");
                StoredState::default()
            }
        };
        self.engine = BudgetEngine::new(BudgetState::from_stored(&stored));
        self.focused_tab = None;
        if let Some(Event::DailyRollover { initial_time, .. }) = self.engine.reset_for_day(today) {
            info!(initial_time, %today, "daily rollover, budget re-armed");
            self.persist();
        }
        self.sync_with_active_tab();
    }

    // ── Tab activity monitor ─────────────────────────────────────────

    /// Process one tab event from the host platform.
    pub fn handle_tab_event(&mut self, event: TabEvent) {
        if !self.state().enabled {
            // Monitoring is suspended; keep the focus bookkeeping current
            // and nothing else.
            if let TabEvent::Activated { tab_id } = event {
                self.focused_tab = Some(tab_id);
            }
            return;
        }

        match event {
            TabEvent::Activated { tab_id } => {
                self.focused_tab = Some(tab_id);
                match self.platform.tab(tab_id) {
                    Some(tab) => self.apply_focus(&tab),
                    None => {
                        // Closed between the event and the lookup.
                        self.engine.set_foreground(None);
                        self.reconcile();
                    }
                }
            }
            TabEvent::Updated { tab_id, status, url } => {
                let settled = matches!(status, Some(LoadStatus::Complete)) || url.is_some();
                if !settled {
                    return;
                }
                if !self.is_focused(tab_id) {
                    debug!(tab = tab_id, "navigation in background tab ignored");
                    return;
                }
                let resolved = match url {
                    Some(url) => Some(Tab::new(tab_id, url)),
                    None => self.platform.tab(tab_id),
                };
                match resolved {
                    Some(tab) => self.apply_focus(&tab),
                    None => {
                        self.engine.set_foreground(None);
                        self.reconcile();
                    }
                }
            }
        }
    }

    fn is_focused(&mut self, tab_id: TabId) -> bool {
        if let Some(focused) = self.focused_tab {
            return focused == tab_id;
        }
        // No activation seen yet this process; ask the platform once.
        if let Some(active) = self.platform.active_tab() {
            self.focused_tab = Some(active.id);
            return active.id == tab_id;
        }
        false
    }

    /// Re-resolve the currently focused tab from the platform and
    /// re-evaluate. Covers settings merges and bootstrap, where no tab
    /// event will fire on its own.
    fn sync_with_active_tab(&mut self) {
        if !self.state().enabled {
            self.engine.set_foreground(None);
            self.reconcile();
            return;
        }
        match self.platform.active_tab() {
            Some(tab) => {
                self.focused_tab = Some(tab.id);
                self.apply_focus(&tab);
            }
            None => {
                self.focused_tab = None;
                self.engine.set_foreground(None);
                self.reconcile();
            }
        }
    }

    fn apply_focus(&mut self, tab: &Tab) {
        let domain = extract_domain(&tab.url);
        debug!(tab = tab.id, domain = %domain, "foreground tab resolved");
        self.engine.set_foreground(Some(domain));
        if self.engine.decision().should_block {
            self.redirect(tab.id);
        }
        self.reconcile();
    }

    // ── Settings reconciler ──────────────────────────────────────────

    /// Handle one control-surface message. Only `update-settings` is
    /// accepted; any other action is ignored and gets no ack.
    pub fn handle_control(&mut self, message: &Value) -> Option<Value> {
        let action = message.get(CONTROL_ACTION_KEY).and_then(Value::as_str);
        if action != Some(UPDATE_SETTINGS_ACTION) {
            debug!(?action, "unknown control action ignored");
            return None;
        }
        Some(self.apply_settings(&SettingsUpdate::from_value(message)))
    }

    /// Merge a settings update into authoritative state and re-derive the
    /// countdown decision.
    pub fn apply_settings(&mut self, update: &SettingsUpdate) -> Value {
        let sites_changed = self.engine.apply_settings(update);
        self.persist();
        info!(sites_changed, "settings update merged");

        // Re-resolve the foreground tab immediately so enabling tracking or
        // pressing start while already on a tracked page takes effect
        // without waiting for a tab event. Also force-stops on disable.
        self.sync_with_active_tab();

        if self.state().blocked_today && sites_changed {
            // Newly tracked domains join today's block right away. No
            // repeat notification for a re-scan.
            self.enforce_blocking();
        }
        json!({ "success": true })
    }

    // ── Countdown ────────────────────────────────────────────────────

    /// One tick of the armed countdown.
    pub fn handle_tick(&mut self) {
        match self.engine.tick() {
            TickOutcome::Decremented(time_left) => {
                debug!(time_left, "budget consumed one second");
                self.persist();
            }
            TickOutcome::Exhausted => {
                info!("budget exhausted, tracked sites blocked for the rest of the day");
                self.persist();
                if self.config.notifications.enabled {
                    self.notifier.notify(
                        &self.config.notifications.title,
                        &self.config.notifications.message,
                    );
                }
                self.enforce_blocking();
            }
            TickOutcome::Ignored => {
                debug!("stale tick ignored");
            }
        }
    }

    // ── Blocking enforcer ────────────────────────────────────────────

    /// Redirect every open tracked tab to the blocked page.
    fn enforce_blocking(&mut self) {
        if !self.state().enabled {
            return;
        }
        for tab in self.platform.all_tabs() {
            let domain = extract_domain(&tab.url);
            if self.state().is_tracked(&domain) {
                self.redirect(tab.id);
            }
        }
    }

    fn redirect(&self, tab_id: TabId) {
        if let Err(e) = self.platform.update_tab(tab_id, &self.config.blocking.page) {
            debug!(tab = tab_id, error = %e, "redirect failed, tab likely closed");
        }
    }

    fn persist(&self) {
        // Best-effort: a failed write leaves in-memory state authoritative
        // until the next successful one.
        if let Err(e) = self.store.save(self.engine.state()) {
            warn!(error = %e, "state write failed, continuing with in-memory state");
        }
    }

    fn reconcile(&mut self) {
        match self.engine.reevaluate() {
            Some(Event::CountdownStarted { time_left, .. }) => {
                info!(time_left, "countdown started");
            }
            Some(Event::CountdownStopped { time_left, .. }) => {
                info!(time_left, "countdown stopped");
            }
            _ => {}
        }
    }

    // ── Event loop ───────────────────────────────────────────────────

    /// Bootstrap, then process tab events, control messages, and the
    /// one-second tick until both inbound channels close.
    pub async fn run(
        mut self,
        mut tab_events: mpsc::Receiver<TabEvent>,
        mut control: mpsc::Receiver<ControlRequest>,
    ) {
        self.bootstrap();
        let mut ticker: Option<Interval> = None;

        loop {
            reconcile_ticker(&mut ticker, self.counting());
            tokio::select! {
                _ = next_tick(&mut ticker), if ticker.is_some() => {
                    self.handle_tick();
                }
                Some(event) = tab_events.recv() => {
                    self.handle_tab_event(event);
                }
                Some((message, reply)) = control.recv() => {
                    if let Some(ack) = self.handle_control(&message) {
                        let _ = reply.send(ack);
                    }
                }
                else => break,
            }
        }
    }

    /// Spawn the event loop on the current runtime and return its handle.
    pub fn spawn(self) -> SupervisorHandle
    where
        P: 'static,
        N: 'static,
        S: 'static,
    {
        let (tab_tx, tab_rx) = mpsc::channel(64);
        let (control_tx, control_rx) = mpsc::channel(16);
        tokio::spawn(self.run(tab_rx, control_rx));
        SupervisorHandle {
            tabs: tab_tx,
            control: control_tx,
        }
    }
}

/// Keep the interval armed exactly while the engine wants to count.
/// Arming an armed ticker or disarming a disarmed one is a no-op.
fn reconcile_ticker(ticker: &mut Option<Interval>, counting: bool) {
    match (ticker.is_some(), counting) {
        (false, true) => {
            let period = Duration::from_secs(1);
            let mut interval = interval_at(Instant::now() + period, period);
            // One decrement per elapsed second, even if the loop stalls.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            *ticker = Some(interval);
        }
        (true, false) => {
            *ticker = None;
        }
        _ => {}
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker.as_mut() {
        Some(interval) => {
            interval.tick().await;
        }
        // Branch is guarded by `ticker.is_some()`; never polled disarmed.
        None => std::future::pending().await,
    }
}

/// Cloneable handle for feeding a spawned supervisor.
#[derive(Clone)]
pub struct SupervisorHandle {
    tabs: mpsc::Sender<TabEvent>,
    control: mpsc::Sender<ControlRequest>,
}

impl SupervisorHandle {
    /// Deliver a tab event. Returns false when the loop has shut down.
    pub async fn tab_event(&self, event: TabEvent) -> bool {
        self.tabs.send(event).await.is_ok()
    }

    /// Send a raw control message and wait for the ack. `None` when the
    /// action was ignored or the loop has shut down.
    pub async fn send_raw(&self, message: Value) -> Option<Value> {
        let (tx, rx) = oneshot::channel();
        self.control.send((message, tx)).await.ok()?;
        rx.await.ok()
    }

    /// Push a settings update through the control channel.
    pub async fn update_settings(&self, update: &SettingsUpdate) -> Option<Value> {
        let mut message = serde_json::to_value(update).ok()?;
        message.as_object_mut()?.insert(
            CONTROL_ACTION_KEY.to_string(),
            Value::String(UPDATE_SETTINGS_ACTION.to_string()),
        );
        self.send_raw(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::{CountingNotifier, ScriptedTabs};
    use crate::storage::MemoryStore;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn seeded_store(state: &BudgetState) -> MemoryStore {
        let store = MemoryStore::new();
        store.save(state).unwrap();
        store
    }

    fn tracked_state() -> BudgetState {
        BudgetState {
            tracked_sites: ["example.com".to_string()].into(),
            initial_time: 60,
            time_left: 60,
            timer_active: true,
            last_reset_date: Some(day("2026-08-06")),
            ..BudgetState::default()
        }
    }

    fn supervisor_with(
        tabs: ScriptedTabs,
        state: &BudgetState,
    ) -> Supervisor<ScriptedTabs, CountingNotifier, MemoryStore> {
        let mut sup = Supervisor::new(
            tabs,
            CountingNotifier::default(),
            seeded_store(state),
            Config::default(),
        );
        sup.bootstrap_at(day("2026-08-06"));
        sup
    }

    #[test]
    fn bootstrap_resumes_countdown_on_tracked_foreground() {
        let tabs = ScriptedTabs::new();
        tabs.focus_url("https://www.example.com/feed");
        let sup = supervisor_with(tabs, &tracked_state());
        assert!(sup.counting());
    }

    #[test]
    fn background_navigation_does_not_move_foreground() {
        let tabs = ScriptedTabs::new();
        let focused = tabs.focus_url("https://example.com");
        tabs.open_url("https://other.com");
        let mut sup = supervisor_with(tabs, &tracked_state());
        assert!(sup.counting());

        // A background tab finishing a load must not stop the countdown.
        sup.handle_tab_event(TabEvent::Updated {
            tab_id: focused + 1,
            status: Some(LoadStatus::Complete),
            url: Some("https://other.com".into()),
        });
        assert!(sup.counting());
        assert_eq!(sup.engine.foreground(), Some("example.com"));
    }

    #[test]
    fn focused_navigation_away_stops_countdown() {
        let tabs = ScriptedTabs::new();
        let focused = tabs.focus_url("https://example.com");
        let mut sup = supervisor_with(tabs, &tracked_state());
        assert!(sup.counting());

        sup.handle_tab_event(TabEvent::Updated {
            tab_id: focused,
            status: None,
            url: Some("https://elsewhere.org".into()),
        });
        assert!(!sup.counting());
    }

    #[test]
    fn loading_status_alone_is_ignored() {
        let tabs = ScriptedTabs::new();
        let focused = tabs.focus_url("https://example.com");
        let mut sup = supervisor_with(tabs, &tracked_state());
        sup.handle_tab_event(TabEvent::Updated {
            tab_id: focused,
            status: Some(LoadStatus::Loading),
            url: None,
        });
        assert!(sup.counting());
    }

    #[test]
    fn activated_tab_that_closed_stops_countdown() {
        let tabs = ScriptedTabs::new();
        tabs.focus_url("https://example.com");
        let mut sup = supervisor_with(tabs.clone(), &tracked_state());
        assert!(sup.counting());

        sup.handle_tab_event(TabEvent::Activated { tab_id: 999 });
        assert!(!sup.counting());
    }

    #[test]
    fn exhaustion_notifies_once_and_redirects_all_tracked_tabs() {
        let tabs = ScriptedTabs::new();
        tabs.focus_url("https://example.com/a");
        tabs.open_url("https://example.com/b");
        tabs.open_url("https://unrelated.org");
        let notifier = CountingNotifier::default();
        let mut state = tracked_state();
        state.time_left = 1;
        let mut sup = Supervisor::new(
            tabs.clone(),
            notifier.clone(),
            seeded_store(&state),
            Config::default(),
        );
        sup.bootstrap_at(day("2026-08-06"));
        assert!(sup.counting());

        sup.handle_tick();
        assert!(sup.state().blocked_today);
        assert!(!sup.state().timer_active);
        assert_eq!(sup.state().time_left, 0);
        assert_eq!(notifier.count(), 1);
        // Both example.com tabs redirected, the unrelated one untouched.
        assert_eq!(tabs.redirects().len(), 2);

        // A later settings merge that changes sites re-scans but does not
        // re-notify.
        sup.apply_settings(&SettingsUpdate {
            sites: Some(vec!["example.com".into(), "unrelated.org".into()]),
            ..SettingsUpdate::default()
        });
        assert_eq!(notifier.count(), 1);
        assert_eq!(tabs.redirects().len(), 3);
    }

    #[test]
    fn blocked_navigation_is_intercepted() {
        let tabs = ScriptedTabs::new();
        let mut state = tracked_state();
        state.blocked_today = true;
        state.timer_active = false;
        state.time_left = 0;
        let mut sup = supervisor_with(tabs.clone(), &state);

        let tab_id = tabs.focus_url("https://example.com");
        sup.handle_tab_event(TabEvent::Activated { tab_id });
        assert_eq!(tabs.redirects().len(), 1);
        assert!(!sup.counting());
    }

    #[test]
    fn disable_suspends_monitoring_and_enforcement() {
        let tabs = ScriptedTabs::new();
        let tab_id = tabs.focus_url("https://example.com");
        let mut state = tracked_state();
        state.blocked_today = true;
        state.timer_active = false;
        state.enabled = false;
        let mut sup = supervisor_with(tabs.clone(), &state);

        sup.handle_tab_event(TabEvent::Activated { tab_id });
        assert!(tabs.redirects().is_empty());
        assert!(!sup.counting());
    }

    #[test]
    fn control_message_with_unknown_action_is_ignored() {
        let tabs = ScriptedTabs::new();
        let mut sup = supervisor_with(tabs, &tracked_state());
        assert!(sup.handle_control(&json!({ "action": "self-destruct" })).is_none());
        assert!(sup.handle_control(&json!({ "sites": ["x.com"] })).is_none());
        // State untouched by either.
        assert!(sup.state().is_tracked("example.com"));
        assert_eq!(sup.state().tracked_sites.len(), 1);
    }

    #[test]
    fn update_settings_acks_and_starts_without_tab_event() {
        let tabs = ScriptedTabs::new();
        tabs.focus_url("https://example.com");
        let mut state = tracked_state();
        state.timer_active = false;
        let mut sup = supervisor_with(tabs, &state);
        assert!(!sup.counting());

        let ack = sup
            .handle_control(&json!({ "action": "update-settings", "timerActive": true }))
            .unwrap();
        assert_eq!(ack, json!({ "success": true }));
        // Foreground was re-resolved during the merge; no tab event needed.
        assert!(sup.counting());
    }

    #[test]
    fn settings_persist_through_store() {
        let tabs = ScriptedTabs::new();
        let store = seeded_store(&tracked_state());
        let mut sup = Supervisor::new(
            tabs,
            CountingNotifier::default(),
            store.clone(),
            Config::default(),
        );
        sup.bootstrap_at(day("2026-08-06"));
        sup.apply_settings(&SettingsUpdate {
            initial_time: Some(300),
            time_left: Some(300),
            ..SettingsUpdate::default()
        });
        let persisted = store.persisted().unwrap();
        assert_eq!(persisted.initial_time, 300);
        assert_eq!(persisted.time_left, 300);
    }

    #[test]
    fn rebootstrap_next_day_rolls_budget_over() {
        let tabs = ScriptedTabs::new();
        let mut state = tracked_state();
        state.initial_time = 0;
        state.time_left = 45;
        state.last_reset_date = Some(day("2026-08-05"));
        let store = seeded_store(&state);
        let mut sup = Supervisor::new(
            tabs,
            CountingNotifier::default(),
            store.clone(),
            Config::default(),
        );
        sup.bootstrap_at(day("2026-08-06"));
        assert_eq!(sup.state().initial_time, 45);
        assert_eq!(sup.state().time_left, 45);
        assert!(sup.state().timer_active);
        // Rollover persisted immediately.
        assert_eq!(store.persisted().unwrap().initial_time, 45);
    }
}
