//! Per-node health and lifecycle record.
//!
//! The record is an observable value: the owning node writes it, any number
//! of readers (UI, scheduler, tests) take snapshots or subscribe to changes.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::utils;

/// Lifecycle state of a node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum State {
    #[default]
    NeedsInit,
    Ready,
    Working,
    Finished,
}

/// Coarse usability signal, independent of the lifecycle state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Health {
    #[default]
    Healthy,
    Sick,
    Broken,
}

/// Outcome of the most recent execution.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LastResult {
    #[default]
    Unknown,
    Success,
    Fail,
}

impl From<bool> for LastResult {
    fn from(value: bool) -> Self {
        if value { LastResult::Success } else { LastResult::Fail }
    }
}

/// Point-in-time copy of a [`HealthRecord`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub enabled: bool,
    pub state: State,
    pub health: Health,
    pub last_result: LastResult,
    pub unhealthy_reason: String,
    /// timestamp in milliseconds of the last change
    pub updated_at: i64,
}

impl HealthSnapshot {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: State::NeedsInit,
            health: Health::Healthy,
            last_result: LastResult::Unknown,
            unhealthy_reason: String::new(),
            updated_at: utils::time::time_millis(),
        }
    }

    /// `enabled ∧ health ≠ Broken ∧ state ≠ NeedsInit`
    pub fn can_execute(&self) -> bool {
        self.enabled && self.health != Health::Broken && self.state != State::NeedsInit
    }
}

/// Health, lifecycle state and last outcome of one node.
pub struct HealthRecord {
    tx: watch::Sender<HealthSnapshot>,
}

impl std::fmt::Debug for HealthRecord {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_tuple("HealthRecord").field(&*self.tx.borrow()).finish()
    }
}

impl Default for HealthRecord {
    fn default() -> Self {
        Self::new(true)
    }
}

impl HealthRecord {
    pub fn new(enabled: bool) -> Self {
        Self {
            tx: watch::Sender::new(HealthSnapshot::new(enabled)),
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.tx.borrow().clone()
    }

    pub fn can_execute(&self) -> bool {
        self.tx.borrow().can_execute()
    }

    pub fn enabled(&self) -> bool {
        self.tx.borrow().enabled
    }

    pub fn state(&self) -> State {
        self.tx.borrow().state
    }

    pub fn health(&self) -> Health {
        self.tx.borrow().health
    }

    pub fn last_result(&self) -> LastResult {
        self.tx.borrow().last_result
    }

    pub fn unhealthy_reason(&self) -> String {
        self.tx.borrow().unhealthy_reason.clone()
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.tx.subscribe()
    }

    /// Stream of snapshots, starting with the current one.
    pub fn stream(&self) -> WatchStream<HealthSnapshot> {
        WatchStream::new(self.tx.subscribe())
    }

    /// User toggle. Disabled nodes never execute.
    pub fn set_enabled(
        &self,
        enabled: bool,
    ) {
        self.update(|s| {
            if s.enabled == enabled {
                return false;
            }
            s.enabled = enabled;
            true
        });
    }

    /// Force `(NeedsInit, Broken, reason)`.
    ///
    /// The first reason recorded since the last reset is kept, so a parent
    /// reports the first broken child it met.
    pub fn mark_broken(
        &self,
        reason: impl Into<String>,
    ) {
        let reason = reason.into();
        self.update(|s| {
            if s.health != Health::Broken {
                s.unhealthy_reason = reason;
            }
            s.health = Health::Broken;
            s.state = State::NeedsInit;
            true
        });
    }

    /// Flag a degraded condition without blocking execution.
    ///
    /// Never downgrades a broken record.
    pub fn mark_sick(
        &self,
        reason: impl Into<String>,
    ) {
        let reason = reason.into();
        self.update(|s| {
            if s.health != Health::Healthy {
                return false;
            }
            s.health = Health::Sick;
            s.unhealthy_reason = reason;
            true
        });
    }

    /// `(Ready, Healthy, "")`, the starting point of every `init()`.
    pub(crate) fn reset(&self) {
        self.update(|s| {
            s.state = State::Ready;
            s.health = Health::Healthy;
            s.unhealthy_reason.clear();
            true
        });
    }

    /// Enter `Working` if the node may execute. Returns whether it did.
    pub(crate) fn begin(&self) -> bool {
        let mut began = false;
        self.update(|s| {
            if !s.can_execute() {
                return false;
            }
            s.state = State::Working;
            s.last_result = LastResult::Unknown;
            began = true;
            true
        });
        began
    }

    /// Leave `Working` with the given outcome.
    ///
    /// A node broken while it was working stays in `NeedsInit`.
    pub(crate) fn finish(
        &self,
        result: LastResult,
    ) {
        self.update(|s| {
            s.last_result = result;
            if s.health != Health::Broken {
                s.state = State::Finished;
            }
            true
        });
    }

    fn update(
        &self,
        f: impl FnOnce(&mut HealthSnapshot) -> bool,
    ) {
        self.tx.send_if_modified(|s| {
            let modified = f(s);
            if modified {
                s.updated_at = utils::time::time_millis();
            }
            modified
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> HealthRecord {
        let record = HealthRecord::new(true);
        record.reset();
        record
    }

    #[test]
    fn starts_in_needs_init() {
        let record = HealthRecord::new(true);
        assert_eq!(record.state(), State::NeedsInit);
        assert_eq!(record.health(), Health::Healthy);
        assert_eq!(record.last_result(), LastResult::Unknown);
        assert!(!record.can_execute());
    }

    #[test]
    fn reset_makes_executable() {
        let record = ready();
        assert_eq!(record.state(), State::Ready);
        assert!(record.can_execute());
    }

    #[test]
    fn broken_never_executes_even_when_enabled() {
        let record = ready();
        record.mark_broken("image missing");
        assert!(!record.can_execute());
        assert_eq!(record.state(), State::NeedsInit);
        assert_eq!(record.health(), Health::Broken);

        record.set_enabled(false);
        assert!(!record.can_execute());
        record.set_enabled(true);
        assert!(!record.can_execute());
    }

    #[test]
    fn disabled_never_executes() {
        let record = ready();
        record.set_enabled(false);
        assert!(!record.can_execute());
        assert!(!record.begin());
        assert_eq!(record.state(), State::Ready);
    }

    #[test]
    fn first_broken_reason_wins_until_reset() {
        let record = ready();
        record.mark_broken("first");
        record.mark_broken("second");
        assert_eq!(record.unhealthy_reason(), "first");

        record.reset();
        assert_eq!(record.health(), Health::Healthy);
        assert_eq!(record.unhealthy_reason(), "");
    }

    #[test]
    fn sick_keeps_state_and_executes() {
        let record = ready();
        record.mark_sick("fallback image unused");
        assert_eq!(record.state(), State::Ready);
        assert_eq!(record.health(), Health::Sick);
        assert!(record.can_execute());

        record.mark_broken("now broken");
        record.mark_sick("ignored");
        assert_eq!(record.health(), Health::Broken);
        assert_eq!(record.unhealthy_reason(), "now broken");
    }

    #[test]
    fn begin_and_finish() {
        let record = ready();
        assert!(record.begin());
        assert_eq!(record.state(), State::Working);
        assert_eq!(record.last_result(), LastResult::Unknown);

        record.finish(LastResult::Success);
        assert_eq!(record.state(), State::Finished);
        assert_eq!(record.last_result(), LastResult::Success);
        assert!(record.can_execute());
    }

    #[test]
    fn finish_after_break_stays_needs_init() {
        let record = ready();
        assert!(record.begin());
        record.mark_broken("re-initialized with a bad path");
        record.finish(LastResult::Fail);
        assert_eq!(record.state(), State::NeedsInit);
        assert_eq!(record.last_result(), LastResult::Fail);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let record = ready();
        let mut rx = record.subscribe();
        rx.borrow_and_update();

        record.mark_sick("degraded");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().health, Health::Sick);
    }

    #[tokio::test]
    async fn stream_starts_with_current_snapshot() {
        use tokio_stream::StreamExt;

        let record = ready();
        let mut stream = record.stream();
        let first = stream.next().await.unwrap();
        assert_eq!(first.state, State::Ready);
        assert_eq!(first.health, Health::Healthy);

        record.mark_broken("image gone");
        let next = stream.next().await.unwrap();
        assert_eq!(next.health, Health::Broken);
        assert_eq!(next.unhealthy_reason, "image gone");
    }
}
