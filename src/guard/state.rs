// src/guard/state.rs

//! Shared supervisory state.
//!
//! Written by both output readers and by the startup wait loop, read by
//! anyone holding the guard. Backed by a `tokio::sync::watch` sender so the
//! wait loop can wake as soon as a reader reaches a terminal state instead
//! of sleeping out the whole poll slice.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::timeout;

use crate::guard::spec::StartupPolicy;
use crate::types::GuardState;

#[derive(Debug, Clone)]
pub struct StateCell {
    tx: Arc<watch::Sender<GuardState>>,
}

impl StateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GuardState::Waiting);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> GuardState {
        *self.tx.borrow()
    }

    /// Unconditionally replace the state, returning the previous one.
    pub fn force(&self, state: GuardState) -> GuardState {
        self.tx.send_replace(state)
    }

    /// Move out of `Starting` into `to`.
    ///
    /// Returns false (and changes nothing) if the run already left
    /// `Starting`, which keeps keyword transitions monotonic.
    pub fn leave_starting(&self, to: GuardState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == GuardState::Starting {
                *state = to;
                true
            } else {
                false
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.tx.subscribe()
    }

    /// Startup wait protocol: wait up to `policy.max_polls` slices of
    /// `policy.poll_interval` for a terminal state.
    ///
    /// Returns `None` if the ceiling is reached first.
    pub async fn wait_for_terminal(&self, policy: &StartupPolicy) -> Option<GuardState> {
        let mut rx = self.subscribe();

        for _ in 0..policy.max_polls {
            let state = *rx.borrow_and_update();
            if state.is_terminal() {
                return Some(state);
            }
            // Elapsed slice and change notification both lead to a re-check.
            let _ = timeout(policy.poll_interval, rx.changed()).await;
        }

        let state = *rx.borrow();
        state.is_terminal().then_some(state)
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;

    fn fast_policy(max_polls: u32) -> StartupPolicy {
        StartupPolicy {
            poll_interval: Duration::from_millis(10),
            max_polls,
        }
    }

    #[test]
    fn starts_waiting() {
        assert_eq!(StateCell::new().current(), GuardState::Waiting);
    }

    #[test]
    fn leave_starting_only_fires_once() {
        let cell = StateCell::new();
        cell.force(GuardState::Starting);

        assert!(cell.leave_starting(GuardState::Started));
        assert!(!cell.leave_starting(GuardState::Stopped));
        assert_eq!(cell.current(), GuardState::Started);
    }

    #[test]
    fn leave_starting_ignored_before_start() {
        let cell = StateCell::new();
        assert!(!cell.leave_starting(GuardState::Started));
        assert_eq!(cell.current(), GuardState::Waiting);
    }

    #[test]
    fn force_overrides_terminal_state() {
        let cell = StateCell::new();
        cell.force(GuardState::Started);
        let previous = cell.force(GuardState::Stopped);
        assert_eq!(previous, GuardState::Started);
        assert_eq!(cell.current(), GuardState::Stopped);
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_terminal() {
        let cell = StateCell::new();
        cell.force(GuardState::Stopped);

        let begin = Instant::now();
        let state = cell.wait_for_terminal(&fast_policy(100)).await;
        assert_eq!(state, Some(GuardState::Stopped));
        assert!(begin.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn wait_wakes_on_transition_from_another_task() {
        let cell = StateCell::new();
        cell.force(GuardState::Starting);

        let writer = cell.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer.leave_starting(GuardState::Started);
        });

        let state = cell.wait_for_terminal(&fast_policy(200)).await;
        assert_eq!(state, Some(GuardState::Started));
    }

    #[tokio::test]
    async fn wait_gives_up_after_ceiling() {
        let cell = StateCell::new();
        cell.force(GuardState::Starting);

        let policy = fast_policy(5);
        let begin = Instant::now();
        let state = cell.wait_for_terminal(&policy).await;

        assert_eq!(state, None);
        assert!(begin.elapsed() >= policy.ceiling());
        assert_eq!(cell.current(), GuardState::Starting);
    }
}
