//! Injectable session state container.
//!
//! DESIGN
//! ======
//! One `SessionStore` owns one `SessionState`. Every mutation goes through
//! [`SessionStore::dispatch`], which runs the reducer while holding the watch
//! channel's write side, so concurrent dispatchers are serialized without a
//! caller-visible lock. Readers either snapshot the state or subscribe.
//!
//! Two subscription surfaces exist: a `watch` receiver for the latest state
//! and a `broadcast` receiver for the discrete transitions in the order they
//! were applied. The broadcast send happens inside the same critical section
//! as the state write, so both surfaces agree on ordering.
//!
//! Each login attempt gets a generation number from [`SessionStore::begin_login`].
//! Every applied `REQUEST_LOG_USER_OUT` bumps the generation, whichever
//! caller dispatched it, so `resolve_login` can drop the
//! outcome of an attempt that a logout overtook.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{broadcast, watch};

use crate::state::{SessionState, Transition, reduce};

const TRANSITION_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
    transitions: broadcast::Sender<Transition>,
    /// Only written inside the watch channel's write section.
    generation: Arc<AtomicU64>,
}

impl SessionStore {
    /// Build an independent store holding the initial (anonymous) state.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self { state: Arc::new(state), transitions, generation: Arc::new(AtomicU64::new(0)) }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Receiver for applied transitions. Transitions applied before this
    /// call are not replayed.
    #[must_use]
    pub fn subscribe_transitions(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    /// Apply a transition and notify subscribers.
    pub fn dispatch(&self, transition: Transition) {
        self.state.send_modify(|state| self.apply(state, transition));
    }

    /// Dispatch `REQUEST_LOGIN` unless a login is already outstanding.
    ///
    /// Returns the attempt's generation, or `None` (leaving the state
    /// untouched) when `is_loading` was already set. The check and the write
    /// happen atomically.
    pub fn begin_login(&self) -> Option<u64> {
        let mut attempt = None;
        self.state.send_if_modified(|state| {
            if state.is_loading {
                return false;
            }
            attempt = Some(self.generation.fetch_add(1, Ordering::Relaxed) + 1);
            self.apply(state, Transition::RequestLogin);
            true
        });
        attempt
    }

    /// Resolve login `attempt` with the transition built by `resolve`, unless
    /// a logout has happened since the attempt began.
    ///
    /// `resolve` runs inside the write section, so side effects it performs
    /// cannot interleave with a logout. Returns `false` when the attempt was
    /// stale and `resolve` was not called.
    pub(crate) fn resolve_login(&self, attempt: u64, resolve: impl FnOnce() -> Transition) -> bool {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::Relaxed) != attempt {
                return false;
            }
            self.apply(state, resolve());
            true
        })
    }

    fn apply(&self, state: &mut SessionState, transition: Transition) {
        if transition == Transition::RequestLogUserOut {
            self.generation.fetch_add(1, Ordering::Relaxed);
        }
        *state = reduce(state, &transition);
        tracing::debug!(transition = transition.name(), phase = ?state.phase(), "session transition applied");
        // No live transition subscribers is fine.
        let _ = self.transitions.send(transition);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
