//! Shared record of the active debug session.

use std::sync::Arc;

use parking_lot::Mutex;
use smol_str::SmolStr;

use crate::error::DebugError;

/// Identity of the editor request that owns a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(pub u64);

#[derive(Debug, Default)]
struct WatcherState {
    active: Option<OwnerId>,
    disabled_search_path: Option<SmolStr>,
}

/// Cloneable handle; all clones observe the same session.
#[derive(Debug, Clone, Default)]
pub struct SessionWatcher {
    state: Arc<Mutex<WatcherState>>,
}

impl SessionWatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_debugging(&self) -> bool {
        self.state.lock().active.is_some()
    }

    #[must_use]
    pub fn active_owner(&self) -> Option<OwnerId> {
        self.state.lock().active
    }

    /// Marks `owner` as the running session. Re-entering with the same owner
    /// is allowed.
    pub fn try_begin(&self, owner: OwnerId) -> Result<(), DebugError> {
        let mut state = self.state.lock();
        match state.active {
            Some(active) if active != owner => Err(DebugError::SessionActive),
            _ => {
                state.active = Some(owner);
                Ok(())
            }
        }
    }

    /// Ends the session if `owner` holds it; returns whether it did.
    pub fn end(&self, owner: OwnerId) -> bool {
        let mut state = self.state.lock();
        if state.active == Some(owner) {
            state.active = None;
            true
        } else {
            false
        }
    }

    /// Stops offering debugging for statements run under `search_path`.
    pub fn disable(&self, search_path: impl Into<SmolStr>) {
        self.state.lock().disabled_search_path = Some(search_path.into());
    }

    pub fn enable(&self) {
        self.state.lock().disabled_search_path = None;
    }

    #[must_use]
    pub fn disabled_search_path(&self) -> Option<SmolStr> {
        self.state.lock().disabled_search_path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_session_at_a_time() {
        let watcher = SessionWatcher::new();
        let other = watcher.clone();
        watcher.try_begin(OwnerId(1)).unwrap();
        assert!(other.is_debugging());
        assert_eq!(other.try_begin(OwnerId(2)), Err(DebugError::SessionActive));
        watcher.try_begin(OwnerId(1)).unwrap();
    }

    #[test]
    fn only_owner_ends_session() {
        let watcher = SessionWatcher::new();
        watcher.try_begin(OwnerId(1)).unwrap();
        assert!(!watcher.end(OwnerId(2)));
        assert!(watcher.is_debugging());
        assert!(watcher.end(OwnerId(1)));
        assert!(!watcher.is_debugging());
        assert!(!watcher.end(OwnerId(1)));
    }

    #[test]
    fn disable_is_shared() {
        let watcher = SessionWatcher::new();
        watcher.clone().disable("public");
        assert_eq!(watcher.disabled_search_path().as_deref(), Some("public"));
        watcher.enable();
        assert_eq!(watcher.disabled_search_path(), None);
    }
}
