//! Listener registry and rebind dispatch.
//!
//! Two kinds of observers are notified after every auth transition:
//! application listeners, held strongly, and service clients, held weakly
//! so that a dropped client silently stops receiving events.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tether_domain::{AuthUser, RebindEvent};
use tracing::trace;

use super::AuthMachine;

/// Application-level observer of auth transitions.
///
/// Callbacks run synchronously on the task that performed the transition,
/// after the new state is visible. They may read from the [`AuthMachine`]
/// but must not block.
pub trait AuthListener: Send + Sync {
    /// The active user changed. Also fires when switching to the user that
    /// was already active.
    fn on_active_user_changed(
        &self,
        auth: &AuthMachine,
        current: Option<&AuthUser>,
        previous: Option<&AuthUser>,
    );

    /// A user's credentials were dropped.
    fn on_user_logged_out(&self, auth: &AuthMachine, user: &AuthUser) {
        let _ = (auth, user);
    }

    /// A user was deleted from the registry.
    fn on_user_removed(&self, auth: &AuthMachine, user: &AuthUser) {
        let _ = (auth, user);
    }
}

/// A component that caches per-user state and must rebind when the
/// active user changes.
pub trait RebindTarget: Send + Sync {
    /// Handles one rebind event.
    fn on_rebind_event(&self, event: &RebindEvent);
}

/// Fans rebind events out to listeners and bound service clients.
#[derive(Default)]
pub struct RebindDispatcher {
    listeners: RwLock<Vec<Arc<dyn AuthListener>>>,
    targets: Mutex<Vec<Weak<dyn RebindTarget>>>,
}

impl std::fmt::Debug for RebindDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebindDispatcher")
            .field("listeners", &self.listeners.read().len())
            .field("targets", &self.targets.lock().len())
            .finish()
    }
}

impl RebindDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Registration order is notification order.
    pub fn add_listener(&self, listener: Arc<dyn AuthListener>) {
        self.listeners.write().push(listener);
    }

    /// Unregisters a listener by identity. Returns true if it was present.
    pub fn remove_listener(&self, listener: &Arc<dyn AuthListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    /// Binds a target without keeping it alive. Binding the same target
    /// twice has no effect.
    pub fn bind(&self, target: Weak<dyn RebindTarget>) {
        let mut targets = self.targets.lock();
        targets.retain(|t| t.strong_count() > 0);
        if !targets.iter().any(|t| Weak::ptr_eq(t, &target)) {
            targets.push(target);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Number of bound targets still alive.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.targets
            .lock()
            .iter()
            .filter(|t| t.strong_count() > 0)
            .count()
    }

    /// Delivers events in order. For each event every listener is notified
    /// first, then every live target.
    pub fn dispatch(&self, auth: &AuthMachine, events: &[RebindEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<_> = self.listeners.read().clone();
        let targets: Vec<_> = {
            let mut targets = self.targets.lock();
            targets.retain(|t| t.strong_count() > 0);
            targets.iter().filter_map(Weak::upgrade).collect()
        };

        for event in events {
            trace!(
                kind = ?event.kind(),
                listeners = listeners.len(),
                targets = targets.len(),
                "dispatching rebind event"
            );
            for listener in &listeners {
                notify(listener.as_ref(), auth, event);
            }
            for target in &targets {
                target.on_rebind_event(event);
            }
        }
    }
}

fn notify(listener: &dyn AuthListener, auth: &AuthMachine, event: &RebindEvent) {
    match event {
        RebindEvent::ActiveUserChanged { previous, current } => {
            listener.on_active_user_changed(auth, current.as_ref(), previous.as_ref());
        }
        RebindEvent::UserLoggedOut { user } => listener.on_user_logged_out(auth, user),
        RebindEvent::UserRemoved { user } => listener.on_user_removed(auth, user),
    }
}
