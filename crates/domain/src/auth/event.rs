//! Rebind events: notifications that the set of users changed.

use super::AuthUser;

/// Discriminant of a [`RebindEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebindEventKind {
    /// The active user changed (possibly to the same user, or to none).
    ActiveUserChanged,
    /// A user's credentials were dropped.
    UserLoggedOut,
    /// A user was deleted from the registry.
    UserRemoved,
}

/// A transient notification dispatched after an auth state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebindEvent {
    /// The active user changed.
    ActiveUserChanged {
        /// Active user before the transition.
        previous: Option<AuthUser>,
        /// Active user after the transition.
        current: Option<AuthUser>,
    },
    /// A user was logged out.
    UserLoggedOut {
        /// The user, as of after logout.
        user: AuthUser,
    },
    /// A user was removed.
    UserRemoved {
        /// The removed user.
        user: AuthUser,
    },
}

impl RebindEvent {
    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> RebindEventKind {
        match self {
            Self::ActiveUserChanged { .. } => RebindEventKind::ActiveUserChanged,
            Self::UserLoggedOut { .. } => RebindEventKind::UserLoggedOut,
            Self::UserRemoved { .. } => RebindEventKind::UserRemoved,
        }
    }
}
