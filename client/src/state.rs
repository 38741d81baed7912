//! Session state.
//!
//! One explicit, volatile container for everything the client knows about
//! the current session. It is owned by the store and mutated only by
//! [`SessionReducer`](crate::reducer::SessionReducer).

use crate::router::ViewRouter;
use crate::types::{Booking, Event, EventId, Identity, RequestId, Role};
use serde_json::Value;
use std::collections::HashMap;

/// Forms with a submit control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    /// Sign-in form
    Login,
    /// Sign-up form
    Signup,
    /// Create-event form
    CreateEvent,
}

impl FormKind {
    /// Label shown on the submit control while a request is in flight
    #[must_use]
    pub const fn busy_label(self) -> &'static str {
        match self {
            Self::Login => "Signing In...",
            Self::Signup => "Creating Account...",
            Self::CreateEvent => "Creating Event...",
        }
    }

    /// Label shown on the idle submit control
    #[must_use]
    pub const fn idle_label(self) -> &'static str {
        match self {
            Self::Login => "Sign In",
            Self::Signup => "Create Account",
            Self::CreateEvent => "Create Event",
        }
    }
}

/// Label of a book button while its request is in flight
pub const BOOKING_BUSY_LABEL: &str = "Booking...";

/// Submit state of one form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormStatus {
    /// Request currently in flight; the control is disabled while set
    pub in_flight: Option<RequestId>,
    /// Inline error from the last submission
    pub error: Option<String>,
    /// Inline success message from the last submission
    pub success: Option<String>,
}

impl FormStatus {
    /// Whether the submit control is disabled
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Atomically claim the form for `request`
    ///
    /// Returns `false` (and changes nothing) if a request is already in
    /// flight. On success prior error and success indicators are cleared.
    pub fn begin(&mut self, request: RequestId) -> bool {
        if self.is_busy() {
            return false;
        }
        self.in_flight = Some(request);
        self.error = None;
        self.success = None;
        true
    }

    /// Release the form if `request` is the one in flight
    ///
    /// Returns `false` for results of requests this form no longer waits for.
    pub fn finish(&mut self, request: RequestId) -> bool {
        if self.in_flight != Some(request) {
            return false;
        }
        self.in_flight = None;
        true
    }
}

/// Submit state of all forms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forms {
    /// Sign-in form
    pub login: FormStatus,
    /// Sign-up form
    pub signup: FormStatus,
    /// Create-event form
    pub create_event: FormStatus,
}

impl Forms {
    /// Status of `kind`
    #[must_use]
    pub const fn get(&self, kind: FormKind) -> &FormStatus {
        match kind {
            FormKind::Login => &self.login,
            FormKind::Signup => &self.signup,
            FormKind::CreateEvent => &self.create_event,
        }
    }
}

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Operation succeeded
    Success,
    /// Operation failed
    Error,
    /// Informational, e.g. a feature that is not available
    Info,
}

/// A transient message shown above the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub kind: NoticeKind,
    /// Text
    pub message: String,
}

impl Notice {
    /// A success notice
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    /// An error notice
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    /// An informational notice
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }
}

/// Customer event list filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    /// Everything
    #[default]
    All,
    /// Seats remaining
    Available,
    /// No seats remaining
    SoldOut,
    /// In the favorites
    Favorites,
}

/// Customer event list ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Soonest first
    #[default]
    DateAscending,
    /// Latest first
    DateDescending,
    /// Alphabetical by title
    Title,
    /// Most remaining seats first
    MostAvailable,
}

/// Search, filter and sort applied to the customer event list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Case-insensitive substring over title, description and location
    pub search: String,
    /// Filter
    pub filter: EventFilter,
    /// Ordering
    pub sort: SortOrder,
}

impl EventQuery {
    /// Whether the query narrows the list at all
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.search.trim().is_empty() || self.filter != EventFilter::All
    }
}

/// Details fetched for one event
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedEvent {
    /// Event the details belong to
    pub event_id: EventId,
    /// Raw server response
    pub details: Value,
}

/// The session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Signed-in user
    pub identity: Option<Identity>,
    /// User type toggle on the login page
    pub selected_role: Role,
    /// Cached event list
    pub events: Vec<Event>,
    /// Bookings made in this session
    pub bookings: Vec<Booking>,
    /// Favorite event ids, in the order they were added
    pub favorites: Vec<EventId>,
    /// Details of the last event looked at
    pub selected_event: Option<SelectedEvent>,
    /// Page and tab state
    pub router: ViewRouter,
    /// Form submit state
    pub forms: Forms,
    /// Book requests in flight, by event
    pub pending_bookings: HashMap<EventId, RequestId>,
    /// Current notice
    pub notice: Option<Notice>,
    /// Customer event list query
    pub query: EventQuery,
    /// Bumped on logout; list results tagged with an older epoch are dropped
    pub session_epoch: u64,
}

impl SessionState {
    /// Role of the signed-in user
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(|identity| identity.role)
    }

    /// Look up a cached event
    #[must_use]
    pub fn event(&self, event_id: &EventId) -> Option<&Event> {
        self.events.iter().find(|e| &e.event_id == event_id)
    }

    /// Whether `event_id` is a favorite
    #[must_use]
    pub fn is_favorite(&self, event_id: &EventId) -> bool {
        self.favorites.contains(event_id)
    }

    /// Whether a book request for `event_id` is in flight
    #[must_use]
    pub fn is_booking(&self, event_id: &EventId) -> bool {
        self.pending_bookings.contains_key(event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_claim_is_exclusive() {
        let mut form = FormStatus {
            error: Some("old".to_string()),
            ..FormStatus::default()
        };
        let first = RequestId::new();
        let second = RequestId::new();

        assert!(form.begin(first));
        assert!(form.error.is_none());
        assert!(!form.begin(second));

        assert!(!form.finish(second));
        assert!(form.finish(first));
        assert!(!form.is_busy());
    }

    #[test]
    fn default_query_is_inactive() {
        let mut query = EventQuery::default();
        assert!(!query.is_active());
        query.search = "  ".to_string();
        assert!(!query.is_active());
        query.filter = EventFilter::SoldOut;
        assert!(query.is_active());
    }
}
