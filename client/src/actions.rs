//! Session actions.
//!
//! User intents carry a [`RequestId`] when they start a request; the result
//! action fed back by the request's effect carries the same id.

use crate::error::ApiError;
use crate::router::Route;
use crate::state::{EventFilter, SortOrder};
use crate::types::{Booking, Event, EventDraft, EventId, RegistrationForm, RequestId, Role};
use serde_json::Value;

/// Every input to the session reducer
#[derive(Debug, Clone)]
pub enum SessionAction {
    // User type and navigation
    /// Toggle the login page's user type
    SelectUserType {
        /// Selected type
        role: Role,
    },
    /// Navigate to a page or tab
    Navigate {
        /// Target
        route: Route,
    },

    // Authentication
    /// Sign-in form submitted
    LoginSubmitted {
        /// Correlation id
        request: RequestId,
        /// Username
        username: String,
        /// Password
        password: String,
    },
    /// Sign-in accepted
    LoginSucceeded {
        /// Correlation id
        request: RequestId,
        /// Username that signed in
        username: String,
    },
    /// Sign-in rejected
    LoginFailed {
        /// Correlation id
        request: RequestId,
        /// User-facing message
        message: String,
    },
    /// Sign-up form submitted
    RegisterSubmitted {
        /// Correlation id
        request: RequestId,
        /// Form contents
        form: RegistrationForm,
    },
    /// Account created
    RegisterSucceeded {
        /// Correlation id
        request: RequestId,
        /// Raw server response
        response: Value,
    },
    /// Account creation failed
    RegisterFailed {
        /// Correlation id
        request: RequestId,
        /// User-facing message
        message: String,
    },
    /// Sign out
    Logout,

    // Events
    /// Refresh the event list
    LoadEvents,
    /// Event list arrived
    EventsLoaded {
        /// Session epoch the request was made in
        epoch: u64,
        /// Events
        events: Vec<Event>,
    },
    /// Event list request failed
    EventsLoadFailed {
        /// Session epoch the request was made in
        epoch: u64,
        /// Failure
        error: ApiError,
    },
    /// Fetch one event's details
    EventDetailsRequested {
        /// Correlation id
        request: RequestId,
        /// Event
        event_id: EventId,
    },
    /// Event details arrived
    EventDetailsLoaded {
        /// Correlation id
        request: RequestId,
        /// Session epoch the request was made in
        epoch: u64,
        /// Event
        event_id: EventId,
        /// Raw server response
        details: Value,
    },
    /// Event details request failed
    EventDetailsFailed {
        /// Correlation id
        request: RequestId,
        /// Failure, unmodified
        error: ApiError,
    },
    /// Create-event form submitted
    CreateEventSubmitted {
        /// Correlation id
        request: RequestId,
        /// Form contents
        draft: EventDraft,
    },
    /// Event created
    EventCreated {
        /// Correlation id
        request: RequestId,
        /// Raw server response
        response: Value,
    },
    /// Event creation failed
    CreateEventFailed {
        /// Correlation id
        request: RequestId,
        /// User-facing message
        message: String,
    },
    /// Edit clicked on the manage list
    EditEventRequested {
        /// Event
        event_id: EventId,
    },
    /// Delete clicked on the manage list
    DeleteEventRequested {
        /// Event
        event_id: EventId,
    },

    // Bookings and favorites
    /// Book button clicked
    BookSubmitted {
        /// Correlation id
        request: RequestId,
        /// Event
        event_id: EventId,
    },
    /// Booking confirmed
    EventBooked {
        /// Correlation id
        request: RequestId,
        /// Recorded booking
        booking: Booking,
    },
    /// Booking failed
    BookingFailed {
        /// Correlation id
        request: RequestId,
        /// Event
        event_id: EventId,
        /// User-facing message
        message: String,
    },
    /// Heart toggled on an event
    ToggleFavorite {
        /// Event
        event_id: EventId,
    },

    // Query and notices
    /// Search box changed
    SetSearch {
        /// Search text
        term: String,
    },
    /// Filter changed
    SetFilter {
        /// Filter
        filter: EventFilter,
    },
    /// Sort changed
    SetSort {
        /// Ordering
        order: SortOrder,
    },
    /// Notice dismissed
    DismissNotice,
}

/// How a submitted request ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The operation succeeded
    Succeeded,
    /// The operation failed with a user-facing message
    Failed(String),
    /// A read succeeded with this payload
    Loaded(Value),
    /// A read failed with this error
    Errored(ApiError),
}

impl SessionAction {
    /// The outcome this action reports for `request`, if it is a result of it
    #[must_use]
    pub fn outcome_for(&self, request: RequestId) -> Option<Outcome> {
        let (id, outcome) = match self {
            Self::LoginSucceeded { request, .. }
            | Self::RegisterSucceeded { request, .. }
            | Self::EventCreated { request, .. }
            | Self::EventBooked { request, .. } => (*request, Outcome::Succeeded),
            Self::LoginFailed { request, message }
            | Self::RegisterFailed { request, message }
            | Self::CreateEventFailed { request, message }
            | Self::BookingFailed {
                request, message, ..
            } => (*request, Outcome::Failed(message.clone())),
            Self::EventDetailsLoaded {
                request, details, ..
            } => (*request, Outcome::Loaded(details.clone())),
            Self::EventDetailsFailed { request, error } => {
                (*request, Outcome::Errored(error.clone()))
            },
            _ => return None,
        };
        (id == request).then_some(outcome)
    }
}
