//! Domain types for the EventPass client.
//!
//! Events are server-owned and cached read-only; bookings and favorites are
//! client-local and live only as long as the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Server-assigned event identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Create a new `EventId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Correlates a submission with the result action its effect feeds back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a new random request id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a signed-in user, also used for the login page's user type toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Browses and books events
    #[default]
    Customer,
    /// Creates and manages events
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Username as typed at login
    pub username: String,
    /// Role inferred at login
    pub role: Role,
}

/// An event as listed by the server
///
/// Field names follow the client wire format; the server model names
/// (`title`, `date`, ...) are accepted as aliases. Dates and times stay as
/// received and are parsed only for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Server-assigned id
    pub event_id: EventId,
    /// Title
    #[serde(alias = "title", default)]
    pub event_title: String,
    /// Description
    #[serde(alias = "description", default)]
    pub event_description: String,
    /// Location
    #[serde(alias = "location", default)]
    pub event_location: String,
    /// Date, usually `YYYY-MM-DD` or RFC 3339
    #[serde(alias = "date", default)]
    pub event_date: String,
    /// Start time, usually `HH:MM` or RFC 3339
    #[serde(alias = "start_time", default)]
    pub event_start_time: String,
    /// End time, usually `HH:MM` or RFC 3339
    #[serde(alias = "end_time", default)]
    pub event_end_time: String,
    /// Capacity
    #[serde(default)]
    pub total_slots: i64,
    /// Seats already taken
    #[serde(default)]
    pub booked_slots: i64,
    /// Username of the creating administrator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl Event {
    /// Seats still available; may be negative if the server overbooked
    #[must_use]
    pub const fn remaining_slots(&self) -> i64 {
        self.total_slots.saturating_sub(self.booked_slots)
    }

    /// Whether no seats remain
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.remaining_slots() <= 0
    }
}

/// Booking status; bookings are only ever recorded once confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Booked
    #[default]
    Confirmed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => write!(f, "Confirmed"),
        }
    }
}

/// A booking made in this session
///
/// Holds a snapshot of the event at booking time; later event refreshes do
/// not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Event as it was when booked
    #[serde(flatten)]
    pub event: Event,
    /// Server-provided or locally generated id
    pub booking_id: String,
    /// When the booking was made
    pub booking_date: DateTime<Utc>,
    /// Status badge
    pub status: BookingStatus,
}

/// Sign-up form contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub phone: String,
    /// Password
    pub password: String,
}

/// Create-event form contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDraft {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Location
    pub location: String,
    /// Date (`YYYY-MM-DD`)
    pub date: String,
    /// Start time (`HH:MM`)
    pub start_time: String,
    /// End time (`HH:MM`)
    pub end_time: String,
    /// Capacity
    pub total_slots: i64,
}
