//! Pure renderer.
//!
//! Maps a [`SessionState`] snapshot and a [`ViewKind`] to a view-model. No
//! I/O and no mutation: the same snapshot always renders the same output.

use crate::router::{AdminTab, CustomerTab, Route};
use crate::state::{BOOKING_BUSY_LABEL, EventFilter, EventQuery, FormKind, SessionState, SortOrder};
use crate::types::{Booking, Event};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::cmp::Ordering;

/// Label of an enabled book button
pub const BOOK_LABEL: &str = "Book Now";
/// Label of the book button on a sold-out event
pub const SOLD_OUT_LABEL: &str = "Sold Out";

/// Views that render event data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Customer event browser
    CustomerEvents,
    /// Customer's bookings
    MyBookings,
    /// Customer's favorites
    Favorites,
    /// Admin event list with booking counts
    AdminEvents,
    /// Admin edit/delete list
    ManageEvents,
    /// Admin totals
    Analytics,
}

impl ViewKind {
    /// The view shown for `route`, if it renders event data
    #[must_use]
    pub const fn for_route(route: Route) -> Option<Self> {
        match route {
            Route::Customer(CustomerTab::Events) => Some(Self::CustomerEvents),
            Route::Customer(CustomerTab::Bookings) => Some(Self::MyBookings),
            Route::Customer(CustomerTab::Favorites) => Some(Self::Favorites),
            Route::Admin(AdminTab::Events) => Some(Self::AdminEvents),
            Route::Admin(AdminTab::ManageEvents) => Some(Self::ManageEvents),
            Route::Admin(AdminTab::Analytics) => Some(Self::Analytics),
            Route::Admin(AdminTab::CreateEvent) | Route::Login | Route::Signup => None,
        }
    }

    /// Empty state shown when the view has nothing to list
    #[must_use]
    pub const fn empty_state(self) -> EmptyState {
        let (heading, body) = match self {
            Self::CustomerEvents | Self::Analytics => {
                ("No Events Available", "Check back later for exciting events!")
            },
            Self::MyBookings => ("No Bookings Yet", "Book some events to see them here!"),
            Self::Favorites => ("No Favorites Yet", "Tap the heart on an event to save it here!"),
            Self::AdminEvents => ("No Events Created", "Create your first event to get started!"),
            Self::ManageEvents => ("No Events to Manage", "Create some events first!"),
        };
        EmptyState { heading, body }
    }
}

/// Empty state shown when events exist but the query matches none
pub const NO_MATCHES: EmptyState = EmptyState {
    heading: "No Matching Events",
    body: "Try a different search or filter.",
};

/// Heading and body of an empty list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyState {
    /// Heading
    pub heading: &'static str,
    /// Body
    pub body: &'static str,
}

/// A button's label and enabled state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    /// Label
    pub label: &'static str,
    /// Whether the button is inert
    pub disabled: bool,
}

/// One event card
///
/// Common fields are always set; the per-view extras are `Some` (or `true`)
/// only on the views that show them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCard {
    /// Event id, used by the card's actions
    pub event_id: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Long-form date
    pub date: String,
    /// Start and end time
    pub time: String,
    /// Location
    pub location: String,
    /// "N slots available"
    pub slots_label: Option<String>,
    /// Book / Sold Out / Booking... button
    pub book_button: Option<Button>,
    /// Whether the favorite toggle is shown
    pub favorite_toggle: bool,
    /// Whether the event is a favorite
    pub favorited: bool,
    /// "Booking ID: ..."
    pub booking_id: Option<String>,
    /// "Booked on M/D/YYYY"
    pub booked_on: Option<String>,
    /// Status badge
    pub status: Option<String>,
    /// "B / T booked"
    pub booked_label: Option<String>,
    /// Whether Edit/Delete are shown
    pub manageable: bool,
}

/// Admin totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsSummary {
    /// Number of events
    pub total_events: usize,
    /// Capacity across all events
    pub total_slots: i64,
    /// Seats booked across all events
    pub booked_slots: i64,
    /// Booked over capacity, e.g. "42.5%"
    pub fill_rate: String,
    /// Events with no seats remaining
    pub sold_out: usize,
}

/// Rendered content of a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewModel {
    /// A list of cards
    Cards(Vec<EventCard>),
    /// Nothing to list
    Empty(EmptyState),
    /// Admin totals
    Analytics(AnalyticsSummary),
}

/// Submit control and inline messages of one form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormControls {
    /// Submit button; disabled with the busy label while a request is in flight
    pub submit: Button,
    /// Inline error from the last submission
    pub error: Option<String>,
    /// Inline success message from the last submission
    pub success: Option<String>,
}

/// Submit button of `form`
#[must_use]
pub fn submit_button(state: &SessionState, form: FormKind) -> Button {
    if state.forms.get(form).is_busy() {
        Button {
            label: form.busy_label(),
            disabled: true,
        }
    } else {
        Button {
            label: form.idle_label(),
            disabled: false,
        }
    }
}

/// Render the controls of `form` from `state`
#[must_use]
pub fn form_controls(state: &SessionState, form: FormKind) -> FormControls {
    let status = state.forms.get(form);
    FormControls {
        submit: submit_button(state, form),
        error: status.error.clone(),
        success: status.success.clone(),
    }
}

/// Render `kind` from `state`
#[must_use]
pub fn render(state: &SessionState, kind: ViewKind) -> ViewModel {
    match kind {
        ViewKind::CustomerEvents => {
            if state.events.is_empty() {
                return ViewModel::Empty(kind.empty_state());
            }
            let matching = apply_query(&state.events, &state.query, state);
            if matching.is_empty() {
                return ViewModel::Empty(NO_MATCHES);
            }
            ViewModel::Cards(matching.into_iter().map(|e| customer_card(state, e)).collect())
        },
        ViewKind::Favorites => {
            let favorites: Vec<&Event> = state
                .favorites
                .iter()
                .filter_map(|id| state.event(id))
                .collect();
            cards_or_empty(kind, favorites.into_iter().map(|e| customer_card(state, e)))
        },
        ViewKind::MyBookings => cards_or_empty(kind, state.bookings.iter().map(booking_card)),
        ViewKind::AdminEvents => cards_or_empty(
            kind,
            state.events.iter().map(|e| EventCard {
                booked_label: Some(format!("{} / {} booked", e.booked_slots, e.total_slots)),
                ..base_card(e)
            }),
        ),
        ViewKind::ManageEvents => cards_or_empty(
            kind,
            state.events.iter().map(|e| EventCard {
                manageable: true,
                ..base_card(e)
            }),
        ),
        ViewKind::Analytics => ViewModel::Analytics(analytics(&state.events)),
    }
}

fn cards_or_empty(kind: ViewKind, cards: impl Iterator<Item = EventCard>) -> ViewModel {
    let cards: Vec<EventCard> = cards.collect();
    if cards.is_empty() {
        ViewModel::Empty(kind.empty_state())
    } else {
        ViewModel::Cards(cards)
    }
}

fn base_card(event: &Event) -> EventCard {
    EventCard {
        event_id: event.event_id.to_string(),
        title: event.event_title.clone(),
        description: event.event_description.clone(),
        date: format_date(&event.event_date),
        time: format_time_range(&event.event_start_time, &event.event_end_time),
        location: event.event_location.clone(),
        slots_label: None,
        book_button: None,
        favorite_toggle: false,
        favorited: false,
        booking_id: None,
        booked_on: None,
        status: None,
        booked_label: None,
        manageable: false,
    }
}

fn customer_card(state: &SessionState, event: &Event) -> EventCard {
    let book_button = if state.is_booking(&event.event_id) {
        Button {
            label: BOOKING_BUSY_LABEL,
            disabled: true,
        }
    } else if event.is_sold_out() {
        Button {
            label: SOLD_OUT_LABEL,
            disabled: true,
        }
    } else {
        Button {
            label: BOOK_LABEL,
            disabled: false,
        }
    };

    EventCard {
        slots_label: Some(format!("{} slots available", event.remaining_slots())),
        book_button: Some(book_button),
        favorite_toggle: true,
        favorited: state.is_favorite(&event.event_id),
        ..base_card(event)
    }
}

fn booking_card(booking: &Booking) -> EventCard {
    EventCard {
        booking_id: Some(format!("Booking ID: {}", booking.booking_id)),
        booked_on: Some(format!("Booked on {}", booking.booking_date.format("%-m/%-d/%Y"))),
        status: Some(booking.status.to_string()),
        ..base_card(&booking.event)
    }
}

#[allow(clippy::cast_precision_loss)] // Seat counts are far below f64 precision
fn analytics(events: &[Event]) -> AnalyticsSummary {
    let total_slots = events.iter().map(|e| e.total_slots).fold(0, i64::saturating_add);
    let booked_slots = events.iter().map(|e| e.booked_slots).fold(0, i64::saturating_add);
    let fill_rate = if total_slots > 0 {
        booked_slots as f64 / total_slots as f64 * 100.0
    } else {
        0.0
    };

    AnalyticsSummary {
        total_events: events.len(),
        total_slots,
        booked_slots,
        fill_rate: format!("{fill_rate:.1}%"),
        sold_out: events.iter().filter(|e| e.is_sold_out()).count(),
    }
}

// ============================================================================
// Query
// ============================================================================

/// Events matching `query`, in its sort order
#[must_use]
pub fn apply_query<'a>(
    events: &'a [Event],
    query: &EventQuery,
    state: &SessionState,
) -> Vec<&'a Event> {
    let needle = query.search.trim().to_lowercase();
    let mut matching: Vec<&Event> = events
        .iter()
        .filter(|e| {
            needle.is_empty()
                || [&e.event_title, &e.event_description, &e.event_location]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
        })
        .filter(|e| match query.filter {
            EventFilter::All => true,
            EventFilter::Available => !e.is_sold_out(),
            EventFilter::SoldOut => e.is_sold_out(),
            EventFilter::Favorites => state.is_favorite(&e.event_id),
        })
        .collect();

    match query.sort {
        SortOrder::DateAscending => matching.sort_by(|a, b| compare_dates(a, b)),
        SortOrder::DateDescending => matching.sort_by(|a, b| compare_dates(b, a)),
        SortOrder::Title => matching.sort_by_key(|e| e.event_title.to_lowercase()),
        SortOrder::MostAvailable => {
            matching.sort_by_key(|e| std::cmp::Reverse(e.remaining_slots()));
        },
    }
    matching
}

/// Unparseable dates sort after parseable ones, then by raw text
fn compare_dates(a: &Event, b: &Event) -> Ordering {
    let key = |e: &Event| (parse_date(&e.event_date).is_none(), parse_date(&e.event_date));
    key(a)
        .cmp(&key(b))
        .then_with(|| a.event_date.cmp(&b.event_date))
}

// ============================================================================
// Date and time formatting
// ============================================================================

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// "Monday, January 1, 2024"; unparseable input is returned verbatim
#[must_use]
pub fn format_date(raw: &str) -> String {
    parse_date(raw).map_or_else(
        || raw.to_string(),
        |date| date.format("%A, %B %-d, %Y").to_string(),
    )
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.contains('T') {
        return DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.time())
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|dt| dt.time())
            });
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// "02:00 PM"; unparseable input is returned verbatim
#[must_use]
pub fn format_time(raw: &str) -> String {
    parse_time(raw).map_or_else(|| raw.to_string(), |time| time.format("%I:%M %p").to_string())
}

/// "02:00 PM - 04:00 PM"
#[must_use]
pub fn format_time_range(start: &str, end: &str) -> String {
    if end.trim().is_empty() {
        return format_time(start);
    }
    format!("{} - {}", format_time(start), format_time(end))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code
mod tests {
    use super::*;
    use crate::types::{BookingStatus, EventId, RequestId};
    use chrono::TimeZone;

    #[test]
    fn busy_form_shows_busy_label_and_is_disabled() {
        let mut state = SessionState::default();
        assert!(state.forms.login.begin(RequestId::new()));
        state.forms.signup.error = Some("Username already exists".to_string());

        assert_eq!(
            submit_button(&state, FormKind::Login),
            Button {
                label: "Signing In...",
                disabled: true
            }
        );
        assert_eq!(
            form_controls(&state, FormKind::Signup),
            FormControls {
                submit: Button {
                    label: "Create Account",
                    disabled: false
                },
                error: Some("Username already exists".to_string()),
                success: None,
            }
        );
        assert_eq!(submit_button(&state, FormKind::CreateEvent).label, "Create Event");
    }

    #[test]
    fn routes_map_to_their_event_views() {
        assert_eq!(
            ViewKind::for_route(Route::Customer(CustomerTab::Bookings)),
            Some(ViewKind::MyBookings)
        );
        assert_eq!(
            ViewKind::for_route(Route::Admin(AdminTab::Analytics)),
            Some(ViewKind::Analytics)
        );
        assert_eq!(ViewKind::for_route(Route::Admin(AdminTab::CreateEvent)), None);
        assert_eq!(ViewKind::for_route(Route::Login), None);
    }

    fn event(id: &str, title: &str, date: &str, total: i64, booked: i64) -> Event {
        Event {
            event_id: EventId::new(id),
            event_title: title.to_string(),
            event_description: format!("About {title}"),
            event_location: "Main Hall".to_string(),
            event_date: date.to_string(),
            event_start_time: "14:00".to_string(),
            event_end_time: "16:00".to_string(),
            total_slots: total,
            booked_slots: booked,
            created_by: None,
        }
    }

    fn cards(model: ViewModel) -> Vec<EventCard> {
        match model {
            ViewModel::Cards(cards) => cards,
            other => panic!("expected cards, got {other:?}"),
        }
    }

    #[test]
    fn formats_dates_and_times() {
        assert_eq!(format_date("2024-01-01"), "Monday, January 1, 2024");
        assert_eq!(format_date("2024-03-15T10:00:00Z"), "Friday, March 15, 2024");
        assert_eq!(format_date("sometime soon"), "sometime soon");

        assert_eq!(format_time("14:00"), "02:00 PM");
        assert_eq!(format_time("09:30:00"), "09:30 AM");
        assert_eq!(format_time("2024-01-01T00:15:00Z"), "12:15 AM");
        assert_eq!(format_time("noon"), "noon");
        assert_eq!(format_time_range("14:00", "16:00"), "02:00 PM - 04:00 PM");
    }

    #[test]
    fn sold_out_and_available_cards() {
        let state = SessionState {
            events: vec![
                event("e1", "Full", "2024-01-01", 10, 10),
                event("e2", "Open", "2024-01-02", 5, 2),
            ],
            ..SessionState::default()
        };

        let cards = cards(render(&state, ViewKind::CustomerEvents));
        assert_eq!(
            cards[0].book_button,
            Some(Button {
                label: SOLD_OUT_LABEL,
                disabled: true
            })
        );
        assert_eq!(cards[1].slots_label.as_deref(), Some("3 slots available"));
        assert_eq!(
            cards[1].book_button,
            Some(Button {
                label: BOOK_LABEL,
                disabled: false
            })
        );
    }

    #[test]
    fn pending_booking_shows_busy_label() {
        let mut state = SessionState {
            events: vec![event("e2", "Open", "2024-01-02", 5, 2)],
            ..SessionState::default()
        };
        state
            .pending_bookings
            .insert(EventId::new("e2"), RequestId::new());

        let cards = cards(render(&state, ViewKind::CustomerEvents));
        assert_eq!(
            cards[0].book_button,
            Some(Button {
                label: BOOKING_BUSY_LABEL,
                disabled: true
            })
        );
    }

    #[test]
    fn each_view_has_its_own_empty_state() {
        let state = SessionState::default();
        let heading = |kind| match render(&state, kind) {
            ViewModel::Empty(empty) => empty.heading,
            other => panic!("expected empty state, got {other:?}"),
        };

        assert_eq!(heading(ViewKind::CustomerEvents), "No Events Available");
        assert_eq!(heading(ViewKind::MyBookings), "No Bookings Yet");
        assert_eq!(heading(ViewKind::Favorites), "No Favorites Yet");
        assert_eq!(heading(ViewKind::AdminEvents), "No Events Created");
        assert_eq!(heading(ViewKind::ManageEvents), "No Events to Manage");
    }

    #[test]
    fn query_narrows_and_orders_customer_events() {
        let mut state = SessionState {
            events: vec![
                event("e1", "Jazz Night", "2024-03-01", 10, 10),
                event("e2", "Rust Meetup", "2024-01-15", 50, 10),
                event("e3", "Jazz Brunch", "2024-02-01", 20, 2),
            ],
            ..SessionState::default()
        };

        state.query.search = "JAZZ".to_string();
        let titles: Vec<String> = cards(render(&state, ViewKind::CustomerEvents))
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Jazz Brunch", "Jazz Night"]);

        state.query.filter = EventFilter::Available;
        state.query.sort = SortOrder::MostAvailable;
        let titles: Vec<String> = cards(render(&state, ViewKind::CustomerEvents))
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Jazz Brunch"]);

        state.query.search = "opera".to_string();
        assert_eq!(
            render(&state, ViewKind::CustomerEvents),
            ViewModel::Empty(NO_MATCHES)
        );
    }

    #[test]
    fn favorites_follow_insertion_order_and_skip_stale_ids() {
        let state = SessionState {
            events: vec![
                event("e1", "First", "2024-01-01", 10, 0),
                event("e2", "Second", "2024-01-02", 10, 0),
            ],
            favorites: vec![EventId::new("e2"), EventId::new("gone"), EventId::new("e1")],
            ..SessionState::default()
        };

        let cards = cards(render(&state, ViewKind::Favorites));
        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "First"]);
        assert!(cards.iter().all(|c| c.favorited));
    }

    #[test]
    fn booking_cards_show_receipt_details() {
        let state = SessionState {
            bookings: vec![Booking {
                event: event("e1", "Gala", "2024-05-04", 10, 3),
                booking_id: "abc123xyz".to_string(),
                booking_date: chrono::Utc.with_ymd_and_hms(2024, 1, 9, 8, 0, 0).unwrap(),
                status: BookingStatus::Confirmed,
            }],
            ..SessionState::default()
        };

        let card = cards(render(&state, ViewKind::MyBookings)).remove(0);
        assert_eq!(card.booking_id.as_deref(), Some("Booking ID: abc123xyz"));
        assert_eq!(card.booked_on.as_deref(), Some("Booked on 1/9/2024"));
        assert_eq!(card.status.as_deref(), Some("Confirmed"));
        assert!(card.book_button.is_none());
    }

    #[test]
    fn admin_views() {
        let state = SessionState {
            events: vec![
                event("e1", "Full", "2024-01-01", 10, 10),
                event("e2", "Open", "2024-01-02", 30, 7),
            ],
            ..SessionState::default()
        };

        let admin = cards(render(&state, ViewKind::AdminEvents));
        assert_eq!(admin[1].booked_label.as_deref(), Some("7 / 30 booked"));
        assert!(cards(render(&state, ViewKind::ManageEvents)).iter().all(|c| c.manageable));

        assert_eq!(
            render(&state, ViewKind::Analytics),
            ViewModel::Analytics(AnalyticsSummary {
                total_events: 2,
                total_slots: 40,
                booked_slots: 17,
                fill_rate: "42.5%".to_string(),
                sold_out: 1,
            })
        );
    }

    #[test]
    fn analytics_without_capacity_has_zero_fill_rate() {
        let summary = analytics(&[]);
        assert_eq!(summary.fill_rate, "0.0%");
        assert_eq!(summary.sold_out, 0);
    }

    #[test]
    fn analytics_totals_saturate_on_huge_capacities() {
        let summary = analytics(&[
            event("e1", "Big", "2024-01-01", i64::MAX, i64::MAX),
            event("e2", "Bigger", "2024-01-02", i64::MAX, 1),
        ]);

        assert_eq!(summary.total_slots, i64::MAX);
        assert_eq!(summary.booked_slots, i64::MAX);
        assert_eq!(summary.fill_rate, "100.0%");
        assert_eq!(summary.sold_out, 1);
    }
}
