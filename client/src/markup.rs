//! HTML fragments for rendered views.
//!
//! Thin askama layer over [`render`](crate::render): templates live in
//! `templates/` and escape every interpolated value.

use crate::render::{
    AnalyticsSummary, EmptyState, EventCard, FormControls, ViewKind, ViewModel, form_controls,
    render,
};
use crate::state::{FormKind, Notice, NoticeKind, SessionState};
use askama::Template;

#[derive(Template)]
#[template(path = "event_list.html")]
struct EventListTemplate<'a> {
    view: &'static str,
    cards: &'a [EventCard],
    empty: Option<EmptyState>,
}

#[derive(Template)]
#[template(path = "analytics.html")]
struct AnalyticsTemplate<'a> {
    summary: &'a AnalyticsSummary,
}

#[derive(Template)]
#[template(path = "notice.html")]
struct NoticeTemplate<'a> {
    kind: &'static str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "form_controls.html")]
struct FormControlsTemplate<'a> {
    form: &'static str,
    controls: &'a FormControls,
}

const fn view_class(kind: ViewKind) -> &'static str {
    match kind {
        ViewKind::CustomerEvents => "customer-events",
        ViewKind::MyBookings => "my-bookings",
        ViewKind::Favorites => "favorites",
        ViewKind::AdminEvents => "admin-events",
        ViewKind::ManageEvents => "manage-events",
        ViewKind::Analytics => "analytics",
    }
}

/// Markup for a view-model
///
/// # Errors
///
/// Returns the template error if rendering fails.
pub fn view_model_html(kind: ViewKind, model: &ViewModel) -> askama::Result<String> {
    match model {
        ViewModel::Cards(cards) => EventListTemplate {
            view: view_class(kind),
            cards,
            empty: None,
        }
        .render(),
        ViewModel::Empty(empty) => EventListTemplate {
            view: view_class(kind),
            cards: &[],
            empty: Some(*empty),
        }
        .render(),
        ViewModel::Analytics(summary) => AnalyticsTemplate { summary }.render(),
    }
}

/// Markup for a notice
///
/// # Errors
///
/// Returns the template error if rendering fails.
pub fn notice_html(notice: &Notice) -> askama::Result<String> {
    let kind = match notice.kind {
        NoticeKind::Success => "success",
        NoticeKind::Error => "error",
        NoticeKind::Info => "info",
    };
    NoticeTemplate {
        kind,
        message: &notice.message,
    }
    .render()
}

/// Submit control and inline messages of `form`
///
/// # Errors
///
/// Returns the template error if rendering fails.
pub fn form_html(state: &SessionState, form: FormKind) -> askama::Result<String> {
    let name = match form {
        FormKind::Login => "login",
        FormKind::Signup => "signup",
        FormKind::CreateEvent => "create-event",
    };
    FormControlsTemplate {
        form: name,
        controls: &form_controls(state, form),
    }
    .render()
}

/// Markup for `kind`, preceded by the current notice if there is one
///
/// # Errors
///
/// Returns the template error if rendering fails.
pub fn render_html(state: &SessionState, kind: ViewKind) -> askama::Result<String> {
    let mut html = String::new();
    if let Some(notice) = &state.notice {
        html.push_str(&notice_html(notice)?);
        html.push('\n');
    }
    html.push_str(&view_model_html(kind, &render(state, kind))?);
    Ok(html)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::types::{Event, EventId};

    fn event(title: &str, total: i64, booked: i64) -> Event {
        Event {
            event_id: EventId::new("e1"),
            event_title: title.to_string(),
            event_description: "Bring friends".to_string(),
            event_location: "Hall A".to_string(),
            event_date: "2024-01-01".to_string(),
            event_start_time: "14:00".to_string(),
            event_end_time: "16:00".to_string(),
            total_slots: total,
            booked_slots: booked,
            created_by: None,
        }
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let state = SessionState {
            events: vec![event("<script>alert(1)</script>", 10, 0)],
            ..SessionState::default()
        };

        let html = render_html(&state, ViewKind::CustomerEvents).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn sold_out_button_is_disabled() {
        let state = SessionState {
            events: vec![event("Full House", 10, 10)],
            ..SessionState::default()
        };

        let html = render_html(&state, ViewKind::CustomerEvents).unwrap();
        assert!(html.contains("disabled>Sold Out</button>"));
        assert!(html.contains("Monday, January 1, 2024"));
        assert!(html.contains("02:00 PM - 04:00 PM"));
    }

    #[test]
    fn empty_state_and_notice() {
        let state = SessionState {
            notice: Some(Notice::info("Editing events is not available yet.")),
            ..SessionState::default()
        };

        let html = render_html(&state, ViewKind::MyBookings).unwrap();
        assert!(html.starts_with("<div class=\"notice notice-info\""));
        assert!(html.contains("No Bookings Yet"));
        assert!(html.contains("Book some events to see them here!"));
    }

    #[test]
    fn busy_login_form_disables_its_submit_button() {
        let mut state = SessionState::default();
        assert!(state.forms.login.begin(crate::types::RequestId::new()));

        let html = form_html(&state, FormKind::Login).unwrap();
        assert!(html.contains("disabled>Signing In...</button>"));

        state.forms.create_event.error = Some("Event date cannot be in the past.".to_string());
        let html = form_html(&state, FormKind::CreateEvent).unwrap();
        assert!(html.contains("class=\"form-controls form-create-event\""));
        assert!(html.contains("Event date cannot be in the past."));
        assert!(html.contains("class=\"submit-btn\">Create Event</button>"));
    }

    #[test]
    fn analytics_markup() {
        let state = SessionState {
            events: vec![event("Half", 10, 5)],
            ..SessionState::default()
        };

        let html = render_html(&state, ViewKind::Analytics).unwrap();
        assert!(html.contains("50.0%"));
    }
}
