//! Session reducer: every domain operation of the client.
//!
//! Network calls are returned as `Effect::Future` descriptions; their results
//! come back as actions tagged with the originating [`RequestId`]. Busy
//! checks happen here, under the store's write lock, so repeated submits are
//! resolved atomically.

use crate::actions::SessionAction;
use crate::api::{BookRequest, BookingApi, CreateEventRequest, LoginRequest};
use crate::config::BookingMode;
use crate::error::ApiError;
use crate::router::Route;
use crate::state::{FormStatus, Notice, SelectedEvent, SessionState};
use crate::types::{
    Booking, BookingStatus, Event, EventDraft, EventId, Identity, RegistrationForm, RequestId, Role,
};
use chrono::NaiveDate;
use eventpass_core::environment::{Clock, IdGenerator};
use eventpass_core::{async_effect, effect::Effect, feedback, reducer::Reducer, smallvec, SmallVec};
use serde_json::Value;
use std::sync::Arc;

/// Shown for any sign-in failure, whatever the cause
pub const LOGIN_FAILED_MESSAGE: &str = "Invalid credentials or server error. Please try again.";
/// Fallback when a sign-up failure carries no message
pub const REGISTER_FAILED_MESSAGE: &str = "Failed to create account. Please try again.";
/// Shown after a successful sign-up
pub const REGISTER_SUCCESS_MESSAGE: &str = "Account created successfully! Please sign in.";
/// Fallback when a create-event failure carries no message
pub const CREATE_EVENT_FAILED_MESSAGE: &str = "Failed to create event. Please try again.";
/// Shown after an event is created
pub const CREATE_EVENT_SUCCESS_MESSAGE: &str = "Event created successfully!";
/// Shown after a booking
pub const BOOKING_SUCCESS_MESSAGE: &str = "Event booked successfully!";
/// Booking refused locally because no seats remain
pub const SOLD_OUT_MESSAGE: &str = "This event is sold out.";
/// An operation that needs a signed-in user was attempted without one
pub const SIGN_IN_REQUIRED_MESSAGE: &str = "Please sign in first.";
/// Shown when Edit is clicked
pub const EDIT_UNAVAILABLE_MESSAGE: &str = "Editing events is not available yet.";
/// Shown when Delete is clicked
pub const DELETE_UNAVAILABLE_MESSAGE: &str = "Deleting events is not available yet.";

/// Client-side role inference used at sign-in.
///
/// The server's login response carries no role, so the client decides: the
/// admin toggle plus the literal username `admin` yields an administrator,
/// anything else a customer. This is a demo-grade rule and is kept isolated
/// here so it can be replaced by a server-issued role.
pub mod demo_auth {
    use crate::types::Role;

    /// Username that may sign in as administrator
    pub const ADMIN_USERNAME: &str = "admin";

    /// Role granted to `username` signing in with the `selected` user type
    #[must_use]
    pub fn role_for(selected: Role, username: &str) -> Role {
        if selected == Role::Admin && username == ADMIN_USERNAME {
            Role::Admin
        } else {
            Role::Customer
        }
    }
}

/// Injected dependencies of the session reducer
#[derive(Clone)]
pub struct SessionEnvironment {
    /// Booking API
    pub api: Arc<dyn BookingApi>,
    /// Clock for booking timestamps and date validation
    pub clock: Arc<dyn Clock>,
    /// Generator for local booking ids
    pub ids: Arc<dyn IdGenerator>,
    /// How bookings reconcile with the server
    pub booking_mode: BookingMode,
    /// Page size for event listing
    pub page_size: u32,
}

impl SessionEnvironment {
    /// Create an environment with `server` booking mode and page size 100
    #[must_use]
    pub fn new(api: Arc<dyn BookingApi>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            api,
            clock,
            ids,
            booking_mode: BookingMode::default(),
            page_size: 100,
        }
    }

    /// Set the booking mode
    #[must_use]
    pub const fn with_booking_mode(mut self, mode: BookingMode) -> Self {
        self.booking_mode = mode;
        self
    }

    /// Set the event list page size
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

impl std::fmt::Debug for SessionEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEnvironment")
            .field("booking_mode", &self.booking_mode)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// Reducer for the whole client session
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionReducer;

type Effects = SmallVec<[Effect<SessionAction>; 4]>;

/// Use `message`, or `fallback` when it is blank
fn message_or(error: &ApiError, fallback: &str) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

impl SessionReducer {
    // ========================================================================
    // Effects
    // ========================================================================

    /// Refresh the event list for the current session epoch
    fn load_events(state: &SessionState, env: &SessionEnvironment) -> Effect<SessionAction> {
        let api = Arc::clone(&env.api);
        let epoch = state.session_epoch;
        let limit = env.page_size;
        async_effect! {
            match api.list_events(1, limit).await {
                Ok(events) => Some(SessionAction::EventsLoaded { epoch, events }),
                Err(error) => Some(SessionAction::EventsLoadFailed { epoch, error }),
            }
        }
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    fn login_submitted(
        state: &mut SessionState,
        request: RequestId,
        username: String,
        password: String,
        env: &SessionEnvironment,
    ) -> Effects {
        if !state.forms.login.begin(request) {
            tracing::debug!("Sign-in already in flight, ignoring submit");
            return SmallVec::new();
        }

        let api = Arc::clone(&env.api);
        smallvec![async_effect! {
            match api.login(LoginRequest::new(username.clone(), password)).await {
                Ok(_) => Some(SessionAction::LoginSucceeded { request, username }),
                Err(error) => {
                    tracing::warn!(error = %error, "Sign-in failed");
                    Some(SessionAction::LoginFailed {
                        request,
                        message: LOGIN_FAILED_MESSAGE.to_string(),
                    })
                },
            }
        }]
    }

    fn login_succeeded(
        state: &mut SessionState,
        request: RequestId,
        username: String,
        env: &SessionEnvironment,
    ) -> Effects {
        if !state.forms.login.finish(request) {
            return SmallVec::new();
        }

        let role = demo_auth::role_for(state.selected_role, &username);
        if role == Role::Customer {
            state.selected_role = Role::Customer;
        }
        tracing::info!(username = %username, role = %role, "Signed in");

        state.identity = Some(Identity { username, role });
        state.notice = None;
        if let Err(refused) = state.router.navigate(Route::dashboard(role), Some(role)) {
            tracing::error!(%refused, "Dashboard refused for fresh identity");
        }

        smallvec![Self::load_events(state, env)]
    }

    fn register_submitted(
        state: &mut SessionState,
        request: RequestId,
        form: RegistrationForm,
        env: &SessionEnvironment,
    ) -> Effects {
        if !state.forms.signup.begin(request) {
            tracing::debug!("Sign-up already in flight, ignoring submit");
            return SmallVec::new();
        }

        let api = Arc::clone(&env.api);
        smallvec![async_effect! {
            match api.register(form.into()).await {
                Ok(response) => Some(SessionAction::RegisterSucceeded { request, response }),
                Err(error) => {
                    tracing::warn!(error = %error, "Sign-up failed");
                    Some(SessionAction::RegisterFailed {
                        request,
                        message: message_or(&error, REGISTER_FAILED_MESSAGE),
                    })
                },
            }
        }]
    }

    fn register_succeeded(state: &mut SessionState, request: RequestId) {
        if !state.forms.signup.finish(request) {
            return;
        }
        state.forms.signup = FormStatus::default();
        state.forms.login.error = None;
        state.notice = Some(Notice::success(REGISTER_SUCCESS_MESSAGE));
        if let Err(refused) = state.router.navigate(Route::Login, state.role()) {
            tracing::error!(%refused, "Login page refused");
        }
    }

    fn logout(state: &mut SessionState) {
        if let Some(identity) = &state.identity {
            tracing::info!(username = %identity.username, "Signed out");
        }

        let epoch = state.session_epoch + 1;
        *state = SessionState {
            session_epoch: epoch,
            ..SessionState::default()
        };
    }

    // ========================================================================
    // Events
    // ========================================================================

    fn create_event_submitted(
        state: &mut SessionState,
        request: RequestId,
        draft: EventDraft,
        env: &SessionEnvironment,
    ) -> Effects {
        if !state.forms.create_event.begin(request) {
            tracing::debug!("Event creation already in flight, ignoring submit");
            return SmallVec::new();
        }

        let Some(identity) = &state.identity else {
            return smallvec![feedback!(SessionAction::CreateEventFailed {
                request,
                message: SIGN_IN_REQUIRED_MESSAGE.to_string(),
            })];
        };

        if let Err(message) = Self::validate_draft(&draft, env) {
            return smallvec![feedback!(SessionAction::CreateEventFailed { request, message })];
        }

        let body = CreateEventRequest::new(draft, identity.username.clone());
        let api = Arc::clone(&env.api);
        smallvec![async_effect! {
            match api.create_event(body).await {
                Ok(response) => Some(SessionAction::EventCreated { request, response }),
                Err(error) => {
                    tracing::warn!(error = %error, "Event creation failed");
                    Some(SessionAction::CreateEventFailed {
                        request,
                        message: message_or(&error, CREATE_EVENT_FAILED_MESSAGE),
                    })
                },
            }
        }]
    }

    /// Reject drafts dated before today and drafts without capacity
    fn validate_draft(draft: &EventDraft, env: &SessionEnvironment) -> Result<(), String> {
        if draft.total_slots < 1 {
            return Err("Total slots must be at least 1.".to_string());
        }
        if let Ok(date) = NaiveDate::parse_from_str(draft.date.trim(), "%Y-%m-%d") {
            if date < env.clock.now().date_naive() {
                return Err("Event date cannot be in the past.".to_string());
            }
        }
        Ok(())
    }

    fn event_created(
        state: &mut SessionState,
        request: RequestId,
        env: &SessionEnvironment,
    ) -> Effects {
        if !state.forms.create_event.finish(request) {
            return SmallVec::new();
        }
        state.forms.create_event.success = Some(CREATE_EVENT_SUCCESS_MESSAGE.to_string());
        state.notice = Some(Notice::success(CREATE_EVENT_SUCCESS_MESSAGE));
        smallvec![Self::load_events(state, env)]
    }

    fn events_loaded(state: &mut SessionState, epoch: u64, events: Vec<Event>) {
        if epoch != state.session_epoch {
            tracing::debug!(epoch, current = state.session_epoch, "Dropping stale event list");
            return;
        }
        tracing::debug!(count = events.len(), "Event list refreshed");
        state.events = events;
    }

    fn events_load_failed(state: &mut SessionState, epoch: u64, error: &ApiError) {
        if epoch != state.session_epoch {
            return;
        }
        tracing::warn!(error = %error, "Event list refresh failed, clearing cache");
        state.events.clear();
    }

    fn event_details_requested(
        state: &SessionState,
        request: RequestId,
        event_id: EventId,
        env: &SessionEnvironment,
    ) -> Effects {
        let api = Arc::clone(&env.api);
        let epoch = state.session_epoch;
        smallvec![async_effect! {
            match api.get_event(event_id.clone()).await {
                Ok(details) => Some(SessionAction::EventDetailsLoaded { request, epoch, event_id, details }),
                Err(error) => Some(SessionAction::EventDetailsFailed { request, error }),
            }
        }]
    }

    /// Details from an earlier session are still returned to the caller
    /// but never kept
    fn event_details_loaded(state: &mut SessionState, epoch: u64, event_id: EventId, details: Value) {
        if epoch != state.session_epoch {
            tracing::debug!(event_id = %event_id, "Dropping details from a previous session");
            return;
        }
        state.selected_event = Some(SelectedEvent { event_id, details });
    }

    // ========================================================================
    // Bookings
    // ========================================================================

    fn book_submitted(
        state: &mut SessionState,
        request: RequestId,
        event_id: EventId,
        env: &SessionEnvironment,
    ) -> Effects {
        if state.is_booking(&event_id) {
            tracing::debug!(event_id = %event_id, "Booking already in flight, ignoring click");
            return SmallVec::new();
        }
        state.pending_bookings.insert(event_id.clone(), request);
        state.notice = None;

        let refuse = |event_id: EventId, message: &str| -> Effects {
            smallvec![feedback!(SessionAction::BookingFailed {
                request,
                event_id,
                message: message.to_string(),
            })]
        };

        let Some(identity) = &state.identity else {
            return refuse(event_id, SIGN_IN_REQUIRED_MESSAGE);
        };
        let Some(event) = state.event(&event_id) else {
            return refuse(event_id, "Event not found.");
        };
        if event.is_sold_out() {
            return refuse(event_id, SOLD_OUT_MESSAGE);
        }

        let local_id = env.ids.next_id();
        let snapshot = event.clone();
        let booking_date = env.clock.now();
        let booking = move |booking_id: String| Booking {
            event: snapshot,
            booking_id,
            booking_date,
            status: BookingStatus::Confirmed,
        };

        match env.booking_mode {
            BookingMode::Offline => smallvec![feedback!(SessionAction::EventBooked {
                request,
                booking: booking(local_id),
            })],
            mode @ (BookingMode::Server | BookingMode::ServerLocalId) => {
                let api = Arc::clone(&env.api);
                let body = BookRequest {
                    user_id: identity.username.clone(),
                };
                smallvec![async_effect! {
                    match api.book_event(event_id.clone(), body).await {
                        Ok(receipt) => {
                            let booking_id = match (mode, receipt.booking_id) {
                                (BookingMode::Server, Some(id)) if !id.is_empty() => id,
                                _ => local_id,
                            };
                            Some(SessionAction::EventBooked { request, booking: booking(booking_id) })
                        },
                        Err(error) => {
                            tracing::warn!(error = %error, event_id = %event_id, "Booking failed");
                            Some(SessionAction::BookingFailed {
                                request,
                                event_id,
                                message: error.to_string(),
                            })
                        },
                    }
                }]
            },
        }
    }

    fn event_booked(
        state: &mut SessionState,
        request: RequestId,
        booking: Booking,
        env: &SessionEnvironment,
    ) -> Effects {
        let event_id = booking.event.event_id.clone();
        if state.pending_bookings.get(&event_id) != Some(&request) {
            return SmallVec::new();
        }
        state.pending_bookings.remove(&event_id);

        tracing::info!(event_id = %event_id, booking_id = %booking.booking_id, "Event booked");
        state.bookings.push(booking);
        state.notice = Some(Notice::success(BOOKING_SUCCESS_MESSAGE));

        if env.booking_mode.calls_server() {
            smallvec![Self::load_events(state, env)]
        } else {
            if let Some(event) = state.events.iter_mut().find(|e| e.event_id == event_id) {
                event.total_slots = event.total_slots.saturating_sub(1);
            }
            SmallVec::new()
        }
    }

    fn booking_failed(state: &mut SessionState, request: RequestId, event_id: &EventId, message: &str) {
        if state.pending_bookings.get(event_id) != Some(&request) {
            return;
        }
        state.pending_bookings.remove(event_id);
        state.notice = Some(Notice::error(format!("Failed to book event: {message}")));
    }

    fn toggle_favorite(state: &mut SessionState, event_id: EventId) {
        if let Some(index) = state.favorites.iter().position(|id| *id == event_id) {
            state.favorites.remove(index);
        } else {
            state.favorites.push(event_id);
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    fn navigate(state: &mut SessionState, route: Route) {
        match state.router.navigate(route, state.role()) {
            Ok(()) => match route {
                Route::Login => state.forms.login.error = None,
                Route::Signup => state.forms.signup.error = None,
                Route::Customer(_) | Route::Admin(_) => {},
            },
            Err(refused) => tracing::warn!(%refused, "Navigation refused"),
        }
    }
}

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SessionAction::SelectUserType { role } => {
                state.selected_role = role;
                SmallVec::new()
            },
            SessionAction::Navigate { route } => {
                Self::navigate(state, route);
                SmallVec::new()
            },

            // ========== Authentication ==========
            SessionAction::LoginSubmitted {
                request,
                username,
                password,
            } => Self::login_submitted(state, request, username, password, env),
            SessionAction::LoginSucceeded { request, username } => {
                Self::login_succeeded(state, request, username, env)
            },
            SessionAction::LoginFailed { request, message } => {
                if state.forms.login.finish(request) {
                    state.forms.login.error = Some(message);
                }
                SmallVec::new()
            },
            SessionAction::RegisterSubmitted { request, form } => {
                Self::register_submitted(state, request, form, env)
            },
            SessionAction::RegisterSucceeded { request, .. } => {
                Self::register_succeeded(state, request);
                SmallVec::new()
            },
            SessionAction::RegisterFailed { request, message } => {
                if state.forms.signup.finish(request) {
                    state.forms.signup.error = Some(message);
                }
                SmallVec::new()
            },
            SessionAction::Logout => {
                Self::logout(state);
                SmallVec::new()
            },

            // ========== Events ==========
            SessionAction::LoadEvents => smallvec![Self::load_events(state, env)],
            SessionAction::EventsLoaded { epoch, events } => {
                Self::events_loaded(state, epoch, events);
                SmallVec::new()
            },
            SessionAction::EventsLoadFailed { epoch, error } => {
                Self::events_load_failed(state, epoch, &error);
                SmallVec::new()
            },
            SessionAction::EventDetailsRequested { request, event_id } => {
                Self::event_details_requested(state, request, event_id, env)
            },
            SessionAction::EventDetailsLoaded {
                epoch,
                event_id,
                details,
                ..
            } => {
                Self::event_details_loaded(state, epoch, event_id, details);
                SmallVec::new()
            },
            SessionAction::EventDetailsFailed { error, .. } => {
                tracing::warn!(error = %error, "Event details request failed");
                SmallVec::new()
            },
            SessionAction::CreateEventSubmitted { request, draft } => {
                Self::create_event_submitted(state, request, draft, env)
            },
            SessionAction::EventCreated { request, .. } => Self::event_created(state, request, env),
            SessionAction::CreateEventFailed { request, message } => {
                if state.forms.create_event.finish(request) {
                    state.forms.create_event.error = Some(message);
                }
                SmallVec::new()
            },
            SessionAction::EditEventRequested { event_id } => {
                tracing::info!(event_id = %event_id, "Edit requested but not available");
                state.notice = Some(Notice::info(EDIT_UNAVAILABLE_MESSAGE));
                SmallVec::new()
            },
            SessionAction::DeleteEventRequested { event_id } => {
                tracing::info!(event_id = %event_id, "Delete requested but not available");
                state.notice = Some(Notice::info(DELETE_UNAVAILABLE_MESSAGE));
                SmallVec::new()
            },

            // ========== Bookings and favorites ==========
            SessionAction::BookSubmitted { request, event_id } => {
                Self::book_submitted(state, request, event_id, env)
            },
            SessionAction::EventBooked { request, booking } => {
                Self::event_booked(state, request, booking, env)
            },
            SessionAction::BookingFailed {
                request,
                event_id,
                message,
            } => {
                Self::booking_failed(state, request, &event_id, &message);
                SmallVec::new()
            },
            SessionAction::ToggleFavorite { event_id } => {
                Self::toggle_favorite(state, event_id);
                SmallVec::new()
            },

            // ========== Query and notices ==========
            SessionAction::SetSearch { term } => {
                state.query.search = term;
                SmallVec::new()
            },
            SessionAction::SetFilter { filter } => {
                state.query.filter = filter;
                SmallVec::new()
            },
            SessionAction::SetSort { order } => {
                state.query.sort = order;
                SmallVec::new()
            },
            SessionAction::DismissNotice => {
                state.notice = None;
                SmallVec::new()
            },
        }
    }
}
