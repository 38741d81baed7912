//! Event handlers.
//!
//! [`EventPassClient`] binds user intents to the session store. Submissions
//! are sent with cascading tracking and awaited until settled, so when a
//! handler returns the operation, its follow-up refresh and every state
//! change they caused are visible to [`EventPassClient::snapshot`].

use crate::actions::{Outcome, SessionAction};
use crate::api::BookingApi;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::markup;
use crate::reducer::{SessionEnvironment, SessionReducer};
use crate::render::{self, ViewKind, ViewModel};
use crate::router::Route;
use crate::state::{EventFilter, FormKind, SessionState, SortOrder};
use crate::transport::LoadingIndicator;
use crate::types::{EventDraft, EventId, RegistrationForm, RequestId, Role};
use eventpass_core::environment::{Clock, IdGenerator, RandomIdGenerator, SystemClock};
use eventpass_runtime::{Store, StoreConfig};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// The session store
pub type SessionStore = Store<SessionState, SessionAction, SessionEnvironment, SessionReducer>;

/// How a form submission or button click ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The operation succeeded
    Completed,
    /// The operation failed; the message is also shown in the session
    Failed(String),
    /// The control was busy and the click was dropped
    Ignored,
}

/// Client facade over the session store
#[derive(Clone)]
pub struct EventPassClient {
    store: SessionStore,
    loading: Option<Arc<LoadingIndicator>>,
}

impl EventPassClient {
    /// Create a client talking to `api`, with the system clock and random ids
    #[must_use]
    pub fn new(api: Arc<dyn BookingApi>, config: &ClientConfig) -> Self {
        Self::with_dependencies(api, Arc::new(SystemClock), Arc::new(RandomIdGenerator), config)
    }

    /// Create a client with explicit clock and id generator
    #[must_use]
    pub fn with_dependencies(
        api: Arc<dyn BookingApi>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: &ClientConfig,
    ) -> Self {
        let environment = SessionEnvironment::new(api, clock, ids)
            .with_booking_mode(config.booking_mode)
            .with_page_size(config.events_page_size);
        let store_config = StoreConfig::default().with_broadcast_capacity(config.action_buffer);

        tracing::info!(
            booking_mode = %config.booking_mode,
            page_size = config.events_page_size,
            "EventPass client ready"
        );

        Self {
            store: Store::with_config(
                SessionState::default(),
                SessionReducer,
                environment,
                store_config,
            ),
            loading: None,
        }
    }

    /// Expose a transport's loading indicator through [`Self::is_loading`]
    #[must_use]
    pub fn with_loading_indicator(mut self, loading: Arc<LoadingIndicator>) -> Self {
        self.loading = Some(loading);
        self
    }

    /// Whether any request is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.as_ref().is_some_and(|l| l.is_visible())
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &SessionStore {
        &self.store
    }

    // ========================================================================
    // Submissions
    // ========================================================================

    /// Send a request-starting action and wait for its result
    async fn submit(&self, request: RequestId, action: SessionAction) -> Result<Submission, ClientError> {
        let result = self
            .store
            .send_and_settle(action, |a| a.outcome_for(request).is_some())
            .await?;

        Ok(match result.and_then(|a| a.outcome_for(request)) {
            None => Submission::Ignored,
            Some(Outcome::Failed(message)) => Submission::Failed(message),
            Some(Outcome::Errored(error)) => Submission::Failed(error.to_string()),
            Some(Outcome::Succeeded | Outcome::Loaded(_)) => Submission::Completed,
        })
    }

    /// Sign in
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    #[tracing::instrument(skip(self, password))]
    pub async fn submit_login(&self, username: &str, password: &str) -> Result<Submission, ClientError> {
        let request = RequestId::new();
        self.submit(
            request,
            SessionAction::LoginSubmitted {
                request,
                username: username.to_string(),
                password: password.to_string(),
            },
        )
        .await
    }

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    #[tracing::instrument(skip(self, form), fields(username = %form.username))]
    pub async fn submit_registration(&self, form: RegistrationForm) -> Result<Submission, ClientError> {
        let request = RequestId::new();
        self.submit(request, SessionAction::RegisterSubmitted { request, form })
            .await
    }

    /// Create an event
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn submit_event(&self, draft: EventDraft) -> Result<Submission, ClientError> {
        let request = RequestId::new();
        self.submit(request, SessionAction::CreateEventSubmitted { request, draft })
            .await
    }

    /// Book a seat
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    #[tracing::instrument(skip(self))]
    pub async fn book(&self, event_id: &EventId) -> Result<Submission, ClientError> {
        let request = RequestId::new();
        self.submit(
            request,
            SessionAction::BookSubmitted {
                request,
                event_id: event_id.clone(),
            },
        )
        .await
    }

    /// Refresh the event list and wait until it is applied
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    pub async fn load_events(&self) -> Result<(), ClientError> {
        self.store.send_cascading(SessionAction::LoadEvents).await?.wait().await;
        Ok(())
    }

    /// Fetch one event's details
    ///
    /// The details are also kept as the session's selected event.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] with the transport failure unmodified.
    pub async fn event_details(&self, event_id: &EventId) -> Result<Value, ClientError> {
        let request = RequestId::new();
        let result = self
            .store
            .send_and_settle(
                SessionAction::EventDetailsRequested {
                    request,
                    event_id: event_id.clone(),
                },
                |a| a.outcome_for(request).is_some(),
            )
            .await?;

        match result.and_then(|a| a.outcome_for(request)) {
            Some(Outcome::Loaded(details)) => Ok(details),
            Some(Outcome::Errored(error)) => Err(ClientError::Api(error)),
            _ => Err(ClientError::MissingResult(request.to_string())),
        }
    }

    /// Edit an event
    ///
    /// # Errors
    ///
    /// Always returns [`ClientError::NotImplemented`]; the session shows a
    /// "not available" notice.
    pub async fn edit_event(&self, event_id: &EventId) -> Result<(), ClientError> {
        self.store
            .send(SessionAction::EditEventRequested {
                event_id: event_id.clone(),
            })
            .await?;
        Err(ClientError::NotImplemented("Editing events"))
    }

    /// Delete an event
    ///
    /// # Errors
    ///
    /// Always returns [`ClientError::NotImplemented`]; the session shows a
    /// "not available" notice.
    pub async fn delete_event(&self, event_id: &EventId) -> Result<(), ClientError> {
        self.store
            .send(SessionAction::DeleteEventRequested {
                event_id: event_id.clone(),
            })
            .await?;
        Err(ClientError::NotImplemented("Deleting events"))
    }

    // ========================================================================
    // Local intents
    // ========================================================================

    async fn dispatch(&self, action: SessionAction) -> Result<(), ClientError> {
        self.store.send(action).await?;
        Ok(())
    }

    /// Navigate to `route`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NavigationRefused`] if the current identity may
    /// not see `route`.
    pub async fn navigate(&self, route: Route) -> Result<(), ClientError> {
        self.dispatch(SessionAction::Navigate { route }).await?;
        let current = self.store.state(|s| s.router.current()).await;
        if current == route {
            Ok(())
        } else {
            Err(ClientError::NavigationRefused(route.to_string()))
        }
    }

    /// Toggle the login page's user type
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    pub async fn select_user_type(&self, role: Role) -> Result<(), ClientError> {
        self.dispatch(SessionAction::SelectUserType { role }).await
    }

    /// Add or remove a favorite
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    pub async fn toggle_favorite(&self, event_id: &EventId) -> Result<(), ClientError> {
        self.dispatch(SessionAction::ToggleFavorite {
            event_id: event_id.clone(),
        })
        .await
    }

    /// Set the event search text
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    pub async fn set_search(&self, term: &str) -> Result<(), ClientError> {
        self.dispatch(SessionAction::SetSearch {
            term: term.to_string(),
        })
        .await
    }

    /// Set the event filter
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    pub async fn set_filter(&self, filter: EventFilter) -> Result<(), ClientError> {
        self.dispatch(SessionAction::SetFilter { filter }).await
    }

    /// Set the event ordering
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    pub async fn set_sort(&self, order: SortOrder) -> Result<(), ClientError> {
        self.dispatch(SessionAction::SetSort { order }).await
    }

    /// Dismiss the current notice
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    pub async fn dismiss_notice(&self) -> Result<(), ClientError> {
        self.dispatch(SessionAction::DismissNotice).await
    }

    /// Sign out
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if the store is shutting down.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.dispatch(SessionAction::Logout).await
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// A copy of the session
    pub async fn snapshot(&self) -> SessionState {
        self.store.state(Clone::clone).await
    }

    /// View-model for `kind`
    pub async fn render(&self, kind: ViewKind) -> ViewModel {
        self.store.state(|s| render::render(s, kind)).await
    }

    /// The view behind the current route, if it shows event data
    pub async fn current_view(&self) -> Option<ViewKind> {
        self.store.state(|s| ViewKind::for_route(s.router.current())).await
    }

    /// Stream of result actions as they arrive
    ///
    /// Every list load, login result, booking outcome and so on is published
    /// here before it is applied, for a view layer that redraws on change.
    #[must_use]
    pub fn updates(&self) -> broadcast::Receiver<SessionAction> {
        self.store.subscribe_actions()
    }

    /// Markup for `kind`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Render`] if a template fails.
    pub async fn render_html(&self, kind: ViewKind) -> Result<String, ClientError> {
        Ok(self.store.state(|s| markup::render_html(s, kind)).await?)
    }

    /// Markup for the submit control and messages of `form`
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Render`] if the template fails.
    pub async fn render_form_html(&self, form: FormKind) -> Result<String, ClientError> {
        Ok(self.store.state(|s| markup::form_html(s, form)).await?)
    }

    /// Wait for in-flight effects, then stop accepting actions
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Store`] if effects are still running after the
    /// configured timeout.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.store.shutdown_default().await?;
        Ok(())
    }
}

impl std::fmt::Debug for EventPassClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPassClient")
            .field("environment", self.store.environment())
            .field("pending_effects", &self.store.pending_effects())
            .finish_non_exhaustive()
    }
}
