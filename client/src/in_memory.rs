//! In-process implementation of [`BookingApi`].
//!
//! Behaves like the remote service closely enough for demos and tests:
//! accounts, an event catalogue with capacity accounting, and bookings.
//! Every call is recorded, and failures can be scripted per operation.

use crate::api::{
    ApiFuture, BookRequest, BookingApi, BookingReceipt, CreateEventRequest, LoginRequest,
    RegisterRequest,
};
use crate::error::ApiError;
use crate::types::{Event, EventId};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Operation names used for call recording and failure scripting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// `register`
    Register,
    /// `login`
    Login,
    /// `list_events`
    ListEvents,
    /// `get_event`
    GetEvent,
    /// `create_event`
    CreateEvent,
    /// `book_event`
    BookEvent,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, String>,
    events: Vec<Event>,
    next_event: u64,
    next_booking: u64,
    calls: Vec<ApiOperation>,
    failures: HashMap<ApiOperation, ApiError>,
    omit_booking_ids: bool,
}

/// In-memory booking API
#[derive(Debug, Default)]
pub struct InMemoryBookingApi {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
}

impl InMemoryBookingApi {
    /// Create an empty API
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registered account
    #[must_use]
    pub fn with_user(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.lock().users.insert(username.into(), password.into());
        self
    }

    /// Seed the catalogue with an event
    #[must_use]
    pub fn with_event(self, event: Event) -> Self {
        self.lock().events.push(event);
        self
    }

    /// Delay every call, so concurrent submissions overlap
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make booking responses omit `booking_id`
    #[must_use]
    pub fn without_booking_ids(self) -> Self {
        self.lock().omit_booking_ids = true;
        self
    }

    /// Make every call of `operation` fail with `error`
    pub fn fail(&self, operation: ApiOperation, error: ApiError) {
        self.lock().failures.insert(operation, error);
    }

    /// Stop failing `operation`
    pub fn recover(&self, operation: ApiOperation) {
        self.lock().failures.remove(&operation);
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiOperation> {
        self.lock().calls.clone()
    }

    /// Number of calls made to `operation`
    #[must_use]
    pub fn call_count(&self, operation: ApiOperation) -> usize {
        self.lock().calls.iter().filter(|op| **op == operation).count()
    }

    /// Current server-side copy of the catalogue
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and return the scripted failure, if any
    async fn enter(&self, operation: ApiOperation) -> Result<(), ApiError> {
        let failure = {
            let mut inner = self.lock();
            inner.calls.push(operation);
            inner.failures.get(&operation).cloned()
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        failure.map_or(Ok(()), Err)
    }
}

fn conflict(message: &str) -> ApiError {
    ApiError::Http {
        status: 409,
        message: message.to_string(),
    }
}

fn not_found(message: &str) -> ApiError {
    ApiError::Http {
        status: 404,
        message: message.to_string(),
    }
}

impl BookingApi for InMemoryBookingApi {
    fn register(&self, request: RegisterRequest) -> ApiFuture<'_, Value> {
        Box::pin(async move {
            self.enter(ApiOperation::Register).await?;
            let mut inner = self.lock();
            if inner.users.contains_key(&request.username) {
                return Err(conflict("Username already exists"));
            }
            inner
                .users
                .insert(request.username.clone(), request.password);
            Ok(json!({ "message": "User registered", "username": request.username }))
        })
    }

    fn login(&self, request: LoginRequest) -> ApiFuture<'_, Value> {
        Box::pin(async move {
            self.enter(ApiOperation::Login).await?;
            let inner = self.lock();
            match inner.users.get(&request.username) {
                Some(password) if *password == request.password => {
                    Ok(json!({ "message": "Login successful", "username": request.username }))
                },
                _ => Err(ApiError::Http {
                    status: 401,
                    message: "Invalid username or password".to_string(),
                }),
            }
        })
    }

    fn list_events(&self, page: u32, limit: u32) -> ApiFuture<'_, Vec<Event>> {
        Box::pin(async move {
            self.enter(ApiOperation::ListEvents).await?;
            let inner = self.lock();
            let limit = limit as usize;
            let skip = (page.max(1) as usize - 1).saturating_mul(limit);
            Ok(inner.events.iter().skip(skip).take(limit).cloned().collect())
        })
    }

    fn get_event(&self, event_id: EventId) -> ApiFuture<'_, Value> {
        Box::pin(async move {
            self.enter(ApiOperation::GetEvent).await?;
            let inner = self.lock();
            let event = inner
                .events
                .iter()
                .find(|e| e.event_id == event_id)
                .ok_or_else(|| not_found("Event not found"))?;
            serde_json::to_value(event).map_err(|e| ApiError::Decode(e.to_string()))
        })
    }

    fn create_event(&self, request: CreateEventRequest) -> ApiFuture<'_, Value> {
        Box::pin(async move {
            self.enter(ApiOperation::CreateEvent).await?;
            let mut inner = self.lock();
            inner.next_event += 1;
            let event_id = EventId::new(format!("evt-{}", inner.next_event));
            inner.events.push(Event {
                event_id: event_id.clone(),
                event_title: request.event_title,
                event_description: request.event_description,
                event_location: request.event_location,
                event_date: request.event_date,
                event_start_time: request.event_start_time,
                event_end_time: request.event_end_time,
                total_slots: request.total_slots,
                booked_slots: 0,
                created_by: Some(request.created_by),
            });
            Ok(json!({ "message": "Event created", "event_id": event_id }))
        })
    }

    fn book_event(&self, event_id: EventId, request: BookRequest) -> ApiFuture<'_, BookingReceipt> {
        Box::pin(async move {
            self.enter(ApiOperation::BookEvent).await?;
            let mut inner = self.lock();
            let omit_ids = inner.omit_booking_ids;
            inner.next_booking += 1;
            let booking_id = format!("bk-{}", inner.next_booking);

            let event = inner
                .events
                .iter_mut()
                .find(|e| e.event_id == event_id)
                .ok_or_else(|| not_found("Event not found"))?;
            if event.is_sold_out() {
                return Err(conflict("Event is fully booked"));
            }
            event.booked_slots += 1;
            tracing::debug!(event_id = %event_id, user = %request.user_id, "Seat booked");

            Ok(BookingReceipt {
                booking_id: (!omit_ids).then_some(booking_id),
            })
        })
    }
}
