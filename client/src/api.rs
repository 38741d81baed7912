//! The booking API seam.
//!
//! The reducer only talks to [`BookingApi`]; [`HttpTransport`] implements it
//! against the remote service and
//! [`InMemoryBookingApi`](crate::in_memory::InMemoryBookingApi) in process.

use crate::error::ApiError;
use crate::transport::HttpTransport;
use crate::types::{Event, EventDraft, EventId, RegistrationForm};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`BookingApi`] methods
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Body of `POST /v1/users/register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Username
    pub username: String,
    /// Phone number
    pub phone: String,
}

impl From<RegistrationForm> for RegisterRequest {
    fn from(form: RegistrationForm) -> Self {
        Self {
            email: form.email,
            password: form.password,
            first_name: form.first_name,
            last_name: form.last_name,
            username: form.username,
            phone: form.phone,
        }
    }
}

/// Body of `POST /v1/users/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
    /// Always empty; the server resolves the user
    pub user_id: String,
}

impl LoginRequest {
    /// Build a login request for the given credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            user_id: String::new(),
        }
    }
}

/// Body of `POST /v1/event/create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEventRequest {
    /// Title
    pub event_title: String,
    /// Description
    pub event_description: String,
    /// Location
    pub event_location: String,
    /// Date
    pub event_date: String,
    /// Start time
    pub event_start_time: String,
    /// End time
    pub event_end_time: String,
    /// Username of the creating administrator
    pub created_by: String,
    /// Capacity
    pub total_slots: i64,
}

impl CreateEventRequest {
    /// Attach the creator to a draft
    #[must_use]
    pub fn new(draft: EventDraft, created_by: impl Into<String>) -> Self {
        Self {
            event_title: draft.title,
            event_description: draft.description,
            event_location: draft.location,
            event_date: draft.date,
            event_start_time: draft.start_time,
            event_end_time: draft.end_time,
            created_by: created_by.into(),
            total_slots: draft.total_slots,
        }
    }
}

/// Body of `POST /v1/events/{id}/book`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRequest {
    /// Username of the booking customer
    pub user_id: String,
}

/// Response of the event list endpoint; a missing list reads as empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPage {
    /// Events on this page
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Response of the booking endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingReceipt {
    /// Server-assigned booking id; string and numeric ids are both kept
    #[serde(default, deserialize_with = "booking_id")]
    pub booking_id: Option<String>,
}

impl BookingReceipt {
    /// Read the receipt out of any response body
    ///
    /// A body without a usable `booking_id` (absent, null, empty, or not an
    /// object at all) yields a receipt with no id.
    #[must_use]
    pub fn from_response(body: &Value) -> Self {
        Self {
            booking_id: body.get("booking_id").and_then(id_text),
        }
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn booking_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_text))
}

/// `/v1/events/<id><tail>` with the id percent-encoded as one path segment
fn event_endpoint(event_id: &EventId, tail: &str) -> String {
    format!("/v1/events/{}{tail}", urlencoding::encode(event_id.as_str()))
}

/// Remote booking API
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns so it stays
/// object-safe and can be injected as `Arc<dyn BookingApi>`.
pub trait BookingApi: Send + Sync {
    /// Create an account; returns the raw response
    fn register(&self, request: RegisterRequest) -> ApiFuture<'_, Value>;

    /// Authenticate; returns the raw response (no role is derived from it)
    fn login(&self, request: LoginRequest) -> ApiFuture<'_, Value>;

    /// List one page of events
    fn list_events(&self, page: u32, limit: u32) -> ApiFuture<'_, Vec<Event>>;

    /// Fetch a single event; returns the raw response
    fn get_event(&self, event_id: EventId) -> ApiFuture<'_, Value>;

    /// Create an event; returns the raw response
    fn create_event(&self, request: CreateEventRequest) -> ApiFuture<'_, Value>;

    /// Book a seat
    fn book_event(&self, event_id: EventId, request: BookRequest) -> ApiFuture<'_, BookingReceipt>;
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

fn from_body<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

impl BookingApi for HttpTransport {
    fn register(&self, request: RegisterRequest) -> ApiFuture<'_, Value> {
        Box::pin(async move {
            let body = to_body(&request)?;
            self.call("/v1/users/register", Method::POST, Some(&body)).await
        })
    }

    fn login(&self, request: LoginRequest) -> ApiFuture<'_, Value> {
        Box::pin(async move {
            let body = to_body(&request)?;
            self.call("/v1/users/login", Method::POST, Some(&body)).await
        })
    }

    fn list_events(&self, page: u32, limit: u32) -> ApiFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let endpoint = format!("/v1/events?page={page}&limit={limit}");
            let response = self.call(&endpoint, Method::GET, None).await?;
            let page: EventPage = from_body(response)?;
            Ok(page.events)
        })
    }

    fn get_event(&self, event_id: EventId) -> ApiFuture<'_, Value> {
        Box::pin(async move {
            self.call(&event_endpoint(&event_id, ""), Method::GET, None)
                .await
        })
    }

    fn create_event(&self, request: CreateEventRequest) -> ApiFuture<'_, Value> {
        Box::pin(async move {
            let body = to_body(&request)?;
            self.call("/v1/event/create", Method::POST, Some(&body)).await
        })
    }

    fn book_event(&self, event_id: EventId, request: BookRequest) -> ApiFuture<'_, BookingReceipt> {
        Box::pin(async move {
            let body = to_body(&request)?;
            let response = self
                .call(&event_endpoint(&event_id, "/book"), Method::POST, Some(&body))
                .await?;
            Ok(BookingReceipt::from_response(&response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_form_maps_to_snake_case_fields() {
        let request = RegisterRequest::from(RegistrationForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555".to_string(),
            password: "secret".to_string(),
        });

        let json = serde_json::to_value(&request).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "email": "ada@example.com",
                "password": "secret",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "username": "ada",
                "phone": "555"
            }))
        );
    }

    #[test]
    fn login_request_sends_empty_user_id() {
        let request = LoginRequest::new("admin", "pw");
        assert_eq!(request.user_id, "");
    }

    #[test]
    fn receipt_keeps_numeric_ids_and_drops_blank_ones() {
        let numeric = BookingReceipt::from_response(&serde_json::json!({ "booking_id": 42 }));
        assert_eq!(numeric.booking_id.as_deref(), Some("42"));

        for body in [
            serde_json::json!({ "booking_id": "" }),
            serde_json::json!({ "booking_id": null }),
            serde_json::json!({ "status": "ok" }),
            serde_json::json!("ok"),
        ] {
            assert_eq!(BookingReceipt::from_response(&body), BookingReceipt::default());
        }

        let decoded: BookingReceipt =
            serde_json::from_value(serde_json::json!({ "booking_id": 7 })).unwrap_or_default();
        assert_eq!(decoded.booking_id.as_deref(), Some("7"));
    }

    #[test]
    fn event_ids_are_one_encoded_path_segment() {
        assert_eq!(event_endpoint(&EventId::new("e1"), "/book"), "/v1/events/e1/book");
        assert_eq!(
            event_endpoint(&EventId::new("a/b?c#d"), ""),
            "/v1/events/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn missing_event_list_reads_as_empty() {
        let page: Result<EventPage, ApiError> = from_body(serde_json::json!({ "total": 0 }));
        assert_eq!(page, Ok(EventPage::default()));
    }
}
