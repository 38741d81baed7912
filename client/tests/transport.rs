//! HTTP transport and booking API tests against a mock server

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use eventpass_client::api::{BookRequest, BookingApi, CreateEventRequest, LoginRequest};
use eventpass_client::types::{EventDraft, EventId};
use eventpass_client::{ApiError, HttpTransport};
use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn json_content_type_is_always_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/e1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "event_id": "e1" })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let value = transport.call("/v1/events/e1", Method::GET, None).await.unwrap();

    assert_eq!(value["event_id"], "e1");
}

#[tokio::test]
async fn error_body_message_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/users/register"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "Username already exists" })),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let err = transport
        .call("/v1/users/register", Method::POST, Some(&json!({})))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::Http {
            status: 409,
            message: "Username already exists".to_string()
        }
    );
    assert_eq!(err.to_string(), "Username already exists");
}

#[tokio::test]
async fn missing_message_falls_back_to_status_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let err = transport.call("/v1/events", Method::GET, None).await.unwrap_err();

    assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
}

#[tokio::test]
async fn non_json_success_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/e1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let err = transport.call("/v1/events/e1", Method::GET, None).await.unwrap_err();

    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error_and_clears_loading() {
    let transport = HttpTransport::new("http://127.0.0.1:9");
    let loading = transport.loading();

    let err = transport.call("/v1/events", Method::GET, None).await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
    assert!(!loading.is_visible());
}

#[tokio::test]
async fn login_posts_empty_user_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/users/login"))
        .and(body_json(json!({ "username": "alice", "password": "pw", "user_id": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    transport.login(LoginRequest::new("alice", "pw")).await.unwrap();
}

#[tokio::test]
async fn list_events_reads_both_field_spellings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {
                    "event_id": "e1",
                    "event_title": "Client Names",
                    "event_date": "2024-01-01",
                    "total_slots": 10,
                    "booked_slots": 10
                },
                {
                    "event_id": "e2",
                    "title": "Server Names",
                    "date": "2024-01-02",
                    "start_time": "14:00",
                    "total_slots": 5
                }
            ]
        })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let events = transport.list_events(1, 100).await.unwrap();

    assert_eq!(events.len(), 2);
    assert!(events[0].is_sold_out());
    assert_eq!(events[1].event_title, "Server Names");
    assert_eq!(events[1].event_start_time, "14:00");
    assert_eq!(events[1].booked_slots, 0);
    assert_eq!(events[1].remaining_slots(), 5);
}

#[tokio::test]
async fn list_events_without_events_key_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 0 })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    assert!(transport.list_events(1, 100).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_event_sends_event_fields_and_creator() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/event/create"))
        .and(body_json(json!({
            "event_title": "Rust Conf",
            "event_description": "Talks",
            "event_location": "Hall B",
            "event_date": "2030-05-01",
            "event_start_time": "09:00",
            "event_end_time": "17:00",
            "created_by": "admin",
            "total_slots": 300
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "event_id": "e9" })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let draft = EventDraft {
        title: "Rust Conf".to_string(),
        description: "Talks".to_string(),
        location: "Hall B".to_string(),
        date: "2030-05-01".to_string(),
        start_time: "09:00".to_string(),
        end_time: "17:00".to_string(),
        total_slots: 300,
    };
    let response = transport
        .create_event(CreateEventRequest::new(draft, "admin"))
        .await
        .unwrap();

    assert_eq!(response["event_id"], "e9");
}

#[tokio::test]
async fn booking_receipt_id_is_optional() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events/e1/book"))
        .and(body_json(json!({ "user_id": "alice" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "booking_id": "srv-1" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/events/e2/book"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let request = BookRequest {
        user_id: "alice".to_string(),
    };

    let with_id = transport
        .book_event(EventId::new("e1"), request.clone())
        .await
        .unwrap();
    let without_id = transport.book_event(EventId::new("e2"), request).await.unwrap();

    assert_eq!(with_id.booking_id.as_deref(), Some("srv-1"));
    assert!(without_id.booking_id.is_none());
}

#[tokio::test]
async fn event_details_failure_propagates_unmodified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Event not found" })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let err = transport.get_event(EventId::new("missing")).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Http {
            status: 404,
            message: "Event not found".to_string()
        }
    );
}

#[tokio::test]
async fn numeric_booking_id_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events/e1/book"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "booking_id": 42 })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let receipt = transport
        .book_event(
            EventId::new("e1"),
            BookRequest {
                user_id: "alice".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.booking_id.as_deref(), Some("42"));
}

#[tokio::test]
async fn event_id_is_escaped_in_the_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/a%2Fb%3Fc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "event_id": "a/b?c" })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let details = transport.get_event(EventId::new("a/b?c")).await.unwrap();

    assert_eq!(details["event_id"], "a/b?c");
}
