//! EventPass client - session state and rendering core of a ticketing client
//!
//! Users register, sign in as a customer or an administrator, browse and
//! book events; administrators create events and watch bookings. This crate
//! is the client's in-memory session machine plus the thin HTTP transport
//! it needs. Visual presentation is a rendering target: the crate produces
//! view-models and escaped HTML fragments.
//!
//! # Architecture
//!
//! ```text
//!  user intent ──► EventPassClient ──► Store ──► SessionReducer ──► SessionState
//!                      (handlers)        │              │
//!                                        │        Effect::Future
//!                                        │              │
//!                                        │              ▼
//!                                        │         BookingApi ──► HttpTransport
//!                                        │              │
//!                                        ◄── result action (same RequestId)
//!
//!  SessionState ──► render (view-models) ──► markup (askama)
//! ```
//!
//! - Busy guards for every form and book button are checked and set inside
//!   the reducer, under the store's write lock, so repeated clicks are no-ops.
//! - Results carry the [`RequestId`](types::RequestId) of the request that
//!   produced them; results for requests a form no longer waits for are
//!   dropped.
//! - Event-list results carry the session epoch; a logout bumps it, so late
//!   results never repopulate a signed-out session.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env()?;
//! let transport = HttpTransport::new(&config.api_base_url);
//! let loading = transport.loading();
//! let client = EventPassClient::new(Arc::new(transport), &config)
//!     .with_loading_indicator(loading);
//!
//! client.submit_login("alice", "secret").await?;
//! println!("{}", client.render_html(ViewKind::CustomerEvents).await?);
//! ```

pub mod actions;
pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod in_memory;
pub mod markup;
pub mod reducer;
pub mod render;
pub mod router;
pub mod state;
pub mod transport;
pub mod types;

pub use actions::SessionAction;
pub use api::BookingApi;
pub use config::{Backend, BookingMode, ClientConfig};
pub use error::{ApiError, ClientError, ConfigError};
pub use handlers::{EventPassClient, Submission};
pub use in_memory::InMemoryBookingApi;
pub use reducer::{SessionEnvironment, SessionReducer};
pub use render::ViewKind;
pub use state::SessionState;
pub use transport::HttpTransport;
