//! Configuration management for the EventPass client.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unset variables fall back to their defaults; set-but-invalid values are
//! rejected with a [`ConfigError`].

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How `bookEvent` reconciles local and server state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingMode {
    /// Call the booking endpoint and use its `booking_id` (generated if absent)
    #[default]
    Server,
    /// Call the booking endpoint but always generate the id locally
    ServerLocalId,
    /// No network call; synthesize the booking and decrement `total_slots`
    Offline,
}

impl BookingMode {
    /// Whether bookings go through the booking endpoint
    #[must_use]
    pub const fn calls_server(self) -> bool {
        matches!(self, Self::Server | Self::ServerLocalId)
    }
}

impl FromStr for BookingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "server_local_id" => Ok(Self::ServerLocalId),
            "offline" => Ok(Self::Offline),
            other => Err(format!(
                "expected server, server_local_id or offline, got {other}"
            )),
        }
    }
}

impl fmt::Display for BookingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::ServerLocalId => write!(f, "server_local_id"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Which booking API implementation the binary talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// The remote HTTP API at `api_base_url`
    #[default]
    Http,
    /// A seeded in-process API, for demos
    InMemory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "memory" | "in_memory" => Ok(Self::InMemory),
            other => Err(format!("expected http or memory, got {other}")),
        }
    }
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the booking API (no trailing slash)
    pub api_base_url: String,
    /// Booking reconciliation policy
    pub booking_mode: BookingMode,
    /// Page size used when listing events
    pub events_page_size: u32,
    /// Capacity of the store's action broadcast channel
    pub action_buffer: usize,
    /// Booking API implementation
    pub backend: Backend,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            booking_mode: BookingMode::Server,
            events_page_size: 100,
            action_buffer: 64,
            backend: Backend::Http,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `EVENTPASS_API_BASE_URL` | `http://localhost:8080` |
    /// | `EVENTPASS_BOOKING_MODE` | `server` |
    /// | `EVENTPASS_EVENTS_PAGE_SIZE` | `100` |
    /// | `EVENTPASS_ACTION_BUFFER` | `64` |
    /// | `EVENTPASS_BACKEND` | `http` |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set to an
    /// unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a variable is set to an
    /// unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("EVENTPASS_API_BASE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);
        if api_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "EVENTPASS_API_BASE_URL",
                value: api_base_url,
                reason: "must not be empty".to_string(),
            });
        }

        let booking_mode = parse_var(&lookup, "EVENTPASS_BOOKING_MODE", defaults.booking_mode)?;
        let backend = parse_var(&lookup, "EVENTPASS_BACKEND", defaults.backend)?;

        let events_page_size: u32 =
            parse_var(&lookup, "EVENTPASS_EVENTS_PAGE_SIZE", defaults.events_page_size)?;
        if events_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                var: "EVENTPASS_EVENTS_PAGE_SIZE",
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }

        let action_buffer: usize =
            parse_var(&lookup, "EVENTPASS_ACTION_BUFFER", defaults.action_buffer)?;
        if action_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                var: "EVENTPASS_ACTION_BUFFER",
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            api_base_url,
            booking_mode,
            events_page_size,
            action_buffer,
            backend,
        })
    }

    /// Set the booking mode
    #[must_use]
    pub const fn with_booking_mode(mut self, mode: BookingMode) -> Self {
        self.booking_mode = mode;
        self
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_action_buffer(mut self, capacity: usize) -> Self {
        self.action_buffer = capacity;
        self
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var,
                value,
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.booking_mode, BookingMode::Server);
        assert_eq!(config.events_page_size, 100);
        assert_eq!(config.action_buffer, 64);
        assert_eq!(config.backend, Backend::Http);
    }

    #[test]
    fn values_are_read_and_normalized() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("EVENTPASS_API_BASE_URL", "https://api.example.com/"),
            ("EVENTPASS_BOOKING_MODE", "Offline"),
            ("EVENTPASS_EVENTS_PAGE_SIZE", "25"),
            ("EVENTPASS_BACKEND", "memory"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.booking_mode, BookingMode::Offline);
        assert_eq!(config.events_page_size, 25);
        assert_eq!(config.backend, Backend::InMemory);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ClientConfig::from_lookup(lookup_from(&[("EVENTPASS_BOOKING_MODE", "maybe")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: "EVENTPASS_BOOKING_MODE", .. }
        ));

        let err =
            ClientConfig::from_lookup(lookup_from(&[("EVENTPASS_EVENTS_PAGE_SIZE", "0")]))
                .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: "EVENTPASS_EVENTS_PAGE_SIZE", .. }
        ));
    }

    #[test]
    fn booking_mode_round_trips_through_display() {
        for mode in [BookingMode::Server, BookingMode::ServerLocalId, BookingMode::Offline] {
            assert_eq!(mode.to_string().parse::<BookingMode>().unwrap(), mode);
        }
        assert!(!BookingMode::Offline.calls_server());
    }
}
