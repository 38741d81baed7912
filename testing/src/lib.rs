//! # EventPass Testing
//!
//! Deterministic stand-ins for the environment, the [`ReducerTest`] harness,
//! and [`drive`] for running a reducer's feedback loop without a store.
//!
//! ```ignore
//! use eventpass_testing::{drive, test_clock, SequentialIdGenerator};
//!
//! let env = SessionEnvironment::new(api, Arc::new(test_clock()), Arc::new(SequentialIdGenerator::new("local-")));
//! let mut state = SessionState::default();
//!
//! let results = drive(&SessionReducer, &mut state, login, &env).await;
//! assert!(state.identity.is_some());
//! ```

use chrono::{DateTime, Utc};
use eventpass_core::environment::{Clock, IdGenerator};

/// Environment stand-ins
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// A clock that never moves
    ///
    /// ```
    /// use eventpass_testing::mocks::FixedClock;
    /// use eventpass_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        at: DateTime<Utc>,
    }

    impl FixedClock {
        /// Stop the clock at `at`
        #[must_use]
        pub const fn new(at: DateTime<Utc>) -> Self {
            Self { at }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.at
        }
    }

    /// Clock stopped at 2024-01-01 12:00:00 UTC
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .map_or(DateTime::UNIX_EPOCH, |t| t.and_utc()),
        )
    }

    /// Predictable identifiers: `<prefix>1`, `<prefix>2`, ...
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Create a generator producing ids with the given prefix
        #[must_use]
        pub fn new(prefix: impl Into<String>) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(1),
            }
        }
    }

    impl Default for SequentialIdGenerator {
        fn default() -> Self {
            Self::new("id")
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            format!("{}{n}", self.prefix)
        }
    }
}

/// Test setup
pub mod helpers {
    /// Route `tracing` output to the test writer, filtered by `RUST_LOG`
    ///
    /// Later calls in the same binary are no-ops.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}


pub use helpers::init_test_tracing;
pub use mocks::{FixedClock, SequentialIdGenerator, test_clock};
pub use reducer_test::{ReducerTest, assertions, collect_actions, drive};
