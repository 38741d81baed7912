//! # EventPass Core
//!
//! The vocabulary shared by the EventPass crates.
//!
//! Every user gesture and every network result is an action. A [`Reducer`]
//! folds actions into state and answers with [`Effect`] values: descriptions
//! of requests the runtime should perform, never the requests themselves.
//! Time and identifier generation come in through the environment, so a
//! reducer given the same inputs always does the same thing.
//!
//! ```ignore
//! impl Reducer for SessionReducer {
//!     type State = SessionState;
//!     type Action = SessionAction;
//!     type Environment = SessionEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut SessionState,
//!         action: SessionAction,
//!         env: &SessionEnvironment,
//!     ) -> SmallVec<[Effect<SessionAction>; 4]> {
//!         match action {
//!             SessionAction::DismissNotice => {
//!                 state.notice = None;
//!                 SmallVec::new()
//!             },
//!             // ...
//!         }
//!     }
//! }
//! ```
//!
//! [`Reducer`]: reducer::Reducer
//! [`Effect`]: effect::Effect

pub use smallvec::{smallvec, SmallVec};

/// `async_effect!` and `feedback!`
pub mod effect_macros;

/// The reducer trait
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// State transitions for one feature
    pub trait Reducer {
        /// State owned by the feature
        type State;

        /// Intents and results the feature reacts to
        type Action;

        /// Injected dependencies
        type Environment;

        /// Apply `action` to `state` in place and return the effects to run
        ///
        /// Most actions yield zero or one effect, hence the inline
        /// `SmallVec`.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect descriptions
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Work a reducer asks the runtime to do
    pub enum Effect<Action> {
        /// Nothing
        None,

        /// Several effects, started together
        Parallel(Vec<Effect<Action>>),

        /// A request or other async computation
        ///
        /// A `Some` result is fed back into the reducer, typically tagged
        /// with the id of the request that produced it.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action: std::fmt::Debug> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => f.write_str("None"),
                Effect::Parallel(effects) => f.debug_tuple("Parallel").field(effects).finish(),
                Effect::Future(_) => f.write_str("Future(..)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Start `effects` together
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Whether running this effect would do nothing
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) => effects.iter().all(Effect::is_none),
                Effect::Future(_) => false,
            }
        }
    }
}

/// Injected sources of time and identifiers
pub mod environment {
    use chrono::{DateTime, Utc};
    use rand::Rng;

    /// Current time
    pub trait Clock: Send + Sync {
        /// Now, in UTC
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Client-side identifiers, used for bookings the server did not name
    pub trait IdGenerator: Send + Sync {
        /// A fresh identifier
        fn next_id(&self) -> String;
    }

    /// Length of identifiers produced by [`RandomIdGenerator`]
    pub const RANDOM_ID_LEN: usize = 9;

    const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    /// Random lowercase base-36 identifiers
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RandomIdGenerator;

    impl IdGenerator for RandomIdGenerator {
        fn next_id(&self) -> String {
            let mut rng = rand::thread_rng();
            (0..RANDOM_ID_LEN)
                .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
                .collect()
        }
    }
}
