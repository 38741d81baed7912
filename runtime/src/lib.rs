//! # EventPass Runtime
//!
//! The [`Store`] that drives a session reducer.
//!
//! An action sent to the store is reduced under the state write lock. The
//! effects the reducer returns are spawned as tokio tasks; whatever action an
//! effect resolves to is broadcast to observers and then reduced in turn.
//!
//! ```text
//! send(action) ──► reduce (write lock) ──► effects ──► spawned tasks
//!                        ▲                                  │
//!                        └──── broadcast + feed back ◄──────┘
//! ```
//!
//! Callers that need the result of a request use [`Store::send_and_settle`],
//! which collects the actions fed back by its own cascade, waits for the
//! cascade to settle, and then picks the matching result.
//!
//! ## Example
//!
//! ```ignore
//! use eventpass_runtime::Store;
//!
//! let store = Store::new(SessionState::default(), SessionReducer, environment);
//!
//! let mut handle = store.send_cascading(SessionAction::LoadEvents).await?;
//! handle.wait().await;
//!
//! let count = store.state(|s| s.events.len()).await;
//! ```

use eventpass_core::{effect::Effect, reducer::Reducer};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};

/// Store errors
pub mod error {
    use thiserror::Error;

    /// Errors returned by [`Store`](crate::Store) operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// The store has begun shutting down and rejects new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Effects were still running when the shutdown deadline passed
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// An [`EffectHandle`](crate::EffectHandle) did not settle in time
        #[error("Timed out waiting for effects to settle")]
        Timeout,
    }
}

pub use error::StoreError;

/// Store tuning
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Actions buffered per [`Store::subscribe_actions`] observer before it lags
    pub broadcast_capacity: usize,
    /// Deadline used by [`Store::shutdown_default`]
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Set the broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown deadline
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Which effects an [`EffectHandle`] waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// Only the effects of the sent action. Fed-back actions are re-sent
    /// with their own handles.
    Direct,

    /// The effects of the sent action, of every action they feed back, and
    /// so on until the cascade runs dry.
    Cascading,
}

/// Completion handle for the effects started by one `send`
///
/// ```ignore
/// let mut handle = store.send_cascading(SessionAction::LoadEvents).await?;
/// handle.wait().await;
/// // the list and everything its arrival triggered has been reduced
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    mode: TrackingMode,
    in_flight: Arc<AtomicUsize>,
    settled: watch::Receiver<()>,
}

impl EffectHandle {
    /// A handle and the tracker feeding it; `sink` receives every action
    /// the tracked effects feed back
    fn new<A>(mode: TrackingMode, sink: Option<mpsc::UnboundedSender<A>>) -> (Self, Tracker<A>) {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            mode,
            in_flight: Arc::clone(&in_flight),
            settled: rx,
        };
        let tracker = Tracker {
            mode,
            in_flight,
            settled: Arc::new(tx),
            sink,
        };

        (handle, tracker)
    }

    /// Tracking mode of this handle
    #[must_use]
    pub const fn mode(&self) -> TrackingMode {
        self.mode
    }

    /// Effects still running under this handle
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no tracked effect is running
    pub async fn wait(&mut self) {
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            if self.settled.changed().await.is_err() {
                // every tracker is dropped, nothing can still be running
                break;
            }
        }
    }

    /// [`Self::wait`] with a deadline
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when
    /// `timeout` elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("mode", &self.mode)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Counting side of an [`EffectHandle`], threaded through effect execution
struct Tracker<A> {
    mode: TrackingMode,
    in_flight: Arc<AtomicUsize>,
    settled: Arc<watch::Sender<()>>,
    sink: Option<mpsc::UnboundedSender<A>>,
}

impl<A> Clone for Tracker<A> {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            in_flight: Arc::clone(&self.in_flight),
            settled: Arc::clone(&self.settled),
            sink: self.sink.clone(),
        }
    }
}

impl<A> Tracker<A> {
    /// Count one effect against this tracker and the store-wide total
    fn enter(&self, store_total: &Arc<AtomicUsize>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        store_total.fetch_add(1, Ordering::SeqCst);
        InFlight {
            in_flight: Arc::clone(&self.in_flight),
            settled: Arc::clone(&self.settled),
            store_total: Arc::clone(store_total),
        }
    }
}

/// Uncounts one effect when dropped, including when its task panics
struct InFlight {
    in_flight: Arc<AtomicUsize>,
    settled: Arc<watch::Sender<()>>,
    store_total: Arc<AtomicUsize>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.store_total.fetch_sub(1, Ordering::SeqCst);
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.settled.send(());
        }
    }
}

/// The store and its action loop
pub mod store {
    use super::{
        mpsc, Arc, AtomicBool, AtomicUsize, Duration, Effect, EffectHandle, Future, Ordering,
        Reducer, RwLock, StoreConfig, StoreError, Tracker, TrackingMode,
    };
    use tokio::sync::broadcast;

    /// Runtime for one reducer
    ///
    /// Owns the state behind an `RwLock`, the reducer, and the injected
    /// environment. Clones share all three.
    ///
    /// The reducer only ever runs while holding the write lock, so a
    /// check-then-set inside one reducer arm (claiming a busy flag, say) is
    /// atomic with respect to every other action sent to the store.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        shutting_down: Arc<AtomicBool>,
        in_flight: Arc<AtomicUsize>,
        /// Effect-produced actions, sent here before they are reduced
        observers: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a store with the default [`StoreConfig`]
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a store with explicit configuration
        #[must_use]
        pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
            let (observers, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                config,
                shutting_down: Arc::new(AtomicBool::new(false)),
                in_flight: Arc::new(AtomicUsize::new(0)),
                observers,
            }
        }

        /// The injected environment
        #[must_use]
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Effects running across every handle
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }

        /// Stop accepting actions and wait for running effects to finish
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] with the number of effects
        /// still running if `timeout` elapses first.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Shutting down store");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutting_down.store(true, Ordering::Release);

            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let pending = self.in_flight.load(Ordering::Acquire);
                if pending == 0 {
                    tracing::info!("Store drained");
                    return Ok(());
                }
                if tokio::time::Instant::now() >= deadline {
                    tracing::error!(pending, "Shutdown deadline passed with effects running");
                    return Err(StoreError::ShutdownTimeout(pending));
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        /// [`Self::shutdown`] with the configured default deadline
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.default_shutdown_timeout).await
        }

        /// Reduce `action` and start its effects
        ///
        /// Returns once the effects are spawned, not when they finish. Actions
        /// they feed back are sent on their own.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] once shutdown has begun.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.dispatch(action, TrackingMode::Direct).await
        }

        /// Reduce `action` and track its whole feedback cascade
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] once shutdown has begun.
        #[tracing::instrument(skip(self, action), name = "store_send_cascading")]
        pub async fn send_cascading(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.dispatch(action, TrackingMode::Cascading).await
        }

        /// Send `action`, wait for its cascade to settle, and return the
        /// first fed-back action matching `predicate`
        ///
        /// Fed-back actions are collected for this call alone, so a slow
        /// [`Self::subscribe_actions`] observer never costs a result.
        /// Returns `Ok(None)` when the cascade produced no matching action,
        /// which is what happens when the reducer ignores `action`. There is
        /// no deadline; a request that never answers keeps the caller waiting
        /// exactly as long as the request itself.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] once shutdown has begun.
        pub async fn send_and_settle<F>(&self, action: A, predicate: F) -> Result<Option<A>, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let (sink, mut results) = mpsc::unbounded_channel();

            self.dispatch_with(action, TrackingMode::Cascading, Some(sink))
                .await?
                .wait()
                .await;

            while let Ok(action) = results.try_recv() {
                if predicate(&action) {
                    return Ok(Some(action));
                }
            }
            Ok(None)
        }

        /// Observe every action produced by an effect
        ///
        /// Actions passed to `send` directly are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.observers.subscribe()
        }

        /// Read state through a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.events.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        async fn dispatch(&self, action: A, mode: TrackingMode) -> Result<EffectHandle, StoreError> {
            self.dispatch_with(action, mode, None).await
        }

        async fn dispatch_with(
            &self,
            action: A,
            mode: TrackingMode,
            sink: Option<mpsc::UnboundedSender<A>>,
        ) -> Result<EffectHandle, StoreError> {
            if self.shutting_down.load(Ordering::Acquire) {
                tracing::warn!("Rejected action during shutdown");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            let (handle, tracker) = EffectHandle::new(mode, sink);
            self.reduce(action, &tracker).await;
            Ok(handle)
        }

        async fn reduce(&self, action: A, tracker: &Tracker<A>) {
            metrics::counter!("store.actions.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;
                let _span = tracing::debug_span!("reduce").entered();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!(effects = effects.len(), "Reduced");
                effects
            };

            for effect in effects {
                self.execute(effect, tracker);
            }
        }

        /// Start an effect
        ///
        /// `Parallel` effects are flattened; every `Future` becomes its own
        /// task counted against `tracker`. A panicking task is contained by
        /// tokio and still uncounted.
        fn execute(&self, effect: Effect<A>, tracker: &Tracker<A>) {
            match effect {
                Effect::None => {},
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute(effect, tracker);
                    }
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    self.spawn_tracked(fut, tracker);
                },
            }
        }

        fn spawn_tracked<F>(&self, fut: F, tracker: &Tracker<A>)
        where
            F: Future<Output = Option<A>> + Send + 'static,
        {
            let guard = tracker.enter(&self.in_flight);
            let tracker = tracker.clone();
            let store = self.clone();

            tokio::spawn(async move {
                let _guard = guard;
                match fut.await {
                    Some(action) => store.feed_back(action, &tracker).await,
                    None => tracing::trace!("Effect finished without an action"),
                }
            });
        }

        async fn feed_back(&self, action: A, tracker: &Tracker<A>) {
            let _ = self.observers.send(action.clone());
            if let Some(sink) = &tracker.sink {
                let _ = sink.send(action.clone());
            }

            match tracker.mode {
                TrackingMode::Cascading => {
                    if self.shutting_down.load(Ordering::Acquire) {
                        tracing::warn!("Dropped fed-back action during shutdown");
                        return;
                    }
                    self.reduce(action, tracker).await;
                },
                TrackingMode::Direct => {
                    let _ = self.send(action).await;
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                config: self.config.clone(),
                shutting_down: Arc::clone(&self.shutting_down),
                in_flight: Arc::clone(&self.in_flight),
                observers: self.observers.clone(),
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code
mod tests {
    use super::*;
    use eventpass_core::{smallvec, SmallVec};

    #[derive(Debug, Clone, Default)]
    struct Counter {
        value: i32,
        busy: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum CounterAction {
        Increment,
        Decrement,
        Ignore,
        IncrementLater,
        IncrementTwiceRemoved,
        IncrementThrice,
        Explode,
        Claim { id: u32 },
        Claimed { id: u32 },
    }

    #[derive(Debug, Clone)]
    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = Counter;
        type Action = CounterAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Counter,
            action: CounterAction,
            _env: &(),
        ) -> SmallVec<[Effect<CounterAction>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.value += 1;
                    SmallVec::new()
                },
                CounterAction::Decrement => {
                    state.value -= 1;
                    SmallVec::new()
                },
                CounterAction::Ignore => smallvec![Effect::None],
                CounterAction::IncrementLater => {
                    smallvec![Effect::Future(Box::pin(async { Some(CounterAction::Increment) }))]
                },
                CounterAction::IncrementTwiceRemoved => {
                    smallvec![Effect::Future(Box::pin(async {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Some(CounterAction::IncrementLater)
                    }))]
                },
                CounterAction::IncrementThrice => {
                    smallvec![Effect::Parallel(vec![
                        Effect::Future(Box::pin(async { Some(CounterAction::Increment) })),
                        Effect::Future(Box::pin(async { Some(CounterAction::Increment) })),
                        Effect::Parallel(vec![
                            Effect::None,
                            Effect::Future(Box::pin(async { Some(CounterAction::Increment) })),
                        ]),
                    ])]
                },
                CounterAction::Explode => {
                    smallvec![Effect::Future(Box::pin(async {
                        panic!("effect panicked on purpose");
                    }))]
                },
                CounterAction::Claim { id } => {
                    if state.busy {
                        return SmallVec::new();
                    }
                    state.busy = true;
                    smallvec![Effect::Future(Box::pin(async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Some(CounterAction::Claimed { id })
                    }))]
                },
                CounterAction::Claimed { .. } => {
                    state.busy = false;
                    state.value += 1;
                    SmallVec::new()
                },
            }
        }
    }

    fn counter_store() -> Store<Counter, CounterAction, (), CounterReducer> {
        Store::new(Counter::default(), CounterReducer, ())
    }

    #[tokio::test]
    async fn actions_are_reduced_in_order() {
        let store = counter_store();

        store.send(CounterAction::Increment).await.unwrap();
        store.send(CounterAction::Increment).await.unwrap();
        store.send(CounterAction::Decrement).await.unwrap();
        store.send(CounterAction::Ignore).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn direct_handle_settles_after_feedback_is_sent() {
        let store = counter_store();

        let mut handle = store.send(CounterAction::IncrementLater).await.unwrap();
        assert_eq!(handle.mode(), TrackingMode::Direct);
        handle.wait().await;

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn cascading_handle_waits_for_every_generation() {
        let store = counter_store();

        let mut handle = store
            .send_cascading(CounterAction::IncrementTwiceRemoved)
            .await
            .unwrap();
        handle.wait().await;

        assert_eq!(handle.pending(), 0);
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn nested_parallel_effects_all_run() {
        let store = counter_store();

        let mut handle = store.send_cascading(CounterAction::IncrementThrice).await.unwrap();
        handle.wait().await;

        assert_eq!(store.state(|s| s.value).await, 3);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn panicking_effect_is_uncounted_and_store_keeps_going() {
        let store = counter_store();

        let mut handle = store.send(CounterAction::Explode).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        store.send(CounterAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn settle_returns_the_matching_result() {
        let store = counter_store();

        let result = store
            .send_and_settle(CounterAction::Claim { id: 1 }, |a| {
                matches!(a, CounterAction::Claimed { id: 1 })
            })
            .await
            .unwrap();

        assert_eq!(result, Some(CounterAction::Claimed { id: 1 }));
        assert!(!store.state(|s| s.busy).await);
    }

    #[tokio::test]
    async fn settle_is_none_when_the_reducer_ignores_the_action() {
        let store = counter_store();

        let result = store
            .send_and_settle(CounterAction::Ignore, |_| true)
            .await
            .unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn concurrent_claims_are_serialized_by_the_reducer() {
        let store = counter_store();

        let (first, second) = tokio::join!(
            store.send_and_settle(CounterAction::Claim { id: 1 }, |a| {
                matches!(a, CounterAction::Claimed { id: 1 })
            }),
            store.send_and_settle(CounterAction::Claim { id: 2 }, |a| {
                matches!(a, CounterAction::Claimed { id: 2 })
            }),
        );

        let outcomes = [first.unwrap(), second.unwrap()];
        assert_eq!(outcomes.iter().filter(|o| o.is_some()).count(), 1);
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn shutdown_rejects_new_actions() {
        let store = counter_store();

        store.shutdown(Duration::from_secs(1)).await.unwrap();
        let result = store.send(CounterAction::Increment).await;

        assert_eq!(result.unwrap_err(), StoreError::ShutdownInProgress);
    }

    #[tokio::test]
    async fn shutdown_times_out_on_a_stuck_effect() {
        let store = counter_store();

        store.send(CounterAction::Claim { id: 1 }).await.unwrap();
        let result = store.shutdown(Duration::from_millis(1)).await;

        assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));
    }
}
