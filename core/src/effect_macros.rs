//! Declarative macros for ergonomic effect construction
//!
//! Reducers describe every request as an async block; these macros wrap the
//! block in an [`Effect::Future`](crate::effect::Effect::Future).

/// Create an `Effect::Future` from an async block
///
/// The block is moved into the future, so clone what it needs out of the
/// environment first.
///
/// # Example
///
/// ```rust,ignore
/// use eventpass_core::async_effect;
///
/// let api = Arc::clone(&env.api);
/// let epoch = state.session_epoch;
/// async_effect! {
///     match api.list_events(1, 100).await {
///         Ok(events) => Some(SessionAction::EventsLoaded { epoch, events }),
///         Err(error) => Some(SessionAction::EventsLoadFailed { epoch, error }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Future` that resolves to `action` right away
///
/// For outcomes the reducer can decide locally (a sold-out event, a missing
/// identity) but that must still reach waiting callers as a result action.
///
/// # Example
///
/// ```rust,ignore
/// use eventpass_core::feedback;
///
/// feedback!(SessionAction::BookingFailed { request, event_id, message })
/// ```
#[macro_export]
macro_rules! feedback {
    ($action:expr) => {{
        let action = $action;
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { ::std::option::Option::Some(action) })
        )
    }};
}
