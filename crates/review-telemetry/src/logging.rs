//! Structured logging helpers.
//!
//! Every line carries a `component` field so log aggregation can split the
//! registry, workflow and indexer streams.

/// Emit a log line tagged with a component.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a workflow transition with the standard entity fields.
#[macro_export]
macro_rules! log_transition {
    ($level:ident, $component:expr, $msg:expr, $entity:expr, $caller:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            entity = %$entity,
            caller = %$caller,
            $($($field)*,)?
            $msg
        )
    };
}
