//! Structured logging helpers.
//!
//! Every line carries a `subsystem` field (`belief_model`, `propagation`,
//! `consistency`, `runtime`) so JSON logs can be split per subsystem.

/// Log with a `subsystem` field at the given level.
#[macro_export]
macro_rules! log_event {
    (info, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    (error, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a belief-related event with the agent and belief id as fields.
#[macro_export]
macro_rules! log_belief_event {
    ($level:ident, $subsystem:expr, $msg:expr, $agent:expr, $belief_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            agent = %$agent,
            belief_id = %$belief_id,
            $($($field)*,)?
            $msg
        )
    };
}
