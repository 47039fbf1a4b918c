//! Structured event hooks.
//!
//! Events are emitted through `tracing` when the `tracing` feature is on and
//! compiled out otherwise. Fast paths never log; only slow paths, failures,
//! poisoning and timeouts do.

macro_rules! trace_event {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        ::tracing::$level!(target: "holdfast", $($arg)+);
    }};
}

pub(crate) use trace_event;
