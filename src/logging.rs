//! Helper macros enforcing consistent peer log fields.
//!
//! Every event about a peer carries `service` (the logical peer name) and `stage` so that
//! degraded fetches can be grepped per peer.

/// Log an event for one peer plus any extra display fields.
#[macro_export]
macro_rules! peer_event {
    ($level:ident, $message:literal, service = $service:expr, stage = $stage:expr $(, $field:ident = $value:expr )* $(,)?) => {
        tracing::$level!(
            service = $service,
            stage = $stage,
            $($field = %$value,)*
            $message
        )
    };
    ($level:ident, $message:literal, service = $service:expr $(, $field:ident = $value:expr )* $(,)?) => {
        tracing::$level!(
            service = $service,
            $($field = %$value,)*
            $message
        )
    };
}
