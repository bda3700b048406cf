//! crates/logging/src/tracing_macros.rs
//! Convenience macros for sitewarden subsystem tracing.
//!
//! Each macro forwards to the matching `tracing` macro with a fixed target,
//! so filters such as `sitewarden::verify=debug` select one subsystem. Crates
//! using these macros must depend on `tracing` themselves.

/// Emit an HTTP transport trace.
///
/// # Example
/// ```ignore
/// trace_transport!(method = %method, path, "sending request");
/// ```
#[macro_export]
macro_rules! trace_transport {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "sitewarden::transport", $($arg)*);
    };
}

/// Emit a rate-governor trace.
///
/// # Example
/// ```ignore
/// trace_pacing!(wait_ms, "holding request");
/// ```
#[macro_export]
macro_rules! trace_pacing {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "sitewarden::pacing", $($arg)*);
    };
}

/// Emit an endpoint negotiation trace.
///
/// # Example
/// ```ignore
/// trace_negotiate!(operation = %op, "current namespace unsupported; trying legacy");
/// ```
#[macro_export]
macro_rules! trace_negotiate {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "sitewarden::negotiate", $($arg)*);
    };
}

/// Emit an inventory query trace.
///
/// # Example
/// ```ignore
/// trace_inventory!(plugins = list.len(), "normalised plugin inventory");
/// ```
#[macro_export]
macro_rules! trace_inventory {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "sitewarden::inventory", $($arg)*);
    };
}

/// Emit a mutation trace.
///
/// # Example
/// ```ignore
/// trace_mutation!(operation = %op, target = id, "mutation accepted");
/// ```
#[macro_export]
macro_rules! trace_mutation {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "sitewarden::mutation", $($arg)*);
    };
}

/// Emit a timeout-verification trace.
///
/// # Example
/// ```ignore
/// trace_verify!(before, after, "re-check after timeout");
/// ```
#[macro_export]
macro_rules! trace_verify {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "sitewarden::verify", $($arg)*);
    };
}

/// Emit a batch orchestration trace.
///
/// # Example
/// ```ignore
/// trace_batch!(items = n, "bulk route unsupported; updating one by one");
/// ```
#[macro_export]
macro_rules! trace_batch {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "sitewarden::batch", $($arg)*);
    };
}
