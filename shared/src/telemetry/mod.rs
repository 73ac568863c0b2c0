//! Logging and trace-context propagation

mod calls;
mod logger;
mod propagation;

pub use calls::log_call;
pub use logger::{LogOptions, TelemetryGuard, init_logger};
pub use propagation::{
    TraceHeaders, current_trace_headers, extract_context, extract_http_context, inject_context,
    inject_http_headers, install_propagator, set_parent_from,
};
