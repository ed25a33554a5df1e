pub mod logging;
pub mod metrics;
pub mod trace_context;

pub use logging::init_tracing;
pub use metrics::{init_metrics, metrics_handler, render_metrics};
pub use trace_context::{
    inject_trace_context, TracedClientExt, TracedRequest, TRACEPARENT_HEADER, TRACESTATE_HEADER,
};
