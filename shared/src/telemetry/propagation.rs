//! W3C trace-context propagation across RPC and broker boundaries

use std::collections::HashMap;

use http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector};
use opentelemetry::{Context, global, trace::TraceContextExt as _};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt as _;

/// Trace context carried as plain string pairs (broker message headers)
pub type TraceHeaders = HashMap<String, String>;

/// Install the W3C propagator globally. Safe to call more than once.
pub fn install_propagator() {
    global::set_text_map_propagator(TraceContextPropagator::new());
}

/// Serialize `cx` into a header map
pub fn inject_context(cx: &Context) -> TraceHeaders {
    let mut headers = TraceHeaders::new();
    global::get_text_map_propagator(|propagator| propagator.inject_context(cx, &mut headers));
    headers
}

/// Serialize the context of the current tracing span
pub fn current_trace_headers() -> TraceHeaders {
    inject_context(&Span::current().context())
}

/// Rebuild a remote parent context, or `None` when no valid trace is carried
pub fn extract_context(headers: &TraceHeaders) -> Option<Context> {
    extract_with(headers)
}

/// Same as [`extract_context`], reading HTTP request headers
pub fn extract_http_context(headers: &HeaderMap) -> Option<Context> {
    extract_with(&HeaderExtractor(headers))
}

/// Write the current span's context into outgoing HTTP headers
pub fn inject_http_headers(headers: &mut HeaderMap) {
    let cx = Span::current().context();
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&cx, &mut HeaderInjector(headers))
    });
}

/// Parent `span` on the context carried by `headers`, if any
pub fn set_parent_from(span: &Span, headers: &TraceHeaders) {
    if let Some(parent) = extract_context(headers)
        && let Err(e) = span.set_parent(parent)
    {
        tracing::warn!(error = %e, "failed to set parent context on span");
    }
}

fn extract_with(extractor: &dyn Extractor) -> Option<Context> {
    global::get_text_map_propagator(|propagator| {
        // Fresh base context so a missing header never inherits the local span chain
        let cx = propagator.extract_with_context(&Context::new(), extractor);
        let valid = cx.span().span_context().is_valid();
        valid.then_some(cx)
    })
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};

    fn remote_context() -> (Context, SpanContext) {
        let span_context = SpanContext::new(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );
        (
            Context::new().with_remote_span_context(span_context.clone()),
            span_context,
        )
    }

    #[test]
    fn test_inject_then_extract() {
        install_propagator();
        let (cx, span_context) = remote_context();

        let headers = inject_context(&cx);
        assert_eq!(
            headers.get("traceparent").map(String::as_str),
            Some("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
        );

        let extracted = extract_context(&headers).unwrap();
        let extracted_span = extracted.span();
        assert_eq!(
            extracted_span.span_context().trace_id(),
            span_context.trace_id()
        );
        assert_eq!(extracted_span.span_context().span_id(), span_context.span_id());
    }

    #[test]
    fn test_extract_without_trace_is_none() {
        install_propagator();
        assert!(extract_context(&TraceHeaders::new()).is_none());

        let mut garbage = TraceHeaders::new();
        garbage.insert("traceparent".into(), "not-a-trace".into());
        assert!(extract_context(&garbage).is_none());
    }

    #[test]
    fn test_extract_http_headers() {
        install_propagator();
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );

        let cx = extract_http_context(&headers).unwrap();
        assert_eq!(
            cx.span().span_context().trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
    }
}
