//! Context-aware span and event creation
//!
//! [`ContextAwareTracer`] wraps the SDK tracer so that everything it creates
//! carries the ambient attribute set of the calling execution (see
//! [`context`](crate::context)), merged with any explicitly passed
//! attributes where the explicit ones win. It holds no durable state; its
//! only side effect is emitting telemetry through the underlying tracer.

use crate::constants::trace;
use crate::context;
use crate::propagation::TraceContext;
use log::debug;
use opentelemetry::global::{self, BoxedSpan, BoxedTracer};
use opentelemetry::trace::{Link, Span, SpanBuilder, TraceContextExt, Tracer};
use opentelemetry::{Context, ContextGuard, KeyValue};
use std::time::Duration;

/// Scope guard for a span opened by [`ContextAwareTracer`]
///
/// The span stays active, and its extra attributes ambient, until the guard
/// is dropped. The guard is bound to the current thread; async units of work
/// are wrapped through [`TracedStep`](crate::step::TracedStep) instead,
/// which carries the context through the future itself.
pub struct ActiveSpan {
    context: Option<TraceContext>,
    _guard: ContextGuard,
}

impl ActiveSpan {
    /// Propagation identifiers of the span, if it is recording
    pub fn trace_context(&self) -> Option<&TraceContext> {
        self.context.as_ref()
    }
}

/// Main entry point for starting spans and adding events
pub struct ContextAwareTracer {
    tracer: BoxedTracer,
}

impl ContextAwareTracer {
    /// Creates a tracer for the given instrumentation scope
    pub fn new(scope: &'static str) -> Self {
        Self {
            tracer: global::tracer(scope),
        }
    }

    /// Starts a span and makes it the active span for the scope of the guard
    ///
    /// Span attributes are the ambient set merged with `attributes`, the
    /// explicit keys winning. The extra attributes also become ambient for
    /// everything created inside the scope, and the previously active span
    /// is restored when the guard is dropped.
    pub fn start_as_current_span(&self, name: &str, attributes: Vec<KeyValue>) -> ActiveSpan {
        let cx = Context::current();
        let resolved = context::resolve(&cx, &attributes);
        let span = self.build_span(name.to_owned(), &cx, resolved, Vec::new());
        let context = TraceContext::from_span_context(span.span_context());

        ActiveSpan {
            context,
            _guard: context::extend(&cx, attributes).with_span(span).attach(),
        }
    }

    /// Runs `f` inside a span named `name`
    ///
    /// Shorthand for wrapping a synchronous helper in its own span.
    pub fn in_span<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let _span = self.start_as_current_span(name, Vec::new());
        f()
    }

    /// Records an event on the active span
    ///
    /// `name` doubles as the event's `type` attribute. Without an active
    /// span the event is logged and dropped; telemetry must never abort the
    /// pipeline it observes.
    pub fn add_event(&self, name: &str, attributes: Vec<KeyValue>) {
        let cx = Context::current();

        if !cx.has_active_span() {
            debug!("No active span to record event '{}' on, dropping it", name);
            return;
        }

        let mut with_type = vec![trace::EVENT_TYPE.string(name.to_owned())];
        with_type.extend(attributes);

        cx.span()
            .add_event(name.to_owned(), context::resolve(&cx, &with_type));
    }

    /// Records the elapsed time of some portion of a unit of work on the active span
    ///
    /// Queries in the observability backend are expected to reference
    /// `duration_name`; it is also used as the event name for visibility.
    pub fn add_duration_event(
        &self,
        duration_name: &str,
        elapsed: Duration,
        attributes: Vec<KeyValue>,
    ) {
        let cx = Context::current();

        if !cx.has_active_span() {
            debug!(
                "No active span to record duration '{}' on, dropping it",
                duration_name
            );
            return;
        }

        let mut with_timing = vec![
            trace::EVENT_TYPE.string(trace::EVENT_TYPE_DURATION),
            trace::DURATION_NAME.string(duration_name.to_owned()),
            trace::DURATION_SECONDS.f64(elapsed.as_secs_f64()),
        ];
        with_timing.extend(attributes);

        cx.span()
            .add_event(duration_name.to_owned(), context::resolve(&cx, &with_timing));
    }

    /// Starts the root span of a brand-new trace, linked to `link_to`
    ///
    /// For fan-out cases where continuing one unbroken trace would be
    /// misleading: the new trace records its causality through a span link
    /// instead of a parent. Ambient attributes remain visible inside the
    /// new scope.
    pub fn start_new_linked_trace(&self, name: &str, link_to: &TraceContext) -> ActiveSpan {
        let cx = Context::current();
        let resolved = context::resolve(&cx, &[]);
        let link = Link::new(link_to.span_context(), Vec::new());

        // An empty parent context forces a fresh trace id.
        let span = self.build_span(name.to_owned(), &Context::new(), resolved, vec![link]);
        let context = TraceContext::from_span_context(span.span_context());

        ActiveSpan {
            context,
            _guard: cx.with_span(span).attach(),
        }
    }

    /// Builds a span under `parent_cx` with pre-resolved attributes
    pub(crate) fn build_span(
        &self,
        name: String,
        parent_cx: &Context,
        attributes: Vec<KeyValue>,
        links: Vec<Link>,
    ) -> BoxedSpan {
        let mut builder = SpanBuilder::from_name(name)
            .with_parent_context(parent_cx.clone())
            .with_attributes(attributes);

        if !links.is_empty() {
            builder = builder.with_links(links);
        }

        self.tracer.build(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use opentelemetry::trace::SpanId;
    use opentelemetry::{Key, Value};
    use pretty_assertions::assert_eq;

    #[test]
    fn spans_inherit_ambient_attributes() {
        let capture = testing::install();
        let tracer = ContextAwareTracer::new("steptrace/tests");

        {
            let _ambient = context::scope(vec![
                KeyValue::new("ambient", "outer"),
                KeyValue::new("shadowed", "ambient"),
            ]);
            let _span = tracer
                .start_as_current_span("tracer_ambient_attrs", vec![KeyValue::new("shadowed", "explicit")]);
        }

        let spans = capture.spans_named("tracer_ambient_attrs");
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].attributes.get(&Key::new("ambient")),
            Some(&Value::from("outer"))
        );
        assert_eq!(
            spans[0].attributes.get(&Key::new("shadowed")),
            Some(&Value::from("explicit"))
        );
    }

    #[test]
    fn nested_spans_parent_to_the_active_span() {
        let capture = testing::install();
        let tracer = ContextAwareTracer::new("steptrace/tests");

        let outer_context;
        {
            let outer = tracer.start_as_current_span("parenting_outer", Vec::new());
            outer_context = outer.trace_context().cloned().expect("recording span");

            let _inner = tracer.start_as_current_span("parenting_inner", Vec::new());
        }

        let spans = capture.spans_named("parenting_inner");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].span_context.trace_id(), outer_context.trace_id());
        assert_eq!(spans[0].parent_span_id, outer_context.span_id());
    }

    #[test]
    fn events_merge_ambient_attributes() {
        let capture = testing::install();
        let tracer = ContextAwareTracer::new("steptrace/tests");

        {
            let _ambient = context::scope(vec![KeyValue::new("tracer.event.ambient", true)]);
            let _span = tracer.start_as_current_span("tracer_event_span", Vec::new());
            tracer.add_event("something_happened", vec![KeyValue::new("detail", 7i64)]);
        }

        let spans = capture.spans_named("tracer_event_span");
        assert_eq!(spans.len(), 1);

        let events: Vec<_> = spans[0].events.iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "something_happened");

        let attributes: std::collections::HashMap<_, _> = events[0]
            .attributes
            .iter()
            .map(|attribute| (attribute.key.clone(), attribute.value.clone()))
            .collect();
        assert_eq!(attributes.get(&Key::new("tracer.event.ambient")), Some(&Value::Bool(true)));
        assert_eq!(attributes.get(&Key::new("detail")), Some(&Value::I64(7)));
        assert_eq!(
            attributes.get(&trace::EVENT_TYPE),
            Some(&Value::from("something_happened"))
        );
    }

    #[test]
    fn add_event_without_active_span_is_dropped() {
        testing::install();
        let tracer = ContextAwareTracer::new("steptrace/tests");

        // Must neither panic nor create a span.
        tracer.add_event("tracer_orphan_event", Vec::new());
    }

    #[test]
    fn duration_event_carries_timing_attributes() {
        let capture = testing::install();
        let tracer = ContextAwareTracer::new("steptrace/tests");

        {
            let _span = tracer.start_as_current_span("tracer_duration_span", Vec::new());
            tracer.add_duration_event("load_input", Duration::from_millis(12500), Vec::new());
        }

        let spans = capture.spans_named("tracer_duration_span");
        let events: Vec<_> = spans[0].events.iter().collect();
        assert_eq!(events[0].name, "load_input");

        let attributes: std::collections::HashMap<_, _> = events[0]
            .attributes
            .iter()
            .map(|attribute| (attribute.key.clone(), attribute.value.clone()))
            .collect();
        assert_eq!(
            attributes.get(&trace::EVENT_TYPE),
            Some(&Value::from(trace::EVENT_TYPE_DURATION))
        );
        assert_eq!(attributes.get(&trace::DURATION_SECONDS), Some(&Value::F64(12.5)));
        assert_eq!(
            attributes.get(&trace::DURATION_NAME),
            Some(&Value::from("load_input"))
        );
    }

    #[test]
    fn linked_trace_gets_new_trace_id_and_link() {
        let capture = testing::install();
        let tracer = ContextAwareTracer::new("steptrace/tests");

        let origin;
        {
            let root = tracer.start_as_current_span("linked_origin", Vec::new());
            origin = root.trace_context().cloned().expect("recording span");

            let _fanout = tracer.start_new_linked_trace("linked_fanout", &origin);
        }

        let spans = capture.spans_named("linked_fanout");
        assert_eq!(spans.len(), 1);

        assert_ne!(spans[0].span_context.trace_id(), origin.trace_id());
        assert_eq!(spans[0].parent_span_id, SpanId::invalid());

        let links: Vec<_> = spans[0].links.iter().collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].span_context().trace_id(), origin.trace_id());
        assert_eq!(links[0].span_context().span_id(), origin.span_id());
    }
}
