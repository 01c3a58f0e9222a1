//! Traced execution of pipeline units of work
//!
//! [`TracedStep`] wraps the async body of a unit of work in a span that is
//! parented to the trace of its upstream units, carries the unit id as an
//! ambient attribute and publishes its own context for downstream units on
//! completion. The wrapped result passes through unchanged, successful or
//! not.

use crate::channel::ContextChannel;
use crate::constants::trace;
use crate::context;
use crate::propagation::TraceContext;
use crate::store::MetadataStore;
use crate::tracer::ContextAwareTracer;
use log::{debug, warn};
use opentelemetry::trace::{FutureExt, Span, StatusCode, TraceContextExt};
use opentelemetry::{Context, KeyValue};
use std::fmt::Display;
use std::future::Future;

/// Description of one unit of work in a pipeline
///
/// The id doubles as the publication key in the metadata store and as the
/// `pipeline.unit.id` attribute on every span and event the unit emits.
pub struct TracedStep {
    id: String,
    span_name: Option<String>,
    upstream: Vec<String>,
    attributes: Vec<KeyValue>,
}

impl TracedStep {
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self {
            id: id.into(),
            span_name: None,
            upstream: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Upstream unit ids to resolve the parent context from, in order of priority
    pub fn with_upstream<T: Into<String>>(mut self, upstream: Vec<T>) -> Self {
        self.upstream = upstream.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the span name, which defaults to the unit id
    pub fn with_span_name<T: Into<String>>(mut self, name: T) -> Self {
        self.span_name = Some(name.into());
        self
    }

    /// Additional attributes set on the unit's span and ambient for its body
    pub fn with_attributes(mut self, attributes: Vec<KeyValue>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Runs `work` inside the unit's span
    ///
    /// The span's parent is the first resolvable upstream context; with no
    /// usable upstream the unit starts a fresh trace under whatever context
    /// is current. The unit's own context is published for downstream units
    /// regardless of whether `work` succeeded, and publication failures are
    /// logged rather than masking the work's result.
    pub async fn run<S, F, Fut, T, E>(
        &self,
        channel: &ContextChannel<S>,
        tracer: &ContextAwareTracer,
        work: F,
    ) -> Result<T, E>
    where
        S: MetadataStore,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        // The remote parent is grafted onto the current context so the
        // caller's ambient attribute stack stays visible inside the step.
        let parent_cx = match channel.resolve(&self.upstream).await {
            Some(parent) => Context::current().with_remote_span_context(parent.span_context()),
            None => Context::current(),
        };

        let mut attributes = vec![trace::UNIT_ID.string(self.id.clone())];
        attributes.extend(self.attributes.iter().cloned());

        let name = self.span_name.clone().unwrap_or_else(|| self.id.clone());
        let span = tracer.build_span(
            name,
            &parent_cx,
            context::resolve(&parent_cx, &attributes),
            Vec::new(),
        );

        let own_context = TraceContext::from_span_context(span.span_context());
        let cx = context::extend(&parent_cx, attributes).with_span(span);

        let result = work().with_context(cx.clone()).await;

        if let Err(error) = &result {
            cx.span().set_status(StatusCode::Error, error.to_string());
        }

        match &own_context {
            Some(context) => {
                if let Err(error) = channel.publish(&self.id, context).await {
                    warn!(
                        "Unable to publish the trace context of unit '{}': {}",
                        self.id, error
                    );
                }
            }
            None => debug!(
                "Unit '{}' produced no recording span, skipping context publication",
                self.id
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryMetadataStore;
    use crate::testing;
    use opentelemetry::trace::SpanId;
    use pretty_assertions::assert_eq;

    fn fixtures() -> (ContextChannel<MemoryMetadataStore>, ContextAwareTracer) {
        (
            ContextChannel::new(MemoryMetadataStore::new()),
            ContextAwareTracer::new("steptrace/tests"),
        )
    }

    #[tokio::test]
    async fn downstream_step_continues_published_trace() {
        let capture = testing::install();
        let (channel, tracer) = fixtures();

        TracedStep::new("step_chain_ingest")
            .run(&channel, &tracer, || async { Ok::<_, String>(()) })
            .await
            .unwrap();

        TracedStep::new("step_chain_transform")
            .with_upstream(vec!["step_chain_ingest"])
            .run(&channel, &tracer, || async { Ok::<_, String>(()) })
            .await
            .unwrap();

        let published = channel
            .resolve(&["step_chain_ingest".to_owned()])
            .await
            .unwrap();

        let spans = capture.spans_named("step_chain_transform");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].span_context.trace_id(), published.trace_id());
        assert_eq!(spans[0].parent_span_id, published.span_id());
    }

    #[tokio::test]
    async fn ambient_attributes_survive_upstream_resolution() {
        let capture = testing::install();
        let (channel, tracer) = fixtures();

        TracedStep::new("step_ambient_upstream")
            .run(&channel, &tracer, || async { Ok::<_, String>(()) })
            .await
            .unwrap();

        {
            let _run = context::scope(vec![KeyValue::new("pipeline.run", "run-42")]);

            TracedStep::new("step_ambient_downstream")
                .with_upstream(vec!["step_ambient_upstream"])
                .run(&channel, &tracer, || async { Ok::<_, String>(()) })
                .await
                .unwrap();
        }

        let published = channel
            .resolve(&["step_ambient_upstream".to_owned()])
            .await
            .unwrap();

        // The resolved remote parent must not wipe the caller's scope.
        let spans = capture.spans_named("step_ambient_downstream");
        assert_eq!(spans.len(), 1);
        assert_eq!(
            spans[0].attributes.get(&opentelemetry::Key::new("pipeline.run")),
            Some(&opentelemetry::Value::from("run-42"))
        );
        assert_eq!(spans[0].parent_span_id, published.span_id());
    }

    #[tokio::test]
    async fn missing_upstream_starts_fresh_root_trace() {
        let capture = testing::install();
        let (channel, tracer) = fixtures();

        TracedStep::new("step_orphan")
            .with_upstream(vec!["never_published"])
            .run(&channel, &tracer, || async { Ok::<_, String>(()) })
            .await
            .unwrap();

        let spans = capture.spans_named("step_orphan");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].parent_span_id, SpanId::invalid());
    }

    #[tokio::test]
    async fn unit_id_is_recorded_as_span_attribute() {
        let capture = testing::install();
        let (channel, tracer) = fixtures();

        TracedStep::new("step_attributed")
            .with_attributes(vec![KeyValue::new("partition", "2026-08")])
            .run(&channel, &tracer, || async { Ok::<_, String>(()) })
            .await
            .unwrap();

        let spans = capture.spans_named("step_attributed");
        assert_eq!(
            spans[0].attributes.get(&trace::UNIT_ID),
            Some(&opentelemetry::Value::from("step_attributed"))
        );
        assert_eq!(
            spans[0].attributes.get(&opentelemetry::Key::new("partition")),
            Some(&opentelemetry::Value::from("2026-08"))
        );
    }

    #[tokio::test]
    async fn span_name_override_applies() {
        let capture = testing::install();
        let (channel, tracer) = fixtures();

        TracedStep::new("step_named")
            .with_span_name("friendly name")
            .run(&channel, &tracer, || async { Ok::<_, String>(()) })
            .await
            .unwrap();

        assert_eq!(capture.spans_named("friendly name").len(), 1);
        assert_eq!(capture.spans_named("step_named").len(), 0);
    }

    #[tokio::test]
    async fn failing_step_reraises_after_publishing() {
        let capture = testing::install();
        let (channel, tracer) = fixtures();

        let result = TracedStep::new("step_failing")
            .run(&channel, &tracer, || async {
                Err::<(), _>("input file missing".to_owned())
            })
            .await;

        assert_eq!(result, Err("input file missing".to_owned()));

        // The failed unit still hands its context to downstream units.
        assert!(channel
            .resolve(&["step_failing".to_owned()])
            .await
            .is_some());

        let spans = capture.spans_named("step_failing");
        assert_eq!(spans[0].status_code, StatusCode::Error);
        assert_eq!(spans[0].status_message, "input file missing");
    }
}
