//! In-process span capture for tests
//!
//! Installs a global tracer provider with a processor that pushes every
//! finished span into a shared vector from within `on_end`, so a span is
//! visible to assertions the moment its guard drops. The provider is global
//! and installed once per process; tests disambiguate by using unique span
//! names and filtering with [`SpanCapture::spans_named`].

use lazy_static::lazy_static;
use opentelemetry::global;
use opentelemetry::sdk::export::trace::SpanData;
use opentelemetry::sdk::trace::{Span, SpanProcessor, TracerProvider};
use opentelemetry::trace::TraceResult;
use opentelemetry::Context;
use std::sync::{Arc, Mutex};

/// Handle to the spans recorded since the capture was installed
#[derive(Clone, Debug)]
pub struct SpanCapture {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl SpanCapture {
    /// All finished spans with the given name, in finishing order
    pub fn spans_named(&self, name: &str) -> Vec<SpanData> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter(|span| span.name == name)
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
struct CaptureProcessor {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl SpanProcessor for CaptureProcessor {
    fn on_start(&self, _span: &Span, _cx: &Context) {}

    fn on_end(&self, span: SpanData) {
        self.spans.lock().unwrap().push(span);
    }

    fn force_flush(&self) -> TraceResult<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> TraceResult<()> {
        Ok(())
    }
}

lazy_static! {
    static ref CAPTURE: SpanCapture = {
        let spans = Arc::new(Mutex::new(Vec::new()));
        let processor = CaptureProcessor {
            spans: spans.clone(),
        };

        let provider = TracerProvider::builder()
            .with_span_processor(processor)
            .build();
        global::set_tracer_provider(provider);

        SpanCapture { spans }
    };
}

/// Routes all spans of this process into an in-memory capture
pub fn install() -> SpanCapture {
    CAPTURE.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::Tracer;

    #[test]
    fn finished_spans_are_visible_immediately() {
        let capture = install();

        let tracer = global::tracer("steptrace/tests");
        tracer.in_span("capture_sync_span", |_cx| {});

        assert_eq!(capture.spans_named("capture_sync_span").len(), 1);
    }
}
