//! Two-step pipeline whose steps share one trace through the metadata store.
//!
//! Run with an OTLP collector listening locally:
//!
//! ```sh
//! cargo run --example pipeline -- --trace-endpoint http://localhost:4317
//! ```

use opentelemetry::KeyValue;
use std::time::{Duration, Instant};
use steptrace::store::MemoryMetadataStore;
use steptrace::{
    context, init, ContextAwareTracer, ContextChannel, SharedOptions, SpanEventLogger, TracedStep,
};
use structopt::StructOpt;

fn parse_rows(tracer: &ContextAwareTracer) -> usize {
    tracer.in_span("parse_rows", || {
        tracer.add_event("row_rejected", vec![KeyValue::new("reason", "empty line")]);
        1023
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = SharedOptions::from_args();

    let logger = pretty_env_logger::formatted_timed_builder()
        .parse_filters(&options.log)
        .build();
    let max_level = logger.filter();
    SpanEventLogger::init(logger, max_level)?;

    init::init(&options.trace_endpoint, "steptrace-pipeline-demo", None)?;

    let channel = ContextChannel::new(MemoryMetadataStore::new());
    let tracer = ContextAwareTracer::new("steptrace/demo");

    TracedStep::new("ingest")
        .with_attributes(vec![KeyValue::new("partition", "2026-08-27")])
        .run(&channel, &tracer, || async {
            let _scope = context::scope(vec![KeyValue::new("source", "s3://demo/raw")]);

            let started = Instant::now();
            let rows = parse_rows(&tracer);
            tracer.add_duration_event("parse_rows", started.elapsed(), Vec::new());

            tracer.add_event("rows_loaded", vec![KeyValue::new("count", rows as i64)]);

            // Attached to the ingest span as an event by the log bridge.
            log::info!("parsed {} rows", rows);
            Ok::<_, anyhow::Error>(())
        })
        .await?;

    // In a real pipeline this would run later, in a different process, and
    // still join the trace the ingest step published.
    TracedStep::new("transform")
        .with_upstream(vec!["ingest"])
        .run(&channel, &tracer, || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tracer.add_event("rows_written", vec![KeyValue::new("count", 1023i64)]);
            Ok::<_, anyhow::Error>(())
        })
        .await?;

    init::shutdown();
    Ok(())
}
