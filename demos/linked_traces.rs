//! Fan-out trigger that starts one linked trace per shard instead of one
//! oversized trace for the whole fan-out.
//!
//! ```sh
//! cargo run --example linked_traces -- --trace-endpoint http://localhost:4317
//! ```

use opentelemetry::KeyValue;
use steptrace::{constants, context, init, ContextAwareTracer, SharedOptions, SpanEventLogger};
use structopt::StructOpt;

fn process_shard(tracer: &ContextAwareTracer, shard: i64) {
    tracer.add_event("shard_processed", vec![KeyValue::new("rows", shard * 100)]);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = SharedOptions::from_args();

    let logger = pretty_env_logger::formatted_timed_builder()
        .parse_filters(&options.log)
        .build();
    let max_level = logger.filter();
    SpanEventLogger::init(logger, max_level)?;

    init::init(&options.trace_endpoint, "steptrace-fanout-demo", None)?;

    let tracer = ContextAwareTracer::new("steptrace/demo");

    {
        let trigger = tracer.start_as_current_span(constants::span::ROOT, Vec::new());

        match trigger.trace_context().cloned() {
            Some(trigger_context) => {
                for shard in 0..4i64 {
                    let _scope = context::scope(vec![KeyValue::new("shard", shard)]);
                    let _trace = tracer.start_new_linked_trace("process_shard", &trigger_context);

                    process_shard(&tracer, shard);
                }
            }
            None => log::warn!("Tracing is disabled, pass --trace-endpoint to see the fan-out"),
        }
    }

    init::shutdown();
    Ok(())
}
