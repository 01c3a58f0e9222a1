//! Trace-context propagation for multi-step data pipelines.
//!
//! Pipeline engines execute logical steps as separate, possibly
//! non-concurrent, possibly cross-process units of work; in-process context
//! propagation does not survive those boundaries. This crate closes the gap
//! in two ways: ambient [`context`] attributes set by an ancestor computation
//! attach to every span and event created by its descendants, and a trace
//! started in one step can be durably published through the engine's
//! metadata [`store`] and picked up by a disconnected downstream step via a
//! [`channel`], so both appear as one continuous trace.
//!
//! Span export is delegated to the OpenTelemetry OTLP exporter configured by
//! [`init`]. Telemetry failures never fail the pipeline they observe.
//!
//! ```no_run
//! use opentelemetry::KeyValue;
//! use steptrace::store::MemoryMetadataStore;
//! use steptrace::{ContextAwareTracer, ContextChannel, TracedStep};
//!
//! # async fn example() -> Result<(), String> {
//! let channel = ContextChannel::new(MemoryMetadataStore::new());
//! let tracer = ContextAwareTracer::new("example");
//!
//! TracedStep::new("ingest")
//!     .run(&channel, &tracer, || async {
//!         tracer.add_event("rows_loaded", vec![KeyValue::new("count", 1024i64)]);
//!         Ok::<_, String>(())
//!     })
//!     .await?;
//!
//! // Possibly much later, in a different process.
//! TracedStep::new("transform")
//!     .with_upstream(vec!["ingest"])
//!     .run(&channel, &tracer, || async { Ok::<_, String>(()) })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod constants;
pub mod context;
pub mod init;
pub mod keys;
pub mod logging;
pub mod options;
pub mod propagation;
pub mod step;
pub mod store;
pub mod testing;
pub mod tracer;

pub use channel::{ContextChannel, PublishError};
pub use logging::SpanEventLogger;
pub use options::SharedOptions;
pub use propagation::{CodecError, ContextCodec, TraceContext};
pub use step::TracedStep;
pub use tracer::{ActiveSpan, ContextAwareTracer};
