//! Log-to-span-event bridge
//!
//! [`SpanEventLogger`] wraps another [`log::Log`] implementation and, in
//! addition to forwarding every record to it, attaches the record to the
//! currently active span as an event. Error-level records also set the
//! span's error status. Records logged while no span is active are only
//! forwarded; the raised per-span event limit configured by
//! [`init`](crate::init) exists to make room for these events.

use crate::constants::trace;
use crate::context;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use opentelemetry::trace::{StatusCode, TraceContextExt};
use opentelemetry::Context;

/// Logger decorator that mirrors records onto the active span
pub struct SpanEventLogger<L> {
    inner: L,
}

impl<L: Log + 'static> SpanEventLogger<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    /// Installs the bridge around `inner` as the global logger
    pub fn init(inner: L, max_level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(Self::new(inner)))?;
        log::set_max_level(max_level);

        Ok(())
    }
}

impl<L: Log> Log for SpanEventLogger<L> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.inner.log(record);

        let cx = Context::current();
        if !cx.has_active_span() {
            return;
        }

        let message = record.args().to_string();

        let mut attributes = vec![
            trace::EVENT_TYPE.string(trace::EVENT_TYPE_LOG),
            trace::LOG_LEVEL.string(record.level().to_string()),
            trace::LOG_TARGET.string(record.target().to_owned()),
        ];

        if let Some(module_path) = record.module_path() {
            attributes.push(trace::CODE_NAMESPACE.string(module_path.to_owned()));
        }

        if let Some(file) = record.file() {
            attributes.push(trace::CODE_FILEPATH.string(file.to_owned()));
        }

        if let Some(line) = record.line() {
            attributes.push(trace::CODE_LINENO.i64(line as i64));
        }

        let span = cx.span();

        if record.level() == Level::Error {
            // Later error records overwrite the status message, but every
            // one of them remains visible as an event.
            span.set_status(StatusCode::Error, message.clone());
            attributes.push(trace::ERROR.bool(true));
        }

        // The log message doubles as the event name for visibility in the
        // observability backend's UI.
        span.add_event(message, context::resolve(&cx, &attributes));
    }

    fn flush(&self) {
        self.inner.flush()
    }
}
