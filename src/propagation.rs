//! Serialization of trace propagation identifiers
//!
//! A [`TraceContext`] is the minimal identifying state needed to make a new
//! span causally part of an existing trace. [`ContextCodec`] turns it into a
//! transport-safe string (a JSON carrier holding a W3C `traceparent` field,
//! the same shape the text-map propagator produces for HTTP headers) and
//! back. Decoding failures surface as [`CodecError::MalformedContext`] and
//! are recovered locally by the caller; telemetry loss never becomes a
//! pipeline failure.

use opentelemetry::trace::{
    SpanContext, SpanId, TraceContextExt, TraceId, TraceState, TRACE_FLAG_SAMPLED,
};
use opentelemetry::Context;
use std::collections::HashMap;
use thiserror::Error;

/// Carrier field holding the propagation identifiers
const TRACEPARENT_FIELD: &str = "traceparent";

/// The only specified trace-context version
const SUPPORTED_VERSION: &str = "00";

/// Trace-context codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input cannot be interpreted as a trace context
    ///
    /// Callers recover by proceeding as if no parent context existed.
    #[error("malformed trace context: {0}")]
    MalformedContext(String),

    /// The carrier map could not be serialized
    #[error("failed to serialize trace context")]
    Serialization(#[from] serde_json::Error),
}

/// Propagation identifiers of a span, immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: u8,
}

impl TraceContext {
    pub fn new(trace_id: TraceId, span_id: SpanId, trace_flags: u8) -> Self {
        Self {
            trace_id,
            span_id,
            trace_flags,
        }
    }

    /// Extracts the identifiers of a span context, if it is valid
    pub fn from_span_context(span_context: &SpanContext) -> Option<Self> {
        if !span_context.is_valid() {
            return None;
        }

        Some(Self {
            trace_id: span_context.trace_id(),
            span_id: span_context.span_id(),
            trace_flags: span_context.trace_flags(),
        })
    }

    /// Identifiers of the currently active span, if there is one
    pub fn of_active_span() -> Option<Self> {
        let cx = Context::current();

        if !cx.has_active_span() {
            return None;
        }

        Self::from_span_context(cx.span().span_context())
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    pub fn trace_flags(&self) -> u8 {
        self.trace_flags
    }

    pub fn is_sampled(&self) -> bool {
        self.trace_flags & TRACE_FLAG_SAMPLED != 0
    }

    /// Returns a span context marked as remote, usable as a parent or a link target
    pub fn span_context(&self) -> SpanContext {
        SpanContext::new(
            self.trace_id,
            self.span_id,
            self.trace_flags,
            true,
            TraceState::default(),
        )
    }

    /// Returns a context carrying these identifiers as the remote parent
    pub fn parent_context(&self) -> Context {
        Context::new().with_remote_span_context(self.span_context())
    }

    fn to_traceparent(&self) -> String {
        format!(
            "{}-{}-{}-{:02x}",
            SUPPORTED_VERSION,
            self.trace_id.to_hex(),
            self.span_id.to_hex(),
            self.trace_flags
        )
    }

    fn from_traceparent(value: &str) -> Result<Self, CodecError> {
        let parts: Vec<&str> = value.trim().split('-').collect();

        if parts.len() != 4 {
            return Err(malformed(format!("expected 4 fields, found {}", parts.len())));
        }

        if parts[0] != SUPPORTED_VERSION {
            return Err(malformed(format!("unsupported version '{}'", parts[0])));
        }

        if parts[1].len() != 32 || parts[2].len() != 16 || parts[3].len() != 2 {
            return Err(malformed("identifier fields have the wrong length".to_string()));
        }

        let trace_id = u128::from_str_radix(parts[1], 16)
            .map_err(|_| malformed(format!("trace id '{}' is not hex", parts[1])))?;
        let span_id = u64::from_str_radix(parts[2], 16)
            .map_err(|_| malformed(format!("span id '{}' is not hex", parts[2])))?;
        let trace_flags = u8::from_str_radix(parts[3], 16)
            .map_err(|_| malformed(format!("flags '{}' are not hex", parts[3])))?;

        if trace_id == 0 || span_id == 0 {
            return Err(malformed("all-zero identifiers are invalid".to_string()));
        }

        Ok(Self::new(
            TraceId::from_u128(trace_id),
            SpanId::from_u64(span_id),
            trace_flags,
        ))
    }
}

fn malformed(reason: String) -> CodecError {
    CodecError::MalformedContext(reason)
}

/// Codec between a [`TraceContext`] and its transport-safe representation
pub struct ContextCodec;

impl ContextCodec {
    /// Produces the transport-safe representation of the given context
    pub fn encode(context: &TraceContext) -> Result<String, CodecError> {
        let mut carrier = HashMap::new();
        carrier.insert(TRACEPARENT_FIELD.to_owned(), context.to_traceparent());

        Ok(serde_json::to_string(&carrier)?)
    }

    /// Exact inverse of [`encode`](Self::encode)
    pub fn decode(raw: &str) -> Result<TraceContext, CodecError> {
        let carrier: HashMap<String, String> = serde_json::from_str(raw)
            .map_err(|error| malformed(error.to_string()))?;

        let traceparent = carrier
            .get(TRACEPARENT_FIELD)
            .ok_or_else(|| malformed(format!("missing '{}' field", TRACEPARENT_FIELD)))?;

        TraceContext::from_traceparent(traceparent)
    }
}
