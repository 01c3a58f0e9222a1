//! Ambient attribute scoping
//!
//! Attributes set by an ancestor computation automatically attach to every
//! span and event created by its descendants, regardless of intervening call
//! depth. Scopes nest and may shadow outer definitions; resolution returns
//! the innermost definition for each key, falling back through enclosing
//! scopes. A scope is bound to the guard returned by [`scope`] and the
//! previous visibility is restored when the guard is dropped, on every exit
//! path.
//!
//! The attribute stack is carried inside [`opentelemetry::Context`], so each
//! logical execution owns its own stack: synchronous code uses the returned
//! guards while futures carry their context explicitly through
//! [`opentelemetry::trace::FutureExt::with_context`] (which is what
//! [`TracedStep`](crate::step::TracedStep) does for wrapped units of work).

use opentelemetry::trace::TraceContextExt;
use opentelemetry::{Context, ContextGuard, Key, KeyValue, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved ambient attribute set of one execution scope
#[derive(Clone, Debug, Default)]
struct AmbientAttributes(Arc<HashMap<Key, Value>>);

/// Enters a new attribute scope, merging `attributes` over the currently visible set
///
/// The previous visibility is restored when the returned guard is dropped.
pub fn scope(attributes: Vec<KeyValue>) -> ContextGuard {
    extend(&Context::current(), attributes).attach()
}

/// Same as [`scope`], but additionally sets the attributes on the active span
///
/// Useful when details only become known after the enclosing span has been
/// opened. Without an active span this is equivalent to [`scope`].
pub fn scope_with_span_update(attributes: Vec<KeyValue>) -> ContextGuard {
    let cx = Context::current();

    if cx.has_active_span() {
        let span = cx.span();
        for attribute in &attributes {
            span.set_attribute(attribute.clone());
        }
    }

    scope(attributes)
}

/// Returns the fully resolved, flattened attribute set of the current execution
pub fn current() -> Vec<KeyValue> {
    resolve(&Context::current(), &[])
}

/// Reads a single key from the current ambient attribute set
pub fn get(key: &Key) -> Option<Value> {
    Context::current()
        .get::<AmbientAttributes>()
        .and_then(|ambient| ambient.0.get(key).cloned())
}

/// Returns `cx` with `attributes` merged over its ambient attribute set
pub(crate) fn extend(cx: &Context, attributes: Vec<KeyValue>) -> Context {
    let mut merged = ambient_map(cx);

    for attribute in attributes {
        merged.insert(attribute.key, attribute.value);
    }

    cx.with_value(AmbientAttributes(Arc::new(merged)))
}

/// Flattens the ambient attributes of `cx` merged with `extra`, explicit keys winning
pub(crate) fn resolve(cx: &Context, extra: &[KeyValue]) -> Vec<KeyValue> {
    let mut merged = ambient_map(cx);

    for attribute in extra {
        merged.insert(attribute.key.clone(), attribute.value.clone());
    }

    merged
        .into_iter()
        .map(|(key, value)| KeyValue::new(key, value))
        .collect()
}

fn ambient_map(cx: &Context) -> HashMap<Key, Value> {
    match cx.get::<AmbientAttributes>() {
        Some(ambient) => (*ambient.0).clone(),
        None => HashMap::new(),
    }
}
