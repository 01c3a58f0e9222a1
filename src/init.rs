//! Global tracer setup and teardown

use std::time::Duration;

use opentelemetry::{
    global,
    sdk::{
        propagation::TraceContextPropagator,
        trace::{self, IdGenerator, Sampler},
        Resource,
    },
    trace::TraceError,
    KeyValue,
};
use opentelemetry_otlp::Protocol;
use opentelemetry_semantic_conventions as semcov;

use crate::constants;

/// Installs the global OTLP tracer for this process
///
/// With no endpoint the call is a no-op and every span becomes a cheap
/// non-recording placeholder, so pipeline code can stay instrumented
/// unconditionally. Sampling is always-on with raised span limits; the
/// per-unit traces of a pipeline are few and long-lived, and duration
/// events accumulate on them.
pub fn init<T>(
    endpoint: &Option<String>,
    service: T,
    instance_id: Option<T>,
) -> Result<(), TraceError>
where
    T: Into<String>,
{
    if let Some(endpoint) = endpoint {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let mut resource: Vec<KeyValue> = vec![
            semcov::resource::SERVICE_NAME.string(service.into()),
            semcov::resource::SERVICE_NAMESPACE.string(constants::service::NAMESPACE),
            semcov::resource::SERVICE_VERSION.string(env!("CARGO_PKG_VERSION")),
        ];

        if let Some(instance_id) = instance_id {
            resource.push(semcov::resource::SERVICE_INSTANCE_ID.string(instance_id.into()));
        }

        opentelemetry_otlp::new_pipeline()
            .with_endpoint(endpoint)
            .with_protocol(Protocol::Grpc)
            .with_timeout(Duration::from_secs(3))
            .with_trace_config(
                trace::config()
                    .with_sampler(Sampler::AlwaysOn)
                    .with_id_generator(IdGenerator::default())
                    .with_max_events_per_span(2048)
                    .with_max_attributes_per_span(128)
                    .with_resource(Resource::new(resource)),
            )
            .with_tonic()
            .install_batch(opentelemetry::runtime::Tokio)?;
    }

    Ok(())
}

/// Flushes pending spans and shuts the global tracer down
///
/// Call once at the end of the process; spans finished after this point
/// are lost.
pub fn shutdown() {
    global::shutdown_tracer_provider();
}
