//! Shared service names, span names and telemetry attribute keys

pub mod service {
    pub const NAMESPACE: &str = "Steptrace";
}

pub mod span {
    /// The top-level span; a default name for the first span in a trace
    pub const ROOT: &str = "trace-root";
}

pub mod trace {
    use opentelemetry::Key;

    /// Event classification, referenced by queries in the observability backend
    pub const EVENT_TYPE: Key = Key::from_static_str("type");

    /// The name field for a duration event ("name" is reserved for the actual event name)
    pub const DURATION_NAME: Key = Key::from_static_str("duration_name");

    /// The elapsed time value (in seconds) represented by a duration event
    pub const DURATION_SECONDS: Key = Key::from_static_str("duration_s");

    /// Identifier of the unit of work a span belongs to
    pub const UNIT_ID: Key = Key::from_static_str("pipeline.unit.id");

    /// Severity of a log record attached as an event
    pub const LOG_LEVEL: Key = Key::from_static_str("level");

    /// Name of the logger that produced an attached log record
    pub const LOG_TARGET: Key = Key::from_static_str("logger.name");

    /// Module path of the code that produced an attached log record
    pub const CODE_NAMESPACE: Key = Key::from_static_str("code.namespace");

    /// Source file of the code that produced an attached log record
    pub const CODE_FILEPATH: Key = Key::from_static_str("code.filepath");

    /// Source line of the code that produced an attached log record
    pub const CODE_LINENO: Key = Key::from_static_str("code.lineno");

    /// Marks an event that carried an error-level log record
    pub const ERROR: Key = Key::from_static_str("error");

    /// [`EVENT_TYPE`] value used by duration events
    pub const EVENT_TYPE_DURATION: &str = "duration";

    /// [`EVENT_TYPE`] value used by attached log records
    pub const EVENT_TYPE_LOG: &str = "log_message";
}
