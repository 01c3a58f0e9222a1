use structopt::StructOpt;

/// Options shared by every pipeline binary that embeds this crate
#[derive(Debug, StructOpt)]
pub struct SharedOptions {
    /// Redis database server URL
    #[structopt(
        short,
        long,
        global = true,
        env,
        default_value = "redis://localhost/",
        value_name = "url"
    )]
    pub redis: String,

    /// Log level, scopable to different modules
    ///
    /// Levels: trace, debug, info, warn, error
    #[structopt(
        short,
        long,
        global = true,
        default_value = "info",
        env = "RUST_LOG",
        value_name = "level"
    )]
    pub log: String,

    /// OpenTelemetry collector endpoint
    ///
    /// Omitting it disables tracing. Authentication towards the
    /// observability backend is the collector's concern.
    #[structopt(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub trace_endpoint: Option<String>,
}
