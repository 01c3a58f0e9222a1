//! Metadata store keys
//!
//! This module contains the functions generating keys for the records this
//! crate stores in the orchestration engine's metadata database, organised
//! by component.

pub mod unit {
    fn unit_prefix(unit_id: &str) -> String {
        format!("unit:{}", unit_id)
    }

    pub mod telemetry {
        use super::unit_prefix;

        /// Hash holding the published trace context of a completed unit of work
        pub fn context(unit_id: &str) -> String {
            format!("{}:telemetry.context", unit_prefix(unit_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_keys_are_namespaced() {
        assert_eq!(unit::telemetry::context("ingest"), "unit:ingest:telemetry.context");
    }
}
