//! Process-wide record of the last cluster verdict.
//!
//! The monitor loop is the only writer; readiness endpoints and any other
//! observer read concurrently. Status and missing-broker count are always
//! written together so readers never see a mix of two ticks.

pub mod health;

pub use health::{HealthSnapshot, HealthState};
