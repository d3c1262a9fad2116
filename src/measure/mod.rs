//! Sampling and cascading collapse.

mod measurement;

pub use measurement::{MeasurementEngine, MeasurementOutcome};
