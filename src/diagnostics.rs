//! Corruption reports raised when a component drifts out of the physical
//! state space and has to be repaired.

use crate::core::errors::StateError;
use crate::types::{ComponentId, RegisterId};
use serde::Serialize;
use std::fmt;

/// What was wrong with a density matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionKind {
    NonFinite,
    NotHermitian,
    InvalidTrace,
    NegativeEigenvalue,
    Other,
}

impl CorruptionKind {
    /// Classifies a failed physicality check, returning the offending
    /// magnitude alongside.
    pub fn classify(err: &StateError) -> (Self, f64) {
        match err {
            StateError::NonFinite => (CorruptionKind::NonFinite, f64::NAN),
            StateError::NotHermitian(dev) => (CorruptionKind::NotHermitian, *dev),
            StateError::InvalidTrace(tr) => (CorruptionKind::InvalidTrace, (*tr - 1.0).norm()),
            StateError::NegativeEigenvalue(min) => (CorruptionKind::NegativeEigenvalue, *min),
            _ => (CorruptionKind::Other, f64::NAN),
        }
    }
}

impl fmt::Display for CorruptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CorruptionKind::NonFinite => "non-finite entries",
            CorruptionKind::NotHermitian => "not Hermitian",
            CorruptionKind::InvalidTrace => "trace drift",
            CorruptionKind::NegativeEigenvalue => "negative eigenvalue",
            CorruptionKind::Other => "invalid state",
        };
        f.write_str(s)
    }
}

/// One forced repair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorruptionReport {
    /// Tick counter at detection, starting at 1 for the first tick.
    pub tick: u64,
    pub component: ComponentId,
    pub registers: Vec<RegisterId>,
    pub kind: CorruptionKind,
    /// Hermitian deviation, trace error or most negative eigenvalue,
    /// depending on `kind`. NaN when not applicable.
    pub magnitude: f64,
    pub detail: String,
}

impl CorruptionReport {
    pub fn new(tick: u64, component: ComponentId, registers: Vec<RegisterId>, err: &StateError) -> Self {
        let (kind, magnitude) = CorruptionKind::classify(err);
        Self {
            tick,
            component,
            registers,
            kind,
            magnitude,
            detail: err.to_string(),
        }
    }
}

impl fmt::Display for CorruptionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick {}: component {} (", self.tick, self.component)?;
        for (i, r) in self.registers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{r}")?;
        }
        write!(f, ") {}: {}", self.kind, self.detail)
    }
}

/// Queue of reports waiting for the host to drain them.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticChannel {
    pending: Vec<CorruptionReport>,
}

impl DiagnosticChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `report` and logs it.
    pub fn publish(&mut self, report: CorruptionReport) {
        tracing::warn!(
            tick = report.tick,
            component = %report.component,
            kind = %report.kind,
            magnitude = report.magnitude,
            "component repaired after state corruption"
        );
        self.pending.push(report);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes every queued report, oldest first.
    pub fn drain(&mut self) -> Vec<CorruptionReport> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn reports_classify_state_errors() {
        let report = CorruptionReport::new(
            3,
            ComponentId(7),
            vec![RegisterId(1), RegisterId(2)],
            &StateError::InvalidTrace(Complex64::new(1.5, 0.0)),
        );
        assert_eq!(report.kind, CorruptionKind::InvalidTrace);
        assert!((report.magnitude - 0.5).abs() < 1e-12);
        let text = report.to_string();
        assert!(text.contains("c7"));
        assert!(text.contains("r1, r2"));
    }

    #[test]
    fn drain_empties_the_channel() {
        let mut channel = DiagnosticChannel::new();
        channel.publish(CorruptionReport::new(1, ComponentId(0), vec![], &StateError::NonFinite));
        channel.publish(CorruptionReport::new(
            2,
            ComponentId(0),
            vec![],
            &StateError::NegativeEigenvalue(-0.1),
        ));
        assert_eq!(channel.len(), 2);
        let drained = channel.drain();
        assert_eq!(drained[0].tick, 1);
        assert_eq!(drained[1].kind, CorruptionKind::NegativeEigenvalue);
        assert!(channel.is_empty());
    }
}
