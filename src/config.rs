//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Hard ceiling on component size.
pub const MAX_SUPPORTED_CLUSTER: usize = 10;

/// Tunables for a [`QuantumEngine`](crate::QuantumEngine).
///
/// Missing fields fall back to [`EngineConfig::default`] when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of live registers.
    pub capacity: usize,
    /// Largest allowed component.
    pub max_cluster_size: usize,
    /// Amplitude damping rate (1/s) at the reference temperature.
    pub t1_base_rate: f64,
    /// Dephasing rate (1/s) at the reference temperature.
    pub t2_base_rate: f64,
    /// Temperature (K) at which the base rates apply.
    pub reference_temperature: f64,
    /// Longest single integration step; longer ticks are subcycled.
    pub max_substep: f64,
    /// Most substeps one tick may take. Ticks that would need more use
    /// proportionally longer steps.
    pub max_substeps: usize,
    /// Tolerance for Hermiticity, trace and eigenvalue checks.
    pub tolerance: f64,
    /// Components closer than this to the product of their marginals are
    /// factored back into Bloch states after a tick. 0 keeps every component
    /// until it is measured.
    pub dissolve_tolerance: f64,
    /// Seed for the measurement RNG. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            max_cluster_size: 6,
            t1_base_rate: 0.05,
            t2_base_rate: 0.1,
            reference_temperature: 300.0,
            max_substep: 0.1,
            max_substeps: 1000,
            tolerance: 1e-9,
            dissolve_tolerance: 0.0,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_cluster_size(mut self, size: usize) -> Self {
        self.max_cluster_size = size;
        self
    }

    /// Sets the T1/T2 base rates (1/s).
    pub fn with_rates(mut self, t1_base_rate: f64, t2_base_rate: f64) -> Self {
        self.t1_base_rate = t1_base_rate;
        self.t2_base_rate = t2_base_rate;
        self
    }

    pub fn with_reference_temperature(mut self, kelvin: f64) -> Self {
        self.reference_temperature = kelvin;
        self
    }

    pub fn with_max_substep(mut self, max_substep: f64) -> Self {
        self.max_substep = max_substep;
        self
    }

    pub fn with_max_substeps(mut self, max_substeps: usize) -> Self {
        self.max_substeps = max_substeps;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_dissolve_tolerance(mut self, tolerance: f64) -> Self {
        self.dissolve_tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Copy with every field forced into a usable range.
    pub(crate) fn sanitized(&self) -> Self {
        let non_negative = |v: f64, fallback: f64| if v.is_finite() && v >= 0.0 { v } else { fallback };
        let defaults = Self::default();
        Self {
            capacity: self.capacity,
            max_cluster_size: self.max_cluster_size.clamp(2, MAX_SUPPORTED_CLUSTER),
            t1_base_rate: non_negative(self.t1_base_rate, defaults.t1_base_rate),
            t2_base_rate: non_negative(self.t2_base_rate, defaults.t2_base_rate),
            reference_temperature: if self.reference_temperature.is_finite() && self.reference_temperature > 0.0 {
                self.reference_temperature
            } else {
                defaults.reference_temperature
            },
            max_substep: if self.max_substep.is_finite() && self.max_substep > 0.0 {
                self.max_substep
            } else {
                defaults.max_substep
            },
            max_substeps: self.max_substeps.max(1),
            tolerance: non_negative(self.tolerance, defaults.tolerance),
            dissolve_tolerance: non_negative(self.dissolve_tolerance, defaults.dissolve_tolerance),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = EngineConfig::new().with_capacity(8).with_rates(1.0, 2.0).with_seed(3);
        assert_eq!(cfg.capacity, 8);
        assert_eq!(cfg.t1_base_rate, 1.0);
        assert_eq!(cfg.t2_base_rate, 2.0);
        assert_eq!(cfg.seed, Some(3));
        assert_eq!(cfg.max_cluster_size, 6);
        assert_eq!(cfg.max_substeps, 1000);
        assert_eq!(cfg.with_max_substeps(16).max_substeps, 16);
    }

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let cfg = EngineConfig::new()
            .with_max_cluster_size(40)
            .with_rates(-1.0, f64::NAN)
            .with_reference_temperature(0.0)
            .with_max_substep(0.0)
            .with_max_substeps(0)
            .sanitized();
        assert_eq!(cfg.max_cluster_size, MAX_SUPPORTED_CLUSTER);
        assert_eq!(cfg.t1_base_rate, 0.05);
        assert_eq!(cfg.t2_base_rate, 0.1);
        assert_eq!(cfg.reference_temperature, 300.0);
        assert_eq!(cfg.max_substep, 0.1);
        assert_eq!(cfg.max_substeps, 1);
    }
}
