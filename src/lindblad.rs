//! Temperature-scaled amplitude and phase damping.
//!
//! Rates scale linearly with each register's local temperature:
//! `rate = base × T / T_ref`. Dissipation always runs after the unitary
//! part of a step and moves states towards north, so without a drive the
//! coherence `2|ρ01|` of every register never grows. Purity is not monotone:
//! relaxing a mixed state towards the pure north pole raises it.

use crate::config::EngineConfig;
use crate::core::errors::StateError;
use crate::core::{BlochState, DensityComponent};
use crate::types::RegisterId;

/// Local temperature lookup owned by the environment.
pub trait TemperatureField {
    /// Temperature of `register` in Kelvin.
    fn kelvin(&self, register: RegisterId) -> f64;
}

impl<F> TemperatureField for F
where
    F: Fn(RegisterId) -> f64,
{
    fn kelvin(&self, register: RegisterId) -> f64 {
        self(register)
    }
}

/// The same temperature everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformTemperature(pub f64);

impl TemperatureField for UniformTemperature {
    fn kelvin(&self, _register: RegisterId) -> f64 {
        self.0
    }
}

/// T1 (amplitude) and T2 (dephasing) rates in 1/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DissipationRates {
    pub t1: f64,
    pub t2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LindbladEvolver {
    t1_base_rate: f64,
    t2_base_rate: f64,
    reference_temperature: f64,
}

impl LindbladEvolver {
    pub fn new(t1_base_rate: f64, t2_base_rate: f64, reference_temperature: f64) -> Self {
        Self {
            t1_base_rate,
            t2_base_rate,
            reference_temperature,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.t1_base_rate,
            config.t2_base_rate,
            config.reference_temperature,
        )
    }

    /// Rates at `kelvin`. Negative temperatures count as absolute zero and
    /// non-finite ones as the reference temperature.
    pub fn rates_at(&self, kelvin: f64) -> DissipationRates {
        let kelvin = if kelvin.is_finite() {
            kelvin.max(0.0)
        } else {
            tracing::warn!(kelvin, "non-finite temperature, using reference");
            self.reference_temperature
        };
        let scale = kelvin / self.reference_temperature;
        DissipationRates {
            t1: self.t1_base_rate * scale,
            t2: self.t2_base_rate * scale,
        }
    }

    pub fn apply_to_bloch(&self, state: &mut BlochState, kelvin: f64, dt: f64) -> Result<(), StateError> {
        let rates = self.rates_at(kelvin);
        if rates.t1 == 0.0 && rates.t2 == 0.0 {
            return Ok(());
        }
        state.apply_dissipation(rates.t1, rates.t2, dt)
    }

    /// Damps every member of `component`; `kelvins[i]` is the temperature of
    /// qubit `i`.
    pub fn apply_to_component(
        &self,
        component: &mut DensityComponent,
        kelvins: &[f64],
        dt: f64,
    ) -> Result<(), StateError> {
        if kelvins.len() != component.num_qubits() {
            return Err(StateError::DimensionMismatch {
                expected: component.num_qubits(),
                got_rows: kelvins.len(),
                got_cols: 0,
            });
        }
        for (position, &kelvin) in kelvins.iter().enumerate() {
            let rates = self.rates_at(kelvin);
            if rates.t1 == 0.0 && rates.t2 == 0.0 {
                continue;
            }
            component.apply_dissipation(position, rates.t1, rates.t2, dt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pole;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn rates_scale_linearly_with_temperature() {
        let evolver = LindbladEvolver::new(0.2, 0.4, 300.0);
        let cold = evolver.rates_at(150.0);
        let hot = evolver.rates_at(600.0);
        assert!((cold.t1 - 0.1).abs() < 1e-15);
        assert!((cold.t2 - 0.2).abs() < 1e-15);
        assert!((hot.t1 - 0.4).abs() < 1e-15);
        assert_eq!(evolver.rates_at(-5.0), DissipationRates::default());
    }

    #[test]
    fn absolute_zero_freezes_state() {
        let evolver = LindbladEvolver::new(1.0, 1.0, 300.0);
        let mut state = BlochState::new(FRAC_PI_2, 0.0).unwrap();
        evolver.apply_to_bloch(&mut state, 0.0, 10.0).unwrap();
        assert!((state.coherence() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hotter_registers_lose_coherence_faster() {
        let evolver = LindbladEvolver::new(0.1, 0.5, 300.0);
        let mut cold = BlochState::new(FRAC_PI_2, 0.0).unwrap();
        let mut hot = cold;
        evolver.apply_to_bloch(&mut cold, 100.0, 1.0).unwrap();
        evolver.apply_to_bloch(&mut hot, 900.0, 1.0).unwrap();
        assert!(hot.coherence() < cold.coherence());
        assert!(hot.probability(Pole::North) > cold.probability(Pole::North));
    }

    #[test]
    fn closures_act_as_temperature_fields() {
        let field = |r: RegisterId| if r.0 == 1 { 10.0 } else { 20.0 };
        assert_eq!(field.kelvin(RegisterId(1)), 10.0);
        assert_eq!(UniformTemperature(4.0).kelvin(RegisterId(1)), 4.0);
    }
}
