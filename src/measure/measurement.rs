use crate::core::errors::StateError;
use crate::core::{BlochState, DensityComponent, sample_pole};
use crate::types::{Pole, RegisterId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Result of measuring one register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementOutcome {
    /// Register the caller asked to measure.
    pub register: RegisterId,
    pub outcome: Pole,
    /// Gameplay label of `outcome` on this register.
    pub label: String,
    /// Tr(ρ²) of the register's reduced state just before the measurement.
    pub purity_at_measurement: f64,
    /// Every register that collapsed, the measured one first.
    pub collapsed: Vec<(RegisterId, Pole)>,
}

impl MeasurementOutcome {
    /// Outcome of another register that collapsed along with this one.
    pub fn outcome_of(&self, register: RegisterId) -> Option<Pole> {
        self.collapsed
            .iter()
            .find(|(r, _)| *r == register)
            .map(|(_, p)| *p)
    }
}

/// Draws outcomes in the pole basis and collapses states.
///
/// Owns the only RNG in the engine, so a seeded engine replays the same
/// sequence of outcomes for the same sequence of calls.
#[derive(Debug, Clone)]
pub struct MeasurementEngine {
    rng: StdRng,
}

impl MeasurementEngine {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Samples a pole for an unentangled register and snaps it there.
    pub fn measure_bloch(&mut self, state: &mut BlochState) -> Pole {
        let pole = sample_pole(&mut self.rng, state.probability(Pole::North));
        state.collapse_to(pole);
        pole
    }

    /// Measures the member at `position`, then every other member in
    /// register order, leaving the component in a computational basis state.
    ///
    /// Outcomes are returned measured-register first. Each later draw is
    /// conditioned on the projections before it, so correlations carried by
    /// the joint state show up in the outcomes.
    ///
    /// Projections run on a copy that replaces `component` only once every
    /// member has collapsed; on error `component` is left as it was.
    pub fn measure_cascade(
        &mut self,
        component: &mut DensityComponent,
        position: usize,
    ) -> Result<Vec<(RegisterId, Pole)>, StateError> {
        let registers = component.registers().to_vec();
        let mut working = component.clone();
        let mut collapsed = Vec::with_capacity(registers.len());

        let first = working.measure(position, &mut self.rng)?;
        collapsed.push((registers[position], first));

        for (q, &register) in registers.iter().enumerate() {
            if q == position {
                continue;
            }
            let pole = working.measure(q, &mut self.rng)?;
            collapsed.push((register, pole));
        }
        *component = working;
        Ok(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entanglement::{BellType, ClusterMap, EntanglementOperator};
    use num_complex::Complex64;

    #[test]
    fn bloch_measurement_collapses_to_a_pole() {
        let mut engine = MeasurementEngine::new(Some(11));
        let mut state = BlochState::new(std::f64::consts::FRAC_PI_2, 0.3).unwrap();
        let pole = engine.measure_bloch(&mut state);
        assert_eq!(state.probability(pole), 1.0);
    }

    #[test]
    fn definite_states_always_give_the_same_pole() {
        let mut engine = MeasurementEngine::new(Some(5));
        for _ in 0..50 {
            let mut south = BlochState::south();
            assert_eq!(engine.measure_bloch(&mut south), Pole::South);
        }
    }

    #[test]
    fn cascade_reports_correlated_outcomes() {
        let op = EntanglementOperator::new(6);
        let mut engine = MeasurementEngine::new(Some(42));
        for _ in 0..20 {
            let mut comp = op.create_pair(RegisterId(0), RegisterId(1), BellType::PsiPlus).unwrap();
            op.extend_cluster(&mut comp, RegisterId(2), BlochState::north(), 0, ClusterMap::Ghz)
                .unwrap();
            let collapsed = engine.measure_cascade(&mut comp, 1).unwrap();
            assert_eq!(collapsed.len(), 3);
            assert_eq!(collapsed[0].0, RegisterId(1));
            let of = |r: u32| collapsed.iter().find(|(id, _)| id.0 == r).unwrap().1;
            assert_eq!(of(0).opposite(), of(1));
            assert_eq!(of(0), of(2));
            assert!(comp.check_physical(1e-9).is_ok());
        }
    }

    #[test]
    fn failed_cascade_leaves_the_component_untouched() {
        let op = EntanglementOperator::new(6);
        let mut comp = op.create_pair(RegisterId(0), RegisterId(1), BellType::PhiPlus).unwrap();
        // Off-diagonal entries that overflow once the first projection
        // renormalizes, so the second member has no readable outcome.
        for ((i, j), value) in comp.density_matrix_mut().indexed_iter_mut() {
            *value = if i == j {
                Complex64::new(0.25, 0.0)
            } else {
                Complex64::new(1e308, 0.0)
            };
        }
        let before = comp.density_matrix().clone();

        let mut engine = MeasurementEngine::new(Some(3));
        assert!(engine.measure_cascade(&mut comp, 0).is_err());
        assert_eq!(comp.density_matrix(), &before);
        assert_eq!(comp.registers(), &[RegisterId(0), RegisterId(1)]);
    }

    #[test]
    fn seeded_engines_replay_outcomes() {
        let draw = |seed| {
            let mut engine = MeasurementEngine::new(Some(seed));
            (0..32)
                .map(|_| engine.measure_bloch(&mut BlochState::new(1.0, 0.0).unwrap()))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(9), draw(9));
    }
}
