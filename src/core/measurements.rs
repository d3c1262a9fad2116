use crate::core::errors::MeasurementError;
use crate::core::utils;
use crate::types::Pole;
use ndarray::{Array1, Array2, array};
use num_complex::Complex64;
use rand::Rng;

/// Projective single-register measurement.
#[derive(Clone, Debug)]
pub struct Measurement {
    /// List of measurement operators
    pub operators: Vec<Array2<Complex64>>,
    /// Pole reported for each operator
    pub outcomes: Vec<Pole>,
    /// Number of qubits the measurement acts on
    pub num_qubits: usize,
}

impl Measurement {
    pub fn new(
        operators: Vec<Array2<Complex64>>,
        outcomes: Vec<Pole>,
    ) -> Result<Self, MeasurementError> {
        if operators.len() != outcomes.len() {
            return Err(MeasurementError::CountMismatch {
                ops: operators.len(),
                vals: outcomes.len(),
            });
        }

        if operators.is_empty() {
            return Err(MeasurementError::InvalidDimensions);
        }

        let (rows, cols) = operators[0].dim();
        if rows != cols || !rows.is_power_of_two() {
            return Err(MeasurementError::InvalidDimensions);
        }
        // log_2 as rows is power of two
        let num_qubits = rows.trailing_zeros() as usize;

        for op in &operators {
            if op.dim() != (rows, cols) {
                return Err(MeasurementError::InvalidDimensions);
            }
        }

        if !utils::check_completeness(&operators, rows) {
            return Err(MeasurementError::NotComplete);
        }

        Ok(Self {
            operators,
            outcomes,
            num_qubits,
        })
    }

    /// Expands the measurement operators to a larger system
    pub fn get_expanded_operators(
        &self,
        num_total_qubits: usize,
        targets: &[usize],
    ) -> Result<Vec<Array2<Complex64>>, MeasurementError> {
        if targets.len() != self.num_qubits || targets.iter().any(|&t| t >= num_total_qubits) {
            return Err(MeasurementError::InvalidDimensions);
        }

        Ok(self
            .operators
            .iter()
            .map(|op| utils::expand_operator(num_total_qubits, op, targets, &[]))
            .collect())
    }

    /// Operator for a given pole, if this measurement reports it
    pub fn operator_for(&self, pole: Pole) -> Option<&Array2<Complex64>> {
        self.outcomes
            .iter()
            .position(|&p| p == pole)
            .map(|i| &self.operators[i])
    }

    /// Pole basis (computational) -> {|north>, |south>}.
    pub fn pole_basis() -> Measurement {
        let north: Array1<Complex64> = array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        let south: Array1<Complex64> = array![Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)];

        Measurement {
            operators: vec![
                utils::outer_product(&north, &north),
                utils::outer_product(&south, &south),
            ],
            outcomes: vec![Pole::North, Pole::South],
            num_qubits: 1,
        }
    }
}

/// Randomly selects an outcome index weighted by `probs`
pub(crate) fn pick_outcome<R: Rng + ?Sized>(rng: &mut R, probs: &[f64]) -> usize {
    let roll: f64 = rng.random();

    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p;
        if roll < cumulative {
            return i;
        }
    }
    // Float rounding left the roll above the last cumulative bound
    probs
        .iter()
        .rposition(|&p| p > 0.0)
        .unwrap_or(probs.len().saturating_sub(1))
}

/// Draws north with probability `p_north`.
pub(crate) fn sample_pole<R: Rng + ?Sized>(rng: &mut R, p_north: f64) -> Pole {
    let p = p_north.clamp(0.0, 1.0);
    Pole::from_index(pick_outcome(rng, &[p, 1.0 - p]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn pole_basis_is_complete() {
        let m = Measurement::pole_basis();
        assert!(Measurement::new(m.operators.clone(), m.outcomes.clone()).is_ok());
        assert!(m.operator_for(Pole::South).is_some());
    }

    #[test]
    fn mismatched_outcomes_are_rejected() {
        let m = Measurement::pole_basis();
        assert!(matches!(
            Measurement::new(m.operators, vec![Pole::North]),
            Err(MeasurementError::CountMismatch { ops: 2, vals: 1 })
        ));
    }

    #[test]
    fn certain_outcomes_never_flip() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert_eq!(sample_pole(&mut rng, 1.0), Pole::North);
            assert_eq!(sample_pole(&mut rng, 0.0), Pole::South);
        }
    }
}
