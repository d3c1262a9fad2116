use crate::core::errors::GateError;
use crate::core::utils;
use crate::hamiltonian::PauliVector;
use ndarray::{Array2, arr2};
use num_complex::Complex64;

/// Represents a quantum gate.
///
/// A gate is defined by its unitary matrix and the number of qubits it acts on.
#[derive(Clone, Debug)]
pub struct Gate {
    /// The unitary matrix of the gate.
    pub matrix: Array2<Complex64>,
    /// The number of qubits the gate acts on.
    pub num_qubits: usize,
}

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

impl Gate {
    /// Creates a new `Gate` from a unitary matrix.
    ///
    /// # Errors
    ///
    /// Returns a `GateError` if:
    /// - The matrix is not square.
    /// - The matrix dimensions are not a power of 2.
    /// - The matrix is not unitary.
    pub fn new(matrix: Array2<Complex64>) -> Result<Self, GateError> {
        let (rows, cols) = matrix.dim();

        if rows != cols {
            return Err(GateError::NotSquareMatrix);
        }

        if !rows.is_power_of_two() {
            return Err(GateError::InvalidDimensions);
        }

        if !Self::check_unitary(&matrix) {
            return Err(GateError::NonUnitary);
        }

        let num_qubits = rows.trailing_zeros() as usize;

        Ok(Self { matrix, num_qubits })
    }

    /// Builds a single-qubit gate from a matrix known to be unitary.
    fn single(matrix: Array2<Complex64>) -> Gate {
        Gate {
            matrix,
            num_qubits: 1,
        }
    }

    /// Checks if a given matrix is unitary
    fn check_unitary(matrix: &Array2<Complex64>) -> bool {
        let (rows, _) = matrix.dim();
        let eye = Array2::<Complex64>::eye(rows);

        let product = matrix.dot(&utils::dagger(matrix));

        product
            .iter()
            .zip(eye.iter())
            .all(|(a, b)| (*a - *b).norm() < 1e-6)
    }

    /// Expands a gate to act on a larger system of qubits.
    ///
    /// The result applies `gate` to `targets` when every qubit in `controls`
    /// is south (|1⟩), and identity otherwise.
    ///
    /// # Errors
    ///
    /// Returns `GateError` if:
    /// - Duplicate indices are found in `targets` or `controls`.
    /// - A qubit is used as both control and target.
    /// - The number of targets does not match the gate width.
    pub fn expand_gate(
        num_total_qubits: usize,
        gate: &Gate,
        targets: &[usize],
        controls: &[usize],
    ) -> Result<Gate, GateError> {
        if targets.len() != gate.num_qubits {
            return Err(GateError::InvalidDimensions);
        }

        if let Some(dup) = utils::find_duplicate(targets) {
            return Err(GateError::DuplicateQubit(dup));
        }

        if let Some(dup) = utils::find_duplicate(controls) {
            return Err(GateError::DuplicateQubit(dup));
        }

        for &c in controls {
            if targets.contains(&c) {
                return Err(GateError::ControlTargetOverlap(c));
            }
        }

        if targets.iter().chain(controls).any(|&q| q >= num_total_qubits) {
            return Err(GateError::InvalidDimensions);
        }

        Ok(Gate {
            matrix: utils::expand_operator(num_total_qubits, &gate.matrix, targets, controls),
            num_qubits: num_total_qubits,
        })
    }

    // --- Standard Gates ---

    /// Creates an Identity gate.
    pub fn i() -> Gate {
        Gate::single(arr2(&[[ONE, ZERO], [ZERO, ONE]]))
    }

    /// Creates a Pauli-X gate (NOT gate).
    pub fn x() -> Gate {
        Gate::single(arr2(&[[ZERO, ONE], [ONE, ZERO]]))
    }

    /// Creates a Pauli-Y gate.
    pub fn y() -> Gate {
        Gate::single(arr2(&[
            [ZERO, Complex64::new(0.0, -1.0)],
            [Complex64::new(0.0, 1.0), ZERO],
        ]))
    }

    /// Creates a Pauli-Z gate.
    pub fn z() -> Gate {
        Gate::single(arr2(&[[ONE, ZERO], [ZERO, -ONE]]))
    }

    /// Creates a Hadamard gate.
    pub fn h() -> Gate {
        let f = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        Gate::single(arr2(&[[f, f], [f, -f]]))
    }

    /// Creates a CNOT (Controlled-NOT) gate, control on qubit 0.
    pub fn cnot() -> Gate {
        Gate {
            matrix: utils::expand_operator(2, &Gate::x().matrix, &[1], &[0]),
            num_qubits: 2,
        }
    }

    /// Creates a controlled-Z gate.
    pub fn cz() -> Gate {
        Gate {
            matrix: utils::expand_operator(2, &Gate::z().matrix, &[1], &[0]),
            num_qubits: 2,
        }
    }

    /// Closed-form propagator of the local Hamiltonian `h·σ` over `dt`:
    ///
    /// $e^{-i\,dt\,h\cdot\sigma} = \cos(|h|dt)\,I - i\sin(|h|dt)\,\hat h\cdot\sigma$
    pub fn pauli_rotation(h: &PauliVector, dt: f64) -> Gate {
        let norm = h.norm();
        if norm * dt.abs() < 1e-300 {
            return Gate::i();
        }
        let (s, c) = (norm * dt).sin_cos();
        let (nx, ny, nz) = (h.x / norm, h.y / norm, h.z / norm);

        // -i sin * (nx X + ny Y + nz Z)
        let m00 = Complex64::new(c, -s * nz);
        let m11 = Complex64::new(c, s * nz);
        let m01 = Complex64::new(-s * ny, -s * nx);
        let m10 = Complex64::new(s * ny, -s * nx);

        Gate::single(arr2(&[[m00, m01], [m10, m11]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_gates_are_unitary() {
        for gate in [Gate::i(), Gate::x(), Gate::y(), Gate::z(), Gate::h(), Gate::cnot(), Gate::cz()] {
            assert!(Gate::new(gate.matrix.clone()).is_ok());
        }
    }

    #[test]
    fn pauli_rotation_is_unitary_and_matches_x_at_half_turn() {
        let h = PauliVector::new(0.3, -1.1, 0.7);
        let gate = Gate::pauli_rotation(&h, 0.37);
        assert!(Gate::new(gate.matrix.clone()).is_ok());

        // exp(-i pi/2 X) = -i X
        let flip = Gate::pauli_rotation(&PauliVector::new(1.0, 0.0, 0.0), std::f64::consts::FRAC_PI_2);
        assert!(flip.matrix[[0, 0]].norm() < 1e-12);
        assert!((flip.matrix[[0, 1]] - Complex64::new(0.0, -1.0)).norm() < 1e-12);
    }

    #[test]
    fn expand_rejects_overlap_and_out_of_range() {
        assert!(matches!(
            Gate::expand_gate(2, &Gate::x(), &[0], &[0]),
            Err(GateError::ControlTargetOverlap(0))
        ));
        assert!(matches!(
            Gate::expand_gate(2, &Gate::x(), &[2], &[]),
            Err(GateError::InvalidDimensions)
        ));
    }
}
