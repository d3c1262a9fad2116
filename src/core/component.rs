use crate::core::Gate;
use crate::core::bloch::BlochState;
use crate::core::channels::{QuantumChannel, sum_kraus};
use crate::core::errors::{MeasurementError, StateError};
use crate::core::measurements::{Measurement, pick_outcome};
use crate::core::utils::{self, trace};
use crate::hamiltonian::PauliVector;
use crate::types::{Pole, RegisterId};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::Rng;

/// Joint density matrix of a group of entangled registers.
///
/// Register `registers[i]` is qubit `i`, i.e. bit `i` of the basis index.
/// Member registers have no Bloch state of their own while the component
/// exists; [`marginal`](Self::marginal) computes one on demand.
#[derive(Clone, Debug)]
pub struct DensityComponent {
    registers: Vec<RegisterId>,
    density_matrix: Array2<Complex64>,
    num_qubits: usize,
}

impl DensityComponent {
    /// Product state of the given registers, first entry on qubit 0.
    pub fn from_bloch_states(members: &[(RegisterId, BlochState)]) -> Result<Self, StateError> {
        let Some(((first_id, first), rest)) = members.split_first() else {
            return Err(StateError::InvalidDimensions);
        };
        let mut component = Self {
            registers: vec![*first_id],
            density_matrix: first.to_density_matrix(),
            num_qubits: 1,
        };
        for (id, state) in rest {
            component.tensor_with(*id, state);
        }
        Ok(component)
    }

    /// Validates that the input vector is a valid pure state.
    fn check_vector_state(vector: &Array1<Complex64>) -> Result<(), StateError> {
        let dim = vector.len();

        if !dim.is_power_of_two() || dim < 2 {
            return Err(StateError::InvalidDimensions);
        }

        let norm_sqr: f64 = vector.iter().map(|c| c.norm_sqr()).sum();
        if (norm_sqr - 1.0).abs() > 1e-12 {
            return Err(StateError::NotNormalized(norm_sqr));
        }

        Ok(())
    }

    /// Checks shape and trace of a density matrix
    fn check_density_matrix(matrix: &Array2<Complex64>, num_registers: usize) -> Result<(), StateError> {
        let (rows, cols) = matrix.dim();
        let expected = 1 << num_registers;

        if rows != expected || cols != expected {
            return Err(StateError::DimensionMismatch {
                expected,
                got_rows: rows,
                got_cols: cols,
            });
        }

        let tr = trace(matrix);
        if (tr - Complex64::new(1.0, 0.0)).norm() > 1e-9 {
            return Err(StateError::InvalidTrace(tr));
        }

        Ok(())
    }

    /// Component in the pure state `vector`.
    pub fn from_state_vector(registers: Vec<RegisterId>, vector: Array1<Complex64>) -> Result<Self, StateError> {
        Self::check_vector_state(&vector)?;

        let num_qubits = vector.len().trailing_zeros() as usize;
        if registers.len() != num_qubits {
            return Err(StateError::InvalidDimensions);
        }

        // rho = |psi><psi|
        let matrix = utils::outer_product(&vector, &vector);

        Ok(Self {
            registers,
            density_matrix: matrix,
            num_qubits,
        })
    }

    /// Component holding an arbitrary density matrix of matching size.
    pub fn from_density_matrix(registers: Vec<RegisterId>, matrix: Array2<Complex64>) -> Result<Self, StateError> {
        Self::check_density_matrix(&matrix, registers.len())?;
        let num_qubits = registers.len();

        Ok(Self {
            registers,
            density_matrix: matrix,
            num_qubits,
        })
    }

    pub fn registers(&self) -> &[RegisterId] {
        &self.registers
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn density_matrix(&self) -> &Array2<Complex64> {
        &self.density_matrix
    }

    #[cfg(test)]
    pub(crate) fn density_matrix_mut(&mut self) -> &mut Array2<Complex64> {
        &mut self.density_matrix
    }

    pub fn contains(&self, register: RegisterId) -> bool {
        self.registers.contains(&register)
    }

    /// Qubit index of `register` inside this component.
    pub fn position_of(&self, register: RegisterId) -> Option<usize> {
        self.registers.iter().position(|&r| r == register)
    }

    /// Checks if a given index is within the component's range
    fn validate_qubit_index(&self, index: usize) -> Result<(), StateError> {
        if index >= self.num_qubits {
            return Err(StateError::IndexOutOfBounds {
                index,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    /// Apply already extended operator to the whole component
    fn apply_operator(&mut self, u: &Array2<Complex64>) -> Result<(), StateError> {
        let (rows, cols) = u.dim();
        let dim = 1 << self.num_qubits;

        if rows != dim || cols != dim {
            return Err(StateError::DimensionMismatch {
                expected: dim,
                got_rows: rows,
                got_cols: cols,
            });
        }

        self.density_matrix = u.dot(&self.density_matrix).dot(&utils::dagger(u));

        Ok(())
    }

    /// Applies non controlled quantum gate
    pub fn apply(&mut self, gate: &Gate, target_qubits: &[usize]) -> Result<(), StateError> {
        self.apply_controlled(gate, target_qubits, None)
    }

    /// Applies generic quantum gate
    pub fn apply_controlled(
        &mut self,
        gate: &Gate,
        target_qubits: &[usize],
        control_qubits: Option<&[usize]>,
    ) -> Result<(), StateError> {
        if gate.num_qubits != target_qubits.len() {
            return Err(StateError::DimensionMismatch {
                expected: gate.num_qubits,
                got_rows: target_qubits.len(),
                got_cols: 0,
            });
        }

        for &q in target_qubits {
            self.validate_qubit_index(q)?;
        }

        let controls = control_qubits.unwrap_or(&[]);
        for &q in controls {
            self.validate_qubit_index(q)?;
        }

        let full_gate_operator = Gate::expand_gate(self.num_qubits, gate, target_qubits, controls)?;

        self.apply_operator(&full_gate_operator.matrix)
    }

    /// Evolves every member under its local operator `ops[i]` for `dt`.
    ///
    /// The local propagators commute, so the joint step is the exact tensor
    /// product $\bigotimes_i e^{-i\,dt\,h_i\cdot\sigma}$. The result is
    /// re-Hermitized and renormalized to unit trace.
    pub fn apply_unitary_rotation(&mut self, ops: &[PauliVector], dt: f64) -> Result<(), StateError> {
        if ops.len() != self.num_qubits {
            return Err(StateError::DimensionMismatch {
                expected: self.num_qubits,
                got_rows: ops.len(),
                got_cols: 0,
            });
        }
        if ops.iter().all(PauliVector::is_zero) {
            return Ok(());
        }

        // qubit 0 sits in the lowest bits, so fold from the top down
        let u = ops
            .iter()
            .rev()
            .map(|h| Gate::pauli_rotation(h, dt).matrix)
            .reduce(|acc, m| utils::kronecker_product(&acc, &m))
            .ok_or(StateError::InvalidDimensions)?;

        self.apply_operator(&u)?;
        self.stabilize();
        Ok(())
    }

    /// Amplitude damping and dephasing of one member for `dt`.
    pub fn apply_dissipation(&mut self, position: usize, t1_rate: f64, t2_rate: f64, dt: f64) -> Result<(), StateError> {
        let channel = QuantumChannel::thermal_relaxation(t1_rate, t2_rate, dt)?;
        self.apply_channel(&channel, &[position])?;
        self.stabilize();
        Ok(())
    }

    /// Apply QuantumChannel to the given members
    pub fn apply_channel(&mut self, channel: &QuantumChannel, target_qubits: &[usize]) -> Result<(), StateError> {
        for &q in target_qubits {
            self.validate_qubit_index(q)?;
        }
        let ops = channel.get_expanded_operators(self.num_qubits, target_qubits)?;
        self.density_matrix = sum_kraus(&ops, &self.density_matrix);
        Ok(())
    }

    /// Appends `register` in `state` as the new highest qubit.
    pub fn tensor_with(&mut self, register: RegisterId, state: &BlochState) {
        self.density_matrix = utils::kronecker_product(&state.to_density_matrix(), &self.density_matrix);
        self.registers.push(register);
        self.num_qubits += 1;
    }

    /// Re-Hermitizes and rescales to unit trace.
    pub fn stabilize(&mut self) {
        self.density_matrix = utils::hermitize(&self.density_matrix);
        let tr = trace(&self.density_matrix).re;
        if tr.is_finite() && tr.abs() > 1e-15 {
            self.density_matrix.mapv_inplace(|c| c / tr);
        }
    }

    /// Checks that the matrix is finite, Hermitian, unit-trace and positive
    /// semidefinite, each within `tol`.
    pub fn check_physical(&self, tol: f64) -> Result<(), StateError> {
        if !self.density_matrix.iter().all(|c| c.is_finite()) {
            return Err(StateError::NonFinite);
        }
        let deviation = utils::hermitian_deviation(&self.density_matrix);
        if deviation > tol {
            return Err(StateError::NotHermitian(deviation));
        }
        let tr = trace(&self.density_matrix);
        if (tr - Complex64::new(1.0, 0.0)).norm() > tol {
            return Err(StateError::InvalidTrace(tr));
        }
        let min = utils::min_eigenvalue(&self.density_matrix);
        if min < -tol {
            return Err(StateError::NegativeEigenvalue(min));
        }
        Ok(())
    }

    /// Replaces the matrix with the nearest valid density matrix.
    pub fn repair(&mut self) {
        let cleaned = self
            .density_matrix
            .mapv(|c| if c.is_finite() { c } else { Complex64::new(0.0, 0.0) });
        self.density_matrix = utils::nearest_density_matrix(&cleaned);
    }

    /// Reduced 2×2 state of the member at `position`.
    pub fn reduced_state(&self, position: usize) -> Result<Array2<Complex64>, StateError> {
        self.validate_qubit_index(position)?;
        Ok(utils::partial_trace(&self.density_matrix, self.num_qubits, &[position]))
    }

    /// Marginal Bloch state of the member at `position`.
    pub fn marginal(&self, position: usize) -> Result<BlochState, StateError> {
        BlochState::from_density_matrix(&self.reduced_state(position)?)
    }

    /// Marginals of every member, in register order.
    pub fn marginals(&self) -> Result<Vec<BlochState>, StateError> {
        (0..self.num_qubits).map(|q| self.marginal(q)).collect()
    }

    /// Tr(ρ²) of the whole component.
    pub fn purity(&self) -> f64 {
        utils::purity(&self.density_matrix)
    }

    /// I(A:B) = S(A) + S(B) − S(AB) in bits.
    pub fn mutual_information(&self, a: usize, b: usize) -> Result<f64, StateError> {
        self.validate_qubit_index(a)?;
        self.validate_qubit_index(b)?;
        if a == b {
            return Ok(utils::von_neumann_entropy(&self.reduced_state(a)?));
        }
        let s_a = utils::von_neumann_entropy(&self.reduced_state(a)?);
        let s_b = utils::von_neumann_entropy(&self.reduced_state(b)?);
        let s_ab = utils::von_neumann_entropy(&utils::partial_trace(
            &self.density_matrix,
            self.num_qubits,
            &[a, b],
        ));
        Ok((s_a + s_b - s_ab).max(0.0))
    }

    /// Largest entrywise distance between ρ and the product of its marginals.
    pub fn product_distance(&self) -> Result<f64, StateError> {
        let product = (0..self.num_qubits)
            .rev()
            .map(|q| self.reduced_state(q))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .reduce(|acc, m| utils::kronecker_product(&acc, &m))
            .ok_or(StateError::InvalidDimensions)?;
        Ok(self
            .density_matrix
            .iter()
            .zip(product.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max))
    }

    /// Outcome probabilities of `measurement` on one member, with the
    /// operators expanded to the whole component.
    pub fn set_measurement(
        &self,
        measurement: &Measurement,
        position: usize,
    ) -> Result<(Vec<f64>, Vec<Array2<Complex64>>), StateError> {
        self.validate_qubit_index(position)?;

        let expanded_ops = measurement.get_expanded_operators(self.num_qubits, &[position])?;

        let mut probs = Vec::with_capacity(expanded_ops.len());
        let mut sum_probs = 0.0;

        for op in &expanded_ops {
            let unnormalized_rho_prime = op.dot(&self.density_matrix).dot(&utils::dagger(op));
            let p_k = trace(&unnormalized_rho_prime).re.max(0.0);
            probs.push(p_k);
            sum_probs += p_k;
        }

        if !(sum_probs > 0.0) {
            return Err(StateError::InvalidTrace(Complex64::new(sum_probs, 0.0)));
        }
        for p in &mut probs {
            *p /= sum_probs;
        }

        Ok((probs, expanded_ops))
    }

    /// Probability that the member at `position` reads `pole`.
    pub fn marginal_probability(&self, position: usize, pole: Pole) -> Result<f64, StateError> {
        let reduced = self.reduced_state(position)?;
        let p = reduced[[pole.index(), pole.index()]].re / trace(&reduced).re;
        Ok(p.clamp(0.0, 1.0))
    }

    /// Projects the member at `position` onto `pole` and renormalizes:
    /// ρ' = P ρ P / Tr(P ρ P). Returns the probability of that outcome.
    pub fn project(&mut self, position: usize, pole: Pole) -> Result<f64, StateError> {
        let measurement = Measurement::pole_basis();
        let (probs, ops) = self.set_measurement(&measurement, position)?;
        let idx = pole.index();
        self.collapse(&ops[idx], probs[idx])?;
        Ok(probs[idx])
    }

    /// Physical measurement of one member in the pole basis. Changes the
    /// state irretrievably.
    pub fn measure<R: Rng + ?Sized>(&mut self, position: usize, rng: &mut R) -> Result<Pole, StateError> {
        let measurement = Measurement::pole_basis();
        let (probs, ops) = self.set_measurement(&measurement, position)?;

        let outcome_idx = pick_outcome(rng, &probs);
        self.collapse(&ops[outcome_idx], probs[outcome_idx])?;

        Ok(measurement.outcomes[outcome_idx])
    }

    // rho' = (M_k * rho * M_k†) / p_k
    fn collapse(&mut self, m_k: &Array2<Complex64>, p_selected: f64) -> Result<(), StateError> {
        if p_selected <= 1e-12 {
            return Err(MeasurementError::ImpossibleOutcome(p_selected).into());
        }
        let numerator = m_k.dot(&self.density_matrix).dot(&utils::dagger(m_k));
        self.density_matrix = numerator.mapv(|val| val / p_selected);
        self.stabilize();
        Ok(())
    }
}
