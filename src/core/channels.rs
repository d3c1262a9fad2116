use crate::core::errors::ChannelError;
use crate::core::utils;
use ndarray::{Array2, array};
use num_complex::Complex64;

/// Completely positive, trace-preserving map given by its Kraus operators.
#[derive(Clone, Debug)]
pub struct QuantumChannel {
    pub kraus_ops: Vec<Array2<Complex64>>,
    pub num_qubits: usize,
}

impl QuantumChannel {
    pub fn new(kraus_ops: Vec<Array2<Complex64>>) -> Result<Self, ChannelError> {
        if kraus_ops.is_empty() {
            return Err(ChannelError::Empty);
        }

        let (rows, cols) = kraus_ops[0].dim();

        if rows != cols || !rows.is_power_of_two() {
            return Err(ChannelError::InvalidDimensions);
        }

        // log_2
        let num_qubits = rows.trailing_zeros() as usize;

        for op in &kraus_ops {
            if op.dim() != (rows, cols) {
                return Err(ChannelError::OperatorSizeMismatch);
            }
        }

        if !utils::check_completeness(&kraus_ops, rows) {
            return Err(ChannelError::NotComplete);
        }

        Ok(Self {
            kraus_ops,
            num_qubits,
        })
    }

    /// Expands the Kraus operators to act on `targets` of a larger system
    pub fn get_expanded_operators(
        &self,
        num_total_qubits: usize,
        targets: &[usize],
    ) -> Result<Vec<Array2<Complex64>>, ChannelError> {
        if targets.len() != self.num_qubits || targets.iter().any(|&t| t >= num_total_qubits) {
            return Err(ChannelError::InvalidDimensions);
        }

        Ok(self
            .kraus_ops
            .iter()
            .map(|op| utils::expand_operator(num_total_qubits, op, targets, &[]))
            .collect())
    }

    /// Applies the channel to a matrix of its own width: $\sum_k K_k \rho K_k^\dagger$
    pub fn apply(&self, rho: &Array2<Complex64>) -> Result<Array2<Complex64>, ChannelError> {
        let dim = 1 << self.num_qubits;
        if rho.dim() != (dim, dim) {
            return Err(ChannelError::InvalidDimensions);
        }
        Ok(sum_kraus(&self.kraus_ops, rho))
    }

    /// Amplitude Damping -> T1 relaxation towards north
    pub fn amplitude_damping(gamma: f64) -> Result<QuantumChannel, ChannelError> {
        validate_prob(gamma)?;

        let g_sqrt = gamma.sqrt();
        let one_minus_g_sqrt = (1.0 - gamma).sqrt();

        let k0 = array![
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            [
                Complex64::new(0.0, 0.0),
                Complex64::new(one_minus_g_sqrt, 0.0)
            ]
        ];

        let k1 = array![
            [Complex64::new(0.0, 0.0), Complex64::new(g_sqrt, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0)]
        ];

        QuantumChannel::new(vec![k0, k1])
    }

    /// Phase Damping -> T2 dephasing
    pub fn phase_damping(lambda: f64) -> Result<QuantumChannel, ChannelError> {
        validate_prob(lambda)?;

        let sqrt_one_minus_lambda = (1.0 - lambda).sqrt();
        let sqrt_lambda = lambda.sqrt();

        let k0 = array![
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            [
                Complex64::new(0.0, 0.0),
                Complex64::new(sqrt_one_minus_lambda, 0.0)
            ]
        ];

        let k1 = array![
            [Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(sqrt_lambda, 0.0)]
        ];

        QuantumChannel::new(vec![k0, k1])
    }

    /// Combined Amplitude & Phase Damping -> amplitude first, then dephasing
    pub fn combined_amplitude_phase_damping(
        gamma: f64,
        lambda: f64,
    ) -> Result<QuantumChannel, ChannelError> {
        let amp_channel = Self::amplitude_damping(gamma)?;
        let phase_channel = Self::phase_damping(lambda)?;

        let mut combined_ops = Vec::with_capacity(4);
        for p_op in &phase_channel.kraus_ops {
            for a_op in &amp_channel.kraus_ops {
                combined_ops.push(p_op.dot(a_op));
            }
        }

        QuantumChannel::new(combined_ops)
    }

    /// Dissipation over `dt` at the given T1/T2 rates (per second).
    ///
    /// Excited population decays as $e^{-T_1 dt}$; the pure-dephasing part
    /// scales coherences by $e^{-T_2 dt}$.
    pub fn thermal_relaxation(t1_rate: f64, t2_rate: f64, dt: f64) -> Result<QuantumChannel, ChannelError> {
        for rate in [t1_rate, t2_rate, dt] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ChannelError::InvalidRate(rate));
            }
        }
        let gamma = -(-t1_rate * dt).exp_m1();
        let lambda = -(-2.0 * t2_rate * dt).exp_m1();
        Self::combined_amplitude_phase_damping(gamma.clamp(0.0, 1.0), lambda.clamp(0.0, 1.0))
    }
}

/// $\sum_k K_k \rho K_k^\dagger$ for already expanded operators
pub(crate) fn sum_kraus(ops: &[Array2<Complex64>], rho: &Array2<Complex64>) -> Array2<Complex64> {
    let dim = rho.nrows();
    ops.iter()
        .fold(Array2::<Complex64>::zeros((dim, dim)), |acc, k| {
            acc + k.dot(rho).dot(&utils::dagger(k))
        })
}

/// Validate probability parameter
fn validate_prob(p: f64) -> Result<(), ChannelError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ChannelError::InvalidProbability(p));
    }
    Ok(())
}
