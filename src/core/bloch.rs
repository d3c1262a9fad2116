use crate::core::channels::QuantumChannel;
use crate::core::errors::StateError;
use crate::hamiltonian::PauliVector;
use crate::types::Pole;
use ndarray::{Array2, arr2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// State of a single unentangled register on the Bloch sphere.
///
/// `theta ∈ [0, π]` and `phi ∈ [0, 2π)` give the direction of the Bloch
/// vector; `purity` is Tr(ρ²), 1 for a pure state and ½ for the maximally
/// mixed one. The vector length follows from it as `√(2·purity − 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlochState {
    theta: f64,
    phi: f64,
    purity: f64,
}

impl Default for BlochState {
    fn default() -> Self {
        Self::north()
    }
}

impl BlochState {
    /// Pure |north⟩.
    pub fn north() -> Self {
        Self {
            theta: 0.0,
            phi: 0.0,
            purity: 1.0,
        }
    }

    /// Pure |south⟩.
    pub fn south() -> Self {
        Self {
            theta: PI,
            phi: 0.0,
            purity: 1.0,
        }
    }

    pub fn at_pole(pole: Pole) -> Self {
        match pole {
            Pole::North => Self::north(),
            Pole::South => Self::south(),
        }
    }

    /// Pure state at the given angles. Angles outside their ranges are folded
    /// back onto the sphere.
    pub fn new(theta: f64, phi: f64) -> Result<Self, StateError> {
        if !theta.is_finite() || !phi.is_finite() {
            return Err(StateError::NonFinite);
        }
        let (s, c) = theta.sin_cos();
        let mut state = Self::from_vector(s * phi.cos(), s * phi.sin(), c)?;
        state.purity = 1.0;
        Ok(state)
    }

    /// State with Bloch vector `(x, y, z)`; lengths above one are clamped.
    pub fn from_vector(x: f64, y: f64, z: f64) -> Result<Self, StateError> {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(StateError::NonFinite);
        }
        let r = (x * x + y * y + z * z).sqrt().min(1.0);
        if r < 1e-15 {
            return Ok(Self {
                theta: PI / 2.0,
                phi: 0.0,
                purity: 0.5,
            });
        }
        let norm = (x * x + y * y + z * z).sqrt();
        let theta = (z / norm).clamp(-1.0, 1.0).acos();
        let phi = if x.abs() < 1e-300 && y.abs() < 1e-300 {
            0.0
        } else {
            y.atan2(x).rem_euclid(TAU)
        };
        Ok(Self {
            theta,
            phi: if phi >= TAU { 0.0 } else { phi },
            purity: (1.0 + r * r) / 2.0,
        })
    }

    /// Reads a 2×2 density matrix, normalizing its trace first.
    pub fn from_density_matrix(rho: &Array2<Complex64>) -> Result<Self, StateError> {
        if rho.dim() != (2, 2) {
            return Err(StateError::DimensionMismatch {
                expected: 2,
                got_rows: rho.nrows(),
                got_cols: rho.ncols(),
            });
        }
        let tr = (rho[[0, 0]] + rho[[1, 1]]).re;
        if !tr.is_finite() || tr <= 1e-15 {
            return Err(StateError::InvalidTrace(rho[[0, 0]] + rho[[1, 1]]));
        }
        // Average the two off-diagonals so a slightly non-Hermitian input
        // still maps onto a real Bloch vector.
        let off = (rho[[0, 1]] + rho[[1, 0]].conj()) / 2.0;
        let x = 2.0 * off.re / tr;
        let y = -2.0 * off.im / tr;
        let z = (rho[[0, 0]].re - rho[[1, 1]].re) / tr;
        Self::from_vector(x, y, z)
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Tr(ρ²).
    pub fn purity(&self) -> f64 {
        self.purity
    }

    /// Length of the Bloch vector.
    pub fn radius(&self) -> f64 {
        (2.0 * self.purity - 1.0).max(0.0).sqrt()
    }

    /// Bloch vector `(x, y, z)`.
    pub fn vector(&self) -> [f64; 3] {
        let r = self.radius();
        let (st, ct) = self.theta.sin_cos();
        let (sp, cp) = self.phi.sin_cos();
        [r * st * cp, r * st * sp, r * ct]
    }

    /// Probability of measuring `pole`; `cos²(θ/2)` for north on a pure state.
    pub fn probability(&self, pole: Pole) -> f64 {
        let p_north = ((1.0 + self.radius() * self.theta.cos()) / 2.0).clamp(0.0, 1.0);
        match pole {
            Pole::North => p_north,
            Pole::South => 1.0 - p_north,
        }
    }

    /// `2|ρ01|`: 1 on the equator of a pure state, 0 at the poles or when
    /// fully mixed.
    pub fn coherence(&self) -> f64 {
        (self.radius() * self.theta.sin()).abs().min(1.0)
    }

    pub fn to_density_matrix(&self) -> Array2<Complex64> {
        let [x, y, z] = self.vector();
        arr2(&[
            [Complex64::new((1.0 + z) / 2.0, 0.0), Complex64::new(x / 2.0, -y / 2.0)],
            [Complex64::new(x / 2.0, y / 2.0), Complex64::new((1.0 - z) / 2.0, 0.0)],
        ])
    }

    /// Precesses the state under `H = op·σ` for `dt`.
    ///
    /// The Bloch vector rotates by `2|h|dt` about `ĥ`; purity is untouched.
    pub fn apply_unitary_rotation(&mut self, op: &PauliVector, dt: f64) {
        let norm = op.norm();
        if !(norm * dt).is_finite() || norm * dt.abs() < 1e-300 || self.radius() < 1e-15 {
            return;
        }
        let n = [op.x / norm, op.y / norm, op.z / norm];
        let (st, ct) = self.theta.sin_cos();
        let (sp, cp) = self.phi.sin_cos();
        let v = [st * cp, st * sp, ct];

        let angle = 2.0 * norm * dt;
        let (s, c) = angle.sin_cos();
        let dot = n[0] * v[0] + n[1] * v[1] + n[2] * v[2];
        let cross = [
            n[1] * v[2] - n[2] * v[1],
            n[2] * v[0] - n[0] * v[2],
            n[0] * v[1] - n[1] * v[0],
        ];
        let rotated: [f64; 3] =
            std::array::from_fn(|i| v[i] * c + cross[i] * s + n[i] * dot * (1.0 - c));

        if let Ok(direction) = Self::from_vector(rotated[0], rotated[1], rotated[2]) {
            self.theta = direction.theta;
            self.phi = direction.phi;
        }
    }

    /// Amplitude damping at `t1_rate` and dephasing at `t2_rate` for `dt`.
    pub fn apply_dissipation(&mut self, t1_rate: f64, t2_rate: f64, dt: f64) -> Result<(), StateError> {
        let channel = QuantumChannel::thermal_relaxation(t1_rate, t2_rate, dt)?;
        self.apply_channel(&channel)
    }

    /// Applies a single-qubit channel.
    pub fn apply_channel(&mut self, channel: &QuantumChannel) -> Result<(), StateError> {
        let rho = channel.apply(&self.to_density_matrix())?;
        *self = Self::from_density_matrix(&rho)?;
        Ok(())
    }

    /// Snaps to a definite pole.
    pub fn collapse_to(&mut self, pole: Pole) {
        *self = Self::at_pole(pole);
    }
}
