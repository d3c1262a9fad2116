//! Utility functions for density-matrix operations.
//!
//! This module contains helper functions for:
//! - Matrix operations (Kronecker product, trace, adjoint, outer product).
//! - Operator expansion to larger systems and partial traces back down.
//! - Completeness checks for measurements and channels.
//! - Spectral helpers (eigenvalues, entropy, projection onto valid states).
//! - Bit manipulation for state indices.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;

/// Computes the Kronecker (Tensor) product of two matrices.
///
/// If `A` is an $m \times n$ matrix and `B` is a $p \times q$ matrix,
/// the result is an $mp \times nq$ matrix. With the little-endian qubit
/// ordering used throughout the crate, `B` occupies the low bits.
pub fn kronecker_product(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let (m, n) = a.dim();
    let (p, q) = b.dim();

    // A as (m, 1, n, 1), B as (1, p, 1, q), broadcast to (m, p, n, q)
    let a_expanded = a.view().insert_axis(Axis(1)).insert_axis(Axis(3));
    let b_expanded = b.view().insert_axis(Axis(0)).insert_axis(Axis(2));
    let tensor_product = &a_expanded * &b_expanded;

    // Broadcast result is a fresh standard-layout array, so a plain
    // row-major copy into the (m*p, n*q) shape is exact.
    Array2::from_shape_vec((m * p, n * q), tensor_product.iter().copied().collect())
        .unwrap_or_else(|_| Array2::zeros((m * p, n * q)))
}

/// Computes the trace of a matrix (sum of diagonal elements).
pub fn trace(matrix: &Array2<Complex64>) -> Complex64 {
    matrix.diag().sum()
}

/// Conjugate transpose.
pub fn dagger(matrix: &Array2<Complex64>) -> Array2<Complex64> {
    matrix.t().mapv(|c| c.conj())
}

/// Generates the full operator matrix ($2^N \times 2^N$) for the whole system.
///
/// It expands a local operator acting on `targets` (and controlled by `controls`)
/// to an operator on the full system of `num_total_qubits`.
///
/// # Arguments
///
/// * `num_total_qubits` - Total number of qubits in the system.
/// * `matrix` - The matrix representation of the local operator.
/// * `targets` - Indices of the target qubits.
/// * `controls` - Indices of the control qubits.
pub fn expand_operator(
    num_total_qubits: usize,
    matrix: &Array2<Complex64>,
    targets: &[usize],
    controls: &[usize],
) -> Array2<Complex64> {
    let dim = 1 << num_total_qubits;
    let mut full_matrix = Array2::<Complex64>::zeros((dim, dim));

    let mut control_mask = 0usize;
    for &c in controls {
        control_mask |= 1 << c;
    }
    let mut target_mask = 0usize;
    for &t in targets {
        target_mask |= 1 << t;
    }
    let passive_mask = !target_mask;

    for col_idx in 0..dim {
        // Basis state not selected by the controls: identity on this column
        if (col_idx & control_mask) != control_mask {
            full_matrix[[col_idx, col_idx]] = Complex64::new(1.0, 0.0);
            continue;
        }
        let small_col = extract_bits(col_idx, targets);
        for small_row in 0..matrix.nrows() {
            let val = matrix[[small_row, small_col]];
            if val.norm_sqr() < f64::EPSILON * f64::EPSILON {
                continue;
            }
            // Preserve passive bits, scatter the local row onto the targets
            let row_idx = (col_idx & passive_mask) | deposit_bits(small_row, targets);
            full_matrix[[row_idx, col_idx]] = val;
        }
    }
    full_matrix
}

/// Extracts the bits in positions `indices` of the sequence `value`
pub(crate) fn extract_bits(value: usize, indices: &[usize]) -> usize {
    let mut result = 0;
    for (i, &pos) in indices.iter().enumerate() {
        if (value >> pos) & 1 == 1 {
            result |= 1 << i;
        }
    }
    result
}

/// Scatters bits from `compact_value` into the positions specified by `indices`.
pub(crate) fn deposit_bits(compact_value: usize, indices: &[usize]) -> usize {
    let mut result = 0;
    for (i, &pos) in indices.iter().enumerate() {
        if (compact_value >> i) & 1 == 1 {
            result |= 1 << pos;
        }
    }
    result
}

/// Find duplicate in a slice of usize
pub fn find_duplicate(indices: &[usize]) -> Option<usize> {
    let mut seen = std::collections::HashSet::new();
    indices.iter().find(|&&idx| !seen.insert(idx)).copied()
}

/// Checks completeness relation for measurement and Kraus operators.
///
/// Verifies if $\sum M_k^\dagger M_k = I$.
pub fn check_completeness(ops: &[Array2<Complex64>], dim: usize) -> bool {
    let eye = Array2::<Complex64>::eye(dim);
    let sum = ops
        .iter()
        .fold(Array2::<Complex64>::zeros((dim, dim)), |acc, op| {
            acc + dagger(op).dot(op)
        });
    sum.iter()
        .zip(eye.iter())
        .all(|(a, b)| (a - b).norm() < 1e-9)
}

/// Computes the outer product of two vectors $|a\rangle\langle b|$.
pub fn outer_product(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array2<Complex64> {
    let n = a.len();
    let m = b.len();
    let mut res = Array2::zeros((n, m));

    for i in 0..n {
        for j in 0..m {
            res[[i, j]] = a[i] * b[j].conj();
        }
    }
    res
}

/// Checks if a matrix is Hermitian
pub fn is_hermitian(mat: &Array2<Complex64>, tol: f64) -> bool {
    hermitian_deviation(mat) < tol
}

/// Largest entrywise distance between `mat` and its adjoint.
pub fn hermitian_deviation(mat: &Array2<Complex64>) -> f64 {
    mat.iter()
        .zip(mat.t().iter())
        .map(|(a, b)| (a - b.conj()).norm())
        .fold(0.0, f64::max)
}

/// Returns $(\rho + \rho^\dagger) / 2$.
pub fn hermitize(mat: &Array2<Complex64>) -> Array2<Complex64> {
    (mat + &dagger(mat)).mapv(|c| c * 0.5)
}

/// $\mathrm{Tr}(\rho^2)$, clamped at zero.
pub fn purity(rho: &Array2<Complex64>) -> f64 {
    let n = rho.nrows();
    let mut acc = Complex64::new(0.0, 0.0);
    for i in 0..n {
        for j in 0..n {
            acc += rho[[i, j]] * rho[[j, i]];
        }
    }
    acc.re.max(0.0)
}

/// Traces out every qubit not listed in `keep`.
///
/// Qubit `keep[i]` of the input becomes qubit `i` of the reduced matrix.
pub fn partial_trace(rho: &Array2<Complex64>, num_qubits: usize, keep: &[usize]) -> Array2<Complex64> {
    let rest: Vec<usize> = (0..num_qubits).filter(|q| !keep.contains(q)).collect();
    let dim_keep = 1 << keep.len();
    let dim_rest = 1 << rest.len();
    let mut reduced = Array2::<Complex64>::zeros((dim_keep, dim_keep));

    for r in 0..dim_keep {
        let row_bits = deposit_bits(r, keep);
        for c in 0..dim_keep {
            let col_bits = deposit_bits(c, keep);
            let mut sum = Complex64::new(0.0, 0.0);
            for e in 0..dim_rest {
                let env = deposit_bits(e, &rest);
                sum += rho[[row_bits | env, col_bits | env]];
            }
            reduced[[r, c]] = sum;
        }
    }
    reduced
}

fn to_nalgebra(mat: &Array2<Complex64>) -> DMatrix<Complex64> {
    let (rows, cols) = mat.dim();
    DMatrix::from_fn(rows, cols, |r, c| mat[[r, c]])
}

fn from_nalgebra(mat: &DMatrix<Complex64>) -> Array2<Complex64> {
    let (rows, cols) = mat.shape();
    Array2::from_shape_fn((rows, cols), |(r, c)| mat[(r, c)])
}

/// Eigenvalues of the Hermitian part of `mat`, ascending.
pub fn eigenvalues(mat: &Array2<Complex64>) -> Vec<f64> {
    let eigen = to_nalgebra(&hermitize(mat)).symmetric_eigen();
    let mut values: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Smallest eigenvalue of the Hermitian part of `mat`.
pub fn min_eigenvalue(mat: &Array2<Complex64>) -> f64 {
    eigenvalues(mat).first().copied().unwrap_or(0.0)
}

/// Von Neumann entropy $S(\rho) = -\sum \lambda_i \log_2 \lambda_i$ in bits.
pub fn von_neumann_entropy(rho: &Array2<Complex64>) -> f64 {
    let entropy: f64 = eigenvalues(rho)
        .into_iter()
        .filter(|&l| l > 1e-15)
        .map(|l| -l * l.log2())
        .sum();
    entropy.max(0.0)
}

/// Projects an arbitrary square matrix onto the closest density matrix.
///
/// Hermitizes, clips negative eigenvalues to zero and rescales the spectrum to
/// unit trace: $V \max(D, 0) V^\dagger / \sum \max(\lambda, 0)$. A spectrum with
/// no positive weight collapses to the maximally mixed state.
pub fn nearest_density_matrix(mat: &Array2<Complex64>) -> Array2<Complex64> {
    let dim = mat.nrows();
    let eigen = to_nalgebra(&hermitize(mat)).symmetric_eigen();

    let clipped: Vec<f64> = eigen
        .eigenvalues
        .iter()
        .map(|&l| if l.is_finite() { l.max(0.0) } else { 0.0 })
        .collect();
    let total: f64 = clipped.iter().sum();

    if !(total > 1e-15) || !eigen.eigenvectors.iter().all(|c| c.is_finite()) {
        return Array2::<Complex64>::eye(dim).mapv(|c| c / dim as f64);
    }

    let mut diag = DMatrix::<Complex64>::zeros(dim, dim);
    for (i, &l) in clipped.iter().enumerate() {
        diag[(i, i)] = Complex64::new(l / total, 0.0);
    }

    let v = &eigen.eigenvectors;
    let rebuilt = v * diag * v.adjoint();
    hermitize(&from_nalgebra(&rebuilt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn kronecker_places_second_factor_in_low_bits() {
        let zero = array![[c(1.0), c(0.0)], [c(0.0), c(0.0)]];
        let one = array![[c(0.0), c(0.0)], [c(0.0), c(1.0)]];
        // qubit 1 = |1>, qubit 0 = |0>  ->  basis index 0b10
        let joint = kronecker_product(&one, &zero);
        assert_eq!(joint.dim(), (4, 4));
        assert!((joint[[2, 2]].re - 1.0).abs() < 1e-15);
        assert!((trace(&joint).re - 1.0).abs() < 1e-15);
    }

    #[test]
    fn partial_trace_recovers_factors() {
        let a = array![[c(0.75), c(0.25)], [c(0.25), c(0.25)]];
        let b = array![[c(0.5), c(0.0)], [c(0.0), c(0.5)]];
        let joint = kronecker_product(&b, &a);

        let ra = partial_trace(&joint, 2, &[0]);
        let rb = partial_trace(&joint, 2, &[1]);
        for (x, y) in ra.iter().zip(a.iter()) {
            assert!((x - y).norm() < 1e-12);
        }
        for (x, y) in rb.iter().zip(b.iter()) {
            assert!((x - y).norm() < 1e-12);
        }
    }

    #[test]
    fn entropy_of_maximally_mixed_qubit_is_one_bit() {
        let mixed = array![[c(0.5), c(0.0)], [c(0.0), c(0.5)]];
        assert!((von_neumann_entropy(&mixed) - 1.0).abs() < 1e-12);

        let pure = array![[c(1.0), c(0.0)], [c(0.0), c(0.0)]];
        assert!(von_neumann_entropy(&pure).abs() < 1e-12);
    }

    #[test]
    fn nearest_density_matrix_clips_negative_weight() {
        let bad = array![[c(1.2), c(0.0)], [c(0.0), c(-0.2)]];
        assert!(min_eigenvalue(&bad) < 0.0);

        let fixed = nearest_density_matrix(&bad);
        assert!(min_eigenvalue(&fixed) >= -1e-12);
        assert!((trace(&fixed).re - 1.0).abs() < 1e-12);
        assert!((fixed[[0, 0]].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hermitize_removes_antihermitian_part() {
        let m = array![
            [c(0.5), Complex64::new(0.1, 0.3)],
            [Complex64::new(0.3, 0.0), c(0.5)]
        ];
        assert!(!is_hermitian(&m, 1e-9));
        assert!(is_hermitian(&hermitize(&m), 1e-12));
    }
}
