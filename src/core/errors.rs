use crate::diagnostics::CorruptionReport;
use crate::types::{ComponentId, RegisterId};
use num_complex::Complex64;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GateError {
    #[error("Matrix is not Unitary (U†U != I)")]
    NonUnitary,

    #[error("Matrix must be square")]
    NotSquareMatrix,

    #[error("Invalid Dimensions")]
    InvalidDimensions,

    #[error("Qubit {0} cannot be both control and target")]
    ControlTargetOverlap(usize),

    #[error("Duplicate qubit index found: {0}")]
    DuplicateQubit(usize),
}

#[derive(Error, Debug, Clone)]
pub enum MeasurementError {
    #[error("Number of operators ({ops}) does not match number of outcomes ({vals})")]
    CountMismatch { ops: usize, vals: usize },

    #[error("Measurement operators do not sum to Identity (Completeness relation failed)")]
    NotComplete,

    #[error("Invalid operator dimensions")]
    InvalidDimensions,

    #[error("Outcome has zero probability: {0}")]
    ImpossibleOutcome(f64),
}

#[derive(Error, Debug, Clone)]
pub enum StateError {
    #[error("Trace is not unity: {0}")]
    InvalidTrace(Complex64),

    #[error("Vector is not normalized. Norm squared: {0}")]
    NotNormalized(f64),

    #[error("Invalid dimensions")]
    InvalidDimensions,

    #[error("Dimension mismatch")]
    DimensionMismatch {
        expected: usize,
        got_rows: usize,
        got_cols: usize,
    },

    #[error("Qubit index out of bounds")]
    IndexOutOfBounds { index: usize, num_qubits: usize },

    #[error("Density matrix is not Hermitian (deviation {0:e})")]
    NotHermitian(f64),

    #[error("Density matrix has a negative eigenvalue: {0:e}")]
    NegativeEigenvalue(f64),

    #[error("Density matrix contains non-finite entries")]
    NonFinite,

    #[error("Measurement error: {0}")]
    MeasurementError(#[from] MeasurementError),

    #[error("Gate error: {0}")]
    GateError(#[from] GateError),

    #[error("Channel error: {0}")]
    ChannelError(#[from] ChannelError),
}

#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    #[error("Channel must have at least one Kraus operator")]
    Empty,

    #[error("Kraus operators do not sum to Identity (Trace preserving relation failed)")]
    NotComplete,

    #[error("Invalid operator dimensions: Matrices must be square and 2^n")]
    InvalidDimensions,

    #[error("Dimension mismatch: All Kraus operators must have the same size")]
    OperatorSizeMismatch,

    #[error("Invalid probability: {0}. Must be between 0.0 and 1.0")]
    InvalidProbability(f64),

    #[error("Invalid rate: {0}. Must be finite and non-negative")]
    InvalidRate(f64),
}

/// Errors returned by the public engine API.
///
/// Allocation and entanglement errors are never retried internally; the host
/// decides the gameplay fallback.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("Register pool is full (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("Unknown register {0}")]
    UnknownRegister(RegisterId),

    #[error("Unknown component {0}")]
    UnknownComponent(ComponentId),

    #[error("Register {0} is already entangled")]
    AlreadyEntangled(RegisterId),

    #[error("Cluster would hold {size} registers (max {max})")]
    ClusterSizeExceeded { size: usize, max: usize },

    #[error("State corruption: {0}")]
    StateCorruption(CorruptionReport),

    #[error("Register {0} cannot be entangled with itself")]
    SameRegister(RegisterId),

    #[error("Control index {index} out of range for a component of {size} registers")]
    ControlOutOfRange { index: usize, size: usize },

    #[error("Invalid time step: {0}")]
    InvalidTimeStep(f64),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl From<ChannelError> for EngineError {
    fn from(err: ChannelError) -> Self {
        EngineError::State(StateError::ChannelError(err))
    }
}

impl From<GateError> for EngineError {
    fn from(err: GateError) -> Self {
        EngineError::State(StateError::GateError(err))
    }
}

impl From<MeasurementError> for EngineError {
    fn from(err: MeasurementError) -> Self {
        EngineError::State(StateError::MeasurementError(err))
    }
}
