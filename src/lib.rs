//! Small-qubit quantum state engine for farming mechanics.
//!
//! Every plot owns a register. Unentangled registers are tracked as Bloch
//! states; entangled groups share a joint density matrix of up to a handful
//! of qubits. The host drives the engine through a single [`QuantumEngine`]
//! handle: it submits Hamiltonian terms, advances time with a per-register
//! temperature lookup, entangles registers and measures them at harvest.
//!
//! ```no_run
//! use qubit_farm::{BellType, EngineConfig, QuantumEngine, UniformTemperature};
//!
//! # fn main() -> Result<(), qubit_farm::errors::EngineError> {
//! let mut engine = QuantumEngine::new(EngineConfig::new().with_seed(1));
//! let wheat = engine.allocate_register("🌾", "👥")?;
//! let rye = engine.allocate_register("🌾", "👥")?;
//! engine.entangle_pair(wheat, rye, BellType::PhiPlus)?;
//! engine.tick(0.5, &UniformTemperature(290.0))?;
//!
//! let harvest = engine.measure(wheat)?;
//! assert_eq!(harvest.outcome_of(rye), Some(harvest.outcome));
//! assert_eq!(engine.query_probability(rye, harvest.outcome)?, 1.0);
//! # Ok(())
//! # }
//! ```

mod config;
mod core;
mod diagnostics;
mod engine;
mod entanglement;
mod hamiltonian;
mod lindblad;
mod measure;
mod registry;
mod sampler;
mod types;

pub use crate::config::{EngineConfig, MAX_SUPPORTED_CLUSTER};
pub use crate::core::{BlochState, DensityComponent, Gate, Measurement, QuantumChannel, errors, utils};
pub use crate::diagnostics::{CorruptionKind, CorruptionReport, DiagnosticChannel};
pub use crate::engine::{PairInformation, QuantumEngine, TickReport};
pub use crate::entanglement::{BellType, ClusterMap, EntanglementOperator, MergePlan, UnknownBellType};
pub use crate::hamiltonian::{
    ConstantField, HamiltonianComposer, HamiltonianSource, HamiltonianTerm, PauliVector, TermScope, compose,
};
pub use crate::lindblad::{DissipationRates, LindbladEvolver, TemperatureField, UniformTemperature};
pub use crate::measure::{MeasurementEngine, MeasurementOutcome};
pub use crate::registry::{Register, RegisterAllocator, Slot};
pub use crate::sampler::Sampler;
pub use crate::types::{BasisLabels, ComponentId, Pole, RegisterId, SourceId};
