//! Opaque handles and small value types shared across the engine.
//!
//! Hosts only ever hold these ids; every matrix and table they refer to is
//! owned by [`QuantumEngine`](crate::QuantumEngine).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of an allocated register. Unique while the register is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegisterId(pub u32);

/// Handle of a multi-register density component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

/// Identifies a Hamiltonian term source (a modifier owned by the host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u64);

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// One of the two computational basis states of a register.
///
/// `North` is |0⟩ (the ground state amplitude damping relaxes towards),
/// `South` is |1⟩.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pole {
    North,
    South,
}

impl Pole {
    /// Basis index of the pole: 0 for north, 1 for south.
    pub fn index(self) -> usize {
        match self {
            Pole::North => 0,
            Pole::South => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index == 0 { Pole::North } else { Pole::South }
    }

    pub fn opposite(self) -> Self {
        match self {
            Pole::North => Pole::South,
            Pole::South => Pole::North,
        }
    }
}

impl fmt::Display for Pole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pole::North => f.write_str("north"),
            Pole::South => f.write_str("south"),
        }
    }
}

/// Gameplay labels attached to the two poles of a register (e.g. "🌾" / "👥").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasisLabels {
    pub north: String,
    pub south: String,
}

impl BasisLabels {
    pub fn new(north: impl Into<String>, south: impl Into<String>) -> Self {
        Self {
            north: north.into(),
            south: south.into(),
        }
    }

    pub fn label(&self, pole: Pole) -> &str {
        match pole {
            Pole::North => &self.north,
            Pole::South => &self.south,
        }
    }
}
