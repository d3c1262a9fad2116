//! Bell pairs, GHZ / graph clusters, and the merge policy deciding which of
//! them an entangle request produces.

use crate::config::MAX_SUPPORTED_CLUSTER;
use crate::core::errors::EngineError;
use crate::core::{BlochState, DensityComponent, Gate};
use crate::types::RegisterId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four canonical maximally entangled two-register states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BellType {
    /// (|nn⟩ + |ss⟩)/√2
    PhiPlus,
    /// (|nn⟩ − |ss⟩)/√2
    PhiMinus,
    /// (|ns⟩ + |sn⟩)/√2
    PsiPlus,
    /// (|ns⟩ − |sn⟩)/√2
    PsiMinus,
}

impl BellType {
    /// Whether the two registers read opposite poles.
    pub fn anti_correlated(self) -> bool {
        matches!(self, BellType::PsiPlus | BellType::PsiMinus)
    }

    fn relative_phase(self) -> bool {
        matches!(self, BellType::PhiMinus | BellType::PsiMinus)
    }

    /// Local corrections that turn the correlation left by a CNOT into this
    /// Bell type on `target`.
    fn apply_relation(self, component: &mut DensityComponent, target: usize) -> Result<(), EngineError> {
        if self.anti_correlated() {
            component.apply(&Gate::x(), &[target])?;
        }
        if self.relative_phase() {
            component.apply(&Gate::z(), &[target])?;
        }
        Ok(())
    }
}

impl fmt::Display for BellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BellType::PhiPlus => "phi_plus",
            BellType::PhiMinus => "phi_minus",
            BellType::PsiPlus => "psi_plus",
            BellType::PsiMinus => "psi_minus",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown Bell type: {0}")]
pub struct UnknownBellType(pub String);

impl FromStr for BellType {
    type Err = UnknownBellType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phi_plus" => Ok(BellType::PhiPlus),
            "phi_minus" => Ok(BellType::PhiMinus),
            "psi_plus" => Ok(BellType::PsiPlus),
            "psi_minus" => Ok(BellType::PsiMinus),
            other => Err(UnknownBellType(other.to_string())),
        }
    }
}

/// Entangling map used when a register joins an existing component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMap {
    /// CNOT from the control onto the newcomer. A fresh north register joining
    /// a GHZ state keeps it GHZ.
    #[default]
    Ghz,
    /// Hadamard on the newcomer, then CZ with the control.
    Graph,
}

/// What an entangle request between two registers turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePlan {
    /// Neither register is entangled yet.
    CreatePair { a: RegisterId, b: RegisterId },
    /// `anchor` sits in a two-register pair; `newcomer` joins to form a
    /// three-register cluster.
    UpgradeToCluster { anchor: RegisterId, newcomer: RegisterId },
    /// `anchor` sits in a cluster of three or more; `newcomer` extends it.
    ExtendCluster { anchor: RegisterId, newcomer: RegisterId },
}

/// Builds entangled components and enforces the size cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntanglementOperator {
    max_cluster_size: usize,
}

impl EntanglementOperator {
    pub fn new(max_cluster_size: usize) -> Self {
        Self {
            max_cluster_size: max_cluster_size.clamp(2, MAX_SUPPORTED_CLUSTER),
        }
    }

    pub fn max_cluster_size(&self) -> usize {
        self.max_cluster_size
    }

    /// Decides how to entangle `a` and `b`, given the sizes of the components
    /// they currently belong to (1 for an unentangled register).
    ///
    /// The policy is symmetric in `a` and `b`.
    pub fn merge_plan(&self, a: (RegisterId, usize), b: (RegisterId, usize)) -> Result<MergePlan, EngineError> {
        let ((a_id, a_size), (b_id, b_size)) = (a, b);
        if a_id == b_id {
            return Err(EngineError::SameRegister(a_id));
        }
        match (a_size > 1, b_size > 1) {
            (false, false) => Ok(MergePlan::CreatePair { a: a_id, b: b_id }),
            (true, true) => Err(EngineError::AlreadyEntangled(b_id)),
            (true, false) => self.join(a_id, a_size, b_id),
            (false, true) => self.join(b_id, b_size, a_id),
        }
    }

    fn join(&self, anchor: RegisterId, size: usize, newcomer: RegisterId) -> Result<MergePlan, EngineError> {
        self.check_capacity(size + 1)?;
        if size == 2 {
            Ok(MergePlan::UpgradeToCluster { anchor, newcomer })
        } else {
            Ok(MergePlan::ExtendCluster { anchor, newcomer })
        }
    }

    fn check_capacity(&self, size: usize) -> Result<(), EngineError> {
        if size > self.max_cluster_size {
            return Err(EngineError::ClusterSizeExceeded {
                size,
                max: self.max_cluster_size,
            });
        }
        Ok(())
    }

    /// Canonical Bell pair with `a` on qubit 0 and `b` on qubit 1. The prior
    /// states of both registers are discarded.
    pub fn create_pair(&self, a: RegisterId, b: RegisterId, bell_type: BellType) -> Result<DensityComponent, EngineError> {
        if a == b {
            return Err(EngineError::SameRegister(a));
        }
        let mut pair = DensityComponent::from_bloch_states(&[(a, BlochState::north()), (b, BlochState::north())])?;
        pair.apply(&Gate::h(), &[0])?;
        pair.apply(&Gate::cnot(), &[0, 1])?;
        bell_type.apply_relation(&mut pair, 1)?;
        Ok(pair)
    }

    /// GHZ state (|n…n⟩ + |s…s⟩)/√2 over `registers`.
    pub fn create_ghz(&self, registers: &[RegisterId]) -> Result<DensityComponent, EngineError> {
        let (first, second, rest) = match registers {
            [first, second, rest @ ..] => (*first, *second, rest),
            _ => {
                return Err(EngineError::ClusterSizeExceeded {
                    size: registers.len(),
                    max: self.max_cluster_size,
                });
            }
        };
        self.check_capacity(registers.len())?;
        let mut ghz = self.create_pair(first, second, BellType::PhiPlus)?;
        for &register in rest {
            self.extend_cluster(&mut ghz, register, BlochState::north(), 0, ClusterMap::Ghz)?;
        }
        Ok(ghz)
    }

    /// Tensors `register` (currently in `state`) onto `component` as its new
    /// highest qubit and entangles it with the member at `control_index`.
    pub fn extend_cluster(
        &self,
        component: &mut DensityComponent,
        register: RegisterId,
        state: BlochState,
        control_index: usize,
        map: ClusterMap,
    ) -> Result<(), EngineError> {
        let size = component.num_qubits();
        if component.contains(register) {
            return Err(EngineError::AlreadyEntangled(register));
        }
        if control_index >= size {
            return Err(EngineError::ControlOutOfRange {
                index: control_index,
                size,
            });
        }
        self.check_capacity(size + 1)?;

        component.tensor_with(register, &state);
        let target = size;
        match map {
            ClusterMap::Ghz => {
                component.apply(&Gate::cnot(), &[control_index, target])?;
            }
            ClusterMap::Graph => {
                component.apply(&Gate::h(), &[target])?;
                component.apply(&Gate::cz(), &[control_index, target])?;
            }
        }
        component.stabilize();
        Ok(())
    }

    /// [`extend_cluster`](Self::extend_cluster) with a GHZ map, followed by
    /// the local corrections that give `relation` between the control and
    /// the newcomer.
    pub fn attach_with_relation(
        &self,
        component: &mut DensityComponent,
        register: RegisterId,
        state: BlochState,
        control_index: usize,
        relation: BellType,
    ) -> Result<(), EngineError> {
        self.extend_cluster(component, register, state, control_index, ClusterMap::Ghz)?;
        relation.apply_relation(component, component.num_qubits() - 1)?;
        component.stabilize();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pole;

    const A: RegisterId = RegisterId(1);
    const B: RegisterId = RegisterId(2);
    const C: RegisterId = RegisterId(3);

    fn op() -> EntanglementOperator {
        EntanglementOperator::new(6)
    }

    fn joint_probability(comp: &DensityComponent, index: usize) -> f64 {
        comp.density_matrix()[[index, index]].re
    }

    #[test]
    fn bell_types_have_expected_correlations() {
        for bell in [BellType::PhiPlus, BellType::PhiMinus, BellType::PsiPlus, BellType::PsiMinus] {
            let pair = op().create_pair(A, B, bell).unwrap();
            let (same, opposite) = if bell.anti_correlated() { (0.0, 0.5) } else { (0.5, 0.0) };
            assert!((joint_probability(&pair, 0b00) - same).abs() < 1e-12, "{bell}");
            assert!((joint_probability(&pair, 0b11) - same).abs() < 1e-12, "{bell}");
            assert!((joint_probability(&pair, 0b01) - opposite).abs() < 1e-12, "{bell}");
            assert!((pair.purity() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn phi_plus_and_phi_minus_differ_in_phase() {
        let plus = op().create_pair(A, B, BellType::PhiPlus).unwrap();
        let minus = op().create_pair(A, B, BellType::PhiMinus).unwrap();
        assert!((plus.density_matrix()[[0, 3]].re - 0.5).abs() < 1e-12);
        assert!((minus.density_matrix()[[0, 3]].re + 0.5).abs() < 1e-12);
    }

    #[test]
    fn extending_a_pair_gives_ghz() {
        let mut comp = op().create_pair(A, B, BellType::PhiPlus).unwrap();
        op().extend_cluster(&mut comp, C, BlochState::north(), 0, ClusterMap::Ghz).unwrap();
        assert_eq!(comp.registers(), &[A, B, C]);
        assert!((joint_probability(&comp, 0b000) - 0.5).abs() < 1e-12);
        assert!((joint_probability(&comp, 0b111) - 0.5).abs() < 1e-12);
        assert!((comp.density_matrix()[[0, 7]].re - 0.5).abs() < 1e-12);
    }

    #[test]
    fn graph_map_entangles_without_changing_control_marginal() {
        let mut comp = op().create_pair(A, B, BellType::PhiPlus).unwrap();
        op().extend_cluster(&mut comp, C, BlochState::north(), 1, ClusterMap::Graph).unwrap();
        assert!((comp.marginal_probability(1, Pole::North).unwrap() - 0.5).abs() < 1e-12);
        assert!(comp.mutual_information(1, 2).unwrap() > 0.1);
        assert!(comp.check_physical(1e-9).is_ok());
    }

    #[test]
    fn extension_respects_limits() {
        let small = EntanglementOperator::new(2);
        let mut comp = small.create_pair(A, B, BellType::PhiPlus).unwrap();
        assert!(matches!(
            small.extend_cluster(&mut comp, C, BlochState::north(), 0, ClusterMap::Ghz),
            Err(EngineError::ClusterSizeExceeded { size: 3, max: 2 })
        ));
        assert!(matches!(
            op().extend_cluster(&mut comp, C, BlochState::north(), 5, ClusterMap::Ghz),
            Err(EngineError::ControlOutOfRange { index: 5, size: 2 })
        ));
        assert!(matches!(
            op().extend_cluster(&mut comp, A, BlochState::north(), 0, ClusterMap::Ghz),
            Err(EngineError::AlreadyEntangled(A))
        ));
    }

    #[test]
    fn merge_policy_is_symmetric() {
        let op = op();
        assert_eq!(op.merge_plan((A, 1), (B, 1)).unwrap(), MergePlan::CreatePair { a: A, b: B });
        assert_eq!(
            op.merge_plan((A, 2), (C, 1)).unwrap(),
            MergePlan::UpgradeToCluster { anchor: A, newcomer: C }
        );
        assert_eq!(
            op.merge_plan((C, 1), (A, 2)).unwrap(),
            MergePlan::UpgradeToCluster { anchor: A, newcomer: C }
        );
        assert_eq!(
            op.merge_plan((C, 1), (A, 4)).unwrap(),
            MergePlan::ExtendCluster { anchor: A, newcomer: C }
        );
        assert!(matches!(op.merge_plan((A, 2), (B, 3)), Err(EngineError::AlreadyEntangled(_))));
        assert!(matches!(op.merge_plan((A, 6), (C, 1)), Err(EngineError::ClusterSizeExceeded { .. })));
        assert!(matches!(op.merge_plan((A, 1), (A, 1)), Err(EngineError::SameRegister(A))));
    }

    #[test]
    fn ghz_over_many_registers() {
        let regs: Vec<RegisterId> = (0..5).map(RegisterId).collect();
        let ghz = op().create_ghz(&regs).unwrap();
        assert_eq!(ghz.num_qubits(), 5);
        assert!((joint_probability(&ghz, 0) - 0.5).abs() < 1e-12);
        assert!((joint_probability(&ghz, 31) - 0.5).abs() < 1e-12);
        assert!(op().create_ghz(&regs[..1]).is_err());
    }

    #[test]
    fn bell_type_parses_from_snake_case() {
        assert_eq!("phi_plus".parse::<BellType>().unwrap(), BellType::PhiPlus);
        assert_eq!(BellType::PsiMinus.to_string(), "psi_minus");
        assert!("bell".parse::<BellType>().is_err());
    }
}
