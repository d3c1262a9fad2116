//! Hamiltonian terms, the sources that submit them, and the per-tick composer.
//!
//! Terms are ephemeral: a source resubmits its contribution every tick and
//! whatever was not resubmitted expires once the tick consumes it. Each
//! register ends up with one local operator `h·σ`; true two-register coupling
//! only happens through the entangling maps of
//! [`EntanglementOperator`](crate::EntanglementOperator).

use crate::types::{RegisterId, SourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign, Mul};

/// Coefficients of σx, σy, σz in a single-qubit operator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PauliVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PauliVector {
    pub const ZERO: PauliVector = PauliVector {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl Add for PauliVector {
    type Output = PauliVector;

    fn add(self, rhs: PauliVector) -> PauliVector {
        PauliVector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for PauliVector {
    fn add_assign(&mut self, rhs: PauliVector) {
        *self = *self + rhs;
    }
}

impl Mul<f64> for PauliVector {
    type Output = PauliVector;

    fn mul(self, rhs: f64) -> PauliVector {
        PauliVector::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Which registers a term acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TermScope {
    /// Every live register.
    Global,
    /// A single register.
    Register(RegisterId),
}

/// One weighted Pauli contribution from a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HamiltonianTerm {
    pub source: SourceId,
    pub weight: f64,
    pub pauli: PauliVector,
    pub scope: TermScope,
}

impl HamiltonianTerm {
    pub fn global(source: SourceId, weight: f64, pauli: PauliVector) -> Self {
        Self {
            source,
            weight,
            pauli,
            scope: TermScope::Global,
        }
    }

    pub fn local(source: SourceId, register: RegisterId, weight: f64, pauli: PauliVector) -> Self {
        Self {
            source,
            weight,
            pauli,
            scope: TermScope::Register(register),
        }
    }

    /// Weighted operator `weight · (x, y, z)`.
    pub fn contribution(&self) -> PauliVector {
        self.pauli * self.weight
    }

    pub fn applies_to(&self, register: RegisterId) -> bool {
        match self.scope {
            TermScope::Global => true,
            TermScope::Register(r) => r == register,
        }
    }

    fn is_finite(&self) -> bool {
        self.weight.is_finite() && self.pauli.is_finite()
    }
}

/// Anything that contributes Hamiltonian terms: weather, tools, neighbours.
///
/// Every modifier type implements this one interface; the engine never
/// inspects what kind of object a source is.
pub trait HamiltonianSource {
    fn source_id(&self) -> SourceId;

    /// Terms to apply this tick. Terms carrying a different source id are
    /// re-tagged with [`source_id`](Self::source_id).
    fn get_terms(&self) -> Vec<HamiltonianTerm>;
}

/// A source that contributes the same term every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantField {
    pub id: SourceId,
    pub weight: f64,
    pub pauli: PauliVector,
    pub scope: TermScope,
}

impl HamiltonianSource for ConstantField {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn get_terms(&self) -> Vec<HamiltonianTerm> {
        vec![HamiltonianTerm {
            source: self.id,
            weight: self.weight,
            pauli: self.pauli,
            scope: self.scope,
        }]
    }
}

/// Pure weighted sum of the terms that apply to `register`.
///
/// Non-finite terms contribute nothing.
pub fn compose<'a, I>(terms: I, register: RegisterId) -> PauliVector
where
    I: IntoIterator<Item = &'a HamiltonianTerm>,
{
    terms
        .into_iter()
        .filter(|t| t.is_finite() && t.applies_to(register))
        .fold(PauliVector::ZERO, |acc, t| acc + t.contribution())
}

/// Collects the terms submitted for the current tick.
#[derive(Debug, Clone, Default)]
pub struct HamiltonianComposer {
    pending: BTreeMap<(SourceId, TermScope), HamiltonianTerm>,
}

impl HamiltonianComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `term`, replacing the same source's prior term for that scope.
    pub fn submit(&mut self, term: HamiltonianTerm) {
        if !term.is_finite() {
            tracing::warn!(source = %term.source, "ignoring non-finite hamiltonian term");
            return;
        }
        self.pending.insert((term.source, term.scope), term);
    }

    /// Replaces every pending term of `source` with its current terms.
    ///
    /// Terms sharing a scope are summed into one unit-weight term, so a source
    /// may split its contribution across as many terms as it likes.
    pub fn submit_source(&mut self, source: &dyn HamiltonianSource) {
        let id = source.source_id();
        self.pending.retain(|(s, _), _| *s != id);

        let mut summed: BTreeMap<TermScope, PauliVector> = BTreeMap::new();
        for term in source.get_terms() {
            if !term.is_finite() {
                tracing::warn!(source = %id, "ignoring non-finite hamiltonian term");
                continue;
            }
            *summed.entry(term.scope).or_default() += term.contribution();
        }
        for (scope, pauli) in summed {
            self.submit(HamiltonianTerm {
                source: id,
                weight: 1.0,
                pauli,
                scope,
            });
        }
    }

    pub fn active_terms(&self) -> impl Iterator<Item = &HamiltonianTerm> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Composed local operator for `register` from the pending terms.
    pub fn compose_for(&self, register: RegisterId) -> PauliVector {
        compose(self.pending.values(), register)
    }

    /// Drops terms targeting a register that no longer exists.
    pub fn forget_register(&mut self, register: RegisterId) {
        self.pending
            .retain(|(_, scope), _| *scope != TermScope::Register(register));
    }

    /// Expires every term; sources must resubmit for the next tick.
    pub fn expire(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: RegisterId = RegisterId(1);
    const B: RegisterId = RegisterId(2);

    #[test]
    fn compose_is_weighted_sum_of_applicable_terms() {
        let terms = [
            HamiltonianTerm::global(SourceId(1), 2.0, PauliVector::new(1.0, 0.0, 0.0)),
            HamiltonianTerm::local(SourceId(2), A, 0.5, PauliVector::new(0.0, 0.0, 4.0)),
            HamiltonianTerm::local(SourceId(3), B, 1.0, PauliVector::new(0.0, 9.0, 0.0)),
        ];
        assert_eq!(compose(&terms, A), PauliVector::new(2.0, 0.0, 2.0));
        assert_eq!(compose(&terms, B), PauliVector::new(2.0, 9.0, 0.0));
    }

    #[test]
    fn resubmission_replaces_prior_term() {
        let mut composer = HamiltonianComposer::new();
        composer.submit(HamiltonianTerm::global(SourceId(1), 1.0, PauliVector::new(1.0, 0.0, 0.0)));
        composer.submit(HamiltonianTerm::global(SourceId(1), 3.0, PauliVector::new(0.0, 1.0, 0.0)));
        assert_eq!(composer.len(), 1);
        assert_eq!(composer.compose_for(A), PauliVector::new(0.0, 3.0, 0.0));

        composer.expire();
        assert!(composer.is_empty());
        assert_eq!(composer.compose_for(A), PauliVector::ZERO);
    }

    #[test]
    fn sources_submit_uniformly() {
        let field = ConstantField {
            id: SourceId(9),
            weight: 0.25,
            pauli: PauliVector::new(0.0, 0.0, 1.0),
            scope: TermScope::Register(B),
        };
        let mut composer = HamiltonianComposer::new();
        composer.submit_source(&field);
        assert_eq!(composer.compose_for(A), PauliVector::ZERO);
        assert_eq!(composer.compose_for(B), PauliVector::new(0.0, 0.0, 0.25));

        composer.forget_register(B);
        assert!(composer.is_empty());
    }

    struct Storm {
        terms: Vec<HamiltonianTerm>,
    }

    impl HamiltonianSource for Storm {
        fn source_id(&self) -> SourceId {
            SourceId(5)
        }

        fn get_terms(&self) -> Vec<HamiltonianTerm> {
            self.terms.clone()
        }
    }

    #[test]
    fn source_terms_sharing_a_scope_accumulate() {
        let storm = Storm {
            terms: vec![
                HamiltonianTerm::global(SourceId(0), 1.0, PauliVector::new(1.0, 0.0, 0.0)),
                HamiltonianTerm::global(SourceId(0), 1.0, PauliVector::new(0.0, 0.0, 1.0)),
                HamiltonianTerm::local(SourceId(0), A, 2.0, PauliVector::new(0.0, 1.0, 0.0)),
                HamiltonianTerm::local(SourceId(0), A, -0.5, PauliVector::new(0.0, 1.0, 0.0)),
                HamiltonianTerm::global(SourceId(0), f64::INFINITY, PauliVector::new(1.0, 0.0, 0.0)),
            ],
        };
        let mut composer = HamiltonianComposer::new();
        composer.submit_source(&storm);
        assert_eq!(composer.len(), 2);
        assert!(composer.active_terms().all(|t| t.source == SourceId(5)));
        assert_eq!(composer.compose_for(A), PauliVector::new(1.0, 1.5, 1.0));
        assert_eq!(composer.compose_for(B), PauliVector::new(1.0, 0.0, 1.0));

        let calm = Storm {
            terms: vec![HamiltonianTerm::global(SourceId(0), 1.0, PauliVector::new(0.0, 0.0, 3.0))],
        };
        composer.submit_source(&calm);
        assert_eq!(composer.len(), 1);
        assert_eq!(composer.compose_for(A), PauliVector::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn non_finite_terms_are_ignored() {
        let mut composer = HamiltonianComposer::new();
        composer.submit(HamiltonianTerm::global(SourceId(1), f64::NAN, PauliVector::new(1.0, 0.0, 0.0)));
        assert!(composer.is_empty());
    }
}
