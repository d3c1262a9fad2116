//! The engine handle. Hosts own one `QuantumEngine` and refer to registers
//! and components only through the ids it hands out.

use crate::config::EngineConfig;
use crate::core::errors::EngineError;
use crate::core::{BlochState, DensityComponent, utils};
use crate::diagnostics::{CorruptionReport, DiagnosticChannel};
use crate::entanglement::{BellType, ClusterMap, EntanglementOperator, MergePlan};
use crate::hamiltonian::{HamiltonianComposer, HamiltonianSource, HamiltonianTerm, PauliVector, TermScope};
use crate::lindblad::{LindbladEvolver, TemperatureField};
use crate::measure::{MeasurementEngine, MeasurementOutcome};
use crate::registry::{RegisterAllocator, Slot};
use crate::types::{BasisLabels, ComponentId, Pole, RegisterId, SourceId};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Summary of one [`QuantumEngine::tick`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub substeps: usize,
    /// Components that factored back into Bloch states.
    pub dissolved: Vec<ComponentId>,
    /// Components that had to be repaired. The same reports are queued for
    /// [`QuantumEngine::drain_diagnostics`].
    pub repaired: Vec<CorruptionReport>,
}

/// Mutual information between two registers of the same component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairInformation {
    pub a: RegisterId,
    pub b: RegisterId,
    /// I(A:B) in bits.
    pub bits: f64,
}

#[derive(Debug)]
pub struct QuantumEngine {
    config: EngineConfig,
    registry: RegisterAllocator,
    composer: HamiltonianComposer,
    evolver: LindbladEvolver,
    entangler: EntanglementOperator,
    measurer: MeasurementEngine,
    diagnostics: DiagnosticChannel,
    ticks: u64,
}

impl Default for QuantumEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl QuantumEngine {
    pub fn new(config: EngineConfig) -> Self {
        let config = config.sanitized();
        Self {
            registry: RegisterAllocator::new(config.capacity),
            composer: HamiltonianComposer::new(),
            evolver: LindbladEvolver::from_config(&config),
            entangler: EntanglementOperator::new(config.max_cluster_size),
            measurer: MeasurementEngine::new(config.seed),
            diagnostics: DiagnosticChannel::new(),
            ticks: 0,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn register_count(&self) -> usize {
        self.registry.len()
    }

    pub fn component_count(&self) -> usize {
        self.registry.component_count()
    }

    /// Allocates a register at pure north with the given pole labels.
    pub fn allocate_register(
        &mut self,
        north: impl Into<String>,
        south: impl Into<String>,
    ) -> Result<RegisterId, EngineError> {
        let id = self.registry.allocate(BasisLabels::new(north, south))?;
        debug!(register = %id, live = self.registry.len(), "allocated register");
        Ok(id)
    }

    /// Frees a register. A register sharing a component is measured first,
    /// which leaves every other member in a definite Bloch state; that
    /// measurement is returned.
    pub fn release_register(&mut self, id: RegisterId) -> Result<Option<MeasurementOutcome>, EngineError> {
        let outcome = match self.registry.component_of(id)? {
            Some(_) => Some(self.measure(id)?),
            None => None,
        };
        self.registry.remove(id)?;
        self.composer.forget_register(id);
        debug!(register = %id, measured = outcome.is_some(), "released register");
        Ok(outcome)
    }

    /// Sets an unentangled register to the pure state at `(theta, phi)`.
    pub fn prepare_register(&mut self, id: RegisterId, theta: f64, phi: f64) -> Result<(), EngineError> {
        let state = BlochState::new(theta, phi)?;
        *self.registry.bloch_mut(id)? = state;
        Ok(())
    }

    pub fn labels(&self, id: RegisterId) -> Result<&BasisLabels, EngineError> {
        Ok(&self.registry.get(id)?.labels)
    }

    /// Global term for the next tick, replacing `source`'s previous global term.
    pub fn submit_hamiltonian_term(&mut self, source: SourceId, weight: f64, pauli: PauliVector) {
        self.composer.submit(HamiltonianTerm::global(source, weight, pauli));
    }

    /// Term acting on `register` only.
    pub fn submit_local_hamiltonian_term(
        &mut self,
        source: SourceId,
        register: RegisterId,
        weight: f64,
        pauli: PauliVector,
    ) -> Result<(), EngineError> {
        self.registry.get(register)?;
        self.composer
            .submit(HamiltonianTerm::local(source, register, weight, pauli));
        Ok(())
    }

    /// Submits every term of `source`, replacing what it submitted before.
    /// Local terms naming registers that are not live are dropped.
    pub fn submit_source(&mut self, source: &dyn HamiltonianSource) {
        self.composer.submit_source(source);
        let stale: Vec<RegisterId> = self
            .composer
            .active_terms()
            .filter_map(|t| match t.scope {
                TermScope::Register(r) if !self.registry.contains(r) => Some(r),
                _ => None,
            })
            .collect();
        for register in stale {
            self.composer.forget_register(register);
        }
    }

    /// Advances every register by `dt` seconds.
    ///
    /// `dt` is split into substeps no longer than `max_substep`, up to
    /// `max_substeps` of them; longer ticks stretch each substep. Each substep applies the composed unitary, then temperature-scaled
    /// dissipation, then validates every component, repairing and reporting
    /// any that left the physical state space. With a positive
    /// `dissolve_tolerance`, components that end the tick as product states
    /// are dissolved. Submitted terms expire afterwards.
    pub fn tick(&mut self, dt: f64, temperature: &dyn TemperatureField) -> Result<TickReport, EngineError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(EngineError::InvalidTimeStep(dt));
        }
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };

        if dt > 0.0 {
            let wanted = (dt / self.config.max_substep).ceil();
            let substeps = (wanted.min(self.config.max_substeps as f64) as usize).max(1);
            let step = dt / substeps as f64;
            if wanted > substeps as f64 {
                debug!(dt, substeps, step, "tick exceeds substep budget, lengthening steps");
            }
            report.substeps = substeps;

            let ops: BTreeMap<RegisterId, PauliVector> = self
                .registry
                .register_ids()
                .map(|id| (id, self.composer.compose_for(id)))
                .collect();
            let kelvins: BTreeMap<RegisterId, f64> = self
                .registry
                .register_ids()
                .map(|id| (id, temperature.kelvin(id)))
                .collect();

            for _ in 0..substeps {
                self.step_singles(&ops, &kelvins, step)?;
                self.step_components(&ops, &kelvins, step, &mut report.repaired)?;
            }
        }

        report.dissolved = self.dissolve_product_components()?;
        self.composer.expire();

        trace!(
            tick = report.tick,
            substeps = report.substeps,
            components = self.registry.component_count(),
            dissolved = report.dissolved.len(),
            repaired = report.repaired.len(),
            "tick complete"
        );
        Ok(report)
    }

    fn step_singles(
        &mut self,
        ops: &BTreeMap<RegisterId, PauliVector>,
        kelvins: &BTreeMap<RegisterId, f64>,
        dt: f64,
    ) -> Result<(), EngineError> {
        for (id, state) in self.registry.singles_mut() {
            if let Some(h) = ops.get(&id) {
                state.apply_unitary_rotation(h, dt);
            }
            let kelvin = kelvins.get(&id).copied().unwrap_or(0.0);
            self.evolver.apply_to_bloch(state, kelvin, dt)?;
        }
        Ok(())
    }

    fn step_components(
        &mut self,
        ops: &BTreeMap<RegisterId, PauliVector>,
        kelvins: &BTreeMap<RegisterId, f64>,
        dt: f64,
        repaired: &mut Vec<CorruptionReport>,
    ) -> Result<(), EngineError> {
        for cid in self.registry.component_ids() {
            let component = self.registry.component_mut(cid)?;
            let local: Vec<PauliVector> = component
                .registers()
                .iter()
                .map(|r| ops.get(r).copied().unwrap_or(PauliVector::ZERO))
                .collect();
            let temps: Vec<f64> = component
                .registers()
                .iter()
                .map(|r| kelvins.get(r).copied().unwrap_or(0.0))
                .collect();
            component.apply_unitary_rotation(&local, dt)?;
            self.evolver.apply_to_component(component, &temps, dt)?;

            if let Some(report) = self.validate_component(cid)? {
                repaired.push(report);
            }
        }
        Ok(())
    }

    /// Checks a component and repairs it if needed. Fails with
    /// [`EngineError::StateCorruption`] only when the repair itself does not
    /// produce a physical state.
    fn validate_component(&mut self, cid: ComponentId) -> Result<Option<CorruptionReport>, EngineError> {
        let tolerance = self.config.tolerance;
        let component = self.registry.component_mut(cid)?;
        let Err(err) = component.check_physical(tolerance) else {
            return Ok(None);
        };
        let report = CorruptionReport::new(self.ticks, cid, component.registers().to_vec(), &err);
        component.repair();
        if let Err(still) = component.check_physical(tolerance) {
            let failed = CorruptionReport::new(self.ticks, cid, component.registers().to_vec(), &still);
            self.diagnostics.publish(failed.clone());
            return Err(EngineError::StateCorruption(failed));
        }
        self.diagnostics.publish(report.clone());
        Ok(Some(report))
    }

    fn dissolve_product_components(&mut self) -> Result<Vec<ComponentId>, EngineError> {
        let mut dissolved = Vec::new();
        if self.config.dissolve_tolerance <= 0.0 {
            return Ok(dissolved);
        }
        for cid in self.registry.component_ids() {
            let component = self.registry.component(cid)?;
            if component.product_distance()? >= self.config.dissolve_tolerance {
                continue;
            }
            let marginals = component.marginals()?;
            let members = self.registry.dissolve(cid, &marginals)?;
            debug!(component = %cid, registers = members.len(), "dissolved product component");
            dissolved.push(cid);
        }
        Ok(dissolved)
    }

    /// Entangles `a` and `b`.
    ///
    /// Two unentangled registers become a fresh `bell_type` pair. When one of
    /// them already belongs to a component, the other joins that component
    /// through a CNOT from its partner, with `bell_type` fixing the relation
    /// between the two. Returns the component now holding both.
    pub fn entangle_pair(&mut self, a: RegisterId, b: RegisterId, bell_type: BellType) -> Result<ComponentId, EngineError> {
        let plan = self.entangler.merge_plan(
            (a, self.registry.group_size(a)?),
            (b, self.registry.group_size(b)?),
        )?;
        let cid = match plan {
            MergePlan::CreatePair { a, b } => {
                let pair = self.entangler.create_pair(a, b, bell_type)?;
                self.registry.insert_component(pair)?
            }
            MergePlan::UpgradeToCluster { anchor, newcomer } | MergePlan::ExtendCluster { anchor, newcomer } => {
                let cid = self
                    .registry
                    .component_of(anchor)?
                    .ok_or(EngineError::UnknownRegister(anchor))?;
                let state = *self.registry.bloch_mut(newcomer)?;
                let mut component = self.registry.component(cid)?.clone();
                let control = component
                    .position_of(anchor)
                    .ok_or(EngineError::UnknownRegister(anchor))?;
                self.entangler
                    .attach_with_relation(&mut component, newcomer, state, control, bell_type)?;
                self.registry.replace_component(cid, component)?;
                cid
            }
        };
        debug!(%a, %b, %bell_type, component = %cid, ?plan, "entangled registers");
        Ok(cid)
    }

    /// Adds `register` to `component` with a GHZ-style CNOT from the member
    /// at `control_index`.
    pub fn extend_cluster(&mut self, component: ComponentId, register: RegisterId, control_index: usize) -> Result<(), EngineError> {
        self.extend_cluster_with(component, register, control_index, ClusterMap::Ghz)
    }

    /// [`extend_cluster`](Self::extend_cluster) with an explicit entangling map.
    pub fn extend_cluster_with(
        &mut self,
        component: ComponentId,
        register: RegisterId,
        control_index: usize,
        map: ClusterMap,
    ) -> Result<(), EngineError> {
        let mut extended = self.registry.component(component)?.clone();
        let state = *self.registry.bloch_mut(register)?;
        self.entangler
            .extend_cluster(&mut extended, register, state, control_index, map)?;
        let size = extended.num_qubits();
        self.registry.replace_component(component, extended)?;
        debug!(%component, %register, control_index, ?map, size, "extended cluster");
        Ok(())
    }

    /// Measures `register` in the pole basis.
    ///
    /// If the register shares a component, every member is measured in the
    /// same call and the component is replaced by definite Bloch states.
    pub fn measure(&mut self, register: RegisterId) -> Result<MeasurementOutcome, EngineError> {
        let slot = self.registry.get(register)?.slot;
        let (purity_at_measurement, collapsed) = match slot {
            Slot::Single(state) => {
                let purity = state.purity();
                let pole = self.measurer.measure_bloch(self.registry.bloch_mut(register)?);
                (purity, vec![(register, pole)])
            }
            Slot::Entangled(cid) => {
                self.validate_component(cid)?;
                let component = self.registry.component_mut(cid)?;
                let position = component
                    .position_of(register)
                    .ok_or(EngineError::UnknownRegister(register))?;
                let purity = utils::purity(&component.reduced_state(position)?);
                let collapsed = self.measurer.measure_cascade(component, position)?;
                let states: Vec<BlochState> = component
                    .registers()
                    .iter()
                    .map(|r| {
                        collapsed
                            .iter()
                            .find(|(id, _)| id == r)
                            .map_or(BlochState::north(), |(_, pole)| BlochState::at_pole(*pole))
                    })
                    .collect();
                self.registry.dissolve(cid, &states)?;
                (purity, collapsed)
            }
        };

        let outcome = collapsed[0].1;
        let label = self.registry.get(register)?.labels.label(outcome).to_string();
        debug!(%register, %outcome, cascade = collapsed.len(), "measured register");
        Ok(MeasurementOutcome {
            register,
            outcome,
            label,
            purity_at_measurement,
            collapsed,
        })
    }

    /// Bloch state of `register`, the marginal if it is entangled.
    pub fn query_bloch(&self, register: RegisterId) -> Result<BlochState, EngineError> {
        match self.registry.get(register)?.slot {
            Slot::Single(state) => Ok(state),
            Slot::Entangled(cid) => {
                let (component, position) = self.locate(cid, register)?;
                Ok(component.marginal(position)?)
            }
        }
    }

    pub fn query_probability(&self, register: RegisterId, pole: Pole) -> Result<f64, EngineError> {
        match self.registry.get(register)?.slot {
            Slot::Single(state) => Ok(state.probability(pole)),
            Slot::Entangled(cid) => {
                let (component, position) = self.locate(cid, register)?;
                Ok(component.marginal_probability(position, pole)?)
            }
        }
    }

    /// 0 for a fully mixed or definite register, 1 for a pure equator state.
    pub fn query_coherence(&self, register: RegisterId) -> Result<f64, EngineError> {
        Ok(self.query_bloch(register)?.coherence())
    }

    /// Tr(ρ²) of the register's reduced state.
    pub fn query_purity(&self, register: RegisterId) -> Result<f64, EngineError> {
        match self.registry.get(register)?.slot {
            Slot::Single(state) => Ok(state.purity()),
            Slot::Entangled(cid) => {
                let (component, position) = self.locate(cid, register)?;
                Ok(utils::purity(&component.reduced_state(position)?))
            }
        }
    }

    /// I(A:B) in bits; 0 for registers in different components.
    pub fn query_mutual_information(&self, a: RegisterId, b: RegisterId) -> Result<f64, EngineError> {
        let ca = self.registry.component_of(a)?;
        let cb = self.registry.component_of(b)?;
        match (ca, cb) {
            (Some(x), Some(y)) if x == y => {
                let component = self.registry.component(x)?;
                let pa = component.position_of(a).ok_or(EngineError::UnknownRegister(a))?;
                let pb = component.position_of(b).ok_or(EngineError::UnknownRegister(b))?;
                Ok(component.mutual_information(pa, pb)?)
            }
            (None, None) if a == b => {
                let state = self.query_bloch(a)?;
                Ok(utils::von_neumann_entropy(&state.to_density_matrix()))
            }
            _ => Ok(0.0),
        }
    }

    pub fn component_of(&self, register: RegisterId) -> Result<Option<ComponentId>, EngineError> {
        self.registry.component_of(register)
    }

    pub fn component_members(&self, component: ComponentId) -> Result<Vec<RegisterId>, EngineError> {
        Ok(self.registry.component(component)?.registers().to_vec())
    }

    /// Every live register mapped to the registers it shares a component
    /// with. Unentangled registers map to an empty list.
    pub fn export_entanglement_graph(&self) -> BTreeMap<RegisterId, Vec<RegisterId>> {
        let mut graph: BTreeMap<RegisterId, Vec<RegisterId>> =
            self.registry.register_ids().map(|id| (id, Vec::new())).collect();
        for (_, component) in self.registry.components() {
            for &member in component.registers() {
                let partners = component
                    .registers()
                    .iter()
                    .copied()
                    .filter(|&r| r != member)
                    .collect();
                graph.insert(member, partners);
            }
        }
        graph
    }

    /// Mutual information of every pair of registers sharing a component.
    pub fn export_mutual_information(&self) -> Result<Vec<PairInformation>, EngineError> {
        let mut pairs = Vec::new();
        for (_, component) in self.registry.components() {
            let members = component.registers();
            for i in 0..members.len() {
                for j in (i + 1)..members.len() {
                    pairs.push(PairInformation {
                        a: members[i],
                        b: members[j],
                        bits: component.mutual_information(i, j)?,
                    });
                }
            }
        }
        Ok(pairs)
    }

    /// Takes every corruption report produced since the last drain.
    pub fn drain_diagnostics(&mut self) -> Vec<CorruptionReport> {
        self.diagnostics.drain()
    }

    fn locate(&self, cid: ComponentId, register: RegisterId) -> Result<(&DensityComponent, usize), EngineError> {
        let component = self.registry.component(cid)?;
        let position = component
            .position_of(register)
            .ok_or(EngineError::UnknownRegister(register))?;
        Ok((component, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CorruptionKind;
    use crate::lindblad::UniformTemperature;
    use num_complex::Complex64;
    use std::f64::consts::FRAC_PI_2;

    fn engine() -> QuantumEngine {
        QuantumEngine::new(EngineConfig::new().with_seed(7))
    }

    #[test]
    fn corrupted_component_is_repaired_and_reported() {
        let mut e = engine();
        let a = e.allocate_register("n", "s").unwrap();
        let b = e.allocate_register("n", "s").unwrap();
        let cid = e.entangle_pair(a, b, BellType::PhiPlus).unwrap();

        {
            let component = e.registry.component_mut(cid).unwrap();
            let rho = component.density_matrix_mut();
            rho.fill(Complex64::new(0.0, 0.0));
            rho[[0, 0]] = Complex64::new(1.2, 0.0);
            rho[[1, 1]] = Complex64::new(-0.2, 0.0);
        }

        let report = e.tick(0.01, &UniformTemperature(0.0)).unwrap();
        assert_eq!(report.repaired.len(), 1);
        assert_eq!(report.repaired[0].kind, CorruptionKind::NegativeEigenvalue);
        assert_eq!(report.repaired[0].registers, vec![a, b]);

        let drained = e.drain_diagnostics();
        assert_eq!(drained, report.repaired);
        assert!(e.drain_diagnostics().is_empty());

        assert_eq!(e.component_of(a).unwrap(), Some(cid));
        assert!(e.registry.component(cid).unwrap().check_physical(1e-9).is_ok());
        let p = e.query_probability(a, Pole::North).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn subcycling_splits_long_ticks() {
        let mut e = QuantumEngine::new(EngineConfig::new().with_seed(1).with_max_substep(0.1));
        e.allocate_register("n", "s").unwrap();
        let report = e.tick(0.35, &UniformTemperature(300.0)).unwrap();
        assert_eq!(report.substeps, 4);
        assert_eq!(report.tick, 1);
        assert_eq!(e.tick(0.0, &UniformTemperature(300.0)).unwrap().substeps, 0);
    }

    #[test]
    fn long_ticks_stay_within_the_substep_budget() {
        let mut e = engine();
        e.allocate_register("n", "s").unwrap();
        assert_eq!(e.tick(1e5, &UniformTemperature(300.0)).unwrap().substeps, 1000);

        let mut e = QuantumEngine::new(EngineConfig::new().with_seed(2).with_max_substeps(50));
        let a = e.allocate_register("n", "s").unwrap();
        let b = e.allocate_register("n", "s").unwrap();
        let single = e.allocate_register("n", "s").unwrap();
        e.prepare_register(single, FRAC_PI_2, 0.0).unwrap();
        let cid = e.entangle_pair(a, b, BellType::PsiPlus).unwrap();

        e.submit_hamiltonian_term(SourceId(1), 0.7, PauliVector::new(0.0, 1.0, 0.0));
        let report = e.tick(1e12, &UniformTemperature(300.0)).unwrap();
        assert_eq!(report.substeps, 50);
        assert!(report.repaired.is_empty());
        assert!(e.registry.component(cid).unwrap().check_physical(1e-9).is_ok());
        for r in [a, b, single] {
            assert!((e.query_probability(r, Pole::North).unwrap() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn terms_expire_after_a_tick() {
        let mut e = engine();
        let a = e.allocate_register("n", "s").unwrap();
        e.submit_hamiltonian_term(SourceId(1), 1.0, PauliVector::new(1.0, 0.0, 0.0));
        // rotation angle 2|h|dt = π/2 carries north to the equator
        e.tick(FRAC_PI_2 / 2.0, &UniformTemperature(0.0)).unwrap();
        let after_first = e.query_probability(a, Pole::North).unwrap();
        assert!((after_first - 0.5).abs() < 1e-9);

        e.tick(FRAC_PI_2 / 2.0, &UniformTemperature(0.0)).unwrap();
        let after_second = e.query_probability(a, Pole::North).unwrap();
        assert!((after_second - after_first).abs() < 1e-12);
    }

    #[test]
    fn local_terms_touch_only_their_register() {
        let mut e = engine();
        let a = e.allocate_register("n", "s").unwrap();
        let b = e.allocate_register("n", "s").unwrap();
        e.submit_local_hamiltonian_term(SourceId(3), b, 1.0, PauliVector::new(0.0, 1.0, 0.0))
            .unwrap();
        e.tick(FRAC_PI_2, &UniformTemperature(0.0)).unwrap();
        assert!((e.query_probability(a, Pole::North).unwrap() - 1.0).abs() < 1e-12);
        assert!((e.query_probability(b, Pole::South).unwrap() - 1.0).abs() < 1e-9);
        assert!(matches!(
            e.submit_local_hamiltonian_term(SourceId(3), RegisterId(99), 1.0, PauliVector::ZERO),
            Err(EngineError::UnknownRegister(_))
        ));
    }

    #[test]
    fn invalid_time_steps_are_rejected() {
        let mut e = engine();
        assert!(matches!(
            e.tick(-1.0, &UniformTemperature(300.0)),
            Err(EngineError::InvalidTimeStep(_))
        ));
        assert!(matches!(
            e.tick(f64::INFINITY, &UniformTemperature(300.0)),
            Err(EngineError::InvalidTimeStep(_))
        ));
        assert_eq!(e.ticks(), 0);
    }

    #[test]
    fn prepare_rejects_entangled_registers() {
        let mut e = engine();
        let a = e.allocate_register("n", "s").unwrap();
        let b = e.allocate_register("n", "s").unwrap();
        e.prepare_register(a, FRAC_PI_2, 0.0).unwrap();
        assert!((e.query_coherence(a).unwrap() - 1.0).abs() < 1e-12);
        e.entangle_pair(a, b, BellType::PhiPlus).unwrap();
        assert!(matches!(
            e.prepare_register(a, 0.0, 0.0),
            Err(EngineError::AlreadyEntangled(_))
        ));
    }

    #[test]
    fn joining_a_pair_builds_a_cluster() {
        let mut e = engine();
        let a = e.allocate_register("n", "s").unwrap();
        let b = e.allocate_register("n", "s").unwrap();
        let c = e.allocate_register("n", "s").unwrap();
        let cid = e.entangle_pair(a, b, BellType::PhiPlus).unwrap();
        assert_eq!(e.entangle_pair(c, b, BellType::PsiPlus).unwrap(), cid);
        assert_eq!(e.component_members(cid).unwrap(), vec![a, b, c]);

        let outcome = e.measure(b).unwrap();
        assert_eq!(outcome.outcome_of(a), Some(outcome.outcome));
        assert_eq!(outcome.outcome_of(c), Some(outcome.outcome.opposite()));
        assert_eq!(e.component_count(), 0);
    }

    #[test]
    fn entanglement_graph_and_information() {
        let mut e = engine();
        let a = e.allocate_register("n", "s").unwrap();
        let b = e.allocate_register("n", "s").unwrap();
        let c = e.allocate_register("n", "s").unwrap();
        e.entangle_pair(a, b, BellType::PhiMinus).unwrap();

        let graph = e.export_entanglement_graph();
        assert_eq!(graph[&a], vec![b]);
        assert_eq!(graph[&b], vec![a]);
        assert!(graph[&c].is_empty());

        assert!((e.query_mutual_information(a, b).unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(e.query_mutual_information(a, c).unwrap(), 0.0);
        let pairs = e.export_mutual_information().unwrap();
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].bits - 2.0).abs() < 1e-9);
        assert!((e.query_purity(a).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn dissipation_dissolves_a_relaxed_pair() {
        let mut e = QuantumEngine::new(
            EngineConfig::new()
                .with_seed(3)
                .with_rates(50.0, 50.0)
                .with_dissolve_tolerance(1e-8),
        );
        let a = e.allocate_register("n", "s").unwrap();
        let b = e.allocate_register("n", "s").unwrap();
        let cid = e.entangle_pair(a, b, BellType::PhiPlus).unwrap();

        let mut dissolved = Vec::new();
        for _ in 0..20 {
            dissolved.extend(e.tick(0.1, &UniformTemperature(300.0)).unwrap().dissolved);
        }
        assert_eq!(dissolved, vec![cid]);
        assert_eq!(e.component_of(a).unwrap(), None);
        assert!(e.query_probability(b, Pole::North).unwrap() > 0.999);
    }
}
