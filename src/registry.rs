//! Flat arena tables for registers and components.
//!
//! Registers point at their component by id and components list their members
//! by id; nothing holds a reference into another table.

use crate::core::errors::{EngineError, StateError};
use crate::core::{BlochState, DensityComponent};
use crate::types::{BasisLabels, ComponentId, RegisterId};
use std::collections::BTreeMap;

/// Where a register's state lives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    /// Unentangled; the register owns its Bloch state.
    Single(BlochState),
    /// Member of a multi-register component.
    Entangled(ComponentId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    pub id: RegisterId,
    pub labels: BasisLabels,
    pub slot: Slot,
}

impl Register {
    pub fn component(&self) -> Option<ComponentId> {
        match self.slot {
            Slot::Single(_) => None,
            Slot::Entangled(c) => Some(c),
        }
    }
}

/// Bounded pool of registers plus the component table.
///
/// Ids are never reused, so a stale id held by the host resolves to
/// [`EngineError::UnknownRegister`] instead of aliasing a newer register.
#[derive(Debug, Clone)]
pub struct RegisterAllocator {
    capacity: usize,
    next_register: u32,
    next_component: u64,
    registers: BTreeMap<RegisterId, Register>,
    components: BTreeMap<ComponentId, DensityComponent>,
}

impl RegisterAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_register: 0,
            next_component: 0,
            registers: BTreeMap::new(),
            components: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// New register at pure north.
    pub fn allocate(&mut self, labels: BasisLabels) -> Result<RegisterId, EngineError> {
        if self.registers.len() >= self.capacity {
            return Err(EngineError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let id = RegisterId(self.next_register);
        self.next_register = self
            .next_register
            .checked_add(1)
            .ok_or(EngineError::CapacityExceeded {
                capacity: self.capacity,
            })?;
        self.registers.insert(
            id,
            Register {
                id,
                labels,
                slot: Slot::Single(BlochState::north()),
            },
        );
        Ok(id)
    }

    /// Removes an unentangled register.
    pub fn remove(&mut self, id: RegisterId) -> Result<Register, EngineError> {
        if self.get(id)?.component().is_some() {
            return Err(EngineError::AlreadyEntangled(id));
        }
        self.registers.remove(&id).ok_or(EngineError::UnknownRegister(id))
    }

    pub fn get(&self, id: RegisterId) -> Result<&Register, EngineError> {
        self.registers.get(&id).ok_or(EngineError::UnknownRegister(id))
    }

    pub fn contains(&self, id: RegisterId) -> bool {
        self.registers.contains_key(&id)
    }

    pub fn register_ids(&self) -> impl Iterator<Item = RegisterId> + '_ {
        self.registers.keys().copied()
    }

    pub fn registers(&self) -> impl Iterator<Item = &Register> {
        self.registers.values()
    }

    /// Bloch states of every unentangled register.
    pub fn singles_mut(&mut self) -> impl Iterator<Item = (RegisterId, &mut BlochState)> {
        self.registers.values_mut().filter_map(|r| match &mut r.slot {
            Slot::Single(state) => Some((r.id, state)),
            Slot::Entangled(_) => None,
        })
    }

    /// Mutable Bloch state of an unentangled register.
    pub fn bloch_mut(&mut self, id: RegisterId) -> Result<&mut BlochState, EngineError> {
        let register = self
            .registers
            .get_mut(&id)
            .ok_or(EngineError::UnknownRegister(id))?;
        match &mut register.slot {
            Slot::Single(state) => Ok(state),
            Slot::Entangled(_) => Err(EngineError::AlreadyEntangled(id)),
        }
    }

    pub fn component_of(&self, id: RegisterId) -> Result<Option<ComponentId>, EngineError> {
        Ok(self.get(id)?.component())
    }

    /// Number of registers sharing a state with `id`, itself included.
    pub fn group_size(&self, id: RegisterId) -> Result<usize, EngineError> {
        match self.component_of(id)? {
            None => Ok(1),
            Some(c) => Ok(self.component(c)?.num_qubits()),
        }
    }

    pub fn component(&self, id: ComponentId) -> Result<&DensityComponent, EngineError> {
        self.components.get(&id).ok_or(EngineError::UnknownComponent(id))
    }

    pub fn component_mut(&mut self, id: ComponentId) -> Result<&mut DensityComponent, EngineError> {
        self.components
            .get_mut(&id)
            .ok_or(EngineError::UnknownComponent(id))
    }

    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &DensityComponent)> {
        self.components.iter().map(|(id, c)| (*id, c))
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components.keys().copied().collect()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Stores a new component and points all its members at it.
    pub fn insert_component(&mut self, component: DensityComponent) -> Result<ComponentId, EngineError> {
        for &member in component.registers() {
            self.get(member)?;
        }
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        self.bind_members(id, &component);
        self.components.insert(id, component);
        Ok(id)
    }

    /// Swaps the matrix of an existing component, re-pointing any members
    /// the new one gained.
    pub fn replace_component(&mut self, id: ComponentId, component: DensityComponent) -> Result<(), EngineError> {
        if !self.components.contains_key(&id) {
            return Err(EngineError::UnknownComponent(id));
        }
        for &member in component.registers() {
            self.get(member)?;
        }
        self.bind_members(id, &component);
        self.components.insert(id, component);
        Ok(())
    }

    fn bind_members(&mut self, id: ComponentId, component: &DensityComponent) {
        for member in component.registers() {
            if let Some(register) = self.registers.get_mut(member) {
                register.slot = Slot::Entangled(id);
            }
        }
    }

    /// Removes a component, handing each member back its own Bloch state.
    /// `states[i]` belongs to the component's `i`-th register.
    pub fn dissolve(&mut self, id: ComponentId, states: &[BlochState]) -> Result<Vec<RegisterId>, EngineError> {
        let component = self.component(id)?;
        if states.len() != component.num_qubits() {
            return Err(EngineError::State(StateError::DimensionMismatch {
                expected: component.num_qubits(),
                got_rows: states.len(),
                got_cols: 0,
            }));
        }
        let component = self
            .components
            .remove(&id)
            .ok_or(EngineError::UnknownComponent(id))?;
        let members = component.registers().to_vec();
        for (member, state) in members.iter().zip(states) {
            if let Some(register) = self.registers.get_mut(member) {
                register.slot = Slot::Single(*state);
            }
        }
        Ok(members)
    }
}
