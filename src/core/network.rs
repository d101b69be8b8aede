//! Netzwerk-Wurzel: hält die Reihenfolge der Busse.

use super::entity::{impl_entity, Base};
use super::ids::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};

/// Wurzel des Modells. Nodes und Kataloge leben nur in ihren Pools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub base: Base,
    /// Bus-IDs in Anzeigereihenfolge
    pub buses: Vec<EntityId>,
}

impl_entity!(Network, EntityKind::Network);

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: Base::new(name),
            buses: Vec::new(),
        }
    }

    /// Fügt einen Bus an `index` ein (geklemmt auf das Listenende).
    pub fn insert_bus(&mut self, index: usize, bus_id: EntityId) {
        if self.buses.contains(&bus_id) {
            return;
        }
        let index = index.min(self.buses.len());
        self.buses.insert(index, bus_id);
    }

    /// Entfernt einen Bus und liefert seine bisherige Position.
    pub fn remove_bus(&mut self, bus_id: EntityId) -> Option<usize> {
        let index = self.buses.iter().position(|id| *id == bus_id)?;
        self.buses.remove(index);
        Some(index)
    }
}
