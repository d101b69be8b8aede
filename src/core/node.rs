//! ECU-Node mit nummerierten Interfaces.

use super::entity::{impl_entity, Base};
use super::error::ValidationError;
use super::ids::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};

/// Schwache Referenz auf ein Node-Interface (Node-ID + Interface-Nummer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceRef {
    pub node: EntityId,
    pub number: u8,
}

/// Ein Interface eines Nodes. Hängt an höchstens einem Bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInterface {
    pub number: u8,
    /// Bus, an dem das Interface hängt
    pub bus: Option<EntityId>,
    /// Gesendete Messages in Anzeigereihenfolge
    pub messages: Vec<EntityId>,
}

impl NodeInterface {
    pub fn new(number: u8) -> Self {
        Self {
            number,
            bus: None,
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub base: Base,
    /// Numerische Node-ID (Teil der Standard-CAN-ID)
    pub node_id: u32,
    /// Interfaces, aufsteigend nach Nummer
    pub interfaces: Vec<NodeInterface>,
}

impl_entity!(Node, EntityKind::Node);

impl Node {
    /// Neuer Node mit Interface 0
    pub fn new(name: impl Into<String>, node_id: u32) -> Self {
        Self {
            base: Base::new(name),
            node_id,
            interfaces: vec![NodeInterface::new(0)],
        }
    }

    pub fn interface(&self, number: u8) -> Result<&NodeInterface, ValidationError> {
        self.interfaces
            .iter()
            .find(|i| i.number == number)
            .ok_or(ValidationError::UnknownInterface(number))
    }

    pub fn interface_mut(&mut self, number: u8) -> Result<&mut NodeInterface, ValidationError> {
        self.interfaces
            .iter_mut()
            .find(|i| i.number == number)
            .ok_or(ValidationError::UnknownInterface(number))
    }

    /// Referenz auf eines der eigenen Interfaces
    pub fn interface_ref(&self, number: u8) -> InterfaceRef {
        InterfaceRef {
            node: self.base.id,
            number,
        }
    }

    /// Kleinste freie Interface-Nummer
    pub fn next_interface_number(&self) -> u8 {
        (0..=u8::MAX)
            .find(|n| self.interfaces.iter().all(|i| i.number != *n))
            .unwrap_or(u8::MAX)
    }

    /// Fügt ein Interface sortiert nach Nummer ein.
    pub fn insert_interface(&mut self, interface: NodeInterface) -> Result<(), ValidationError> {
        if self.interfaces.iter().any(|i| i.number == interface.number) {
            return Err(ValidationError::DuplicateInterface(interface.number));
        }
        let index = self
            .interfaces
            .iter()
            .position(|i| i.number > interface.number)
            .unwrap_or(self.interfaces.len());
        self.interfaces.insert(index, interface);
        Ok(())
    }

    /// Entfernt ein freies Interface (nicht angeschlossen, ohne Messages).
    pub fn remove_interface(&mut self, number: u8) -> Result<NodeInterface, ValidationError> {
        let interface = self.interface(number)?;
        if interface.bus.is_some() {
            return Err(ValidationError::InterfaceAttached(number));
        }
        if !interface.messages.is_empty() {
            return Err(ValidationError::InterfaceHasMessages(number));
        }
        let index = self
            .interfaces
            .iter()
            .position(|i| i.number == number)
            .ok_or(ValidationError::UnknownInterface(number))?;
        Ok(self.interfaces.remove(index))
    }

    /// Alle Messages über alle Interfaces
    pub fn message_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.interfaces.iter().flat_map(|i| i.messages.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_interface_refuses_attached_interface() {
        let mut node = Node::new("ecu", 1);
        node.interface_mut(0).expect("Interface 0 erwartet").bus = Some(EntityId::generate());

        assert_eq!(
            node.remove_interface(0),
            Err(ValidationError::InterfaceAttached(0))
        );
        assert_eq!(node.interfaces.len(), 1);
    }

    #[test]
    fn test_insert_interface_keeps_numbers_sorted() {
        let mut node = Node::new("ecu", 1);
        node.insert_interface(NodeInterface::new(2))
            .expect("Interface 2 erwartet");
        node.insert_interface(NodeInterface::new(1))
            .expect("Interface 1 erwartet");

        let numbers: Vec<u8> = node.interfaces.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        assert_eq!(node.next_interface_number(), 3);
    }
}
