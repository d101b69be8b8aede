//! CAN-Bus mit den angeschlossenen Node-Interfaces.

use super::entity::{impl_entity, Base};
use super::error::ValidationError;
use super::ids::EntityKind;
use super::node::InterfaceRef;
use serde::{Deserialize, Serialize};

/// Unterstützte Baudraten in Bit/s
pub const SUPPORTED_BAUDRATES: [u32; 6] = [50_000, 100_000, 125_000, 250_000, 500_000, 1_000_000];

/// Protokollvariante des Busses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusType {
    /// CAN 2.0A, 11-Bit-Identifier
    #[default]
    Can2A,
    /// CAN 2.0B, 29-Bit-Identifier
    Can2B,
}

impl BusType {
    /// Größte zulässige CAN-ID
    pub fn max_can_id(self) -> u32 {
        match self {
            BusType::Can2A => 0x7FF,
            BusType::Can2B => 0x1FFF_FFFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub base: Base,
    pub bus_type: BusType,
    /// Baudrate in Bit/s
    pub baudrate: u32,
    /// Angeschlossene Interfaces (schwache Referenzen über Node-ID + Nummer)
    pub interfaces: Vec<InterfaceRef>,
}

impl_entity!(Bus, EntityKind::Bus);

impl Bus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: Base::new(name),
            bus_type: BusType::default(),
            baudrate: 500_000,
            interfaces: Vec::new(),
        }
    }

    pub fn set_baudrate(&mut self, baudrate: u32) -> Result<(), ValidationError> {
        if !SUPPORTED_BAUDRATES.contains(&baudrate) {
            return Err(ValidationError::InvalidBaudrate(baudrate));
        }
        self.baudrate = baudrate;
        Ok(())
    }

    /// Schließt ein Interface an (optional an fester Position).
    pub fn attach(
        &mut self,
        interface: InterfaceRef,
        index: Option<usize>,
    ) -> Result<(), ValidationError> {
        if self.interfaces.contains(&interface) {
            return Err(ValidationError::AlreadyAttached {
                node: interface.node,
                number: interface.number,
            });
        }
        let index = index
            .unwrap_or(self.interfaces.len())
            .min(self.interfaces.len());
        self.interfaces.insert(index, interface);
        Ok(())
    }

    /// Trennt ein Interface und liefert seine bisherige Position.
    pub fn detach(&mut self, interface: InterfaceRef) -> Option<usize> {
        let index = self.interfaces.iter().position(|i| *i == interface)?;
        self.interfaces.remove(index);
        Some(index)
    }
}
