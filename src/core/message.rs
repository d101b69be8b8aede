//! CAN-Message, gesendet von genau einem Node-Interface.

use super::entity::{impl_entity, Base};
use super::error::ValidationError;
use super::ids::EntityKind;
use super::node::InterfaceRef;
use super::payload::Payload;
use serde::{Deserialize, Serialize};

/// Bits der Node-ID in der Standard-CAN-ID
pub const NODE_ID_BITS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SendType {
    #[default]
    Unspecified,
    Cyclic,
    CyclicIfActive,
    CyclicAndTriggered,
    Triggered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub base: Base,
    /// Message-ID, eindeutig pro Interface
    pub message_id: u32,
    /// Fest vergebene CAN-ID statt der abgeleiteten
    pub static_can_id: Option<u32>,
    /// Sendendes Interface
    pub sender: InterfaceRef,
    pub byte_order: ByteOrder,
    /// Zykluszeit in ms
    pub cycle_time: u32,
    pub send_type: SendType,
    /// Sendeverzögerung in ms
    pub delay_time: u32,
    /// Startverzögerung in ms
    pub start_delay_time: u32,
    pub payload: Payload,
}

impl_entity!(Message, EntityKind::Message);

impl Message {
    pub fn new(
        name: impl Into<String>,
        message_id: u32,
        sender: InterfaceRef,
        size_byte: u16,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            base: Base::new(name),
            message_id,
            static_can_id: None,
            sender,
            byte_order: ByteOrder::default(),
            cycle_time: 0,
            send_type: SendType::default(),
            delay_time: 0,
            start_delay_time: 0,
            payload: Payload::new(size_byte)?,
        })
    }

    /// Effektive CAN-ID: statisch vergeben oder aus Message-ID und Node-ID abgeleitet.
    pub fn can_id(&self, node_id: u32) -> u32 {
        self.static_can_id
            .unwrap_or_else(|| default_can_id(self.message_id, node_id))
    }
}

/// Abgeleitete CAN-ID: Message-ID in den oberen Bits, Node-ID in den unteren.
pub fn default_can_id(message_id: u32, node_id: u32) -> u32 {
    (message_id << NODE_ID_BITS) | (node_id & ((1 << NODE_ID_BITS) - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::EntityId;

    #[test]
    fn test_can_id_prefers_static_id() {
        let sender = InterfaceRef {
            node: EntityId::generate(),
            number: 0,
        };
        let mut message = Message::new("status", 0x10, sender, 8).expect("Message erwartet");
        assert_eq!(message.can_id(3), 0x103);

        message.static_can_id = Some(0x7AB);
        assert_eq!(message.can_id(3), 0x7AB);
    }
}
