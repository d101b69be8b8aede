//! Domänenregeln, die mehrere Entities betreffen.
//!
//! Der Aufrufer sammelt die relevanten Werte (z.B. alle CAN-IDs eines Busses),
//! die Regel entscheidet.

use super::bus::BusType;
use super::error::ValidationError;

pub fn ensure_unique_node_id(
    taken: impl IntoIterator<Item = u32>,
    node_id: u32,
) -> Result<(), ValidationError> {
    if taken.into_iter().any(|id| id == node_id) {
        return Err(ValidationError::DuplicateNodeId(node_id));
    }
    Ok(())
}

pub fn ensure_unique_message_id(
    taken: impl IntoIterator<Item = u32>,
    message_id: u32,
) -> Result<(), ValidationError> {
    if taken.into_iter().any(|id| id == message_id) {
        return Err(ValidationError::DuplicateMessageId(message_id));
    }
    Ok(())
}

/// CAN-ID muss im Bereich des Bustyps liegen und auf dem Bus frei sein.
pub fn ensure_can_id_available(
    bus_type: BusType,
    taken: impl IntoIterator<Item = u32>,
    can_id: u32,
) -> Result<(), ValidationError> {
    let max = bus_type.max_can_id();
    if can_id > max {
        return Err(ValidationError::CanIdOutOfRange { can_id, max });
    }
    if taken.into_iter().any(|id| id == can_id) {
        return Err(ValidationError::DuplicateCanId(can_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_id_range_depends_on_bus_type() {
        assert_eq!(
            ensure_can_id_available(BusType::Can2A, [], 0x800),
            Err(ValidationError::CanIdOutOfRange {
                can_id: 0x800,
                max: 0x7FF
            })
        );
        assert!(ensure_can_id_available(BusType::Can2B, [], 0x800).is_ok());
        assert_eq!(
            ensure_can_id_available(BusType::Can2B, [0x10, 0x800], 0x800),
            Err(ValidationError::DuplicateCanId(0x800))
        );
    }
}
