//! Bit-Layout einer Message: zusammenhängende, überlappungsfreie Signal-Slots.

use super::error::ValidationError;
use super::ids::EntityId;
use serde::{Deserialize, Serialize};

/// Größte zulässige Payload (CAN FD) in Byte
pub const MAX_SIZE_BYTE: u16 = 64;
/// Größte zulässige Signalbreite in Bit
pub const MAX_SIGNAL_SIZE: u16 = 64;

/// Belegter Bitbereich `[start, start + size)` eines Signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub signal: EntityId,
    pub start: u16,
    pub size: u16,
}

impl Slot {
    pub fn end(&self) -> u16 {
        self.start + self.size
    }
}

/// Payload einer Message.
///
/// Invariante: Slots sind nach `start` sortiert, paarweise disjunkt und liegen
/// vollständig innerhalb von `size_byte * 8` Bit. Jede Mutation prüft die
/// Invariante vorab und ändert bei einem Fehler nichts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    size_byte: u16,
    slots: Vec<Slot>,
}

impl Payload {
    pub fn new(size_byte: u16) -> Result<Self, ValidationError> {
        validate_size_byte(size_byte)?;
        Ok(Self {
            size_byte,
            slots: Vec::new(),
        })
    }

    pub fn size_byte(&self) -> u16 {
        self.size_byte
    }

    /// Breite in Bit
    pub fn width(&self) -> u16 {
        self.size_byte * 8
    }

    /// Slots sortiert nach Startbit
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, signal: EntityId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.signal == signal)
    }

    /// Index des Signals in der Startbit-Reihenfolge
    pub fn position(&self, signal: EntityId) -> Option<usize> {
        self.slots.iter().position(|s| s.signal == signal)
    }

    pub fn used_bits(&self) -> u16 {
        self.slots.iter().map(|s| s.size).sum()
    }

    /// Freie Bits hinter dem letzten Signal
    pub fn trailing_bits(&self) -> u16 {
        self.width() - self.slots.last().map_or(0, Slot::end)
    }

    /// Lücken als `(start, size)` in aufsteigender Reihenfolge.
    pub fn holes(&self) -> Vec<(u16, u16)> {
        let mut holes = Vec::new();
        let mut cursor = 0;
        for slot in &self.slots {
            if slot.start > cursor {
                holes.push((cursor, slot.start - cursor));
            }
            cursor = slot.end();
        }
        if cursor < self.width() {
            holes.push((cursor, self.width() - cursor));
        }
        holes
    }

    /// Größte Lücke; bei Gleichstand die vorderste.
    pub fn largest_hole(&self) -> Option<(u16, u16)> {
        self.holes()
            .into_iter()
            .fold(None, |best: Option<(u16, u16)>, hole| match best {
                Some(b) if b.1 >= hole.1 => Some(b),
                _ => Some(hole),
            })
    }

    /// Platziert ein Signal bei `start`.
    pub fn insert(&mut self, signal: EntityId, start: u16, size: u16) -> Result<(), ValidationError> {
        if self.slot(signal).is_some() {
            return Err(ValidationError::SignalAlreadyPlaced(signal));
        }
        self.check_free(start, size, None)?;
        let index = self
            .slots
            .iter()
            .position(|s| s.start > start)
            .unwrap_or(self.slots.len());
        self.slots.insert(index, Slot {
            signal,
            start,
            size,
        });
        Ok(())
    }

    pub fn remove(&mut self, signal: EntityId) -> Result<Slot, ValidationError> {
        let index = self
            .position(signal)
            .ok_or(ValidationError::SignalNotInPayload(signal))?;
        Ok(self.slots.remove(index))
    }

    /// Verschiebt ein Signal um `amount` Bit nach links.
    pub fn shift_left(&mut self, signal: EntityId, amount: u16) -> Result<(), ValidationError> {
        let slot = *self
            .slot(signal)
            .ok_or(ValidationError::SignalNotInPayload(signal))?;
        let start = slot
            .start
            .checked_sub(amount)
            .ok_or(ValidationError::SignalOutOfBounds {
                start: 0,
                end: slot.size,
                width: self.width(),
            })?;
        self.move_slot(signal, start)
    }

    /// Verschiebt ein Signal um `amount` Bit nach rechts.
    pub fn shift_right(&mut self, signal: EntityId, amount: u16) -> Result<(), ValidationError> {
        let slot = *self
            .slot(signal)
            .ok_or(ValidationError::SignalNotInPayload(signal))?;
        self.move_slot(signal, slot.start.saturating_add(amount))
    }

    /// Ändert die Breite eines Signals bei gleichem Startbit. Liefert die alte Breite.
    pub fn resize(&mut self, signal: EntityId, size: u16) -> Result<u16, ValidationError> {
        let slot = *self
            .slot(signal)
            .ok_or(ValidationError::SignalNotInPayload(signal))?;
        self.check_free(slot.start, size, Some(signal))?;
        if let Some(s) = self.slots.iter_mut().find(|s| s.signal == signal) {
            s.size = size;
        }
        Ok(slot.size)
    }

    /// Startbits aller Signale in der aktuellen Reihenfolge
    pub fn layout(&self) -> Vec<(EntityId, u16)> {
        self.slots.iter().map(|s| (s.signal, s.start)).collect()
    }

    /// Layout ohne Lücken, Reihenfolge bleibt erhalten.
    pub fn compacted_layout(&self) -> Vec<(EntityId, u16)> {
        let mut cursor = 0;
        self.slots
            .iter()
            .map(|s| {
                let start = cursor;
                cursor += s.size;
                (s.signal, start)
            })
            .collect()
    }

    /// Setzt alle Startbits auf einmal. Das Ergebnis muss die Invariante erfüllen.
    pub fn relayout(&mut self, layout: &[(EntityId, u16)]) -> Result<(), ValidationError> {
        let mut next = self.slots.clone();
        for (signal, start) in layout {
            let slot = next
                .iter_mut()
                .find(|s| s.signal == *signal)
                .ok_or(ValidationError::SignalNotInPayload(*signal))?;
            slot.start = *start;
        }
        next.sort_by_key(|s| s.start);
        validate_slots(&next, self.width())?;
        self.slots = next;
        Ok(())
    }

    /// Ändert die Payload-Größe. Alle Signale müssen weiterhin hineinpassen.
    pub fn set_size_byte(&mut self, size_byte: u16) -> Result<(), ValidationError> {
        validate_size_byte(size_byte)?;
        let required = self.slots.last().map_or(0, Slot::end);
        if required > size_byte * 8 {
            return Err(ValidationError::PayloadTooSmall(required));
        }
        self.size_byte = size_byte;
        Ok(())
    }

    fn move_slot(&mut self, signal: EntityId, start: u16) -> Result<(), ValidationError> {
        let size = self
            .slot(signal)
            .map(|s| s.size)
            .ok_or(ValidationError::SignalNotInPayload(signal))?;
        self.check_free(start, size, Some(signal))?;
        if let Some(s) = self.slots.iter_mut().find(|s| s.signal == signal) {
            s.start = start;
        }
        self.slots.sort_by_key(|s| s.start);
        Ok(())
    }

    fn check_free(
        &self,
        start: u16,
        size: u16,
        ignore: Option<EntityId>,
    ) -> Result<(), ValidationError> {
        if size == 0 || size > MAX_SIGNAL_SIZE {
            return Err(ValidationError::InvalidSignalSize(size));
        }
        let end = start.saturating_add(size);
        if end > self.width() {
            return Err(ValidationError::SignalOutOfBounds {
                start,
                end,
                width: self.width(),
            });
        }
        let overlaps = self
            .slots
            .iter()
            .filter(|s| Some(s.signal) != ignore)
            .any(|s| start < s.end() && s.start < end);
        if overlaps {
            return Err(ValidationError::SignalOverlap { start, end });
        }
        Ok(())
    }
}

fn validate_size_byte(size_byte: u16) -> Result<(), ValidationError> {
    if size_byte == 0 || size_byte > MAX_SIZE_BYTE {
        return Err(ValidationError::InvalidSizeByte(size_byte));
    }
    Ok(())
}

fn validate_slots(slots: &[Slot], width: u16) -> Result<(), ValidationError> {
    let mut cursor = 0;
    for slot in slots {
        if slot.end() > width {
            return Err(ValidationError::SignalOutOfBounds {
                start: slot.start,
                end: slot.end(),
                width,
            });
        }
        if slot.start < cursor {
            return Err(ValidationError::SignalOverlap {
                start: slot.start,
                end: slot.end(),
            });
        }
        cursor = slot.end();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_with(sizes: &[u16]) -> (Payload, Vec<EntityId>) {
        let mut payload = Payload::new(8).expect("Payload erwartet");
        let mut ids = Vec::new();
        let mut start = 0;
        for size in sizes {
            let id = EntityId::generate();
            payload.insert(id, start, *size).expect("Insert erwartet");
            ids.push(id);
            start += size;
        }
        (payload, ids)
    }

    #[test]
    fn test_insert_rejects_overlap_and_out_of_bounds() {
        let (mut payload, _) = payload_with(&[8]);
        let id = EntityId::generate();

        assert_eq!(
            payload.insert(id, 4, 8),
            Err(ValidationError::SignalOverlap { start: 4, end: 12 })
        );
        assert!(matches!(
            payload.insert(id, 60, 8),
            Err(ValidationError::SignalOutOfBounds { .. })
        ));
        assert_eq!(payload.slots().len(), 1);
    }

    #[test]
    fn test_holes_and_largest_hole() {
        let (mut payload, ids) = payload_with(&[8, 8, 8]);
        payload.remove(ids[1]).expect("Remove erwartet");

        assert_eq!(payload.holes(), vec![(8, 8), (24, 40)]);
        assert_eq!(payload.largest_hole(), Some((24, 40)));
        assert_eq!(payload.trailing_bits(), 40);
        assert_eq!(payload.used_bits(), 16);
    }

    #[test]
    fn test_shift_rejects_collision_without_change() {
        let (mut payload, ids) = payload_with(&[8, 8]);

        assert!(payload.shift_right(ids[0], 4).is_err());
        assert_eq!(payload.slot(ids[0]).map(|s| s.start), Some(0));

        payload.shift_right(ids[1], 4).expect("Shift erwartet");
        assert_eq!(payload.slot(ids[1]).map(|s| s.start), Some(12));
    }

    #[test]
    fn test_compacted_layout_closes_gaps_in_order() {
        let (mut payload, ids) = payload_with(&[4, 4, 4]);
        payload.shift_right(ids[2], 10).expect("Shift erwartet");
        payload.remove(ids[0]).expect("Remove erwartet");

        let compact = payload.compacted_layout();
        assert_eq!(compact, vec![(ids[1], 0), (ids[2], 4)]);

        payload.relayout(&compact).expect("Relayout erwartet");
        assert_eq!(payload.layout(), compact);
    }

    #[test]
    fn test_set_size_byte_keeps_signals_in_range() {
        let (mut payload, _) = payload_with(&[8, 8]);

        assert_eq!(
            payload.set_size_byte(1),
            Err(ValidationError::PayloadTooSmall(16))
        );
        payload.set_size_byte(2).expect("2 Byte sollten reichen");
        assert_eq!(payload.width(), 16);
        assert_eq!(payload.set_size_byte(65), Err(ValidationError::InvalidSizeByte(65)));
    }

    #[test]
    fn test_resize_checks_neighbor() {
        let (mut payload, ids) = payload_with(&[8, 8]);

        assert!(payload.resize(ids[0], 9).is_err());
        assert_eq!(payload.resize(ids[1], 16), Ok(8));
        assert_eq!(payload.slot(ids[1]).map(Slot::end), Some(24));
    }
}
