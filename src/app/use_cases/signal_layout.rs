//! Use-Case-Funktionen für das Bit-Layout von Signalen innerhalb einer Message.

use crate::core::{EntityId, Payload, Slot, ValidationError};

/// Verschiebt das Signal an Position `from` auf Position `to` (Startbit-Reihenfolge).
///
/// Die dazwischenliegenden Signale rücken um den Abstand zum Nachbarn des Signals auf,
/// bei lückenlosem Layout also genau um seine Breite. `reorder_signal(s, to, from)`
/// stellt den alten Zustand wieder her. Bei einem Fehler bleibt der Payload unverändert.
pub fn reorder_signal(
    payload: &mut Payload,
    signal: EntityId,
    from: usize,
    to: usize,
) -> Result<(), ValidationError> {
    let len = payload.slots().len();
    for index in [from, to] {
        if index >= len {
            return Err(ValidationError::InvalidPosition { index, len });
        }
    }
    match payload.position(signal) {
        None => return Err(ValidationError::SignalNotInPayload(signal)),
        Some(position) if position != from => {
            return Err(ValidationError::InvalidPosition { index: from, len });
        }
        Some(_) => {}
    }
    if from == to {
        return Ok(());
    }

    let moved = payload.slots()[from];
    let others: Vec<Slot> = payload
        .slots()
        .iter()
        .filter(|s| s.signal != signal)
        .copied()
        .collect();

    let mut layout = Vec::with_capacity(len);
    if to < from {
        let offset = moved.end() - others[from - 1].end();
        layout.push((signal, others[to].start));
        layout.extend(others[to..from].iter().map(|s| (s.signal, s.start + offset)));
    } else {
        let offset = others[from].start - moved.start;
        layout.push((signal, others[to - 1].end() - moved.size));
        layout.extend(others[from..to].iter().map(|s| (s.signal, s.start - offset)));
    }

    log::debug!("Signal {signal} von Position {from} nach {to} verschoben");
    payload.relayout(&layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(size_byte: u16, slots: &[(u16, u16)]) -> (Payload, Vec<EntityId>) {
        let mut payload = Payload::new(size_byte).expect("Payload erwartet");
        let ids: Vec<EntityId> = slots.iter().map(|_| EntityId::generate()).collect();
        for (id, (start, size)) in ids.iter().zip(slots) {
            payload.insert(*id, *start, *size).expect("Slot erwartet");
        }
        (payload, ids)
    }

    fn starts(payload: &Payload, ids: &[EntityId]) -> Vec<u16> {
        ids.iter()
            .map(|id| payload.slot(*id).expect("Slot erwartet").start)
            .collect()
    }

    #[test]
    fn move_to_front_swaps_two_adjacent_signals() {
        let (mut payload, ids) = payload(2, &[(0, 8), (8, 8)]);

        reorder_signal(&mut payload, ids[1], 1, 0).expect("Verschieben erwartet");
        assert_eq!(starts(&payload, &ids), vec![8, 0]);

        reorder_signal(&mut payload, ids[1], 0, 1).expect("Rückweg erwartet");
        assert_eq!(starts(&payload, &ids), vec![0, 8]);
    }

    #[test]
    fn move_later_shifts_following_signals_left_by_its_size() {
        let (mut payload, ids) = payload(8, &[(0, 4), (4, 8), (12, 16), (28, 2)]);
        let used = payload.used_bits();

        reorder_signal(&mut payload, ids[0], 0, 2).expect("Verschieben erwartet");
        assert_eq!(starts(&payload, &ids), vec![24, 0, 8, 28]);
        assert_eq!(payload.used_bits(), used);

        reorder_signal(&mut payload, ids[0], 2, 0).expect("Rückweg erwartet");
        assert_eq!(starts(&payload, &ids), vec![0, 4, 12, 28]);
    }

    #[test]
    fn reorder_with_gaps_is_exact_inverse() {
        let (mut payload, ids) = payload(4, &[(0, 4), (8, 8), (20, 4)]);
        let before = payload.clone();

        reorder_signal(&mut payload, ids[2], 2, 0).expect("Verschieben erwartet");
        assert_eq!(starts(&payload, &ids), vec![8, 16, 0]);

        reorder_signal(&mut payload, ids[2], 0, 2).expect("Rückweg erwartet");
        assert_eq!(payload, before);
    }

    #[test]
    fn same_position_is_noop() {
        let (mut payload, ids) = payload(2, &[(0, 8), (8, 8)]);
        let before = payload.clone();
        reorder_signal(&mut payload, ids[0], 0, 0).expect("No-op erwartet");
        assert_eq!(payload, before);
    }

    #[test]
    fn rejects_positions_that_do_not_match() {
        let (mut payload, ids) = payload(2, &[(0, 8), (8, 8)]);
        assert_eq!(
            reorder_signal(&mut payload, ids[0], 0, 2),
            Err(ValidationError::InvalidPosition { index: 2, len: 2 })
        );
        assert_eq!(
            reorder_signal(&mut payload, ids[0], 1, 0),
            Err(ValidationError::InvalidPosition { index: 1, len: 2 })
        );
        let stranger = EntityId::generate();
        assert_eq!(
            reorder_signal(&mut payload, stranger, 0, 1),
            Err(ValidationError::SignalNotInPayload(stranger))
        );
    }
}
