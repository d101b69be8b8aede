//! Handler für Messages: Kennungen, Timing, Payload-Größe und Signal-Layout.

use super::{distinct_ids, ensure_can_ids_free, Removed};
use crate::app::command::{Change, EditContext};
use crate::app::error::{EditError, EditResult};
use crate::app::events::NewSignal;
use crate::app::pool::Pools;
use crate::app::service::Service;
use crate::app::sidebar::items::entity_key;
use crate::app::snapshot::MessageSnapshot;
use crate::app::use_cases::signal_layout;
use crate::core::message::default_can_id;
use crate::core::naming::next_free_name;
use crate::core::{
    rules, ByteOrder, Entity, EntityId, Message, SendType, Signal, SignalKind, Slot,
    ValidationError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum MessageField {
    Name(String),
    Desc(String),
    MessageId(u32),
    StaticCanId(Option<u32>),
    SizeByte(u16),
    ByteOrder(ByteOrder),
    CycleTime(u32),
    SendType(SendType),
    DelayTime(u32),
    StartDelayTime(u32),
}

/// Entnommenes Signal samt seinem Platz im Payload
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRemoval {
    pub slot: Slot,
    pub signal: Removed<Signal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageAction {
    Set {
        message_id: EntityId,
        field: MessageField,
    },
    InsertSignals {
        message_id: EntityId,
        signals: Vec<SignalRemoval>,
    },
    RemoveSignals {
        message_id: EntityId,
        ids: Vec<EntityId>,
    },
    /// Setzt die Startbits mehrerer Signale auf einmal.
    Relayout {
        message_id: EntityId,
        layout: Vec<(EntityId, u16)>,
    },
    Reorder {
        message_id: EntityId,
        signal_id: EntityId,
        from: usize,
        to: usize,
    },
}

impl Service<Message> {
    /// Message-IDs der übrigen Messages desselben Interfaces, aufsteigend
    pub fn list_invalid_ids(&self, message_id: EntityId) -> EditResult<Vec<u32>> {
        self.read(|pools| {
            let message = pools.messages.get(message_id)?;
            let node = pools.nodes.get(message.sender.node)?;
            let mut ids = Vec::new();
            for sibling in &node.interface(message.sender.number)?.messages {
                if *sibling != message_id {
                    ids.push(pools.messages.get(*sibling)?.message_id);
                }
            }
            ids.sort_unstable();
            Ok(ids)
        })
    }

    /// CAN-IDs der übrigen Messages auf dem Bus; leer, solange das Interface nicht angeschlossen ist.
    pub fn list_invalid_can_ids(&self, message_id: EntityId) -> EditResult<Vec<u32>> {
        self.read(|pools| {
            let message = pools.messages.get(message_id)?;
            let Some(bus_id) = pools.message_bus(message)? else {
                return Ok(Vec::new());
            };
            let mut can_ids = pools.bus_can_ids(bus_id, &[message_id])?;
            can_ids.sort_unstable();
            Ok(can_ids)
        })
    }

    /// Freie Bits im Payload
    pub fn space_left(&self, message_id: EntityId) -> EditResult<u16> {
        self.read(|pools| {
            let payload = &pools.messages.get(message_id)?.payload;
            Ok(payload.width() - payload.used_bits())
        })
    }

    pub fn update_name(&self, message_id: EntityId, name: &str) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::Name(self.normalize_name(name)), update)
    }

    pub fn update_desc(&self, message_id: EntityId, desc: &str) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::Desc(desc.to_string()), update)
    }

    /// Neue Message-ID; eindeutig pro Node, abgeleitete CAN-ID frei auf dem Bus.
    pub fn update_message_id(&self, message_id: EntityId, value: u32) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::MessageId(value), update)
    }

    /// Statische CAN-ID setzen oder mit `None` auf die abgeleitete zurückfallen.
    pub fn update_static_can_id(&self, message_id: EntityId, value: Option<u32>) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::StaticCanId(value), update)
    }

    pub fn update_size_byte(&self, message_id: EntityId, value: u16) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::SizeByte(value), update)
    }

    pub fn update_byte_order(&self, message_id: EntityId, value: ByteOrder) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::ByteOrder(value), update)
    }

    pub fn update_cycle_time(&self, message_id: EntityId, value: u32) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::CycleTime(value), update)
    }

    pub fn update_send_type(&self, message_id: EntityId, value: SendType) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::SendType(value), update)
    }

    pub fn update_delay_time(&self, message_id: EntityId, value: u32) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::DelayTime(value), update)
    }

    pub fn update_start_delay_time(&self, message_id: EntityId, value: u32) -> EditResult<MessageSnapshot> {
        self.handle(message_id, MessageField::StartDelayTime(value), update)
    }

    /// Legt ein Signal `new_signal_N` in der größten Lücke des Payloads an.
    pub fn add_signal(&self, message_id: EntityId, new: NewSignal) -> EditResult<MessageSnapshot> {
        self.handle(message_id, new, add_signal)
    }

    pub fn delete_signals(&self, message_id: EntityId, signal_ids: &[EntityId]) -> EditResult<MessageSnapshot> {
        self.handle(message_id, distinct_ids(signal_ids)?, |ctx, message_id, ids| {
            let removed = remove_signals(ctx, message_id, &ids)?;
            Ok(Change::changed(
                MessageAction::InsertSignals {
                    message_id,
                    signals: removed,
                },
                MessageAction::RemoveSignals { message_id, ids },
            ))
        })
    }

    /// Schließt alle Lücken, die Reihenfolge der Signale bleibt.
    pub fn compact_signals(&self, message_id: EntityId) -> EditResult<MessageSnapshot> {
        self.handle(message_id, (), |ctx, message_id, ()| {
            let payload = &mut ctx.pools.messages.get_mut(message_id)?.payload;
            let old = payload.layout();
            let new = payload.compacted_layout();
            if old == new {
                return Ok(Change::Unchanged);
            }
            payload.relayout(&new)?;
            Ok(Change::changed(
                MessageAction::Relayout {
                    message_id,
                    layout: old,
                },
                MessageAction::Relayout {
                    message_id,
                    layout: new,
                },
            ))
        })
    }

    /// Verschiebt ein Signal in der Startbit-Reihenfolge von `from` nach `to`.
    pub fn reorder_signal(
        &self,
        message_id: EntityId,
        signal_id: EntityId,
        from: usize,
        to: usize,
    ) -> EditResult<MessageSnapshot> {
        self.handle(message_id, (signal_id, from, to), |ctx, message_id, (signal_id, from, to)| {
            let payload = &mut ctx.pools.messages.get_mut(message_id)?.payload;
            signal_layout::reorder_signal(payload, signal_id, from, to)?;
            if from == to {
                return Ok(Change::Unchanged);
            }
            Ok(Change::changed(
                MessageAction::Reorder {
                    message_id,
                    signal_id,
                    from: to,
                    to: from,
                },
                MessageAction::Reorder {
                    message_id,
                    signal_id,
                    from,
                    to,
                },
            ))
        })
    }
}

fn current(message: &Message, field: &MessageField) -> MessageField {
    match field {
        MessageField::Name(_) => MessageField::Name(message.name().to_string()),
        MessageField::Desc(_) => MessageField::Desc(message.desc().to_string()),
        MessageField::MessageId(_) => MessageField::MessageId(message.message_id),
        MessageField::StaticCanId(_) => MessageField::StaticCanId(message.static_can_id),
        MessageField::SizeByte(_) => MessageField::SizeByte(message.payload.size_byte()),
        MessageField::ByteOrder(_) => MessageField::ByteOrder(message.byte_order),
        MessageField::CycleTime(_) => MessageField::CycleTime(message.cycle_time),
        MessageField::SendType(_) => MessageField::SendType(message.send_type),
        MessageField::DelayTime(_) => MessageField::DelayTime(message.delay_time),
        MessageField::StartDelayTime(_) => MessageField::StartDelayTime(message.start_delay_time),
    }
}

fn update(ctx: &mut EditContext<'_>, message_id: EntityId, field: MessageField) -> EditResult<Change> {
    let old = current(ctx.pools.messages.get(message_id)?, &field);
    if old == field {
        return Ok(Change::Unchanged);
    }
    write(ctx, message_id, &field)?;
    Ok(Change::changed(
        MessageAction::Set {
            message_id,
            field: old,
        },
        MessageAction::Set { message_id, field },
    ))
}

fn write(ctx: &mut EditContext<'_>, message_id: EntityId, field: &MessageField) -> EditResult<()> {
    match field {
        MessageField::MessageId(value) => check_identity(ctx.pools, message_id, *value, None)?,
        MessageField::StaticCanId(value) => {
            let message_value = ctx.pools.messages.get(message_id)?.message_id;
            check_identity(ctx.pools, message_id, message_value, Some(*value))?;
        }
        _ => {}
    }

    let message = ctx.pools.messages.get_mut(message_id)?;
    match field {
        MessageField::Name(name) => {
            message.base.rename(name)?;
            ctx.sidebar.update_name(entity_key(message_id), name.as_str());
        }
        MessageField::Desc(desc) => message.base.desc = desc.clone(),
        MessageField::MessageId(value) => message.message_id = *value,
        MessageField::StaticCanId(value) => message.static_can_id = *value,
        MessageField::SizeByte(value) => message.payload.set_size_byte(*value)?,
        MessageField::ByteOrder(value) => message.byte_order = *value,
        MessageField::CycleTime(value) => message.cycle_time = *value,
        MessageField::SendType(value) => message.send_type = *value,
        MessageField::DelayTime(value) => message.delay_time = *value,
        MessageField::StartDelayTime(value) => message.start_delay_time = *value,
    }
    Ok(())
}

/// Prüft Message-ID und resultierende CAN-ID gegen Node und Bus.
///
/// `static_can_id` ist `Some`, wenn die statische CAN-ID geändert wird.
fn check_identity(
    pools: &Pools,
    message_id: EntityId,
    value: u32,
    static_can_id: Option<Option<u32>>,
) -> EditResult<()> {
    let message = pools.messages.get(message_id)?;
    let node = pools.nodes.get(message.sender.node)?;
    let siblings = node
        .message_ids()
        .filter(|id| *id != message_id)
        .map(|id| pools.messages.get(id).map(|m| m.message_id))
        .collect::<EditResult<Vec<_>>>()?;
    rules::ensure_unique_message_id(siblings, value)?;

    let can_id = static_can_id
        .unwrap_or(message.static_can_id)
        .unwrap_or_else(|| default_can_id(value, node.node_id));
    if let Some(bus_id) = pools.message_bus(message)? {
        ensure_can_ids_free(pools, bus_id, &[message_id], [can_id])?;
    }
    Ok(())
}

fn add_signal(ctx: &mut EditContext<'_>, message_id: EntityId, new: NewSignal) -> EditResult<Change> {
    let kind = match new {
        NewSignal::Standard { signal_type } => {
            let signal_type = match signal_type {
                Some(id) => ctx.pools.signal_types.get(id)?.id(),
                None => ctx
                    .pools
                    .signal_types
                    .ids()
                    .next()
                    .ok_or_else(|| EditError::invalid("no signal type available"))?,
            };
            SignalKind::Standard {
                signal_type,
                signal_unit: None,
            }
        }
        NewSignal::Enum { signal_enum } => {
            let signal_enum = match signal_enum {
                Some(id) => ctx.pools.signal_enums.get(id)?.id(),
                None => ctx
                    .pools
                    .signal_enums
                    .ids()
                    .next()
                    .ok_or_else(|| EditError::invalid("no signal enum available"))?,
            };
            SignalKind::Enum { signal_enum }
        }
    };
    let size = ctx.pools.signal_size(&kind)?;

    let message = ctx.pools.messages.get(message_id)?;
    let (start, _) = message
        .payload
        .largest_hole()
        .filter(|(_, free)| *free >= size)
        .ok_or(ValidationError::PayloadFull)?;
    let sibling_names = message
        .payload
        .slots()
        .iter()
        .map(|slot| ctx.pools.signals.get(slot.signal).map(Entity::name))
        .collect::<EditResult<Vec<_>>>()?;
    let name = next_free_name("new_signal", sibling_names);

    let signal = match kind {
        SignalKind::Standard { signal_type, .. } => Signal::standard(name, message_id, signal_type),
        SignalKind::Enum { signal_enum } => Signal::enumerated(name, message_id, signal_enum),
    };
    let removal = SignalRemoval {
        slot: Slot {
            signal: signal.id(),
            start,
            size,
        },
        signal: Removed {
            index: ctx.pools.signals.len(),
            entity: signal,
        },
    };
    let id = removal.slot.signal;
    insert_signals(ctx, message_id, vec![removal.clone()])?;
    log::info!("Signal {id} bei Bit {start} angelegt");
    Ok(Change::changed(
        MessageAction::RemoveSignals {
            message_id,
            ids: vec![id],
        },
        MessageAction::InsertSignals {
            message_id,
            signals: vec![removal],
        },
    ))
}

fn insert_signals(ctx: &mut EditContext<'_>, message_id: EntityId, removed: Vec<SignalRemoval>) -> EditResult<()> {
    for removal in removed.into_iter().rev() {
        let slot = removal.slot;
        ctx.pools
            .messages
            .get_mut(message_id)?
            .payload
            .insert(slot.signal, slot.start, slot.size)?;
        removal.signal.restore(&mut ctx.pools.signals);
    }
    Ok(())
}

fn remove_signals(ctx: &mut EditContext<'_>, message_id: EntityId, ids: &[EntityId]) -> EditResult<Vec<SignalRemoval>> {
    for id in ids {
        if ctx.pools.signals.get(*id)?.message != message_id {
            return Err(ValidationError::SignalNotInPayload(*id).into());
        }
    }

    let mut removed = Vec::with_capacity(ids.len());
    for id in ids {
        let slot = ctx.pools.messages.get_mut(message_id)?.payload.remove(*id)?;
        let signal = Removed::take(&mut ctx.pools.signals, *id)?;
        removed.push(SignalRemoval { slot, signal });
    }
    Ok(removed)
}

pub(crate) fn apply(ctx: &mut EditContext<'_>, action: &MessageAction) -> EditResult<()> {
    match action {
        MessageAction::Set { message_id, field } => write(ctx, *message_id, field),
        MessageAction::InsertSignals {
            message_id,
            signals,
        } => insert_signals(ctx, *message_id, signals.clone()),
        MessageAction::RemoveSignals { message_id, ids } => {
            remove_signals(ctx, *message_id, ids).map(drop)
        }
        MessageAction::Relayout { message_id, layout } => {
            ctx.pools
                .messages
                .get_mut(*message_id)?
                .payload
                .relayout(layout)?;
            Ok(())
        }
        MessageAction::Reorder {
            message_id,
            signal_id,
            from,
            to,
        } => {
            let payload = &mut ctx.pools.messages.get_mut(*message_id)?.payload;
            signal_layout::reorder_signal(payload, *signal_id, *from, *to)?;
            Ok(())
        }
    }
}
