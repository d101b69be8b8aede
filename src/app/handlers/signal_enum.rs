//! Handler für Enums: Werte anlegen, ändern, entfernen und umsortieren.
//!
//! Ändert sich dadurch die Breite des Enums, werden alle Enum-Signale im Payload
//! mitgezogen. Passt eines nicht mehr, wird die ganze Operation zurückgenommen.

use super::distinct_ids;
use crate::app::command::{Change, EditContext};
use crate::app::error::EditResult;
use crate::app::pool::Pools;
use crate::app::service::Service;
use crate::app::sidebar::items::entity_key;
use crate::app::snapshot::SignalEnumSnapshot;
use crate::core::naming::next_free_name;
use crate::core::{
    Entity, EntityId, SignalEnum, SignalEnumValue, SignalKind, ValidationError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SignalEnumField {
    Name(String),
    Desc(String),
    MinSize(u16),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueField {
    Name(String),
    Index(u32),
    Desc(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalEnumAction {
    Set {
        enum_id: EntityId,
        field: SignalEnumField,
    },
    /// Werte samt Listenposition, in Entnahmereihenfolge
    InsertValues {
        enum_id: EntityId,
        values: Vec<(usize, SignalEnumValue)>,
    },
    RemoveValues {
        enum_id: EntityId,
        ids: Vec<EntityId>,
    },
    SetValue {
        enum_id: EntityId,
        value_id: EntityId,
        field: ValueField,
    },
    ReorderValue {
        enum_id: EntityId,
        from: usize,
        to: usize,
    },
}

impl Service<SignalEnum> {
    pub fn update_name(&self, enum_id: EntityId, name: &str) -> EditResult<SignalEnumSnapshot> {
        self.handle(enum_id, SignalEnumField::Name(self.normalize_name(name)), update)
    }

    pub fn update_desc(&self, enum_id: EntityId, desc: &str) -> EditResult<SignalEnumSnapshot> {
        self.handle(enum_id, SignalEnumField::Desc(desc.to_string()), update)
    }

    /// Mindestbreite in Bit
    pub fn update_min_size(&self, enum_id: EntityId, min_size: u16) -> EditResult<SignalEnumSnapshot> {
        self.handle(enum_id, SignalEnumField::MinSize(min_size), update)
    }

    /// Hängt einen Wert `NEW_VALUE_N` mit dem nächsten freien Index an.
    pub fn add_value(&self, enum_id: EntityId) -> EditResult<SignalEnumSnapshot> {
        self.handle(enum_id, (), |ctx, enum_id, ()| {
            let signal_enum = ctx.pools.signal_enums.get(enum_id)?;
            let value = SignalEnumValue {
                id: EntityId::generate(),
                name: next_free_name("NEW_VALUE", signal_enum.values.iter().map(|v| v.name.as_str())),
                index: signal_enum.next_index(),
                desc: String::new(),
            };
            let entry = (signal_enum.values.len(), value);
            let value_id = entry.1.id;
            insert_values(ctx, enum_id, vec![entry.clone()])?;
            Ok(Change::changed(
                SignalEnumAction::RemoveValues {
                    enum_id,
                    ids: vec![value_id],
                },
                SignalEnumAction::InsertValues {
                    enum_id,
                    values: vec![entry],
                },
            ))
        })
    }

    pub fn remove_values(&self, enum_id: EntityId, value_ids: &[EntityId]) -> EditResult<SignalEnumSnapshot> {
        self.handle(enum_id, distinct_ids(value_ids)?, |ctx, enum_id, ids| {
            let removed = remove_values(ctx, enum_id, &ids)?;
            Ok(Change::changed(
                SignalEnumAction::InsertValues {
                    enum_id,
                    values: removed,
                },
                SignalEnumAction::RemoveValues { enum_id, ids },
            ))
        })
    }

    pub fn update_value_name(&self, enum_id: EntityId, value_id: EntityId, name: &str) -> EditResult<SignalEnumSnapshot> {
        let field = ValueField::Name(self.normalize_name(name));
        self.handle(enum_id, (value_id, field), update_value)
    }

    /// Neuer Index; eindeutig im Enum, die Breite kann sich ändern.
    pub fn update_value_index(&self, enum_id: EntityId, value_id: EntityId, index: u32) -> EditResult<SignalEnumSnapshot> {
        self.handle(enum_id, (value_id, ValueField::Index(index)), update_value)
    }

    pub fn update_value_desc(&self, enum_id: EntityId, value_id: EntityId, desc: &str) -> EditResult<SignalEnumSnapshot> {
        self.handle(enum_id, (value_id, ValueField::Desc(desc.to_string())), update_value)
    }

    pub fn reorder_value(&self, enum_id: EntityId, value_id: EntityId, from: usize, to: usize) -> EditResult<SignalEnumSnapshot> {
        self.handle(enum_id, (value_id, from, to), |ctx, enum_id, (value_id, from, to)| {
            let signal_enum = ctx.pools.signal_enums.get_mut(enum_id)?;
            let position = signal_enum.value_position(value_id)?;
            if position != from {
                return Err(ValidationError::InvalidPosition {
                    index: from,
                    len: signal_enum.values.len(),
                }
                .into());
            }
            if from == to {
                return Ok(Change::Unchanged);
            }
            signal_enum.move_value(from, to)?;
            Ok(Change::changed(
                SignalEnumAction::ReorderValue {
                    enum_id,
                    from: to,
                    to: from,
                },
                SignalEnumAction::ReorderValue { enum_id, from, to },
            ))
        })
    }
}

fn update(ctx: &mut EditContext<'_>, enum_id: EntityId, field: SignalEnumField) -> EditResult<Change> {
    let signal_enum = ctx.pools.signal_enums.get(enum_id)?;
    let old = match field {
        SignalEnumField::Name(_) => SignalEnumField::Name(signal_enum.name().to_string()),
        SignalEnumField::Desc(_) => SignalEnumField::Desc(signal_enum.desc().to_string()),
        SignalEnumField::MinSize(_) => SignalEnumField::MinSize(signal_enum.min_size),
    };
    if old == field {
        return Ok(Change::Unchanged);
    }
    write(ctx, enum_id, &field)?;
    Ok(Change::changed(
        SignalEnumAction::Set {
            enum_id,
            field: old,
        },
        SignalEnumAction::Set { enum_id, field },
    ))
}

fn write(ctx: &mut EditContext<'_>, enum_id: EntityId, field: &SignalEnumField) -> EditResult<()> {
    match field {
        SignalEnumField::Name(name) => {
            ctx.pools.signal_enums.get_mut(enum_id)?.base.rename(name)?;
            ctx.sidebar.update_name(entity_key(enum_id), name.as_str());
        }
        SignalEnumField::Desc(desc) => {
            ctx.pools.signal_enums.get_mut(enum_id)?.base.desc = desc.clone();
        }
        SignalEnumField::MinSize(min_size) => {
            with_enum_resize(ctx.pools, enum_id, |e| e.set_min_size(*min_size))?;
        }
    }
    Ok(())
}

fn update_value(
    ctx: &mut EditContext<'_>,
    enum_id: EntityId,
    (value_id, field): (EntityId, ValueField),
) -> EditResult<Change> {
    let value = ctx.pools.signal_enums.get(enum_id)?.value(value_id)?;
    let old = match field {
        ValueField::Name(_) => ValueField::Name(value.name.clone()),
        ValueField::Index(_) => ValueField::Index(value.index),
        ValueField::Desc(_) => ValueField::Desc(value.desc.clone()),
    };
    if old == field {
        return Ok(Change::Unchanged);
    }
    write_value(ctx.pools, enum_id, value_id, &field)?;
    Ok(Change::changed(
        SignalEnumAction::SetValue {
            enum_id,
            value_id,
            field: old,
        },
        SignalEnumAction::SetValue {
            enum_id,
            value_id,
            field,
        },
    ))
}

fn write_value(pools: &mut Pools, enum_id: EntityId, value_id: EntityId, field: &ValueField) -> EditResult<()> {
    with_enum_resize(pools, enum_id, |e| match field {
        ValueField::Name(name) => e.set_value_name(value_id, name),
        ValueField::Index(index) => e.set_value_index(value_id, *index),
        ValueField::Desc(desc) => e.set_value_desc(value_id, desc),
    })
}

fn insert_values(ctx: &mut EditContext<'_>, enum_id: EntityId, values: Vec<(usize, SignalEnumValue)>) -> EditResult<()> {
    with_enum_resize(ctx.pools, enum_id, |e| {
        for (position, value) in values.into_iter().rev() {
            e.insert_value(position, value)?;
        }
        Ok(())
    })
}

fn remove_values(
    ctx: &mut EditContext<'_>,
    enum_id: EntityId,
    ids: &[EntityId],
) -> EditResult<Vec<(usize, SignalEnumValue)>> {
    with_enum_resize(ctx.pools, enum_id, |e| {
        for id in ids {
            e.value(*id)?;
        }
        ids.iter().map(|id| e.remove_value(*id)).collect()
    })
}

/// Führt `mutate` auf dem Enum aus und passt bei geänderter Breite alle Enum-Signale an.
///
/// Schlägt ein Schritt fehl, sind Enum und Signale danach wie vorher.
fn with_enum_resize<T>(
    pools: &mut Pools,
    enum_id: EntityId,
    mutate: impl FnOnce(&mut SignalEnum) -> Result<T, ValidationError>,
) -> EditResult<T> {
    let signal_enum = pools.signal_enums.get_mut(enum_id)?;
    let before = signal_enum.clone();
    let result = match mutate(&mut *signal_enum) {
        Ok(result) => result,
        Err(err) => {
            *signal_enum = before;
            return Err(err.into());
        }
    };

    let (old_size, new_size) = (before.size(), signal_enum.size());
    if old_size != new_size {
        if let Err(err) = resize_signals(pools, enum_id, old_size, new_size) {
            *pools.signal_enums.get_mut(enum_id)? = before;
            return Err(err);
        }
        log::debug!("Enum {enum_id}: Breite {old_size} -> {new_size} Bit");
    }
    Ok(result)
}

fn resize_signals(pools: &mut Pools, enum_id: EntityId, old_size: u16, new_size: u16) -> EditResult<()> {
    let signals: Vec<(EntityId, EntityId)> = pools
        .signals
        .iter()
        .filter(|s| matches!(s.kind, SignalKind::Enum { signal_enum } if signal_enum == enum_id))
        .map(|s| (s.id(), s.message))
        .collect();

    for (done, (signal_id, message_id)) in signals.iter().enumerate() {
        let resized = pools
            .messages
            .get_mut(*message_id)
            .and_then(|m| Ok(m.payload.resize(*signal_id, new_size)?));
        if let Err(err) = resized {
            for (signal_id, message_id) in signals[..done].iter().rev() {
                if let Ok(message) = pools.messages.get_mut(*message_id) {
                    if let Err(undo_err) = message.payload.resize(*signal_id, old_size) {
                        log::error!("Signal {signal_id} nicht zurückgesetzt: {undo_err}");
                    }
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

pub(crate) fn apply(ctx: &mut EditContext<'_>, action: &SignalEnumAction) -> EditResult<()> {
    match action {
        SignalEnumAction::Set { enum_id, field } => write(ctx, *enum_id, field),
        SignalEnumAction::InsertValues { enum_id, values } => insert_values(ctx, *enum_id, values.clone()),
        SignalEnumAction::RemoveValues { enum_id, ids } => remove_values(ctx, *enum_id, ids).map(drop),
        SignalEnumAction::SetValue {
            enum_id,
            value_id,
            field,
        } => write_value(ctx.pools, *enum_id, *value_id, field),
        SignalEnumAction::ReorderValue { enum_id, from, to } => {
            ctx.pools
                .signal_enums
                .get_mut(*enum_id)?
                .move_value(*from, *to)?;
            Ok(())
        }
    }
}
