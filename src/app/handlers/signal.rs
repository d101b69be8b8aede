//! Handler für Signale: Name, Beschreibung und Katalog-Referenzen.

use crate::app::command::{Change, EditContext};
use crate::app::error::EditResult;
use crate::app::service::Service;
use crate::app::snapshot::SignalSnapshot;
use crate::core::{Entity, EntityId, Signal, SignalKind, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub enum SignalField {
    Name(String),
    Desc(String),
    SignalType(EntityId),
    SignalUnit(Option<EntityId>),
    SignalEnum(EntityId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalAction {
    Set {
        signal_id: EntityId,
        field: SignalField,
    },
}

impl Service<Signal> {
    pub fn update_name(&self, signal_id: EntityId, name: &str) -> EditResult<SignalSnapshot> {
        self.handle(signal_id, SignalField::Name(self.normalize_name(name)), update)
    }

    pub fn update_desc(&self, signal_id: EntityId, desc: &str) -> EditResult<SignalSnapshot> {
        self.handle(signal_id, SignalField::Desc(desc.to_string()), update)
    }

    /// Neuer Signaltyp; die Breite im Payload folgt dem Typ.
    pub fn update_signal_type(&self, signal_id: EntityId, signal_type: EntityId) -> EditResult<SignalSnapshot> {
        self.handle(signal_id, SignalField::SignalType(signal_type), update)
    }

    pub fn update_signal_unit(&self, signal_id: EntityId, signal_unit: Option<EntityId>) -> EditResult<SignalSnapshot> {
        self.handle(signal_id, SignalField::SignalUnit(signal_unit), update)
    }

    /// Neues Enum; die Breite im Payload folgt dem Enum.
    pub fn update_signal_enum(&self, signal_id: EntityId, signal_enum: EntityId) -> EditResult<SignalSnapshot> {
        self.handle(signal_id, SignalField::SignalEnum(signal_enum), update)
    }
}

fn current(signal: &Signal, field: &SignalField) -> EditResult<SignalField> {
    let value = match (field, signal.kind) {
        (SignalField::Name(_), _) => SignalField::Name(signal.name().to_string()),
        (SignalField::Desc(_), _) => SignalField::Desc(signal.desc().to_string()),
        (SignalField::SignalType(_), SignalKind::Standard { signal_type, .. }) => {
            SignalField::SignalType(signal_type)
        }
        (SignalField::SignalUnit(_), SignalKind::Standard { signal_unit, .. }) => {
            SignalField::SignalUnit(signal_unit)
        }
        (SignalField::SignalEnum(_), SignalKind::Enum { signal_enum }) => {
            SignalField::SignalEnum(signal_enum)
        }
        (SignalField::SignalEnum(_), _) => return Err(ValidationError::KindMismatch("enum").into()),
        (_, _) => return Err(ValidationError::KindMismatch("standard").into()),
    };
    Ok(value)
}

fn update(ctx: &mut EditContext<'_>, signal_id: EntityId, field: SignalField) -> EditResult<Change> {
    let old = current(ctx.pools.signals.get(signal_id)?, &field)?;
    if old == field {
        return Ok(Change::Unchanged);
    }
    write(ctx, signal_id, &field)?;
    Ok(Change::changed(
        SignalAction::Set {
            signal_id,
            field: old,
        },
        SignalAction::Set { signal_id, field },
    ))
}

fn write(ctx: &mut EditContext<'_>, signal_id: EntityId, field: &SignalField) -> EditResult<()> {
    let signal = ctx.pools.signals.get(signal_id)?;
    current(signal, field)?;
    let message_id = signal.message;

    // Breitenänderung zuerst, sie ist der einzige Schritt, der scheitern kann
    let size = match field {
        SignalField::SignalType(id) => Some(ctx.pools.signal_types.get(*id)?.size),
        SignalField::SignalEnum(id) => Some(ctx.pools.signal_enums.get(*id)?.size()),
        SignalField::SignalUnit(Some(id)) => {
            ctx.pools.signal_units.get(*id)?;
            None
        }
        _ => None,
    };
    if let Some(size) = size {
        ctx.pools
            .messages
            .get_mut(message_id)?
            .payload
            .resize(signal_id, size)?;
    }

    let signal = ctx.pools.signals.get_mut(signal_id)?;
    match (field, &mut signal.kind) {
        (SignalField::Name(name), _) => signal.base.rename(name)?,
        (SignalField::Desc(desc), _) => signal.base.desc = desc.clone(),
        (SignalField::SignalType(id), SignalKind::Standard { signal_type, .. }) => *signal_type = *id,
        (SignalField::SignalUnit(id), SignalKind::Standard { signal_unit, .. }) => *signal_unit = *id,
        (SignalField::SignalEnum(id), SignalKind::Enum { signal_enum }) => *signal_enum = *id,
        _ => {}
    }
    Ok(())
}

pub(crate) fn apply(ctx: &mut EditContext<'_>, action: &SignalAction) -> EditResult<()> {
    match action {
        SignalAction::Set { signal_id, field } => write(ctx, *signal_id, field),
    }
}
