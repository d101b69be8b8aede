//! Handler für Signaltypen: Wertebereich, Skalierung und Offset.

use crate::app::command::{Change, EditContext};
use crate::app::error::EditResult;
use crate::app::service::Service;
use crate::app::sidebar::items::entity_key;
use crate::app::snapshot::SignalTypeSnapshot;
use crate::core::{Entity, EntityId, SignalType};

#[derive(Debug, Clone, PartialEq)]
pub enum SignalTypeField {
    Name(String),
    Desc(String),
    Min(f64),
    Max(f64),
    Scale(f64),
    Offset(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalTypeAction {
    Set {
        type_id: EntityId,
        field: SignalTypeField,
    },
}

impl Service<SignalType> {
    pub fn update_name(&self, type_id: EntityId, name: &str) -> EditResult<SignalTypeSnapshot> {
        self.handle(type_id, SignalTypeField::Name(self.normalize_name(name)), update)
    }

    pub fn update_desc(&self, type_id: EntityId, desc: &str) -> EditResult<SignalTypeSnapshot> {
        self.handle(type_id, SignalTypeField::Desc(desc.to_string()), update)
    }

    /// Untere Grenze; darf die obere nicht überschreiten.
    pub fn update_min(&self, type_id: EntityId, min: f64) -> EditResult<SignalTypeSnapshot> {
        self.handle(type_id, SignalTypeField::Min(min), update)
    }

    pub fn update_max(&self, type_id: EntityId, max: f64) -> EditResult<SignalTypeSnapshot> {
        self.handle(type_id, SignalTypeField::Max(max), update)
    }

    pub fn update_scale(&self, type_id: EntityId, scale: f64) -> EditResult<SignalTypeSnapshot> {
        self.handle(type_id, SignalTypeField::Scale(scale), update)
    }

    pub fn update_offset(&self, type_id: EntityId, offset: f64) -> EditResult<SignalTypeSnapshot> {
        self.handle(type_id, SignalTypeField::Offset(offset), update)
    }
}

fn current(signal_type: &SignalType, field: &SignalTypeField) -> SignalTypeField {
    match field {
        SignalTypeField::Name(_) => SignalTypeField::Name(signal_type.name().to_string()),
        SignalTypeField::Desc(_) => SignalTypeField::Desc(signal_type.desc().to_string()),
        SignalTypeField::Min(_) => SignalTypeField::Min(signal_type.min),
        SignalTypeField::Max(_) => SignalTypeField::Max(signal_type.max),
        SignalTypeField::Scale(_) => SignalTypeField::Scale(signal_type.scale),
        SignalTypeField::Offset(_) => SignalTypeField::Offset(signal_type.offset),
    }
}

fn update(ctx: &mut EditContext<'_>, type_id: EntityId, field: SignalTypeField) -> EditResult<Change> {
    let old = current(ctx.pools.signal_types.get(type_id)?, &field);
    if old == field {
        return Ok(Change::Unchanged);
    }
    write(ctx, type_id, &field)?;
    Ok(Change::changed(
        SignalTypeAction::Set {
            type_id,
            field: old,
        },
        SignalTypeAction::Set { type_id, field },
    ))
}

fn write(ctx: &mut EditContext<'_>, type_id: EntityId, field: &SignalTypeField) -> EditResult<()> {
    let signal_type = ctx.pools.signal_types.get_mut(type_id)?;
    match field {
        SignalTypeField::Name(name) => {
            signal_type.base.rename(name)?;
            ctx.sidebar.update_name(entity_key(type_id), name.as_str());
        }
        SignalTypeField::Desc(desc) => signal_type.base.desc = desc.clone(),
        SignalTypeField::Min(min) => signal_type.set_min(*min)?,
        SignalTypeField::Max(max) => signal_type.set_max(*max)?,
        SignalTypeField::Scale(scale) => signal_type.set_scale(*scale)?,
        SignalTypeField::Offset(offset) => signal_type.offset = *offset,
    }
    Ok(())
}

pub(crate) fn apply(ctx: &mut EditContext<'_>, action: &SignalTypeAction) -> EditResult<()> {
    match action {
        SignalTypeAction::Set { type_id, field } => write(ctx, *type_id, field),
    }
}
