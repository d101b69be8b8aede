//! Handler für Einheiten.

use crate::app::command::{Change, EditContext};
use crate::app::error::EditResult;
use crate::app::service::Service;
use crate::app::sidebar::items::entity_key;
use crate::app::snapshot::SignalUnitSnapshot;
use crate::core::{Entity, EntityId, SignalUnit, SignalUnitKind};

#[derive(Debug, Clone, PartialEq)]
pub enum SignalUnitField {
    Name(String),
    Desc(String),
    Kind(SignalUnitKind),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalUnitAction {
    Set {
        unit_id: EntityId,
        field: SignalUnitField,
    },
}

impl Service<SignalUnit> {
    pub fn update_name(&self, unit_id: EntityId, name: &str) -> EditResult<SignalUnitSnapshot> {
        self.handle(unit_id, SignalUnitField::Name(self.normalize_name(name)), update)
    }

    pub fn update_desc(&self, unit_id: EntityId, desc: &str) -> EditResult<SignalUnitSnapshot> {
        self.handle(unit_id, SignalUnitField::Desc(desc.to_string()), update)
    }

    pub fn update_kind(&self, unit_id: EntityId, kind: SignalUnitKind) -> EditResult<SignalUnitSnapshot> {
        self.handle(unit_id, SignalUnitField::Kind(kind), update)
    }

    pub fn update_symbol(&self, unit_id: EntityId, symbol: &str) -> EditResult<SignalUnitSnapshot> {
        self.handle(unit_id, SignalUnitField::Symbol(symbol.to_string()), update)
    }
}

fn current(unit: &SignalUnit, field: &SignalUnitField) -> SignalUnitField {
    match field {
        SignalUnitField::Name(_) => SignalUnitField::Name(unit.name().to_string()),
        SignalUnitField::Desc(_) => SignalUnitField::Desc(unit.desc().to_string()),
        SignalUnitField::Kind(_) => SignalUnitField::Kind(unit.kind),
        SignalUnitField::Symbol(_) => SignalUnitField::Symbol(unit.symbol.clone()),
    }
}

fn update(ctx: &mut EditContext<'_>, unit_id: EntityId, field: SignalUnitField) -> EditResult<Change> {
    let old = current(ctx.pools.signal_units.get(unit_id)?, &field);
    if old == field {
        return Ok(Change::Unchanged);
    }
    write(ctx, unit_id, &field)?;
    Ok(Change::changed(
        SignalUnitAction::Set {
            unit_id,
            field: old,
        },
        SignalUnitAction::Set { unit_id, field },
    ))
}

fn write(ctx: &mut EditContext<'_>, unit_id: EntityId, field: &SignalUnitField) -> EditResult<()> {
    let unit = ctx.pools.signal_units.get_mut(unit_id)?;
    match field {
        SignalUnitField::Name(name) => {
            unit.base.rename(name)?;
            ctx.sidebar.update_name(entity_key(unit_id), name.as_str());
        }
        SignalUnitField::Desc(desc) => unit.base.desc = desc.clone(),
        SignalUnitField::Kind(kind) => unit.kind = *kind,
        SignalUnitField::Symbol(symbol) => unit.symbol = symbol.clone(),
    }
    Ok(())
}

pub(crate) fn apply(ctx: &mut EditContext<'_>, action: &SignalUnitAction) -> EditResult<()> {
    match action {
        SignalUnitAction::Set { unit_id, field } => write(ctx, *unit_id, field),
    }
}
