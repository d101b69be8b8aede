//! Handler für Bus-Operationen: Name, Beschreibung, Bustyp, Baudrate.

use crate::app::command::{Change, EditContext};
use crate::app::error::EditResult;
use crate::app::service::Service;
use crate::app::sidebar::items::{bus_group_key, entity_key};
use crate::app::snapshot::BusSnapshot;
use crate::core::{rules, Bus, BusType, Entity, EntityId};

#[derive(Debug, Clone, PartialEq)]
pub enum BusField {
    Name(String),
    Desc(String),
    BusType(BusType),
    Baudrate(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BusAction {
    Set { bus_id: EntityId, field: BusField },
}

impl Service<Bus> {
    /// Benennt den Bus um, inklusive seiner Message-Gruppe in der Sidebar.
    pub fn update_name(&self, bus_id: EntityId, name: &str) -> EditResult<BusSnapshot> {
        self.handle(bus_id, BusField::Name(self.normalize_name(name)), update)
    }

    pub fn update_desc(&self, bus_id: EntityId, desc: &str) -> EditResult<BusSnapshot> {
        self.handle(bus_id, BusField::Desc(desc.to_string()), update)
    }

    /// Wechselt den Bustyp; alle CAN-IDs auf dem Bus müssen im neuen Bereich liegen.
    pub fn update_bus_type(&self, bus_id: EntityId, bus_type: BusType) -> EditResult<BusSnapshot> {
        self.handle(bus_id, BusField::BusType(bus_type), update)
    }

    pub fn update_baudrate(&self, bus_id: EntityId, baudrate: u32) -> EditResult<BusSnapshot> {
        self.handle(bus_id, BusField::Baudrate(baudrate), update)
    }
}

fn current(bus: &Bus, field: &BusField) -> BusField {
    match field {
        BusField::Name(_) => BusField::Name(bus.name().to_string()),
        BusField::Desc(_) => BusField::Desc(bus.desc().to_string()),
        BusField::BusType(_) => BusField::BusType(bus.bus_type),
        BusField::Baudrate(_) => BusField::Baudrate(bus.baudrate),
    }
}

fn update(ctx: &mut EditContext<'_>, bus_id: EntityId, field: BusField) -> EditResult<Change> {
    let old = current(ctx.pools.buses.get(bus_id)?, &field);
    if old == field {
        return Ok(Change::Unchanged);
    }
    write(ctx, bus_id, &field)?;
    Ok(Change::changed(
        BusAction::Set { bus_id, field: old },
        BusAction::Set { bus_id, field },
    ))
}

fn write(ctx: &mut EditContext<'_>, bus_id: EntityId, field: &BusField) -> EditResult<()> {
    if let BusField::BusType(bus_type) = field {
        for can_id in ctx.pools.bus_can_ids(bus_id, &[])? {
            rules::ensure_can_id_available(*bus_type, [], can_id)?;
        }
    }

    let bus = ctx.pools.buses.get_mut(bus_id)?;
    match field {
        BusField::Name(name) => {
            bus.base.rename(name)?;
            ctx.sidebar.update_name(entity_key(bus_id), name.as_str());
            ctx.sidebar.update_name(bus_group_key(bus_id), name.as_str());
        }
        BusField::Desc(desc) => bus.base.desc = desc.clone(),
        BusField::BusType(bus_type) => bus.bus_type = *bus_type,
        BusField::Baudrate(baudrate) => bus.set_baudrate(*baudrate)?,
    }
    Ok(())
}

pub(crate) fn apply(ctx: &mut EditContext<'_>, action: &BusAction) -> EditResult<()> {
    match action {
        BusAction::Set { bus_id, field } => write(ctx, *bus_id, field),
    }
}
