//! Kindspezifische Operationen der Dispatcher.
//!
//! Jedes Modul liefert die typisierten Methoden eines `Service<E>` und die Aktionen,
//! mit denen die Historie seine Änderungen zurücknimmt und wiederholt.

pub mod bus;
pub mod message;
pub mod network;
pub mod node;
pub mod signal;
pub mod signal_enum;
pub mod signal_type;
pub mod signal_unit;

use super::command::EditContext;
use super::error::{EditError, EditResult};
use super::pool::{Pool, Pools};
use super::sidebar::SidebarHandle;
use super::sidebar::items::{bus_group_key, entity_item, interface_group, interface_group_key};
use crate::core::{rules, Entity, EntityId};

/// Aus einem Pool entnommene Entity samt alter Registry-Position
#[derive(Debug, Clone, PartialEq)]
pub struct Removed<E> {
    pub index: usize,
    pub entity: E,
}

impl<E: Entity> Removed<E> {
    pub(crate) fn take(pool: &mut Pool<E>, id: EntityId) -> EditResult<Self> {
        let (index, entity) = pool.take(id)?;
        Ok(Self { index, entity })
    }

    pub(crate) fn restore(self, pool: &mut Pool<E>) -> EntityId {
        let id = self.entity.id();
        pool.restore(self.index, self.entity);
        id
    }
}

/// Stellt entnommene Entities in umgekehrter Entnahmereihenfolge wieder her.
pub(crate) fn restore_all<E: Entity>(pool: &mut Pool<E>, removed: Vec<Removed<E>>) {
    for entry in removed.into_iter().rev() {
        entry.restore(pool);
    }
}

/// Hängt ein Entity-Blatt in der Sidebar unter `parent` ein.
pub(crate) fn sidebar_add<E: Entity>(sidebar: &SidebarHandle, entity: &E, parent: &str) {
    sidebar.add(entity_item(entity), parent);
}

/// Trägt eine Interface-Gruppe unter der Message-Gruppe ihres Busses ein.
pub(crate) fn sidebar_add_interface(
    ctx: &EditContext<'_>,
    bus: EntityId,
    node: EntityId,
    number: u8,
) -> EditResult<()> {
    let node = ctx.pools.nodes.get(node)?;
    let group = interface_group(ctx.pools, bus, node, number)?;
    ctx.sidebar.add(group, bus_group_key(bus));
    Ok(())
}

pub(crate) fn sidebar_remove_interface(sidebar: &SidebarHandle, bus: EntityId, node: EntityId, number: u8) {
    sidebar.remove(interface_group_key(bus, node, number));
}

/// Entfernt doppelte IDs; eine leere Liste ist ungültig.
pub(crate) fn distinct_ids(ids: &[EntityId]) -> EditResult<Vec<EntityId>> {
    let mut distinct = Vec::with_capacity(ids.len());
    for id in ids {
        if !distinct.contains(id) {
            distinct.push(*id);
        }
    }
    if distinct.is_empty() {
        return Err(EditError::invalid("empty id list"));
    }
    Ok(distinct)
}

/// Prüft, dass `can_ids` auf dem Bus frei sind, sobald die Messages in `exclude` dort
/// nicht mehr senden. Die neuen IDs dürfen sich auch untereinander nicht überschneiden.
pub(crate) fn ensure_can_ids_free(
    pools: &Pools,
    bus_id: EntityId,
    exclude: &[EntityId],
    can_ids: impl IntoIterator<Item = u32>,
) -> EditResult<()> {
    let bus_type = pools.buses.get(bus_id)?.bus_type;
    let mut taken = pools.bus_can_ids(bus_id, exclude)?;
    for can_id in can_ids {
        rules::ensure_can_id_available(bus_type, taken.iter().copied(), can_id)?;
        taken.push(can_id);
    }
    Ok(())
}
