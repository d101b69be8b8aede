//! Handler für das Netzwerk: Busse, Nodes und Katalogeinträge anlegen und löschen.

use super::{
    distinct_ids, restore_all, sidebar_add, sidebar_add_interface, sidebar_remove_interface,
    Removed,
};
use crate::app::command::{Change, EditContext};
use crate::app::error::EditResult;
use crate::app::events::NewSignalType;
use crate::app::service::Service;
use crate::app::sidebar::items::{
    bus_group_key, bus_message_group, entity_key, BUSES_GROUP, MESSAGES_GROUP, NETWORK_KEY,
    NODES_GROUP, SIGNAL_ENUMS_GROUP, SIGNAL_TYPES_GROUP, SIGNAL_UNITS_GROUP,
};
use crate::app::snapshot::{NetworkSnapshot, SessionEntity};
use crate::core::naming::{first_free_number, next_free_name};
use crate::core::{
    Bus, Entity, EntityId, InterfaceRef, Message, Network, Node, Signal, SignalEnum, SignalType,
    SignalUnit, SignalUnitKind, ValidationError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkField {
    Name(String),
    Desc(String),
}

/// Entnommener Bus samt Position in der Busliste des Netzwerks
#[derive(Debug, Clone, PartialEq)]
pub struct BusRemoval {
    pub position: usize,
    pub bus: Removed<Bus>,
}

/// Anschluss eines Interfaces an einen Bus (Position in `Bus::interfaces`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attachment {
    pub bus: EntityId,
    pub number: u8,
    pub index: usize,
}

/// Gelöschter Node mit allem, was mit ihm verschwindet
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRemoval {
    pub node: Removed<Node>,
    pub attachments: Vec<Attachment>,
    pub messages: Vec<Removed<Message>>,
    pub signals: Vec<Removed<Signal>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkAction {
    Set {
        network_id: EntityId,
        field: NetworkField,
    },
    InsertBuses(Vec<BusRemoval>),
    RemoveBuses(Vec<EntityId>),
    InsertNodes(Vec<NodeRemoval>),
    RemoveNodes(Vec<EntityId>),
    InsertSignalTypes(Vec<Removed<SignalType>>),
    RemoveSignalTypes(Vec<EntityId>),
    InsertSignalUnits(Vec<Removed<SignalUnit>>),
    RemoveSignalUnits(Vec<EntityId>),
    InsertSignalEnums(Vec<Removed<SignalEnum>>),
    RemoveSignalEnums(Vec<EntityId>),
}

impl Service<Network> {
    pub fn update_name(&self, network_id: EntityId, name: &str) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, NetworkField::Name(self.normalize_name(name)), update)
    }

    pub fn update_desc(&self, network_id: EntityId, desc: &str) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, NetworkField::Desc(desc.to_string()), update)
    }

    /// Legt einen Bus `new_bus_N` ohne Interfaces an.
    pub fn add_bus(&self, network_id: EntityId) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, (), |ctx, _, ()| {
            let name = next_free_name("new_bus", ctx.pools.buses.iter().map(Entity::name));
            let bus = Bus::new(name);
            let removal = BusRemoval {
                position: ctx.pools.network()?.buses.len(),
                bus: Removed {
                    index: ctx.pools.buses.len(),
                    entity: bus,
                },
            };
            let id = removal.bus.entity.id();
            insert_buses(ctx, vec![removal.clone()])?;
            log::info!("Bus {id} angelegt");
            Ok(Change::changed(
                NetworkAction::RemoveBuses(vec![id]),
                NetworkAction::InsertBuses(vec![removal]),
            ))
        })
    }

    /// Löscht Busse; jeder muss frei von Interfaces sein.
    pub fn delete_buses(&self, network_id: EntityId, bus_ids: &[EntityId]) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, distinct_ids(bus_ids)?, |ctx, _, ids| {
            let removed = remove_buses(ctx, &ids)?;
            log::info!("{} Bus(se) gelöscht", ids.len());
            Ok(Change::changed(
                NetworkAction::InsertBuses(removed),
                NetworkAction::RemoveBuses(ids),
            ))
        })
    }

    /// Legt einen Node `new_node_N` mit der ersten freien Node-ID ab 1 an.
    pub fn add_node(&self, network_id: EntityId) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, (), |ctx, _, ()| {
            let name = next_free_name("new_node", ctx.pools.nodes.iter().map(Entity::name));
            let node_id = first_free_number(ctx.pools.nodes.iter().map(|n| n.node_id), 1);
            let removal = NodeRemoval {
                node: Removed {
                    index: ctx.pools.nodes.len(),
                    entity: Node::new(name, node_id),
                },
                attachments: Vec::new(),
                messages: Vec::new(),
                signals: Vec::new(),
            };
            let id = removal.node.entity.id();
            insert_nodes(ctx, vec![removal.clone()])?;
            log::info!("Node {id} (Node-ID {node_id}) angelegt");
            Ok(Change::changed(
                NetworkAction::RemoveNodes(vec![id]),
                NetworkAction::InsertNodes(vec![removal]),
            ))
        })
    }

    /// Löscht Nodes samt ihrer Messages und Signale und trennt ihre Interfaces von den Bussen.
    pub fn delete_nodes(&self, network_id: EntityId, node_ids: &[EntityId]) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, distinct_ids(node_ids)?, |ctx, _, ids| {
            let removed = remove_nodes(ctx, &ids)?;
            log::info!("{} Node(s) gelöscht", ids.len());
            Ok(Change::changed(
                NetworkAction::InsertNodes(removed),
                NetworkAction::RemoveNodes(ids),
            ))
        })
    }

    pub fn add_signal_type(&self, network_id: EntityId, new: NewSignalType) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, new, |ctx, _, new| {
            let name = next_free_name("new_signal_type", ctx.pools.signal_types.iter().map(Entity::name));
            let signal_type = SignalType::new(name, new.kind, new.size, new.signed)?;
            add_catalog(ctx, signal_type)
        })
    }

    pub fn add_signal_unit(&self, network_id: EntityId, kind: SignalUnitKind) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, kind, |ctx, _, kind| {
            let name = next_free_name("new_signal_unit", ctx.pools.signal_units.iter().map(Entity::name));
            add_catalog(ctx, SignalUnit::new(name, kind, ""))
        })
    }

    pub fn add_signal_enum(&self, network_id: EntityId) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, (), |ctx, _, ()| {
            let name = next_free_name("new_signal_enum", ctx.pools.signal_enums.iter().map(Entity::name));
            add_catalog(ctx, SignalEnum::new(name))
        })
    }

    /// Löscht Signaltypen, die von keinem Signal mehr verwendet werden.
    pub fn delete_signal_types(&self, network_id: EntityId, ids: &[EntityId]) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, distinct_ids(ids)?, delete_catalog::<SignalType>)
    }

    pub fn delete_signal_units(&self, network_id: EntityId, ids: &[EntityId]) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, distinct_ids(ids)?, delete_catalog::<SignalUnit>)
    }

    pub fn delete_signal_enums(&self, network_id: EntityId, ids: &[EntityId]) -> EditResult<NetworkSnapshot> {
        self.handle(network_id, distinct_ids(ids)?, delete_catalog::<SignalEnum>)
    }
}

fn update(ctx: &mut EditContext<'_>, network_id: EntityId, field: NetworkField) -> EditResult<Change> {
    let network = ctx.pools.network.get(network_id)?;
    let old = match field {
        NetworkField::Name(_) => NetworkField::Name(network.name().to_string()),
        NetworkField::Desc(_) => NetworkField::Desc(network.desc().to_string()),
    };
    if old == field {
        return Ok(Change::Unchanged);
    }
    write(ctx, network_id, &field)?;
    Ok(Change::changed(
        NetworkAction::Set {
            network_id,
            field: old,
        },
        NetworkAction::Set { network_id, field },
    ))
}

fn write(ctx: &mut EditContext<'_>, network_id: EntityId, field: &NetworkField) -> EditResult<()> {
    let network = ctx.pools.network.get_mut(network_id)?;
    match field {
        NetworkField::Name(name) => {
            network.base.rename(name)?;
            ctx.sidebar.update_name(NETWORK_KEY, name.as_str());
        }
        NetworkField::Desc(desc) => network.base.desc = desc.clone(),
    }
    Ok(())
}

// ── Busse ───────────────────────────────────────────────────────

fn insert_buses(ctx: &mut EditContext<'_>, removed: Vec<BusRemoval>) -> EditResult<()> {
    for removal in removed.into_iter().rev() {
        let network_id = ctx.pools.network()?.id();
        let id = removal.bus.restore(&mut ctx.pools.buses);
        ctx.pools
            .network
            .get_mut(network_id)?
            .insert_bus(removal.position, id);

        let bus = ctx.pools.buses.get(id)?;
        sidebar_add(ctx.sidebar, bus, BUSES_GROUP);
        ctx.sidebar.add(bus_message_group(ctx.pools, bus)?, MESSAGES_GROUP);
    }
    Ok(())
}

fn remove_buses(ctx: &mut EditContext<'_>, ids: &[EntityId]) -> EditResult<Vec<BusRemoval>> {
    for id in ids {
        let bus = ctx.pools.buses.get(*id)?;
        if !bus.interfaces.is_empty() {
            return Err(ValidationError::BusHasInterfaces(bus.interfaces.len()).into());
        }
    }

    let network_id = ctx.pools.network()?.id();
    let mut removed = Vec::with_capacity(ids.len());
    for id in ids {
        let network = ctx.pools.network.get_mut(network_id)?;
        let position = network.remove_bus(*id).unwrap_or(network.buses.len());
        let bus = Removed::take(&mut ctx.pools.buses, *id)?;
        ctx.sidebar.remove(entity_key(*id));
        ctx.sidebar.remove(bus_group_key(*id));
        removed.push(BusRemoval { position, bus });
    }
    Ok(removed)
}

// ── Nodes ───────────────────────────────────────────────────────

fn insert_nodes(ctx: &mut EditContext<'_>, removed: Vec<NodeRemoval>) -> EditResult<()> {
    for removal in removed.into_iter().rev() {
        let node_id = removal.node.restore(&mut ctx.pools.nodes);
        restore_all(&mut ctx.pools.messages, removal.messages);
        restore_all(&mut ctx.pools.signals, removal.signals);
        sidebar_add(ctx.sidebar, ctx.pools.nodes.get(node_id)?, NODES_GROUP);

        for attachment in removal.attachments.into_iter().rev() {
            let interface = InterfaceRef {
                node: node_id,
                number: attachment.number,
            };
            ctx.pools
                .buses
                .get_mut(attachment.bus)?
                .attach(interface, Some(attachment.index))?;
            sidebar_add_interface(ctx, attachment.bus, node_id, attachment.number)?;
        }
    }
    Ok(())
}

fn remove_nodes(ctx: &mut EditContext<'_>, ids: &[EntityId]) -> EditResult<Vec<NodeRemoval>> {
    let mut removed: Vec<NodeRemoval> = Vec::with_capacity(ids.len());
    for id in ids {
        match remove_node(ctx, *id) {
            Ok(removal) => removed.push(removal),
            Err(err) => {
                insert_nodes(ctx, removed)?;
                return Err(err);
            }
        }
    }
    Ok(removed)
}

fn remove_node(ctx: &mut EditContext<'_>, node_id: EntityId) -> EditResult<NodeRemoval> {
    let node = ctx.pools.nodes.get(node_id)?;

    // Erst alles nachschlagen, danach nur noch entnehmen
    let mut attached = Vec::new();
    for interface in &node.interfaces {
        if let Some(bus_id) = interface.bus {
            ctx.pools.buses.get(bus_id)?;
            attached.push((bus_id, interface.number));
        }
    }
    let mut contents = Vec::new();
    for message_id in node.message_ids() {
        let message = ctx.pools.messages.get(message_id)?;
        let signals: Vec<EntityId> = message.payload.slots().iter().map(|s| s.signal).collect();
        for signal_id in &signals {
            ctx.pools.signals.get(*signal_id)?;
        }
        contents.push((message_id, signals));
    }

    let mut attachments = Vec::with_capacity(attached.len());
    for (bus_id, number) in attached {
        let interface = InterfaceRef {
            node: node_id,
            number,
        };
        let bus = ctx.pools.buses.get_mut(bus_id)?;
        let index = bus.detach(interface).unwrap_or(bus.interfaces.len());
        sidebar_remove_interface(ctx.sidebar, bus_id, node_id, number);
        attachments.push(Attachment {
            bus: bus_id,
            number,
            index,
        });
    }

    let mut messages = Vec::new();
    let mut signals = Vec::new();
    for (message_id, signal_ids) in contents {
        for signal_id in signal_ids {
            signals.push(Removed::take(&mut ctx.pools.signals, signal_id)?);
        }
        messages.push(Removed::take(&mut ctx.pools.messages, message_id)?);
    }
    let node = Removed::take(&mut ctx.pools.nodes, node_id)?;
    ctx.sidebar.remove(entity_key(node_id));

    Ok(NodeRemoval {
        node,
        attachments,
        messages,
        signals,
    })
}

// ── Katalog ─────────────────────────────────────────────────────

/// Katalogeinträge: eigener Pool, eigene Sidebar-Gruppe, dürfen nur unreferenziert weg.
trait CatalogEntity: SessionEntity + Clone {
    const GROUP: &'static str;

    fn insert_action(entries: Vec<Removed<Self>>) -> NetworkAction;
    fn remove_action(ids: Vec<EntityId>) -> NetworkAction;
}

impl CatalogEntity for SignalType {
    const GROUP: &'static str = SIGNAL_TYPES_GROUP;

    fn insert_action(entries: Vec<Removed<Self>>) -> NetworkAction {
        NetworkAction::InsertSignalTypes(entries)
    }

    fn remove_action(ids: Vec<EntityId>) -> NetworkAction {
        NetworkAction::RemoveSignalTypes(ids)
    }
}

impl CatalogEntity for SignalUnit {
    const GROUP: &'static str = SIGNAL_UNITS_GROUP;

    fn insert_action(entries: Vec<Removed<Self>>) -> NetworkAction {
        NetworkAction::InsertSignalUnits(entries)
    }

    fn remove_action(ids: Vec<EntityId>) -> NetworkAction {
        NetworkAction::RemoveSignalUnits(ids)
    }
}

impl CatalogEntity for SignalEnum {
    const GROUP: &'static str = SIGNAL_ENUMS_GROUP;

    fn insert_action(entries: Vec<Removed<Self>>) -> NetworkAction {
        NetworkAction::InsertSignalEnums(entries)
    }

    fn remove_action(ids: Vec<EntityId>) -> NetworkAction {
        NetworkAction::RemoveSignalEnums(ids)
    }
}

fn add_catalog<E: CatalogEntity>(ctx: &mut EditContext<'_>, entity: E) -> EditResult<Change> {
    let id = entity.id();
    let entry = Removed {
        index: E::pool(ctx.pools).len(),
        entity,
    };
    insert_catalog(ctx, vec![entry.clone()])?;
    log::info!("{} {id} angelegt", E::KIND);
    Ok(Change::changed(
        E::remove_action(vec![id]),
        E::insert_action(vec![entry]),
    ))
}

fn delete_catalog<E: CatalogEntity>(
    ctx: &mut EditContext<'_>,
    _network_id: EntityId,
    ids: Vec<EntityId>,
) -> EditResult<Change> {
    let removed = remove_catalog::<E>(ctx, &ids)?;
    log::info!("{} Einträge ({}) gelöscht", ids.len(), E::KIND);
    Ok(Change::changed(E::insert_action(removed), E::remove_action(ids)))
}

fn insert_catalog<E: CatalogEntity>(ctx: &mut EditContext<'_>, entries: Vec<Removed<E>>) -> EditResult<()> {
    for entry in entries.into_iter().rev() {
        let id = entry.restore(E::pool_mut(ctx.pools));
        sidebar_add(ctx.sidebar, E::pool(ctx.pools).get(id)?, E::GROUP);
    }
    Ok(())
}

fn remove_catalog<E: CatalogEntity>(ctx: &mut EditContext<'_>, ids: &[EntityId]) -> EditResult<Vec<Removed<E>>> {
    for id in ids {
        let entity = E::pool(ctx.pools).get(*id)?;
        let count = ctx.pools.references_to(*id).len();
        if count > 0 {
            return Err(ValidationError::StillReferenced {
                kind: E::KIND.as_str(),
                name: entity.name().to_string(),
                count,
            }
            .into());
        }
    }

    let mut removed = Vec::with_capacity(ids.len());
    for id in ids {
        removed.push(Removed::take(E::pool_mut(ctx.pools), *id)?);
        ctx.sidebar.remove(entity_key(*id));
    }
    Ok(removed)
}

pub(crate) fn apply(ctx: &mut EditContext<'_>, action: &NetworkAction) -> EditResult<()> {
    match action {
        NetworkAction::Set { network_id, field } => write(ctx, *network_id, field),
        NetworkAction::InsertBuses(removed) => insert_buses(ctx, removed.clone()),
        NetworkAction::RemoveBuses(ids) => remove_buses(ctx, ids).map(drop),
        NetworkAction::InsertNodes(removed) => insert_nodes(ctx, removed.clone()),
        NetworkAction::RemoveNodes(ids) => remove_nodes(ctx, ids).map(drop),
        NetworkAction::InsertSignalTypes(entries) => insert_catalog(ctx, entries.clone()),
        NetworkAction::RemoveSignalTypes(ids) => remove_catalog::<SignalType>(ctx, ids).map(drop),
        NetworkAction::InsertSignalUnits(entries) => insert_catalog(ctx, entries.clone()),
        NetworkAction::RemoveSignalUnits(ids) => remove_catalog::<SignalUnit>(ctx, ids).map(drop),
        NetworkAction::InsertSignalEnums(entries) => insert_catalog(ctx, entries.clone()),
        NetworkAction::RemoveSignalEnums(ids) => remove_catalog::<SignalEnum>(ctx, ids).map(drop),
    }
}
