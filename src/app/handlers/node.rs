//! Handler für Nodes: Node-ID, Interfaces, Bus-Anschluss und Messages.

use super::{
    distinct_ids, ensure_can_ids_free, restore_all, sidebar_add, sidebar_add_interface,
    sidebar_remove_interface, Removed,
};
use crate::app::command::{Change, EditContext};
use crate::app::error::{EditError, EditResult};
use crate::app::pool::Pools;
use crate::app::service::Service;
use crate::app::sidebar::items::{entity_key, interface_group_key, interface_group_name};
use crate::app::snapshot::NodeSnapshot;
use crate::core::message::default_can_id;
use crate::core::naming::{first_free_number, next_free_name};
use crate::core::{
    rules, Entity, EntityId, InterfaceRef, Message, Node, NodeInterface, Signal, ValidationError,
};

/// Payload-Größe neuer Messages in Byte
const DEFAULT_SIZE_BYTE: u16 = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeField {
    Name(String),
    Desc(String),
    NodeId(u32),
}

/// Position eines Interfaces in der Anschlussliste eines Busses
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusPosition {
    pub bus: EntityId,
    pub index: usize,
}

/// Gelöschte Message samt Platz im Interface und ihren Signalen
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRemoval {
    pub number: u8,
    pub position: usize,
    pub message: Removed<Message>,
    pub signals: Vec<Removed<Signal>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeAction {
    Set {
        node_id: EntityId,
        field: NodeField,
    },
    InsertInterface {
        node_id: EntityId,
        interface: NodeInterface,
    },
    RemoveInterface {
        node_id: EntityId,
        number: u8,
    },
    /// Setzt den Bus-Anschluss eines Interfaces (`None` = getrennt).
    Attach {
        interface: InterfaceRef,
        target: Option<BusPosition>,
    },
    InsertMessages {
        node_id: EntityId,
        messages: Vec<MessageRemoval>,
    },
    RemoveMessages {
        node_id: EntityId,
        ids: Vec<EntityId>,
    },
}

impl Service<Node> {
    /// Benennt den Node um, inklusive seiner Interface-Gruppen in der Sidebar.
    pub fn update_name(&self, node_id: EntityId, name: &str) -> EditResult<NodeSnapshot> {
        self.handle(node_id, NodeField::Name(self.normalize_name(name)), update)
    }

    pub fn update_desc(&self, node_id: EntityId, desc: &str) -> EditResult<NodeSnapshot> {
        self.handle(node_id, NodeField::Desc(desc.to_string()), update)
    }

    /// Ändert die Node-ID. Abgeleitete CAN-IDs der Messages müssen frei bleiben.
    pub fn update_node_id(&self, node_id: EntityId, value: u32) -> EditResult<NodeSnapshot> {
        self.handle(node_id, NodeField::NodeId(value), update)
    }

    /// Legt ein getrenntes Interface mit der kleinsten freien Nummer an.
    pub fn add_interface(&self, node_id: EntityId) -> EditResult<NodeSnapshot> {
        self.handle(node_id, (), |ctx, node_id, ()| {
            let node = ctx.pools.nodes.get_mut(node_id)?;
            let interface = NodeInterface::new(node.next_interface_number());
            node.insert_interface(interface.clone())?;
            Ok(Change::changed(
                NodeAction::RemoveInterface {
                    node_id,
                    number: interface.number,
                },
                NodeAction::InsertInterface { node_id, interface },
            ))
        })
    }

    /// Entfernt ein getrenntes Interface ohne Messages.
    pub fn remove_interface(&self, node_id: EntityId, number: u8) -> EditResult<NodeSnapshot> {
        self.handle(node_id, number, |ctx, node_id, number| {
            let interface = ctx.pools.nodes.get_mut(node_id)?.remove_interface(number)?;
            Ok(Change::changed(
                NodeAction::InsertInterface { node_id, interface },
                NodeAction::RemoveInterface { node_id, number },
            ))
        })
    }

    /// Hängt ein Interface an einen Bus, ggf. vom bisherigen Bus um.
    pub fn attach_interface(&self, node_id: EntityId, number: u8, bus_id: EntityId) -> EditResult<NodeSnapshot> {
        self.handle(node_id, (number, bus_id), |ctx, node_id, (number, bus_id)| {
            let node = ctx.pools.nodes.get(node_id)?;
            let interface = node.interface(number)?;
            if interface.bus == Some(bus_id) {
                return Ok(Change::Unchanged);
            }
            let can_ids = interface_can_ids(ctx.pools, interface, node.node_id)?;
            ensure_can_ids_free(ctx.pools, bus_id, &[], can_ids)?;

            let interface_ref = node.interface_ref(number);
            let previous = current_position(ctx.pools, interface_ref)?;
            let target = BusPosition {
                bus: bus_id,
                index: ctx.pools.buses.get(bus_id)?.interfaces.len(),
            };
            set_attachment(ctx, interface_ref, Some(target))?;
            log::info!("Interface {node_id}:{number} an Bus {bus_id} angeschlossen");
            Ok(Change::changed(
                NodeAction::Attach {
                    interface: interface_ref,
                    target: previous,
                },
                NodeAction::Attach {
                    interface: interface_ref,
                    target: Some(target),
                },
            ))
        })
    }

    /// Trennt ein Interface vom Bus; es darf keine Messages mehr senden.
    pub fn detach_interface(&self, node_id: EntityId, number: u8) -> EditResult<NodeSnapshot> {
        self.handle(node_id, number, |ctx, node_id, number| {
            let node = ctx.pools.nodes.get(node_id)?;
            let interface = node.interface(number)?;
            if interface.bus.is_none() {
                return Err(ValidationError::InterfaceNotAttached(number).into());
            }
            if !interface.messages.is_empty() {
                return Err(ValidationError::InterfaceHasMessages(number).into());
            }
            let interface_ref = node.interface_ref(number);
            let previous = current_position(ctx.pools, interface_ref)?;
            set_attachment(ctx, interface_ref, None)?;
            Ok(Change::changed(
                NodeAction::Attach {
                    interface: interface_ref,
                    target: previous,
                },
                NodeAction::Attach {
                    interface: interface_ref,
                    target: None,
                },
            ))
        })
    }

    /// Legt eine Message `new_message_N` auf einem angeschlossenen Interface an.
    ///
    /// Die Message-ID ist die erste freie ab 1, deren abgeleitete CAN-ID auf dem Bus frei ist.
    pub fn add_message(&self, node_id: EntityId, number: u8) -> EditResult<NodeSnapshot> {
        self.handle(node_id, number, |ctx, node_id, number| {
            let node = ctx.pools.nodes.get(node_id)?;
            let interface = node.interface(number)?;
            let bus_id = interface
                .bus
                .ok_or(ValidationError::InterfaceNotAttached(number))?;

            let sibling_names = interface
                .messages
                .iter()
                .map(|id| ctx.pools.messages.get(*id).map(Entity::name))
                .collect::<EditResult<Vec<_>>>()?;
            let name = next_free_name("new_message", sibling_names);
            let message_id = next_message_id(ctx.pools, node, bus_id)?;
            let message = Message::new(name, message_id, node.interface_ref(number), DEFAULT_SIZE_BYTE)?;

            let removal = MessageRemoval {
                number,
                position: interface.messages.len(),
                message: Removed {
                    index: ctx.pools.messages.len(),
                    entity: message,
                },
                signals: Vec::new(),
            };
            let id = removal.message.entity.id();
            insert_messages(ctx, node_id, vec![removal.clone()])?;
            log::info!("Message {id} (Message-ID {message_id}) angelegt");
            Ok(Change::changed(
                NodeAction::RemoveMessages {
                    node_id,
                    ids: vec![id],
                },
                NodeAction::InsertMessages {
                    node_id,
                    messages: vec![removal],
                },
            ))
        })
    }

    /// Löscht Messages des Nodes samt ihrer Signale.
    pub fn delete_messages(&self, node_id: EntityId, message_ids: &[EntityId]) -> EditResult<NodeSnapshot> {
        self.handle(node_id, distinct_ids(message_ids)?, |ctx, node_id, ids| {
            let removed = remove_messages(ctx, node_id, &ids)?;
            log::info!("{} Message(s) gelöscht", ids.len());
            Ok(Change::changed(
                NodeAction::InsertMessages {
                    node_id,
                    messages: removed,
                },
                NodeAction::RemoveMessages { node_id, ids },
            ))
        })
    }

    /// Node-IDs der übrigen Nodes, aufsteigend
    pub fn list_invalid_ids(&self, node_id: EntityId) -> EditResult<Vec<u32>> {
        self.read(|pools| {
            pools.nodes.get(node_id)?;
            let mut ids: Vec<u32> = pools
                .nodes
                .iter()
                .filter(|n| n.id() != node_id)
                .map(|n| n.node_id)
                .collect();
            ids.sort_unstable();
            Ok(ids)
        })
    }
}

fn current(node: &Node, field: &NodeField) -> NodeField {
    match field {
        NodeField::Name(_) => NodeField::Name(node.name().to_string()),
        NodeField::Desc(_) => NodeField::Desc(node.desc().to_string()),
        NodeField::NodeId(_) => NodeField::NodeId(node.node_id),
    }
}

fn update(ctx: &mut EditContext<'_>, node_id: EntityId, field: NodeField) -> EditResult<Change> {
    let old = current(ctx.pools.nodes.get(node_id)?, &field);
    if old == field {
        return Ok(Change::Unchanged);
    }
    write(ctx, node_id, &field)?;
    Ok(Change::changed(
        NodeAction::Set {
            node_id,
            field: old,
        },
        NodeAction::Set { node_id, field },
    ))
}

fn write(ctx: &mut EditContext<'_>, node_id: EntityId, field: &NodeField) -> EditResult<()> {
    if let NodeField::NodeId(value) = field {
        check_node_id(ctx.pools, node_id, *value)?;
    }

    let node = ctx.pools.nodes.get_mut(node_id)?;
    match field {
        NodeField::Name(name) => {
            node.base.rename(name)?;
            ctx.sidebar.update_name(entity_key(node_id), name.as_str());
            for interface in &node.interfaces {
                if let Some(bus_id) = interface.bus {
                    ctx.sidebar.update_name(
                        interface_group_key(bus_id, node_id, interface.number),
                        interface_group_name(node, interface.number),
                    );
                }
            }
        }
        NodeField::Desc(desc) => node.base.desc = desc.clone(),
        NodeField::NodeId(value) => node.node_id = *value,
    }
    Ok(())
}

/// Eindeutige Node-ID und freie CAN-IDs für alle abgeleiteten Message-IDs
fn check_node_id(pools: &Pools, node_id: EntityId, value: u32) -> EditResult<()> {
    rules::ensure_unique_node_id(
        pools
            .nodes
            .iter()
            .filter(|n| n.id() != node_id)
            .map(|n| n.node_id),
        value,
    )?;
    let node = pools.nodes.get(node_id)?;
    for interface in &node.interfaces {
        if let Some(bus_id) = interface.bus {
            let can_ids = interface_can_ids(pools, interface, value)?;
            ensure_can_ids_free(pools, bus_id, &interface.messages, can_ids)?;
        }
    }
    Ok(())
}

/// CAN-IDs der Messages eines Interfaces bei Node-ID `node_id`
fn interface_can_ids(pools: &Pools, interface: &NodeInterface, node_id: u32) -> EditResult<Vec<u32>> {
    interface
        .messages
        .iter()
        .map(|id| pools.messages.get(*id).map(|m| m.can_id(node_id)))
        .collect()
}

fn next_message_id(pools: &Pools, node: &Node, bus_id: EntityId) -> EditResult<u32> {
    let bus_type = pools.buses.get(bus_id)?.bus_type;
    let taken_can_ids = pools.bus_can_ids(bus_id, &[])?;
    let mut taken = node
        .message_ids()
        .map(|id| pools.messages.get(id).map(|m| m.message_id))
        .collect::<EditResult<Vec<_>>>()?;
    loop {
        let candidate = first_free_number(taken.iter().copied(), 1);
        let can_id = default_can_id(candidate, node.node_id);
        match rules::ensure_can_id_available(bus_type, taken_can_ids.iter().copied(), can_id) {
            Ok(()) => return Ok(candidate),
            Err(ValidationError::DuplicateCanId(_)) => taken.push(candidate),
            Err(err) => return Err(err.into()),
        }
    }
}

fn current_position(pools: &Pools, interface: InterfaceRef) -> EditResult<Option<BusPosition>> {
    let node = pools.nodes.get(interface.node)?;
    let Some(bus_id) = node.interface(interface.number)?.bus else {
        return Ok(None);
    };
    let bus = pools.buses.get(bus_id)?;
    let index = bus
        .interfaces
        .iter()
        .position(|i| *i == interface)
        .ok_or(ValidationError::InterfaceNotAttached(interface.number))?;
    Ok(Some(BusPosition { bus: bus_id, index }))
}

/// Löst das Interface vom bisherigen Bus und hängt es an `target`.
///
/// Scheitert der zweite Schritt, wird der erste zurückgenommen.
fn set_attachment(
    ctx: &mut EditContext<'_>,
    interface: InterfaceRef,
    target: Option<BusPosition>,
) -> EditResult<()> {
    let previous = ctx
        .pools
        .nodes
        .get(interface.node)?
        .interface(interface.number)?
        .bus;
    if let Some(target) = target {
        ctx.pools.buses.get(target.bus)?;
    }

    let detached_at = match previous {
        Some(old_bus) => {
            let index = ctx.pools.buses.get_mut(old_bus)?.detach(interface);
            sidebar_remove_interface(ctx.sidebar, old_bus, interface.node, interface.number);
            index.map(|index| BusPosition {
                bus: old_bus,
                index,
            })
        }
        None => None,
    };

    if let Some(target) = target {
        if let Err(err) = ctx
            .pools
            .buses
            .get_mut(target.bus)?
            .attach(interface, Some(target.index))
        {
            if let Some(old) = detached_at {
                ctx.pools
                    .buses
                    .get_mut(old.bus)?
                    .attach(interface, Some(old.index))?;
                sidebar_add_interface(ctx, old.bus, interface.node, interface.number)?;
            }
            return Err(err.into());
        }
    }

    ctx.pools
        .nodes
        .get_mut(interface.node)?
        .interface_mut(interface.number)?
        .bus = target.map(|t| t.bus);
    if let Some(target) = target {
        sidebar_add_interface(ctx, target.bus, interface.node, interface.number)?;
    }
    Ok(())
}

fn insert_messages(ctx: &mut EditContext<'_>, node_id: EntityId, removed: Vec<MessageRemoval>) -> EditResult<()> {
    for removal in removed.into_iter().rev() {
        let message_id = removal.message.restore(&mut ctx.pools.messages);
        restore_all(&mut ctx.pools.signals, removal.signals);

        let interface = ctx
            .pools
            .nodes
            .get_mut(node_id)?
            .interface_mut(removal.number)?;
        let position = removal.position.min(interface.messages.len());
        interface.messages.insert(position, message_id);

        if let Some(bus_id) = interface.bus {
            sidebar_add(
                ctx.sidebar,
                ctx.pools.messages.get(message_id)?,
                &interface_group_key(bus_id, node_id, removal.number),
            );
        }
    }
    Ok(())
}

fn remove_messages(ctx: &mut EditContext<'_>, node_id: EntityId, ids: &[EntityId]) -> EditResult<Vec<MessageRemoval>> {
    for id in ids {
        let message = ctx.pools.messages.get(*id)?;
        if message.sender.node != node_id {
            return Err(EditError::invalid(format!(
                "message {id} is not sent by node {node_id}"
            )));
        }
    }

    let mut removed = Vec::with_capacity(ids.len());
    for id in ids {
        let number = ctx.pools.messages.get(*id)?.sender.number;
        let interface = ctx.pools.nodes.get_mut(node_id)?.interface_mut(number)?;
        let position = interface
            .messages
            .iter()
            .position(|m| m == id)
            .unwrap_or(interface.messages.len());
        interface.messages.retain(|m| m != id);

        let (index, message) = ctx.pools.messages.take(*id)?;
        let mut signals = Vec::new();
        for slot in message.payload.slots() {
            signals.push(Removed::take(&mut ctx.pools.signals, slot.signal)?);
        }
        ctx.sidebar.remove(entity_key(*id));
        removed.push(MessageRemoval {
            number,
            position,
            message: Removed {
                index,
                entity: message,
            },
            signals,
        });
    }
    Ok(removed)
}

pub(crate) fn apply(ctx: &mut EditContext<'_>, action: &NodeAction) -> EditResult<()> {
    match action {
        NodeAction::Set { node_id, field } => write(ctx, *node_id, field),
        NodeAction::InsertInterface { node_id, interface } => {
            ctx.pools
                .nodes
                .get_mut(*node_id)?
                .insert_interface(interface.clone())?;
            Ok(())
        }
        NodeAction::RemoveInterface { node_id, number } => {
            ctx.pools.nodes.get_mut(*node_id)?.remove_interface(*number)?;
            Ok(())
        }
        NodeAction::Attach { interface, target } => {
            let current = current_position(ctx.pools, *interface)?;
            if current.map(|p| p.bus) == target.map(|t| t.bus) {
                return Ok(());
            }
            set_attachment(ctx, *interface, *target)
        }
        NodeAction::InsertMessages { node_id, messages } => {
            insert_messages(ctx, *node_id, messages.clone())
        }
        NodeAction::RemoveMessages { node_id, ids } => remove_messages(ctx, *node_id, ids).map(drop),
    }
}

