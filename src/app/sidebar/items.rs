//! Schlüssel und Teilbäume der Sidebar, gebaut aus dem Pool-Zustand.
//!
//! Läuft beim Aufrufer unter dessen Pool-Lock; der Sidebar-Worker sieht nur fertige Daten.

use super::tree::{SidebarItem, SidebarKind};
use crate::app::error::EditResult;
use crate::app::pool::Pools;
use crate::core::{Bus, Entity, EntityId, EntityKind, Node};

pub const NETWORK_KEY: &str = "network";
pub const BUSES_GROUP: &str = "group:buses";
pub const NODES_GROUP: &str = "group:nodes";
pub const MESSAGES_GROUP: &str = "group:messages";
pub const SIGNAL_TYPES_GROUP: &str = "group:signal-types";
pub const SIGNAL_UNITS_GROUP: &str = "group:signal-units";
pub const SIGNAL_ENUMS_GROUP: &str = "group:signal-enums";

pub fn entity_key(id: EntityId) -> String {
    id.to_string()
}

/// Gruppe aller Messages eines Busses
pub fn bus_group_key(bus: EntityId) -> String {
    format!("{MESSAGES_GROUP}:{bus}")
}

/// Gruppe der Messages eines Node-Interfaces auf einem Bus
pub fn interface_group_key(bus: EntityId, node: EntityId, number: u8) -> String {
    format!("{MESSAGES_GROUP}:{bus}:{node}:{number}")
}

pub fn interface_group_name(node: &Node, number: u8) -> String {
    format!("{}:{number}", node.name())
}

/// Blattknoten für eine Entity
pub fn entity_item<E: Entity>(entity: &E) -> SidebarItem {
    SidebarItem::leaf(
        SidebarKind::Entity(E::KIND),
        entity_key(entity.id()),
        entity.name(),
    )
}

fn group(key: impl Into<String>, name: impl Into<String>, children: Vec<SidebarItem>) -> SidebarItem {
    SidebarItem {
        kind: SidebarKind::Group,
        key: key.into(),
        name: name.into(),
        children,
    }
}

/// Interface-Gruppe samt Messages
pub fn interface_group(pools: &Pools, bus: EntityId, node: &Node, number: u8) -> EditResult<SidebarItem> {
    let interface = node.interface(number)?;
    let messages = interface
        .messages
        .iter()
        .map(|id| pools.messages.get(*id).map(entity_item))
        .collect::<EditResult<Vec<_>>>()?;
    Ok(group(
        interface_group_key(bus, node.id(), number),
        interface_group_name(node, number),
        messages,
    ))
}

/// Message-Gruppe eines Busses mit allen angeschlossenen Interfaces
pub fn bus_message_group(pools: &Pools, bus: &Bus) -> EditResult<SidebarItem> {
    let interfaces = bus
        .interfaces
        .iter()
        .map(|iface| {
            let node = pools.nodes.get(iface.node)?;
            interface_group(pools, bus.id(), node, iface.number)
        })
        .collect::<EditResult<Vec<_>>>()?;
    Ok(group(bus_group_key(bus.id()), bus.name(), interfaces))
}

/// Vollständiger Baum für `load`
pub fn network_tree(pools: &Pools) -> EditResult<SidebarItem> {
    let network = pools.network()?;
    let buses = network
        .buses
        .iter()
        .map(|id| pools.buses.get(*id))
        .collect::<EditResult<Vec<_>>>()?;

    let message_groups = buses
        .iter()
        .map(|bus| bus_message_group(pools, bus))
        .collect::<EditResult<Vec<_>>>()?;

    let mut root = group(
        NETWORK_KEY,
        network.name(),
        vec![
            group(BUSES_GROUP, "Buses", buses.iter().map(|b| entity_item(*b)).collect()),
            group(NODES_GROUP, "Nodes", pools.nodes.iter().map(entity_item).collect()),
            group(MESSAGES_GROUP, "Messages", message_groups),
            group(
                SIGNAL_TYPES_GROUP,
                "Signal Types",
                pools.signal_types.iter().map(entity_item).collect(),
            ),
            group(
                SIGNAL_UNITS_GROUP,
                "Signal Units",
                pools.signal_units.iter().map(entity_item).collect(),
            ),
            group(
                SIGNAL_ENUMS_GROUP,
                "Signal Enums",
                pools.signal_enums.iter().map(entity_item).collect(),
            ),
        ],
    );
    root.kind = SidebarKind::Entity(EntityKind::Network);
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::demo_graph;

    #[test]
    fn network_tree_groups_messages_by_bus_and_interface() {
        let mut pools = Pools::default();
        pools.load(demo_graph().expect("Demo-Netz erwartet")).expect("Laden erwartet");

        let tree = network_tree(&pools).expect("Baum erwartet");
        assert_eq!(tree.kind, SidebarKind::Entity(EntityKind::Network));
        assert_eq!(tree.children.len(), 6);

        let body = pools
            .buses
            .iter()
            .find(|b| b.name() == "body")
            .expect("Bus body erwartet");
        let body_group = tree.find(&bus_group_key(body.id())).expect("Bus-Gruppe erwartet");
        let names: Vec<&str> = body_group.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["body_ecu:0", "gateway:1"]);

        assert_eq!(tree.count(SidebarKind::Entity(EntityKind::Message)), 3);
        assert_eq!(tree.count(SidebarKind::Entity(EntityKind::Signal)), 0);
    }
}
