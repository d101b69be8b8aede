//! Übergabeformat an die Persistenz und ein Builder für konsistente Netzwerke.

use super::bus::Bus;
use super::catalog::{
    SignalEnum, SignalEnumValue, SignalType, SignalTypeKind, SignalUnit, SignalUnitKind,
};
use super::entity::Entity;
use super::error::ValidationError;
use super::ids::EntityId;
use super::message::Message;
use super::network::Network;
use super::node::{Node, NodeInterface};
use super::rules;
use super::signal::{Signal, SignalKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Vollständig befülltes Netzwerk: Wurzel plus flache Entity-Listen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkGraph {
    pub network: Network,
    #[serde(default)]
    pub buses: Vec<Bus>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default)]
    pub signal_types: Vec<SignalType>,
    #[serde(default)]
    pub signal_units: Vec<SignalUnit>,
    #[serde(default)]
    pub signal_enums: Vec<SignalEnum>,
}

impl NetworkGraph {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            buses: Vec::new(),
            nodes: Vec::new(),
            messages: Vec::new(),
            signals: Vec::new(),
            signal_types: Vec::new(),
            signal_units: Vec::new(),
            signal_enums: Vec::new(),
        }
    }

    /// Parst ein Netzwerk aus JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Prüft IDs und Querverweise, bevor der Graph eine Session ersetzt.
    ///
    /// Jede ID darf nur einmal vorkommen, über alle Arten hinweg. Verweise zwischen Netzwerk,
    /// Bus, Interface, Message und Signal müssen in beide Richtungen stimmen.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        let enum_values = self.signal_enums.iter().flat_map(|e| e.values.iter().map(|v| v.id));
        let ids = std::iter::once(self.network.id())
            .chain(self.buses.iter().map(Entity::id))
            .chain(self.nodes.iter().map(Entity::id))
            .chain(self.messages.iter().map(Entity::id))
            .chain(self.signals.iter().map(Entity::id))
            .chain(self.signal_types.iter().map(Entity::id))
            .chain(self.signal_units.iter().map(Entity::id))
            .chain(self.signal_enums.iter().map(Entity::id))
            .chain(enum_values);
        for id in ids {
            if !seen.insert(id) {
                return Err(ValidationError::DuplicateId(id));
            }
        }

        let buses: HashMap<EntityId, &Bus> = self.buses.iter().map(|b| (b.id(), b)).collect();
        let nodes: HashMap<EntityId, &Node> = self.nodes.iter().map(|n| (n.id(), n)).collect();
        let messages: HashMap<EntityId, &Message> =
            self.messages.iter().map(|m| (m.id(), m)).collect();
        let signals: HashMap<EntityId, &Signal> = self.signals.iter().map(|s| (s.id(), s)).collect();

        let network_id = self.network.id();
        for bus_id in &self.network.buses {
            if !buses.contains_key(bus_id) {
                return Err(ValidationError::UnknownEntity(*bus_id));
            }
        }
        for bus in &self.buses {
            if !self.network.buses.contains(&bus.id()) {
                return Err(ValidationError::BrokenReference {
                    from: bus.id(),
                    to: network_id,
                });
            }
            for interface_ref in &bus.interfaces {
                let node = nodes
                    .get(&interface_ref.node)
                    .ok_or(ValidationError::UnknownEntity(interface_ref.node))?;
                if node.interface(interface_ref.number)?.bus != Some(bus.id()) {
                    return Err(ValidationError::BrokenReference {
                        from: bus.id(),
                        to: node.id(),
                    });
                }
            }
        }

        for node in &self.nodes {
            for interface in &node.interfaces {
                if let Some(bus_id) = interface.bus {
                    let bus = buses.get(&bus_id).ok_or(ValidationError::UnknownEntity(bus_id))?;
                    if !bus.interfaces.contains(&node.interface_ref(interface.number)) {
                        return Err(ValidationError::BrokenReference {
                            from: node.id(),
                            to: bus_id,
                        });
                    }
                }
                for message_id in &interface.messages {
                    let message = messages
                        .get(message_id)
                        .ok_or(ValidationError::UnknownEntity(*message_id))?;
                    if message.sender != node.interface_ref(interface.number) {
                        return Err(ValidationError::BrokenReference {
                            from: node.id(),
                            to: *message_id,
                        });
                    }
                }
            }
        }

        for message in &self.messages {
            let node = nodes
                .get(&message.sender.node)
                .ok_or(ValidationError::UnknownEntity(message.sender.node))?;
            if !node.interface(message.sender.number)?.messages.contains(&message.id()) {
                return Err(ValidationError::BrokenReference {
                    from: message.id(),
                    to: node.id(),
                });
            }
            for slot in message.payload.slots() {
                let signal = signals
                    .get(&slot.signal)
                    .ok_or(ValidationError::UnknownEntity(slot.signal))?;
                if signal.message != message.id() {
                    return Err(ValidationError::BrokenReference {
                        from: message.id(),
                        to: slot.signal,
                    });
                }
            }
        }

        for signal in &self.signals {
            let message = messages
                .get(&signal.message)
                .ok_or(ValidationError::UnknownEntity(signal.message))?;
            if message.payload.slot(signal.id()).is_none() {
                return Err(ValidationError::BrokenReference {
                    from: signal.id(),
                    to: message.id(),
                });
            }
            let catalog_ok = match signal.kind {
                SignalKind::Standard {
                    signal_type,
                    signal_unit,
                } => {
                    self.signal_types.iter().any(|t| t.id() == signal_type)
                        && signal_unit.map_or(true, |unit| {
                            self.signal_units.iter().any(|u| u.id() == unit)
                        })
                }
                SignalKind::Enum { signal_enum } => {
                    self.signal_enums.iter().any(|e| e.id() == signal_enum)
                }
            };
            if !catalog_ok {
                return Err(ValidationError::UnknownEntity(signal.id()));
            }
        }
        Ok(())
    }

    /// Meldet alle enthaltenen IDs beim Generator an, damit neue IDs nicht kollidieren.
    pub fn reserve_ids(&self) {
        self.network.id().reserve();
        self.buses.iter().for_each(|e| e.id().reserve());
        self.nodes.iter().for_each(|e| e.id().reserve());
        self.messages.iter().for_each(|e| e.id().reserve());
        self.signals.iter().for_each(|e| e.id().reserve());
        self.signal_types.iter().for_each(|e| e.id().reserve());
        self.signal_units.iter().for_each(|e| e.id().reserve());
        for signal_enum in &self.signal_enums {
            signal_enum.id().reserve();
            signal_enum.values.iter().for_each(|v| v.id.reserve());
        }
    }
}

/// Baut ein Netzwerk schrittweise auf und prüft dabei die Domänenregeln.
pub struct GraphBuilder {
    graph: NetworkGraph,
}

impl GraphBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            graph: NetworkGraph::new(Network::new(name)),
        }
    }

    pub fn bus(&mut self, name: &str, baudrate: u32) -> Result<EntityId, ValidationError> {
        let mut bus = Bus::new(name);
        bus.set_baudrate(baudrate)?;
        let id = bus.id();
        self.graph.network.insert_bus(usize::MAX, id);
        self.graph.buses.push(bus);
        Ok(id)
    }

    pub fn node(&mut self, name: &str, node_id: u32) -> Result<EntityId, ValidationError> {
        rules::ensure_unique_node_id(self.graph.nodes.iter().map(|n| n.node_id), node_id)?;
        let node = Node::new(name, node_id);
        let id = node.id();
        self.graph.nodes.push(node);
        Ok(id)
    }

    /// Legt ein weiteres Interface an und liefert dessen Nummer.
    pub fn add_interface(&mut self, node: EntityId) -> Result<u8, ValidationError> {
        let node = self.node_mut(node)?;
        let number = node.next_interface_number();
        node.insert_interface(NodeInterface::new(number))?;
        Ok(number)
    }

    pub fn attach(&mut self, node: EntityId, number: u8, bus: EntityId) -> Result<(), ValidationError> {
        let bus_index = self
            .graph
            .buses
            .iter()
            .position(|b| b.id() == bus)
            .ok_or(ValidationError::UnknownEntity(bus))?;
        let node = self.node_mut(node)?;
        let interface_ref = node.interface_ref(number);
        let interface = node.interface_mut(number)?;
        if interface.bus.is_some() {
            return Err(ValidationError::InterfaceAttached(number));
        }
        interface.bus = Some(bus);
        self.graph.buses[bus_index].attach(interface_ref, None)
    }

    pub fn signal_type(
        &mut self,
        name: &str,
        kind: SignalTypeKind,
        size: u16,
        signed: bool,
    ) -> Result<EntityId, ValidationError> {
        let signal_type = SignalType::new(name, kind, size, signed)?;
        let id = signal_type.id();
        self.graph.signal_types.push(signal_type);
        Ok(id)
    }

    pub fn signal_unit(&mut self, name: &str, kind: SignalUnitKind, symbol: &str) -> EntityId {
        let unit = SignalUnit::new(name, kind, symbol);
        let id = unit.id();
        self.graph.signal_units.push(unit);
        id
    }

    /// Enum mit fortlaufenden Indizes ab 0
    pub fn signal_enum(&mut self, name: &str, values: &[&str]) -> Result<EntityId, ValidationError> {
        let mut signal_enum = SignalEnum::new(name);
        for (index, value) in values.iter().enumerate() {
            signal_enum.insert_value(
                index,
                SignalEnumValue {
                    id: EntityId::generate(),
                    name: value.to_string(),
                    index: index as u32,
                    desc: String::new(),
                },
            )?;
        }
        let id = signal_enum.id();
        self.graph.signal_enums.push(signal_enum);
        Ok(id)
    }

    /// Message auf einem angeschlossenen Interface
    pub fn message(
        &mut self,
        node: EntityId,
        number: u8,
        name: &str,
        message_id: u32,
        size_byte: u16,
    ) -> Result<EntityId, ValidationError> {
        let (sender, node_id, bus_id, siblings) = {
            let node = self.node_ref(node)?;
            let interface = node.interface(number)?;
            let bus_id = interface
                .bus
                .ok_or(ValidationError::InterfaceNotAttached(number))?;
            (node.interface_ref(number), node.node_id, bus_id, interface.messages.clone())
        };
        let sibling_ids = self
            .graph
            .messages
            .iter()
            .filter(|m| siblings.contains(&m.id()))
            .map(|m| m.message_id);
        rules::ensure_unique_message_id(sibling_ids, message_id)?;

        let message = Message::new(name, message_id, sender, size_byte)?;
        let bus = self
            .graph
            .buses
            .iter()
            .find(|b| b.id() == bus_id)
            .ok_or(ValidationError::UnknownEntity(bus_id))?;
        let taken: Vec<u32> = self
            .graph
            .messages
            .iter()
            .filter(|m| bus.interfaces.contains(&m.sender))
            .filter_map(|m| {
                let sender = self.graph.nodes.iter().find(|n| n.id() == m.sender.node)?;
                Some(m.can_id(sender.node_id))
            })
            .collect();
        rules::ensure_can_id_available(bus.bus_type, taken, message.can_id(node_id))?;

        let id = message.id();
        self.node_mut(node)?.interface_mut(number)?.messages.push(id);
        self.graph.messages.push(message);
        Ok(id)
    }

    /// Standard-Signal direkt hinter dem letzten Signal
    pub fn standard_signal(
        &mut self,
        message: EntityId,
        name: &str,
        signal_type: EntityId,
    ) -> Result<EntityId, ValidationError> {
        let size = self
            .graph
            .signal_types
            .iter()
            .find(|t| t.id() == signal_type)
            .map(|t| t.size)
            .ok_or(ValidationError::UnknownEntity(signal_type))?;
        self.place(Signal::standard(name, message, signal_type), size)
    }

    /// Enum-Signal direkt hinter dem letzten Signal
    pub fn enum_signal(
        &mut self,
        message: EntityId,
        name: &str,
        signal_enum: EntityId,
    ) -> Result<EntityId, ValidationError> {
        let size = self
            .graph
            .signal_enums
            .iter()
            .find(|e| e.id() == signal_enum)
            .map(SignalEnum::size)
            .ok_or(ValidationError::UnknownEntity(signal_enum))?;
        self.place(Signal::enumerated(name, message, signal_enum), size)
    }

    pub fn build(self) -> NetworkGraph {
        self.graph
    }

    fn place(&mut self, signal: Signal, size: u16) -> Result<EntityId, ValidationError> {
        let message_id = signal.message;
        let message = self
            .graph
            .messages
            .iter_mut()
            .find(|m| m.id() == message_id)
            .ok_or(ValidationError::UnknownEntity(message_id))?;
        let start = message.payload.slots().last().map_or(0, |s| s.end());
        message.payload.insert(signal.id(), start, size)?;
        let id = signal.id();
        self.graph.signals.push(signal);
        Ok(id)
    }

    fn node_ref(&self, id: EntityId) -> Result<&Node, ValidationError> {
        self.graph
            .nodes
            .iter()
            .find(|n| n.id() == id)
            .ok_or(ValidationError::UnknownEntity(id))
    }

    fn node_mut(&mut self, id: EntityId) -> Result<&mut Node, ValidationError> {
        self.graph
            .nodes
            .iter_mut()
            .find(|n| n.id() == id)
            .ok_or(ValidationError::UnknownEntity(id))
    }
}

/// Kleines Beispielnetz mit zwei Bussen, drei Nodes und allen Katalogarten.
pub fn demo_graph() -> Result<NetworkGraph, ValidationError> {
    let mut builder = GraphBuilder::new("demo_network");

    let powertrain = builder.bus("powertrain", 500_000)?;
    let body = builder.bus("body", 250_000)?;

    let uint8 = builder.signal_type("uint8", SignalTypeKind::Integer, 8, false)?;
    let uint16 = builder.signal_type("uint16", SignalTypeKind::Integer, 16, false)?;
    let flag = builder.signal_type("flag", SignalTypeKind::Flag, 1, false)?;
    builder.signal_unit("rpm", SignalUnitKind::Custom, "rpm");
    builder.signal_unit("celsius", SignalUnitKind::Temperature, "°C");
    let gear = builder.signal_enum("gear_state", &["park", "reverse", "neutral", "drive"])?;

    let engine = builder.node("engine_ecu", 1)?;
    builder.attach(engine, 0, powertrain)?;
    let body_ecu = builder.node("body_ecu", 2)?;
    builder.attach(body_ecu, 0, body)?;
    let gateway = builder.node("gateway", 3)?;
    builder.attach(gateway, 0, powertrain)?;
    let second = builder.add_interface(gateway)?;
    builder.attach(gateway, second, body)?;

    let engine_status = builder.message(engine, 0, "engine_status", 1, 8)?;
    builder.standard_signal(engine_status, "engine_speed", uint16)?;
    builder.standard_signal(engine_status, "coolant_temp", uint8)?;
    builder.enum_signal(engine_status, "gear", gear)?;

    let doors = builder.message(body_ecu, 0, "door_status", 1, 2)?;
    builder.standard_signal(doors, "driver_door_open", flag)?;
    builder.standard_signal(doors, "passenger_door_open", flag)?;

    let relay = builder.message(gateway, second, "gear_relay", 2, 1)?;
    builder.enum_signal(relay, "relayed_gear", gear)?;

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_graph_is_consistent() {
        let graph = demo_graph().expect("Demo-Netz erwartet");
        assert_eq!(graph.validate(), Ok(()));
        assert_eq!(graph.buses.len(), 2);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.messages.len(), 3);
        assert_eq!(graph.signals.len(), 6);

        let engine_status = graph
            .messages
            .iter()
            .find(|m| m.name() == "engine_status")
            .expect("engine_status erwartet");
        let starts: Vec<u16> = engine_status.payload.slots().iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 16, 24]);
    }

    #[test]
    fn test_message_requires_attached_interface() {
        let mut builder = GraphBuilder::new("net");
        let node = builder.node("ecu", 1).expect("Node erwartet");
        assert_eq!(
            builder.message(node, 0, "msg", 1, 8),
            Err(ValidationError::InterfaceNotAttached(0))
        );
    }

    #[test]
    fn test_builder_rejects_can_id_collision() {
        let mut builder = GraphBuilder::new("net");
        let bus = builder.bus("bus", 500_000).expect("Bus erwartet");
        let a = builder.node("a", 1).expect("Node erwartet");
        let b = builder.node("b", 17).expect("Node erwartet");
        builder.attach(a, 0, bus).expect("Attach erwartet");
        builder.attach(b, 0, bus).expect("Attach erwartet");

        builder.message(a, 0, "first", 1, 8).expect("Message erwartet");
        // Node-ID 17 teilt sich die unteren 4 Bit mit Node-ID 1
        assert_eq!(
            builder.message(b, 0, "second", 1, 8),
            Err(ValidationError::DuplicateCanId(0x11))
        );
    }

    #[test]
    fn test_json_round_trip_keeps_graph() {
        let graph = demo_graph().expect("Demo-Netz erwartet");
        let json = graph.to_json_pretty().expect("JSON erwartet");
        let parsed = NetworkGraph::from_json(&json).expect("Parse erwartet");
        assert_eq!(parsed, graph);
    }
}
