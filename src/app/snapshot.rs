//! Konvertierte Antwortformen der Entities für GUI und Events.

use super::error::EditResult;
use super::pool::{Pool, Pools};
use super::reference::{entity_path, reference_tree, PathSegment, Reference};
use crate::core::{
    Base, Bus, BusType, ByteOrder, Entity, EntityId, EntityKind, Message, Network, Node,
    SendType, Signal, SignalEnum, SignalKind, SignalType, SignalTypeKind, SignalUnit,
    SignalUnitKind, ValidationError,
};
use serde::Serialize;
use std::fmt::Debug;
use std::time::SystemTime;

/// Basisattribute in der Antwort
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEntity {
    pub id: EntityId,
    pub name: String,
    pub desc: String,
    pub create_time: SystemTime,
}

impl From<&Base> for BaseEntity {
    fn from(base: &Base) -> Self {
        Self {
            id: base.id,
            name: base.name.clone(),
            desc: base.desc.clone(),
            create_time: base.create_time,
        }
    }
}

fn base_of<E: Entity>(entity: &E) -> BaseEntity {
    BaseEntity::from(entity.base())
}

fn sorted_bases<'a, E: Entity + 'a>(entities: impl Iterator<Item = &'a E>) -> Vec<BaseEntity> {
    let mut bases: Vec<BaseEntity> = entities.map(base_of).collect();
    bases.sort_by(|a, b| a.name.cmp(&b.name));
    bases
}

/// Verbindet eine Entity-Art mit ihrem Pool und ihrer Antwortform.
pub trait SessionEntity: Entity + Sized + 'static {
    type Snapshot: Serialize + Clone + Debug + PartialEq;

    fn pool(pools: &Pools) -> &Pool<Self>;
    fn pool_mut(pools: &mut Pools) -> &mut Pool<Self>;
    fn convert(pools: &Pools, entity: &Self) -> EditResult<Self::Snapshot>;
    fn wrap(snapshot: Self::Snapshot) -> EntitySnapshot;

    /// Namen, die für `entity` bereits vergeben sind (Standard: alle anderen im Pool)
    fn taken_names<'a>(pools: &'a Pools, entity: &Self) -> Vec<&'a str> {
        Self::pool(pools)
            .iter()
            .filter(|e| e.id() != entity.id())
            .map(Entity::name)
            .collect()
    }
}

/// Snapshot beliebiger Art, z.B. für `EntityModified`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "entity", rename_all = "kebab-case")]
pub enum EntitySnapshot {
    Network(NetworkSnapshot),
    Bus(BusSnapshot),
    Node(NodeSnapshot),
    Message(MessageSnapshot),
    Signal(SignalSnapshot),
    SignalType(SignalTypeSnapshot),
    SignalUnit(SignalUnitSnapshot),
    SignalEnum(SignalEnumSnapshot),
}

impl EntitySnapshot {
    /// Konvertiert die Entity `id` aus dem Pool `kind`; `None`, wenn sie nicht existiert.
    pub fn resolve(pools: &Pools, kind: EntityKind, id: EntityId) -> EditResult<Option<Self>> {
        match kind {
            EntityKind::Network => resolve_in::<Network>(pools, id),
            EntityKind::Bus => resolve_in::<Bus>(pools, id),
            EntityKind::Node => resolve_in::<Node>(pools, id),
            EntityKind::Message => resolve_in::<Message>(pools, id),
            EntityKind::Signal => resolve_in::<Signal>(pools, id),
            EntityKind::SignalType => resolve_in::<SignalType>(pools, id),
            EntityKind::SignalUnit => resolve_in::<SignalUnit>(pools, id),
            EntityKind::SignalEnum => resolve_in::<SignalEnum>(pools, id),
        }
    }

    pub fn base(&self) -> &BaseEntity {
        match self {
            EntitySnapshot::Network(s) => &s.base,
            EntitySnapshot::Bus(s) => &s.base,
            EntitySnapshot::Node(s) => &s.base,
            EntitySnapshot::Message(s) => &s.base,
            EntitySnapshot::Signal(s) => &s.base,
            EntitySnapshot::SignalType(s) => &s.base,
            EntitySnapshot::SignalUnit(s) => &s.base,
            EntitySnapshot::SignalEnum(s) => &s.base,
        }
    }
}

fn resolve_in<E: SessionEntity>(pools: &Pools, id: EntityId) -> EditResult<Option<EntitySnapshot>> {
    match E::pool(pools).get(id) {
        Ok(entity) => Ok(Some(E::wrap(E::convert(pools, entity)?))),
        Err(_) => Ok(None),
    }
}

// ── Netzwerk ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSnapshot {
    pub base: BaseEntity,
    /// In Netzwerk-Reihenfolge
    pub buses: Vec<BaseEntity>,
    pub nodes: Vec<BaseEntity>,
    pub signal_types: Vec<BaseEntity>,
    pub signal_units: Vec<BaseEntity>,
    pub signal_enums: Vec<BaseEntity>,
}

impl SessionEntity for Network {
    type Snapshot = NetworkSnapshot;

    fn pool(pools: &Pools) -> &Pool<Self> {
        &pools.network
    }

    fn pool_mut(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.network
    }

    fn convert(pools: &Pools, network: &Self) -> EditResult<NetworkSnapshot> {
        let buses = network
            .buses
            .iter()
            .map(|id| pools.buses.get(*id).map(base_of))
            .collect::<EditResult<Vec<_>>>()?;
        Ok(NetworkSnapshot {
            base: base_of(network),
            buses,
            nodes: sorted_bases(pools.nodes.iter()),
            signal_types: sorted_bases(pools.signal_types.iter()),
            signal_units: sorted_bases(pools.signal_units.iter()),
            signal_enums: sorted_bases(pools.signal_enums.iter()),
        })
    }

    fn wrap(snapshot: NetworkSnapshot) -> EntitySnapshot {
        EntitySnapshot::Network(snapshot)
    }
}

// ── Bus ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedInterface {
    pub node: BaseEntity,
    pub node_id: u32,
    pub number: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusSnapshot {
    pub base: BaseEntity,
    pub bus_type: BusType,
    pub baudrate: u32,
    pub interfaces: Vec<AttachedInterface>,
}

impl SessionEntity for Bus {
    type Snapshot = BusSnapshot;

    fn pool(pools: &Pools) -> &Pool<Self> {
        &pools.buses
    }

    fn pool_mut(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.buses
    }

    fn convert(pools: &Pools, bus: &Self) -> EditResult<BusSnapshot> {
        let interfaces = bus
            .interfaces
            .iter()
            .map(|iface| {
                let node = pools.nodes.get(iface.node)?;
                Ok(AttachedInterface {
                    node: base_of(node),
                    node_id: node.node_id,
                    number: iface.number,
                })
            })
            .collect::<EditResult<Vec<_>>>()?;
        Ok(BusSnapshot {
            base: base_of(bus),
            bus_type: bus.bus_type,
            baudrate: bus.baudrate,
            interfaces,
        })
    }

    fn wrap(snapshot: BusSnapshot) -> EntitySnapshot {
        EntitySnapshot::Bus(snapshot)
    }
}

// ── Node ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceSnapshot {
    pub number: u8,
    pub bus: Option<BaseEntity>,
    pub messages: Vec<BaseEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub base: BaseEntity,
    pub node_id: u32,
    pub interfaces: Vec<InterfaceSnapshot>,
}

impl SessionEntity for Node {
    type Snapshot = NodeSnapshot;

    fn pool(pools: &Pools) -> &Pool<Self> {
        &pools.nodes
    }

    fn pool_mut(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.nodes
    }

    fn convert(pools: &Pools, node: &Self) -> EditResult<NodeSnapshot> {
        let interfaces = node
            .interfaces
            .iter()
            .map(|iface| {
                let bus = iface
                    .bus
                    .map(|id| pools.buses.get(id).map(base_of))
                    .transpose()?;
                let messages = iface
                    .messages
                    .iter()
                    .map(|id| pools.messages.get(*id).map(base_of))
                    .collect::<EditResult<Vec<_>>>()?;
                Ok(InterfaceSnapshot {
                    number: iface.number,
                    bus,
                    messages,
                })
            })
            .collect::<EditResult<Vec<_>>>()?;
        Ok(NodeSnapshot {
            base: base_of(node),
            node_id: node.node_id,
            interfaces,
        })
    }

    fn wrap(snapshot: NodeSnapshot) -> EntitySnapshot {
        EntitySnapshot::Node(snapshot)
    }
}

// ── Message ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderSnapshot {
    pub node: BaseEntity,
    pub interface_number: u8,
    pub bus: Option<BaseEntity>,
}

/// Position eines Signals im Payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEntry {
    pub signal: BaseEntity,
    pub start: u16,
    pub size: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnapshot {
    pub base: BaseEntity,
    pub paths: Vec<PathSegment>,
    pub message_id: u32,
    pub static_can_id: Option<u32>,
    /// Effektive CAN-ID
    pub can_id: u32,
    pub size_byte: u16,
    pub byte_order: ByteOrder,
    pub cycle_time: u32,
    pub send_type: SendType,
    pub delay_time: u32,
    pub start_delay_time: u32,
    pub sender: SenderSnapshot,
    /// Nach Startbit sortiert
    pub signals: Vec<LayoutEntry>,
    /// Freie ganze Bytes hinter dem letzten Signal
    pub available_trailing_bytes: u16,
    /// Größte zusammenhängende Lücke in Bit
    pub max_available_space: u16,
}

impl SessionEntity for Message {
    type Snapshot = MessageSnapshot;

    fn pool(pools: &Pools) -> &Pool<Self> {
        &pools.messages
    }

    fn pool_mut(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.messages
    }

    fn convert(pools: &Pools, message: &Self) -> EditResult<MessageSnapshot> {
        let node = pools.nodes.get(message.sender.node)?;
        let bus = node
            .interface(message.sender.number)?
            .bus
            .map(|id| pools.buses.get(id).map(base_of))
            .transpose()?;
        let signals = message
            .payload
            .slots()
            .iter()
            .map(|slot| {
                Ok(LayoutEntry {
                    signal: base_of(pools.signals.get(slot.signal)?),
                    start: slot.start,
                    size: slot.size,
                })
            })
            .collect::<EditResult<Vec<_>>>()?;
        Ok(MessageSnapshot {
            base: base_of(message),
            paths: entity_path(pools, EntityKind::Message, message.id())?,
            message_id: message.message_id,
            static_can_id: message.static_can_id,
            can_id: message.can_id(node.node_id),
            size_byte: message.payload.size_byte(),
            byte_order: message.byte_order,
            cycle_time: message.cycle_time,
            send_type: message.send_type,
            delay_time: message.delay_time,
            start_delay_time: message.start_delay_time,
            sender: SenderSnapshot {
                node: base_of(node),
                interface_number: message.sender.number,
                bus,
            },
            signals,
            available_trailing_bytes: message.payload.trailing_bits() / 8,
            max_available_space: message.payload.largest_hole().map_or(0, |(_, size)| size),
        })
    }

    fn wrap(snapshot: MessageSnapshot) -> EntitySnapshot {
        EntitySnapshot::Message(snapshot)
    }

    /// Namen der anderen Messages auf demselben Interface
    fn taken_names<'a>(pools: &'a Pools, message: &Self) -> Vec<&'a str> {
        let Ok(node) = pools.nodes.get(message.sender.node) else {
            return Vec::new();
        };
        let Ok(interface) = node.interface(message.sender.number) else {
            return Vec::new();
        };
        interface
            .messages
            .iter()
            .filter(|id| **id != message.id())
            .filter_map(|id| pools.messages.get(*id).ok())
            .map(Entity::name)
            .collect()
    }
}

// ── Signal ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SignalKindSnapshot {
    #[serde(rename_all = "camelCase")]
    Standard {
        signal_type: BaseEntity,
        signal_unit: Option<BaseEntity>,
    },
    #[serde(rename_all = "camelCase")]
    Enum { signal_enum: BaseEntity },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSnapshot {
    pub base: BaseEntity,
    pub paths: Vec<PathSegment>,
    pub message: BaseEntity,
    pub start: u16,
    pub size: u16,
    pub kind: SignalKindSnapshot,
}

impl SessionEntity for Signal {
    type Snapshot = SignalSnapshot;

    fn pool(pools: &Pools) -> &Pool<Self> {
        &pools.signals
    }

    fn pool_mut(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.signals
    }

    fn convert(pools: &Pools, signal: &Self) -> EditResult<SignalSnapshot> {
        let message = pools.messages.get(signal.message)?;
        let slot = message
            .payload
            .slot(signal.id())
            .copied()
            .ok_or(ValidationError::SignalNotInPayload(signal.id()))?;
        let kind = match signal.kind {
            SignalKind::Standard {
                signal_type,
                signal_unit,
            } => SignalKindSnapshot::Standard {
                signal_type: base_of(pools.signal_types.get(signal_type)?),
                signal_unit: signal_unit
                    .map(|id| pools.signal_units.get(id).map(base_of))
                    .transpose()?,
            },
            SignalKind::Enum { signal_enum } => SignalKindSnapshot::Enum {
                signal_enum: base_of(pools.signal_enums.get(signal_enum)?),
            },
        };
        Ok(SignalSnapshot {
            base: base_of(signal),
            paths: entity_path(pools, EntityKind::Signal, signal.id())?,
            message: base_of(message),
            start: slot.start,
            size: slot.size,
            kind,
        })
    }

    fn wrap(snapshot: SignalSnapshot) -> EntitySnapshot {
        EntitySnapshot::Signal(snapshot)
    }

    /// Namen der Geschwister-Signale in derselben Message
    fn taken_names<'a>(pools: &'a Pools, signal: &Self) -> Vec<&'a str> {
        pools
            .signals
            .iter()
            .filter(|s| s.message == signal.message && s.id() != signal.id())
            .map(Entity::name)
            .collect()
    }
}

// ── Kataloge ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalTypeSnapshot {
    pub base: BaseEntity,
    pub kind: SignalTypeKind,
    pub size: u16,
    pub signed: bool,
    pub min: f64,
    pub max: f64,
    pub scale: f64,
    pub offset: f64,
    pub reference_count: usize,
    pub references: Vec<Reference>,
}

impl SessionEntity for SignalType {
    type Snapshot = SignalTypeSnapshot;

    fn pool(pools: &Pools) -> &Pool<Self> {
        &pools.signal_types
    }

    fn pool_mut(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.signal_types
    }

    fn convert(pools: &Pools, signal_type: &Self) -> EditResult<SignalTypeSnapshot> {
        let signals = pools.references_to(signal_type.id());
        Ok(SignalTypeSnapshot {
            base: base_of(signal_type),
            kind: signal_type.kind,
            size: signal_type.size,
            signed: signal_type.signed,
            min: signal_type.min,
            max: signal_type.max,
            scale: signal_type.scale,
            offset: signal_type.offset,
            reference_count: signals.len(),
            references: reference_tree(pools, &signals)?,
        })
    }

    fn wrap(snapshot: SignalTypeSnapshot) -> EntitySnapshot {
        EntitySnapshot::SignalType(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalUnitSnapshot {
    pub base: BaseEntity,
    pub kind: SignalUnitKind,
    pub symbol: String,
    pub reference_count: usize,
    pub references: Vec<Reference>,
}

impl SessionEntity for SignalUnit {
    type Snapshot = SignalUnitSnapshot;

    fn pool(pools: &Pools) -> &Pool<Self> {
        &pools.signal_units
    }

    fn pool_mut(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.signal_units
    }

    fn convert(pools: &Pools, unit: &Self) -> EditResult<SignalUnitSnapshot> {
        let signals = pools.references_to(unit.id());
        Ok(SignalUnitSnapshot {
            base: base_of(unit),
            kind: unit.kind,
            symbol: unit.symbol.clone(),
            reference_count: signals.len(),
            references: reference_tree(pools, &signals)?,
        })
    }

    fn wrap(snapshot: SignalUnitSnapshot) -> EntitySnapshot {
        EntitySnapshot::SignalUnit(snapshot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValueSnapshot {
    pub id: EntityId,
    pub name: String,
    pub index: u32,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnumSnapshot {
    pub base: BaseEntity,
    /// Effektive Breite in Bit
    pub size: u16,
    pub min_size: u16,
    pub values: Vec<EnumValueSnapshot>,
    pub reference_count: usize,
    pub references: Vec<Reference>,
}

impl SessionEntity for SignalEnum {
    type Snapshot = SignalEnumSnapshot;

    fn pool(pools: &Pools) -> &Pool<Self> {
        &pools.signal_enums
    }

    fn pool_mut(pools: &mut Pools) -> &mut Pool<Self> {
        &mut pools.signal_enums
    }

    fn convert(pools: &Pools, signal_enum: &Self) -> EditResult<SignalEnumSnapshot> {
        let signals = pools.references_to(signal_enum.id());
        Ok(SignalEnumSnapshot {
            base: base_of(signal_enum),
            size: signal_enum.size(),
            min_size: signal_enum.min_size,
            values: signal_enum
                .values
                .iter()
                .map(|v| EnumValueSnapshot {
                    id: v.id,
                    name: v.name.clone(),
                    index: v.index,
                    desc: v.desc.clone(),
                })
                .collect(),
            reference_count: signals.len(),
            references: reference_tree(pools, &signals)?,
        })
    }

    fn wrap(snapshot: SignalEnumSnapshot) -> EntitySnapshot {
        EntitySnapshot::SignalEnum(snapshot)
    }
}
