//! Domänenmodell des CAN-Netzwerks: Entities, IDs, Bit-Layout und Validierungsregeln.
//!
//! Alle Regeln (eindeutige IDs, Bitbreiten, Überlappungsfreiheit) leben hier.
//! Die Session-Engine ruft die Primitiven auf und prüft selbst nichts davon.

pub mod bus;
pub mod catalog;
pub mod entity;
pub mod error;
pub mod graph;
pub mod ids;
pub mod message;
pub mod naming;
pub mod network;
pub mod node;
pub mod payload;
pub mod rules;
pub mod signal;

pub use bus::{Bus, BusType, SUPPORTED_BAUDRATES};
pub use catalog::{
    SignalEnum, SignalEnumValue, SignalType, SignalTypeKind, SignalUnit, SignalUnitKind,
};
pub use entity::{Base, Entity};
pub use error::ValidationError;
pub use graph::{demo_graph, GraphBuilder, NetworkGraph};
pub use ids::{EntityId, EntityKind};
pub use message::{ByteOrder, Message, SendType};
pub use network::Network;
pub use node::{InterfaceRef, Node, NodeInterface};
pub use payload::{Payload, Slot};
pub use signal::{Signal, SignalKind};
