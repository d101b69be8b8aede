//! Validierungsfehler des Domänenmodells.

use super::ids::EntityId;
use thiserror::Error;

/// Ablehnung einer Mutation durch eine Domänenregel.
///
/// Jede Primitive des Modells ist atomar: liefert sie diesen Fehler, wurde nichts verändert.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    #[error("id {0} is used by more than one entity")]
    DuplicateId(EntityId),

    #[error("entity {from} refers to {to}, but {to} does not refer back")]
    BrokenReference { from: EntityId, to: EntityId },

    #[error("node id {0} is already used by another node")]
    DuplicateNodeId(u32),

    #[error("message id {0} is already used on this interface")]
    DuplicateMessageId(u32),

    #[error("CAN id {0:#x} is already used on this bus")]
    DuplicateCanId(u32),

    #[error("CAN id {can_id:#x} exceeds the bus limit {max:#x}")]
    CanIdOutOfRange { can_id: u32, max: u32 },

    #[error("node has no interface {0}")]
    UnknownInterface(u8),

    #[error("interface {0} already exists")]
    DuplicateInterface(u8),

    #[error("interface {0} is attached to a bus")]
    InterfaceAttached(u8),

    #[error("interface {0} is not attached to a bus")]
    InterfaceNotAttached(u8),

    #[error("interface {0} still sends messages")]
    InterfaceHasMessages(u8),

    #[error("interface {number} of node {node} is already attached to this bus")]
    AlreadyAttached { node: EntityId, number: u8 },

    #[error("bus still has {0} attached interfaces")]
    BusHasInterfaces(usize),

    #[error("baudrate {0} is not supported")]
    InvalidBaudrate(u32),

    #[error("size byte {0} is out of range 1..=64")]
    InvalidSizeByte(u16),

    #[error("signal size {0} is out of range 1..=64")]
    InvalidSignalSize(u16),

    #[error("signal [{start}, {end}) exceeds the payload width of {width} bits")]
    SignalOutOfBounds { start: u16, end: u16, width: u16 },

    #[error("signal [{start}, {end}) overlaps another signal")]
    SignalOverlap { start: u16, end: u16 },

    #[error("signal {0} is already placed in this payload")]
    SignalAlreadyPlaced(EntityId),

    #[error("signal {0} is not part of this payload")]
    SignalNotInPayload(EntityId),

    #[error("payload is full")]
    PayloadFull,

    #[error("payload needs at least {0} bits")]
    PayloadTooSmall(u16),

    #[error("position {index} is out of range for {len} entries")]
    InvalidPosition { index: usize, len: usize },

    #[error("min {min} must not be greater than max {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("scale must not be zero")]
    ZeroScale,

    #[error("enum index {0} is already used")]
    DuplicateEnumIndex(u32),

    #[error("enum value {0} does not exist")]
    UnknownEnumValue(EntityId),

    #[error("{kind} {name} is referenced {count} times")]
    StillReferenced {
        kind: &'static str,
        name: String,
        count: usize,
    },

    #[error("signal is not a {0} signal")]
    KindMismatch(&'static str),
}
