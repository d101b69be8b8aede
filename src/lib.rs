//! CAN-Netzwerk-Editor: Session-Engine.
//! Domänenmodell und Engine als Library exportiert für Tests und Wiederverwendung.

pub mod app;
pub mod core;
pub mod shared;

pub use app::{
    EditError, EditResult, EntitySnapshot, HistoryState, Operation, OperationRequest,
    OperationResponse, SessionController, SessionEvent, SidebarItem, SidebarKind,
};
pub use core::{demo_graph, EntityId, EntityKind, GraphBuilder, NetworkGraph};
pub use shared::SessionOptions;
