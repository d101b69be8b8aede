//! Session-Engine: Pools, Dispatcher, Historie, Sidebar-Spiegel und Controller.

pub mod command;
pub mod controller;
pub mod error;
pub mod events;
pub mod handlers;
pub mod history;
pub mod history_worker;
pub mod mailbox;
pub mod pool;
pub mod reference;
pub mod service;
pub mod sidebar;
pub mod snapshot;
pub mod use_cases;

pub use controller::SessionController;
pub use error::{EditError, EditResult};
pub use events::{
    NewSignal, NewSignalType, Operation, OperationRequest, OperationResponse, SessionEvent,
};
pub use history::{HistoryStack, HistoryState};
pub use pool::{Pool, Pools, SharedPools};
pub use reference::{PathSegment, Reference};
pub use service::Service;
pub use sidebar::{SidebarItem, SidebarKind};
pub use snapshot::{BaseEntity, EntitySnapshot, SessionEntity};
