//! Commands als Werte: Domain-Tag plus Undo-/Redo-Aktion.
//!
//! Aktionen tragen IDs und alte/neue Werte statt Referenzen auf lebende Objekte.
//! Beim Ausführen wird per ID nachgeschlagen; fehlt eine Entity, scheitert die Aktion mit
//! `NotFound`.

use super::error::EditResult;
use super::handlers::{
    bus::BusAction, message::MessageAction, network::NetworkAction, node::NodeAction,
    signal::SignalAction, signal_enum::SignalEnumAction, signal_type::SignalTypeAction,
    signal_unit::SignalUnitAction,
};
use super::handlers;
use super::pool::Pools;
use super::sidebar::SidebarHandle;
use crate::core::{EntityId, EntityKind};

/// Mutierbarer Zugriff für Handler und Aktionen, nur unter dem Pool-Schreib-Lock.
pub struct EditContext<'a> {
    pub pools: &'a mut Pools,
    pub sidebar: &'a SidebarHandle,
}

/// Umkehrbare Einzelschritte, gruppiert nach der Art, die sie mutieren.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Network(NetworkAction),
    Bus(BusAction),
    Node(NodeAction),
    Message(MessageAction),
    Signal(SignalAction),
    SignalType(SignalTypeAction),
    SignalUnit(SignalUnitAction),
    SignalEnum(SignalEnumAction),
}

impl Action {
    /// Führt die Aktion gegen den aktuellen Pool-Zustand aus.
    pub fn apply(&self, ctx: &mut EditContext<'_>) -> EditResult<()> {
        match self {
            Action::Network(action) => handlers::network::apply(ctx, action),
            Action::Bus(action) => handlers::bus::apply(ctx, action),
            Action::Node(action) => handlers::node::apply(ctx, action),
            Action::Message(action) => handlers::message::apply(ctx, action),
            Action::Signal(action) => handlers::signal::apply(ctx, action),
            Action::SignalType(action) => handlers::signal_type::apply(ctx, action),
            Action::SignalUnit(action) => handlers::signal_unit::apply(ctx, action),
            Action::SignalEnum(action) => handlers::signal_enum::apply(ctx, action),
        }
    }
}

macro_rules! impl_from_action {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for Action {
            fn from(action: $ty) -> Self {
                Action::$variant(action)
            }
        })*
    };
}

impl_from_action!(
    Network(NetworkAction),
    Bus(BusAction),
    Node(NodeAction),
    Message(MessageAction),
    Signal(SignalAction),
    SignalType(SignalTypeAction),
    SignalUnit(SignalUnitAction),
    SignalEnum(SignalEnumAction),
);

/// Eintrag der Historie
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Pool, dessen Dispatcher das Command erzeugt hat
    pub domain: EntityKind,
    /// Ziel-Entity des ursprünglichen Requests
    pub target: EntityId,
    pub undo: Action,
    pub redo: Action,
}

/// Ergebnis eines Handlers
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Neuer Wert gleich altem Wert: Erfolg ohne Historie
    Unchanged,
    Changed { undo: Action, redo: Action },
}

impl Change {
    pub fn changed(undo: impl Into<Action>, redo: impl Into<Action>) -> Self {
        Change::Changed {
            undo: undo.into(),
            redo: redo.into(),
        }
    }
}
