use crate::app::history::HistoryState;
use crate::app::sidebar::SidebarItem;
use crate::app::snapshot::EntitySnapshot;
use crate::core::{EntityId, EntityKind};
use serde::Serialize;
use std::sync::mpsc::Sender;

/// Benachrichtigungen der Worker an die GUI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// Historie hat sich geändert (Record, Undo, Redo, Reset)
    HistoryChanged(HistoryState),
    /// Entity nach Undo/Redo, geroutet über den Domain-Tag des Commands
    EntityModified {
        domain: EntityKind,
        entity_id: EntityId,
        /// `None`, wenn die Entity danach nicht mehr existiert
        snapshot: Option<EntitySnapshot>,
    },
    SidebarLoaded(SidebarItem),
    /// Konvertierter Elternknoten nach dem Anhängen
    SidebarAdded(SidebarItem),
    /// Umbenannter Knoten
    SidebarUpdated(SidebarItem),
    /// Konvertierter Elternknoten nach dem Entfernen
    SidebarRemoved(SidebarItem),
}

/// Sendeseite für Events. Ein fehlender Empfänger wird toleriert.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<Sender<SessionEvent>>,
}

impl EventSink {
    pub fn new(tx: Sender<SessionEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink ohne Empfänger
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                log::debug!("Event verworfen: kein Empfänger mehr");
            }
        }
    }
}
