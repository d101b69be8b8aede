//! Sidebar-Spiegel: abgeleiteter Baum, gepflegt von einem eigenen Worker.
//!
//! Dispatcher melden Änderungen per Nachricht. Der Worker besitzt den Baum exklusiv
//! und greift nie auf die Pools zu, deshalb dürfen Sender blockieren.

pub mod items;
mod tree;

pub use tree::{SidebarItem, SidebarKind, SidebarTree};

use super::error::EditResult;
use super::events::{EventSink, SessionEvent};
use super::mailbox::{spawn_worker, Backpressure, Mailbox};
use std::io;
use std::ops::ControlFlow;
use std::sync::mpsc::SyncSender;
use std::thread::JoinHandle;

pub enum SidebarMessage {
    Load(SidebarItem),
    Clear,
    Add { item: SidebarItem, parent: String },
    UpdateName { key: String, name: String },
    Remove { key: String },
    Tree(SyncSender<Option<SidebarItem>>),
    Shutdown,
}

/// Zugang zum Sidebar-Worker
#[derive(Clone)]
pub struct SidebarHandle {
    mailbox: Mailbox<SidebarMessage>,
}

impl SidebarHandle {
    /// Startet den Worker mit begrenzter, blockierender Mailbox.
    pub fn spawn(capacity: usize, events: EventSink) -> io::Result<(Self, JoinHandle<()>)> {
        let mut tree = SidebarTree::default();
        let (mailbox, join) = spawn_worker("sidebar", capacity, Backpressure::Block, move |msg| {
            apply(&mut tree, &events, msg)
        })?;
        Ok((Self { mailbox }, join))
    }

    pub fn load(&self, root: SidebarItem) {
        self.send(SidebarMessage::Load(root));
    }

    pub fn clear(&self) {
        self.send(SidebarMessage::Clear);
    }

    pub fn add(&self, item: SidebarItem, parent: impl Into<String>) {
        self.send(SidebarMessage::Add {
            item,
            parent: parent.into(),
        });
    }

    pub fn update_name(&self, key: impl Into<String>, name: impl Into<String>) {
        self.send(SidebarMessage::UpdateName {
            key: key.into(),
            name: name.into(),
        });
    }

    pub fn remove(&self, key: impl Into<String>) {
        self.send(SidebarMessage::Remove { key: key.into() });
    }

    /// Aktueller Baum, nachdem alle vorher gesendeten Meldungen verarbeitet sind.
    pub fn tree(&self) -> EditResult<Option<SidebarItem>> {
        self.mailbox.request(SidebarMessage::Tree)
    }

    pub fn shutdown(&self) {
        self.send(SidebarMessage::Shutdown);
    }

    fn send(&self, message: SidebarMessage) {
        if let Err(err) = self.mailbox.deliver(message) {
            log::warn!("Sidebar-Meldung verloren: {err}");
        }
    }
}

fn apply(tree: &mut SidebarTree, events: &EventSink, message: SidebarMessage) -> ControlFlow<()> {
    match message {
        SidebarMessage::Load(root) => {
            tree.load(root);
            if let Some(converted) = tree.to_tree() {
                log::debug!("Sidebar geladen ({} Knoten)", tree.len());
                events.emit(SessionEvent::SidebarLoaded(converted));
            }
        }
        SidebarMessage::Clear => tree.clear(),
        SidebarMessage::Add { item, parent } => {
            if let Some(parent) = tree.add_child(item, &parent) {
                events.emit(SessionEvent::SidebarAdded(parent));
            }
        }
        SidebarMessage::UpdateName { key, name } => {
            if let Some(item) = tree.update_name(&key, name) {
                events.emit(SessionEvent::SidebarUpdated(item));
            }
        }
        SidebarMessage::Remove { key } => {
            if let Some(parent) = tree.remove(&key) {
                events.emit(SessionEvent::SidebarRemoved(parent));
            }
        }
        SidebarMessage::Tree(reply) => {
            let _ = reply.send(tree.to_tree());
        }
        SidebarMessage::Shutdown => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityKind;
    use std::sync::mpsc;

    #[test]
    fn worker_emits_parent_subtree_on_add_and_remove() {
        let (tx, rx) = mpsc::channel();
        let (sidebar, join) = SidebarHandle::spawn(4, EventSink::new(tx)).expect("Worker erwartet");

        sidebar.load(SidebarItem {
            kind: SidebarKind::Group,
            key: "root".to_string(),
            name: "root".to_string(),
            children: vec![SidebarItem::leaf(SidebarKind::Group, "nodes", "Nodes")],
        });
        sidebar.add(
            SidebarItem::leaf(SidebarKind::Entity(EntityKind::Node), "7", "ecu"),
            "nodes",
        );
        sidebar.remove("7");
        let tree = sidebar.tree().expect("Baum erwartet").expect("Wurzel erwartet");
        assert_eq!(tree.count(SidebarKind::Entity(EntityKind::Node)), 0);

        sidebar.shutdown();
        join.join().expect("Worker sollte sauber enden");

        let events: Vec<SessionEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], SessionEvent::SidebarLoaded(_)));
        match &events[1] {
            SessionEvent::SidebarAdded(parent) => {
                assert_eq!(parent.key, "nodes");
                assert_eq!(parent.children.len(), 1);
            }
            other => panic!("Unerwartetes Event: {other:?}"),
        }
        match &events[2] {
            SessionEvent::SidebarRemoved(parent) => assert!(parent.children.is_empty()),
            other => panic!("Unerwartetes Event: {other:?}"),
        }
    }
}
