//! Worker der Historie: einziger Besitzer des `HistoryStack`.
//!
//! Records treffen in Ankunftsreihenfolge ein; diese Reihenfolge ist die Undo/Redo-Reihenfolge.
//! Undo/Redo nehmen den Pool-Schreib-Lock selbst, da sie außerhalb des ursprünglichen
//! Requests laufen.

use super::command::{Action, Command, EditContext};
use super::error::EditResult;
use super::events::{EventSink, SessionEvent};
use super::history::{HistoryStack, HistoryState};
use super::mailbox::{spawn_worker, Backpressure, Mailbox};
use super::pool::{Pools, SharedPools};
use super::sidebar::SidebarHandle;
use super::snapshot::EntitySnapshot;
use std::io;
use std::ops::ControlFlow;
use std::sync::mpsc::SyncSender;
use std::thread::JoinHandle;

pub enum HistoryMessage {
    Record(Command),
    Undo(SyncSender<EditResult<HistoryState>>),
    Redo(SyncSender<EditResult<HistoryState>>),
    State(SyncSender<HistoryState>),
    MarkSaved(SyncSender<HistoryState>),
    /// Neues Netzwerk geladen; alle bisherigen Commands verfallen.
    Reset { generation: u64 },
    Shutdown,
}

/// Zugang zum History-Worker
#[derive(Clone)]
pub struct HistoryHandle {
    mailbox: Mailbox<HistoryMessage>,
}

/// Konfiguration des Workers
pub struct HistoryWorkerConfig {
    pub capacity: usize,
    pub max_depth: usize,
}

impl HistoryHandle {
    /// Startet den Worker. Records werden bei voller Mailbox abgelehnt (`Backpressure::Reject`),
    /// weil Dispatcher sie unter dem Pool-Lock senden.
    pub fn spawn(
        config: HistoryWorkerConfig,
        pools: SharedPools,
        sidebar: SidebarHandle,
        events: EventSink,
    ) -> io::Result<(Self, JoinHandle<()>)> {
        let mut worker = HistoryWorker {
            stack: HistoryStack::new_with_capacity(config.max_depth),
            generation: 0,
            pools,
            sidebar,
            events,
        };
        let (mailbox, join) = spawn_worker(
            "history",
            config.capacity,
            Backpressure::Reject,
            move |msg| worker.handle(msg),
        )?;
        Ok((Self { mailbox }, join))
    }

    /// Handle ohne Worker; Nachrichten bleiben im Empfänger liegen.
    #[cfg(test)]
    pub(crate) fn detached(capacity: usize) -> (Self, std::sync::mpsc::Receiver<HistoryMessage>) {
        let (mailbox, rx) = Mailbox::bounded("history", capacity, Backpressure::Reject);
        (Self { mailbox }, rx)
    }

    pub fn record(&self, command: Command) -> EditResult<()> {
        self.mailbox.deliver(HistoryMessage::Record(command))
    }

    pub fn undo(&self) -> EditResult<HistoryState> {
        self.mailbox.request(HistoryMessage::Undo)?
    }

    pub fn redo(&self) -> EditResult<HistoryState> {
        self.mailbox.request(HistoryMessage::Redo)?
    }

    pub fn state(&self) -> EditResult<HistoryState> {
        self.mailbox.request(HistoryMessage::State)
    }

    pub fn mark_saved(&self) -> EditResult<HistoryState> {
        self.mailbox.request(HistoryMessage::MarkSaved)
    }

    /// Leert die Historie für die Pool-Generation `generation`.
    ///
    /// Wird wie `record` unter dem Pool-Schreib-Lock zugestellt, damit die Reihenfolge in der
    /// Mailbox der Lock-Reihenfolge entspricht.
    pub fn reset(&self, generation: u64) -> EditResult<()> {
        self.mailbox.deliver(HistoryMessage::Reset { generation })
    }

    pub fn shutdown(&self) {
        if let Err(err) = self.mailbox.send_blocking(HistoryMessage::Shutdown) {
            log::debug!("History-Worker bereits beendet: {err}");
        }
    }
}

struct HistoryWorker {
    stack: HistoryStack<Command>,
    /// Pool-Generation, zu der die Commands im Stack gehören
    generation: u64,
    pools: SharedPools,
    sidebar: SidebarHandle,
    events: EventSink,
}

impl HistoryWorker {
    fn handle(&mut self, message: HistoryMessage) -> ControlFlow<()> {
        match message {
            HistoryMessage::Record(command) => {
                log::debug!("Command aufgezeichnet: {} {}", command.domain, command.target);
                self.stack.record(command);
                self.emit_state();
            }
            HistoryMessage::Undo(reply) => {
                let result = self.step(Direction::Undo);
                let _ = reply.send(result);
            }
            HistoryMessage::Redo(reply) => {
                let result = self.step(Direction::Redo);
                let _ = reply.send(result);
            }
            HistoryMessage::State(reply) => {
                let _ = reply.send(self.stack.state());
            }
            HistoryMessage::MarkSaved(reply) => {
                self.stack.mark_saved();
                self.emit_state();
                let _ = reply.send(self.stack.state());
            }
            HistoryMessage::Reset { generation } => {
                self.stack.clear();
                self.generation = generation;
                log::debug!("Historie geleert (Generation {generation})");
                self.emit_state();
            }
            HistoryMessage::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn step(&mut self, direction: Direction) -> EditResult<HistoryState> {
        let mut guard = self.pools.write();
        if guard.generation() != self.generation {
            // Netzwerk wurde ersetzt, das zugehörige Reset steht noch in der Mailbox
            log::debug!("{}: Historie gehört zu einem ersetzten Netzwerk", direction.label());
            self.stack.clear();
            self.generation = guard.generation();
            drop(guard);
            self.emit_state();
            return Ok(self.stack.state());
        }

        let sidebar = &self.sidebar;
        let outcome = match direction {
            Direction::Undo => self
                .stack
                .undo(|command| execute(&mut guard, sidebar, command, &command.undo)),
            Direction::Redo => self
                .stack
                .redo(|command| execute(&mut guard, sidebar, command, &command.redo)),
        };
        drop(guard);

        match outcome {
            Ok(Some(event)) => {
                log::info!("{} ausgeführt", direction.label());
                self.events.emit(event);
                self.emit_state();
            }
            Ok(None) => log::debug!("{}: nichts zu tun", direction.label()),
            Err(err) => {
                log::warn!("{} fehlgeschlagen: {err}", direction.label());
                return Err(err);
            }
        }
        Ok(self.stack.state())
    }

    fn emit_state(&self) {
        self.events
            .emit(SessionEvent::HistoryChanged(self.stack.state()));
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Undo => "Undo",
            Direction::Redo => "Redo",
        }
    }
}

fn execute(
    pools: &mut Pools,
    sidebar: &SidebarHandle,
    command: &Command,
    action: &Action,
) -> EditResult<SessionEvent> {
    let mut ctx = EditContext {
        pools: &mut *pools,
        sidebar,
    };
    action.apply(&mut ctx)?;
    // Die Aktion ist angewendet; ein fehlender Snapshot ändert daran nichts mehr.
    let snapshot = EntitySnapshot::resolve(pools, command.domain, command.target)
        .unwrap_or_else(|err| {
            log::warn!("Snapshot für {} {} nicht erzeugt: {err}", command.domain, command.target);
            None
        });
    Ok(SessionEvent::EntityModified {
        domain: command.domain,
        entity_id: command.target,
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::handlers::message::{MessageAction, MessageField};
    use crate::core::{demo_graph, Entity, EntityId, EntityKind};

    fn rename(message_id: EntityId, name: &str) -> Command {
        let action = Action::Message(MessageAction::Set {
            message_id,
            field: MessageField::Name(name.to_string()),
        });
        Command {
            domain: EntityKind::Message,
            target: message_id,
            undo: action.clone(),
            redo: action,
        }
    }

    #[test]
    fn test_applied_action_counts_even_without_snapshot() {
        let mut pools =
            Pools::from_graph(demo_graph().expect("Demo-Netz erwartet")).expect("Pools erwartet");
        let message = pools.messages.iter().next().expect("Message erwartet").clone();
        pools.nodes.remove(message.sender.node);
        let (sidebar, _join) =
            SidebarHandle::spawn(8, EventSink::disabled()).expect("Sidebar-Worker erwartet");
        let command = rename(message.id(), "renamed");

        let event = execute(&mut pools, &sidebar, &command, &command.undo).expect("Aktion erwartet");

        assert!(matches!(
            event,
            SessionEvent::EntityModified { snapshot: None, .. }
        ));
        assert_eq!(
            pools.messages.get(message.id()).expect("Message erwartet").name(),
            "renamed"
        );
    }

    #[test]
    fn test_undo_after_replaced_network_drops_stale_commands() {
        let pools = SharedPools::new();
        let generation = pools
            .write()
            .load(demo_graph().expect("Demo-Netz erwartet"))
            .expect("Laden erwartet");
        let (sidebar, _sidebar_join) =
            SidebarHandle::spawn(8, EventSink::disabled()).expect("Sidebar-Worker erwartet");
        let (history, join) = HistoryHandle::spawn(
            HistoryWorkerConfig {
                capacity: 8,
                max_depth: 10,
            },
            pools.clone(),
            sidebar,
            EventSink::disabled(),
        )
        .expect("History-Worker erwartet");
        history.reset(generation).expect("Reset erwartet");

        let message_id = pools.read().messages.ids().next().expect("Message erwartet");
        history.record(rename(message_id, "renamed")).expect("Record erwartet");
        assert_eq!(history.state().expect("Zustand erwartet").operation_count, 1);

        // Neues Netzwerk ohne zugestelltes Reset
        pools
            .write()
            .load(demo_graph().expect("Demo-Netz erwartet"))
            .expect("Laden erwartet");
        let state = history.undo().expect("Undo erwartet");

        assert_eq!((state.operation_count, state.current_index), (0, -1));
        history.shutdown();
        join.join().expect("Worker sollte sauber enden");
    }
}
