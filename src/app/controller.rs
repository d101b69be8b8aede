//! Session-Controller: Kompositionswurzel und zentrale Verteilung der Operationen.

use super::error::{EditError, EditResult};
use super::events::{EventSink, Operation, OperationRequest, OperationResponse, SessionEvent};
use super::history::HistoryState;
use super::history_worker::{HistoryHandle, HistoryWorkerConfig};
use super::pool::{Pools, SharedPools};
use super::reference::{entity_path, PathSegment};
use super::service::Service;
use super::sidebar::{items, SidebarHandle, SidebarItem};
use super::snapshot::{
    BusSnapshot, EntitySnapshot, MessageSnapshot, NetworkSnapshot, NodeSnapshot,
    SignalEnumSnapshot, SignalSnapshot, SignalTypeSnapshot, SignalUnitSnapshot,
};
use crate::core::{
    Bus, Entity, EntityId, EntityKind, Message, Network, NetworkGraph, Node, Signal, SignalEnum,
    SignalType, SignalUnit,
};
use crate::shared::SessionOptions;
use anyhow::Context;
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;

/// Besitzt den geteilten Pool-Speicher, beide Worker und je einen Dispatcher pro Entity-Art.
pub struct SessionController {
    pools: SharedPools,
    history: HistoryHandle,
    sidebar: SidebarHandle,
    network: Service<Network>,
    buses: Service<Bus>,
    nodes: Service<Node>,
    messages: Service<Message>,
    signals: Service<Signal>,
    signal_types: Service<SignalType>,
    signal_units: Service<SignalUnit>,
    signal_enums: Service<SignalEnum>,
    workers: Vec<JoinHandle<()>>,
}

impl SessionController {
    /// Baut eine leere Session auf und startet History- und Sidebar-Worker.
    ///
    /// Der zurückgegebene Empfänger liefert alle Events der Worker.
    pub fn start(options: &SessionOptions) -> anyhow::Result<(Self, Receiver<SessionEvent>)> {
        let (tx, rx) = mpsc::channel();
        let events = EventSink::new(tx);
        let pools = SharedPools::new();

        let (sidebar, sidebar_join) =
            SidebarHandle::spawn(options.sidebar_mailbox_capacity, events.clone())
                .context("Sidebar-Worker konnte nicht gestartet werden")?;
        let (history, history_join) = HistoryHandle::spawn(
            HistoryWorkerConfig {
                capacity: options.history_mailbox_capacity,
                max_depth: options.history_max_depth,
            },
            pools.clone(),
            sidebar.clone(),
            events,
        )
        .context("History-Worker konnte nicht gestartet werden")?;

        let trim = options.trim_names;
        let controller = Self {
            network: Service::new(pools.clone(), history.clone(), sidebar.clone(), trim),
            buses: Service::new(pools.clone(), history.clone(), sidebar.clone(), trim),
            nodes: Service::new(pools.clone(), history.clone(), sidebar.clone(), trim),
            messages: Service::new(pools.clone(), history.clone(), sidebar.clone(), trim),
            signals: Service::new(pools.clone(), history.clone(), sidebar.clone(), trim),
            signal_types: Service::new(pools.clone(), history.clone(), sidebar.clone(), trim),
            signal_units: Service::new(pools.clone(), history.clone(), sidebar.clone(), trim),
            signal_enums: Service::new(pools.clone(), history.clone(), sidebar.clone(), trim),
            pools,
            history,
            sidebar,
            workers: vec![history_join, sidebar_join],
        };
        log::info!(
            "Session gestartet (History {} / Sidebar {})",
            options.history_mailbox_capacity,
            options.sidebar_mailbox_capacity
        );
        Ok((controller, rx))
    }

    // === Laden & Export ===

    /// Ersetzt den Inhalt der Session, leert die Historie und lädt die Sidebar neu.
    ///
    /// Graph und Sidebar-Baum werden vor dem Austausch geprüft und gebaut; ein abgelehnter
    /// Graph lässt die Session unverändert.
    pub fn load(&self, graph: NetworkGraph) -> EditResult<EntityId> {
        let next = Pools::from_graph(graph)?;
        let network_id = next.network()?.id();
        let tree = items::network_tree(&next)?;

        // Reset, Austausch und Sidebar-Load unter einem Lock, in derselben Reihenfolge
        // wie die Meldungen der Dispatcher.
        let mut pools = self.pools.write();
        self.history.reset(pools.generation() + 1)?;
        let generation = pools.replace(next);
        self.sidebar.load(tree);
        drop(pools);

        log::info!("Netzwerk {network_id} geladen (Generation {generation})");
        Ok(network_id)
    }

    /// Aktueller Stand für die Persistenz
    pub fn export(&self) -> EditResult<NetworkGraph> {
        self.pools.read().export()
    }

    /// ID des geladenen Netzwerks
    pub fn network_id(&self) -> EditResult<EntityId> {
        Ok(self.pools.read().network()?.id())
    }

    // === Dispatcher ===

    pub fn network(&self) -> &Service<Network> {
        &self.network
    }

    pub fn buses(&self) -> &Service<Bus> {
        &self.buses
    }

    pub fn nodes(&self) -> &Service<Node> {
        &self.nodes
    }

    pub fn messages(&self) -> &Service<Message> {
        &self.messages
    }

    pub fn signals(&self) -> &Service<Signal> {
        &self.signals
    }

    pub fn signal_types(&self) -> &Service<SignalType> {
        &self.signal_types
    }

    pub fn signal_units(&self) -> &Service<SignalUnit> {
        &self.signal_units
    }

    pub fn signal_enums(&self) -> &Service<SignalEnum> {
        &self.signal_enums
    }

    /// Führt eine Anfrage der GUI aus; Fehler landen als Text in der Antwort.
    pub fn handle_request(&self, request: OperationRequest) -> OperationResponse {
        let operation = request.operation.name();
        let result = self.dispatch(request);
        if let Err(err) = &result {
            log::warn!("Operation {operation} fehlgeschlagen: {err}");
        }
        OperationResponse::from_result(result)
    }

    /// Leitet eine Anfrage an den Dispatcher ihrer Entity-Art weiter.
    pub fn dispatch(&self, request: OperationRequest) -> EditResult<EntitySnapshot> {
        let OperationRequest {
            kind,
            entity_id: id,
            operation,
        } = request;
        match kind {
            EntityKind::Network => self.dispatch_network(id, operation).map(EntitySnapshot::Network),
            EntityKind::Bus => self.dispatch_bus(id, operation).map(EntitySnapshot::Bus),
            EntityKind::Node => self.dispatch_node(id, operation).map(EntitySnapshot::Node),
            EntityKind::Message => self.dispatch_message(id, operation).map(EntitySnapshot::Message),
            EntityKind::Signal => self.dispatch_signal(id, operation).map(EntitySnapshot::Signal),
            EntityKind::SignalType => self
                .dispatch_signal_type(id, operation)
                .map(EntitySnapshot::SignalType),
            EntityKind::SignalUnit => self
                .dispatch_signal_unit(id, operation)
                .map(EntitySnapshot::SignalUnit),
            EntityKind::SignalEnum => self
                .dispatch_signal_enum(id, operation)
                .map(EntitySnapshot::SignalEnum),
        }
    }

    fn dispatch_network(&self, id: EntityId, operation: Operation) -> EditResult<NetworkSnapshot> {
        let service = &self.network;
        match operation {
            Operation::UpdateName(name) => service.update_name(id, &name),
            Operation::UpdateDesc(desc) => service.update_desc(id, &desc),
            Operation::AddBus => service.add_bus(id),
            Operation::DeleteBuses(ids) => service.delete_buses(id, &ids),
            Operation::AddNode => service.add_node(id),
            Operation::DeleteNodes(ids) => service.delete_nodes(id, &ids),
            Operation::AddSignalType(new) => service.add_signal_type(id, new),
            Operation::AddSignalUnit(kind) => service.add_signal_unit(id, kind),
            Operation::AddSignalEnum => service.add_signal_enum(id),
            Operation::DeleteSignalTypes(ids) => service.delete_signal_types(id, &ids),
            Operation::DeleteSignalUnits(ids) => service.delete_signal_units(id, &ids),
            Operation::DeleteSignalEnums(ids) => service.delete_signal_enums(id, &ids),
            other => Err(other.unsupported(EntityKind::Network)),
        }
    }

    fn dispatch_bus(&self, id: EntityId, operation: Operation) -> EditResult<BusSnapshot> {
        let service = &self.buses;
        match operation {
            Operation::UpdateName(name) => service.update_name(id, &name),
            Operation::UpdateDesc(desc) => service.update_desc(id, &desc),
            Operation::UpdateBusType(bus_type) => service.update_bus_type(id, bus_type),
            Operation::UpdateBaudrate(baudrate) => service.update_baudrate(id, baudrate),
            other => Err(other.unsupported(EntityKind::Bus)),
        }
    }

    fn dispatch_node(&self, id: EntityId, operation: Operation) -> EditResult<NodeSnapshot> {
        let service = &self.nodes;
        match operation {
            Operation::UpdateName(name) => service.update_name(id, &name),
            Operation::UpdateDesc(desc) => service.update_desc(id, &desc),
            Operation::UpdateNodeId(value) => service.update_node_id(id, value),
            Operation::AddInterface => service.add_interface(id),
            Operation::RemoveInterface(number) => service.remove_interface(id, number),
            Operation::AttachInterface { number, bus_id } => {
                service.attach_interface(id, number, bus_id)
            }
            Operation::DetachInterface(number) => service.detach_interface(id, number),
            Operation::AddMessage(number) => service.add_message(id, number),
            Operation::DeleteMessages(ids) => service.delete_messages(id, &ids),
            other => Err(other.unsupported(EntityKind::Node)),
        }
    }

    fn dispatch_message(&self, id: EntityId, operation: Operation) -> EditResult<MessageSnapshot> {
        let service = &self.messages;
        match operation {
            Operation::UpdateName(name) => service.update_name(id, &name),
            Operation::UpdateDesc(desc) => service.update_desc(id, &desc),
            Operation::UpdateMessageId(value) => service.update_message_id(id, value),
            Operation::UpdateStaticCanId(value) => service.update_static_can_id(id, value),
            Operation::UpdateSizeByte(value) => service.update_size_byte(id, value),
            Operation::UpdateByteOrder(value) => service.update_byte_order(id, value),
            Operation::UpdateCycleTime(value) => service.update_cycle_time(id, value),
            Operation::UpdateSendType(value) => service.update_send_type(id, value),
            Operation::UpdateDelayTime(value) => service.update_delay_time(id, value),
            Operation::UpdateStartDelayTime(value) => service.update_start_delay_time(id, value),
            Operation::AddSignal(new) => service.add_signal(id, new),
            Operation::DeleteSignals(ids) => service.delete_signals(id, &ids),
            Operation::CompactSignals => service.compact_signals(id),
            Operation::ReorderSignal {
                signal_id,
                from,
                to,
            } => service.reorder_signal(id, signal_id, from, to),
            other => Err(other.unsupported(EntityKind::Message)),
        }
    }

    fn dispatch_signal(&self, id: EntityId, operation: Operation) -> EditResult<SignalSnapshot> {
        let service = &self.signals;
        match operation {
            Operation::UpdateName(name) => service.update_name(id, &name),
            Operation::UpdateDesc(desc) => service.update_desc(id, &desc),
            Operation::UpdateSignalType(type_id) => service.update_signal_type(id, type_id),
            Operation::UpdateSignalUnit(unit_id) => service.update_signal_unit(id, unit_id),
            Operation::UpdateSignalEnum(enum_id) => service.update_signal_enum(id, enum_id),
            other => Err(other.unsupported(EntityKind::Signal)),
        }
    }

    fn dispatch_signal_type(&self, id: EntityId, operation: Operation) -> EditResult<SignalTypeSnapshot> {
        let service = &self.signal_types;
        match operation {
            Operation::UpdateName(name) => service.update_name(id, &name),
            Operation::UpdateDesc(desc) => service.update_desc(id, &desc),
            Operation::UpdateMin(value) => service.update_min(id, value),
            Operation::UpdateMax(value) => service.update_max(id, value),
            Operation::UpdateScale(value) => service.update_scale(id, value),
            Operation::UpdateOffset(value) => service.update_offset(id, value),
            other => Err(other.unsupported(EntityKind::SignalType)),
        }
    }

    fn dispatch_signal_unit(&self, id: EntityId, operation: Operation) -> EditResult<SignalUnitSnapshot> {
        let service = &self.signal_units;
        match operation {
            Operation::UpdateName(name) => service.update_name(id, &name),
            Operation::UpdateDesc(desc) => service.update_desc(id, &desc),
            Operation::UpdateUnitKind(kind) => service.update_kind(id, kind),
            Operation::UpdateSymbol(symbol) => service.update_symbol(id, &symbol),
            other => Err(other.unsupported(EntityKind::SignalUnit)),
        }
    }

    fn dispatch_signal_enum(&self, id: EntityId, operation: Operation) -> EditResult<SignalEnumSnapshot> {
        let service = &self.signal_enums;
        match operation {
            Operation::UpdateName(name) => service.update_name(id, &name),
            Operation::UpdateDesc(desc) => service.update_desc(id, &desc),
            Operation::UpdateMinSize(min_size) => service.update_min_size(id, min_size),
            Operation::AddValue => service.add_value(id),
            Operation::RemoveValues(ids) => service.remove_values(id, &ids),
            Operation::UpdateValueName { value_id, name } => {
                service.update_value_name(id, value_id, &name)
            }
            Operation::UpdateValueIndex { value_id, index } => {
                service.update_value_index(id, value_id, index)
            }
            Operation::UpdateValueDesc { value_id, desc } => {
                service.update_value_desc(id, value_id, &desc)
            }
            Operation::ReorderValue {
                value_id,
                from,
                to,
            } => service.reorder_value(id, value_id, from, to),
            other => Err(other.unsupported(EntityKind::SignalEnum)),
        }
    }

    // === Historie ===

    /// Nimmt das Command unter dem Cursor zurück. Ohne Undo-Schritt bleibt alles unverändert.
    pub fn undo(&self) -> EditResult<HistoryState> {
        self.history.undo()
    }

    pub fn redo(&self) -> EditResult<HistoryState> {
        self.history.redo()
    }

    pub fn history_state(&self) -> EditResult<HistoryState> {
        self.history.state()
    }

    /// Merkt den aktuellen Stand als gespeichert
    pub fn mark_saved(&self) -> EditResult<HistoryState> {
        self.history.mark_saved()
    }

    // === Sidebar & Pfade ===

    /// Sidebar-Baum, nachdem alle vorher gemeldeten Änderungen eingearbeitet sind
    pub fn sidebar_tree(&self) -> EditResult<Option<SidebarItem>> {
        self.sidebar.tree()
    }

    /// Breadcrumb einer Entity beliebiger Art
    pub fn entity_path(&self, id: EntityId) -> EditResult<Vec<PathSegment>> {
        let pools = self.pools.read();
        let kind = EntityKind::ALL
            .into_iter()
            .find(|kind| pools.contains(*kind, id))
            .ok_or_else(|| EditError::invalid(format!("unknown entity {id}")))?;
        entity_path(&pools, kind, id)
    }

    /// Stoppt beide Worker und wartet auf ihr Ende.
    pub fn shutdown(self) {
        self.history.shutdown();
        self.sidebar.shutdown();
        for worker in self.workers {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                log::error!("Worker {name} ist abgestürzt");
            }
        }
        log::info!("Session beendet");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::demo_graph;

    #[test]
    fn test_failed_undo_keeps_cursor_and_reports_not_found() {
        let (session, _events) =
            SessionController::start(&SessionOptions::default()).expect("Session erwartet");
        session
            .load(demo_graph().expect("Demo-Netz erwartet"))
            .expect("Laden erwartet");
        let bus_id = session.pools.read().buses.ids().next().expect("Bus erwartet");
        session.buses().update_name(bus_id, "chassis").expect("Umbenennung erwartet");
        let before = session.history_state().expect("Zustand erwartet");

        session.pools.write().buses.remove(bus_id);

        assert_eq!(
            session.undo(),
            Err(EditError::NotFound {
                kind: EntityKind::Bus,
                id: bus_id
            })
        );
        assert_eq!(session.history_state().expect("Zustand erwartet"), before);
        assert_eq!((before.operation_count, before.current_index), (1, 0));
        session.shutdown();
    }
}
