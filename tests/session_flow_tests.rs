use canturin_session::app::sidebar::items::{entity_key, NODES_GROUP};
use canturin_session::app::NewSignal;
use canturin_session::core::{Entity, SignalTypeKind, ValidationError};
use canturin_session::{
    demo_graph, EditError, EntityId, EntityKind, GraphBuilder, NetworkGraph, Operation,
    OperationRequest, SessionController, SessionEvent, SessionOptions, SidebarItem, SidebarKind,
};
use std::sync::mpsc::Receiver;

fn start_with(graph: NetworkGraph) -> (SessionController, Receiver<SessionEvent>, EntityId) {
    let (session, events) =
        SessionController::start(&SessionOptions::default()).expect("Session sollte starten");
    let network_id = session.load(graph).expect("Netzwerk sollte laden");
    (session, events, network_id)
}

fn start_demo() -> (SessionController, Receiver<SessionEvent>, EntityId) {
    start_with(demo_graph().expect("Demo-Netz erwartet"))
}

fn id_by_name<E: Entity>(entities: &[E], name: &str) -> EntityId {
    entities
        .iter()
        .find(|e| e.name() == name)
        .map(Entity::id)
        .unwrap_or_else(|| panic!("{name} erwartet"))
}

fn tree(session: &SessionController) -> SidebarItem {
    session
        .sidebar_tree()
        .expect("Sidebar sollte antworten")
        .expect("Sidebar sollte geladen sein")
}

fn child_names(tree: &SidebarItem, key: &str) -> Vec<String> {
    tree.find(key)
        .expect("Gruppe erwartet")
        .children
        .iter()
        .map(|c| c.name.clone())
        .collect()
}

fn assert_tree_matches_pools(session: &SessionController) {
    let graph = session.export().expect("Export erwartet");
    let tree = tree(session);
    let count = |kind| tree.count(SidebarKind::Entity(kind));
    assert_eq!(count(EntityKind::Bus), graph.buses.len());
    assert_eq!(count(EntityKind::Node), graph.nodes.len());
    assert_eq!(count(EntityKind::Message), graph.messages.len());
    assert_eq!(count(EntityKind::SignalType), graph.signal_types.len());
    assert_eq!(count(EntityKind::SignalUnit), graph.signal_units.len());
    assert_eq!(count(EntityKind::SignalEnum), graph.signal_enums.len());
}

/// Netz mit einem Node `N1` und einer Message mit zwei 8-Bit-Signalen S1 und S2
fn two_signal_graph() -> (NetworkGraph, EntityId, EntityId, EntityId, EntityId) {
    let mut builder = GraphBuilder::new("net");
    let bus = builder.bus("bus", 500_000).expect("Bus erwartet");
    let node = builder.node("N1", 1).expect("Node erwartet");
    builder.attach(node, 0, bus).expect("Attach erwartet");
    let uint8 = builder
        .signal_type("uint8", SignalTypeKind::Integer, 8, false)
        .expect("Signaltyp erwartet");
    let message = builder.message(node, 0, "status", 1, 2).expect("Message erwartet");
    let s1 = builder.standard_signal(message, "S1", uint8).expect("S1 erwartet");
    let s2 = builder.standard_signal(message, "S2", uint8).expect("S2 erwartet");
    (builder.build(), node, message, s1, s2)
}

// ── Beispielszenarien ───────────────────────────────────────────────

#[test]
fn test_created_node_appears_once_in_nodes_group() {
    let (session, _events, network_id) = start_with(GraphBuilder::new("net").build());

    let snapshot = session.network().add_node(network_id).expect("Node erwartet");
    assert_eq!(snapshot.nodes.len(), 1);
    let node_id = snapshot.nodes[0].id;
    session.nodes().update_name(node_id, "N1").expect("Umbenennung erwartet");

    assert_eq!(session.export().expect("Export erwartet").nodes.len(), 1);
    assert_eq!(child_names(&tree(&session), NODES_GROUP), vec!["N1".to_string()]);
    session.shutdown();
}

#[test]
fn test_rename_then_undo_restores_name_and_tree() {
    let (graph, node_id, ..) = two_signal_graph();
    let (session, _events, _) = start_with(graph);

    session.nodes().update_name(node_id, "N2").expect("Umbenennung erwartet");
    let state = session.history_state().expect("Zustand erwartet");
    assert_eq!((state.operation_count, state.current_index), (1, 0));
    assert_eq!(child_names(&tree(&session), NODES_GROUP), vec!["N2".to_string()]);

    let state = session.undo().expect("Undo erwartet");
    assert_eq!(state.current_index, -1);
    let node = session.nodes().get(node_id).expect("Node erwartet");
    assert_eq!(node.base.name, "N1");
    assert_eq!(child_names(&tree(&session), NODES_GROUP), vec!["N1".to_string()]);
    session.shutdown();
}

#[test]
fn test_reorder_swaps_signals_and_undo_restores() {
    let (graph, _, message_id, s1, s2) = two_signal_graph();
    let (session, _events, _) = start_with(graph);

    let snapshot = session
        .messages()
        .reorder_signal(message_id, s2, 1, 0)
        .expect("Reorder erwartet");
    let layout: Vec<(EntityId, u16, u16)> = snapshot
        .signals
        .iter()
        .map(|e| (e.signal.id, e.start, e.size))
        .collect();
    assert_eq!(layout, vec![(s2, 0, 8), (s1, 8, 8)]);

    session.undo().expect("Undo erwartet");
    let snapshot = session.messages().get(message_id).expect("Message erwartet");
    let layout: Vec<(EntityId, u16)> = snapshot.signals.iter().map(|e| (e.signal.id, e.start)).collect();
    assert_eq!(layout, vec![(s1, 0), (s2, 8)]);
    session.shutdown();
}

#[test]
fn test_delete_attached_node_and_undo_reattaches() {
    let (session, _events, network_id) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let engine = id_by_name(&graph.nodes, "engine_ecu");
    let powertrain = id_by_name(&graph.buses, "powertrain");
    let engine_status = id_by_name(&graph.messages, "engine_status");
    let signals_before = graph.signals.len();

    session
        .network()
        .delete_nodes(network_id, &[engine])
        .expect("Löschen erwartet");

    let bus = session.buses().get(powertrain).expect("Bus erwartet");
    assert!(bus.interfaces.iter().all(|i| i.node.id != engine));
    assert!(tree(&session).find(&entity_key(engine)).is_none());
    let after = session.export().expect("Export erwartet");
    assert_eq!(after.nodes.len(), 2);
    assert_eq!(after.signals.len(), signals_before - 3);
    assert_tree_matches_pools(&session);

    session.undo().expect("Undo erwartet");

    let bus = session.buses().get(powertrain).expect("Bus erwartet");
    assert_eq!(bus.interfaces[0].node.id, engine);
    assert_eq!(bus.interfaces[0].number, 0);
    assert!(tree(&session).find(&entity_key(engine)).is_some());
    let message = session.messages().get(engine_status).expect("Message erwartet");
    assert_eq!(message.signals.len(), 3);
    assert_eq!(session.export().expect("Export erwartet"), graph);
    assert_tree_matches_pools(&session);
    session.shutdown();
}

#[test]
fn test_rename_to_current_name_records_nothing() {
    let (graph, node_id, ..) = two_signal_graph();
    let (session, _events, _) = start_with(graph);

    let response = session.handle_request(OperationRequest {
        kind: EntityKind::Node,
        entity_id: node_id,
        operation: Operation::UpdateName("N1".into()),
    });

    assert!(response.is_ok());
    assert!(response.snapshot.is_some());
    let state = session.history_state().expect("Zustand erwartet");
    assert_eq!((state.operation_count, state.current_index), (0, -1));
    session.shutdown();
}

// ── Historie ────────────────────────────────────────────────────────

#[test]
fn test_undo_all_then_redo_all_reproduces_snapshots() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let bus_id = id_by_name(&graph.buses, "body");
    let buses = session.buses();

    let mut snapshots = vec![buses.get(bus_id).expect("Bus erwartet")];
    snapshots.push(buses.update_name(bus_id, "comfort").expect("Name erwartet"));
    snapshots.push(buses.update_baudrate(bus_id, 125_000).expect("Baudrate erwartet"));
    snapshots.push(buses.update_desc(bus_id, "Komfort-CAN").expect("Beschreibung erwartet"));

    for expected in snapshots.iter().rev().skip(1) {
        session.undo().expect("Undo erwartet");
        assert_eq!(&buses.get(bus_id).expect("Bus erwartet"), expected);
    }
    for expected in snapshots.iter().skip(1) {
        session.redo().expect("Redo erwartet");
        assert_eq!(&buses.get(bus_id).expect("Bus erwartet"), expected);
    }
    session.shutdown();
}

#[test]
fn test_new_command_discards_redo_branch() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let bus_id = id_by_name(&graph.buses, "body");

    for name in ["a", "b", "c"] {
        session.buses().update_name(bus_id, name).expect("Name erwartet");
    }
    session.undo().expect("Undo erwartet");
    session.undo().expect("Undo erwartet");
    session.buses().update_name(bus_id, "d").expect("Name erwartet");

    let state = session.history_state().expect("Zustand erwartet");
    assert_eq!((state.operation_count, state.current_index), (2, 1));

    let after_redo = session.redo().expect("Redo erwartet");
    assert_eq!(after_redo, state);
    assert_eq!(session.buses().get(bus_id).expect("Bus erwartet").base.name, "d");
    session.shutdown();
}

#[test]
fn test_undo_on_empty_history_is_noop() {
    let (session, _events, _) = start_demo();

    let state = session.undo().expect("Undo erwartet");
    assert_eq!((state.operation_count, state.current_index), (0, -1));
    assert!(state.saved);
    session.shutdown();
}

#[test]
fn test_mark_saved_tracks_changes() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let bus_id = id_by_name(&graph.buses, "body");

    session.buses().update_desc(bus_id, "x").expect("Beschreibung erwartet");
    assert!(!session.history_state().expect("Zustand erwartet").saved);
    assert!(session.mark_saved().expect("Zustand erwartet").saved);
    session.buses().update_desc(bus_id, "y").expect("Beschreibung erwartet");
    assert!(!session.history_state().expect("Zustand erwartet").saved);
    session.shutdown();
}

#[test]
fn test_history_events_are_emitted() {
    let (session, events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let bus_id = id_by_name(&graph.buses, "body");

    session.buses().update_name(bus_id, "comfort").expect("Name erwartet");
    session.undo().expect("Undo erwartet");
    session.shutdown();

    let events: Vec<SessionEvent> = events.try_iter().collect();
    assert!(events.iter().any(|e| matches!(e, SessionEvent::SidebarLoaded(_))));
    let modified = events.iter().find_map(|e| match e {
        SessionEvent::EntityModified {
            domain,
            entity_id,
            snapshot,
        } => Some((*domain, *entity_id, snapshot.clone())),
        _ => None,
    });
    match modified {
        Some((EntityKind::Bus, id, Some(snapshot))) => {
            assert_eq!(id, bus_id);
            assert_eq!(snapshot.base().name, "body");
        }
        other => panic!("Unerwartetes Event: {other:?}"),
    }
}

// ── Sidebar ─────────────────────────────────────────────────────────

#[test]
fn test_sidebar_counts_follow_pools() {
    let (session, _events, network_id) = start_demo();
    let network = session.network();

    network.add_bus(network_id).expect("Bus erwartet");
    let snapshot = network.add_node(network_id).expect("Node erwartet");
    assert_tree_matches_pools(&session);

    let new_node = id_by_name(
        &session.export().expect("Export erwartet").nodes,
        "new_node_0",
    );
    assert!(snapshot.nodes.iter().any(|n| n.id == new_node));
    network.delete_nodes(network_id, &[new_node]).expect("Löschen erwartet");
    let enums = network.add_signal_enum(network_id).expect("Enum erwartet");
    assert_eq!(enums.signal_enums.len(), 2);
    assert_tree_matches_pools(&session);

    session.undo().expect("Undo erwartet");
    session.undo().expect("Undo erwartet");
    assert_tree_matches_pools(&session);
    session.redo().expect("Redo erwartet");
    assert_tree_matches_pools(&session);
    session.shutdown();
}

#[test]
fn test_bus_children_are_sorted_by_name() {
    let (session, _events, network_id) = start_with(GraphBuilder::new("net").build());
    let network = session.network();

    for _ in 0..3 {
        network.add_node(network_id).expect("Node erwartet");
    }
    let nodes = session.export().expect("Export erwartet").nodes;
    session
        .nodes()
        .update_name(id_by_name(&nodes, "new_node_0"), "zeta")
        .expect("Umbenennung erwartet");

    assert_eq!(
        child_names(&tree(&session), NODES_GROUP),
        vec!["new_node_1", "new_node_2", "zeta"]
    );
    session.shutdown();
}

// ── Zusammengesetzte Operationen ───────────────────────────────────

#[test]
fn test_attach_moves_interface_and_undo_moves_back() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let engine = id_by_name(&graph.nodes, "engine_ecu");
    let powertrain = id_by_name(&graph.buses, "powertrain");
    let body = id_by_name(&graph.buses, "body");

    let snapshot = session
        .nodes()
        .attach_interface(engine, 0, body)
        .expect("Umhängen erwartet");
    assert_eq!(snapshot.interfaces[0].bus.as_ref().map(|b| b.id), Some(body));
    let powertrain_nodes: Vec<EntityId> = session
        .buses()
        .get(powertrain)
        .expect("Bus erwartet")
        .interfaces
        .iter()
        .map(|i| i.node.id)
        .collect();
    assert!(!powertrain_nodes.contains(&engine));
    assert_tree_matches_pools(&session);

    session.undo().expect("Undo erwartet");
    assert_eq!(session.export().expect("Export erwartet"), graph);
    assert_tree_matches_pools(&session);
    session.shutdown();
}

#[test]
fn test_rejected_attach_leaves_everything_unchanged() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let engine = id_by_name(&graph.nodes, "engine_ecu");
    let body_ecu = id_by_name(&graph.nodes, "body_ecu");
    let body = id_by_name(&graph.buses, "body");

    // door_status bekommt dieselbe CAN-ID wie engine_status (0x11)
    session.nodes().update_node_id(body_ecu, 17).expect("Node-ID erwartet");
    let before = session.export().expect("Export erwartet");

    let result = session.nodes().attach_interface(engine, 0, body);

    assert_eq!(result, Err(EditError::Rejected(ValidationError::DuplicateCanId(0x11))));
    assert_eq!(session.export().expect("Export erwartet"), before);
    assert_eq!(session.history_state().expect("Zustand erwartet").operation_count, 1);
    session.shutdown();
}

#[test]
fn test_detach_requires_interface_without_messages() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let engine = id_by_name(&graph.nodes, "engine_ecu");
    let gateway = id_by_name(&graph.nodes, "gateway");

    assert_eq!(
        session.nodes().detach_interface(engine, 0),
        Err(EditError::Rejected(ValidationError::InterfaceHasMessages(0)))
    );

    let snapshot = session.nodes().detach_interface(gateway, 0).expect("Trennen erwartet");
    assert!(snapshot.interfaces[0].bus.is_none());
    assert_eq!(
        session.nodes().detach_interface(gateway, 0),
        Err(EditError::Rejected(ValidationError::InterfaceNotAttached(0)))
    );
    assert_tree_matches_pools(&session);
    session.shutdown();
}

#[test]
fn test_enum_growth_that_does_not_fit_is_rolled_back() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let gear = id_by_name(&graph.signal_enums, "gear_state");
    let gear_signal = id_by_name(&graph.signals, "gear");

    // gear_relay ist nur ein Byte breit
    let result = session.signal_enums().update_min_size(gear, 16);

    assert!(matches!(
        result,
        Err(EditError::Rejected(ValidationError::SignalOutOfBounds { .. }))
    ));
    assert_eq!(session.export().expect("Export erwartet"), graph);
    assert_eq!(session.signals().get(gear_signal).expect("Signal erwartet").size, 2);
    session.shutdown();
}

#[test]
fn test_enum_growth_resizes_every_enum_signal() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let gear = id_by_name(&graph.signal_enums, "gear_state");
    let gear_signal = id_by_name(&graph.signals, "gear");
    let relayed = id_by_name(&graph.signals, "relayed_gear");

    let snapshot = session.signal_enums().update_min_size(gear, 4).expect("Breite erwartet");
    assert_eq!(snapshot.size, 4);
    assert_eq!(session.signals().get(gear_signal).expect("Signal erwartet").size, 4);
    assert_eq!(session.signals().get(relayed).expect("Signal erwartet").size, 4);

    session.undo().expect("Undo erwartet");
    assert_eq!(session.export().expect("Export erwartet"), graph);
    session.shutdown();
}

#[test]
fn test_referenced_catalog_entry_cannot_be_deleted() {
    let (session, _events, network_id) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let uint8 = id_by_name(&graph.signal_types, "uint8");

    let result = session.network().delete_signal_types(network_id, &[uint8]);

    assert_eq!(
        result,
        Err(EditError::Rejected(ValidationError::StillReferenced {
            kind: "signal-type",
            name: "uint8".into(),
            count: 1,
        }))
    );
    let snapshot = session.signal_types().get(uint8).expect("Signaltyp erwartet");
    assert_eq!(snapshot.reference_count, 1);
    session.shutdown();
}

#[test]
fn test_bus_with_interfaces_cannot_be_deleted() {
    let (session, _events, network_id) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let body = id_by_name(&graph.buses, "body");

    assert_eq!(
        session.network().delete_buses(network_id, &[body]),
        Err(EditError::Rejected(ValidationError::BusHasInterfaces(2)))
    );

    let snapshot = session.network().add_bus(network_id).expect("Bus erwartet");
    let new_bus = snapshot.buses.last().expect("Neuer Bus erwartet").id;
    session
        .network()
        .delete_buses(network_id, &[new_bus])
        .expect("Leerer Bus sollte löschbar sein");
    assert_tree_matches_pools(&session);
    session.shutdown();
}

#[test]
fn test_add_signal_then_undo_removes_it() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let engine_status = id_by_name(&graph.messages, "engine_status");

    let snapshot = session
        .messages()
        .add_signal(engine_status, NewSignal::Standard { signal_type: None })
        .expect("Signal erwartet");
    assert_eq!(snapshot.signals.len(), 4);
    assert!(snapshot.signals.windows(2).all(|w| w[0].start + w[0].size <= w[1].start));

    session.undo().expect("Undo erwartet");
    assert_eq!(session.export().expect("Export erwartet"), graph);
    session.redo().expect("Redo erwartet");
    assert_eq!(session.messages().get(engine_status).expect("Message erwartet"), snapshot);
    session.shutdown();
}

// ── Anfragen ────────────────────────────────────────────────────────

#[test]
fn test_operation_for_wrong_kind_is_contract_violation() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let bus_id = id_by_name(&graph.buses, "body");

    let request = OperationRequest {
        kind: EntityKind::Bus,
        entity_id: bus_id,
        operation: Operation::AddValue,
    };
    assert_eq!(
        session.dispatch(request.clone()),
        Err(EditError::ContractViolation {
            operation: "add_value",
            kind: EntityKind::Bus,
        })
    );

    let response = session.handle_request(request);
    assert!(!response.is_ok());
    assert!(response.snapshot.is_none());
    assert_eq!(session.history_state().expect("Zustand erwartet").operation_count, 0);
    session.shutdown();
}

#[test]
fn test_request_from_json_is_routed() {
    let (session, _events, network_id) = start_demo();
    let json = format!(
        r#"{{"kind":"network","entity_id":{network_id},"operation":"update_name","payload":"vehicle"}}"#
    );
    let request: OperationRequest = serde_json::from_str(&json).expect("Anfrage erwartet");

    let response = session.handle_request(request);

    assert!(response.is_ok());
    assert_eq!(
        response.snapshot.map(|s| s.base().name.clone()),
        Some("vehicle".to_string())
    );
    session.shutdown();
}

#[test]
fn test_entity_path_lists_bus_node_message_signal() {
    let (session, _events, _) = start_demo();
    let graph = session.export().expect("Export erwartet");
    let relayed = id_by_name(&graph.signals, "relayed_gear");

    let names: Vec<String> = session
        .entity_path(relayed)
        .expect("Pfad erwartet")
        .into_iter()
        .map(|s| s.name)
        .collect();

    assert_eq!(names, vec!["body", "gateway", "gear_relay", "relayed_gear"]);
    session.shutdown();
}

#[test]
fn test_queries_list_taken_ids_and_free_space() {
    let (graph, node_id, status_id, ..) = two_signal_graph();
    let (session, _events, _) = start_with(graph);

    let snapshot = session.nodes().add_message(node_id, 0).expect("Message erwartet");
    let added = snapshot.interfaces[0]
        .messages
        .iter()
        .find(|m| m.name == "new_message_0")
        .map(|m| m.id)
        .expect("new_message_0 erwartet");

    let messages = session.messages();
    assert_eq!(messages.list_invalid_ids(added).expect("IDs erwartet"), vec![1]);
    assert_eq!(messages.list_invalid_can_ids(added).expect("CAN-IDs erwartet"), vec![0x11]);
    assert_eq!(messages.space_left(status_id).expect("Platz erwartet"), 0);
    assert_eq!(messages.space_left(added).expect("Platz erwartet"), 64);
    assert!(session.nodes().list_invalid_ids(node_id).expect("IDs erwartet").is_empty());
    session.shutdown();
}

#[test]
fn test_invalid_names_follow_sibling_scope() {
    let (graph, _node_id, message_id, s1, _s2) = two_signal_graph();
    let (session, _events, network_id) = start_with(graph);
    session.network().add_bus(network_id).expect("Bus erwartet");
    let bus_id = id_by_name(&session.export().expect("Export erwartet").buses, "bus");

    assert_eq!(
        session.buses().list_invalid_names(bus_id).expect("Namen erwartet"),
        vec!["new_bus_0".to_string()]
    );
    assert_eq!(
        session.signals().list_invalid_names(s1).expect("Namen erwartet"),
        vec!["S2".to_string()]
    );
    assert!(session
        .messages()
        .list_invalid_names(message_id)
        .expect("Namen erwartet")
        .is_empty());
    session.shutdown();
}

// ── Laden ───────────────────────────────────────────────────────────

#[test]
fn test_rejected_load_keeps_previous_session() {
    let (session, _events, network_id) = start_demo();
    session.network().add_bus(network_id).expect("Bus erwartet");
    let before = session.export().expect("Export erwartet");

    let mut broken = demo_graph().expect("Demo-Netz erwartet");
    let alias = broken.nodes[0].id();
    broken.buses[0].base.id = alias;
    assert_eq!(
        session.load(broken),
        Err(EditError::Rejected(ValidationError::DuplicateId(alias)))
    );

    assert_eq!(session.export().expect("Export erwartet"), before);
    assert_eq!(session.network_id().expect("Netzwerk erwartet"), network_id);
    assert_eq!(session.history_state().expect("Zustand erwartet").operation_count, 1);
    assert_tree_matches_pools(&session);

    session.undo().expect("Undo erwartet");
    assert_eq!(session.export().expect("Export erwartet").buses.len(), 2);
    assert_tree_matches_pools(&session);
    session.shutdown();
}

#[test]
fn test_load_clears_history_of_previous_network() {
    let (session, _events, network_id) = start_demo();
    session.network().add_bus(network_id).expect("Bus erwartet");

    session
        .load(demo_graph().expect("Demo-Netz erwartet"))
        .expect("Laden erwartet");

    let state = session.history_state().expect("Zustand erwartet");
    assert_eq!((state.operation_count, state.current_index), (0, -1));
    assert!(state.saved);
    assert_eq!(session.undo().expect("Undo erwartet").operation_count, 0);
    assert_tree_matches_pools(&session);
    session.shutdown();
}

// ── Mehrere Aufrufer ────────────────────────────────────────────────

#[test]
fn test_concurrent_edits_keep_tree_and_pools_in_step() {
    let (session, _events, network_id) = start_with(GraphBuilder::new("net").build());

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..10 {
                    session.network().add_bus(network_id).expect("Bus erwartet");
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..10 {
                session.network().add_node(network_id).expect("Node erwartet");
            }
        });
    });

    let graph = session.export().expect("Export erwartet");
    assert_eq!(graph.buses.len(), 40);
    assert_eq!(graph.nodes.len(), 10);
    assert_tree_matches_pools(&session);
    assert_eq!(session.history_state().expect("Zustand erwartet").operation_count, 50);
    session.shutdown();
}

#[test]
fn test_load_racing_edits_keeps_tree_and_pools_in_step() {
    let (session, _events, network_id) = start_demo();

    for _ in 0..20 {
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..10 {
                    session.network().add_bus(network_id).expect("Bus erwartet");
                }
            });
            let graph = session.export().expect("Export erwartet");
            session.load(graph).expect("Laden erwartet");
        });
        assert_tree_matches_pools(&session);
    }

    let state = session.history_state().expect("Zustand erwartet");
    let graph = session.export().expect("Export erwartet");
    assert!(state.operation_count <= graph.buses.len());
    for _ in 0..state.operation_count {
        session.undo().expect("Undo erwartet");
    }
    assert_tree_matches_pools(&session);
    session.shutdown();
}
