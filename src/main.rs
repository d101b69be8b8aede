//! CAN-Netzwerk-Editor: Session-Engine als Kommandozeilenwerkzeug.
//!
//! Lädt ein Netzwerk (JSON-Datei oder eingebautes Demo-Netz), führt einige
//! Operationen samt Undo/Redo aus und gibt Sidebar-Baum und Historie als JSON aus.

use anyhow::Context;
use canturin_session::{
    demo_graph, EntityKind, NetworkGraph, Operation, OperationRequest, SessionController,
    SessionOptions,
};

fn main() -> anyhow::Result<()> {
    // Logger initialisieren
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!(
        "CAN-Session-Engine v{} startet...",
        env!("CARGO_PKG_VERSION")
    );

    // Optionen aus TOML laden (oder Standardwerte)
    let options = SessionOptions::load_from_file(&SessionOptions::config_path());
    let graph = load_graph(std::env::args().nth(1))?;

    let (session, events) = SessionController::start(&options)?;
    let network_id = session.load(graph)?;

    let script = [
        OperationRequest {
            kind: EntityKind::Network,
            entity_id: network_id,
            operation: Operation::AddBus,
        },
        OperationRequest {
            kind: EntityKind::Network,
            entity_id: network_id,
            operation: Operation::AddNode,
        },
        OperationRequest {
            kind: EntityKind::Network,
            entity_id: network_id,
            operation: Operation::UpdateDesc("per Kommandozeile bearbeitet".into()),
        },
    ];
    for request in script {
        let response = session.handle_request(request);
        if let Some(error) = response.error {
            log::warn!("Operation abgelehnt: {error}");
        }
    }
    session.undo()?;
    session.redo()?;

    let tree = session.sidebar_tree()?;
    println!("{}", serde_json::to_string_pretty(&tree)?);
    println!("{}", serde_json::to_string_pretty(&session.history_state()?)?);

    session.shutdown();
    log::info!("{} Events empfangen", events.try_iter().count());
    Ok(())
}

fn load_graph(path: Option<String>) -> anyhow::Result<NetworkGraph> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Netzwerk-Datei nicht lesbar: {path}"))?;
            let graph = NetworkGraph::from_json(&json)
                .with_context(|| format!("Netzwerk-Datei fehlerhaft: {path}"))?;
            log::info!("Netzwerk geladen aus: {path}");
            Ok(graph)
        }
        None => {
            log::info!("Keine Netzwerk-Datei angegeben, verwende Demo-Netz");
            Ok(demo_graph()?)
        }
    }
}
