//! Abstammungsketten (Breadcrumbs) und Referenzbäume. Zustandslos, liest nur Pools.

use super::error::EditResult;
use super::pool::Pools;
use crate::core::{Entity, EntityId, EntityKind};
use serde::Serialize;

/// Ein Glied der Kette Bus → Node → Message → Signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSegment {
    pub kind: EntityKind,
    pub id: EntityId,
    pub name: String,
}

impl PathSegment {
    fn of<E: Entity>(entity: &E) -> Self {
        Self {
            kind: E::KIND,
            id: entity.id(),
            name: entity.name().to_string(),
        }
    }
}

/// Knoten im Referenzbaum eines Katalogeintrags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub kind: EntityKind,
    pub id: EntityId,
    pub name: String,
    pub children: Vec<Reference>,
}

/// Breadcrumb einer Entity. Bus und Node fehlen, wo es keine strukturelle Eltern gibt.
pub fn entity_path(pools: &Pools, kind: EntityKind, id: EntityId) -> EditResult<Vec<PathSegment>> {
    let path = match kind {
        EntityKind::Network => vec![PathSegment::of(pools.network.get(id)?)],
        EntityKind::Bus => vec![PathSegment::of(pools.buses.get(id)?)],
        EntityKind::Node => vec![PathSegment::of(pools.nodes.get(id)?)],
        EntityKind::Message => message_path(pools, id)?,
        EntityKind::Signal => {
            let signal = pools.signals.get(id)?;
            let mut path = message_path(pools, signal.message)?;
            path.push(PathSegment::of(signal));
            path
        }
        EntityKind::SignalType => vec![PathSegment::of(pools.signal_types.get(id)?)],
        EntityKind::SignalUnit => vec![PathSegment::of(pools.signal_units.get(id)?)],
        EntityKind::SignalEnum => vec![PathSegment::of(pools.signal_enums.get(id)?)],
    };
    Ok(path)
}

fn message_path(pools: &Pools, message_id: EntityId) -> EditResult<Vec<PathSegment>> {
    let message = pools.messages.get(message_id)?;
    let node = pools.nodes.get(message.sender.node)?;
    let mut path = Vec::with_capacity(4);
    if let Some(bus_id) = node.interface(message.sender.number)?.bus {
        path.push(PathSegment::of(pools.buses.get(bus_id)?));
    }
    path.push(PathSegment::of(node));
    path.push(PathSegment::of(message));
    Ok(path)
}

/// Baum Bus → Node → Message → Signal über alle übergebenen Signale.
/// Gemeinsame Vorfahren erscheinen einmal, jede Ebene ist nach Name sortiert.
pub fn reference_tree(pools: &Pools, signal_ids: &[EntityId]) -> EditResult<Vec<Reference>> {
    let mut roots = Vec::new();
    for signal_id in signal_ids {
        let path = entity_path(pools, EntityKind::Signal, *signal_id)?;
        insert_path(&mut roots, &path);
    }
    sort_by_name(&mut roots);
    Ok(roots)
}

fn insert_path(level: &mut Vec<Reference>, path: &[PathSegment]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let index = match level.iter().position(|r| r.id == head.id) {
        Some(index) => index,
        None => {
            level.push(Reference {
                kind: head.kind,
                id: head.id,
                name: head.name.clone(),
                children: Vec::new(),
            });
            level.len() - 1
        }
    };
    insert_path(&mut level[index].children, rest);
}

fn sort_by_name(level: &mut [Reference]) {
    level.sort_by(|a, b| a.name.cmp(&b.name));
    for reference in level {
        sort_by_name(&mut reference.children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::demo_graph;

    fn demo_pools() -> Pools {
        let mut pools = Pools::default();
        pools.load(demo_graph().expect("Demo-Netz erwartet")).expect("Laden erwartet");
        pools
    }

    fn id_of(pools: &Pools, name: &str) -> EntityId {
        pools
            .signals
            .iter()
            .find(|s| s.name() == name)
            .map(Entity::id)
            .expect("Signal erwartet")
    }

    #[test]
    fn signal_path_runs_from_bus_to_signal() {
        let pools = demo_pools();
        let path = entity_path(&pools, EntityKind::Signal, id_of(&pools, "coolant_temp"))
            .expect("Pfad erwartet");

        let names: Vec<&str> = path.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["powertrain", "engine_ecu", "engine_status", "coolant_temp"]);
        let kinds: Vec<EntityKind> = path.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntityKind::Bus,
                EntityKind::Node,
                EntityKind::Message,
                EntityKind::Signal
            ]
        );
    }

    #[test]
    fn reference_tree_merges_shared_ancestors() {
        let pools = demo_pools();
        let gear_enum = pools
            .signal_enums
            .iter()
            .next()
            .map(Entity::id)
            .expect("Enum erwartet");

        let signals = pools.references_to(gear_enum);
        assert_eq!(signals.len(), 2);
        let tree = reference_tree(&pools, &signals).expect("Baum erwartet");

        let buses: Vec<&str> = tree.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(buses, vec!["body", "powertrain"]);
        assert_eq!(tree[0].children[0].name, "gateway");
        assert_eq!(tree[0].children[0].children[0].children[0].name, "relayed_gear");
    }

    #[test]
    fn path_of_missing_entity_is_not_found() {
        let pools = demo_pools();
        assert!(entity_path(&pools, EntityKind::Message, EntityId::generate()).is_err());
    }
}
