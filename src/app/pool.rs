//! Entity-Pools: pro Art eine Registry lebender Entities, gemeinsam hinter einem Lock.

use super::error::{EditError, EditResult};
use crate::core::{
    Bus, Entity, EntityId, EntityKind, Message, Network, NetworkGraph, Node, Signal, SignalEnum,
    SignalKind, SignalType, SignalUnit,
};
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry einer Entity-Art, geordnet nach Einfügereihenfolge.
///
/// Prüft keine Domänenregeln.
#[derive(Debug, Clone)]
pub struct Pool<E> {
    entities: IndexMap<EntityId, E>,
}

impl<E> Default for Pool<E> {
    fn default() -> Self {
        Self {
            entities: IndexMap::new(),
        }
    }
}

impl<E: Entity> Pool<E> {
    pub fn get(&self, id: EntityId) -> EditResult<&E> {
        self.entities
            .get(&id)
            .ok_or(EditError::not_found(E::KIND, id))
    }

    pub fn get_mut(&mut self, id: EntityId) -> EditResult<&mut E> {
        self.entities
            .get_mut(&id)
            .ok_or(EditError::not_found(E::KIND, id))
    }

    /// Registriert eine Entity unter ihrer eigenen ID.
    pub fn put(&mut self, entity: E) {
        self.entities.insert(entity.id(), entity);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<E> {
        self.entities.shift_remove(&id)
    }

    /// Entnimmt eine Entity samt ihrer Position in der Registry.
    pub fn take(&mut self, id: EntityId) -> EditResult<(usize, E)> {
        self.entities
            .shift_remove_full(&id)
            .map(|(index, _, entity)| (index, entity))
            .ok_or(EditError::not_found(E::KIND, id))
    }

    /// Setzt eine entnommene Entity an ihre alte Position zurück.
    pub fn restore(&mut self, index: usize, entity: E) {
        let index = index.min(self.entities.len());
        self.entities.shift_insert(index, entity.id(), entity);
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }
}

/// Alle Pools einer Session. Art-übergreifende Operationen (z.B. Interface an Bus hängen)
/// brauchen mehrere Pools gleichzeitig, deshalb teilen sie sich einen Lock.
#[derive(Debug, Default)]
pub struct Pools {
    pub network: Pool<Network>,
    pub buses: Pool<Bus>,
    pub nodes: Pool<Node>,
    pub messages: Pool<Message>,
    pub signals: Pool<Signal>,
    pub signal_types: Pool<SignalType>,
    pub signal_units: Pool<SignalUnit>,
    pub signal_enums: Pool<SignalEnum>,
    /// Zählt geladene Netzwerke; Commands gelten nur innerhalb einer Generation.
    generation: u64,
}

impl Pools {
    /// Baut Pools aus einem geprüften Graphen. Bei einem Fehler bleibt nichts zurück.
    pub fn from_graph(graph: NetworkGraph) -> EditResult<Self> {
        graph.validate()?;
        graph.reserve_ids();
        let mut pools = Self::default();
        pools.network.put(graph.network);
        graph.buses.into_iter().for_each(|e| pools.buses.put(e));
        graph.nodes.into_iter().for_each(|e| pools.nodes.put(e));
        graph.messages.into_iter().for_each(|e| pools.messages.put(e));
        graph.signals.into_iter().for_each(|e| pools.signals.put(e));
        graph.signal_types.into_iter().for_each(|e| pools.signal_types.put(e));
        graph.signal_units.into_iter().for_each(|e| pools.signal_units.put(e));
        graph.signal_enums.into_iter().for_each(|e| pools.signal_enums.put(e));
        Ok(pools)
    }

    /// Übernimmt `next` als neuen Inhalt und startet eine neue Generation.
    pub fn replace(&mut self, next: Pools) -> u64 {
        let generation = self.generation + 1;
        *self = next;
        self.generation = generation;
        generation
    }

    /// Ersetzt den gesamten Inhalt durch ein geladenes Netzwerk.
    pub fn load(&mut self, graph: NetworkGraph) -> EditResult<u64> {
        let next = Self::from_graph(graph)?;
        Ok(self.replace(next))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Aktueller Stand als Übergabeformat für die Persistenz.
    pub fn export(&self) -> EditResult<NetworkGraph> {
        let mut graph = NetworkGraph::new(self.network()?.clone());
        graph.buses = self.buses.iter().cloned().collect();
        graph.nodes = self.nodes.iter().cloned().collect();
        graph.messages = self.messages.iter().cloned().collect();
        graph.signals = self.signals.iter().cloned().collect();
        graph.signal_types = self.signal_types.iter().cloned().collect();
        graph.signal_units = self.signal_units.iter().cloned().collect();
        graph.signal_enums = self.signal_enums.iter().cloned().collect();
        Ok(graph)
    }

    /// Das geladene Netzwerk
    pub fn network(&self) -> EditResult<&Network> {
        self.network.iter().next().ok_or(EditError::NoNetwork)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Network => self.network.len(),
            EntityKind::Bus => self.buses.len(),
            EntityKind::Node => self.nodes.len(),
            EntityKind::Message => self.messages.len(),
            EntityKind::Signal => self.signals.len(),
            EntityKind::SignalType => self.signal_types.len(),
            EntityKind::SignalUnit => self.signal_units.len(),
            EntityKind::SignalEnum => self.signal_enums.len(),
        }
    }

    /// Ob der Pool der Art `kind` die Entity `id` enthält
    pub fn contains(&self, kind: EntityKind, id: EntityId) -> bool {
        match kind {
            EntityKind::Network => self.network.contains(id),
            EntityKind::Bus => self.buses.contains(id),
            EntityKind::Node => self.nodes.contains(id),
            EntityKind::Message => self.messages.contains(id),
            EntityKind::Signal => self.signals.contains(id),
            EntityKind::SignalType => self.signal_types.contains(id),
            EntityKind::SignalUnit => self.signal_units.contains(id),
            EntityKind::SignalEnum => self.signal_enums.contains(id),
        }
    }

    /// CAN-IDs aller Messages auf einem Bus, optional ohne die Messages in `exclude`.
    pub fn bus_can_ids(&self, bus_id: EntityId, exclude: &[EntityId]) -> EditResult<Vec<u32>> {
        let bus = self.buses.get(bus_id)?;
        let mut can_ids = Vec::new();
        for interface_ref in &bus.interfaces {
            let node = self.nodes.get(interface_ref.node)?;
            let interface = node.interface(interface_ref.number)?;
            for message_id in interface.messages.iter().filter(|id| !exclude.contains(id)) {
                can_ids.push(self.messages.get(*message_id)?.can_id(node.node_id));
            }
        }
        Ok(can_ids)
    }

    /// Numerische Node-ID des Senders einer Message
    pub fn sender_node_id(&self, message: &Message) -> EditResult<u32> {
        Ok(self.nodes.get(message.sender.node)?.node_id)
    }

    /// Bus, auf dem eine Message gesendet wird
    pub fn message_bus(&self, message: &Message) -> EditResult<Option<EntityId>> {
        let node = self.nodes.get(message.sender.node)?;
        Ok(node.interface(message.sender.number)?.bus)
    }

    /// Bitbreite, die ein Signal dieser Ausprägung belegt
    pub fn signal_size(&self, kind: &SignalKind) -> EditResult<u16> {
        match kind {
            SignalKind::Standard { signal_type, .. } => {
                Ok(self.signal_types.get(*signal_type)?.size)
            }
            SignalKind::Enum { signal_enum } => Ok(self.signal_enums.get(*signal_enum)?.size()),
        }
    }

    /// Signale, die einen Katalogeintrag referenzieren, nach Name sortiert
    pub fn references_to(&self, catalog_id: EntityId) -> Vec<EntityId> {
        let mut signals: Vec<&Signal> = self
            .signals
            .iter()
            .filter(|s| s.references(catalog_id))
            .collect();
        signals.sort_by(|a, b| a.name().cmp(b.name()));
        signals.into_iter().map(Entity::id).collect()
    }
}

/// Geteilter Zugriff auf die Pools. Ein vergifteter Lock wird übernommen statt zu paniken.
#[derive(Debug, Clone, Default)]
pub struct SharedPools(Arc<RwLock<Pools>>);

impl SharedPools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Pools> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Pools> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}
