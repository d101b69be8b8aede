//! Generischer Dispatcher: Lock nehmen, Entity auflösen, Handler ausführen, Command melden.

use super::command::{Change, Command, EditContext};
use super::error::EditResult;
use super::history_worker::HistoryHandle;
use super::pool::{Pools, SharedPools};
use super::sidebar::SidebarHandle;
use super::snapshot::{BaseEntity, SessionEntity};
use crate::core::EntityId;
use std::marker::PhantomData;

/// Dispatcher für eine Entity-Art. Die kindspezifischen Operationen liegen in `handlers`.
pub struct Service<E> {
    pools: SharedPools,
    history: HistoryHandle,
    sidebar: SidebarHandle,
    trim_names: bool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: SessionEntity> Service<E> {
    pub(crate) fn new(
        pools: SharedPools,
        history: HistoryHandle,
        sidebar: SidebarHandle,
        trim_names: bool,
    ) -> Self {
        Self {
            pools,
            history,
            sidebar,
            trim_names,
            _entity: PhantomData,
        }
    }

    /// Führt `handler` unter dem Schreib-Lock gegen die Entity `id` aus.
    ///
    /// Meldet der Handler eine Änderung, geht ein Command an die Historie. Ist deren
    /// Mailbox voll, wird die Änderung sofort zurückgenommen und `Busy` geliefert.
    pub(crate) fn handle<R>(
        &self,
        id: EntityId,
        request: R,
        handler: impl FnOnce(&mut EditContext<'_>, EntityId, R) -> EditResult<Change>,
    ) -> EditResult<E::Snapshot> {
        let mut guard = self.pools.write();
        let pools = &mut *guard;
        E::pool(pools).get(id)?;

        let mut ctx = EditContext {
            pools,
            sidebar: &self.sidebar,
        };
        match handler(&mut ctx, id, request) {
            Ok(Change::Unchanged) => {
                log::debug!("{} {id}: keine Änderung", E::KIND);
            }
            Ok(Change::Changed { undo, redo }) => {
                let compensation = undo.clone();
                let command = Command {
                    domain: E::KIND,
                    target: id,
                    undo,
                    redo,
                };
                if let Err(err) = self.history.record(command) {
                    if let Err(undo_err) = compensation.apply(&mut ctx) {
                        log::error!("Rücknahme nach abgelehntem Command fehlgeschlagen: {undo_err}");
                    }
                    return Err(err);
                }
            }
            Err(err) => {
                log::debug!("{} {id}: abgelehnt: {err}", E::KIND);
                return Err(err);
            }
        }

        let pools = &*guard;
        E::convert(pools, E::pool(pools).get(id)?)
    }

    pub fn get(&self, id: EntityId) -> EditResult<E::Snapshot> {
        let pools = self.pools.read();
        E::convert(&pools, E::pool(&pools).get(id)?)
    }

    /// Basisattribute aller Entities der Art, nach Name sortiert
    pub fn list_base(&self) -> Vec<BaseEntity> {
        let pools = self.pools.read();
        let mut bases: Vec<BaseEntity> = E::pool(&pools)
            .iter()
            .map(|e| BaseEntity::from(e.base()))
            .collect();
        bases.sort_by(|a, b| a.name.cmp(&b.name));
        bases
    }

    /// Namen, die beim Umbenennen von `id` bereits vergeben sind
    pub fn list_invalid_names(&self, id: EntityId) -> EditResult<Vec<String>> {
        let pools = self.pools.read();
        let entity = E::pool(&pools).get(id)?;
        Ok(E::taken_names(&pools, entity)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// Lesender Zugriff für art-spezifische Abfragen
    pub(crate) fn read<T>(&self, query: impl FnOnce(&Pools) -> EditResult<T>) -> EditResult<T> {
        let pools = self.pools.read();
        query(&pools)
    }

    /// Name für Umbenennungen, je nach Einstellung getrimmt
    pub(crate) fn normalize_name(&self, name: &str) -> String {
        if self.trim_names {
            name.trim().to_string()
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error::EditError;
    use crate::app::events::EventSink;
    use crate::app::history_worker::HistoryMessage;
    use crate::core::{demo_graph, Bus, Entity};

    fn bus_service(capacity: usize) -> (Service<Bus>, SharedPools, std::sync::mpsc::Receiver<HistoryMessage>) {
        let pools = SharedPools::new();
        pools
            .write()
            .load(demo_graph().expect("Demo-Netz erwartet"))
            .expect("Laden erwartet");
        let (history, rx) = HistoryHandle::detached(capacity);
        let (sidebar, _join) =
            SidebarHandle::spawn(8, EventSink::disabled()).expect("Sidebar-Worker erwartet");
        (Service::new(pools.clone(), history, sidebar, true), pools, rx)
    }

    fn first_bus(pools: &SharedPools) -> EntityId {
        pools.read().buses.ids().next().expect("Bus erwartet")
    }

    #[test]
    fn test_full_history_mailbox_reverts_change() {
        let (service, pools, rx) = bus_service(1);
        let bus_id = first_bus(&pools);

        service
            .update_name(bus_id, "chassis")
            .expect("Erste Umbenennung erwartet");
        let result = service.update_name(bus_id, "cabin");

        assert_eq!(result, Err(EditError::Busy { mailbox: "history" }));
        assert_eq!(pools.read().buses.get(bus_id).map(|b| b.name().to_string()), Ok("chassis".to_string()));
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_unchanged_value_records_nothing() {
        let (service, pools, rx) = bus_service(4);
        let bus_id = first_bus(&pools);
        let name = pools.read().buses.get(bus_id).map(|b| b.name().to_string()).expect("Bus erwartet");

        let snapshot = service.update_name(bus_id, &format!("  {name} ")).expect("Snapshot erwartet");

        assert_eq!(snapshot.base.name, name);
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_unknown_entity_is_not_found() {
        let (service, _pools, _rx) = bus_service(4);
        let missing = EntityId::generate();

        match service.update_desc(missing, "x") {
            Err(EditError::NotFound { id, .. }) => assert_eq!(id, missing),
            other => panic!("Unerwartetes Ergebnis: {other:?}"),
        }
    }
}
