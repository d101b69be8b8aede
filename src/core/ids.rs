//! Stabile Entity-IDs und der geschlossene Satz an Entity-Arten.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Global eindeutige, stabile ID einer Entity.
///
/// IDs werden aus einem prozessweiten Zähler vergeben und innerhalb einer Session
/// nie wiederverwendet, auch nicht nach dem Löschen der Entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Vergibt eine neue, noch nie benutzte ID.
    pub fn generate() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Markiert eine von außen geladene ID als belegt, damit `generate` sie nie erneut ausgibt.
    pub fn reserve(self) {
        NEXT_ENTITY_ID.fetch_max(self.successor(), Ordering::Relaxed);
    }

    /// Kleinste ID, die `generate` danach noch ausgeben darf (am Zahlenende geklemmt)
    fn successor(self) -> u64 {
        self.0.saturating_add(1)
    }

    /// Roher Zahlenwert (für Schlüssel und Anzeige)
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Art einer Entity. Jede Art hat genau einen Pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Network,
    Bus,
    Node,
    Message,
    Signal,
    SignalType,
    SignalUnit,
    SignalEnum,
}

impl EntityKind {
    /// Alle Arten in fester Reihenfolge
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Network,
        EntityKind::Bus,
        EntityKind::Node,
        EntityKind::Message,
        EntityKind::Signal,
        EntityKind::SignalType,
        EntityKind::SignalUnit,
        EntityKind::SignalEnum,
    ];

    /// Stabiler Bezeichner, z.B. für Events und Logs.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Network => "network",
            EntityKind::Bus => "bus",
            EntityKind::Node => "node",
            EntityKind::Message => "message",
            EntityKind::Signal => "signal",
            EntityKind::SignalType => "signal-type",
            EntityKind::SignalUnit => "signal-unit",
            EntityKind::SignalEnum => "signal-enum",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_increasing() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert!(b > a);
    }

    #[test]
    fn test_reserve_skips_loaded_ids() {
        let loaded = EntityId(EntityId::generate().raw() + 1000);
        loaded.reserve();
        assert!(EntityId::generate() > loaded);
    }

    #[test]
    fn test_successor_saturates_at_max() {
        assert_eq!(EntityId(u64::MAX).successor(), u64::MAX);
        assert_eq!(EntityId(41).successor(), 42);
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&EntityKind::SignalType).expect("Serialisierung erwartet");
        assert_eq!(json, "\"signal-type\"");
        assert_eq!(EntityKind::SignalEnum.to_string(), "signal-enum");
    }
}
