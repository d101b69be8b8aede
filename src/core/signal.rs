//! Signal innerhalb einer Message. Position und Breite stehen im Payload der Message.

use super::entity::{impl_entity, Base};
use super::ids::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};

/// Ausprägung eines Signals und seine Katalog-Referenzen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SignalKind {
    Standard {
        signal_type: EntityId,
        signal_unit: Option<EntityId>,
    },
    Enum {
        signal_enum: EntityId,
    },
}

impl SignalKind {
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::Standard { .. } => "standard",
            SignalKind::Enum { .. } => "enum",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub base: Base,
    /// Eltern-Message (schwache Referenz)
    pub message: EntityId,
    pub kind: SignalKind,
}

impl_entity!(Signal, EntityKind::Signal);

impl Signal {
    pub fn standard(name: impl Into<String>, message: EntityId, signal_type: EntityId) -> Self {
        Self {
            base: Base::new(name),
            message,
            kind: SignalKind::Standard {
                signal_type,
                signal_unit: None,
            },
        }
    }

    pub fn enumerated(name: impl Into<String>, message: EntityId, signal_enum: EntityId) -> Self {
        Self {
            base: Base::new(name),
            message,
            kind: SignalKind::Enum { signal_enum },
        }
    }

    /// Prüft, ob das Signal einen der Katalogeinträge referenziert.
    pub fn references(&self, catalog_id: EntityId) -> bool {
        match self.kind {
            SignalKind::Standard {
                signal_type,
                signal_unit,
            } => signal_type == catalog_id || signal_unit == Some(catalog_id),
            SignalKind::Enum { signal_enum } => signal_enum == catalog_id,
        }
    }
}
