//! Basisattribute und die gemeinsame Fähigkeit aller Entities.

use super::error::ValidationError;
use super::ids::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Attribute, die jede Entity trägt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Base {
    /// Stabile ID
    pub id: EntityId,
    /// Anzeigename (Eindeutigkeit ist nur ein Hinweis für die UI)
    pub name: String,
    /// Freitext-Beschreibung
    pub desc: String,
    /// Erstellungszeitpunkt, unveränderlich
    pub create_time: SystemTime,
}

impl Base {
    /// Erstellt Basisattribute mit frischer ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(),
            name: name.into(),
            desc: String::new(),
            create_time: SystemTime::now(),
        }
    }

    /// Setzt den Namen. Leere Namen werden abgelehnt.
    pub fn rename(&mut self, name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        self.name = name.to_string();
        Ok(())
    }
}

/// Minimale Fähigkeit, die jede Entity erfüllt (ID, Name, Beschreibung, Art).
pub trait Entity {
    /// Art der Entity und damit ihr Pool
    const KIND: EntityKind;

    fn base(&self) -> &Base;
    fn base_mut(&mut self) -> &mut Base;

    fn id(&self) -> EntityId {
        self.base().id
    }

    fn name(&self) -> &str {
        &self.base().name
    }

    fn desc(&self) -> &str {
        &self.base().desc
    }

    fn create_time(&self) -> SystemTime {
        self.base().create_time
    }
}

/// Implementiert `Entity` für Structs mit einem Feld `base: Base`.
macro_rules! impl_entity {
    ($ty:ty, $kind:expr) => {
        impl $crate::core::entity::Entity for $ty {
            const KIND: $crate::core::ids::EntityKind = $kind;

            fn base(&self) -> &$crate::core::entity::Base {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::core::entity::Base {
                &mut self.base
            }
        }
    };
}

pub(crate) use impl_entity;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_rejects_blank_names() {
        let mut base = Base::new("bus_0");
        assert_eq!(base.rename("   "), Err(ValidationError::EmptyName));
        assert_eq!(base.name, "bus_0");

        base.rename("powertrain").expect("Umbenennung erwartet");
        assert_eq!(base.name, "powertrain");
    }
}
