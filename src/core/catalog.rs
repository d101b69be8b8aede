//! Gemeinsame Kataloge: Signaltypen, Einheiten und Enums.

use super::entity::{impl_entity, Base};
use super::error::ValidationError;
use super::ids::{EntityId, EntityKind};
use super::payload::MAX_SIGNAL_SIZE;
use serde::{Deserialize, Serialize};

// ── Signaltypen ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalTypeKind {
    Flag,
    #[default]
    Integer,
    Decimal,
}

/// Physikalischer Typ eines Standard-Signals (Breite, Wertebereich, Skalierung).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalType {
    pub base: Base,
    pub kind: SignalTypeKind,
    /// Breite in Bit, nach dem Erstellen fest
    pub size: u16,
    pub signed: bool,
    pub min: f64,
    pub max: f64,
    pub scale: f64,
    pub offset: f64,
}

impl_entity!(SignalType, EntityKind::SignalType);

impl SignalType {
    pub fn new(
        name: impl Into<String>,
        kind: SignalTypeKind,
        size: u16,
        signed: bool,
    ) -> Result<Self, ValidationError> {
        if size == 0 || size > MAX_SIGNAL_SIZE || (kind == SignalTypeKind::Flag && size != 1) {
            return Err(ValidationError::InvalidSignalSize(size));
        }
        let (min, max) = raw_range(size, signed);
        Ok(Self {
            base: Base::new(name),
            kind,
            size,
            signed,
            min,
            max,
            scale: 1.0,
            offset: 0.0,
        })
    }

    pub fn set_min(&mut self, min: f64) -> Result<(), ValidationError> {
        if min > self.max {
            return Err(ValidationError::InvalidRange { min, max: self.max });
        }
        self.min = min;
        Ok(())
    }

    pub fn set_max(&mut self, max: f64) -> Result<(), ValidationError> {
        if self.min > max {
            return Err(ValidationError::InvalidRange { min: self.min, max });
        }
        self.max = max;
        Ok(())
    }

    pub fn set_scale(&mut self, scale: f64) -> Result<(), ValidationError> {
        if scale == 0.0 {
            return Err(ValidationError::ZeroScale);
        }
        self.scale = scale;
        Ok(())
    }
}

/// Rohwertebereich eines Integers mit `size` Bit
fn raw_range(size: u16, signed: bool) -> (f64, f64) {
    let bits = i32::from(size);
    if signed {
        (-(2f64.powi(bits - 1)), 2f64.powi(bits - 1) - 1.0)
    } else {
        (0.0, 2f64.powi(bits) - 1.0)
    }
}

// ── Einheiten ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalUnitKind {
    #[default]
    Custom,
    Temperature,
    Electrical,
    Power,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalUnit {
    pub base: Base,
    pub kind: SignalUnitKind,
    pub symbol: String,
}

impl_entity!(SignalUnit, EntityKind::SignalUnit);

impl SignalUnit {
    pub fn new(name: impl Into<String>, kind: SignalUnitKind, symbol: impl Into<String>) -> Self {
        Self {
            base: Base::new(name),
            kind,
            symbol: symbol.into(),
        }
    }
}

// ── Enums ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnumValue {
    pub id: EntityId,
    pub name: String,
    pub index: u32,
    pub desc: String,
}

/// Werteliste eines Enum-Signals. Die Breite ergibt sich aus dem größten Index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnum {
    pub base: Base,
    /// Mindestbreite in Bit
    pub min_size: u16,
    pub values: Vec<SignalEnumValue>,
}

impl_entity!(SignalEnum, EntityKind::SignalEnum);

impl SignalEnum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: Base::new(name),
            min_size: 1,
            values: Vec::new(),
        }
    }

    /// Effektive Breite in Bit
    pub fn size(&self) -> u16 {
        let needed = self
            .values
            .iter()
            .map(|v| bits_for(v.index))
            .max()
            .unwrap_or(1);
        needed.max(self.min_size)
    }

    pub fn set_min_size(&mut self, min_size: u16) -> Result<(), ValidationError> {
        if min_size == 0 || min_size > MAX_SIGNAL_SIZE {
            return Err(ValidationError::InvalidSignalSize(min_size));
        }
        self.min_size = min_size;
        Ok(())
    }

    pub fn value(&self, value_id: EntityId) -> Result<&SignalEnumValue, ValidationError> {
        self.values
            .iter()
            .find(|v| v.id == value_id)
            .ok_or(ValidationError::UnknownEnumValue(value_id))
    }

    pub fn value_position(&self, value_id: EntityId) -> Result<usize, ValidationError> {
        self.values
            .iter()
            .position(|v| v.id == value_id)
            .ok_or(ValidationError::UnknownEnumValue(value_id))
    }

    /// Nächster freier Index (größter + 1)
    pub fn next_index(&self) -> u32 {
        self.values
            .iter()
            .map(|v| v.index.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Fügt einen Wert an `position` ein (geklemmt). Indizes müssen eindeutig bleiben.
    pub fn insert_value(
        &mut self,
        position: usize,
        value: SignalEnumValue,
    ) -> Result<(), ValidationError> {
        if value.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.values.iter().any(|v| v.index == value.index) {
            return Err(ValidationError::DuplicateEnumIndex(value.index));
        }
        let position = position.min(self.values.len());
        self.values.insert(position, value);
        Ok(())
    }

    /// Entfernt einen Wert und liefert ihn samt Position.
    pub fn remove_value(
        &mut self,
        value_id: EntityId,
    ) -> Result<(usize, SignalEnumValue), ValidationError> {
        let position = self.value_position(value_id)?;
        Ok((position, self.values.remove(position)))
    }

    pub fn set_value_name(&mut self, value_id: EntityId, name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let position = self.value_position(value_id)?;
        self.values[position].name = name.to_string();
        Ok(())
    }

    pub fn set_value_index(&mut self, value_id: EntityId, index: u32) -> Result<(), ValidationError> {
        let position = self.value_position(value_id)?;
        if self
            .values
            .iter()
            .any(|v| v.id != value_id && v.index == index)
        {
            return Err(ValidationError::DuplicateEnumIndex(index));
        }
        self.values[position].index = index;
        Ok(())
    }

    pub fn set_value_desc(&mut self, value_id: EntityId, desc: &str) -> Result<(), ValidationError> {
        let position = self.value_position(value_id)?;
        self.values[position].desc = desc.to_string();
        Ok(())
    }

    /// Verschiebt den Wert von `from` nach `to`.
    pub fn move_value(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        let len = self.values.len();
        for index in [from, to] {
            if index >= len {
                return Err(ValidationError::InvalidPosition { index, len });
            }
        }
        let value = self.values.remove(from);
        self.values.insert(to, value);
        Ok(())
    }
}

/// Anzahl Bits, um `index` darzustellen (mindestens 1)
fn bits_for(index: u32) -> u16 {
    (u32::BITS - index.leading_zeros()).max(1) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn value(name: &str, index: u32) -> SignalEnumValue {
        SignalEnumValue {
            id: EntityId::generate(),
            name: name.to_string(),
            index,
            desc: String::new(),
        }
    }

    #[test]
    fn test_signal_type_range_follows_size() {
        let ty = SignalType::new("int8", SignalTypeKind::Integer, 8, true).expect("Typ erwartet");
        assert_relative_eq!(ty.min, -128.0);
        assert_relative_eq!(ty.max, 127.0);

        assert!(SignalType::new("flag", SignalTypeKind::Flag, 2, false).is_err());
    }

    #[test]
    fn test_signal_type_rejects_inverted_range() {
        let mut ty =
            SignalType::new("uint8", SignalTypeKind::Integer, 8, false).expect("Typ erwartet");
        assert!(matches!(
            ty.set_min(300.0),
            Err(ValidationError::InvalidRange { .. })
        ));
        assert_relative_eq!(ty.min, 0.0);
        assert_eq!(ty.set_scale(0.0), Err(ValidationError::ZeroScale));
    }

    #[test]
    fn test_enum_size_grows_with_largest_index() {
        let mut signal_enum = SignalEnum::new("gear");
        assert_eq!(signal_enum.size(), 1);

        signal_enum.insert_value(0, value("off", 0)).expect("Wert erwartet");
        signal_enum.insert_value(1, value("drive", 5)).expect("Wert erwartet");
        assert_eq!(signal_enum.size(), 3);
        assert_eq!(signal_enum.next_index(), 6);

        signal_enum.set_min_size(8).expect("Mindestbreite erwartet");
        assert_eq!(signal_enum.size(), 8);
    }

    #[test]
    fn test_enum_index_must_stay_unique() {
        let mut signal_enum = SignalEnum::new("gear");
        let first = value("off", 0);
        let first_id = first.id;
        signal_enum.insert_value(0, first).expect("Wert erwartet");
        signal_enum.insert_value(1, value("on", 1)).expect("Wert erwartet");

        assert_eq!(
            signal_enum.set_value_index(first_id, 1),
            Err(ValidationError::DuplicateEnumIndex(1))
        );
        signal_enum.move_value(0, 1).expect("Verschieben erwartet");
        assert_eq!(signal_enum.values[1].id, first_id);
    }
}
