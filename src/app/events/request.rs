use crate::app::error::{EditError, EditResult};
use crate::app::snapshot::EntitySnapshot;
use crate::core::{
    BusType, ByteOrder, EntityId, EntityKind, SendType, SignalTypeKind, SignalUnitKind,
};
use serde::{Deserialize, Serialize};

/// Anfrage der GUI: benannte Operation mit typisiertem Payload gegen eine Entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Pool der Ziel-Entity
    pub kind: EntityKind,
    pub entity_id: EntityId,
    #[serde(flatten)]
    pub operation: Operation,
}

/// Neues Signal in einer Message
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NewSignal {
    /// Ohne Typ wird der erste Signaltyp des Katalogs verwendet
    Standard { signal_type: Option<EntityId> },
    /// Ohne Enum wird das erste Enum des Katalogs verwendet
    Enum { signal_enum: Option<EntityId> },
}

/// Neuer Signaltyp im Katalog
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewSignalType {
    pub kind: SignalTypeKind,
    pub size: u16,
    pub signed: bool,
}

/// Alle Operationen, die Dispatcher annehmen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "payload", rename_all = "snake_case")]
pub enum Operation {
    // === Alle Arten ===
    /// Namen ändern
    UpdateName(String),
    /// Beschreibung ändern
    UpdateDesc(String),

    // === Netzwerk ===
    /// Bus `new_bus_N` anlegen
    AddBus,
    /// Busse ohne angeschlossene Interfaces löschen
    DeleteBuses(Vec<EntityId>),
    /// Node `new_node_N` mit erster freier Node-ID anlegen
    AddNode,
    /// Nodes samt Messages und Signalen löschen
    DeleteNodes(Vec<EntityId>),
    AddSignalType(NewSignalType),
    AddSignalUnit(SignalUnitKind),
    AddSignalEnum,
    /// Nicht referenzierte Signaltypen löschen
    DeleteSignalTypes(Vec<EntityId>),
    DeleteSignalUnits(Vec<EntityId>),
    DeleteSignalEnums(Vec<EntityId>),

    // === Bus ===
    UpdateBusType(BusType),
    UpdateBaudrate(u32),

    // === Node ===
    UpdateNodeId(u32),
    AddInterface,
    RemoveInterface(u8),
    /// Interface an einen Bus hängen (ggf. von einem anderen Bus umhängen)
    AttachInterface { number: u8, bus_id: EntityId },
    DetachInterface(u8),
    /// Message `new_message_N` auf einem angeschlossenen Interface anlegen
    AddMessage(u8),
    DeleteMessages(Vec<EntityId>),

    // === Message ===
    UpdateMessageId(u32),
    /// Statische CAN-ID setzen oder entfernen
    UpdateStaticCanId(Option<u32>),
    UpdateSizeByte(u16),
    UpdateByteOrder(ByteOrder),
    UpdateCycleTime(u32),
    UpdateSendType(SendType),
    UpdateDelayTime(u32),
    UpdateStartDelayTime(u32),
    /// Signal in der größten Lücke anlegen
    AddSignal(NewSignal),
    DeleteSignals(Vec<EntityId>),
    /// Lücken zwischen Signalen schließen
    CompactSignals,
    /// Signal von Position `from` nach `to` verschieben
    ReorderSignal {
        signal_id: EntityId,
        from: usize,
        to: usize,
    },

    // === Signal ===
    UpdateSignalType(EntityId),
    /// Einheit setzen oder entfernen
    UpdateSignalUnit(Option<EntityId>),
    UpdateSignalEnum(EntityId),

    // === Signaltyp ===
    UpdateMin(f64),
    UpdateMax(f64),
    UpdateScale(f64),
    UpdateOffset(f64),

    // === Einheit ===
    UpdateUnitKind(SignalUnitKind),
    UpdateSymbol(String),

    // === Enum ===
    UpdateMinSize(u16),
    /// Wert `NEW_VALUE_N` mit nächstem freien Index anlegen
    AddValue,
    RemoveValues(Vec<EntityId>),
    UpdateValueName { value_id: EntityId, name: String },
    UpdateValueIndex { value_id: EntityId, index: u32 },
    UpdateValueDesc { value_id: EntityId, desc: String },
    ReorderValue {
        value_id: EntityId,
        from: usize,
        to: usize,
    },
}

impl Operation {
    /// Stabiler Name für Logs und Fehlermeldungen
    pub fn name(&self) -> &'static str {
        match self {
            Operation::UpdateName(_) => "update_name",
            Operation::UpdateDesc(_) => "update_desc",
            Operation::AddBus => "add_bus",
            Operation::DeleteBuses(_) => "delete_buses",
            Operation::AddNode => "add_node",
            Operation::DeleteNodes(_) => "delete_nodes",
            Operation::AddSignalType(_) => "add_signal_type",
            Operation::AddSignalUnit(_) => "add_signal_unit",
            Operation::AddSignalEnum => "add_signal_enum",
            Operation::DeleteSignalTypes(_) => "delete_signal_types",
            Operation::DeleteSignalUnits(_) => "delete_signal_units",
            Operation::DeleteSignalEnums(_) => "delete_signal_enums",
            Operation::UpdateBusType(_) => "update_bus_type",
            Operation::UpdateBaudrate(_) => "update_baudrate",
            Operation::UpdateNodeId(_) => "update_node_id",
            Operation::AddInterface => "add_interface",
            Operation::RemoveInterface(_) => "remove_interface",
            Operation::AttachInterface { .. } => "attach_interface",
            Operation::DetachInterface(_) => "detach_interface",
            Operation::AddMessage(_) => "add_message",
            Operation::DeleteMessages(_) => "delete_messages",
            Operation::UpdateMessageId(_) => "update_message_id",
            Operation::UpdateStaticCanId(_) => "update_static_can_id",
            Operation::UpdateSizeByte(_) => "update_size_byte",
            Operation::UpdateByteOrder(_) => "update_byte_order",
            Operation::UpdateCycleTime(_) => "update_cycle_time",
            Operation::UpdateSendType(_) => "update_send_type",
            Operation::UpdateDelayTime(_) => "update_delay_time",
            Operation::UpdateStartDelayTime(_) => "update_start_delay_time",
            Operation::AddSignal(_) => "add_signal",
            Operation::DeleteSignals(_) => "delete_signals",
            Operation::CompactSignals => "compact_signals",
            Operation::ReorderSignal { .. } => "reorder_signal",
            Operation::UpdateSignalType(_) => "update_signal_type",
            Operation::UpdateSignalUnit(_) => "update_signal_unit",
            Operation::UpdateSignalEnum(_) => "update_signal_enum",
            Operation::UpdateMin(_) => "update_min",
            Operation::UpdateMax(_) => "update_max",
            Operation::UpdateScale(_) => "update_scale",
            Operation::UpdateOffset(_) => "update_offset",
            Operation::UpdateUnitKind(_) => "update_unit_kind",
            Operation::UpdateSymbol(_) => "update_symbol",
            Operation::UpdateMinSize(_) => "update_min_size",
            Operation::AddValue => "add_value",
            Operation::RemoveValues(_) => "remove_values",
            Operation::UpdateValueName { .. } => "update_value_name",
            Operation::UpdateValueIndex { .. } => "update_value_index",
            Operation::UpdateValueDesc { .. } => "update_value_desc",
            Operation::ReorderValue { .. } => "reorder_value",
        }
    }

    /// Fehler für eine Operation, die für `kind` nicht registriert ist
    pub fn unsupported(&self, kind: EntityKind) -> EditError {
        EditError::ContractViolation {
            operation: self.name(),
            kind,
        }
    }
}

/// Antwort an die GUI: konvertierter Snapshot oder Fehlertext.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResponse {
    pub snapshot: Option<EntitySnapshot>,
    pub error: Option<String>,
}

impl OperationResponse {
    pub fn from_result(result: EditResult<EntitySnapshot>) -> Self {
        match result {
            Ok(snapshot) => Self {
                snapshot: Some(snapshot),
                error: None,
            },
            Err(err) => Self {
                snapshot: None,
                error: Some(err.to_string()),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
