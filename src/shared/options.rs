//! Zentrale Konfiguration der Session-Engine.
//!
//! `SessionOptions` enthält die beim Start gelesenen Werte.
//! Die `const`-Werte bleiben als Fallback/Default erhalten.

use serde::{Deserialize, Serialize};

// ── Mailboxen ───────────────────────────────────────────────────────

/// Kapazität der History-Mailbox. Ist sie voll, wird die Operation zurückgenommen.
pub const HISTORY_MAILBOX_CAPACITY: usize = 64;
/// Kapazität der Sidebar-Mailbox. Ist sie voll, wartet der Sender.
pub const SIDEBAR_MAILBOX_CAPACITY: usize = 256;

// ── Historie ────────────────────────────────────────────────────────

/// Maximale Anzahl gespeicherter Commands (0 = unbegrenzt).
pub const HISTORY_MAX_DEPTH: usize = 500;

/// Dateiname der Optionen neben der Binary.
const CONFIG_FILE_NAME: &str = "canturin_session.toml";

// ── Laufzeit-Optionen (serialisierbar) ─────────────────────────────

/// Optionen einer Session.
/// Wird als `canturin_session.toml` neben der Binary gespeichert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    // ── Mailboxen ───────────────────────────────────────────────
    /// Plätze in der History-Mailbox
    pub history_mailbox_capacity: usize,
    /// Plätze in der Sidebar-Mailbox
    pub sidebar_mailbox_capacity: usize,

    // ── Historie ────────────────────────────────────────────────
    /// Älteste Commands fallen weg, sobald die Tiefe überschritten ist
    pub history_max_depth: usize,

    // ── Namen ───────────────────────────────────────────────────
    /// Namen vor dem Umbenennen trimmen
    pub trim_names: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            history_mailbox_capacity: HISTORY_MAILBOX_CAPACITY,
            sidebar_mailbox_capacity: SIDEBAR_MAILBOX_CAPACITY,
            history_max_depth: HISTORY_MAX_DEPTH,
            trim_names: true,
        }
    }
}

impl SessionOptions {
    /// Lädt Optionen aus einer TOML-Datei. Bei Fehler: Standardwerte.
    pub fn load_from_file(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(opts) => {
                    log::info!("Optionen geladen aus: {}", path.display());
                    opts
                }
                Err(e) => {
                    log::warn!("Optionen-Datei fehlerhaft, verwende Standardwerte: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Keine Optionen-Datei gefunden, verwende Standardwerte");
                Self::default()
            }
        }
    }

    /// Speichert Optionen als TOML-Datei.
    pub fn save_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::info!("Optionen gespeichert nach: {}", path.display());
        Ok(())
    }

    /// Ermittelt den Pfad zur Optionen-Datei neben der Binary.
    pub fn config_path() -> std::path::PathBuf {
        std::env::current_exe()
            .unwrap_or_else(|_| std::path::PathBuf::from("canturin-session"))
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join(CONFIG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("canturin_{}_{}.toml", name, std::process::id()))
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_path("roundtrip");
        let options = SessionOptions {
            history_mailbox_capacity: 4,
            sidebar_mailbox_capacity: 8,
            history_max_depth: 10,
            trim_names: false,
        };

        options.save_to_file(&path).expect("Speichern erwartet");
        let loaded = SessionOptions::load_from_file(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, options);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let loaded = SessionOptions::load_from_file(&temp_path("missing_file"));
        assert_eq!(loaded, SessionOptions::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let loaded: SessionOptions =
            toml::from_str("history_max_depth = 3\n").expect("Teilweise Optionen erwartet");

        assert_eq!(loaded.history_max_depth, 3);
        assert_eq!(loaded.history_mailbox_capacity, HISTORY_MAILBOX_CAPACITY);
        assert!(loaded.trim_names);
    }

    #[test]
    fn test_broken_file_gives_defaults() {
        let path = temp_path("broken");
        std::fs::write(&path, "history_max_depth = \"viele\"").expect("Schreiben erwartet");
        let loaded = SessionOptions::load_from_file(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, SessionOptions::default());
    }
}
