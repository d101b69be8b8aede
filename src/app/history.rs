//! Lineare Undo/Redo-Historie mit Cursor.
//!
//! Reiner Zustandsautomat: Das Ausführen eines Commands übernimmt der Aufrufer
//! über eine Closure, damit der Cursor nur bei Erfolg wandert.

use serde::Serialize;

/// Beobachtbarer Zustand der Historie (für Events und Abfragen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    /// Anzahl gespeicherter Commands
    pub operation_count: usize,
    /// Index des zuletzt angewendeten Commands, -1 wenn keiner
    pub current_index: isize,
    /// Seit dem letzten Speichern unverändert
    pub saved: bool,
}

/// Liste von Commands plus Cursor auf den zuletzt angewendeten.
pub struct HistoryStack<C> {
    commands: Vec<C>,
    cursor: Option<usize>,
    max_depth: usize,
    saved: bool,
}

impl<C> HistoryStack<C> {
    /// Erstellt eine leere Historie. `max_depth == 0` bedeutet unbegrenzt.
    pub fn new_with_capacity(max_depth: usize) -> Self {
        Self {
            commands: Vec::new(),
            cursor: None,
            max_depth,
            saved: true,
        }
    }

    /// Hängt ein Command an. Eine abgehängte Zukunft (Commands hinter dem Cursor) wird verworfen.
    pub fn record(&mut self, command: C) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.commands.truncate(keep);
        self.commands.push(command);
        if self.max_depth > 0 && self.commands.len() > self.max_depth {
            self.commands.remove(0);
        }
        self.cursor = Some(self.commands.len() - 1);
        self.saved = false;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.next_index().is_some()
    }

    /// Führt `run` mit dem Command am Cursor aus und dekrementiert bei Erfolg den Cursor.
    ///
    /// `Ok(None)`: nichts zu tun. Bei einem Fehler bleibt der Cursor unverändert.
    pub fn undo<T, E>(&mut self, run: impl FnOnce(&C) -> Result<T, E>) -> Result<Option<T>, E> {
        let Some(index) = self.cursor else {
            return Ok(None);
        };
        let result = run(&self.commands[index])?;
        self.cursor = index.checked_sub(1);
        self.saved = false;
        Ok(Some(result))
    }

    /// Rückt den Cursor vor und führt `run` aus; bei einem Fehler wird der Cursor zurückgesetzt.
    pub fn redo<T, E>(&mut self, run: impl FnOnce(&C) -> Result<T, E>) -> Result<Option<T>, E> {
        let Some(index) = self.next_index() else {
            return Ok(None);
        };
        let previous = self.cursor;
        self.cursor = Some(index);
        match run(&self.commands[index]) {
            Ok(result) => {
                self.saved = false;
                Ok(Some(result))
            }
            Err(err) => {
                self.cursor = previous;
                Err(err)
            }
        }
    }

    pub fn mark_saved(&mut self) {
        self.saved = true;
    }

    /// Leert die Historie, z.B. nach dem Laden eines neuen Netzwerks.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = None;
        self.saved = true;
    }

    pub fn state(&self) -> HistoryState {
        HistoryState {
            operation_count: self.commands.len(),
            current_index: self.cursor.map_or(-1, |c| c as isize),
            saved: self.saved,
        }
    }

    fn next_index(&self) -> Option<usize> {
        let next = self.cursor.map_or(0, |c| c + 1);
        (next < self.commands.len()).then_some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(label: &&'static str) -> Result<&'static str, String> {
        Ok(*label)
    }

    fn fail(_: &&'static str) -> Result<&'static str, String> {
        Err("entity gone".to_string())
    }

    #[test]
    fn empty_history_is_noop() {
        let mut history: HistoryStack<&'static str> = HistoryStack::new_with_capacity(10);
        assert_eq!(history.undo(ok), Ok(None));
        assert_eq!(history.redo(ok), Ok(None));
        assert_eq!(history.state().current_index, -1);
        assert_eq!(history.state().operation_count, 0);
    }

    #[test]
    fn undo_then_redo_walks_the_cursor() {
        let mut history = HistoryStack::new_with_capacity(10);
        history.record("a");
        history.record("b");
        assert_eq!(history.state().current_index, 1);

        assert_eq!(history.undo(ok), Ok(Some("b")));
        assert_eq!(history.undo(ok), Ok(Some("a")));
        assert_eq!(history.undo(ok), Ok(None));
        assert_eq!(history.state().current_index, -1);

        assert_eq!(history.redo(ok), Ok(Some("a")));
        assert_eq!(history.redo(ok), Ok(Some("b")));
        assert_eq!(history.redo(ok), Ok(None));
        assert_eq!(history.state().current_index, 1);
    }

    #[test]
    fn record_behind_cursor_discards_future() {
        let mut history = HistoryStack::new_with_capacity(10);
        history.record("a");
        history.record("b");
        history.record("c");
        history.undo(ok).expect("Undo erwartet");
        history.undo(ok).expect("Undo erwartet");

        history.record("d");
        let state = history.state();
        assert_eq!(state.operation_count, 2);
        assert_eq!(state.current_index, 1);
        assert!(!history.can_redo());
        assert_eq!(history.redo(ok), Ok(None));
    }

    #[test]
    fn failed_undo_keeps_cursor() {
        let mut history = HistoryStack::new_with_capacity(10);
        history.record("a");

        assert!(history.undo(fail).is_err());
        assert_eq!(history.state().current_index, 0);
    }

    #[test]
    fn failed_redo_rolls_cursor_back() {
        let mut history = HistoryStack::new_with_capacity(10);
        history.record("a");
        history.undo(ok).expect("Undo erwartet");

        assert!(history.redo(fail).is_err());
        assert_eq!(history.state().current_index, -1);
        assert!(history.can_redo());
    }

    #[test]
    fn respects_max_depth() {
        let mut history = HistoryStack::new_with_capacity(3);
        for label in ["a", "b", "c", "d", "e"] {
            history.record(label);
        }
        assert_eq!(history.state().operation_count, 3);
        assert_eq!(history.state().current_index, 2);

        let mut undone = Vec::new();
        while let Ok(Some(label)) = history.undo(ok) {
            undone.push(label);
        }
        assert_eq!(undone, vec!["e", "d", "c"]);
    }

    #[test]
    fn saved_flag_resets_on_change() {
        let mut history = HistoryStack::new_with_capacity(10);
        assert!(history.state().saved);
        history.record("a");
        assert!(!history.state().saved);
        history.mark_saved();
        assert!(history.state().saved);
        history.undo(ok).expect("Undo erwartet");
        assert!(!history.state().saved);
    }
}
