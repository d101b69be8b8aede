//! Begrenzte Mailboxen für die Single-Consumer-Worker (Historie, Sidebar).

use super::error::{EditError, EditResult};
use std::io;
use std::ops::ControlFlow;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

/// Verhalten bei voller Mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backpressure {
    /// Sender wartet, bis wieder Platz ist. Nur zulässig, wenn der Consumer nie
    /// auf einen Lock des Senders wartet.
    Block,
    /// Sender bekommt sofort `EditError::Busy`.
    Reject,
}

/// Sendeseite einer begrenzten Mailbox.
pub struct Mailbox<T> {
    name: &'static str,
    tx: SyncSender<T>,
    policy: Backpressure,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            policy: self.policy,
        }
    }
}

impl<T> Mailbox<T> {
    /// Erstellt Mailbox und Empfangsseite. Kapazität 0 wird auf 1 angehoben.
    pub fn bounded(name: &'static str, capacity: usize, policy: Backpressure) -> (Self, Receiver<T>) {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        (Self { name, tx, policy }, rx)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> Backpressure {
        self.policy
    }

    /// Stellt eine Nachricht gemäß der Backpressure-Policy zu.
    pub fn deliver(&self, message: T) -> EditResult<()> {
        match self.policy {
            Backpressure::Block => self.tx.send(message).map_err(|_| self.closed()),
            Backpressure::Reject => match self.tx.try_send(message) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    log::warn!("Mailbox '{}' voll, Nachricht abgelehnt", self.name);
                    Err(EditError::Busy { mailbox: self.name })
                }
                Err(TrySendError::Disconnected(_)) => Err(self.closed()),
            },
        }
    }

    /// Stellt unabhängig von der Policy blockierend zu. Nur ohne gehaltenen Pool-Lock.
    pub fn send_blocking(&self, message: T) -> EditResult<()> {
        self.tx.send(message).map_err(|_| self.closed())
    }

    /// Sendet eine Anfrage (immer blockierend) und wartet auf die Antwort.
    ///
    /// Darf nur ohne gehaltenen Pool-Lock aufgerufen werden.
    pub fn request<R>(&self, build: impl FnOnce(SyncSender<R>) -> T) -> EditResult<R> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        self.tx.send(build(reply_tx)).map_err(|_| self.closed())?;
        reply_rx.recv().map_err(|_| self.closed())
    }

    fn closed(&self) -> EditError {
        EditError::Closed { mailbox: self.name }
    }
}

/// Startet einen benannten Worker-Thread, der die Mailbox bis `Break` oder bis
/// alle Sender weg sind abarbeitet. Danach noch wartende Nachrichten werden verworfen.
pub fn spawn_worker<T: Send + 'static>(
    name: &'static str,
    capacity: usize,
    policy: Backpressure,
    mut handle: impl FnMut(T) -> ControlFlow<()> + Send + 'static,
) -> io::Result<(Mailbox<T>, JoinHandle<()>)> {
    let (mailbox, rx) = Mailbox::bounded(name, capacity, policy);
    let join = thread::Builder::new().name(name.to_string()).spawn(move || {
        log::debug!("Worker '{name}' gestartet");
        while let Ok(message) = rx.recv() {
            if handle(message).is_break() {
                break;
            }
        }
        log::debug!("Worker '{name}' beendet");
    })?;
    Ok((mailbox, join))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_policy_reports_busy_when_full() {
        let (mailbox, rx) = Mailbox::bounded("test", 1, Backpressure::Reject);
        mailbox.deliver(1).expect("Erste Nachricht sollte passen");

        assert_eq!(mailbox.deliver(2), Err(EditError::Busy { mailbox: "test" }));
        assert_eq!(rx.recv(), Ok(1));
        mailbox.deliver(3).expect("Nach dem Leeren sollte wieder Platz sein");
    }

    #[test]
    fn closed_mailbox_reports_closed() {
        let (mailbox, rx) = Mailbox::bounded("gone", 4, Backpressure::Block);
        drop(rx);
        assert_eq!(mailbox.deliver(1), Err(EditError::Closed { mailbox: "gone" }));
    }

    enum Msg {
        Add(u32),
        Sum(SyncSender<u32>),
        Stop,
    }

    #[test]
    fn worker_processes_in_order_and_answers_requests() {
        let mut total = 0;
        let (mailbox, join) = spawn_worker("sum", 2, Backpressure::Block, move |msg| {
            match msg {
                Msg::Add(n) => total += n,
                Msg::Sum(reply) => {
                    let _ = reply.send(total);
                }
                Msg::Stop => return ControlFlow::Break(()),
            }
            ControlFlow::Continue(())
        })
        .expect("Worker sollte starten");

        for n in 1..=10 {
            mailbox.deliver(Msg::Add(n)).expect("Zustellung erwartet");
        }
        assert_eq!(mailbox.request(Msg::Sum), Ok(55));

        mailbox.deliver(Msg::Stop).expect("Stop erwartet");
        join.join().expect("Worker sollte sauber enden");
        assert!(mailbox.request(Msg::Sum).is_err());
    }
}
