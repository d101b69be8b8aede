//! Anfragen an die Dispatcher und Benachrichtigungen an die GUI.

mod notification;
mod request;

pub use notification::{EventSink, SessionEvent};
pub use request::{NewSignal, NewSignalType, Operation, OperationRequest, OperationResponse};
