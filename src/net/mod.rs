//! Listener, admission control, and per-connection sessions.

mod admission;
mod listener;
mod session;

pub use admission::AdmissionStatus;
pub use listener::Server;
pub use session::{drive, Outbound, Session, SessionError, SessionPhase, READBUF_SIZE};
