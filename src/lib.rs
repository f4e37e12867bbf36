//! Minimal TLS-terminating HTTP status server.
//!
//! Accepts TCP connections, terminates TLS through a callback-driven engine
//! interface, parses a restricted subset of HTTP/1.0, and answers GET `/` or
//! `/status` with a plain-text report of the negotiated TLS session and the
//! triggering request. One request per connection, no keep-alive.
//!
//! # Architecture
//!
//! ```text
//!   listener ──accept──▶ session ◀──callbacks──▶ TLS engine (rustls)
//!                           │
//!                           ├─ request parser (decrypted bytes)
//!                           └─ outbound buffer (single writer)
//! ```
//!
//! The per-connection [`net::Session`] implements the engine's
//! [`tls::EngineEvents`] contract; each session runs as one task, which
//! serializes its callbacks while distinct sessions run in parallel across
//! the runtime's workers. [`net::AdmissionStatus`] caps how many clients a
//! server instance will service.

pub mod config;
pub mod http;
pub mod net;
pub mod tls;

pub use config::ServerOptions;
pub use net::{AdmissionStatus, Server, Session};
pub use tls::{TlsContext, TlsPolicy};
