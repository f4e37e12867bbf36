//! TLS engine boundary.
//!
//! # Responsibilities
//! - Define the callback contract between a TLS engine and its consumer
//! - Load server credentials and build the shared rustls configuration
//! - Adapt rustls's server connection API to the engine contract
//! - Inspect raw ClientHello bytes for the status report

mod context;
mod engine;
pub mod hello;
mod rustls;

pub use self::context::{ConfigError, TlsContext, TlsPolicy};
pub use self::engine::{
    EngineEvents, HandshakeMessage, SessionSummary, TlsAlert, TlsEngine, TlsError,
};
pub use self::rustls::RustlsEngine;
