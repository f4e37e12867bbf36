//! Callback contract between a TLS engine and its consumer.
//!
//! The engine owns handshake negotiation and record encryption/decryption;
//! the consumer owns the socket and the application protocol. The engine
//! never holds a reference to its consumer — every operation receives the
//! event sink as an argument, so ownership stays one-directional and
//! teardown is a plain drop.

use thiserror::Error;

/// Connection-fatal failures reported by a TLS engine.
#[derive(Debug, Error)]
pub enum TlsError {
    /// Malformed ciphertext, handshake failure, or any other protocol-level
    /// error. The connection must be closed.
    #[error("TLS protocol error: {0}")]
    Protocol(String),
}

/// Facts about the negotiated session, captured at handshake completion.
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    /// Negotiated protocol version, e.g. "TLS v1.3".
    pub version: String,
    /// Negotiated ciphersuite name.
    pub ciphersuite: String,
    /// Legacy session identifier; empty when the engine does not expose one.
    pub session_id: Vec<u8>,
    /// Server-name-indication hostname offered by the client.
    pub sni: Option<String>,
}

/// Handshake messages surfaced to the consumer for inspection.
///
/// Closed variant set: only the messages the consumer actually reports on
/// are modeled, each carrying pre-extracted fields rather than raw
/// polymorphic message objects.
#[derive(Debug, Clone)]
pub enum HandshakeMessage {
    ClientHello {
        /// The 32-byte client random.
        random: Vec<u8>,
        /// Ciphersuite identifiers as offered, in order.
        ciphersuites: Vec<u16>,
    },
}

/// TLS alerts surfaced to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsAlert {
    /// The peer announced a graceful close of the secure connection.
    CloseNotify,
    /// Any other alert, carried as its description.
    Other(String),
}

/// Events a TLS engine delivers while processing traffic.
///
/// Implemented by the connection session; the engine calls these from inside
/// [`TlsEngine::feed_ciphertext`] and friends, on the caller's task.
pub trait EngineEvents {
    /// A decrypted application-data record is available.
    fn on_record_decrypted(&mut self, plaintext: &[u8]);

    /// Ciphertext is ready to be written to the peer. May fire at arbitrary
    /// times: handshake flights, encrypted responses, close-notify.
    fn on_ciphertext_emitted(&mut self, ciphertext: &[u8]);

    /// The connection is ready for application traffic.
    fn on_session_activated(&mut self);

    /// The handshake completed; `summary` describes the negotiated session.
    fn on_session_established(&mut self, summary: &SessionSummary);

    /// A handshake message of interest was seen.
    fn on_handshake_inspected(&mut self, message: &HandshakeMessage);

    /// An alert arrived from the peer.
    fn on_alert(&mut self, alert: TlsAlert);

    /// Pick an application protocol from the client's ALPN offer. `None`
    /// leaves the choice to the engine's defaults.
    fn select_app_protocol(&mut self, offered: &[Vec<u8>]) -> Option<Vec<u8>>;
}

/// A server-side TLS engine.
///
/// Record-layer input and output both flow through the consumer: ciphertext
/// read from the socket goes in via `feed_ciphertext`, and everything the
/// engine wants written comes back out through
/// [`EngineEvents::on_ciphertext_emitted`].
pub trait TlsEngine: Send {
    /// Process ciphertext received from the peer. Decrypted records,
    /// handshake progress, and response ciphertext are delivered through
    /// `events`. Errors are connection-fatal.
    fn feed_ciphertext(
        &mut self,
        buf: &[u8],
        events: &mut dyn EngineEvents,
    ) -> Result<(), TlsError>;

    /// Encrypt and queue application data for the peer.
    fn send_plaintext(&mut self, buf: &[u8], events: &mut dyn EngineEvents)
        -> Result<(), TlsError>;

    /// Begin a graceful close: queues a close-notify for the peer and shuts
    /// the write side. Idempotent.
    fn close(&mut self, events: &mut dyn EngineEvents);

    /// True once no more application data will arrive from the peer.
    fn is_closed_for_reading(&self) -> bool;

    /// True once no more data will be produced for the peer.
    fn is_closed_for_writing(&self) -> bool;
}
