//! Per-connection session state machine.
//!
//! # Responsibilities
//! - Implement the TLS engine's callback contract
//! - Feed decrypted bytes through the request parser and answer requests
//! - Serialize outbound writes (single-writer, swap-then-drain)
//! - Tear down without use-after-close callbacks
//!
//! The session owns its engine; the engine receives the event sink per call
//! and never references the session, so teardown is `stop()` dropping the
//! engine. Every entry point tolerates a torn-down engine by logging and
//! doing nothing, which makes late completions after close harmless.

use std::collections::VecDeque;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::http::{self, HttpRequest, ParseError, RequestParser, SERVER_IDENT};
use crate::tls::{
    hello, EngineEvents, HandshakeMessage, SessionSummary, TlsAlert, TlsEngine, TlsError,
};

/// Capacity of the inbound ciphertext read buffer.
pub const READBUF_SIZE: usize = 4096;

/// Connection-fatal session failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Socket accepted, TLS handshake in progress.
    Handshaking,
    /// Handshake complete, application data flowing.
    Established,
    /// Engine torn down, draining remaining output.
    Closing,
    /// Socket closed. No further activity is valid.
    Closed,
}

/// Outbound buffer with the single-writer swap-then-drain discipline.
///
/// Ciphertext emissions accumulate in `pending`. `begin_write` hands the
/// whole pending buffer to the caller and marks a write in flight; until
/// `write_completed` it refuses to start another. This is the sole
/// serialization mechanism for outbound data.
#[derive(Debug, Default)]
pub struct Outbound {
    in_flight: bool,
    pending: Vec<u8>,
}

impl Outbound {
    fn append(&mut self, buf: &[u8]) {
        self.pending.extend_from_slice(buf);
    }

    /// Take the pending buffer for writing, unless a write is already in
    /// flight or there is nothing to write.
    pub fn begin_write(&mut self) -> Option<Vec<u8>> {
        if self.in_flight || self.pending.is_empty() {
            return None;
        }
        self.in_flight = true;
        Some(std::mem::take(&mut self.pending))
    }

    pub fn write_completed(&mut self) {
        self.in_flight = false;
    }

    pub fn write_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Callback-side session state: everything the engine's events touch.
/// Kept separate from the engine itself so the engine can borrow it
/// mutably while the session still owns both.
#[derive(Default)]
struct SessionCore {
    parser: Option<RequestParser>,
    outbound: Outbound,
    banner: String,
    session_summary: String,
    chello_summary: String,
    requests: VecDeque<HttpRequest>,
    parse_error: Option<ParseError>,
    established: bool,
    close_requested: bool,
}

impl EngineEvents for SessionCore {
    fn on_record_decrypted(&mut self, plaintext: &[u8]) {
        // Parser is created lazily on the first decrypted byte.
        let parser = self.parser.get_or_insert_with(RequestParser::new);
        match parser.consume(plaintext) {
            Ok(Some(request)) => self.requests.push_back(request),
            Ok(None) => {}
            Err(err) => self.parse_error = Some(err),
        }
    }

    fn on_ciphertext_emitted(&mut self, ciphertext: &[u8]) {
        self.outbound.append(ciphertext);
    }

    fn on_session_activated(&mut self) {
        self.banner = format!("TLS negotiation with {SERVER_IDENT} server\n\n");
    }

    fn on_session_established(&mut self, summary: &SessionSummary) {
        self.session_summary = format_session_summary(summary);
        self.established = true;
    }

    fn on_handshake_inspected(&mut self, message: &HandshakeMessage) {
        self.chello_summary = format_client_hello(message);
    }

    fn on_alert(&mut self, alert: TlsAlert) {
        match alert {
            TlsAlert::CloseNotify => self.close_requested = true,
            TlsAlert::Other(desc) => tracing::warn!(alert = %desc, "TLS alert received"),
        }
    }

    fn select_app_protocol(&mut self, _offered: &[Vec<u8>]) -> Option<Vec<u8>> {
        Some(b"http/1.1".to_vec())
    }
}

/// One accepted connection: socket peer, TLS engine, buffers, parser.
///
/// The engine reference is `Some` exactly between construction and `stop()`.
pub struct Session {
    peer: SocketAddr,
    engine: Option<Box<dyn TlsEngine>>,
    phase: SessionPhase,
    core: SessionCore,
}

impl Session {
    pub fn new(peer: SocketAddr, engine: Box<dyn TlsEngine>) -> Self {
        Self {
            peer,
            engine: Some(engine),
            phase: SessionPhase::Handshaking,
            core: SessionCore::default(),
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Feed ciphertext read from the socket into the engine and act on
    /// whatever falls out: parsed requests are answered and the connection
    /// close is requested after the response; a peer close-notify closes our
    /// side; engine or parser failures are connection-fatal.
    pub fn received_data(&mut self, buf: &[u8]) -> Result<(), SessionError> {
        let Some(engine) = self.engine.as_mut() else {
            tracing::warn!(peer = %self.peer, "received client data after close");
            return Ok(());
        };

        engine.feed_ciphertext(buf, &mut self.core)?;

        if let Some(err) = self.core.parse_error.take() {
            return Err(err.into());
        }

        if self.core.established && self.phase == SessionPhase::Handshaking {
            self.phase = SessionPhase::Established;
        }

        while let Some(request) = self.core.requests.pop_front() {
            tracing::debug!(
                peer = %self.peer,
                verb = request.verb(),
                path = request.path(),
                "request received"
            );
            let response = build_response(self.peer, &request, &self.core);
            engine.send_plaintext(&response, &mut self.core)?;
            engine.close(&mut self.core);
        }

        if self.core.close_requested {
            self.core.close_requested = false;
            engine.close(&mut self.core);
        }

        if engine.is_closed_for_reading() {
            self.stop();
        }

        Ok(())
    }

    /// Tear down the TLS engine. Queues a close-notify for the peer and
    /// drops the engine; any callback arriving afterwards observes the
    /// missing engine and no-ops. Idempotent.
    pub fn stop(&mut self) {
        let Some(mut engine) = self.engine.take() else {
            return;
        };
        engine.close(&mut self.core);
        self.phase = SessionPhase::Closing;
        tracing::debug!(peer = %self.peer, "session closing");
    }

    /// See [`Outbound::begin_write`].
    pub fn begin_write(&mut self) -> Option<Vec<u8>> {
        self.core.outbound.begin_write()
    }

    pub fn write_completed(&mut self) {
        self.core.outbound.write_completed();
    }

    /// The socket should be closed once nothing is being written, nothing is
    /// pending, and the engine is gone or done writing.
    pub fn should_close_socket(&self) -> bool {
        !self.core.outbound.write_in_flight()
            && self.core.outbound.is_drained()
            && self
                .engine
                .as_ref()
                .map_or(true, |engine| engine.is_closed_for_writing())
    }

    pub fn mark_closed(&mut self) {
        self.phase = SessionPhase::Closed;
    }
}

/// Drive a session against its socket until the connection is done.
///
/// Flush-then-read: all pending ciphertext is written (one write at a time)
/// before the next read is issued, so a session never has more than one
/// outstanding operation of either kind. There is no handshake or idle
/// timeout; a stalled client parks here until it hangs up.
pub async fn drive(mut session: Session, mut stream: TcpStream) {
    let mut buf = vec![0u8; READBUF_SIZE];

    loop {
        while let Some(chunk) = session.begin_write() {
            if let Err(err) = stream.write_all(&chunk).await {
                tracing::debug!(peer = %session.peer(), error = %err, "write failed");
                session.stop();
                session.mark_closed();
                return;
            }
            session.write_completed();
        }

        if session.should_close_socket() {
            let _ = stream.shutdown().await;
            session.mark_closed();
            tracing::debug!(peer = %session.peer(), "session closed");
            return;
        }

        match stream.read(&mut buf).await {
            Ok(0) => session.stop(),
            Ok(n) => {
                if let Err(err) = session.received_data(&buf[..n]) {
                    tracing::warn!(peer = %session.peer(), error = %err, "TLS connection failed");
                    session.stop();
                }
            }
            Err(err) => {
                tracing::debug!(peer = %session.peer(), error = %err, "read failed");
                session.stop();
            }
        }
    }
}

fn build_response(peer: SocketAddr, request: &HttpRequest, core: &SessionCore) -> Vec<u8> {
    if request.verb() != "GET" {
        return http::method_not_allowed();
    }

    match request.path() {
        "/" | "/status" => {
            let report = format!(
                "{}{}{}{}",
                core.banner,
                core.session_summary,
                core.chello_summary,
                format_request(peer, request)
            );
            http::ok_text(&report)
        }
        _ => http::not_found(),
    }
}

/// Four-line session report: version, ciphersuite, then session id and SNI
/// only when non-empty.
fn format_session_summary(summary: &SessionSummary) -> String {
    let mut out = format!(
        "Version: {}\nCiphersuite: {}\n",
        summary.version, summary.ciphersuite
    );
    if !summary.session_id.is_empty() {
        out.push_str(&format!(
            "SessionID: {}\n",
            hex::encode_upper(&summary.session_id)
        ));
    }
    if let Some(sni) = summary.sni.as_deref() {
        if !sni.is_empty() {
            out.push_str(&format!("SNI: {sni}\n"));
        }
    }
    out
}

fn format_client_hello(message: &HandshakeMessage) -> String {
    let HandshakeMessage::ClientHello {
        random,
        ciphersuites,
    } = message;

    let mut out = format!("Client random: {}\n", hex::encode_upper(random));
    out.push_str("Client offered following ciphersuites:\n");
    for id in ciphersuites {
        out.push_str(&format!(" - 0x{id:04x} {}\n", hello::suite_label(*id)));
    }
    out
}

fn format_request(peer: SocketAddr, request: &HttpRequest) -> String {
    let mut out = format!(
        "Client {} requested {} {}\n",
        peer.ip(),
        request.verb(),
        request.path()
    );
    if !request.headers().is_empty() {
        out.push_str("Client HTTP headers:\n");
        for (name, value) in request.headers() {
            out.push_str(&format!(" {name}: {value}\n"));
        }
    }
    out
}
