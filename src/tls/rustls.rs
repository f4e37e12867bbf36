//! rustls-backed implementation of the TLS engine contract.
//!
//! Two phases: a `rustls::server::Acceptor` buffers the ClientHello so it
//! can be inspected (and the ALPN choice made) before the per-connection
//! `ServerConnection` is built; afterwards the unbuffered connection API
//! pumps records in both directions.

use std::sync::Arc;

use rustls::server::{Acceptor, ServerConnection};
use rustls::ProtocolVersion;

use crate::tls::engine::{
    EngineEvents, HandshakeMessage, SessionSummary, TlsAlert, TlsEngine, TlsError,
};
use crate::tls::{hello, TlsContext};

enum Phase {
    /// Collecting the ClientHello. `raw` mirrors every byte fed so far so
    /// the client random can be read out of it.
    Accepting { acceptor: Acceptor, raw: Vec<u8> },
    Running(Box<ServerConnection>),
    /// Torn down before a connection existed (close during accept).
    Shut,
}

pub struct RustlsEngine {
    ctx: Arc<TlsContext>,
    phase: Phase,
    read_closed: bool,
    write_closed: bool,
}

impl RustlsEngine {
    pub fn new(ctx: Arc<TlsContext>) -> Self {
        Self {
            ctx,
            phase: Phase::Accepting {
                acceptor: Acceptor::default(),
                raw: Vec::new(),
            },
            read_closed: false,
            write_closed: false,
        }
    }

    fn protocol_error(&mut self, err: impl std::fmt::Display) -> TlsError {
        self.read_closed = true;
        self.write_closed = true;
        TlsError::Protocol(err.to_string())
    }

    /// Drive the acceptor until the ClientHello is complete, then hand the
    /// buffered handshake over to a fresh `ServerConnection`.
    fn accept_step(&mut self, buf: &[u8], events: &mut dyn EngineEvents) -> Result<(), TlsError> {
        let Phase::Accepting { acceptor, raw } = &mut self.phase else {
            return Ok(());
        };

        raw.extend_from_slice(buf);

        let mut cursor = buf;
        while !cursor.is_empty() {
            let n = acceptor
                .read_tls(&mut cursor)
                .map_err(|e| TlsError::Protocol(e.to_string()))?;
            if n == 0 {
                break;
            }
        }

        let accepted = match acceptor.accept() {
            Ok(Some(accepted)) => accepted,
            Ok(None) => return Ok(()),
            Err((err, mut alert)) => {
                let mut out = Vec::new();
                let _ = alert.write_all(&mut out);
                if !out.is_empty() {
                    events.on_ciphertext_emitted(&out);
                }
                return Err(self.protocol_error(err));
            }
        };

        let client_hello = accepted.client_hello();

        let message = HandshakeMessage::ClientHello {
            random: hello::client_random(raw).map(Vec::from).unwrap_or_default(),
            ciphersuites: client_hello
                .cipher_suites()
                .iter()
                .map(|suite| u16::from(*suite))
                .collect(),
        };
        events.on_handshake_inspected(&message);

        let offered: Vec<Vec<u8>> = client_hello
            .alpn()
            .map(|protos| protos.map(<[u8]>::to_vec).collect())
            .unwrap_or_default();
        let chosen = events.select_app_protocol(&offered);

        let config = self.ctx.config_with_alpn(chosen);
        match accepted.into_connection(config) {
            Ok(conn) => {
                self.phase = Phase::Running(Box::new(conn));
                Ok(())
            }
            Err((err, mut alert)) => {
                let mut out = Vec::new();
                let _ = alert.write_all(&mut out);
                if !out.is_empty() {
                    events.on_ciphertext_emitted(&out);
                }
                Err(self.protocol_error(err))
            }
        }
    }

    /// Decrypt buffered records, surface handshake completion, flush
    /// whatever the connection wants written, and report a peer close.
    fn pump(&mut self, events: &mut dyn EngineEvents) -> Result<(), TlsError> {
        let Phase::Running(conn) = &mut self.phase else {
            return Ok(());
        };

        let was_handshaking = conn.is_handshaking();

        let io_state = match conn.process_new_packets() {
            Ok(state) => state,
            Err(err) => {
                // rustls queues a fatal alert for the peer; flush it before
                // surfacing the error.
                flush_ciphertext(conn, events);
                return Err(self.protocol_error(err));
            }
        };

        if was_handshaking && !conn.is_handshaking() {
            events.on_session_activated();

            let summary = SessionSummary {
                version: version_label(conn.protocol_version()),
                ciphersuite: conn
                    .negotiated_cipher_suite()
                    .map(|suite| format!("{:?}", suite.suite()))
                    .unwrap_or_default(),
                // rustls does not expose the legacy session id.
                session_id: Vec::new(),
                sni: conn.server_name().map(str::to_owned),
            };
            events.on_session_established(&summary);
        }

        let plaintext_len = io_state.plaintext_bytes_to_read();
        if plaintext_len > 0 {
            let mut plaintext = vec![0u8; plaintext_len];
            use std::io::Read;
            if let Err(e) = conn.reader().read_exact(&mut plaintext) {
                flush_ciphertext(conn, events);
                return Err(self.protocol_error(e));
            }
            events.on_record_decrypted(&plaintext);
        }

        flush_ciphertext(conn, events);

        if io_state.peer_has_closed() && !self.read_closed {
            self.read_closed = true;
            events.on_alert(TlsAlert::CloseNotify);
        }

        Ok(())
    }
}

impl TlsEngine for RustlsEngine {
    fn feed_ciphertext(
        &mut self,
        buf: &[u8],
        events: &mut dyn EngineEvents,
    ) -> Result<(), TlsError> {
        match &mut self.phase {
            Phase::Accepting { .. } => {
                self.accept_step(buf, events)?;
                // The acceptor hands its buffered records to the new
                // connection, so pump immediately after the switch.
                self.pump(events)
            }
            Phase::Running(conn) => {
                let mut cursor = buf;
                while !cursor.is_empty() {
                    let n = conn
                        .read_tls(&mut cursor)
                        .map_err(|e| TlsError::Protocol(e.to_string()))?;
                    if n == 0 {
                        break;
                    }
                }
                self.pump(events)
            }
            Phase::Shut => Ok(()),
        }
    }

    fn send_plaintext(
        &mut self,
        buf: &[u8],
        events: &mut dyn EngineEvents,
    ) -> Result<(), TlsError> {
        let Phase::Running(conn) = &mut self.phase else {
            return Err(TlsError::Protocol(
                "cannot send before handshake".to_owned(),
            ));
        };

        use std::io::Write;
        conn.writer()
            .write_all(buf)
            .map_err(|e| TlsError::Protocol(e.to_string()))?;

        flush_ciphertext(conn, events);
        Ok(())
    }

    fn close(&mut self, events: &mut dyn EngineEvents) {
        if self.write_closed {
            return;
        }
        self.write_closed = true;

        match &mut self.phase {
            Phase::Running(conn) => {
                conn.send_close_notify();
                flush_ciphertext(conn, events);
            }
            Phase::Accepting { .. } => {
                self.phase = Phase::Shut;
                self.read_closed = true;
            }
            Phase::Shut => {}
        }
    }

    fn is_closed_for_reading(&self) -> bool {
        self.read_closed
    }

    fn is_closed_for_writing(&self) -> bool {
        self.write_closed
    }
}

fn flush_ciphertext(conn: &mut ServerConnection, events: &mut dyn EngineEvents) {
    let mut out = Vec::new();
    while conn.wants_write() {
        if conn.write_tls(&mut out).is_err() {
            break;
        }
    }
    if !out.is_empty() {
        events.on_ciphertext_emitted(&out);
    }
}

fn version_label(version: Option<ProtocolVersion>) -> String {
    match version {
        Some(ProtocolVersion::TLSv1_2) => "TLS v1.2".to_owned(),
        Some(ProtocolVersion::TLSv1_3) => "TLS v1.3".to_owned(),
        Some(other) => format!("{other:?}"),
        None => "unknown".to_owned(),
    }
}
