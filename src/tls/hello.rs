//! Raw ClientHello inspection.
//!
//! The engine adapter reports the client random and the offered ciphersuites
//! in the status page. rustls does not expose the client random, so it is
//! read straight out of the buffered handshake bytes.

use rustls::CipherSuite;

/// TLSPlaintext header (5 bytes) + Handshake header (4 bytes) + the
/// 2-byte legacy_version field precede the client random.
const RANDOM_OFFSET: usize = 5 + 4 + 2;
const RANDOM_LEN: usize = 32;

const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;
const HANDSHAKE_TYPE_CLIENT_HELLO: u8 = 0x01;

/// Extract the 32-byte client random from raw record-layer bytes that start
/// with a ClientHello. Returns `None` if the buffer does not look like one
/// or the random is split across record fragments (which no mainstream
/// client produces).
pub fn client_random(raw: &[u8]) -> Option<[u8; RANDOM_LEN]> {
    if raw.len() < RANDOM_OFFSET + RANDOM_LEN {
        return None;
    }
    if raw[0] != CONTENT_TYPE_HANDSHAKE || raw[5] != HANDSHAKE_TYPE_CLIENT_HELLO {
        return None;
    }

    let record_len = u16::from_be_bytes([raw[3], raw[4]]) as usize;
    if record_len < RANDOM_OFFSET - 5 + RANDOM_LEN {
        return None;
    }

    raw[RANDOM_OFFSET..RANDOM_OFFSET + RANDOM_LEN]
        .try_into()
        .ok()
}

/// Reserved renegotiation signaling suite value.
const RENEGOTIATION_SCSV: u16 = 0x00FF;

/// Human-readable label for an offered ciphersuite identifier.
pub fn suite_label(id: u16) -> String {
    if id == RENEGOTIATION_SCSV {
        return "Renegotiation SCSV".to_owned();
    }

    let name = format!("{:?}", CipherSuite::from(id));
    if name.starts_with("Unknown") {
        "Unknown ciphersuite".to_owned()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_client_hello(random: &[u8; 32]) -> Vec<u8> {
        let mut body = vec![0x03, 0x03]; // legacy_version
        body.extend_from_slice(random);
        body.push(0); // empty session id
        body.extend_from_slice(&[0x00, 0x02, 0x13, 0x01]); // one suite
        body.extend_from_slice(&[0x01, 0x00]); // null compression
        body.extend_from_slice(&[0x00, 0x00]); // no extensions

        let mut hs = vec![HANDSHAKE_TYPE_CLIENT_HELLO];
        hs.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        hs.extend_from_slice(&body);

        let mut record = vec![CONTENT_TYPE_HANDSHAKE, 0x03, 0x01];
        record.extend_from_slice(&(hs.len() as u16).to_be_bytes());
        record.extend_from_slice(&hs);
        record
    }

    #[test]
    fn extracts_client_random() {
        let random = [0xAB; 32];
        let raw = synthetic_client_hello(&random);
        assert_eq!(client_random(&raw), Some(random));
    }

    #[test]
    fn rejects_non_handshake_records() {
        let random = [7; 32];
        let mut raw = synthetic_client_hello(&random);
        raw[0] = 0x17; // application data
        assert_eq!(client_random(&raw), None);
    }

    #[test]
    fn rejects_short_input() {
        assert_eq!(client_random(&[CONTENT_TYPE_HANDSHAKE, 0x03, 0x01]), None);
    }

    #[test]
    fn labels_known_suite() {
        assert_eq!(suite_label(0x1301), "TLS13_AES_128_GCM_SHA256");
    }

    #[test]
    fn labels_renegotiation_scsv() {
        assert_eq!(suite_label(0x00FF), "Renegotiation SCSV");
    }

    #[test]
    fn labels_unknown_suite() {
        assert_eq!(suite_label(0xEEEE), "Unknown ciphersuite");
    }
}
