//! Streaming request parser.
//!
//! This is an intentionally permissive, non-conformant parser. Its
//! correctness goal is "sufficient for a literal browser GET", not RFC
//! compliance; anything fancier (bodies, chunking, pipelining) is out of
//! scope for this server.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::http::HttpRequest;

/// Hard cap on header entries per request. Exceeding it is connection-fatal.
pub const MAX_HEADERS: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("too many HTTP headers sent in request")]
    TooManyHeaders,
}

/// Accumulates decrypted bytes and extracts at most one request.
///
/// Incomplete input is not an error: `consume` returns `Ok(None)` and keeps
/// the accumulated bytes for the next call, so feeding a request in
/// arbitrarily small chunks yields the same result as one large chunk. On a
/// completed request the accumulation buffer is cleared.
#[derive(Debug, Default)]
pub struct RequestParser {
    buf: Vec<u8>,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly decrypted bytes and try to parse one request.
    pub fn consume(&mut self, bytes: &[u8]) -> Result<Option<HttpRequest>, ParseError> {
        self.buf.extend_from_slice(bytes);

        // Only attempt a parse once the header block terminator has arrived.
        let Some(head_len) = find_header_end(&self.buf) else {
            return Ok(None);
        };

        let Ok(head) = std::str::from_utf8(&self.buf[..head_len]) else {
            // Not decodable as a request head; wait for the peer to do
            // something sensible or hang up.
            return Ok(None);
        };

        let mut lines = head.lines();

        let request_line = lines.next().unwrap_or("");
        let mut parts = request_line.split_whitespace();
        let verb = parts.next().unwrap_or("").to_owned();
        let path = parts.next().unwrap_or("").to_owned();

        if verb.is_empty() || path.is_empty() {
            return Ok(None);
        }

        let mut headers = BTreeMap::new();
        for line in lines {
            let Some((name, value)) = line.split_once(": ") else {
                // A line without a separator ends the header block.
                break;
            };

            headers.insert(name.to_owned(), value.to_owned());

            if headers.len() > MAX_HEADERS {
                return Err(ParseError::TooManyHeaders);
            }
        }

        self.buf.clear();
        Ok(Some(HttpRequest::new(verb, path, headers)))
    }
}

/// Length of the request head up to (excluding) the blank-line terminator,
/// or None if the terminator has not arrived yet.
fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .or_else(|| buf.windows(2).position(|w| w == b"\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &[u8] = b"GET /status HTTP/1.0\r\nHost: example.com\r\nAccept: */*\r\n\r\n";

    #[test]
    fn parses_complete_request() {
        let mut parser = RequestParser::new();
        let req = parser.consume(REQUEST).unwrap().expect("complete request");

        assert_eq!(req.verb(), "GET");
        assert_eq!(req.path(), "/status");
        assert_eq!(req.headers().len(), 2);
        assert_eq!(req.headers()["Host"], "example.com");
        assert_eq!(req.headers()["Accept"], "*/*");
    }

    #[test]
    fn chunk_size_invariance() {
        let mut whole = RequestParser::new();
        let expected = whole.consume(REQUEST).unwrap().unwrap();

        let mut chunked = RequestParser::new();
        let mut result = None;
        for byte in REQUEST {
            if let Some(req) = chunked.consume(std::slice::from_ref(byte)).unwrap() {
                result = Some(req);
            }
        }

        assert_eq!(result.unwrap(), expected);
    }

    #[test]
    fn incomplete_request_is_not_ready() {
        let mut parser = RequestParser::new();
        assert_eq!(parser.consume(b"GET / HTTP/1.0\r\nHost: x").unwrap(), None);
        // Terminator arrives later; earlier bytes were retained.
        let req = parser.consume(b"\r\n\r\n").unwrap().expect("request");
        assert_eq!(req.path(), "/");
        assert_eq!(req.headers()["Host"], "x");
    }

    #[test]
    fn bare_lf_terminator_accepted() {
        let mut parser = RequestParser::new();
        let req = parser.consume(b"GET / HTTP/1.0\nHost: y\n\n").unwrap().unwrap();
        assert_eq!(req.headers()["Host"], "y");
    }

    fn request_with_headers(count: usize) -> Vec<u8> {
        let mut raw = b"GET / HTTP/1.0\r\n".to_vec();
        for i in 0..count {
            raw.extend_from_slice(format!("X-Header-{i}: {i}\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        raw
    }

    #[test]
    fn header_count_at_limit_succeeds() {
        let mut parser = RequestParser::new();
        let req = parser
            .consume(&request_with_headers(MAX_HEADERS))
            .unwrap()
            .expect("request");
        assert_eq!(req.headers().len(), MAX_HEADERS);
    }

    #[test]
    fn header_count_over_limit_fails() {
        let mut parser = RequestParser::new();
        let err = parser
            .consume(&request_with_headers(MAX_HEADERS + 1))
            .unwrap_err();
        assert_eq!(err, ParseError::TooManyHeaders);
    }

    #[test]
    fn buffer_cleared_after_request() {
        let mut parser = RequestParser::new();
        parser.consume(REQUEST).unwrap().unwrap();
        // Nothing retained from the previous request.
        assert_eq!(parser.consume(b"").unwrap(), None);
    }
}
