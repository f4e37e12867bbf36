//! HTTP/1.0 response framing.
//!
//! Responses are deliberately minimal: no `Connection:` header, no chunked
//! transfer, no keep-alive. The connection is closed after every response.

/// Value of the `Server:` header on 200 responses.
pub const SERVER_IDENT: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// `200 OK` with a plain-text body.
pub fn ok_text(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.0 200 OK\r\n\
         Server: {SERVER_IDENT}\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {body}",
        body.len()
    )
    .into_bytes()
}

/// `404 Not Found`, empty body.
pub fn not_found() -> Vec<u8> {
    b"HTTP/1.0 404 Not Found\r\n\r\n".to_vec()
}

/// `405 Method Not Allowed`, empty body.
pub fn method_not_allowed() -> Vec<u8> {
    b"HTTP/1.0 405 Method Not Allowed\r\n\r\n".to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_framing() {
        let raw = String::from_utf8(ok_text("hello\n")).unwrap();
        assert!(raw.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(raw.contains("Content-Type: text/plain\r\n"));
        assert!(raw.contains("Content-Length: 6\r\n"));
        assert!(raw.ends_with("\r\n\r\nhello\n"));
    }

    #[test]
    fn error_responses_have_empty_bodies() {
        assert_eq!(not_found(), b"HTTP/1.0 404 Not Found\r\n\r\n");
        assert_eq!(
            method_not_allowed(),
            b"HTTP/1.0 405 Method Not Allowed\r\n\r\n"
        );
    }
}
