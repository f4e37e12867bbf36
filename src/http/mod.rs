//! Restricted HTTP/1.0 surface.
//!
//! # Responsibilities
//! - Incrementally parse one GET-style request per connection
//! - Represent the parsed request (verb, path, headers)
//! - Build the literal HTTP/1.0 response framing

mod parser;
mod request;
mod response;

pub use parser::{ParseError, RequestParser, MAX_HEADERS};
pub use request::HttpRequest;
pub use response::{method_not_allowed, not_found, ok_text, SERVER_IDENT};
