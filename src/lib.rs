#![warn(missing_docs, missing_debug_implementations)]
#![warn(clippy::all)]

//! An incremental HTTP/1.1 (and 1.0) request parser.
//!
//! This library turns bytes, as they arrive from some transport, into a
//! [`Request`] holding a CGI-style [`Environment`] and a [`Body`]. It never does
//! I/O itself (apart from spilling big bodies to a temporary file), the
//! caller pushes bytes in whenever it has them.
//!
//! ## In scope
//!
//! * Request line and header fields, validated byte by byte.
//! * Size ceilings on the header section and every individual field, checked
//!   before anything is buffered.
//! * `Content-Length` and `Transfer-Encoding: chunked` bodies.
//! * Bodies moving from memory to a temporary file when they get big.
//!
//! ## Out of scope
//!
//! Everything about the connection around the request.
//!
//! * Accepting sockets, timeouts.
//! * Writing responses.
//! * Routing and application logic.
//!
//! The [`server`] module has a small helper for reading requests off any
//! `AsyncRead`, but the parser itself is sans-io.
//!
//! # Environment
//!
//! | Key | Value |
//! |---|---|
//! | `REQUEST_METHOD` | `GET` |
//! | `REQUEST_URI` | path and query, never the fragment |
//! | `REQUEST_PATH`, `PATH_INFO` | path |
//! | `QUERY_STRING` | query, empty string if there is none |
//! | `FRAGMENT` | fragment, absent if there is none |
//! | `HTTP_VERSION`, `SERVER_PROTOCOL` | `HTTP/1.1` |
//! | `GATEWAY_INTERFACE` | `CGI/1.2` |
//! | `URL_SCHEME` | `http` |
//! | `SERVER_NAME`, `SERVER_PORT` | from the `Host` header |
//! | `CONTENT_TYPE`, `CONTENT_LENGTH` | those headers |
//! | `HTTP_<NAME>` | all other headers |
//!
//! # Errors
//!
//! Whatever is wrong with a request, it fails with [`Error::InvalidRequest`].
//! The precise reason is logged at `debug` level.
//!
//! [`Request`]: struct.Request.html
//! [`Environment`]: struct.Environment.html
//! [`Body`]: struct.Body.html
//! [`server`]: server/index.html
//! [`Error::InvalidRequest`]: enum.Error.html#variant.InvalidRequest

#[macro_use]
extern crate log;

mod body;
mod chunked;
mod error;
mod limit;
mod parser;
mod request;

pub mod env;
pub mod server;

pub(crate) use futures_io::AsyncRead;

pub use body::Body;
pub use env::Environment;
pub use error::Error;
pub use limit::{Limits, DEFAULT_MAX_BODY_IN_MEMORY, DEFAULT_MAX_HEADER_SIZE};
pub use parser::State;
pub use request::Request;

pub(crate) fn invalid<T>(reason: &str) -> Result<T, Error> {
    debug!("Invalid request: {}", reason);
    Err(Error::InvalidRequest)
}
