//! Reading requests off an async transport.
//!
//! The parser itself only ever consumes bytes it is given. This module is a thin
//! loop around it for servers that have some `AsyncRead` (a TCP stream, a TLS
//! stream) and want whole requests out of it.
//!
//! # Example
//!
//! ```rust, no_run
//! use h1_cgi::server;
//! use std::error::Error;
//! use async_std::net::TcpListener;
//!
//! #[async_std::main]
//! async fn main() -> Result<(), Box<dyn Error>> {
//!     let listener = TcpListener::bind("127.0.0.1:3000").await?;
//!
//!     loop {
//!         let (socket, _peer_addr) = listener.accept().await?;
//!
//!         async_std::task::spawn(async move {
//!             let mut conn = server::handshake(socket);
//!
//!             // Requests from this socket, one by one.
//!             while let Some(request) = conn.accept().await {
//!                 match request {
//!                     Ok(req) => println!("Receive request: {:?}", req.env()),
//!                     // A response of 400 would go here, the connection is done.
//!                     Err(e) => println!("Bad request: {}", e),
//!                 }
//!             }
//!         });
//!     }
//! }
//! ```

use crate::limit::Limits;
use crate::parser::State;
use crate::AsyncRead;
use crate::Error;
use crate::Request;
use futures_util::io::AsyncReadExt;
use std::fmt;

/// Size of buffer reading from the transport.
const READ_BUF_INIT_SIZE: usize = 16_384;

/// "handshake" to start reading requests from a connection.
///
/// There is no handshake in HTTP/1.1, the name is kept congruent with other
/// HTTP server APIs.
pub fn handshake<S>(io: S) -> Connection<S>
where
    S: AsyncRead + Unpin,
{
    Connection::with_limits(io, Limits::default())
}

/// Reads one request after the other from a transport.
///
/// Bytes read past the end of one request are kept for the next.
pub struct Connection<S> {
    io: S,
    limits: Limits,
    read_buf: Vec<u8>,
    /// Bytes read past the end of the previous request.
    pending: Vec<u8>,
    closed: bool,
}

impl<S> Connection<S>
where
    S: AsyncRead + Unpin,
{
    /// Read requests from `io`, each one parsed with `limits`.
    pub fn with_limits(io: S, limits: Limits) -> Self {
        Connection {
            io,
            limits,
            read_buf: vec![0; READ_BUF_INIT_SIZE],
            pending: vec![],
            closed: false,
        }
    }

    /// Read the next complete request.
    ///
    /// Returns `None` when the peer closes the connection between requests, or
    /// after a request that doesn't allow the connection to be reused. Any error
    /// also ends the connection, since there is no telling where the next
    /// request would start.
    pub async fn accept(&mut self) -> Option<Result<Request, Error>> {
        if self.closed {
            return None;
        }

        let ret = self.read_request().await;

        match &ret {
            Some(Ok(req)) => {
                if !req.persistent() {
                    trace!("Request doesn't allow reuse of connection");
                    self.closed = true;
                }
            }
            Some(Err(_)) | None => {
                self.closed = true;
            }
        }

        ret
    }

    async fn read_request(&mut self) -> Option<Result<Request, Error>> {
        let mut req = Request::with_limits(self.limits);

        if !self.pending.is_empty() {
            let pending = std::mem::replace(&mut self.pending, vec![]);
            match req.consume(&pending) {
                Ok(amount) => {
                    if req.is_finished() {
                        self.pending = pending[amount..].to_vec();
                        return Some(Ok(req));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }

        loop {
            let amount = match self.io.read(&mut self.read_buf).await {
                Ok(v) => v,
                Err(e) => return Some(Err(e.into())),
            };

            if amount == 0 {
                if req.state() == State::Start {
                    trace!("Connection closed");
                    return None;
                }
                return Some(req.finish().map(|_| req));
            }

            match req.consume(&self.read_buf[..amount]) {
                Ok(used) => {
                    if req.is_finished() {
                        self.pending.extend_from_slice(&self.read_buf[used..amount]);
                        return Some(Ok(req));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Bytes read from the transport past the last returned request.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// The underlying transport. Any pending bytes are lost.
    pub fn into_inner(self) -> S {
        self.io
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("pending", &self.pending.len())
            .field("closed", &self.closed)
            .finish()
    }
}
