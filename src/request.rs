//! The public entry point, a request fed incrementally with bytes.

use crate::body::Body;
use crate::env::{self, Environment};
use crate::limit::{allow_reuse, LimitRead, Limits};
use crate::parser::{Parser, State};
use crate::Error;
use std::fmt;

/// A single HTTP/1.x request being parsed.
///
/// Bytes are pushed in with [`parse`] as they arrive, in chunks of any size. The
/// request keeps all intermediate state itself, so splitting the input differently
/// never changes the outcome.
///
/// ```
/// use h1_cgi::Request;
///
/// let mut req = Request::new();
///
/// assert!(!req.parse(b"POST /postit HTTP/1.1\r\nHost: localhost:3000\r\n").unwrap());
/// assert!(!req.parse(b"Content-Length: 9\r\n\r\nvery ").unwrap());
/// assert!(req.parse(b"cool").unwrap());
///
/// assert_eq!(req.env().get("SERVER_PORT"), Some("3000"));
/// assert_eq!(req.body_mut().read_all().unwrap(), b"very cool");
/// ```
///
/// Once a request fails it stays failed. The environment and body of a failed
/// request are emptied.
///
/// [`parse`]: struct.Request.html#method.parse
pub struct Request {
    limits: Limits,
    parser: Parser,
    env: Environment,
    body: Body,
    limit: LimitRead,
}

impl Request {
    /// Create a request with default [`Limits`].
    ///
    /// [`Limits`]: struct.Limits.html
    pub fn new() -> Self {
        Request::with_limits(Limits::default())
    }

    /// Create a request enforcing the given limits.
    pub fn with_limits(limits: Limits) -> Self {
        Request {
            limits,
            parser: Parser::new(limits),
            env: Environment::new(),
            body: Body::new(),
            limit: LimitRead::NoBody,
        }
    }

    /// Feed the next chunk of bytes.
    ///
    /// Returns `true` when the request is complete. Calling again after that is a
    /// no-op that keeps returning `true`. Bytes past the end of the request are
    /// ignored, use [`consume`] to keep them for a following pipelined request.
    ///
    /// Any error is terminal. Further calls return `Error::InvalidRequest` without
    /// looking at the input.
    ///
    /// [`consume`]: struct.Request.html#method.consume
    pub fn parse(&mut self, data: &[u8]) -> Result<bool, Error> {
        self.consume(data)?;
        Ok(self.is_finished())
    }

    /// Feed the next chunk of bytes, returning how many of them belong to this request.
    ///
    /// The returned amount is only ever less than `data.len()` when the request
    /// is finished.
    pub fn consume(&mut self, data: &[u8]) -> Result<usize, Error> {
        match self.parser.state() {
            State::Done => return Ok(0),
            State::Error => return Err(Error::InvalidRequest),
            _ => {}
        }

        trace!("consume {} bytes in state {:?}", data.len(), self.parser.state());

        match self.drive(data) {
            Ok(amount) => Ok(amount),
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }

    /// Tell the request the byte stream has ended.
    ///
    /// A request that is not complete at this point is truncated, which fails it.
    pub fn finish(&mut self) -> Result<(), Error> {
        match self.parser.state() {
            State::Done => Ok(()),
            State::Error => Err(Error::InvalidRequest),
            state => {
                debug!("Stream ended in state {:?}", state);
                self.fail();
                Err(Error::InvalidRequest)
            }
        }
    }

    fn drive(&mut self, data: &[u8]) -> Result<usize, Error> {
        let mut pos = 0;

        if self.parser.state() != State::Body {
            pos = self.parser.advance(data, &mut self.env)?;

            if self.parser.state() != State::HeaderEnd {
                return Ok(pos);
            }

            self.env.finish_head();
            self.parser.release();
            self.limit = LimitRead::from_env(&self.env, &self.limits)?;

            trace!(
                "Header section done ({} bytes): {:?}",
                self.parser.header_size(),
                self.limit
            );

            if self.limit.is_complete() {
                self.complete()?;
                return Ok(pos);
            }

            if let Some(size) = self.limit.body_size() {
                self.body.reserve(size, self.limits.max_body_in_memory);
            }
            self.parser.set_state(State::Body);
        }

        pos += self
            .limit
            .read_into(&data[pos..], &mut self.body, &self.limits)?;

        if self.limit.is_complete() {
            self.complete()?;
        }

        Ok(pos)
    }

    fn complete(&mut self) -> Result<(), Error> {
        self.body.rewind()?;
        self.parser.set_state(State::Done);
        trace!("Request done, body: {:?}", self.body);
        Ok(())
    }

    fn fail(&mut self) {
        self.parser.set_state(State::Error);
        self.parser.release();
        self.env.clear();
        // drops any temporary file.
        self.body = Body::new();
    }

    /// Current parser state.
    pub fn state(&self) -> State {
        self.parser.state()
    }

    /// Tells if the request (header section and body) is completely parsed.
    pub fn is_finished(&self) -> bool {
        self.parser.state() == State::Done
    }

    /// Tells if the request has been rejected.
    pub fn is_failed(&self) -> bool {
        self.parser.state() == State::Error
    }

    /// Tells if the header section is parsed. The body might still be incomplete.
    pub fn is_head_done(&self) -> bool {
        matches!(self.parser.state(), State::Body | State::Done)
    }

    /// The environment. Only complete once the header section is parsed.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The body. Only complete once the request is finished.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The body, mutable for reading.
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Split into environment and body.
    pub fn into_parts(self) -> (Environment, Body) {
        (self.env, self.body)
    }

    /// The declared `content-length`, if the body is framed by one.
    pub fn content_length(&self) -> Option<u64> {
        self.limit.body_size()
    }

    /// Tells if the body uses `transfer-encoding: chunked`.
    pub fn is_chunked(&self) -> bool {
        self.limit.is_chunked()
    }

    /// Whether the connection can be reused for another request after this one.
    ///
    /// HTTP/1.1 is persistent unless `connection: close`. HTTP/1.0 only with
    /// `connection: keep-alive`.
    pub fn persistent(&self) -> bool {
        self.is_head_done() && allow_reuse(&self.env)
    }

    /// Build an `http::Request` from the parsed header section.
    ///
    /// Header names are restored from the environment keys, lowercased with `_`
    /// turned back into `-`.
    pub fn to_http_request(&self) -> Result<http::Request<()>, Error> {
        if !self.is_head_done() {
            return Err(Error::InvalidRequest);
        }

        let get = |key: &str| self.env.get(key).unwrap_or("");

        let mut bld = http::Request::builder()
            .method(get(env::REQUEST_METHOD))
            .uri(get(env::REQUEST_URI))
            .version(version_of(get(env::SERVER_PROTOCOL)));

        for (key, value) in &self.env {
            let name = if key == env::CONTENT_TYPE || key == env::CONTENT_LENGTH {
                key
            } else if key.starts_with("HTTP_") && key != env::HTTP_VERSION {
                &key[5..]
            } else {
                continue;
            };

            let name = name.replace('_', "-").to_ascii_lowercase();
            let name = http::header::HeaderName::from_bytes(name.as_bytes());
            let value = http::header::HeaderValue::from_str(value);
            match (name, value) {
                (Ok(name), Ok(value)) => bld = bld.header(name, value),
                (Err(e), _) => {
                    debug!("Dropping bad header name: {}", e);
                }
                (Ok(name), Err(e)) => {
                    debug!("Dropping bad header value ({}): {}", name, e);
                }
            }
        }

        Ok(bld.body(())?)
    }
}

fn version_of(v: &str) -> http::Version {
    match v {
        "HTTP/0.9" => http::Version::HTTP_09,
        "HTTP/1.0" => http::Version::HTTP_10,
        _ if v.starts_with("HTTP/2") => http::Version::HTTP_2,
        _ if v.starts_with("HTTP/3") => http::Version::HTTP_3,
        _ => http::Version::HTTP_11,
    }
}

impl Default for Request {
    fn default() -> Self {
        Request::new()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Request")
            .field("state", &self.parser.state())
            .field("limit", &self.limit)
            .field("env", &self.env)
            .field("body", &self.body)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_mapping() {
        assert_eq!(version_of("HTTP/1.0"), http::Version::HTTP_10);
        assert_eq!(version_of("HTTP/1.1"), http::Version::HTTP_11);
        assert_eq!(version_of("HTTP/2.0"), http::Version::HTTP_2);
    }

    #[test]
    fn consume_reports_pipelined_bytes() {
        let mut req = Request::new();
        let input = b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nokGET / HTTP/1.1\r\n\r\n";
        let used = req.consume(input).unwrap();
        assert_eq!(used, input.len() - 18);
        assert!(req.is_finished());
        assert_eq!(req.consume(b"more").unwrap(), 0);
    }

    #[test]
    fn failed_request_is_emptied() {
        let mut req = Request::new();
        assert!(!req.parse(b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\n").unwrap());
        assert!(!req.env().is_empty());
        assert!(req.finish().is_err());
        assert!(req.is_failed());
        assert!(req.env().is_empty());
        assert!(req.parse(b"ok").unwrap_err().is_invalid_request());
    }
}
