//! Byte-wise state machine for the request line and header fields.
//!
//! The machine never looks ahead or back, every byte is judged on the current
//! state alone. That is what makes arbitrary chunking give the same result as
//! feeding everything at once.

use crate::env::Environment;
use crate::limit::{Field, HeaderGuard, Limits};
use crate::{invalid, Error};

/// Position of the parser in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing consumed yet.
    Start,
    /// Inside the method token.
    Method,
    /// Inside the request uri.
    Uri,
    /// Inside the `HTTP/x.y` version.
    Version,
    /// CR after the version, expecting LF.
    RequestLineLf,
    /// At the start of a header line or inside a header name.
    HeaderName,
    /// After `:`, skipping optional whitespace.
    HeaderValueOws,
    /// Inside a header value.
    HeaderValue,
    /// CR after a header value, expecting LF.
    HeaderLineLf,
    /// CR of the terminating empty line, expecting LF.
    EmptyLineLf,
    /// Header section complete.
    HeaderEnd,
    /// Reading the body.
    Body,
    /// Request complete.
    Done,
    /// Request rejected. Terminal.
    Error,
}

const HTTP_PREFIX: &[u8] = b"HTTP/";

/// Length of `HTTP/x.y`.
const VERSION_LEN: usize = 8;

pub(crate) struct Parser {
    state: State,
    guard: HeaderGuard,
    limits: Limits,
    /// Method, uri, version or header value being assembled.
    token: Vec<u8>,
    /// Header name, kept while the value is assembled.
    name: Vec<u8>,
    query_at: Option<usize>,
    fragment_at: Option<usize>,
}

impl Parser {
    pub fn new(limits: Limits) -> Self {
        Parser {
            state: State::Start,
            guard: HeaderGuard::new(limits.max_header_size),
            limits,
            token: Vec::with_capacity(64),
            name: Vec::with_capacity(32),
            query_at: None,
            fragment_at: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Bytes of header section consumed so far.
    pub fn header_size(&self) -> usize {
        self.guard.consumed()
    }

    /// Release scratch buffers. They are not needed once the header section is read.
    pub fn release(&mut self) {
        self.token = Vec::new();
        self.name = Vec::new();
    }

    /// Feed header section bytes, populating `env`.
    ///
    /// Returns the number of bytes used. It stops short of `data.len()` only
    /// once the state reaches `HeaderEnd`.
    pub fn advance(&mut self, data: &[u8], env: &mut Environment) -> Result<usize, Error> {
        for (i, b) in data.iter().enumerate() {
            if let Err(e) = self.step(*b, env) {
                self.state = State::Error;
                return Err(e);
            }
            if self.state == State::HeaderEnd {
                return Ok(i + 1);
            }
        }
        Ok(data.len())
    }

    #[inline]
    fn step(&mut self, b: u8, env: &mut Environment) -> Result<(), Error> {
        // size first, then buffering.
        self.guard.accept()?;

        match self.state {
            State::Start => {
                if !is_tchar(b) {
                    return invalid("expected method");
                }
                self.token.push(b);
                self.state = State::Method;
            }

            State::Method => {
                if b == b' ' {
                    env.set_method(&self.token);
                    self.token.clear();
                    self.state = State::Uri;
                } else if is_tchar(b) {
                    self.limits.check_field(Field::Method, self.token.len())?;
                    self.token.push(b);
                } else {
                    return invalid("bad char in method");
                }
            }

            State::Uri => self.step_uri(b, env)?,

            State::Version => {
                let i = self.token.len();
                let ok = match i {
                    0..=4 => b == HTTP_PREFIX[i],
                    5 | 7 => b.is_ascii_digit(),
                    6 => b == b'.',
                    _ => b == b'\r',
                };
                if !ok {
                    return invalid("bad http version");
                }
                if i == VERSION_LEN {
                    env.set_version(&self.token);
                    self.token.clear();
                    self.state = State::RequestLineLf;
                } else {
                    self.token.push(b);
                }
            }

            State::RequestLineLf => {
                expect_lf(b)?;
                self.state = State::HeaderName;
            }

            State::HeaderName => {
                if b == b'\r' && self.name.is_empty() {
                    self.state = State::EmptyLineLf;
                } else if b == b':' && !self.name.is_empty() {
                    self.state = State::HeaderValueOws;
                } else if is_tchar(b) {
                    self.limits.check_field(Field::HeaderName, self.name.len())?;
                    self.name.push(b);
                } else {
                    return invalid("bad char in header name");
                }
            }

            State::HeaderValueOws => {
                if b == b' ' || b == b'\t' {
                    // leading whitespace is not part of the value
                } else if b == b'\r' {
                    self.state = State::HeaderLineLf;
                } else if is_value_char(b) {
                    self.token.push(b);
                    self.state = State::HeaderValue;
                } else {
                    return invalid("bad char in header value");
                }
            }

            State::HeaderValue => {
                if b == b'\r' {
                    self.state = State::HeaderLineLf;
                } else if is_value_char(b) {
                    self.limits.check_field(Field::HeaderValue, self.token.len())?;
                    self.token.push(b);
                } else {
                    return invalid("bad char in header value");
                }
            }

            State::HeaderLineLf => {
                expect_lf(b)?;
                while let Some(b' ') | Some(b'\t') = self.token.last() {
                    self.token.pop();
                }
                env.add_header(&self.name, &self.token)?;
                self.name.clear();
                self.token.clear();
                self.state = State::HeaderName;
            }

            State::EmptyLineLf => {
                expect_lf(b)?;
                self.state = State::HeaderEnd;
            }

            State::HeaderEnd | State::Body | State::Done | State::Error => {
                unreachable!("advance() past header section: {:?}", self.state)
            }
        }

        Ok(())
    }

    fn step_uri(&mut self, b: u8, env: &mut Environment) -> Result<(), Error> {
        let len = self.token.len();

        if b == b' ' {
            if len == 0 {
                return invalid("empty request uri");
            }
            env.set_uri(&self.token, self.query_at, self.fragment_at);
            self.token.clear();
            self.state = State::Version;
            return Ok(());
        }

        if !is_uri_char(b) {
            return invalid("bad char in request uri");
        }
        if len == 0 && !(b == b'/' || b == b'*' || b.is_ascii_alphabetic()) {
            return invalid("bad start of request uri");
        }

        self.limits.check_field(Field::RequestUri, len)?;

        // separators start a component, all other bytes count against the one they land in.
        match (self.query_at, self.fragment_at) {
            (_, Some(f)) => self.limits.check_field(Field::Fragment, len - f - 1)?,
            (Some(_), None) if b == b'#' => self.fragment_at = Some(len),
            (Some(q), None) => self.limits.check_field(Field::QueryString, len - q - 1)?,
            (None, None) if b == b'?' => self.query_at = Some(len),
            (None, None) if b == b'#' => self.fragment_at = Some(len),
            (None, None) => self.limits.check_field(Field::RequestPath, len)?,
        }

        self.token.push(b);

        Ok(())
    }
}

#[inline]
fn expect_lf(b: u8) -> Result<(), Error> {
    if b != b'\n' {
        return invalid("expected LF");
    }
    Ok(())
}

/// RFC 7230 `tchar`.
#[inline]
fn is_tchar(b: u8) -> bool {
    match b {
        b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => true,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
        | b'`' | b'|' | b'~' => true,
        _ => false,
    }
}

/// Visible ASCII. Anything else must be percent encoded.
#[inline]
fn is_uri_char(b: u8) -> bool {
    (0x21..=0x7e).contains(&b)
}

/// HTAB, SP, visible ASCII and obs-text.
#[inline]
fn is_value_char(b: u8) -> bool {
    b == b'\t' || b == b' ' || (0x21..=0x7e).contains(&b) || b >= 0x80
}
