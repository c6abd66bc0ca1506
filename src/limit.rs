use crate::body::Body;
use crate::chunked::ChunkedDecoder;
use crate::env::{Environment, CONTENT_LENGTH};
use crate::{invalid, Error};
use std::fmt;

// Defaults follow the long standing mongrel family of parsers. Request headers
// today are rarely above a few KB, so these only stop abuse.

/// Default max size of the entire header section (request line, headers and the empty line).
pub const DEFAULT_MAX_HEADER_SIZE: usize = 1024 * (80 + 32);

/// Default max body size kept in memory before moving it to a temporary file.
pub const DEFAULT_MAX_BODY_IN_MEMORY: usize = 1024 * (80 + 32);

/// Size ceilings enforced while parsing.
///
/// All header ceilings are checked byte by byte as data is fed, so an unterminated
/// line can never grow beyond its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Max bytes for the header section, including the terminating empty line.
    pub max_header_size: usize,
    /// Max body bytes held in memory. Anything bigger goes to a temporary file.
    pub max_body_in_memory: usize,
    /// Max body size, if any. Checked against `content-length` up front, and
    /// against decoded bytes for chunked bodies.
    pub max_body_size: Option<u64>,
    /// Max length of the request method.
    pub max_method: usize,
    /// Max length of the raw request uri (including any fragment).
    pub max_request_uri: usize,
    /// Max length of the path component.
    pub max_request_path: usize,
    /// Max length of the query component.
    pub max_query_string: usize,
    /// Max length of the fragment component.
    pub max_fragment: usize,
    /// Max length of a single header name.
    pub max_header_name: usize,
    /// Max length of a single header value.
    pub max_header_value: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_body_in_memory: DEFAULT_MAX_BODY_IN_MEMORY,
            max_body_size: None,
            max_method: 20,
            max_request_uri: 1024 * 12,
            max_request_path: 1024,
            max_query_string: 1024 * 10,
            max_fragment: 1024,
            max_header_name: 256,
            max_header_value: 80 * 1024,
        }
    }
}

/// The individually capped pieces of a header section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Method,
    RequestUri,
    RequestPath,
    QueryString,
    Fragment,
    HeaderName,
    HeaderValue,
}

impl Limits {
    pub(crate) fn max_of(&self, field: Field) -> usize {
        match field {
            Field::Method => self.max_method,
            Field::RequestUri => self.max_request_uri,
            Field::RequestPath => self.max_request_path,
            Field::QueryString => self.max_query_string,
            Field::Fragment => self.max_fragment,
            Field::HeaderName => self.max_header_name,
            Field::HeaderValue => self.max_header_value,
        }
    }

    /// Check that a field of `len` bytes is allowed to grow by one more byte.
    #[inline]
    pub(crate) fn check_field(&self, field: Field, len: usize) -> Result<(), Error> {
        if len >= self.max_of(field) {
            debug!("{:?} longer than {} bytes", field, self.max_of(field));
            return invalid("field too long");
        }
        Ok(())
    }
}

/// Counts bytes of a header section against its ceiling.
#[derive(Debug)]
pub(crate) struct HeaderGuard {
    consumed: usize,
    max: usize,
}

impl HeaderGuard {
    pub fn new(max: usize) -> Self {
        HeaderGuard { consumed: 0, max }
    }

    /// Account for one more byte. Must be called before the byte is buffered.
    #[inline(always)]
    pub fn accept(&mut self) -> Result<(), Error> {
        if self.consumed == self.max {
            debug!("Header section longer than {} bytes", self.max);
            return invalid("header section too long");
        }
        self.consumed += 1;
        Ok(())
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

/// Limit reading body data given configuration from request headers.
pub(crate) enum LimitRead {
    /// Read from a chunked decoder. The decoder will know when there is no more
    /// data to be read.
    ChunkedDecoder(ChunkedDecoder),
    /// Body data is limited by a `content-length` header.
    ContentLength(ContentLengthRead),
    /// No expected body.
    NoBody,
}

impl LimitRead {
    /// Create an instance from the headers collected in the environment.
    ///
    /// 1. If header `transfer-encoding` is present, the final coding must be `chunked`.
    /// 2. If header `content-length: <number>` use a reader limited by length
    /// 3. Otherwise consider there being no body.
    ///
    /// A request carrying both headers is refused rather than letting one override
    /// the other. Proxies disagreeing on which one wins is how requests get smuggled.
    pub fn from_env(env: &Environment, limits: &Limits) -> Result<Self, Error> {
        let te = env.get("HTTP_TRANSFER_ENCODING");
        let clen = env.get(CONTENT_LENGTH);

        let ret = match (te, clen) {
            (Some(_), Some(_)) => return invalid("both transfer-encoding and content-length"),

            (Some(te), None) => {
                let last = te.rsplit(',').next().map(|s| s.trim()).unwrap_or("");
                if !last.eq_ignore_ascii_case("chunked") {
                    debug!("Unsupported transfer-encoding: {}", te);
                    return invalid("unsupported transfer-encoding");
                }
                LimitRead::ChunkedDecoder(ChunkedDecoder::new(limits.max_header_size))
            }

            (None, Some(clen)) => {
                let size = parse_content_length(clen)?;
                if let Some(max) = limits.max_body_size {
                    if size > max {
                        debug!("Content-Length {} above max body size {}", size, max);
                        return invalid("body too large");
                    }
                }
                if size == 0 {
                    LimitRead::NoBody
                } else {
                    LimitRead::ContentLength(ContentLengthRead::new(size))
                }
            }

            (None, None) => LimitRead::NoBody,
        };

        trace!("LimitRead from headers: {:?}", ret);

        Ok(ret)
    }

    pub fn is_complete(&self) -> bool {
        match self {
            LimitRead::ChunkedDecoder(v) => v.is_end(),
            LimitRead::ContentLength(v) => v.is_end(),
            LimitRead::NoBody => true,
        }
    }

    pub fn body_size(&self) -> Option<u64> {
        if let LimitRead::ContentLength(v) = self {
            return Some(v.limit);
        }
        None
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, LimitRead::ChunkedDecoder(_))
    }

    /// Feed bytes following the header section into `body`.
    ///
    /// Returns how many bytes of `data` belong to the body. Anything after that
    /// is the start of the next request.
    pub fn read_into(
        &mut self,
        data: &[u8],
        body: &mut Body,
        limits: &Limits,
    ) -> Result<usize, Error> {
        match self {
            LimitRead::ChunkedDecoder(v) => v.decode(data, |chunk| {
                if let Some(max) = limits.max_body_size {
                    if body.len() + chunk.len() as u64 > max {
                        debug!("Chunked body above max body size {}", max);
                        return invalid("body too large");
                    }
                }
                body.append(chunk, limits.max_body_in_memory)?;
                Ok(())
            }),
            LimitRead::ContentLength(v) => v.read_into(data, body, limits),
            LimitRead::NoBody => Ok(0),
        }
    }
}

/// Reader limited by a set length.
#[derive(Debug)]
pub(crate) struct ContentLengthRead {
    limit: u64,
    total: u64,
}

impl ContentLengthRead {
    fn new(limit: u64) -> Self {
        ContentLengthRead { limit, total: 0 }
    }

    fn is_end(&self) -> bool {
        self.total == self.limit
    }

    fn read_into(
        &mut self,
        data: &[u8],
        body: &mut Body,
        limits: &Limits,
    ) -> Result<usize, Error> {
        let left = self.limit - self.total;

        let amount = (data.len() as u64).min(left) as usize;

        if amount == 0 {
            return Ok(0);
        }

        body.append(&data[..amount], limits.max_body_in_memory)?;
        self.total += amount as u64;

        Ok(amount)
    }
}

impl fmt::Debug for LimitRead {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            LimitRead::ChunkedDecoder(_) => write!(f, "ChunkedDecoder")?,
            LimitRead::ContentLength(l) => write!(f, "ContentLength({})", l.limit)?,
            LimitRead::NoBody => write!(f, "NoBody")?,
        }
        Ok(())
    }
}

/// Strict `1*DIGIT`. No sign, no whitespace, no hex.
fn parse_content_length(v: &str) -> Result<u64, Error> {
    if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
        debug!("Bad content-length: {:?}", v);
        return invalid("bad content-length");
    }
    match v.parse() {
        Ok(n) => Ok(n),
        Err(_) => invalid("content-length overflow"),
    }
}

pub(crate) fn allow_reuse(env: &Environment) -> bool {
    let http11 = env.get(crate::env::SERVER_PROTOCOL) == Some("HTTP/1.1");
    is_keep_alive(env, http11)
}

fn is_keep_alive(env: &Environment, default: bool) -> bool {
    env.get("HTTP_CONNECTION")
        .and_then(|h| {
            let mut ret = None;
            for token in h.split(',').map(|t| t.trim()) {
                if token.eq_ignore_ascii_case("close") {
                    return Some(false);
                } else if token.eq_ignore_ascii_case("keep-alive") {
                    ret = Some(true);
                }
            }
            ret
        })
        .unwrap_or(default)
}
