use std::fmt;
use std::io;

/// Possible errors from this crate.
#[derive(Debug)]
pub enum Error {
    /// The bytes fed to the parser are not a valid (or acceptably sized) HTTP/1.x request.
    ///
    /// This is terminal for the request. The reason is logged at `debug` level, but
    /// deliberately not carried in the error since a caller can only tear down the
    /// connection or answer with a `400`.
    InvalidRequest,
    /// A wrapped std::io::Error from the body's temporary file or the underlying transport.
    Io(io::Error),
    /// Http errors from the `http` crate.
    Http(http::Error),
}

impl Error {
    /// Tells if this is the parse failure, as opposed to an I/O problem.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Error::InvalidRequest)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidRequest => write!(f, "Invalid request"),
            Error::Io(v) => fmt::Display::fmt(v, f),
            Error::Http(v) => write!(f, "http api: {}", v),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidRequest => None,
            Error::Io(v) => Some(v),
            Error::Http(v) => Some(v),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::Http(e)
    }
}
