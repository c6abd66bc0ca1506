//! Request body storage that spills to disk.

use crate::AsyncRead;
use futures_io::AsyncSeek;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Upper bound for preallocating the in-memory buffer from a `content-length`.
const MEM_PREALLOC_MAX: usize = 16_384;

/// The body of a request.
///
/// Small bodies are held in memory. Once the body grows past
/// [`Limits::max_body_in_memory`] it is moved to an anonymous temporary file
/// which is removed when the `Body` is dropped. Reading is the same regardless
/// of where the bytes live.
///
/// After a request is fully parsed the body is positioned at the start.
///
/// [`Limits::max_body_in_memory`]: struct.Limits.html#structfield.max_body_in_memory
pub struct Body {
    inner: Inner,
    len: u64,
}

enum Inner {
    Memory(Cursor<Vec<u8>>),
    File(File),
}

impl Body {
    pub(crate) fn new() -> Self {
        Body {
            inner: Inner::Memory(Cursor::new(Vec::new())),
            len: 0,
        }
    }

    /// Allocate up front for an expected body size.
    pub(crate) fn reserve(&mut self, expected: u64, max_in_memory: usize) {
        if let Inner::Memory(c) = &mut self.inner {
            let amount = expected.min(max_in_memory as u64).min(MEM_PREALLOC_MAX as u64);
            c.get_mut().reserve(amount as usize);
        }
    }

    /// Append body bytes, moving to a temporary file if this append makes
    /// the body bigger than `max_in_memory`.
    ///
    /// The read position is not affected.
    pub(crate) fn append(&mut self, data: &[u8], max_in_memory: usize) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let new_len = self.len + data.len() as u64;

        match &mut self.inner {
            Inner::Memory(c) if new_len <= max_in_memory as u64 => {
                c.get_mut().extend_from_slice(data);
            }

            Inner::Memory(c) => {
                trace!("Body exceeds {} bytes, moving to file", max_in_memory);

                let mut file = tempfile::tempfile()?;
                file.write_all(c.get_ref())?;
                file.write_all(data)?;
                file.seek(SeekFrom::Start(c.position()))?;

                // drops the memory buffer.
                self.inner = Inner::File(file);
            }

            Inner::File(f) => {
                let pos = f.seek(SeekFrom::Current(0))?;
                f.seek(SeekFrom::End(0))?;
                f.write_all(data)?;
                f.seek(SeekFrom::Start(pos))?;
            }
        }

        self.len = new_len;

        Ok(())
    }

    /// Total number of bytes in the body.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Tells if the body has no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tells if the body is held in memory.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.inner, Inner::Memory(_))
    }

    /// Tells if the body has been moved to a temporary file.
    pub fn is_file(&self) -> bool {
        matches!(self.inner, Inner::File(_))
    }

    /// Move the read position back to the start of the body.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Rewind and read the entire body into a `Vec`.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        self.rewind()?;
        let mut v = Vec::with_capacity(self.len as usize);
        self.read_to_end(&mut v)?;
        Ok(v)
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::new()
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Inner::Memory(c) => c.read(buf),
            Inner::File(f) => f.read(buf),
        }
    }
}

impl Seek for Body {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.inner {
            Inner::Memory(c) => c.seek(pos),
            Inner::File(f) => f.seek(pos),
        }
    }
}

// Reads from memory or a local file never return Pending. For the file case
// this does block, the same as any other disk read from an executor thread.
impl AsyncRead for Body {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(self.get_mut().read(buf))
    }
}

impl AsyncSeek for Body {
    fn poll_seek(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        pos: SeekFrom,
    ) -> Poll<io::Result<u64>> {
        Poll::Ready(self.get_mut().seek(pos))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.inner {
            Inner::Memory(_) => write!(f, "Body(memory, {})", self.len),
            Inner::File(_) => write!(f, "Body(file, {})", self.len),
        }
    }
}
