//! Decoder for `transfer-encoding: chunked` request bodies.

use crate::limit::HeaderGuard;
use crate::{invalid, Error};

/// Max length of a chunk size line, extensions included.
const MAX_CHUNK_SIZE_LINE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Hex digits of the chunk size.
    Size,
    /// `;` seen, skipping chunk extensions.
    Extension,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    /// Start of a trailer line, or the final empty line.
    Trailer,
    TrailerLine,
    TrailerLf,
    EndLf,
    End,
}

/// Byte-wise decoder of a chunked body.
///
/// Trailer fields are validated for size but otherwise discarded.
pub(crate) struct ChunkedDecoder {
    state: State,
    size: u64,
    line_len: usize,
    trailers: HeaderGuard,
}

impl ChunkedDecoder {
    pub fn new(max_trailer_size: usize) -> Self {
        ChunkedDecoder {
            state: State::Size,
            size: 0,
            line_len: 0,
            trailers: HeaderGuard::new(max_trailer_size),
        }
    }

    pub fn is_end(&self) -> bool {
        self.state == State::End
    }

    /// Decode as much of `data` as possible, handing body bytes to `out`.
    ///
    /// Returns the number of bytes of `data` used. This is less than `data.len()`
    /// only when the end of the body has been reached.
    pub fn decode<F>(&mut self, data: &[u8], mut out: F) -> Result<usize, Error>
    where
        F: FnMut(&[u8]) -> Result<(), Error>,
    {
        let mut pos = 0;

        while pos < data.len() {
            if self.state == State::End {
                break;
            }

            if self.state == State::Data {
                let left = data.len() - pos;
                let amount = (left as u64).min(self.size) as usize;

                out(&data[pos..(pos + amount)])?;

                pos += amount;
                self.size -= amount as u64;

                if self.size == 0 {
                    self.state = State::DataCr;
                }
                continue;
            }

            self.step(data[pos])?;
            pos += 1;
        }

        Ok(pos)
    }

    fn step(&mut self, b: u8) -> Result<(), Error> {
        match self.state {
            State::Size | State::Extension => {
                self.line_len += 1;
                if self.line_len > MAX_CHUNK_SIZE_LINE {
                    return invalid("chunk size line too long");
                }

                if self.state == State::Size {
                    if let Some(d) = hex_value(b) {
                        self.size = match self.size.checked_mul(16) {
                            Some(v) => v + d as u64,
                            None => return invalid("chunk size overflow"),
                        };
                        return Ok(());
                    }
                    // at least one digit before anything else.
                    if self.line_len == 1 {
                        debug!("Unexpected char in chunk size: {:?}", b as char);
                        return invalid("bad chunk size");
                    }
                }

                match b {
                    b';' => self.state = State::Extension,
                    b'\r' => self.state = State::SizeLf,
                    b'\t' | b' '..=b'~' | 0x80..=0xff if self.state == State::Extension => {}
                    _ => {
                        debug!("Unexpected char in chunk size: {:?}", b as char);
                        return invalid("bad chunk size");
                    }
                }
            }

            State::SizeLf => {
                expect_lf(b)?;
                self.line_len = 0;
                self.state = if self.size == 0 {
                    State::Trailer
                } else {
                    State::Data
                };
            }

            State::DataCr => {
                if b != b'\r' {
                    return invalid("chunk data longer than chunk size");
                }
                self.state = State::DataLf;
            }

            State::DataLf => {
                expect_lf(b)?;
                self.state = State::Size;
            }

            State::Trailer | State::TrailerLine => {
                self.trailers.accept()?;
                match b {
                    b'\r' if self.state == State::Trailer => self.state = State::EndLf,
                    b'\r' => self.state = State::TrailerLf,
                    b'\t' | b' '..=b'~' | 0x80..=0xff => self.state = State::TrailerLine,
                    _ => return invalid("bad trailer"),
                }
            }

            State::TrailerLf => {
                self.trailers.accept()?;
                expect_lf(b)?;
                self.state = State::Trailer;
            }

            State::EndLf => {
                self.trailers.accept()?;
                expect_lf(b)?;
                trace!("Chunked body end");
                self.state = State::End;
            }

            State::Data | State::End => unreachable!("Data and End are handled by decode"),
        }

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

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
