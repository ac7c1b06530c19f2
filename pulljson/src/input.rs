// SPDX-License-Identifier: Apache-2.0

//! Byte sources for the reader session.
//!
//! The codec pulls input through the [`Reader`] trait one lookahead byte at
//! a time, so any blocking source works: files, sockets, UARTs, ring
//! buffers. For in-memory documents and for tests, [`ChunkReader`] reads
//! from a byte slice, optionally dribbling it out in fixed-size chunks to
//! exercise streaming behavior.

/// Trait for input sources that can provide data to the reader session.
pub trait Reader {
    /// The error type returned by read operations.
    type Error;

    /// Read data into the provided buffer.
    /// Returns the number of bytes read, or an error.
    ///
    /// # Contract
    /// - A return value of 0 **MUST** indicate true end of stream
    /// - Implementations **MUST NOT** return 0 unless no more data will
    ///   ever be available
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// A [`Reader`] that reads from a byte slice, optionally in fixed-size
/// chunks.
///
/// [`ChunkReader::full_slice`] consumes the slice as fast as the session
/// asks for it, which is the right mode for complete in-memory documents.
/// [`ChunkReader::new`] caps each `read()` at `chunk_size` bytes to
/// simulate network packets or serial reads.
#[derive(Debug)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    chunk_size: usize,
}

impl<'a> ChunkReader<'a> {
    /// Create a chunked reader that returns at most `chunk_size` bytes per
    /// `read()` call (minimum 1), even when more data is available.
    pub fn new(data: &'a [u8], chunk_size: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Create a reader that hands out the entire remaining slice on every
    /// `read()`.
    pub fn full_slice(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            chunk_size: usize::MAX,
        }
    }
}

impl Reader for ChunkReader<'_> {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = self.data.len().saturating_sub(self.pos);
        let to_copy = remaining.min(buf.len()).min(self.chunk_size);
        if to_copy > 0 {
            if let (Some(dst), Some(src)) = (
                buf.get_mut(..to_copy),
                self.data.get(self.pos..self.pos + to_copy),
            ) {
                dst.copy_from_slice(src);
            }
            self.pos += to_copy;
        }
        Ok(to_copy)
    }
}

/// Adapter from [`std::io::Read`] to [`Reader`].
///
/// The session reads one lookahead byte at a time; wrap files and sockets
/// in [`std::io::BufReader`] first.
#[cfg(feature = "std")]
pub struct IoReader<R> {
    inner: R,
}

#[cfg(feature = "std")]
impl<R: std::io::Read> IoReader<R> {
    /// Wrap a `std::io::Read` stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[cfg(feature = "std")]
impl<R: std::io::Read> Reader for IoReader<R> {
    type Error = std::io::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.inner.read(buf)
    }
}
