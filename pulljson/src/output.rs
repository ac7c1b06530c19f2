// SPDX-License-Identifier: Apache-2.0

//! Byte sinks for the writer session.

/// Trait for output sinks that accept data from the writer session.
pub trait Writer {
    /// The error type returned by write operations.
    type Error;

    /// Write the whole buffer to the sink, or fail.
    ///
    /// There is no short-write case: an implementation either accepts all
    /// of `buf` or returns an error.
    fn write(&mut self, buf: &[u8]) -> Result<(), Self::Error>;
}

/// A [`Writer`] backed by a caller-provided fixed-capacity slice.
///
/// Fails with `()` once the slice is full; the bytes written so far are
/// retained and visible through [`SliceWriter::as_bytes`].
#[derive(Debug)]
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> SliceWriter<'a> {
    /// Wrap a destination slice.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.get(..self.len).unwrap_or(&[])
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Writer for SliceWriter<'_> {
    type Error = ();

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let end = self.len.checked_add(data.len()).ok_or(())?;
        match self.buf.get_mut(self.len..end) {
            Some(dst) => {
                dst.copy_from_slice(data);
                self.len = end;
                Ok(())
            }
            None => Err(()),
        }
    }
}

/// Adapter from [`std::io::Write`] to [`Writer`].
#[cfg(feature = "std")]
pub struct IoWriter<W> {
    inner: W,
}

#[cfg(feature = "std")]
impl<W: std::io::Write> IoWriter<W> {
    /// Wrap a `std::io::Write` stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<W: std::io::Write> Writer for IoWriter<W> {
    type Error = std::io::Error;

    fn write(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(buf)
    }
}
