// SPDX-License-Identifier: Apache-2.0

//! The pull-reader: session, nested contexts, and typed extraction.
//!
//! A [`JsonReader`] owns the stream and is itself the root read position.
//! Opening a container yields an [`ObjectReader`] or [`ArrayReader`] that
//! mutably borrows the session, so the borrow checker enforces the stack
//! discipline: a parent cannot be advanced while a child is live. The one
//! misuse the borrow checker cannot see, dropping a child before its
//! closing bracket, is caught by a depth check on the next parent
//! operation.
//!
//! Iteration protocol: `next_key`/`next_element` return `Ok(None)` once
//! the closing bracket is reached, and keep returning it. A typed read
//! against a `null` consumes the literal and reports [`Error::Null`]; a
//! read against the wrong non-null type reports [`Error::TypeMismatch`]
//! and leaves the value pending.

use log::trace;

use crate::error::{Error, UnexpectedState};
use crate::escape::{self, StringDecodeState};
use crate::input::Reader;
use crate::number;
use crate::scanner::Scanner;
use crate::shared::{StrRead, ValueType, DEFAULT_MAX_DEPTH};

/// Session state shared by the root and every nested context.
pub(crate) struct ReaderCore<R: Reader> {
    scanner: Scanner<R>,
    depth: usize,
    max_depth: usize,
    suspended: Option<StringDecodeState>,
}

impl<R: Reader> ReaderCore<R> {
    fn peek_value_type(&mut self) -> Result<ValueType, Error> {
        self.scanner.peek_value_type()
    }

    fn consume_null(&mut self) -> Result<(), Error> {
        self.scanner.consume_literal(b"null")
    }

    /// Consume the opening bracket of the expected container kind, or the
    /// `null` literal (reported as `Error::Null`).
    fn open_container(&mut self, want: ValueType) -> Result<(), Error> {
        match self.peek_value_type()? {
            ValueType::Null => {
                self.consume_null()?;
                Err(Error::Null)
            }
            t if t == want => {
                if self.depth >= self.max_depth {
                    return Err(Error::MaxDepthExceeded);
                }
                self.scanner.bump();
                self.depth += 1;
                trace!("open container, depth {}", self.depth);
                Ok(())
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    fn read_null_value(&mut self) -> Result<(), Error> {
        match self.peek_value_type()? {
            ValueType::Null => self.consume_null(),
            _ => Err(Error::TypeMismatch),
        }
    }

    fn read_bool_value(&mut self) -> Result<bool, Error> {
        match self.peek_value_type()? {
            ValueType::Null => {
                self.consume_null()?;
                Err(Error::Null)
            }
            ValueType::True => {
                self.scanner.consume_literal(b"true")?;
                Ok(true)
            }
            ValueType::False => {
                self.scanner.consume_literal(b"false")?;
                Ok(false)
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    /// Scan the pending number token and convert it with `convert`.
    fn read_number_value<T>(
        &mut self,
        convert: fn(&[u8]) -> Result<T, Error>,
    ) -> Result<T, Error> {
        match self.peek_value_type()? {
            ValueType::Null => {
                self.consume_null()?;
                Err(Error::Null)
            }
            ValueType::Number => {
                let mut token = [0u8; number::TOKEN_MAX];
                let len = self.scanner.scan_number(&mut token)?;
                convert(token.get(..len).unwrap_or(&[]))
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    fn read_string_value(&mut self, out: &mut [u8]) -> Result<(usize, bool), Error> {
        match self.peek_value_type()? {
            ValueType::Null => {
                self.consume_null()?;
                Err(Error::Null)
            }
            ValueType::String => {
                self.scanner.bump(); // opening quote
                let mut state = StringDecodeState::new();
                let (written, complete) = escape::decode_chunk(&mut self.scanner, &mut state, out)?;
                if !complete {
                    trace!("string read suspended after {written} bytes");
                    self.suspended = Some(state);
                }
                Ok((written, complete))
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    fn resume_string_value(&mut self, out: &mut [u8]) -> Result<(usize, bool), Error> {
        let mut state = self
            .suspended
            .take()
            .ok_or(UnexpectedState::NoSuspendedRead)?;
        let (written, complete) = escape::decode_chunk(&mut self.scanner, &mut state, out)?;
        if !complete {
            self.suspended = Some(state);
        } else {
            trace!("string read resumed to completion");
        }
        Ok((written, complete))
    }

    /// Discard one whole value of any shape. Iterative, with an explicit
    /// balance counter so nesting cost never lands on the call stack.
    fn skip_value_inner(&mut self) -> Result<(), Error> {
        match self.peek_value_type()? {
            ValueType::Null => self.consume_null(),
            ValueType::True => self.scanner.consume_literal(b"true"),
            ValueType::False => self.scanner.consume_literal(b"false"),
            ValueType::Number => self.scanner.skip_number(),
            ValueType::String => {
                self.scanner.bump();
                self.scanner.skip_string()
            }
            ValueType::Object | ValueType::Array => {
                self.scanner.bump();
                self.skip_balanced(1)
            }
        }
    }

    /// Consume tokens until `balance` open brackets have been closed.
    /// Token-level: commas and colons are stepped over, strings are
    /// skipped raw, and only bracket balance is tracked.
    fn skip_balanced(&mut self, mut balance: usize) -> Result<(), Error> {
        loop {
            self.scanner.skip_whitespace()?;
            match self.scanner.peek_byte()? {
                b'{' | b'[' => {
                    if self.depth + balance >= self.max_depth {
                        return Err(Error::MaxDepthExceeded);
                    }
                    self.scanner.bump();
                    balance += 1;
                }
                b'}' | b']' => {
                    self.scanner.bump();
                    balance -= 1;
                    if balance == 0 {
                        return Ok(());
                    }
                }
                b',' | b':' => self.scanner.bump(),
                b'"' => {
                    self.scanner.bump();
                    self.scanner.skip_string()?;
                }
                b't' => self.scanner.consume_literal(b"true")?,
                b'f' => self.scanner.consume_literal(b"false")?,
                b'n' => self.scanner.consume_literal(b"null")?,
                b'-' | b'0'..=b'9' => self.scanner.skip_number()?,
                _ => return Err(Error::Malformed),
            }
        }
    }
}

/// The root read session. Owns the stream and the lookahead, and is the
/// read position for the document's single root value.
pub struct JsonReader<R: Reader> {
    core: ReaderCore<R>,
}

impl<R: Reader> JsonReader<R> {
    /// Create a session over `input` with the default nesting limit.
    pub fn new(input: R) -> Self {
        Self::with_max_depth(input, DEFAULT_MAX_DEPTH)
    }

    /// Create a session with an explicit container nesting limit.
    pub fn with_max_depth(input: R, max_depth: usize) -> Self {
        JsonReader {
            core: ReaderCore {
                scanner: Scanner::new(input),
                depth: 0,
                max_depth,
                suspended: None,
            },
        }
    }

    /// Byte offset of the read cursor, for diagnostics.
    pub fn position(&self) -> usize {
        self.core.scanner.position()
    }

    /// Release the session and recover the input stream.
    pub fn into_inner(self) -> R {
        self.core.scanner.into_inner()
    }

    fn guard(&mut self) -> Result<(), Error> {
        if self.core.suspended.is_some() {
            return Err(UnexpectedState::SuspendedRead.into());
        }
        if self.core.depth != 0 {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        Ok(())
    }

    fn guard_resume(&mut self) -> Result<(), Error> {
        if self.core.depth != 0 {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        Ok(())
    }

    fn want_value(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn value_done(&mut self) {}

    fn core_mut(&mut self) -> &mut ReaderCore<R> {
        &mut self.core
    }
}

/// Reading position inside a JSON object. Obtained from
/// [`ValueRead::open_object`]; alternates `next_key` and one value
/// operation until `next_key` returns `Ok(None)`.
pub struct ObjectReader<'p, R: Reader> {
    core: &'p mut ReaderCore<R>,
    level: usize,
    value_pending: bool,
    exhausted: bool,
    first: bool,
}

impl<'p, R: Reader> ObjectReader<'p, R> {
    fn new(core: &'p mut ReaderCore<R>) -> Self {
        let level = core.depth;
        ObjectReader {
            core,
            level,
            value_pending: false,
            exhausted: false,
            first: true,
        }
    }

    /// Advance to the next member: decode its key into `key_buf` and peek
    /// the type of its value. Returns `Ok(None)` at the closing brace,
    /// repeatedly if called again.
    ///
    /// Keys do not take part in the suspend/resume protocol; a key longer
    /// than `key_buf` fails with [`Error::BufferFull`].
    pub fn next_key<'k>(
        &mut self,
        key_buf: &'k mut [u8],
    ) -> Result<Option<(&'k str, ValueType)>, Error> {
        self.guard_advance()?;
        if self.exhausted {
            return Ok(None);
        }
        if self.value_pending {
            return Err(UnexpectedState::UnreadValue.into());
        }

        self.core.scanner.skip_whitespace()?;
        match self.core.scanner.peek_byte()? {
            b'}' => {
                self.core.scanner.bump();
                self.finish_container();
                return Ok(None);
            }
            b',' if !self.first => {
                self.core.scanner.bump();
                self.core.scanner.skip_whitespace()?;
            }
            b'"' if self.first => {}
            _ => return Err(Error::Malformed),
        }
        self.first = false;

        if self.core.scanner.peek_byte()? != b'"' {
            return Err(Error::Malformed);
        }
        self.core.scanner.bump();
        let len = escape::decode_single(&mut self.core.scanner, key_buf)?;
        let key = core::str::from_utf8(key_buf.get(..len).unwrap_or(&[]))?;

        self.core.scanner.expect(b':')?;
        let value_type = self.core.peek_value_type()?;
        self.value_pending = true;
        Ok(Some((key, value_type)))
    }

    /// Skip everything left in this object, including a pending value,
    /// and exhaust it so the parent can be advanced again.
    pub fn finish(self) -> Result<(), Error> {
        let ObjectReader {
            core,
            level,
            exhausted,
            ..
        } = self;
        finish_context(core, level, exhausted)
    }

    fn finish_container(&mut self) {
        self.exhausted = true;
        self.core.depth -= 1;
        trace!("object exhausted, depth {}", self.core.depth);
    }

    fn guard_advance(&mut self) -> Result<(), Error> {
        if self.core.suspended.is_some() {
            return Err(UnexpectedState::SuspendedRead.into());
        }
        if self.core.depth != self.level {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        Ok(())
    }

    fn guard(&mut self) -> Result<(), Error> {
        self.guard_advance()?;
        if self.exhausted {
            return Err(UnexpectedState::ContainerExhausted.into());
        }
        Ok(())
    }

    fn guard_resume(&mut self) -> Result<(), Error> {
        if self.core.depth != self.level {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        if self.exhausted {
            return Err(UnexpectedState::ContainerExhausted.into());
        }
        Ok(())
    }

    fn want_value(&mut self) -> Result<(), Error> {
        if !self.value_pending {
            return Err(UnexpectedState::KeyExpected.into());
        }
        Ok(())
    }

    fn value_done(&mut self) {
        self.value_pending = false;
    }

    fn core_mut(&mut self) -> &mut ReaderCore<R> {
        &mut *self.core
    }
}

/// Reading position inside a JSON array. Obtained from
/// [`ValueRead::open_array`]; alternates `next_element` and one value
/// operation until `next_element` returns `Ok(None)`.
pub struct ArrayReader<'p, R: Reader> {
    core: &'p mut ReaderCore<R>,
    level: usize,
    value_pending: bool,
    exhausted: bool,
    first: bool,
}

impl<'p, R: Reader> ArrayReader<'p, R> {
    fn new(core: &'p mut ReaderCore<R>) -> Self {
        let level = core.depth;
        ArrayReader {
            core,
            level,
            value_pending: false,
            exhausted: false,
            first: true,
        }
    }

    /// Advance to the next element and report its type. Returns
    /// `Ok(None)` at the closing bracket, repeatedly if called again.
    pub fn next_element(&mut self) -> Result<Option<ValueType>, Error> {
        self.guard_advance()?;
        if self.exhausted {
            return Ok(None);
        }
        if self.value_pending {
            return Err(UnexpectedState::UnreadValue.into());
        }

        self.core.scanner.skip_whitespace()?;
        match self.core.scanner.peek_byte()? {
            b']' => {
                self.core.scanner.bump();
                self.finish_container();
                return Ok(None);
            }
            b',' if !self.first => {
                self.core.scanner.bump();
            }
            _ if self.first => {}
            _ => return Err(Error::Malformed),
        }
        self.first = false;

        let value_type = self.core.peek_value_type()?;
        self.value_pending = true;
        Ok(Some(value_type))
    }

    /// Skip everything left in this array, including a pending element,
    /// and exhaust it so the parent can be advanced again.
    pub fn finish(self) -> Result<(), Error> {
        let ArrayReader {
            core,
            level,
            exhausted,
            ..
        } = self;
        finish_context(core, level, exhausted)
    }

    fn finish_container(&mut self) {
        self.exhausted = true;
        self.core.depth -= 1;
        trace!("array exhausted, depth {}", self.core.depth);
    }

    fn guard_advance(&mut self) -> Result<(), Error> {
        if self.core.suspended.is_some() {
            return Err(UnexpectedState::SuspendedRead.into());
        }
        if self.core.depth != self.level {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        Ok(())
    }

    fn guard(&mut self) -> Result<(), Error> {
        self.guard_advance()?;
        if self.exhausted {
            return Err(UnexpectedState::ContainerExhausted.into());
        }
        Ok(())
    }

    fn guard_resume(&mut self) -> Result<(), Error> {
        if self.core.depth != self.level {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        if self.exhausted {
            return Err(UnexpectedState::ContainerExhausted.into());
        }
        Ok(())
    }

    fn want_value(&mut self) -> Result<(), Error> {
        if !self.value_pending {
            return Err(UnexpectedState::UnreadValue.into());
        }
        Ok(())
    }

    fn value_done(&mut self) {
        self.value_pending = false;
    }

    fn core_mut(&mut self) -> &mut ReaderCore<R> {
        &mut *self.core
    }
}

fn finish_context<R: Reader>(
    core: &mut ReaderCore<R>,
    level: usize,
    exhausted: bool,
) -> Result<(), Error> {
    if core.suspended.is_some() {
        return Err(UnexpectedState::SuspendedRead.into());
    }
    if core.depth != level {
        return Err(UnexpectedState::ChildContextOpen.into());
    }
    if exhausted {
        return Ok(());
    }
    core.skip_balanced(1)?;
    core.depth -= 1;
    Ok(())
}

/// Null-consuming completion: `Ok` and `Err(Null)` both finish the value
/// turn, everything else leaves it pending.
fn settle<T>(res: Result<T, Error>, done: impl FnOnce()) -> Result<T, Error> {
    match res {
        Ok(value) => {
            done();
            Ok(value)
        }
        Err(Error::Null) => {
            done();
            Err(Error::Null)
        }
        Err(e) => Err(e),
    }
}

/// A position where one JSON value can be read: the session root, an
/// object member (after `next_key`), or an array element (after
/// `next_element`).
///
/// Implemented by [`JsonReader`], [`ObjectReader`] and [`ArrayReader`];
/// sealed, since the protocol bookkeeping lives in this crate.
pub trait ValueRead: crate::sealed::Sealed {
    /// The byte source driving this session.
    type Source: Reader;

    /// Report the type of the pending value without consuming anything.
    fn peek(&mut self) -> Result<ValueType, Error>;

    /// Consume a `null` literal. Any other type is [`Error::TypeMismatch`].
    fn read_null(&mut self) -> Result<(), Error>;

    /// Consume `true` or `false`. A number is a mismatch, not a bool.
    fn read_bool(&mut self) -> Result<bool, Error>;

    /// Read a number as `i32` with two's-complement narrowing.
    fn read_i32(&mut self) -> Result<i32, Error>;

    /// Read a number as `i64` with two's-complement narrowing.
    fn read_i64(&mut self) -> Result<i64, Error>;

    /// Read a number as `f32` (parsed as `f64`, then rounded).
    fn read_f32(&mut self) -> Result<f32, Error>;

    /// Read a number as `f64`.
    fn read_f64(&mut self) -> Result<f64, Error>;

    /// Decode a string value into `buf`. `StrRead::Suspended` means the
    /// buffer filled first; continue with [`ValueRead::resume_string`].
    fn read_string(&mut self, buf: &mut [u8]) -> Result<StrRead, Error>;

    /// Continue a suspended string read exactly where it left off.
    fn resume_string(&mut self, buf: &mut [u8]) -> Result<StrRead, Error>;

    /// Discard the pending value regardless of its shape.
    fn skip_value(&mut self) -> Result<(), Error>;

    /// Descend into the pending object. A `null` value is reported as
    /// [`Error::Null`] and consumed, so "object or null" callers can
    /// treat both uniformly.
    fn open_object(&mut self) -> Result<ObjectReader<'_, Self::Source>, Error>;

    /// Descend into the pending array; `null` as in
    /// [`ValueRead::open_object`].
    fn open_array(&mut self) -> Result<ArrayReader<'_, Self::Source>, Error>;
}

macro_rules! impl_value_read {
    (impl[$($g:tt)*] ValueRead for $ty:ty) => {
        impl<$($g)*> crate::sealed::Sealed for $ty {}

        impl<$($g)*> ValueRead for $ty {
            type Source = R;

            fn peek(&mut self) -> Result<ValueType, Error> {
                self.guard()?;
                self.want_value()?;
                self.core.peek_value_type()
            }

            fn read_null(&mut self) -> Result<(), Error> {
                self.guard()?;
                self.want_value()?;
                let res = self.core.read_null_value();
                settle(res, || self.value_done())
            }

            fn read_bool(&mut self) -> Result<bool, Error> {
                self.guard()?;
                self.want_value()?;
                let res = self.core.read_bool_value();
                settle(res, || self.value_done())
            }

            fn read_i32(&mut self) -> Result<i32, Error> {
                self.guard()?;
                self.want_value()?;
                let res = self.core.read_number_value(number::parse_i32);
                settle(res, || self.value_done())
            }

            fn read_i64(&mut self) -> Result<i64, Error> {
                self.guard()?;
                self.want_value()?;
                let res = self.core.read_number_value(number::parse_i64);
                settle(res, || self.value_done())
            }

            fn read_f32(&mut self) -> Result<f32, Error> {
                self.guard()?;
                self.want_value()?;
                let res = self.core.read_number_value(number::parse_f32);
                settle(res, || self.value_done())
            }

            fn read_f64(&mut self) -> Result<f64, Error> {
                self.guard()?;
                self.want_value()?;
                let res = self.core.read_number_value(number::parse_f64);
                settle(res, || self.value_done())
            }

            fn read_string(&mut self, buf: &mut [u8]) -> Result<StrRead, Error> {
                self.guard()?;
                self.want_value()?;
                match self.core.read_string_value(buf) {
                    Ok((written, true)) => {
                        self.value_done();
                        Ok(StrRead::Complete(written))
                    }
                    Ok((written, false)) => Ok(StrRead::Suspended(written)),
                    Err(Error::Null) => {
                        self.value_done();
                        Err(Error::Null)
                    }
                    Err(e) => Err(e),
                }
            }

            fn resume_string(&mut self, buf: &mut [u8]) -> Result<StrRead, Error> {
                self.guard_resume()?;
                match self.core.resume_string_value(buf) {
                    Ok((written, true)) => {
                        self.value_done();
                        Ok(StrRead::Complete(written))
                    }
                    Ok((written, false)) => Ok(StrRead::Suspended(written)),
                    Err(e) => Err(e),
                }
            }

            fn skip_value(&mut self) -> Result<(), Error> {
                self.guard()?;
                self.want_value()?;
                self.core.skip_value_inner()?;
                self.value_done();
                Ok(())
            }

            fn open_object(&mut self) -> Result<ObjectReader<'_, Self::Source>, Error> {
                self.guard()?;
                self.want_value()?;
                let res = self.core.open_container(ValueType::Object);
                settle(res, || self.value_done())?;
                Ok(ObjectReader::new(self.core_mut()))
            }

            fn open_array(&mut self) -> Result<ArrayReader<'_, Self::Source>, Error> {
                self.guard()?;
                self.want_value()?;
                let res = self.core.open_container(ValueType::Array);
                settle(res, || self.value_done())?;
                Ok(ArrayReader::new(self.core_mut()))
            }
        }
    };
}

impl_value_read!(impl[R: Reader] ValueRead for JsonReader<R>);
impl_value_read!(impl['p, R: Reader] ValueRead for ObjectReader<'p, R>);
impl_value_read!(impl['p, R: Reader] ValueRead for ArrayReader<'p, R>);
