// SPDX-License-Identifier: Apache-2.0

//! The mirror writer: session, nested contexts, and typed emission.
//!
//! A [`JsonWriter`] owns the sink and accepts exactly one root value.
//! Opening a container yields an [`ObjectWriter`] or [`ArrayWriter`] that
//! mutably borrows the session; `close(self)` emits the closing bracket
//! and consumes the context, so use-after-close does not compile.
//!
//! Separator placement is the codec's job, whitespace is not: callers own
//! indentation and inject it with [`ValueWrite::whitespace`] between
//! protocol calls. The separator operations are idempotent per
//! member/element, so loops can call them unconditionally.

use log::trace;

use crate::error::{Error, UnexpectedState};
use crate::escape;
use crate::number;
use crate::output::Writer;
use crate::shared::DEFAULT_MAX_DEPTH;

/// Session state shared by the root and every nested writer context.
pub(crate) struct WriterCore<W: Writer> {
    output: W,
    depth: usize,
    max_depth: usize,
    root_written: bool,
}

impl<W: Writer> WriterCore<W> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.output.write(bytes).map_err(|_| Error::WriterError)
    }

    fn open_container(&mut self, bracket: &[u8]) -> Result<(), Error> {
        if self.depth >= self.max_depth {
            return Err(Error::MaxDepthExceeded);
        }
        self.put(bracket)?;
        self.depth += 1;
        trace!("open container, depth {}", self.depth);
        Ok(())
    }
}

/// Turn state inside an object member.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum MemberState {
    /// Between members: the next write must be a key.
    Key,
    /// Key written, colon not yet emitted.
    Colon,
    /// Colon emitted, the member's value is due.
    Value,
}

/// The root write session. Owns the sink and accepts the document's
/// single root value.
pub struct JsonWriter<W: Writer> {
    core: WriterCore<W>,
}

impl<W: Writer> JsonWriter<W> {
    /// Create a session over `output` with the default nesting limit.
    pub fn new(output: W) -> Self {
        Self::with_max_depth(output, DEFAULT_MAX_DEPTH)
    }

    /// Create a session with an explicit container nesting limit.
    pub fn with_max_depth(output: W, max_depth: usize) -> Self {
        JsonWriter {
            core: WriterCore {
                output,
                depth: 0,
                max_depth,
                root_written: false,
            },
        }
    }

    /// Release the session and recover the sink. Fails if a container
    /// context is still open.
    pub fn finish(self) -> Result<W, Error> {
        if self.core.depth != 0 {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        Ok(self.core.output)
    }

    fn guard(&mut self) -> Result<(), Error> {
        if self.core.depth != 0 {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        Ok(())
    }

    fn want_value(&mut self) -> Result<(), Error> {
        if self.core.root_written {
            return Err(UnexpectedState::DocumentComplete.into());
        }
        Ok(())
    }

    fn value_done(&mut self) {
        self.core.root_written = true;
    }

    fn core_mut(&mut self) -> &mut WriterCore<W> {
        &mut self.core
    }
}

/// Writing position inside a JSON object. Obtained from
/// [`ValueWrite::open_object`]; drive it as
/// `member_separator` → `write_key` → `key_separator` → one value write,
/// then `close(self)`.
pub struct ObjectWriter<'p, W: Writer> {
    core: &'p mut WriterCore<W>,
    level: usize,
    started: bool,
    separated: bool,
    member: MemberState,
}

impl<'p, W: Writer> ObjectWriter<'p, W> {
    fn new(core: &'p mut WriterCore<W>) -> Self {
        let level = core.depth;
        ObjectWriter {
            core,
            level,
            started: false,
            separated: false,
            member: MemberState::Key,
        }
    }

    /// Emit the comma before the next member, if one is due. Safe to call
    /// unconditionally before every member: no comma before the first
    /// member, exactly one between members no matter how many calls.
    pub fn member_separator(&mut self) -> Result<(), Error> {
        self.guard()?;
        if self.member != MemberState::Key {
            return Err(UnexpectedState::KeyAlreadyWritten.into());
        }
        if self.started && !self.separated {
            self.core.put(b",")?;
        }
        self.separated = true;
        Ok(())
    }

    /// Emit the member's key as a string literal.
    pub fn write_key(&mut self, key: &str) -> Result<(), Error> {
        self.guard()?;
        if self.member != MemberState::Key {
            return Err(UnexpectedState::KeyAlreadyWritten.into());
        }
        if self.started && !self.separated {
            return Err(UnexpectedState::MissingSeparator.into());
        }
        escape::encode_str(&mut self.core.output, key)?;
        self.member = MemberState::Colon;
        Ok(())
    }

    /// Emit the `:` between the key and its value.
    pub fn key_separator(&mut self) -> Result<(), Error> {
        self.guard()?;
        if self.member != MemberState::Colon {
            return Err(UnexpectedState::KeySeparatorExpected.into());
        }
        self.core.put(b":")?;
        self.member = MemberState::Value;
        Ok(())
    }

    /// Emit the closing brace and consume the context.
    pub fn close(self) -> Result<(), Error> {
        let ObjectWriter {
            core,
            level,
            started,
            separated,
            member,
        } = self;
        if core.depth != level {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        if member != MemberState::Key {
            return Err(UnexpectedState::UnfinishedMember.into());
        }
        if started && separated {
            return Err(UnexpectedState::DanglingSeparator.into());
        }
        core.put(b"}")?;
        core.depth -= 1;
        trace!("close object, depth {}", core.depth);
        Ok(())
    }

    fn guard(&mut self) -> Result<(), Error> {
        if self.core.depth != self.level {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        Ok(())
    }

    fn want_value(&mut self) -> Result<(), Error> {
        match self.member {
            MemberState::Value => Ok(()),
            MemberState::Key => Err(UnexpectedState::KeyExpected.into()),
            MemberState::Colon => Err(UnexpectedState::KeySeparatorExpected.into()),
        }
    }

    fn value_done(&mut self) {
        self.member = MemberState::Key;
        self.started = true;
        self.separated = false;
    }

    fn core_mut(&mut self) -> &mut WriterCore<W> {
        &mut *self.core
    }
}

/// Writing position inside a JSON array. Obtained from
/// [`ValueWrite::open_array`]; drive it as `element_separator` → one value
/// write per element, then `close(self)`.
pub struct ArrayWriter<'p, W: Writer> {
    core: &'p mut WriterCore<W>,
    level: usize,
    started: bool,
    separated: bool,
}

impl<'p, W: Writer> ArrayWriter<'p, W> {
    fn new(core: &'p mut WriterCore<W>) -> Self {
        let level = core.depth;
        ArrayWriter {
            core,
            level,
            started: false,
            separated: false,
        }
    }

    /// Emit the comma before the next element, if one is due. Same
    /// suppression rule as [`ObjectWriter::member_separator`].
    pub fn element_separator(&mut self) -> Result<(), Error> {
        self.guard()?;
        if self.started && !self.separated {
            self.core.put(b",")?;
        }
        self.separated = true;
        Ok(())
    }

    /// Emit the closing bracket and consume the context.
    pub fn close(self) -> Result<(), Error> {
        let ArrayWriter {
            core,
            level,
            started,
            separated,
        } = self;
        if core.depth != level {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        if started && separated {
            return Err(UnexpectedState::DanglingSeparator.into());
        }
        core.put(b"]")?;
        core.depth -= 1;
        trace!("close array, depth {}", core.depth);
        Ok(())
    }

    fn guard(&mut self) -> Result<(), Error> {
        if self.core.depth != self.level {
            return Err(UnexpectedState::ChildContextOpen.into());
        }
        Ok(())
    }

    fn want_value(&mut self) -> Result<(), Error> {
        if self.started && !self.separated {
            return Err(UnexpectedState::MissingSeparator.into());
        }
        Ok(())
    }

    fn value_done(&mut self) {
        self.started = true;
        self.separated = false;
    }

    fn core_mut(&mut self) -> &mut WriterCore<W> {
        &mut *self.core
    }
}

/// A position where one JSON value can be written: the session root, an
/// object member's value slot, or the next array element.
///
/// Implemented by [`JsonWriter`], [`ObjectWriter`] and [`ArrayWriter`];
/// sealed, since the protocol bookkeeping lives in this crate.
pub trait ValueWrite: crate::sealed::Sealed {
    /// The byte sink behind this session.
    type Sink: Writer;

    /// Emit `null`.
    fn write_null(&mut self) -> Result<(), Error>;

    /// Emit `true` or `false`.
    fn write_bool(&mut self, value: bool) -> Result<(), Error>;

    /// Emit an integer.
    fn write_i32(&mut self, value: i32) -> Result<(), Error>;

    /// Emit an integer.
    fn write_i64(&mut self, value: i64) -> Result<(), Error>;

    /// Emit a float as shortest round-trip text. NaN and the infinities
    /// fail with [`Error::NonFiniteNumber`]; nothing is emitted.
    fn write_f32(&mut self, value: f32) -> Result<(), Error>;

    /// Emit a double as shortest round-trip text; non-finite values fail
    /// as in [`ValueWrite::write_f32`]. The sign of `-0.0` is preserved.
    fn write_f64(&mut self, value: f64) -> Result<(), Error>;

    /// Emit a string literal with JSON escaping; UTF-8 passes through.
    fn write_string(&mut self, text: &str) -> Result<(), Error>;

    /// Open a nested object and return its context.
    fn open_object(&mut self) -> Result<ObjectWriter<'_, Self::Sink>, Error>;

    /// Open a nested array and return its context.
    fn open_array(&mut self) -> Result<ArrayWriter<'_, Self::Sink>, Error>;

    /// Pass raw whitespace through to the sink, for caller-owned
    /// indentation. Only space, tab, newline and carriage return are
    /// accepted.
    fn whitespace(&mut self, ws: &str) -> Result<(), Error>;
}

macro_rules! impl_value_write {
    (impl[$($g:tt)*] ValueWrite for $ty:ty) => {
        impl<$($g)*> crate::sealed::Sealed for $ty {}

        impl<$($g)*> ValueWrite for $ty {
            type Sink = W;

            fn write_null(&mut self) -> Result<(), Error> {
                self.guard()?;
                self.want_value()?;
                self.core.put(b"null")?;
                self.value_done();
                Ok(())
            }

            fn write_bool(&mut self, value: bool) -> Result<(), Error> {
                self.guard()?;
                self.want_value()?;
                self.core
                    .put(if value { b"true".as_slice() } else { b"false".as_slice() })?;
                self.value_done();
                Ok(())
            }

            fn write_i32(&mut self, value: i32) -> Result<(), Error> {
                self.write_i64(value as i64)
            }

            fn write_i64(&mut self, value: i64) -> Result<(), Error> {
                self.guard()?;
                self.want_value()?;
                let mut digits = [0u8; 20];
                let text = number::format_i64(value, &mut digits);
                self.core.put(text)?;
                self.value_done();
                Ok(())
            }

            fn write_f32(&mut self, value: f32) -> Result<(), Error> {
                self.guard()?;
                self.want_value()?;
                let mut buf = ryu::Buffer::new();
                let text = number::format_f32(value, &mut buf)?;
                self.core.put(text.as_bytes())?;
                self.value_done();
                Ok(())
            }

            fn write_f64(&mut self, value: f64) -> Result<(), Error> {
                self.guard()?;
                self.want_value()?;
                let mut buf = ryu::Buffer::new();
                let text = number::format_f64(value, &mut buf)?;
                self.core.put(text.as_bytes())?;
                self.value_done();
                Ok(())
            }

            fn write_string(&mut self, text: &str) -> Result<(), Error> {
                self.guard()?;
                self.want_value()?;
                escape::encode_str(&mut self.core_mut().output, text)?;
                self.value_done();
                Ok(())
            }

            fn open_object(&mut self) -> Result<ObjectWriter<'_, Self::Sink>, Error> {
                self.guard()?;
                self.want_value()?;
                self.core.open_container(b"{")?;
                self.value_done();
                Ok(ObjectWriter::new(self.core_mut()))
            }

            fn open_array(&mut self) -> Result<ArrayWriter<'_, Self::Sink>, Error> {
                self.guard()?;
                self.want_value()?;
                self.core.open_container(b"[")?;
                self.value_done();
                Ok(ArrayWriter::new(self.core_mut()))
            }

            fn whitespace(&mut self, ws: &str) -> Result<(), Error> {
                self.guard()?;
                if !ws.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r')) {
                    return Err(UnexpectedState::InvalidWhitespace.into());
                }
                self.core.put(ws.as_bytes())
            }
        }
    };
}

impl_value_write!(impl[W: Writer] ValueWrite for JsonWriter<W>);
impl_value_write!(impl['p, W: Writer] ValueWrite for ObjectWriter<'p, W>);
impl_value_write!(impl['p, W: Writer] ValueWrite for ArrayWriter<'p, W>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SliceWriter;
    use test_log::test;

    fn with_writer<F>(f: F) -> Vec<u8>
    where
        F: for<'a, 'b> FnOnce(&'a mut JsonWriter<SliceWriter<'b>>),
    {
        let mut buf = [0u8; 512];
        let mut w = JsonWriter::new(SliceWriter::new(&mut buf));
        f(&mut w);
        let sink = w.finish().unwrap();
        sink.as_bytes().to_vec()
    }

    #[test]
    fn writes_scalars() {
        assert_eq!(with_writer(|w| w.write_null().unwrap()), b"null");
        assert_eq!(with_writer(|w| w.write_bool(true).unwrap()), b"true");
        assert_eq!(with_writer(|w| w.write_bool(false).unwrap()), b"false");
        assert_eq!(with_writer(|w| w.write_i32(-7).unwrap()), b"-7");
        assert_eq!(
            with_writer(|w| w.write_i64(i64::MIN).unwrap()),
            b"-9223372036854775808"
        );
        assert_eq!(with_writer(|w| w.write_f64(42.0).unwrap()), b"42.0");
        assert_eq!(with_writer(|w| w.write_string("hi").unwrap()), b"\"hi\"");
    }

    #[test]
    fn empty_object_and_array() {
        assert_eq!(
            with_writer(|w| w.open_object().unwrap().close().unwrap()),
            b"{}"
        );
        assert_eq!(
            with_writer(|w| w.open_array().unwrap().close().unwrap()),
            b"[]"
        );
    }

    #[test]
    fn object_members_with_repeated_separators() {
        let out = with_writer(|w| {
            let mut obj = w.open_object().unwrap();
            // Calling the separator many times per member must not emit
            // extra commas, and never a leading one.
            obj.member_separator().unwrap();
            obj.member_separator().unwrap();
            obj.write_key("a").unwrap();
            obj.key_separator().unwrap();
            obj.write_i32(1).unwrap();
            obj.member_separator().unwrap();
            obj.member_separator().unwrap();
            obj.member_separator().unwrap();
            obj.write_key("b").unwrap();
            obj.key_separator().unwrap();
            obj.write_i32(2).unwrap();
            obj.close().unwrap();
        });
        assert_eq!(out, br#"{"a":1,"b":2}"#);
    }

    #[test]
    fn array_elements() {
        let out = with_writer(|w| {
            let mut arr = w.open_array().unwrap();
            for v in [1i32, 2, 3] {
                arr.element_separator().unwrap();
                arr.write_i32(v).unwrap();
            }
            arr.close().unwrap();
        });
        assert_eq!(out, b"[1,2,3]");
    }

    #[test]
    fn nested_containers() {
        let out = with_writer(|w| {
            let mut obj = w.open_object().unwrap();
            obj.member_separator().unwrap();
            obj.write_key("items").unwrap();
            obj.key_separator().unwrap();
            let mut arr = obj.open_array().unwrap();
            arr.element_separator().unwrap();
            arr.write_string("x").unwrap();
            arr.element_separator().unwrap();
            let inner = arr.open_object().unwrap();
            inner.close().unwrap();
            arr.close().unwrap();
            obj.member_separator().unwrap();
            obj.write_key("n").unwrap();
            obj.key_separator().unwrap();
            obj.write_null().unwrap();
            obj.close().unwrap();
        });
        assert_eq!(out, br#"{"items":["x",{}],"n":null}"#);
    }

    #[test]
    fn string_escaping_on_write() {
        let out = with_writer(|w| w.write_string("a\"b\\c\nd\u{1}").unwrap());
        assert_eq!(out, b"\"a\\\"b\\\\c\\nd\\u0001\"");
    }

    #[test]
    fn negative_zero_and_non_finite() {
        let out = with_writer(|w| w.write_f64(-0.0).unwrap());
        assert_eq!(out, b"-0.0");

        let mut buf = [0u8; 64];
        let mut w = JsonWriter::new(SliceWriter::new(&mut buf));
        assert_eq!(w.write_f64(f64::NAN), Err(Error::NonFiniteNumber));
        assert_eq!(w.write_f32(f32::INFINITY), Err(Error::NonFiniteNumber));
        // Nothing was emitted and the slot is still writable.
        w.write_f64(1.5).unwrap();
        assert_eq!(w.finish().unwrap().as_bytes(), b"1.5");
    }

    #[test]
    fn caller_owned_whitespace_passes_through() {
        let out = with_writer(|w| {
            let mut obj = w.open_object().unwrap();
            obj.member_separator().unwrap();
            obj.whitespace("\n  ").unwrap();
            obj.write_key("a").unwrap();
            obj.key_separator().unwrap();
            obj.whitespace(" ").unwrap();
            obj.write_i32(1).unwrap();
            obj.whitespace("\n").unwrap();
            obj.close().unwrap();
        });
        assert_eq!(out, b"{\n  \"a\": 1\n}");

        let mut buf = [0u8; 16];
        let mut w = JsonWriter::new(SliceWriter::new(&mut buf));
        assert_eq!(
            w.whitespace("x"),
            Err(Error::Unexpected(UnexpectedState::InvalidWhitespace))
        );
    }

    #[test]
    fn member_discipline_is_enforced() {
        let mut buf = [0u8; 64];
        let mut w = JsonWriter::new(SliceWriter::new(&mut buf));
        let mut obj = w.open_object().unwrap();
        // Value before any key.
        assert_eq!(
            obj.write_i32(1),
            Err(Error::Unexpected(UnexpectedState::KeyExpected))
        );
        obj.write_key("a").unwrap();
        // Value before the colon.
        assert_eq!(
            obj.write_i32(1),
            Err(Error::Unexpected(UnexpectedState::KeySeparatorExpected))
        );
        // A second key mid-member.
        assert_eq!(
            obj.write_key("b"),
            Err(Error::Unexpected(UnexpectedState::KeyAlreadyWritten))
        );
        obj.key_separator().unwrap();
        // The colon only once.
        assert_eq!(
            obj.key_separator(),
            Err(Error::Unexpected(UnexpectedState::KeySeparatorExpected))
        );
        obj.write_i32(1).unwrap();
        // Closing mid-member is rejected.
        obj.member_separator().unwrap();
        obj.write_key("b").unwrap();
        let err = obj.close();
        assert_eq!(
            err,
            Err(Error::Unexpected(UnexpectedState::UnfinishedMember))
        );
    }

    #[test]
    fn missing_separator_is_detected() {
        let mut buf = [0u8; 64];
        let mut w = JsonWriter::new(SliceWriter::new(&mut buf));
        let mut obj = w.open_object().unwrap();
        obj.member_separator().unwrap();
        obj.write_key("a").unwrap();
        obj.key_separator().unwrap();
        obj.write_i32(1).unwrap();
        assert_eq!(
            obj.write_key("b"),
            Err(Error::Unexpected(UnexpectedState::MissingSeparator))
        );

        let mut buf = [0u8; 64];
        let mut w = JsonWriter::new(SliceWriter::new(&mut buf));
        let mut arr = w.open_array().unwrap();
        arr.element_separator().unwrap();
        arr.write_i32(1).unwrap();
        assert_eq!(
            arr.write_i32(2),
            Err(Error::Unexpected(UnexpectedState::MissingSeparator))
        );
    }

    #[test]
    fn dangling_separator_is_detected() {
        let mut buf = [0u8; 64];
        let mut w = JsonWriter::new(SliceWriter::new(&mut buf));
        let mut arr = w.open_array().unwrap();
        arr.element_separator().unwrap();
        arr.write_i32(1).unwrap();
        // This emits the comma eagerly, then nothing follows it.
        arr.element_separator().unwrap();
        assert_eq!(
            arr.close(),
            Err(Error::Unexpected(UnexpectedState::DanglingSeparator))
        );
    }

    #[test]
    fn single_root_value() {
        let mut buf = [0u8; 64];
        let mut w = JsonWriter::new(SliceWriter::new(&mut buf));
        w.write_bool(true).unwrap();
        assert_eq!(
            w.write_bool(false),
            Err(Error::Unexpected(UnexpectedState::DocumentComplete))
        );
    }

    #[test]
    fn sink_errors_surface_as_writer_error() {
        let mut buf = [0u8; 2];
        let mut w = JsonWriter::new(SliceWriter::new(&mut buf));
        assert_eq!(w.write_string("too long"), Err(Error::WriterError));
    }
}
