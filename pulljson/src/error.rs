// SPDX-License-Identifier: Apache-2.0

/// Errors and expected out-of-band outcomes of codec operations.
///
/// Not every variant is a failure: `Null`, `TypeMismatch` and `BufferFull`
/// are local outcomes the caller is expected to handle and continue from,
/// while the grammar/stream variants poison the session. `is_fatal`
/// encodes the split.
#[derive(Debug, PartialEq)]
pub enum Error {
    /// The value at the cursor is literally `null` and the caller asked
    /// for a non-null-accepting read. The `null` has been consumed.
    Null,
    /// The value at the cursor is neither `null` nor the requested type.
    /// Nothing was consumed; the value is still pending.
    TypeMismatch,
    /// The caller-provided buffer was too small for the operation.
    /// String value reads suspend instead of returning this; it is
    /// terminal for keys and degenerate number tokens.
    BufferFull,
    /// The input does not conform to JSON grammar at the current position.
    Malformed,
    /// Invalid character after a backslash in a string literal.
    InvalidEscape,
    /// Invalid hex digits in a `\uXXXX` escape sequence.
    InvalidUnicodeHex,
    /// Valid hex but an invalid codepoint (lone or mispaired surrogate).
    InvalidUnicodeCodepoint,
    /// A number token could not be converted.
    InvalidNumber,
    /// Decoded key bytes were not valid UTF-8.
    InvalidUtf8(core::str::Utf8Error),
    /// Container nesting exceeded the session's configured limit.
    MaxDepthExceeded,
    /// The stream ended while a value or token was still expected.
    EndOfData,
    /// Error from the underlying byte source (I/O error, not end-of-stream).
    ReaderError,
    /// Error from the underlying byte sink.
    WriterError,
    /// NaN or an infinity was passed to a number write; JSON has no
    /// representation for them and nothing was emitted.
    NonFiniteNumber,
    /// A caller-discipline violation, distinct from data errors.
    Unexpected(UnexpectedState),
}

/// Call-discipline violations: the protocol was driven out of order.
///
/// These indicate a programming error in the caller, never a property of
/// the document being read or written.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnexpectedState {
    /// A parent context was used while a nested context opened from it
    /// was still active (or was dropped before being exhausted/closed).
    ChildContextOpen,
    /// A value operation on a container whose closing bracket has already
    /// been observed.
    ContainerExhausted,
    /// A value operation while the object context expects a key.
    KeyExpected,
    /// The advance operation was called before the previous value was
    /// read or skipped.
    UnreadValue,
    /// A string read is suspended; only `resume_string` may be called.
    SuspendedRead,
    /// `resume_string` was called with no suspended string read.
    NoSuspendedRead,
    /// A member was written without the separator operation.
    MissingSeparator,
    /// A value write before the key separator was emitted.
    KeySeparatorExpected,
    /// `write_key` while the current member already has its key.
    KeyAlreadyWritten,
    /// `close` while a member's value had not been written yet.
    UnfinishedMember,
    /// `close` directly after a separator emitted a comma.
    DanglingSeparator,
    /// The writer session's single root value was already written.
    DocumentComplete,
    /// `whitespace` was passed non-whitespace bytes.
    InvalidWhitespace,
}

impl Error {
    /// True for outcomes that poison the session: grammar and stream
    /// failures, and call-discipline violations. `Null`, `TypeMismatch`,
    /// `BufferFull` and `NonFiniteNumber` are expected local outcomes.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Null | Error::TypeMismatch | Error::BufferFull | Error::NonFiniteNumber
        )
    }
}

impl From<core::str::Utf8Error> for Error {
    fn from(err: core::str::Utf8Error) -> Self {
        Error::InvalidUtf8(err)
    }
}

impl From<UnexpectedState> for Error {
    fn from(state: UnexpectedState) -> Self {
        Error::Unexpected(state)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidUtf8(e) => write!(f, "invalid UTF-8: {e}"),
            Error::Unexpected(state) => write!(f, "call discipline violation: {state:?}"),
            _ => write!(f, "{self:?}"),
        }
    }
}
