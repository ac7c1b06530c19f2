// SPDX-License-Identifier: Apache-2.0

//! Token-level cursor over the input stream.
//!
//! The scanner owns the single byte of lookahead the grammar needs: it
//! skips insignificant whitespace, classifies the next significant byte,
//! matches the literal keywords exactly, and bounds number tokens without
//! interpreting them. Everything above it (contexts, escape decoding)
//! drives the stream through this cursor.

use crate::error::Error;
use crate::input::Reader;
use crate::shared::ValueType;

pub(crate) struct Scanner<R: Reader> {
    input: R,
    peeked: Option<u8>,
    pos: usize,
}

impl<R: Reader> Scanner<R> {
    pub(crate) fn new(input: R) -> Self {
        Scanner {
            input,
            peeked: None,
            pos: 0,
        }
    }

    /// Byte offset of the lookahead position, for diagnostics.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn into_inner(self) -> R {
        self.input
    }

    /// Look at the next byte without consuming it. `None` at end of stream.
    pub(crate) fn try_peek(&mut self) -> Result<Option<u8>, Error> {
        if self.peeked.is_none() {
            let mut byte = [0u8; 1];
            let n = self.input.read(&mut byte).map_err(|_| Error::ReaderError)?;
            if n == 0 {
                return Ok(None);
            }
            self.peeked = Some(byte[0]);
        }
        Ok(self.peeked)
    }

    /// Like `try_peek`, but end of stream is an error: a token was expected.
    pub(crate) fn peek_byte(&mut self) -> Result<u8, Error> {
        self.try_peek()?.ok_or(Error::EndOfData)
    }

    /// Consume the previously peeked byte.
    pub(crate) fn bump(&mut self) {
        if self.peeked.take().is_some() {
            self.pos += 1;
        }
    }

    pub(crate) fn next_byte(&mut self) -> Result<u8, Error> {
        let b = self.peek_byte()?;
        self.bump();
        Ok(b)
    }

    /// Consume any run of space, tab, newline and carriage return.
    pub(crate) fn skip_whitespace(&mut self) -> Result<(), Error> {
        while let Some(b) = self.try_peek()? {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.bump(),
                _ => break,
            }
        }
        Ok(())
    }

    /// Classify the next significant byte without consuming it.
    pub(crate) fn peek_value_type(&mut self) -> Result<ValueType, Error> {
        self.skip_whitespace()?;
        match self.peek_byte()? {
            b'{' => Ok(ValueType::Object),
            b'[' => Ok(ValueType::Array),
            b'"' => Ok(ValueType::String),
            b't' => Ok(ValueType::True),
            b'f' => Ok(ValueType::False),
            b'n' => Ok(ValueType::Null),
            b'-' | b'0'..=b'9' => Ok(ValueType::Number),
            _ => Err(Error::Malformed),
        }
    }

    /// Consume one expected structural byte, skipping leading whitespace.
    pub(crate) fn expect(&mut self, want: u8) -> Result<(), Error> {
        self.skip_whitespace()?;
        if self.peek_byte()? == want {
            self.bump();
            Ok(())
        } else {
            Err(Error::Malformed)
        }
    }

    /// Match a keyword exactly; any deviation is malformed input.
    pub(crate) fn consume_literal(&mut self, literal: &[u8]) -> Result<(), Error> {
        for &expected in literal {
            if self.next_byte()? != expected {
                return Err(Error::Malformed);
            }
        }
        Ok(())
    }

    /// Scan the maximal run matching the JSON number grammar
    /// `-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?` into `buf` and
    /// return its length. The terminating byte (delimiter or whitespace)
    /// is left unconsumed; end of stream also ends the token.
    pub(crate) fn scan_number(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        fn put(buf: &mut [u8], len: &mut usize, b: u8) -> Result<(), Error> {
            match buf.get_mut(*len) {
                Some(slot) => {
                    *slot = b;
                    *len += 1;
                    Ok(())
                }
                None => Err(Error::BufferFull),
            }
        }

        let mut len = 0usize;

        if self.try_peek()? == Some(b'-') {
            put(buf, &mut len, b'-')?;
            self.bump();
        }

        // Integer part: a bare zero, or a nonzero digit run.
        match self.peek_byte()? {
            b'0' => {
                put(buf, &mut len, b'0')?;
                self.bump();
                if matches!(self.try_peek()?, Some(b'0'..=b'9')) {
                    return Err(Error::Malformed);
                }
            }
            d @ b'1'..=b'9' => {
                put(buf, &mut len, d)?;
                self.bump();
                while let Some(d @ b'0'..=b'9') = self.try_peek()? {
                    put(buf, &mut len, d)?;
                    self.bump();
                }
            }
            _ => return Err(Error::Malformed),
        }

        // Fraction: at least one digit after the point.
        if self.try_peek()? == Some(b'.') {
            put(buf, &mut len, b'.')?;
            self.bump();
            let mut any = false;
            while let Some(d @ b'0'..=b'9') = self.try_peek()? {
                put(buf, &mut len, d)?;
                self.bump();
                any = true;
            }
            if !any {
                return Err(match self.try_peek()? {
                    None => Error::EndOfData,
                    Some(_) => Error::Malformed,
                });
            }
        }

        // Exponent: optional sign, at least one digit.
        if let Some(e @ (b'e' | b'E')) = self.try_peek()? {
            put(buf, &mut len, e)?;
            self.bump();
            if let Some(sign @ (b'+' | b'-')) = self.try_peek()? {
                put(buf, &mut len, sign)?;
                self.bump();
            }
            let mut any = false;
            while let Some(d @ b'0'..=b'9') = self.try_peek()? {
                put(buf, &mut len, d)?;
                self.bump();
                any = true;
            }
            if !any {
                return Err(match self.try_peek()? {
                    None => Error::EndOfData,
                    Some(_) => Error::Malformed,
                });
            }
        }

        Ok(len)
    }

    /// Consume a number token without retaining it, for skip paths.
    /// Loose: accepts any run of number-alphabet bytes.
    pub(crate) fn skip_number(&mut self) -> Result<(), Error> {
        while let Some(b) = self.try_peek()? {
            match b {
                b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E' => self.bump(),
                _ => break,
            }
        }
        Ok(())
    }

    /// Consume the rest of a string literal (opening quote already
    /// consumed) without decoding it, for skip paths. Escape pairs are
    /// stepped over so an escaped quote does not end the literal.
    pub(crate) fn skip_string(&mut self) -> Result<(), Error> {
        loop {
            match self.next_byte()? {
                b'"' => return Ok(()),
                b'\\' => {
                    self.next_byte()?;
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ChunkReader;

    fn scanner(data: &[u8]) -> Scanner<ChunkReader<'_>> {
        Scanner::new(ChunkReader::full_slice(data))
    }

    #[test]
    fn classifies_value_types() {
        assert_eq!(
            scanner(b"  {}").peek_value_type().unwrap(),
            ValueType::Object
        );
        assert_eq!(scanner(b"[1]").peek_value_type().unwrap(), ValueType::Array);
        assert_eq!(
            scanner(b"\t\"x\"").peek_value_type().unwrap(),
            ValueType::String
        );
        assert_eq!(
            scanner(b"\r\n-12").peek_value_type().unwrap(),
            ValueType::Number
        );
        assert_eq!(scanner(b"true").peek_value_type().unwrap(), ValueType::True);
        assert_eq!(
            scanner(b"false").peek_value_type().unwrap(),
            ValueType::False
        );
        assert_eq!(scanner(b"null").peek_value_type().unwrap(), ValueType::Null);
        assert_eq!(scanner(b"#").peek_value_type(), Err(Error::Malformed));
        assert_eq!(scanner(b"   ").peek_value_type(), Err(Error::EndOfData));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut s = scanner(b" 42");
        assert_eq!(s.peek_value_type().unwrap(), ValueType::Number);
        assert_eq!(s.peek_value_type().unwrap(), ValueType::Number);
        assert_eq!(s.next_byte().unwrap(), b'4');
    }

    #[test]
    fn literal_matching_is_exact() {
        assert!(scanner(b"true").consume_literal(b"true").is_ok());
        assert_eq!(
            scanner(b"tru!").consume_literal(b"true"),
            Err(Error::Malformed)
        );
        assert_eq!(
            scanner(b"tru").consume_literal(b"true"),
            Err(Error::EndOfData)
        );
    }

    #[test]
    fn scans_number_tokens() {
        let cases: &[(&[u8], &[u8])] = &[
            (b"0", b"0"),
            (b"-0", b"-0"),
            (b"42,", b"42"),
            (b"-11]", b"-11"),
            (b"4.2e1 ", b"4.2e1"),
            (b"24214.5525e-2}", b"24214.5525e-2"),
            (b"1E+3", b"1E+3"),
        ];
        for &(input, expected) in cases {
            let mut s = scanner(input);
            let mut buf = [0u8; 32];
            let n = s.scan_number(&mut buf).unwrap();
            assert_eq!(&buf[..n], expected, "input {:?}", input);
        }
    }

    #[test]
    fn number_grammar_is_strict() {
        let mut buf = [0u8; 32];
        assert_eq!(scanner(b"01").scan_number(&mut buf), Err(Error::Malformed));
        assert_eq!(scanner(b"-").scan_number(&mut buf), Err(Error::EndOfData));
        assert_eq!(scanner(b"-x").scan_number(&mut buf), Err(Error::Malformed));
        assert_eq!(scanner(b"1.").scan_number(&mut buf), Err(Error::EndOfData));
        assert_eq!(scanner(b"1.e3").scan_number(&mut buf), Err(Error::Malformed));
        assert_eq!(scanner(b"1e").scan_number(&mut buf), Err(Error::EndOfData));
        assert_eq!(scanner(b"1e+").scan_number(&mut buf), Err(Error::EndOfData));
        assert_eq!(scanner(b"1e+x").scan_number(&mut buf), Err(Error::Malformed));
    }

    #[test]
    fn number_token_leaves_delimiter() {
        let mut s = scanner(b"42,7");
        let mut buf = [0u8; 8];
        assert_eq!(s.scan_number(&mut buf).unwrap(), 2);
        assert_eq!(s.peek_byte().unwrap(), b',');
    }

    #[test]
    fn oversized_number_token() {
        let mut s = scanner(b"123456789");
        let mut buf = [0u8; 4];
        assert_eq!(s.scan_number(&mut buf), Err(Error::BufferFull));
    }

    #[test]
    fn skip_string_steps_over_escapes() {
        let mut s = scanner(br#"a\"b\\" next"#);
        s.skip_string().unwrap();
        assert_eq!(s.peek_byte().unwrap(), b' ');
    }

    #[test]
    fn position_tracks_consumed_bytes() {
        let mut s = scanner(b"  42");
        s.skip_whitespace().unwrap();
        assert_eq!(s.position(), 2);
        s.next_byte().unwrap();
        assert_eq!(s.position(), 3);
    }
}
