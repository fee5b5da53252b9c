use nom::number::complete::{le_i32, le_u16, le_u32, le_u8};
use nom::IResult;

use crate::error::{AxmlError, AxmlResult};

type NomError<'a> = nom::error::Error<&'a [u8]>;

/// A length-aware cursor over an in-memory byte slice.
///
/// All reads are little-endian and advance the cursor on success. A cursor
/// may cover only a window of the full document (see [`ByteCursor::sub_cursor`]);
/// [`ByteCursor::position`] still reports offsets relative to the document
/// start so errors raised deep inside a chunk point at the right byte.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteCursor { buf, pos: 0, base: 0 }
    }

    /// Absolute offset of the next byte in the full document.
    pub fn position(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Offset of the next byte relative to the start of this cursor.
    pub fn relative_position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Moves to `offset` bytes from the start of this cursor.
    pub fn seek_absolute(&mut self, offset: usize) -> AxmlResult<()> {
        if offset > self.buf.len() {
            return Err(AxmlError::OutOfRange {
                offset: self.position(),
                target: i64::try_from(offset).unwrap_or(i64::MAX),
                len: self.buf.len(),
            });
        }
        self.pos = offset;
        Ok(())
    }

    pub fn seek_relative(&mut self, delta: i64) -> AxmlResult<()> {
        let target = i64::try_from(self.pos)
            .ok()
            .and_then(|pos| pos.checked_add(delta));
        match target.and_then(|t| usize::try_from(t).ok()) {
            Some(target) if target <= self.buf.len() => {
                self.pos = target;
                Ok(())
            }
            _ => Err(AxmlError::OutOfRange {
                offset: self.position(),
                target: target.unwrap_or(i64::MAX),
                len: self.buf.len(),
            }),
        }
    }

    pub fn read_u8(&mut self) -> AxmlResult<u8> {
        self.read_u8_named("u8")
    }

    pub fn read_u8_named(&mut self, what: &'static str) -> AxmlResult<u8> {
        self.parse_le(what, 1, le_u8::<&'a [u8], NomError<'a>>)
    }

    pub fn read_u16(&mut self) -> AxmlResult<u16> {
        self.read_u16_named("u16")
    }

    pub fn read_u16_named(&mut self, what: &'static str) -> AxmlResult<u16> {
        self.parse_le(what, 2, le_u16::<&'a [u8], NomError<'a>>)
    }

    pub fn read_u32(&mut self) -> AxmlResult<u32> {
        self.read_u32_named("u32")
    }

    pub fn read_u32_named(&mut self, what: &'static str) -> AxmlResult<u32> {
        self.parse_le(what, 4, le_u32::<&'a [u8], NomError<'a>>)
    }

    pub fn read_i32_named(&mut self, what: &'static str) -> AxmlResult<i32> {
        self.parse_le(what, 4, le_i32::<&'a [u8], NomError<'a>>)
    }

    pub fn read_bytes(&mut self, len: usize) -> AxmlResult<&'a [u8]> {
        self.read_bytes_named(len, "bytes")
    }

    pub fn read_bytes_named(&mut self, len: usize, what: &'static str) -> AxmlResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.truncated(what, len));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Splits off a cursor over the next `len` bytes and advances past them.
    pub fn sub_cursor(&mut self, len: usize, what: &'static str) -> AxmlResult<ByteCursor<'a>> {
        let base = self.position();
        let buf = self.read_bytes_named(len, what)?;
        Ok(ByteCursor { buf, pos: 0, base })
    }

    fn parse_le<T>(
        &mut self,
        what: &'static str,
        need: usize,
        parser: impl Fn(&'a [u8]) -> IResult<&'a [u8], T, NomError<'a>>,
    ) -> AxmlResult<T> {
        let input = &self.buf[self.pos..];
        match parser(input) {
            Ok((rest, value)) => {
                self.pos = self.buf.len() - rest.len();
                Ok(value)
            }
            Err(_) => Err(self.truncated(what, need)),
        }
    }

    fn truncated(&self, what: &'static str, need: usize) -> AxmlError {
        AxmlError::TruncatedInput {
            what,
            offset: self.position(),
            need,
            have: self.remaining(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_primitives() {
        let data = [0x03, 0x00, 0x08, 0x00, 0x34, 0x12, 0xff];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u32().unwrap(), 0x0008_0003);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u8().unwrap(), 0xff);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn short_read_is_truncated_and_does_not_advance() {
        let data = [0x01, 0x02, 0x03];
        let mut cursor = ByteCursor::new(&data);
        cursor.read_u8().unwrap();
        let err = cursor.read_u32_named("line number").unwrap_err();
        assert_eq!(
            err,
            AxmlError::TruncatedInput {
                what: "line number",
                offset: 1,
                need: 4,
                have: 2,
            }
        );
        assert_eq!(cursor.relative_position(), 1);
    }

    #[test]
    fn seeks_are_bounds_checked() {
        let data = [0u8; 8];
        let mut cursor = ByteCursor::new(&data);
        cursor.seek_absolute(8).unwrap();
        assert_eq!(cursor.remaining(), 0);
        assert!(matches!(
            cursor.seek_absolute(9),
            Err(AxmlError::OutOfRange { target: 9, len: 8, .. })
        ));
        cursor.seek_relative(-3).unwrap();
        assert_eq!(cursor.relative_position(), 5);
        assert!(matches!(
            cursor.seek_relative(-6),
            Err(AxmlError::OutOfRange { target: -1, .. })
        ));
        assert!(cursor.seek_relative(4).is_err());
        assert_eq!(cursor.relative_position(), 5);
    }

    #[test]
    fn sub_cursor_reports_document_offsets() {
        let data = [0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut cursor = ByteCursor::new(&data);
        cursor.seek_absolute(4).unwrap();
        let mut window = cursor.sub_cursor(4, "window").unwrap();
        assert_eq!(cursor.relative_position(), 8);
        assert_eq!(window.len(), 4);
        assert_eq!(window.position(), 4);
        window.seek_absolute(2).unwrap();
        assert_eq!(window.read_bytes(2).unwrap(), &[6, 7]);
        let err = window.read_u8().unwrap_err();
        assert_eq!(err.offset(), 8);
    }
}
