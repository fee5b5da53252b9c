use std::borrow::Cow;
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::chunk::{ChunkHeader, CHUNK_HEADER_SIZE};
use crate::cursor::ByteCursor;
use crate::error::{AxmlError, AxmlResult};

/// Size of the string pool header: chunk header plus five u32 fields.
pub const STRING_POOL_HEADER_SIZE: u32 = 28;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StringPoolFlags: u32 {
        const SORTED = 0x0000_0001;
        const UTF8 = 0x0000_0100;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringEncoding {
    Utf8,
    Utf16Le,
}

impl fmt::Display for StringEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringEncoding::Utf8 => f.write_str("UTF-8"),
            StringEncoding::Utf16Le => f.write_str("UTF-16LE"),
        }
    }
}

/// The decoded string pool of a document.
///
/// String ids used by events and attributes are indices into [`StringPool::strings`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringPool {
    encoding: StringEncoding,
    flags: StringPoolFlags,
    offsets: Vec<u32>,
    strings: Vec<String>,
    style_count: u32,
    style_offsets: Vec<u32>,
}

impl StringPool {
    /// Decodes a string pool chunk.
    ///
    /// `body` must cover exactly the chunk body (everything after the generic
    /// header). Strings are located by seeking to `string_data_offset + offsets[i]`,
    /// both relative to the chunk start. Trailing padding and style data are
    /// skipped, leaving `body` at its end.
    pub fn decode(body: &mut ByteCursor<'_>, header: &ChunkHeader) -> AxmlResult<Self> {
        let string_count = body.read_u32_named("string count")?;
        let style_count = body.read_u32_named("style count")?;
        let flags = StringPoolFlags::from_bits_retain(body.read_u32_named("string pool flags")?);
        let data_offset_field = body.position();
        let strings_start = body.read_u32_named("string data offset")?;
        let styles_offset_field = body.position();
        let styles_start = body.read_u32_named("style data offset")?;

        let declared = u64::from(header.declared_size);
        let tables_end = u64::from(STRING_POOL_HEADER_SIZE)
            + 4 * (u64::from(string_count) + u64::from(style_count));
        if tables_end > declared {
            return Err(AxmlError::BadMagic {
                what: "string pool offset table size",
                offset: header.offset,
                expected: declared,
                found: tables_end,
            });
        }

        let mut offsets = Vec::with_capacity(string_count as usize);
        for _ in 0..string_count {
            offsets.push(body.read_u32_named("string offset")?);
        }
        let mut style_offsets = Vec::with_capacity(style_count as usize);
        for _ in 0..style_count {
            style_offsets.push(body.read_u32_named("style offset")?);
        }

        let encoding = if flags.contains(StringPoolFlags::UTF8) {
            StringEncoding::Utf8
        } else {
            StringEncoding::Utf16Le
        };

        let mut strings = Vec::with_capacity(offsets.len());
        if !offsets.is_empty() {
            let data_start = u64::from(strings_start);
            if data_start < tables_end || data_start > declared {
                return Err(AxmlError::IndexOutOfRange {
                    what: "string data offset",
                    offset: data_offset_field,
                    index: i64::from(strings_start),
                    len: header.declared_size as usize,
                });
            }
            let data_end = if style_count > 0 && styles_start != 0 {
                u64::from(styles_start)
            } else {
                declared
            };
            if data_end < data_start || data_end > declared {
                return Err(AxmlError::IndexOutOfRange {
                    what: "style data offset",
                    offset: styles_offset_field,
                    index: i64::from(styles_start),
                    len: header.declared_size as usize,
                });
            }

            body.seek_absolute((data_start - u64::from(CHUNK_HEADER_SIZE)) as usize)?;
            let mut region = body.sub_cursor((data_end - data_start) as usize, "string data")?;
            let table_offset = header.offset + u64::from(STRING_POOL_HEADER_SIZE);
            for (i, &offset) in offsets.iter().enumerate() {
                if offset as usize >= region.len() {
                    return Err(AxmlError::IndexOutOfRange {
                        what: "string offset",
                        offset: table_offset + 4 * i as u64,
                        index: i64::from(offset),
                        len: region.len(),
                    });
                }
                region.seek_absolute(offset as usize)?;
                let text = match encoding {
                    StringEncoding::Utf8 => read_utf8_string(&mut region)?,
                    StringEncoding::Utf16Le => read_utf16_string(&mut region)?,
                };
                strings.push(text);
            }
        }

        body.seek_absolute(body.len())?;

        Ok(StringPool {
            encoding,
            flags,
            offsets,
            strings,
            style_count,
            style_offsets,
        })
    }

    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    pub fn flags(&self) -> StringPoolFlags {
        self.flags
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn style_count(&self) -> u32 {
        self.style_count
    }

    pub fn style_offsets(&self) -> &[u32] {
        &self.style_offsets
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.strings.get(id as usize).map(|s| s.as_str())
    }

    /// Looks up a signed id, where `-1` means "no string".
    pub fn resolve(&self, id: i32) -> Option<&str> {
        u32::try_from(id).ok().and_then(|id| self.get(id))
    }
}

fn read_utf8_length(region: &mut ByteCursor<'_>) -> AxmlResult<usize> {
    let first = region.read_u8_named("UTF-8 length")?;
    if first & 0x80 == 0 {
        return Ok(first as usize);
    }
    let second = region.read_u8_named("UTF-8 length")?;
    Ok((((first & 0x7F) as usize) << 8) | second as usize)
}

fn read_utf8_string(region: &mut ByteCursor<'_>) -> AxmlResult<String> {
    let start = region.position();
    // The first length counts UTF-16 code units and is not needed to decode.
    let _utf16_len = read_utf8_length(region)?;
    let byte_len = read_utf8_length(region)?;
    let bytes = region.read_bytes_named(byte_len, "UTF-8 string")?;
    let terminator_offset = region.position();
    let terminator = region.read_u8_named("UTF-8 terminator")?;
    if terminator != 0 {
        return Err(AxmlError::InvalidEncoding {
            offset: terminator_offset,
            encoding: StringEncoding::Utf8,
            reason: format!("expected NUL terminator, found {terminator:#04x}"),
        });
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(err) => cesu8::from_java_cesu8(bytes)
            .map(Cow::into_owned)
            .map_err(|_| AxmlError::InvalidEncoding {
                offset: start,
                encoding: StringEncoding::Utf8,
                reason: err.to_string(),
            }),
    }
}

fn read_utf16_string(region: &mut ByteCursor<'_>) -> AxmlResult<String> {
    let start = region.position();
    let first = region.read_u16_named("UTF-16 length")?;
    let unit_count = if first & 0x8000 == 0 {
        first as usize
    } else {
        let second = region.read_u16_named("UTF-16 length")?;
        (((first & 0x7FFF) as usize) << 16) | second as usize
    };
    let bytes = region.read_bytes_named(unit_count.saturating_mul(2), "UTF-16 string")?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let terminator_offset = region.position();
    let terminator = region.read_u16_named("UTF-16 terminator")?;
    if terminator != 0 {
        return Err(AxmlError::InvalidEncoding {
            offset: terminator_offset,
            encoding: StringEncoding::Utf16Le,
            reason: format!("expected NUL terminator, found {terminator:#06x}"),
        });
    }
    String::from_utf16(&units).map_err(|err| AxmlError::InvalidEncoding {
        offset: start,
        encoding: StringEncoding::Utf16Le,
        reason: err.to_string(),
    })
}
