use serde::{Deserialize, Serialize};

use crate::chunk::{expect_size, ChunkHeader, ChunkType};
use crate::cursor::ByteCursor;
use crate::error::{AxmlError, AxmlResult};
use crate::value::TYPE_STRING;

/// Marker stored in the comment slot of every node header.
pub const SENTINEL: u32 = 0xFFFF_FFFF;
/// A namespace, prefix or raw value id of `-1` means "none".
pub const NO_ENTRY: i32 = -1;
/// `attribute_start = 0x14` and `attribute_size = 0x14`, packed as one word.
pub const TAG_START_FLAGS: u32 = 0x0014_0014;

const NODE_SIZE: u64 = 24;
const TEXT_SIZE: u64 = 28;
const TAG_START_FIXED_SIZE: u64 = 36;
const ATTRIBUTE_SIZE: u64 = 20;
const TYPED_VALUE_SIZE: u16 = 8;

/// One attribute record of a tag start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    pub namespace_id: i32,
    pub name_id: u32,
    pub raw_value_id: i32,
    /// Raw `size:u16 | res0:u8 | data_type:u8` word of the typed value.
    pub value_type: u32,
    pub typed_value: u32,
}

impl Attribute {
    /// The `Res_value` data type stored in the top byte of `value_type`.
    pub fn data_type(&self) -> u8 {
        (self.value_type >> 24) as u8
    }

    pub fn raw_value_id(&self) -> Option<u32> {
        u32::try_from(self.raw_value_id).ok()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XmlEvent {
    NamespaceStart {
        line: u32,
        prefix_id: i32,
        uri_id: i32,
    },
    NamespaceEnd {
        line: u32,
        prefix_id: i32,
        uri_id: i32,
    },
    TagStart {
        line: u32,
        namespace_id: i32,
        name_id: u32,
        attributes: Vec<Attribute>,
    },
    TagEnd {
        line: u32,
        namespace_id: i32,
        name_id: u32,
    },
    Text {
        line: u32,
        value_id: u32,
    },
}

impl XmlEvent {
    pub fn line(&self) -> u32 {
        match self {
            XmlEvent::NamespaceStart { line, .. }
            | XmlEvent::NamespaceEnd { line, .. }
            | XmlEvent::TagStart { line, .. }
            | XmlEvent::TagEnd { line, .. }
            | XmlEvent::Text { line, .. } => *line,
        }
    }

    pub fn chunk_type(&self) -> ChunkType {
        match self {
            XmlEvent::NamespaceStart { .. } => ChunkType::NamespaceStart,
            XmlEvent::NamespaceEnd { .. } => ChunkType::NamespaceEnd,
            XmlEvent::TagStart { .. } => ChunkType::TagStart,
            XmlEvent::TagEnd { .. } => ChunkType::TagEnd,
            XmlEvent::Text { .. } => ChunkType::Text,
        }
    }
}

/// Reads string ids and checks them against the size of the string pool.
struct StringRefs {
    len: usize,
}

impl StringRefs {
    fn check(&self, id: u32, what: &'static str, offset: u64) -> AxmlResult<()> {
        if id as usize >= self.len {
            return Err(AxmlError::IndexOutOfRange {
                what,
                offset,
                index: i64::from(id),
                len: self.len,
            });
        }
        Ok(())
    }

    fn required(&self, body: &mut ByteCursor<'_>, what: &'static str) -> AxmlResult<u32> {
        let offset = body.position();
        let id = body.read_u32_named(what)?;
        self.check(id, what, offset)?;
        Ok(id)
    }

    fn optional(&self, body: &mut ByteCursor<'_>, what: &'static str) -> AxmlResult<i32> {
        let offset = body.position();
        let id = body.read_i32_named(what)?;
        if id != NO_ENTRY && (id < 0 || id as usize >= self.len) {
            return Err(AxmlError::IndexOutOfRange {
                what,
                offset,
                index: i64::from(id),
                len: self.len,
            });
        }
        Ok(id)
    }
}

/// Decodes one node chunk into an [`XmlEvent`].
///
/// `body` covers the chunk body only. `string_count` is the size of the pool
/// decoded so far; a node met before the pool can reference nothing.
pub fn decode_event(
    kind: ChunkType,
    header: &ChunkHeader,
    body: &mut ByteCursor<'_>,
    string_count: usize,
) -> AxmlResult<XmlEvent> {
    let refs = StringRefs { len: string_count };
    match kind {
        ChunkType::NamespaceStart | ChunkType::NamespaceEnd => {
            expect_size(header, kind.name(), NODE_SIZE)?;
            let line = body.read_u32_named("line number")?;
            read_sentinel(body)?;
            let prefix_id = refs.optional(body, "namespace prefix")?;
            let uri_id = refs.optional(body, "namespace uri")?;
            Ok(if kind == ChunkType::NamespaceStart {
                XmlEvent::NamespaceStart {
                    line,
                    prefix_id,
                    uri_id,
                }
            } else {
                XmlEvent::NamespaceEnd {
                    line,
                    prefix_id,
                    uri_id,
                }
            })
        }
        ChunkType::TagStart => decode_tag_start(header, body, &refs),
        ChunkType::TagEnd => {
            expect_size(header, kind.name(), NODE_SIZE)?;
            let line = body.read_u32_named("line number")?;
            read_sentinel(body)?;
            let namespace_id = refs.optional(body, "tag namespace")?;
            let name_id = refs.required(body, "tag name")?;
            Ok(XmlEvent::TagEnd {
                line,
                namespace_id,
                name_id,
            })
        }
        ChunkType::Text => {
            expect_size(header, kind.name(), TEXT_SIZE)?;
            let line = body.read_u32_named("line number")?;
            read_sentinel(body)?;
            let value_id = refs.required(body, "text value")?;
            // Trailing typed value; text nodes always carry the string itself.
            read_typed_value_size(body)?;
            body.read_u8_named("typed value reserved")?;
            body.read_u8_named("typed value type")?;
            body.read_u32_named("typed value data")?;
            Ok(XmlEvent::Text { line, value_id })
        }
        ChunkType::StringPool | ChunkType::ResourceIds => Err(AxmlError::UnknownChunkType {
            offset: header.offset,
            chunk_type: header.kind,
        }),
    }
}

fn decode_tag_start(
    header: &ChunkHeader,
    body: &mut ByteCursor<'_>,
    refs: &StringRefs,
) -> AxmlResult<XmlEvent> {
    if u64::from(header.declared_size) < TAG_START_FIXED_SIZE {
        return Err(AxmlError::SizeMismatch {
            what: "tag start",
            offset: header.offset,
            declared: u64::from(header.declared_size),
            consumed: TAG_START_FIXED_SIZE,
        });
    }
    let line = body.read_u32_named("line number")?;
    read_sentinel(body)?;
    let namespace_id = refs.optional(body, "tag namespace")?;
    let name_id = refs.required(body, "tag name")?;
    let flags_offset = body.position();
    let flags = body.read_u32_named("tag flags")?;
    if flags != TAG_START_FLAGS {
        return Err(AxmlError::BadMagic {
            what: "tag start flags",
            offset: flags_offset,
            expected: u64::from(TAG_START_FLAGS),
            found: u64::from(flags),
        });
    }
    let attribute_count = body.read_u16_named("attribute count")?;
    body.read_u16_named("id attribute index")?;
    body.read_u16_named("class attribute index")?;
    body.read_u16_named("style attribute index")?;

    let expected = TAG_START_FIXED_SIZE + ATTRIBUTE_SIZE * u64::from(attribute_count);
    expect_size(header, "tag start", expected)?;

    let mut attributes = Vec::with_capacity(attribute_count as usize);
    for _ in 0..attribute_count {
        attributes.push(decode_attribute(body, refs)?);
    }
    Ok(XmlEvent::TagStart {
        line,
        namespace_id,
        name_id,
        attributes,
    })
}

fn decode_attribute(body: &mut ByteCursor<'_>, refs: &StringRefs) -> AxmlResult<Attribute> {
    let namespace_id = refs.optional(body, "attribute namespace")?;
    let name_id = refs.required(body, "attribute name")?;
    let raw_value_id = refs.optional(body, "attribute raw value")?;
    let value_type_offset = body.position();
    let value_type = body.read_u32_named("attribute value type")?;
    check_typed_value_size(value_type as u16, value_type_offset)?;
    let data_offset = body.position();
    let typed_value = body.read_u32_named("attribute value data")?;
    let attribute = Attribute {
        namespace_id,
        name_id,
        raw_value_id,
        value_type,
        typed_value,
    };
    if attribute.data_type() == TYPE_STRING {
        refs.check(typed_value, "attribute string value", data_offset)?;
    }
    Ok(attribute)
}

fn read_sentinel(body: &mut ByteCursor<'_>) -> AxmlResult<()> {
    let offset = body.position();
    let found = body.read_u32_named("node comment")?;
    if found != SENTINEL {
        return Err(AxmlError::BadSentinel {
            what: "node comment",
            offset,
            found,
        });
    }
    Ok(())
}

fn read_typed_value_size(body: &mut ByteCursor<'_>) -> AxmlResult<()> {
    let offset = body.position();
    let size = body.read_u16_named("typed value size")?;
    check_typed_value_size(size, offset)
}

fn check_typed_value_size(size: u16, offset: u64) -> AxmlResult<()> {
    if size != TYPED_VALUE_SIZE {
        return Err(AxmlError::SizeMismatch {
            what: "typed value",
            offset,
            declared: u64::from(size),
            consumed: u64::from(TYPED_VALUE_SIZE),
        });
    }
    Ok(())
}
