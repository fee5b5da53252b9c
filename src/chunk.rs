use serde::{Deserialize, Serialize};

use crate::cursor::ByteCursor;
use crate::error::{AxmlError, AxmlResult};

/// Magic of the file-level header that opens every document.
pub const AXML_FILE_MAGIC: u32 = 0x0008_0003;

pub const CHUNK_STRING_POOL: u32 = 0x001C_0001;
pub const CHUNK_RESOURCE_IDS: u32 = 0x0008_0180;
pub const CHUNK_NAMESPACE_START: u32 = 0x0010_0100;
pub const CHUNK_NAMESPACE_END: u32 = 0x0010_0101;
pub const CHUNK_TAG_START: u32 = 0x0010_0102;
pub const CHUNK_TAG_END: u32 = 0x0010_0103;
pub const CHUNK_TEXT: u32 = 0x0010_0104;

/// Size of the `(type, size)` header at the start of every chunk.
pub const CHUNK_HEADER_SIZE: u32 = 8;

/// The closed set of chunk types that may follow the file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChunkType {
    StringPool,
    ResourceIds,
    NamespaceStart,
    NamespaceEnd,
    TagStart,
    TagEnd,
    Text,
}

impl ChunkType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            CHUNK_STRING_POOL => Some(ChunkType::StringPool),
            CHUNK_RESOURCE_IDS => Some(ChunkType::ResourceIds),
            CHUNK_NAMESPACE_START => Some(ChunkType::NamespaceStart),
            CHUNK_NAMESPACE_END => Some(ChunkType::NamespaceEnd),
            CHUNK_TAG_START => Some(ChunkType::TagStart),
            CHUNK_TAG_END => Some(ChunkType::TagEnd),
            CHUNK_TEXT => Some(ChunkType::Text),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            ChunkType::StringPool => CHUNK_STRING_POOL,
            ChunkType::ResourceIds => CHUNK_RESOURCE_IDS,
            ChunkType::NamespaceStart => CHUNK_NAMESPACE_START,
            ChunkType::NamespaceEnd => CHUNK_NAMESPACE_END,
            ChunkType::TagStart => CHUNK_TAG_START,
            ChunkType::TagEnd => CHUNK_TAG_END,
            ChunkType::Text => CHUNK_TEXT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChunkType::StringPool => "string pool",
            ChunkType::ResourceIds => "resource ids",
            ChunkType::NamespaceStart => "namespace start",
            ChunkType::NamespaceEnd => "namespace end",
            ChunkType::TagStart => "tag start",
            ChunkType::TagEnd => "tag end",
            ChunkType::Text => "text",
        }
    }
}

/// The universal `(type, size)` header, plus where it was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub kind: u32,
    pub declared_size: u32,
    pub offset: u64,
}

impl ChunkHeader {
    pub fn chunk_type(&self) -> Option<ChunkType> {
        ChunkType::from_raw(self.kind)
    }

    /// Bytes after the generic header; zero for an undersized header.
    pub fn body_len(&self) -> usize {
        self.declared_size.saturating_sub(CHUNK_HEADER_SIZE) as usize
    }

    /// Absolute offset one past the last byte of the chunk.
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.declared_size)
    }
}

/// Reads a chunk header and checks its size against what is left of the cursor.
///
/// The type is not interpreted here.
pub fn read_header(cursor: &mut ByteCursor<'_>) -> AxmlResult<ChunkHeader> {
    let offset = cursor.position();
    if cursor.remaining() < CHUNK_HEADER_SIZE as usize {
        return Err(AxmlError::TruncatedInput {
            what: "chunk header",
            offset,
            need: CHUNK_HEADER_SIZE as usize,
            have: cursor.remaining(),
        });
    }
    let kind = cursor.read_u32_named("chunk type")?;
    let declared_size = cursor.read_u32_named("chunk size")?;
    if declared_size < CHUNK_HEADER_SIZE {
        return Err(AxmlError::SizeMismatch {
            what: "chunk header",
            offset,
            declared: u64::from(declared_size),
            consumed: u64::from(CHUNK_HEADER_SIZE),
        });
    }
    let header = ChunkHeader {
        kind,
        declared_size,
        offset,
    };
    if header.body_len() > cursor.remaining() {
        return Err(AxmlError::TruncatedInput {
            what: "chunk body",
            offset: cursor.position(),
            need: header.body_len(),
            have: cursor.remaining(),
        });
    }
    Ok(header)
}

/// Fails with `SizeMismatch` unless `expected` matches the declared size.
pub(crate) fn expect_size(header: &ChunkHeader, what: &'static str, expected: u64) -> AxmlResult<()> {
    if u64::from(header.declared_size) != expected {
        return Err(AxmlError::SizeMismatch {
            what,
            offset: header.offset,
            declared: u64::from(header.declared_size),
            consumed: expected,
        });
    }
    Ok(())
}

/// Checks that a chunk decoder consumed its whole body.
pub(crate) fn finish(header: &ChunkHeader, what: &'static str, body: &ByteCursor<'_>) -> AxmlResult<()> {
    if body.remaining() != 0 {
        return Err(AxmlError::SizeMismatch {
            what,
            offset: header.offset,
            declared: u64::from(header.declared_size),
            consumed: u64::from(CHUNK_HEADER_SIZE) + body.relative_position() as u64,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn write_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

/// Starts a chunk with a zero size placeholder and returns its start index.
pub(crate) fn begin_chunk(buffer: &mut Vec<u8>, kind: u32) -> usize {
    let start = buffer.len();
    write_u32(buffer, kind);
    write_u32(buffer, 0);
    start
}

/// Patches the size placeholder written by [`begin_chunk`].
pub(crate) fn finalize_chunk(buffer: &mut Vec<u8>, chunk_start: usize) {
    let size = (buffer.len() - chunk_start) as u32;
    buffer[chunk_start + 4..chunk_start + 8].copy_from_slice(&size.to_le_bytes());
}
