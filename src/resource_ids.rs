use serde::{Deserialize, Serialize};

use crate::chunk::{
    begin_chunk, finalize_chunk, read_header, write_u32, ChunkHeader, CHUNK_HEADER_SIZE,
    CHUNK_RESOURCE_IDS,
};
use crate::cursor::ByteCursor;
use crate::error::{AxmlError, AxmlResult};

/// The flat table of resource ids that follows the string pool.
///
/// Entry `i` is the resource id of the attribute whose name is string `i`.
/// Ids are kept exactly as found; nothing is inferred.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdTable {
    ids: Vec<u32>,
}

impl ResourceIdTable {
    pub fn new(ids: Vec<u32>) -> Self {
        ResourceIdTable { ids }
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn ids_mut(&mut self) -> &mut Vec<u32> {
        &mut self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resource id mapped to the attribute name with string id `name_id`.
    pub fn get(&self, name_id: u32) -> Option<u32> {
        self.ids.get(name_id as usize).copied()
    }

    /// Decodes the body of a resource id chunk.
    pub fn decode(body: &mut ByteCursor<'_>, header: &ChunkHeader) -> AxmlResult<Self> {
        let declared = header.declared_size;
        if declared % 4 != 0 || declared < CHUNK_HEADER_SIZE {
            let whole = declared.max(CHUNK_HEADER_SIZE) & !3;
            return Err(AxmlError::SizeMismatch {
                what: "resource id chunk",
                offset: header.offset,
                declared: u64::from(declared),
                consumed: u64::from(whole),
            });
        }
        let count = declared / 4 - 2;
        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            ids.push(body.read_u32_named("resource id")?);
        }
        Ok(ResourceIdTable { ids })
    }

    /// Decodes a standalone resource id chunk, header included.
    pub fn decode_chunk(bytes: &[u8]) -> AxmlResult<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let header = read_header(&mut cursor)?;
        if header.kind != CHUNK_RESOURCE_IDS {
            return Err(AxmlError::BadMagic {
                what: "resource id chunk type",
                offset: header.offset,
                expected: u64::from(CHUNK_RESOURCE_IDS),
                found: u64::from(header.kind),
            });
        }
        let mut body = cursor.sub_cursor(header.body_len(), "resource id chunk")?;
        Self::decode(&mut body, &header)
    }

    /// Serializes the table as a complete chunk.
    ///
    /// The size word is computed from the current ids, so a table edited after
    /// decoding still produces a consistent chunk.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.encoded_len());
        let start = begin_chunk(&mut buffer, CHUNK_RESOURCE_IDS);
        for id in &self.ids {
            write_u32(&mut buffer, *id);
        }
        finalize_chunk(&mut buffer, start);
        buffer
    }

    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_SIZE as usize + 4 * self.ids.len()
    }
}
