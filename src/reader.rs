use log::trace;

use crate::chunk::{self, ChunkHeader, ChunkType, AXML_FILE_MAGIC, CHUNK_HEADER_SIZE};
use crate::cursor::ByteCursor;
use crate::error::{AxmlError, AxmlResult};
use crate::events::{decode_event, XmlEvent};
use crate::resource_ids::ResourceIdTable;
use crate::string_pool::StringPool;

/// Receives one call per chunk, before the chunk is decoded.
///
/// Decoding never depends on the observer; it only exists for tracing.
pub trait ChunkObserver {
    fn on_chunk(&mut self, header: &ChunkHeader, chunk_type: ChunkType);
}

impl<T: ChunkObserver + ?Sized> ChunkObserver for &mut T {
    fn on_chunk(&mut self, header: &ChunkHeader, chunk_type: ChunkType) {
        (**self).on_chunk(header, chunk_type)
    }
}

/// Observer that ignores every chunk.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl ChunkObserver for NoopObserver {
    fn on_chunk(&mut self, _header: &ChunkHeader, _chunk_type: ChunkType) {}
}

/// Observer that traces every chunk through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl ChunkObserver for LogObserver {
    fn on_chunk(&mut self, header: &ChunkHeader, chunk_type: ChunkType) {
        trace!(
            "@{:04X}[{:04X}]: {}",
            header.offset,
            header.declared_size,
            chunk_type.name()
        );
    }
}

/// Lazily decodes the node events of a document.
///
/// String pool and resource id chunks are absorbed as they are met and can be
/// read back through [`EventReader::string_pool`] and [`EventReader::resource_ids`].
/// The iterator stops after the first error. Decoding is a pure function of
/// the input, so a new reader over the same bytes yields the same sequence.
pub struct EventReader<'a, O = NoopObserver> {
    cursor: ByteCursor<'a>,
    total_size: usize,
    started: bool,
    finished: bool,
    string_pool: Option<StringPool>,
    resource_ids: Option<ResourceIdTable>,
    observer: O,
}

impl<'a> EventReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        EventReader::with_observer(bytes, NoopObserver)
    }
}

impl<'a, O: ChunkObserver> EventReader<'a, O> {
    pub fn with_observer(bytes: &'a [u8], observer: O) -> Self {
        EventReader {
            cursor: ByteCursor::new(bytes),
            total_size: bytes.len(),
            started: false,
            finished: false,
            string_pool: None,
            resource_ids: None,
            observer,
        }
    }

    pub fn string_pool(&self) -> Option<&StringPool> {
        self.string_pool.as_ref()
    }

    pub fn resource_ids(&self) -> Option<&ResourceIdTable> {
        self.resource_ids.as_ref()
    }

    /// Size declared by the file header.
    ///
    /// Until the first call to `next` reads the header this is the length of
    /// the input buffer.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn into_tables(self) -> (Option<StringPool>, Option<ResourceIdTable>) {
        (self.string_pool, self.resource_ids)
    }

    fn read_file_header(&mut self) -> AxmlResult<()> {
        let magic = self.cursor.read_u32_named("file magic")?;
        if magic != AXML_FILE_MAGIC {
            return Err(AxmlError::BadMagic {
                what: "file magic",
                offset: 0,
                expected: u64::from(AXML_FILE_MAGIC),
                found: u64::from(magic),
            });
        }
        let size_offset = self.cursor.position();
        let declared = self.cursor.read_u32_named("file size")?;
        let actual = self.cursor.len() as u64;
        if declared < CHUNK_HEADER_SIZE {
            return Err(AxmlError::SizeMismatch {
                what: "document",
                offset: 0,
                declared: u64::from(declared),
                consumed: u64::from(CHUNK_HEADER_SIZE),
            });
        }
        if u64::from(declared) > actual {
            return Err(AxmlError::TruncatedInput {
                what: "document",
                offset: size_offset,
                need: declared as usize - CHUNK_HEADER_SIZE as usize,
                have: self.cursor.remaining(),
            });
        }
        if u64::from(declared) < actual {
            return Err(AxmlError::SizeMismatch {
                what: "document",
                offset: 0,
                declared: u64::from(declared),
                consumed: actual,
            });
        }
        self.total_size = declared as usize;
        Ok(())
    }

    fn next_event(&mut self) -> AxmlResult<Option<XmlEvent>> {
        if !self.started {
            self.started = true;
            self.read_file_header()?;
        }
        loop {
            if self.cursor.relative_position() >= self.total_size {
                return Ok(None);
            }
            let header = chunk::read_header(&mut self.cursor)?;
            let chunk_type = header.chunk_type().ok_or(AxmlError::UnknownChunkType {
                offset: header.offset,
                chunk_type: header.kind,
            })?;
            self.observer.on_chunk(&header, chunk_type);

            let mut body = self.cursor.sub_cursor(header.body_len(), "chunk body")?;
            let event = match chunk_type {
                ChunkType::StringPool => {
                    if self.string_pool.is_some() {
                        return Err(duplicate(&header));
                    }
                    self.string_pool = Some(StringPool::decode(&mut body, &header)?);
                    None
                }
                ChunkType::ResourceIds => {
                    if self.resource_ids.is_some() {
                        return Err(duplicate(&header));
                    }
                    let table = ResourceIdTable::decode(&mut body, &header)?;
                    chunk::finish(&header, chunk_type.name(), &body)?;
                    self.resource_ids = Some(table);
                    None
                }
                _ => {
                    let string_count = self.string_pool.as_ref().map_or(0, StringPool::len);
                    let event = decode_event(chunk_type, &header, &mut body, string_count)?;
                    chunk::finish(&header, chunk_type.name(), &body)?;
                    Some(event)
                }
            };
            self.cursor.seek_absolute(header.end() as usize)?;
            if event.is_some() {
                return Ok(event);
            }
        }
    }
}

fn duplicate(header: &ChunkHeader) -> AxmlError {
    AxmlError::DuplicateChunk {
        offset: header.offset,
        chunk_type: header.kind,
    }
}

impl<O: ChunkObserver> Iterator for EventReader<'_, O> {
    type Item = AxmlResult<XmlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl<O: ChunkObserver> std::iter::FusedIterator for EventReader<'_, O> {}
