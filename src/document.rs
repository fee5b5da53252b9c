use serde::{Deserialize, Serialize};

use crate::error::{AxmlError, AxmlResult, TreeError};
use crate::events::XmlEvent;
use crate::reader::{ChunkObserver, EventReader, NoopObserver};
use crate::resource_ids::ResourceIdTable;
use crate::string_pool::StringPool;
use crate::tree::{self, Element};

/// A fully decoded and validated binary XML document.
///
/// Events refer to the string pool by id only; use [`Document::string`] and
/// [`Document::resolve`] to look them up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    string_pool: StringPool,
    resource_ids: Option<ResourceIdTable>,
    events: Vec<XmlEvent>,
}

impl Document {
    /// Decodes a whole document, failing on the first structural error.
    ///
    /// # Examples
    ///
    /// ```no_run
    ///  use axml::Document;
    ///
    ///  let bytes = std::fs::read("AndroidManifest.xml").unwrap();
    ///  let document = Document::decode(&bytes).unwrap();
    ///  println!("{} events, {} strings", document.events().len(), document.string_pool().len());
    /// ```
    pub fn decode(bytes: &[u8]) -> AxmlResult<Self> {
        Self::decode_with_observer(bytes, NoopObserver)
    }

    pub fn decode_with_observer<O: ChunkObserver>(bytes: &[u8], observer: O) -> AxmlResult<Self> {
        let mut reader = EventReader::with_observer(bytes, observer);
        let events = reader.by_ref().collect::<AxmlResult<Vec<_>>>()?;
        let end = reader.total_size() as u64;
        let (string_pool, resource_ids) = reader.into_tables();
        let string_pool = string_pool.ok_or(AxmlError::MissingStringPool { offset: end })?;
        Ok(Document {
            string_pool,
            resource_ids,
            events,
        })
    }

    pub fn string_pool(&self) -> &StringPool {
        &self.string_pool
    }

    pub fn resource_ids(&self) -> Option<&ResourceIdTable> {
        self.resource_ids.as_ref()
    }

    pub fn events(&self) -> &[XmlEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<XmlEvent> {
        self.events
    }

    pub fn string(&self, id: u32) -> Option<&str> {
        self.string_pool.get(id)
    }

    /// Looks up a signed id such as a namespace or raw value, where `-1` is "none".
    pub fn resolve(&self, id: i32) -> Option<&str> {
        self.string_pool.resolve(id)
    }

    /// Resource id of the attribute whose name is string `name_id`, if mapped.
    pub fn resource_id(&self, name_id: u32) -> Option<u32> {
        self.resource_ids.as_ref().and_then(|table| table.get(name_id))
    }

    /// Folds the event list into an element tree.
    pub fn to_tree(&self) -> Result<Element, TreeError> {
        tree::build(self)
    }
}
