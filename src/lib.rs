//! # AXML
//!
//! A library for decoding Android's compiled binary XML, the format of
//! `AndroidManifest.xml` and compiled layouts inside an APK.
//!
//! A document is a file header followed by chunks: a string pool, an optional
//! resource id table, and namespace/tag/text nodes that refer to pooled strings
//! by index. [`Document::decode`] validates the whole stream and returns the
//! pool, the resource ids and the ordered node events. [`EventReader`] yields
//! the same events lazily, and [`Document::to_tree`] folds them into an
//! [`Element`] tree with resolved names and typed values.
//!
//! # Examples
//!
//! ```no_run
//!  use axml::{Document, Value};
//!
//!  let bytes = std::fs::read("AndroidManifest.xml").unwrap();
//!  let manifest = Document::decode(&bytes).unwrap().to_tree().unwrap();
//!  if let Some(Value::String(package)) = manifest.attribute_value("package") {
//!      println!("package {}", package);
//!  }
//! ```
//!
pub mod chunk;
pub mod cursor;
pub mod document;
pub mod error;
pub mod events;
pub mod reader;
pub mod resource_ids;
pub mod string_pool;
pub mod tree;
pub mod value;

#[cfg(test)]
mod tests;

pub use crate::chunk::{ChunkHeader, ChunkType};
pub use crate::document::Document;
pub use crate::error::{AxmlError, AxmlResult, TreeError};
pub use crate::events::{Attribute, XmlEvent};
pub use crate::reader::{ChunkObserver, EventReader, LogObserver, NoopObserver};
pub use crate::resource_ids::ResourceIdTable;
pub use crate::string_pool::{StringEncoding, StringPool, StringPoolFlags};
pub use crate::tree::{Element, ElementAttribute, NamespaceDecl};
pub use crate::value::Value;
