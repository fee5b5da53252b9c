use thiserror::Error;

use crate::string_pool::StringEncoding;

/// Result alias for AXML decoding.
pub type AxmlResult<T> = Result<T, AxmlError>;

/// Errors surfaced while decoding a binary XML document.
///
/// Every variant carries the absolute byte offset at which the problem was
/// detected. Decoding stops at the first error; there is no partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AxmlError {
    /// Fewer bytes were available than a field or record needs.
    #[error("truncated input reading {what} at offset {offset:#x}: need {need} bytes, have {have}")]
    TruncatedInput {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    /// A seek landed outside the buffer.
    #[error("seek from offset {offset:#x} to {target} is outside a buffer of {len} bytes")]
    OutOfRange { offset: u64, target: i64, len: usize },

    /// A declared size disagrees with what the record actually occupies.
    #[error("{what} at offset {offset:#x} declares {declared} bytes but decodes to {consumed}")]
    SizeMismatch {
        what: &'static str,
        offset: u64,
        declared: u64,
        consumed: u64,
    },

    /// A fixed constant (file magic, tag flag word, pool counts) is wrong.
    #[error("bad {what} at offset {offset:#x}: expected {expected:#x}, found {found:#x}")]
    BadMagic {
        what: &'static str,
        offset: u64,
        expected: u64,
        found: u64,
    },

    /// The `0xFFFFFFFF` marker of a node header is missing.
    #[error("expected 0xffffffff {what} at offset {offset:#x}, found {found:#010x}")]
    BadSentinel {
        what: &'static str,
        offset: u64,
        found: u32,
    },

    #[error("unknown chunk type {chunk_type:#010x} at offset {offset:#x}")]
    UnknownChunkType { offset: u64, chunk_type: u32 },

    #[error("invalid {encoding} string at offset {offset:#x}: {reason}")]
    InvalidEncoding {
        offset: u64,
        encoding: StringEncoding,
        reason: String,
    },

    /// A string-pool reference points past the table.
    #[error("{what} {index} at offset {offset:#x} is out of range (table has {len} entries)")]
    IndexOutOfRange {
        what: &'static str,
        offset: u64,
        index: i64,
        len: usize,
    },

    /// A chunk that may appear at most once appeared again.
    #[error("duplicate chunk {chunk_type:#010x} at offset {offset:#x}")]
    DuplicateChunk { offset: u64, chunk_type: u32 },

    #[error("document ended at offset {offset:#x} without a string pool")]
    MissingStringPool { offset: u64 },
}

impl AxmlError {
    /// Absolute byte offset at which the error was detected.
    pub fn offset(&self) -> u64 {
        match self {
            AxmlError::TruncatedInput { offset, .. }
            | AxmlError::OutOfRange { offset, .. }
            | AxmlError::SizeMismatch { offset, .. }
            | AxmlError::BadMagic { offset, .. }
            | AxmlError::BadSentinel { offset, .. }
            | AxmlError::UnknownChunkType { offset, .. }
            | AxmlError::InvalidEncoding { offset, .. }
            | AxmlError::IndexOutOfRange { offset, .. }
            | AxmlError::DuplicateChunk { offset, .. }
            | AxmlError::MissingStringPool { offset } => *offset,
        }
    }
}

/// Errors raised while folding decoded events into an [`Element`](crate::tree::Element) tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("document has no root element")]
    Empty,

    #[error("line {line}: string id {id} does not resolve")]
    UnresolvedString { line: u32, id: i64 },

    #[error("line {line}: closing {name} without a matching start")]
    UnexpectedEnd { line: u32, name: String },

    #[error("line {line}: expected closing tag for {expected}, found {found}")]
    MismatchedEnd {
        line: u32,
        expected: String,
        found: String,
    },

    #[error("element {name} is never closed")]
    Unclosed { name: String },

    #[error("line {line}: second root element")]
    MultipleRoots { line: u32 },
}
