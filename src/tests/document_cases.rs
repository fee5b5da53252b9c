use pretty_assertions::assert_eq;

use crate::chunk::{write_u32, CHUNK_RESOURCE_IDS};
use crate::tests::fixtures::{
    document, manifest_chunks, manifest_document, namespace_chunk, resource_ids_chunk,
    tag_end_chunk, tag_start_chunk, tag_start_chunk_with_flags, typed_attribute,
    utf16_pool_chunk, utf8_pool_chunk, ANDROID_NAMESPACE_URI,
};
use crate::value::TYPE_INT_DEC;
use crate::{
    AxmlError, Document, Element, EventReader, LogObserver, StringEncoding, StringPool, TreeError,
    Value, XmlEvent,
};

const VERSION_CODE_STRINGS: [&str; 3] = ["android", ANDROID_NAMESPACE_URI, "versionCode"];

#[test]
fn decodes_namespace_and_tag_referencing_pool() {
    let bytes = document(&[
        utf16_pool_chunk(&VERSION_CODE_STRINGS),
        namespace_chunk(true, 1, 0, 1),
        tag_start_chunk(1, 1, 2, &[]),
    ]);
    let doc = Document::decode(&bytes).expect("decode document");

    assert_eq!(doc.string_pool().encoding(), StringEncoding::Utf16Le);
    assert_eq!(doc.string_pool().strings(), &VERSION_CODE_STRINGS);
    assert_eq!(doc.resource_ids(), None);
    assert_eq!(
        doc.events()[0],
        XmlEvent::NamespaceStart {
            line: 1,
            prefix_id: 0,
            uri_id: 1,
        }
    );
    match &doc.events()[1] {
        XmlEvent::TagStart {
            name_id,
            namespace_id,
            ..
        } => {
            assert_eq!(doc.string(*name_id), Some("versionCode"));
            assert_eq!(doc.resolve(*namespace_id), Some(ANDROID_NAMESPACE_URI));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn decodes_realistic_manifest() {
    let doc = Document::decode(&manifest_document()).expect("decode manifest");
    assert_eq!(doc.events().len(), 6);
    assert_eq!(
        doc.resource_ids().map(|table| table.ids().to_vec()),
        Some(vec![0x0101_021b, 0x0101_0001, 0x0101_000f])
    );
    assert_eq!(doc.resource_id(0), Some(0x0101_021b));
    assert_eq!(doc.resource_id(7), None);

    let lines: Vec<u32> = doc.events().iter().map(XmlEvent::line).collect();
    assert_eq!(lines, vec![2, 2, 3, 3, 4, 4]);
    assert_eq!(doc.clone().into_events(), doc.events());

    for event in doc.events() {
        if let XmlEvent::TagStart { attributes, .. } = event {
            for attr in attributes {
                assert!((attr.name_id as usize) < doc.string_pool().len());
            }
        }
    }
}

#[test]
fn decodes_utf8_pool_documents() {
    let bytes = document(&[
        utf8_pool_chunk(&VERSION_CODE_STRINGS),
        namespace_chunk(true, 1, 0, 1),
        tag_start_chunk(1, -1, 2, &[]),
        tag_end_chunk(1, -1, 2),
        namespace_chunk(false, 1, 0, 1),
    ]);
    let doc = Document::decode(&bytes).expect("decode utf-8 document");
    assert_eq!(doc.string_pool().encoding(), StringEncoding::Utf8);
    assert_eq!(doc.string(1), Some(ANDROID_NAMESPACE_URI));
    assert_eq!(doc.events().len(), 4);
}

#[test]
fn flag_mismatch_reports_flag_field_offset() {
    let pool = utf16_pool_chunk(&VERSION_CODE_STRINGS);
    let namespace = namespace_chunk(true, 1, 0, 1);
    let tag_offset = (8 + pool.len() + namespace.len()) as u64;
    let bytes = document(&[
        pool,
        namespace,
        tag_start_chunk_with_flags(1, -1, 2, &[], 0x0014_0013),
    ]);
    let err = Document::decode(&bytes).unwrap_err();
    assert_eq!(
        err,
        AxmlError::BadMagic {
            what: "tag start flags",
            offset: tag_offset + 24,
            expected: 0x0014_0014,
            found: 0x0014_0013,
        }
    );
    assert_eq!(err.offset(), tag_offset + 24);
}

#[test]
fn resource_chunk_of_thirteen_bytes_is_size_mismatch() {
    let pool = utf16_pool_chunk(&VERSION_CODE_STRINGS);
    let chunk_offset = (8 + pool.len()) as u64;
    let mut ids = Vec::new();
    write_u32(&mut ids, CHUNK_RESOURCE_IDS);
    write_u32(&mut ids, 13);
    write_u32(&mut ids, 0x0101_021b);
    ids.extend_from_slice(&[0, 0, 0, 0]);
    let bytes = document(&[pool, ids]);
    let err = Document::decode(&bytes).unwrap_err();
    assert_eq!(
        err,
        AxmlError::SizeMismatch {
            what: "resource id chunk",
            offset: chunk_offset,
            declared: 13,
            consumed: 12,
        }
    );
}

#[test]
fn attribute_reference_outside_pool_fails() {
    let bytes = document(&[
        utf16_pool_chunk(&VERSION_CODE_STRINGS),
        tag_start_chunk(1, -1, 2, &[typed_attribute(1, 3, TYPE_INT_DEC, 1)]),
    ]);
    assert!(matches!(
        Document::decode(&bytes),
        Err(AxmlError::IndexOutOfRange {
            what: "attribute name",
            index: 3,
            len: 3,
            ..
        })
    ));
}

#[test]
fn unknown_chunk_type_is_surfaced() {
    let pool = utf16_pool_chunk(&VERSION_CODE_STRINGS);
    let offset = (8 + pool.len()) as u64;
    let mut unknown = Vec::new();
    write_u32(&mut unknown, 0x0010_0105);
    write_u32(&mut unknown, 12);
    write_u32(&mut unknown, 0);
    let bytes = document(&[pool, unknown]);
    assert_eq!(
        Document::decode(&bytes).unwrap_err(),
        AxmlError::UnknownChunkType {
            offset,
            chunk_type: 0x0010_0105,
        }
    );
}

#[test]
fn wrong_file_magic_is_bad_magic() {
    let mut bytes = manifest_document();
    bytes[0..4].copy_from_slice(&0x0002_0002u32.to_le_bytes());
    assert!(matches!(
        Document::decode(&bytes),
        Err(AxmlError::BadMagic { what: "file magic", offset: 0, .. })
    ));
}

#[test]
fn trailing_bytes_after_declared_size_are_rejected() {
    let mut bytes = manifest_document();
    let declared = bytes.len() as u64;
    bytes.extend_from_slice(&[0; 8]);
    assert_eq!(
        Document::decode(&bytes).unwrap_err(),
        AxmlError::SizeMismatch {
            what: "document",
            offset: 0,
            declared,
            consumed: declared + 8,
        }
    );
}

#[test]
fn duplicate_tables_are_rejected() {
    let pool = utf16_pool_chunk(&VERSION_CODE_STRINGS);
    let second_offset = (8 + pool.len()) as u64;
    let bytes = document(&[pool.clone(), pool]);
    assert!(matches!(
        Document::decode(&bytes),
        Err(AxmlError::DuplicateChunk { offset, .. }) if offset == second_offset
    ));

    let bytes = document(&[
        utf16_pool_chunk(&VERSION_CODE_STRINGS),
        resource_ids_chunk(&[1]),
        resource_ids_chunk(&[2]),
    ]);
    assert!(matches!(
        Document::decode(&bytes),
        Err(AxmlError::DuplicateChunk { chunk_type: CHUNK_RESOURCE_IDS, .. })
    ));
}

#[test]
fn document_without_pool_is_rejected() {
    let bytes = document(&[namespace_chunk(true, 1, -1, -1)]);
    let total = bytes.len() as u64;
    assert_eq!(
        Document::decode(&bytes).unwrap_err(),
        AxmlError::MissingStringPool { offset: total }
    );
}

#[test]
fn nodes_before_pool_cannot_reference_strings() {
    let mut chunks = manifest_chunks();
    chunks.swap(0, 2);
    assert!(matches!(
        Document::decode(&document(&chunks)),
        Err(AxmlError::IndexOutOfRange { len: 0, .. })
    ));
}

#[test]
fn header_only_document_has_no_events() {
    let bytes = document(&[utf16_pool_chunk(&[])]);
    let doc = Document::decode(&bytes).expect("decode empty document");
    assert!(doc.events().is_empty());
    assert!(doc.string_pool().is_empty());
}

#[test]
fn public_types_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Document>();
    assert_send_sync::<StringPool>();
    assert_send_sync::<EventReader<'static>>();
    assert_send_sync::<EventReader<'static, LogObserver>>();
    assert_send_sync::<AxmlError>();
    assert_send_sync::<TreeError>();
    assert_send_sync::<Element>();
    assert_send_sync::<Value>();
}
