#![allow(missing_docs)]

use std::sync::Arc;

use relcode::aggregate::StructCodec;
use relcode::container::VectorCodec;
use relcode::primitive::{primitive, PrimitiveKind};
use relcode::string::StringCodec;
use relcode::{Relcode, RelcodeReader, Value};
use tempfile::NamedTempFile;

fn game_codec() -> StructCodec {
    StructCodec::new(
        "game_state",
        vec![
            ("level".to_string(), primitive(PrimitiveKind::U32)),
            ("score".to_string(), primitive(PrimitiveKind::U64)),
            ("player".to_string(), Arc::new(StringCodec::new()) as _),
            (
                "inventory".to_string(),
                Arc::new(VectorCodec::new(Arc::new(StringCodec::new()))) as _,
            ),
        ],
    )
}

fn game_value() -> Value {
    Value::Struct(vec![
        ("level".to_string(), Value::U32(7)),
        ("score".to_string(), Value::U64(123_456)),
        ("player".to_string(), Value::Str("slot one".into())),
        (
            "inventory".to_string(),
            Value::List(vec![
                Value::Str("sword".into()),
                Value::Str("potion of invisibility".into()),
            ]),
        ),
    ])
}

#[test]
fn save_then_open_eagerly() {
    let codec = game_codec();
    let value = game_value();

    // 1. Save to disk.
    let file = NamedTempFile::new().unwrap();
    Relcode::save(file.path(), &codec, &value).unwrap();

    // 2. Map it back and decode the root.
    let reader = RelcodeReader::open(file.path()).unwrap();
    assert_eq!(reader.decode_root(&codec).unwrap(), value);
}

#[test]
fn mapped_file_supports_lazy_access() {
    let codec = game_codec();
    let file = NamedTempFile::new().unwrap();
    Relcode::save(file.path(), &codec, &game_value()).unwrap();

    let reader = RelcodeReader::open(file.path()).unwrap();
    let lazy = reader.access_root(&codec).unwrap();

    // Individual fields come straight out of the map.
    assert_eq!(lazy.field("level").unwrap(), Value::U32(7));
    assert_eq!(lazy.field("player").unwrap(), Value::Str("slot one".into()));
}

#[test]
fn in_memory_encode_matches_file_contents() {
    let codec = game_codec();
    let value = game_value();

    let bytes = Relcode::encode(&codec, &value).unwrap();
    let file = NamedTempFile::new().unwrap();
    Relcode::save(file.path(), &codec, &value).unwrap();

    let reader = RelcodeReader::open(file.path()).unwrap();
    assert_eq!(reader.bytes(), &bytes[..]);
    assert_eq!(reader.len(), bytes.len());
}

#[test]
fn truncated_buffer_is_a_decode_error() {
    let codec = game_codec();
    assert!(Relcode::decode(&codec, &[0u8; 3]).is_err());
}
