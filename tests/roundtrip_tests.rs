#![allow(missing_docs)]

use std::sync::Arc;

use relcode::aggregate::{
    EnumCodec, EnumVariant, StructCodec, TaggedUnionCodec, TaggedVariant, UnionCodec,
};
use relcode::buffer::Reader;
use relcode::RelcodeError;
use relcode::codec::{decode_root, encode_to_vec, Codec};
use relcode::container::{ArrayCodec, BoxCodec, OptionCodec, TupleCodec, VectorCodec, WeakCodec};
use relcode::primitive::{primitive, PrimitiveKind};
use relcode::string::StringCodec;
use relcode::Value;

fn point_codec() -> StructCodec {
    StructCodec::new(
        "point",
        vec![
            ("x".to_string(), primitive(PrimitiveKind::F64)),
            ("y".to_string(), primitive(PrimitiveKind::F64)),
        ],
    )
}

fn point_value(x: f64, y: f64) -> Value {
    Value::Struct(vec![
        ("x".to_string(), Value::F64(x)),
        ("y".to_string(), Value::F64(y)),
    ])
}

#[test]
fn primitive_roundtrips() {
    let cases: Vec<(PrimitiveKind, Value)> = vec![
        (PrimitiveKind::Bool, Value::Bool(true)),
        (PrimitiveKind::I8, Value::I8(-120)),
        (PrimitiveKind::U16, Value::U16(65535)),
        (PrimitiveKind::I32, Value::I32(-1)),
        (PrimitiveKind::U64, Value::U64(u64::MAX)),
        (PrimitiveKind::F32, Value::F32(1.5)),
        (PrimitiveKind::F64, Value::F64(-17.25)),
        (PrimitiveKind::Char, Value::Char('é')),
    ];
    for (kind, value) in cases {
        let codec = primitive(kind);
        let bytes = encode_to_vec(codec.as_ref(), &value).unwrap();
        assert_eq!(bytes.len(), codec.size());
        assert_eq!(decode_root(codec.as_ref(), &bytes).unwrap(), value);
    }
}

#[test]
fn bool_decode_is_strict() {
    let codec = primitive(PrimitiveKind::Bool);
    assert!(decode_root(codec.as_ref(), &[2u8]).is_err());
}

#[test]
fn point_struct_is_sixteen_bytes() {
    let codec = point_codec();
    let value = point_value(42.5, -17.25);

    let bytes = encode_to_vec(&codec, &value).unwrap();
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[0..8], &42.5f64.to_le_bytes());
    assert_eq!(&bytes[8..16], &(-17.25f64).to_le_bytes());

    assert_eq!(decode_root(&codec, &bytes).unwrap(), value);
}

#[test]
fn short_string_is_inline() {
    let codec = StringCodec::new();
    let bytes = encode_to_vec(&codec, &Value::Str("hello".into())).unwrap();

    // 5 UTF-8 bytes fit in the 8-byte slot, padded with 0xFF.
    assert_eq!(bytes, [0x68, 0x65, 0x6C, 0x6C, 0x6F, 0xFF, 0xFF, 0xFF]);
    assert_eq!(
        decode_root(&codec, &bytes).unwrap(),
        Value::Str("hello".into())
    );
}

#[test]
fn eight_byte_string_is_still_inline() {
    let codec = StringCodec::new();
    let bytes = encode_to_vec(&codec, &Value::Str("exactly8".into())).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(&bytes, b"exactly8");
}

#[test]
fn long_string_goes_out_of_line() {
    let codec = StringCodec::new();
    let text = "hello whole world"; // 17 bytes
    let bytes = encode_to_vec(&codec, &Value::Str(text.into())).unwrap();

    // Payload first, then the 8-byte root: marker word + relative pointer.
    let root = bytes.len() - 8;
    assert_eq!(&bytes[..17], text.as_bytes());
    // The top two bits of the first root byte distinguish out-of-line (10)
    // from inline (anything else).
    assert_eq!(bytes[root] & 0xC0, 0x80);
    assert_eq!(bytes[root] & 0x3F, 17);

    let delta = i32::from_le_bytes(bytes[root + 4..root + 8].try_into().unwrap());
    assert_eq!(root as i64 + 4 + i64::from(delta), 0);

    assert_eq!(decode_root(&codec, &bytes).unwrap(), Value::Str(text.into()));
}

#[test]
fn very_long_string_marker_spreads_length() {
    let codec = StringCodec::new();
    let text = "x".repeat(1000);
    let bytes = encode_to_vec(&codec, &Value::Str(text.clone())).unwrap();
    assert_eq!(decode_root(&codec, &bytes).unwrap(), Value::Str(text));
}

#[test]
fn empty_string_roundtrips() {
    let codec = StringCodec::new();
    let bytes = encode_to_vec(&codec, &Value::Str(String::new())).unwrap();
    assert_eq!(bytes, [0xFF; 8]);
    assert_eq!(
        decode_root(&codec, &bytes).unwrap(),
        Value::Str(String::new())
    );
}

#[test]
fn vector_of_u32() {
    let codec = VectorCodec::new(primitive(PrimitiveKind::U32));
    let value = Value::List((1u32..=5).map(Value::U32).collect());

    let bytes = encode_to_vec(&codec, &value).unwrap();
    // 5 elements of 4 bytes, then the 8-byte root.
    assert_eq!(bytes.len(), 28);
    let root = 20;
    let delta = i32::from_le_bytes(bytes[root..root + 4].try_into().unwrap());
    assert_eq!(root as i64 + i64::from(delta), 0);
    let len = u32::from_le_bytes(bytes[root + 4..root + 8].try_into().unwrap());
    assert_eq!(len, 5);

    assert_eq!(decode_root(&codec, &bytes).unwrap(), value);
}

#[test]
fn empty_vector_has_null_pointer() {
    let codec = VectorCodec::new(primitive(PrimitiveKind::U32));
    let bytes = encode_to_vec(&codec, &Value::List(vec![])).unwrap();
    assert_eq!(bytes, [0; 8]);
    assert_eq!(decode_root(&codec, &bytes).unwrap(), Value::List(vec![]));
}

#[test]
fn option_of_string_is_twelve_bytes() {
    let codec = OptionCodec::new(Arc::new(StringCodec::new()));
    assert_eq!(codec.size(), 12);

    let some = Value::Option(Some(Box::new(Value::Str("hi".into()))));
    let bytes = encode_to_vec(&codec, &some).unwrap();
    assert_eq!(bytes.len(), 12);
    assert_eq!(bytes[0], 1);
    assert_eq!(decode_root(&codec, &bytes).unwrap(), some);

    let none = Value::Option(None);
    let bytes = encode_to_vec(&codec, &none).unwrap();
    assert_eq!(bytes, [0; 12]);
    assert_eq!(decode_root(&codec, &bytes).unwrap(), none);
}

#[test]
fn small_enum_uses_one_byte_discriminant() {
    let codec = EnumCodec::new(
        "shape",
        vec![
            EnumVariant::unit("empty"),
            EnumVariant::with_payload("circle", primitive(PrimitiveKind::F64)),
            EnumVariant::with_payload("square", primitive(PrimitiveKind::F32)),
        ],
    );
    assert_eq!(codec.discriminant_size(), 1);
    assert_eq!(codec.payload_offset(), 8);
    assert_eq!(codec.size(), 16);

    let circle = Value::Variant("circle".into(), Box::new(Value::F64(2.5)));
    let bytes = encode_to_vec(&codec, &circle).unwrap();
    assert_eq!(bytes[0], 1);
    assert_eq!(decode_root(&codec, &bytes).unwrap(), circle);

    let empty = Value::Variant("empty".into(), Box::new(Value::Unit));
    let bytes = encode_to_vec(&codec, &empty).unwrap();
    assert_eq!(decode_root(&codec, &bytes).unwrap(), empty);
}

#[test]
fn large_enum_uses_two_byte_discriminant() {
    let variants: Vec<EnumVariant> =
        (0..300).map(|i| EnumVariant::unit(format!("v{i}"))).collect();
    let codec = EnumCodec::new("wide", variants);
    assert_eq!(codec.discriminant_size(), 2);
    assert_eq!(codec.size(), 2);

    let value = Value::Variant("v299".into(), Box::new(Value::Unit));
    let bytes = encode_to_vec(&codec, &value).unwrap();
    assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 299);
    assert_eq!(decode_root(&codec, &bytes).unwrap(), value);
}

#[test]
fn out_of_range_discriminant_is_an_error() {
    let codec = EnumCodec::new("pair", vec![EnumVariant::unit("a"), EnumVariant::unit("b")]);
    assert!(decode_root(&codec, &[7u8]).is_err());
}

#[test]
fn boxed_value_is_a_pointer() {
    let codec = BoxCodec::new(Arc::new(point_codec()));
    assert_eq!(codec.size(), 4);

    let value = point_value(1.0, 2.0);
    let bytes = encode_to_vec(&codec, &value).unwrap();
    assert_eq!(bytes.len(), 20);
    assert_eq!(decode_root(&codec, &bytes).unwrap(), value);
}

#[test]
fn weak_null_pointer_is_absent() {
    let codec = WeakCodec::new(primitive(PrimitiveKind::U64));

    let absent = Value::Option(None);
    let bytes = encode_to_vec(&codec, &absent).unwrap();
    assert_eq!(bytes, [0; 4]);
    assert_eq!(decode_root(&codec, &bytes).unwrap(), absent);

    let present = Value::Option(Some(Box::new(Value::U64(9))));
    let bytes = encode_to_vec(&codec, &present).unwrap();
    assert_eq!(decode_root(&codec, &bytes).unwrap(), present);
}

#[test]
fn array_is_inline() {
    let codec = ArrayCodec::new(primitive(PrimitiveKind::U16), 3);
    assert_eq!(codec.size(), 6);

    let value = Value::List(vec![Value::U16(1), Value::U16(2), Value::U16(3)]);
    let bytes = encode_to_vec(&codec, &value).unwrap();
    assert_eq!(bytes.len(), 6);
    assert_eq!(decode_root(&codec, &bytes).unwrap(), value);

    let wrong = Value::List(vec![Value::U16(1)]);
    assert!(encode_to_vec(&codec, &wrong).is_err());
}

#[test]
fn tuple_mixes_field_types() {
    let codec = TupleCodec::new(vec![
        primitive(PrimitiveKind::U8),
        Arc::new(StringCodec::new()),
        primitive(PrimitiveKind::U16),
    ]);
    let value = Value::Tuple(vec![
        Value::U8(7),
        Value::Str("tuple field".into()),
        Value::U16(512),
    ]);
    let bytes = encode_to_vec(&codec, &value).unwrap();
    assert_eq!(decode_root(&codec, &bytes).unwrap(), value);
}

#[test]
fn nested_struct_with_strings_and_vectors() {
    let codec = StructCodec::new(
        "person",
        vec![
            ("name".to_string(), Arc::new(StringCodec::new()) as _),
            ("age".to_string(), primitive(PrimitiveKind::U32)),
            (
                "scores".to_string(),
                Arc::new(VectorCodec::new(primitive(PrimitiveKind::I32))) as _,
            ),
            (
                "home".to_string(),
                Arc::new(OptionCodec::new(Arc::new(point_codec()))) as _,
            ),
        ],
    );
    let value = Value::Struct(vec![
        ("name".to_string(), Value::Str("Ada Lovelace King".into())),
        ("age".to_string(), Value::U32(36)),
        (
            "scores".to_string(),
            Value::List(vec![Value::I32(-5), Value::I32(12)]),
        ),
        (
            "home".to_string(),
            Value::Option(Some(Box::new(point_value(51.5, -0.1)))),
        ),
    ]);

    let bytes = encode_to_vec(&codec, &value).unwrap();
    assert_eq!(decode_root(&codec, &bytes).unwrap(), value);
}

#[test]
fn decode_then_reencode_is_byte_identical() {
    let codec = StructCodec::new(
        "doc",
        vec![
            ("title".to_string(), Arc::new(StringCodec::new()) as _),
            (
                "tags".to_string(),
                Arc::new(VectorCodec::new(Arc::new(StringCodec::new()))) as _,
            ),
            ("revision".to_string(), primitive(PrimitiveKind::U64)),
        ],
    );
    let value = Value::Struct(vec![
        (
            "title".to_string(),
            Value::Str("a deliberately long document title".into()),
        ),
        (
            "tags".to_string(),
            Value::List(vec![
                Value::Str("draft".into()),
                Value::Str("needs-second-review".into()),
            ]),
        ),
        ("revision".to_string(), Value::U64(41)),
    ]);

    let first = encode_to_vec(&codec, &value).unwrap();
    let decoded = decode_root(&codec, &first).unwrap();
    let second = encode_to_vec(&codec, &decoded).unwrap();
    assert_eq!(first, second);
}

fn shape_union() -> UnionCodec {
    // Both variants are structs whose first byte is a self-describing kind.
    let circle = StructCodec::new(
        "circle",
        vec![
            ("kind".to_string(), primitive(PrimitiveKind::U8)),
            ("radius".to_string(), primitive(PrimitiveKind::F32)),
        ],
    );
    let rect = StructCodec::new(
        "rect",
        vec![
            ("kind".to_string(), primitive(PrimitiveKind::U8)),
            ("width".to_string(), primitive(PrimitiveKind::F32)),
            ("height".to_string(), primitive(PrimitiveKind::F32)),
        ],
    );
    UnionCodec::new(
        "shape",
        vec![
            ("circle".to_string(), Arc::new(circle) as _),
            ("rect".to_string(), Arc::new(rect) as _),
        ],
        |reader: Reader<'_>, offset: usize| match reader.read_u8(offset) {
            0 => Ok("circle".to_string()),
            1 => Ok("rect".to_string()),
            other => Err(RelcodeError::Decode(format!("unknown shape kind {other}"))),
        },
    )
}

#[test]
fn untagged_union_roundtrips_both_variants() {
    let codec = shape_union();
    // Size and alignment are the maxima over the variants.
    assert_eq!(codec.size(), 12);
    assert_eq!(codec.align(), 4);

    let circle = Value::Variant(
        "circle".to_string(),
        Box::new(Value::Struct(vec![
            ("kind".to_string(), Value::U8(0)),
            ("radius".to_string(), Value::F32(2.5)),
        ])),
    );
    let rect = Value::Variant(
        "rect".to_string(),
        Box::new(Value::Struct(vec![
            ("kind".to_string(), Value::U8(1)),
            ("width".to_string(), Value::F32(3.0)),
            ("height".to_string(), Value::F32(4.0)),
        ])),
    );

    for value in [circle, rect] {
        let bytes = encode_to_vec(&codec, &value).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(decode_root(&codec, &bytes).unwrap(), value);
    }
}

#[test]
fn untagged_union_pads_narrow_variant_to_union_size() {
    let codec = shape_union();
    let circle = Value::Variant(
        "circle".to_string(),
        Box::new(Value::Struct(vec![
            ("kind".to_string(), Value::U8(0)),
            ("radius".to_string(), Value::F32(1.0)),
        ])),
    );
    let bytes = encode_to_vec(&codec, &circle).unwrap();
    // The circle rep is 8 bytes; the trailing 4 are padding.
    assert_eq!(&bytes[8..], &[0, 0, 0, 0]);
}

#[test]
fn untagged_union_rejects_unknown_variants() {
    let codec = shape_union();
    let unknown = Value::Variant("triangle".to_string(), Box::new(Value::Unit));
    assert!(encode_to_vec(&codec, &unknown).is_err());

    // A kind byte the discriminator does not recognize fails the decode.
    let bytes = [2u8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    assert!(decode_root(&codec, &bytes).is_err());
}

fn metric_union() -> TaggedUnionCodec {
    TaggedUnionCodec::new(
        "metric",
        primitive(PrimitiveKind::U16),
        vec![
            TaggedVariant {
                name: "count".to_string(),
                tag: Value::U16(7),
                payload: primitive(PrimitiveKind::U32),
            },
            TaggedVariant {
                name: "ratio".to_string(),
                tag: Value::U16(9),
                payload: primitive(PrimitiveKind::F32),
            },
        ],
    )
}

#[test]
fn tagged_union_roundtrips_and_writes_tag_first() {
    let codec = metric_union();
    // u16 tag, payload aligned to 4: offsets 0 and 4, total 8.
    assert_eq!(codec.size(), 8);
    assert_eq!(codec.align(), 4);

    let value = Value::Variant("count".to_string(), Box::new(Value::U32(1200)));
    let bytes = encode_to_vec(&codec, &value).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(&bytes[0..2], &7u16.to_le_bytes());
    assert_eq!(&bytes[4..8], &1200u32.to_le_bytes());
    assert_eq!(decode_root(&codec, &bytes).unwrap(), value);

    let ratio = Value::Variant("ratio".to_string(), Box::new(Value::F32(0.5)));
    let bytes = encode_to_vec(&codec, &ratio).unwrap();
    assert_eq!(decode_root(&codec, &bytes).unwrap(), ratio);
}

#[test]
fn tagged_union_rejects_unregistered_tags() {
    let full = metric_union();
    let narrow = TaggedUnionCodec::new(
        "metric",
        primitive(PrimitiveKind::U16),
        vec![TaggedVariant {
            name: "count".to_string(),
            tag: Value::U16(7),
            payload: primitive(PrimitiveKind::U32),
        }],
    );

    let ratio = Value::Variant("ratio".to_string(), Box::new(Value::F32(0.5)));
    assert!(encode_to_vec(&narrow, &ratio).is_err());

    // Bytes carrying tag 9 decode with the full codec but not the narrow one.
    let bytes = encode_to_vec(&full, &ratio).unwrap();
    assert!(decode_root(&narrow, &bytes).is_err());
}
