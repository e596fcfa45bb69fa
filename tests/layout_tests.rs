#![allow(missing_docs)]

use std::sync::Arc;

use relcode::aggregate::{EnumCodec, EnumVariant, StructCodec};
use relcode::buffer::Writer;
use relcode::codec::Codec;
use relcode::container::{ArrayCodec, BoxCodec, OptionCodec, TupleCodec, VectorCodec};
use relcode::primitive::{primitive, PrimitiveKind};
use relcode::string::StringCodec;

fn assert_size_is_multiple_of_align(codec: &dyn Codec) {
    assert!(codec.align() >= 1);
    assert_eq!(
        codec.size() % codec.align(),
        0,
        "{codec:?}: size {} not a multiple of align {}",
        codec.size(),
        codec.align()
    );
}

#[test]
fn primitive_sizes_are_natural_widths() {
    let cases = [
        (PrimitiveKind::Unit, 0, 1),
        (PrimitiveKind::Bool, 1, 1),
        (PrimitiveKind::I8, 1, 1),
        (PrimitiveKind::U16, 2, 2),
        (PrimitiveKind::I32, 4, 4),
        (PrimitiveKind::U64, 8, 8),
        (PrimitiveKind::F32, 4, 4),
        (PrimitiveKind::F64, 8, 8),
        (PrimitiveKind::Char, 4, 4),
    ];
    for (kind, size, align) in cases {
        let codec = primitive(kind);
        assert_eq!(codec.size(), size, "{kind:?}");
        assert_eq!(codec.align(), align, "{kind:?}");
    }
}

#[test]
fn struct_fields_get_c_style_offsets() {
    // u8 at 0, u32 padded to 4, u16 at 8; size padded to 12.
    let codec = StructCodec::new(
        "mixed",
        vec![
            ("a".to_string(), primitive(PrimitiveKind::U8)),
            ("b".to_string(), primitive(PrimitiveKind::U32)),
            ("c".to_string(), primitive(PrimitiveKind::U16)),
        ],
    );
    let offsets: Vec<usize> = codec.fields().iter().map(|f| f.offset).collect();
    assert_eq!(offsets, [0, 4, 8]);
    assert_eq!(codec.size(), 12);
    assert_eq!(codec.align(), 4);
}

#[test]
fn empty_struct_is_zero_sized() {
    let codec = StructCodec::new("nothing", vec![]);
    assert_eq!(codec.size(), 0);
    assert_eq!(codec.align(), 1);
}

#[test]
fn option_of_string_layout() {
    let codec = OptionCodec::new(Arc::new(StringCodec::new()));
    // 1-byte discriminant, padded to the string's 4-byte alignment, then the
    // 8-byte string slot.
    assert_eq!(codec.size(), 12);
    assert_eq!(codec.align(), 4);
}

#[test]
fn option_of_u8_is_two_bytes() {
    let codec = OptionCodec::new(primitive(PrimitiveKind::U8));
    assert_eq!(codec.size(), 2);
    assert_eq!(codec.align(), 1);
}

#[test]
fn tuple_offsets() {
    let codec = TupleCodec::new(vec![
        primitive(PrimitiveKind::U8),
        primitive(PrimitiveKind::U64),
        primitive(PrimitiveKind::U16),
    ]);
    assert_eq!(codec.field_offset(0), 0);
    assert_eq!(codec.field_offset(1), 8);
    assert_eq!(codec.field_offset(2), 16);
    assert_eq!(codec.size(), 24);
    assert_eq!(codec.align(), 8);
}

#[test]
fn enum_payload_alignment() {
    // Discriminant byte, then the payload aligned to its own requirement.
    let codec = EnumCodec::new(
        "holder",
        vec![
            EnumVariant::unit("none"),
            EnumVariant::with_payload("wide", primitive(PrimitiveKind::U64)),
            EnumVariant::with_payload("narrow", primitive(PrimitiveKind::U8)),
        ],
    );
    assert_eq!(codec.discriminant_size(), 1);
    assert_eq!(codec.payload_offset(), 8);
    assert_eq!(codec.size(), 16);
    assert_eq!(codec.align(), 8);
}

#[test]
fn unit_only_enum_is_one_byte() {
    let codec = EnumCodec::new("flag", vec![EnumVariant::unit("on"), EnumVariant::unit("off")]);
    assert_eq!(codec.size(), 1);
    assert_eq!(codec.align(), 1);
}

#[test]
fn every_composite_size_is_a_multiple_of_align() {
    let string: relcode::CodecRef = Arc::new(StringCodec::new());
    let composites: Vec<relcode::CodecRef> = vec![
        Arc::new(VectorCodec::new(string.clone())),
        Arc::new(OptionCodec::new(string.clone())),
        Arc::new(BoxCodec::new(primitive(PrimitiveKind::U64))),
        Arc::new(ArrayCodec::new(primitive(PrimitiveKind::U16), 7)),
        Arc::new(TupleCodec::new(vec![
            primitive(PrimitiveKind::U8),
            string.clone(),
        ])),
        Arc::new(StructCodec::new(
            "s",
            vec![
                ("a".to_string(), primitive(PrimitiveKind::U8)),
                ("b".to_string(), string.clone()),
            ],
        )),
        Arc::new(EnumCodec::new(
            "e",
            vec![
                EnumVariant::unit("u"),
                EnumVariant::with_payload("p", string),
            ],
        )),
    ];
    for codec in &composites {
        assert_size_is_multiple_of_align(codec.as_ref());
    }
}

#[test]
fn writer_aligns_primitives_to_their_width() {
    // Natural alignment is the type width on every target, including ones
    // where the host ABI aligns u64/f64 to 4.
    let mut writer = Writer::new();
    writer.write_u8(1);
    writer.write_u64(2);
    assert_eq!(writer.pos(), 16);
    let bytes = writer.finish();
    assert_eq!(&bytes[1..8], &[0; 7]);
    assert_eq!(&bytes[8..16], &2u64.to_le_bytes());

    let mut writer = Writer::new();
    writer.write_u8(1);
    writer.write_f64(0.5);
    assert_eq!(writer.pos(), 16);
}
