#![allow(missing_docs)]

use relcode::codec::{decode_root, encode_to_vec};
use relcode::schema::{FieldDescriptor, SchemaRegistry, TypeDescriptor, VariantDescriptor};
use relcode::string::StringCodec;
use relcode::Value;

fn field(name: &str, ty: TypeDescriptor) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        ty,
    }
}

#[test]
fn build_struct_from_descriptor() {
    let registry = SchemaRegistry::new();
    let codec = registry
        .build(&TypeDescriptor::Struct {
            name: "point".into(),
            fields: vec![field("x", TypeDescriptor::F64), field("y", TypeDescriptor::F64)],
        })
        .unwrap();
    assert_eq!(codec.size(), 16);

    let value = Value::Struct(vec![
        ("x".to_string(), Value::F64(42.5)),
        ("y".to_string(), Value::F64(-17.25)),
    ]);
    let bytes = encode_to_vec(codec.as_ref(), &value).unwrap();
    assert_eq!(decode_root(codec.as_ref(), &bytes).unwrap(), value);
}

#[test]
fn descriptor_parses_from_json() {
    let json = r#"{
        "kind": "struct",
        "name": "person",
        "fields": [
            { "name": "name", "ty": { "kind": "string" } },
            { "name": "age", "ty": { "kind": "u32" } },
            { "name": "nick", "ty": { "kind": "option", "payload": { "kind": "string" } } }
        ]
    }"#;
    let descriptor: TypeDescriptor = serde_json::from_str(json).unwrap();

    let registry = SchemaRegistry::new();
    let codec = registry.build(&descriptor).unwrap();

    let value = Value::Struct(vec![
        ("name".to_string(), Value::Str("Margaret Hamilton".into())),
        ("age".to_string(), Value::U32(32)),
        ("nick".to_string(), Value::Option(None)),
    ]);
    let bytes = encode_to_vec(codec.as_ref(), &value).unwrap();
    assert_eq!(decode_root(codec.as_ref(), &bytes).unwrap(), value);
}

#[test]
fn descriptor_serialization_roundtrips() {
    let descriptor = TypeDescriptor::Enum {
        name: "shape".into(),
        variants: vec![
            VariantDescriptor {
                name: "empty".into(),
                payload: None,
            },
            VariantDescriptor {
                name: "circle".into(),
                payload: Some(TypeDescriptor::F64),
            },
        ],
    };
    let json = serde_json::to_string(&descriptor).unwrap();
    let back: TypeDescriptor = serde_json::from_str(&json).unwrap();
    assert_eq!(back, descriptor);
}

#[test]
fn collection_descriptors() {
    let registry = SchemaRegistry::new();
    let codec = registry
        .build(&TypeDescriptor::BTreeMap {
            key: Box::new(TypeDescriptor::U32),
            value: Box::new(TypeDescriptor::String),
            branching: None,
        })
        .unwrap();

    let value = Value::Map(
        (0..12u32)
            .map(|i| (Value::U32(i), Value::Str(format!("value {i}"))))
            .collect(),
    );
    let bytes = encode_to_vec(codec.as_ref(), &value).unwrap();
    assert_eq!(decode_root(codec.as_ref(), &bytes).unwrap(), value);
}

#[test]
fn named_reference_resolves_registered_codec() {
    let mut registry = SchemaRegistry::new();
    registry.register("label", std::sync::Arc::new(StringCodec::new()));

    let codec = registry
        .build(&TypeDescriptor::Vector {
            element: Box::new(TypeDescriptor::Named {
                name: "label".into(),
            }),
        })
        .unwrap();

    let value = Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]);
    let bytes = encode_to_vec(codec.as_ref(), &value).unwrap();
    assert_eq!(decode_root(codec.as_ref(), &bytes).unwrap(), value);
}

#[test]
fn unknown_named_reference_is_an_error() {
    let registry = SchemaRegistry::new();
    let result = registry.build(&TypeDescriptor::Named {
        name: "nowhere".into(),
    });
    assert!(result.is_err());
}

#[test]
fn recursive_type_via_declare_define() {
    // A tree node holding a label and a vector of itself.
    let mut registry = SchemaRegistry::new();
    registry.declare("node");
    let codec = registry
        .define(
            "node",
            &TypeDescriptor::Struct {
                name: "node".into(),
                fields: vec![
                    field("label", TypeDescriptor::String),
                    field(
                        "children",
                        TypeDescriptor::Vector {
                            element: Box::new(TypeDescriptor::Named {
                                name: "node".into(),
                            }),
                        },
                    ),
                ],
            },
        )
        .unwrap();

    let leaf = |label: &str| {
        Value::Struct(vec![
            ("label".to_string(), Value::Str(label.into())),
            ("children".to_string(), Value::List(vec![])),
        ])
    };
    let value = Value::Struct(vec![
        ("label".to_string(), Value::Str("root".into())),
        (
            "children".to_string(),
            Value::List(vec![
                leaf("left"),
                Value::Struct(vec![
                    ("label".to_string(), Value::Str("middle".into())),
                    ("children".to_string(), Value::List(vec![leaf("deep")])),
                ]),
                leaf("right"),
            ]),
        ),
    ]);

    let bytes = encode_to_vec(codec.as_ref(), &value).unwrap();
    assert_eq!(decode_root(codec.as_ref(), &bytes).unwrap(), value);
}

#[test]
#[should_panic(expected = "never")]
fn declared_but_undefined_codec_panics_on_use() {
    let mut registry = SchemaRegistry::new();
    let handle = registry.declare("never");
    // Forcing the layout of an undefined forward declaration is a
    // construction error.
    let _ = handle.size();
}
