use biff_ptg::field::{AreaFields, ColumnField, RefFields};
use biff_ptg::token::{ArrayFields, ArrayGrid, ArrayValue, AttrFields, Utf16Text};
use biff_ptg::{decode_rgce, encode_rgce, read_rgcb, OperandClass, Ptg};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn roundtrip_bytes(rgce: &[u8]) {
    let tokens = decode_rgce(rgce).expect("decode");
    let encoded = encode_rgce(&tokens).expect("encode");
    assert_eq!(encoded.rgce, rgce);
    assert!(encoded.rgcb.is_empty());
}

fn roundtrip_tokens(tokens: &[Ptg]) {
    let encoded = encode_rgce(tokens).expect("encode");
    let mut decoded = decode_rgce(&encoded.rgce).expect("decode");
    read_rgcb(&mut decoded, &encoded.rgcb).expect("read rgcb");
    assert_eq!(decoded, tokens);
}

#[test]
fn operator_and_literal_bytes_roundtrip() {
    // A1 (value class) + 2 followed by unary minus and percent.
    let rgce = [
        0x44, 0x00, 0x00, 0x00, 0xC0, // PtgRef A1 (both relative)
        0x1E, 0x02, 0x00, // PtgInt 2
        0x03, // PtgAdd
        0x13, // PtgUminus
        0x14, // PtgPercent
    ];
    roundtrip_bytes(&rgce);
}

#[test]
fn every_fixed_size_kind_roundtrips_as_tokens() {
    let cell = RefFields {
        row: 40000,
        col: ColumnField::new(0x1234, true, false),
    };
    let area = AreaFields {
        first_row: 0,
        last_row: 65535,
        first_col: ColumnField::new(0, true, true),
        last_col: ColumnField::new(0x3FFF, false, false),
    };

    let tokens = vec![
        Ptg::Add,
        Ptg::Sub,
        Ptg::Mul,
        Ptg::Div,
        Ptg::Power,
        Ptg::Concat,
        Ptg::Lt,
        Ptg::Le,
        Ptg::Eq,
        Ptg::Ge,
        Ptg::Gt,
        Ptg::Ne,
        Ptg::Intersect,
        Ptg::Union,
        Ptg::Range,
        Ptg::UnaryPlus,
        Ptg::UnaryMinus,
        Ptg::Percent,
        Ptg::Paren,
        Ptg::MissArg,
        Ptg::Str(Utf16Text::from_text("hello")),
        Ptg::Str(Utf16Text::from_text("héllo€")),
        Ptg::Str(Utf16Text::new("wide ascii".encode_utf16().collect(), true)),
        Ptg::Attr(AttrFields {
            grbit: 0x04,
            w_attr: 2,
            choose_table: vec![4, 9],
        }),
        Ptg::ErrLit(0x17),
        Ptg::BoolLit(true),
        Ptg::IntLit(65535),
        Ptg::NumLit(-2.5),
        Ptg::Func {
            class: OperandClass::Value,
            iftab: 19,
        },
        Ptg::FuncVar {
            class: OperandClass::Array,
            argc: 3,
            iftab: 4,
        },
        Ptg::Name {
            class: OperandClass::Reference,
            index: 7,
            reserved: 0,
        },
        Ptg::NameX {
            class: OperandClass::Value,
            ixti: 2,
            index: 9,
            reserved: 0xBEEF,
        },
        Ptg::Ref {
            class: OperandClass::Reference,
            fields: cell,
        },
        Ptg::RefN {
            class: OperandClass::Value,
            fields: cell,
        },
        Ptg::Area {
            class: OperandClass::Array,
            fields: area,
        },
        Ptg::AreaN {
            class: OperandClass::Reference,
            fields: area,
        },
        Ptg::RefErr {
            class: OperandClass::Reference,
            raw: [1, 2, 3, 4],
        },
        Ptg::AreaErr {
            class: OperandClass::Value,
            raw: [1, 2, 3, 4, 5, 6, 7, 8],
        },
        Ptg::MemArea {
            class: OperandClass::Reference,
            reserved: 0xDEAD_BEEF,
            cce: 9,
        },
        Ptg::MemErr {
            class: OperandClass::Reference,
            reserved: 0,
            cce: 0,
        },
        Ptg::MemFunc {
            class: OperandClass::Reference,
            cce: 15,
        },
        Ptg::Ref3d {
            class: OperandClass::Reference,
            ixti: 3,
            fields: cell,
        },
        Ptg::Area3d {
            class: OperandClass::Value,
            ixti: 0,
            fields: area,
        },
        Ptg::RefErr3d {
            class: OperandClass::Reference,
            ixti: 1,
            raw: [0xFF; 4],
        },
        Ptg::AreaErr3d {
            class: OperandClass::Reference,
            ixti: 1,
            raw: [0xAB; 8],
        },
    ];

    roundtrip_tokens(&tokens);

    // Byte-level identity too: decode(encode(t)) held above, now
    // encode(decode(bytes)) == bytes for the same material.
    let encoded = encode_rgce(&tokens).expect("encode");
    roundtrip_bytes(&encoded.rgce);
}

#[test]
fn array_literal_roundtrips_through_both_buffers() {
    let tokens = vec![Ptg::ArrayLit {
        class: OperandClass::Array,
        fields: ArrayFields {
            reserved: [9, 8, 7, 6, 5],
            cce: 0,
            grid: Some(ArrayGrid {
                cols: 2,
                rows: 2,
                values: vec![
                    ArrayValue::Number(1.5),
                    ArrayValue::Text(Utf16Text::from_text("two")),
                    ArrayValue::Bool(false),
                    ArrayValue::Err(0x2A),
                ],
            }),
        },
    }];
    roundtrip_tokens(&tokens);
}

#[test]
fn unknown_identity_bytes_pass_through_losslessly() {
    let rgce = [0x1Eu8, 0x07, 0x00, 0x9C, 0x01, 0x02, 0x03];
    let tokens = decode_rgce(&rgce).expect("decode");
    assert_eq!(tokens.len(), 2);
    assert_eq!(
        tokens[1],
        Ptg::Unknown {
            id: 0x9C,
            data: vec![0x01, 0x02, 0x03],
        }
    );
    let encoded = encode_rgce(&tokens).expect("encode");
    assert_eq!(encoded.rgce, rgce);
}

#[test]
fn operand_class_survives_decode_encode() {
    for class in OperandClass::ALL {
        let token = Ptg::Ref {
            class,
            fields: RefFields {
                row: 12,
                col: ColumnField::new(3, true, true),
            },
        };
        let encoded = encode_rgce(std::slice::from_ref(&token)).expect("encode");
        assert_eq!(encoded.rgce[0], 0x24 + class.offset());
        let decoded = decode_rgce(&encoded.rgce).expect("decode");
        assert_eq!(decoded[0].class(), Some(class));
    }
}

#[test]
fn row_wraparound_is_invisible_at_the_token_level() {
    for row in [0u16, 32767, 32768, 65535] {
        let token = Ptg::Ref {
            class: OperandClass::Reference,
            fields: RefFields {
                row,
                col: ColumnField::new(0, false, false),
            },
        };
        let encoded = encode_rgce(std::slice::from_ref(&token)).expect("encode");
        let decoded = decode_rgce(&encoded.rgce).expect("decode");
        assert_eq!(decoded[0], token);
    }

    // Row 32768 hits the wire as the minimum negative 16-bit pattern.
    let token = Ptg::Ref {
        class: OperandClass::Reference,
        fields: RefFields {
            row: 32768,
            col: ColumnField::new(0, false, false),
        },
    };
    let encoded = encode_rgce(std::slice::from_ref(&token)).expect("encode");
    assert_eq!(&encoded.rgce[1..3], &[0x00, 0x80]);
}

#[test]
fn ill_formed_utf16_string_roundtrips_byte_exact() {
    // Lone high surrogate 0xD800 stored as a single wide unit.
    let rgce = [0x17u8, 0x01, 0x01, 0x00, 0xD8];
    let tokens = decode_rgce(&rgce).expect("decode");
    let Ptg::Str(s) = &tokens[0] else {
        panic!("expected a string literal, got {:?}", tokens[0]);
    };
    assert_eq!(s.units(), &[0xD800]);
    assert!(s.is_wide());

    let encoded = encode_rgce(&tokens).expect("encode");
    assert_eq!(encoded.rgce, rgce);
}

#[test]
fn ascii_stored_wide_keeps_its_storage_width() {
    let rgce = [0x17u8, 0x02, 0x01, b'h', 0x00, b'i', 0x00];
    roundtrip_bytes(&rgce);
}

fn class_strategy() -> impl Strategy<Value = OperandClass> {
    prop_oneof![
        Just(OperandClass::Reference),
        Just(OperandClass::Value),
        Just(OperandClass::Array),
    ]
}

proptest! {
    #[test]
    fn prop_ref_tokens_roundtrip(
        row in any::<u16>(),
        col in 0u16..=0x3FFF,
        row_rel in any::<bool>(),
        col_rel in any::<bool>(),
        class in class_strategy(),
    ) {
        let token = Ptg::Ref {
            class,
            fields: RefFields {
                row,
                col: ColumnField::new(col, row_rel, col_rel),
            },
        };
        let encoded = encode_rgce(std::slice::from_ref(&token)).unwrap();
        prop_assert_eq!(encoded.rgce.len(), token.encoded_size());
        let decoded = decode_rgce(&encoded.rgce).unwrap();
        prop_assert_eq!(&decoded[..], std::slice::from_ref(&token));
    }

    #[test]
    fn prop_literal_tokens_roundtrip(
        n in any::<u16>(),
        x in -1.0e300f64..1.0e300,
        text in "[ -~]{0,40}",
    ) {
        let tokens = vec![
            Ptg::IntLit(n),
            Ptg::NumLit(x),
            Ptg::Str(Utf16Text::from_text(&text)),
        ];
        let encoded = encode_rgce(&tokens).unwrap();
        let decoded = decode_rgce(&encoded.rgce).unwrap();
        prop_assert_eq!(decoded, tokens);
    }

    #[test]
    fn prop_area_tokens_roundtrip(
        first_row in any::<u16>(),
        last_row in any::<u16>(),
        first_col in 0u16..=0x3FFF,
        last_col in 0u16..=0x3FFF,
        class in class_strategy(),
    ) {
        let token = Ptg::Area {
            class,
            fields: AreaFields {
                first_row,
                last_row,
                first_col: ColumnField::new(first_col, true, false),
                last_col: ColumnField::new(last_col, false, true),
            },
        };
        let encoded = encode_rgce(std::slice::from_ref(&token)).unwrap();
        let decoded = decode_rgce(&encoded.rgce).unwrap();
        prop_assert_eq!(&decoded[..], std::slice::from_ref(&token));
    }
}
