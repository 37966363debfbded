// ABOUTME: Integration tests for the BSON wire format against published examples.
// ABOUTME: Exercises byte-exact encoding, round-trips, and the failure matrix.

use serde::{Deserialize, Serialize};
use wirebson::{
    bson, decode_array, decode_document, doc, encode_array, encode_document, from_slice, to_vec,
    Binary, Document, Error, ObjectId, Regex, RegexFlags, UtcDatetime, Value,
};

/// The "hello world" example from bsonspec.org.
const HELLO_WORLD: &[u8] = &[
    0x16, 0x00, 0x00, 0x00, // total document length: 22
    0x02, // string element
    b'h', b'e', b'l', b'l', b'o', 0x00, // key
    0x06, 0x00, 0x00, 0x00, // string length: 5 + 1
    b'w', b'o', b'r', b'l', b'd', 0x00, // value
    0x00, // document terminator
];

/// The {"BSON": ["awesome", 5.05, 1986]} example from bsonspec.org.
const BSON_AWESOME: &[u8] = &[
    0x31, 0x00, 0x00, 0x00, // total document length: 49
    0x04, // array element
    b'B', b'S', b'O', b'N', 0x00, // key
    0x26, 0x00, 0x00, 0x00, // array unit length: 38
    0x02, // string element
    b'0', 0x00, // index key
    0x08, 0x00, 0x00, 0x00, // string length: 7 + 1
    b'a', b'w', b'e', b's', b'o', b'm', b'e', 0x00, // value
    0x01, // double element
    b'1', 0x00, // index key
    0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x14, 0x40, // 5.05
    0x10, // int32 element
    b'2', 0x00, // index key
    0xc2, 0x07, 0x00, 0x00, // 1986
    0x00, // array terminator
    0x00, // document terminator
];

#[test]
fn encode_bsonspec_example_1() {
    let bytes = encode_document(&doc! { "hello": "world" }).unwrap();
    assert_eq!(bytes, HELLO_WORLD);
}

#[test]
fn decode_bsonspec_example_1() {
    let decoded = decode_document(HELLO_WORLD).unwrap();
    assert_eq!(decoded, doc! { "hello": "world" });
}

#[test]
fn encode_bsonspec_example_2() {
    let bytes = encode_document(&doc! {
        "BSON": ["awesome", 5.05, 1986]
    })
    .unwrap();
    assert_eq!(bytes, BSON_AWESOME);
}

#[test]
fn decode_bsonspec_example_2() {
    let decoded = decode_document(BSON_AWESOME).unwrap();
    assert_eq!(
        decoded,
        doc! { "BSON": ["awesome", 5.05, 1986] }
    );

    // array order preserved
    let array = decoded.get("BSON").and_then(Value::as_array).unwrap();
    assert_eq!(array[0], Value::String("awesome".into()));
    assert_eq!(array[1], Value::Double(5.05));
    assert_eq!(array[2], Value::Int32(1986));
}

#[test]
fn roundtrip_mixed_document() {
    // a representative mix of scalar, null, datetime, and array values
    let document = doc! {
        "hello": "world",
        "PI": (std::f64::consts::PI),
        "null": null,
        "createDate": (Value::Datetime(UtcDatetime::from_millis(0))),
        "BSON": [
            "awesome",
            5.05,
            1986,
            true,
            null,
            (Value::Datetime(UtcDatetime::from_millis(1_355_314_332_000))),
        ],
    };

    let bytes = encode_document(&document).unwrap();
    assert_eq!(decode_document(&bytes).unwrap(), document);
}

#[test]
fn roundtrip_every_supported_kind() {
    let document = doc! {
        "f": 1.25,
        "s": "ünïcode",
        "d": { "k": "v" },
        "a": [[0], []],
        "bin": (Value::Binary(Binary::generic(vec![1, 2, 3]))),
        "uuid": (Value::Binary(Binary::uuid(0xdead_beef, 0xcafe))),
        "oid": (Value::ObjectId(ObjectId::new([
            0x50, 0x7f, 0x1f, 0x77, 0xbc, 0xf8, 0x6c, 0xd7, 0x99, 0x43, 0x90, 0x11,
        ]))),
        "t": true,
        "ff": false,
        "at": (Value::Datetime(UtcDatetime::from_millis(-1))),
        "n": null,
        "re": (Value::Regex(Regex::new("^a.*z$", RegexFlags::MULTILINE))),
        "i": (i32::MIN),
        "l": (i64::MAX),
        "lo": (Value::MinKey),
        "hi": (Value::MaxKey),
    };

    let bytes = encode_document(&document).unwrap();
    assert_eq!(decode_document(&bytes).unwrap(), document);
}

#[test]
fn encoding_is_independent_of_insertion_order() {
    let mut forward = Document::new();
    forward.insert("a".into(), bson!(1));
    forward.insert("b".into(), bson!(2));
    forward.insert("c".into(), bson!(3));

    let mut reverse = Document::new();
    reverse.insert("c".into(), bson!(3));
    reverse.insert("b".into(), bson!(2));
    reverse.insert("a".into(), bson!(1));

    assert_eq!(forward, reverse);
    assert_eq!(
        encode_document(&forward).unwrap(),
        encode_document(&reverse).unwrap()
    );
}

#[test]
fn every_nested_length_prefix_is_exact() {
    let document = doc! {
        "a": [1, [2, 3], { "b": "c" }],
        "d": { "e": { "f": [] } },
    };
    let bytes = encode_document(&document).unwrap();

    // walk every unit start recorded during a manual scan and check that
    // its prefix equals the distance to the end of its unit
    fn check_unit(bytes: &[u8], start: usize) -> usize {
        let declared = i32::from_le_bytes([
            bytes[start],
            bytes[start + 1],
            bytes[start + 2],
            bytes[start + 3],
        ]) as usize;
        let end = start + declared - 1;
        assert_eq!(bytes[end], 0x00, "unit at {start} must end with terminator");

        let mut pos = start + 4;
        while pos < end {
            let tag = bytes[pos];
            pos += 1;
            while bytes[pos] != 0 {
                pos += 1; // key
            }
            pos += 1;
            match tag {
                0x01 => pos += 8,
                0x02 => {
                    let len = i32::from_le_bytes([
                        bytes[pos],
                        bytes[pos + 1],
                        bytes[pos + 2],
                        bytes[pos + 3],
                    ]) as usize;
                    pos += 4 + len;
                }
                0x03 | 0x04 => pos = check_unit(bytes, pos),
                0x10 => pos += 4,
                other => panic!("unexpected tag 0x{other:02x} in fixture"),
            }
        }
        assert_eq!(pos, end, "unit at {start} must fill its declared span");
        end + 1
    }

    assert_eq!(check_unit(&bytes, 0), bytes.len());
}

#[test]
fn empty_document_is_five_bytes() {
    let bytes = encode_document(&Document::new()).unwrap();
    assert_eq!(bytes, [0x05, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(decode_document(&bytes).unwrap(), Document::new());
}

#[test]
fn empty_array_roundtrips_identically() {
    let bytes = encode_array(&[]).unwrap();
    assert_eq!(bytes, [0x05, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(decode_array(&bytes).unwrap(), Vec::<Value>::new());
}

#[test]
fn null_value_has_empty_payload() {
    let bytes = encode_document(&doc! { "x": null }).unwrap();
    assert_eq!(
        bytes,
        [0x08, 0x00, 0x00, 0x00, 0x0a, b'x', 0x00, 0x00]
    );
    let decoded = decode_document(&bytes).unwrap();
    assert_eq!(decoded.get("x"), Some(&Value::Null));
}

#[test]
fn unsupported_wire_kinds_fail_decode() {
    // undefined, DB-pointer, JS code, symbol, JS code w/ scope, timestamp
    for tag in [0x06u8, 0x0c, 0x0d, 0x0e, 0x0f, 0x11] {
        let buffer = [0x08, 0x00, 0x00, 0x00, tag, b'k', 0x00, 0x00];
        assert_eq!(
            decode_document(&buffer),
            Err(Error::UnsupportedElementType(tag)),
            "tag 0x{tag:02x} must fail"
        );
    }
}

#[test]
fn unknown_tag_fails_decode() {
    let buffer = [0x08, 0x00, 0x00, 0x00, 0x7e, b'k', 0x00, 0x00];
    assert_eq!(decode_document(&buffer), Err(Error::InvalidElementType(0x7e)));
}

#[test]
fn truncated_buffer_fails_decode() {
    // every proper prefix of a valid document must fail, not partially parse
    for cut in 1..HELLO_WORLD.len() {
        assert!(
            decode_document(&HELLO_WORLD[..cut]).is_err(),
            "prefix of {cut} bytes must not decode"
        );
    }
}

#[test]
fn length_prefix_beyond_buffer_fails() {
    let buffer = [0xff, 0x00, 0x00, 0x00, 0x00];
    assert_eq!(decode_document(&buffer), Err(Error::MalformedLength(255)));
}

#[test]
fn document_key_must_be_a_cstring() {
    let mut document = Document::new();
    document.insert("a\0b".into(), bson!(1));
    assert_eq!(
        encode_document(&document),
        Err(Error::InvalidKey("a\0b".into()))
    );
}

#[test]
fn serde_struct_matches_document_encoding() {
    #[derive(Serialize)]
    struct Greeting {
        hello: String,
    }

    let via_serde = to_vec(&Greeting {
        hello: "world".into(),
    })
    .unwrap();
    assert_eq!(via_serde, HELLO_WORLD);
}

#[test]
fn serde_roundtrip_through_value_tree() {
    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        id: i64,
        name: String,
        scores: Vec<f64>,
        extra: Option<bool>,
    }

    let record = Record {
        id: 42,
        name: "r".into(),
        scores: vec![1.0, 2.5],
        extra: Some(false),
    };

    // serde-encoded bytes must decode as a Value tree and back
    let bytes = to_vec(&record).unwrap();
    let document = decode_document(&bytes).unwrap();
    assert_eq!(document.get("id"), Some(&Value::Int64(42)));

    let reencoded = encode_document(&document).unwrap();
    let decoded: Record = from_slice(&reencoded).unwrap();
    assert_eq!(decoded, record);
}
