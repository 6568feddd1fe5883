use cnvrskit::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

/// Routes codec log output through the test harness so `--nocapture`
/// shows it. First caller wins; later calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// One sheet named `en` with one text entry ("msg", font + layout
/// references, two parameters), one font, one layout.
fn golden_resource() -> CnvrsResource {
    let mut resource = CnvrsResource::new();

    let mut sheet = SheetEntry::default();
    sheet.entries.insert(
        "msg".to_owned(),
        TextEntry {
            id: 1,
            font_name: Some("fnt".to_owned()),
            layout_name: Some("lyt".to_owned()),
            text: "Hi".to_owned(),
            parameters: vec![
                ParameterEntry {
                    key: "k1".to_owned(),
                    value: "v1".to_owned(),
                    unknown: 7,
                },
                ParameterEntry {
                    key: "k2".to_owned(),
                    value: "v2".to_owned(),
                    unknown: 5,
                },
            ],
        },
    );
    resource.sheets.insert("en".to_owned(), sheet);

    resource.fonts.insert(
        "fnt".to_owned(),
        FontEntry {
            typeface: "Sans".to_owned(),
            size: 24.0,
            line_spacing: Some(2.0),
            color: Some(0x00FF00FF),
            ..FontEntry::default()
        },
    );

    resource.layouts.insert(
        "lyt".to_owned(),
        LayoutEntry {
            text_alignment: TextAlignment::Center,
            vertical_alignment: VerticalAlignment::Bottom,
            word_wrap: true,
            fit: TextFit::Normal,
        },
    );

    resource
}

/// The pinned byte image for [`golden_resource`]: the regression guard
/// for offset patching and the relocation table. 16 bytes per row.
fn golden_bytes() -> Vec<u8> {
    let rows = [
        // BINA header, DATA section header
        "42494E41 3231304C 6C020000 01000000",
        "44415441 5C020000 F0010000 20000000",
        "1C000000 18000000 00000000 00000000",
        "00000000 00000000 00000000 00000000",
        // Sheet header
        "06010100 00000000 20000000 00000000",
        "F0010000 00000000 00000000 00000000",
        // Text entry
        "01000000 00000000 F3010000 00000000",
        "58000000 00000000 50000000 00000000",
        "02000000 00000000 A0010000 00000000",
        // Text payload ("Hi" UTF-16 + terminator, 8-aligned), secondary record
        "48006900 00000000 F3010000 00000000",
        "78000000 00000000 20010000 00000000",
        "00000000 00000000 03020000 00000000",
        // Font record (name, typeface, value pointers, value block)
        "07020000 00000000 F0000000 00000000",
        "F8000000 00000000 00000000 00000000",
        "00010000 00000000 00000000 00000000",
        "00000000 00000000 00000000 00000000",
        "00000000 00000000 00000000 00000000",
        "00000000 00000000 00000000 00000000",
        "00000000 00000000 00000000 00000000",
        "0000C041 00000000 00000040 00000000",
        "FF00FF00 00000000 00000000 00000000",
        "00000000 00000000 00000000 00000000",
        // Layout record
        "0C020000 00000000 00000000 00000000",
        "00000000 00000000 00000000 00000000",
        "80010000 00000000 88010000 00000000",
        "90010000 00000000 98010000 00000000",
        "00000000 00000000 00000000 00000000",
        "00000000 00000000 00000000 00000000",
        "01000000 00000000 02000000 00000000",
        "01000000 00000000 00000000 00000000",
        // Parameter header, pointer array, records
        "02000000 00000000 B0010000 00000000",
        "C0010000 00000000 D8010000 00000000",
        "F7010000 00000000 07000000 00000000",
        "FA010000 00000000 FD010000 00000000",
        "05000000 00000000 00020000 00000000",
        // Name table: en msg k1 v1 k2 v2 fnt Sans lyt
        "656E006D 7367006B 31007631 006B3200",
        "76320066 6E740053 616E7300 6C797400",
        // Relocation table + padding
        "42424642 42444442 42444242 42446048",
        "42424254 42424244 42440000",
    ];

    let mut bytes = Vec::new();
    for row in rows {
        for pair in row
            .split_whitespace()
            .flat_map(|group| group.as_bytes().chunks(2))
        {
            let pair = std::str::from_utf8(pair).unwrap();
            bytes.push(u8::from_str_radix(pair, 16).unwrap());
        }
    }
    bytes
}

#[test]
fn test_golden_byte_output() {
    init_tracing();
    let bytes = serialize_cnvrs(&golden_resource()).unwrap();
    let expected = golden_bytes();
    assert_eq!(bytes.len(), expected.len());
    assert_eq!(bytes, expected);
}

#[test]
fn test_golden_bytes_decode() {
    init_tracing();
    let resource = parse_cnvrs_bytes(&golden_bytes()).unwrap();

    let (sheet_name, sheet) = resource.sheets.first().unwrap();
    assert_eq!(sheet_name, "en");
    assert_eq!(sheet.id, Some(1));

    let (entry_name, entry) = sheet.entries.first().unwrap();
    assert_eq!(entry_name, "msg");
    assert_eq!(entry.id, 1);
    assert_eq!(entry.text, "Hi");
    assert_eq!(entry.font_name.as_deref(), Some("fnt"));
    assert_eq!(entry.layout_name.as_deref(), Some("lyt"));
    assert_eq!(entry.parameters.len(), 2);
    assert_eq!(entry.parameters[0].key, "k1");
    assert_eq!(entry.parameters[0].value, "v1");
    assert_eq!(entry.parameters[0].unknown, 7);
    assert_eq!(entry.parameters[1].unknown, 5);

    let font = &resource.fonts["fnt"];
    assert_eq!(font.typeface, "Sans");
    assert_eq!(font.size, 24.0);
    assert_eq!(font.line_spacing, Some(2.0));
    assert_eq!(font.unknown1, None);
    assert_eq!(font.color, Some(0x00FF00FF));

    let layout = &resource.layouts["lyt"];
    assert_eq!(layout.text_alignment, TextAlignment::Center);
    assert_eq!(layout.vertical_alignment, VerticalAlignment::Bottom);
    assert!(layout.word_wrap);
    assert_eq!(layout.fit, TextFit::Normal);
}

#[test]
fn test_round_trip_identity() {
    init_tracing();
    // Decode -> encode -> decode must preserve every entity field
    let first = parse_cnvrs_bytes(&golden_bytes()).unwrap();
    let reencoded = serialize_cnvrs(&first).unwrap();
    let second = parse_cnvrs_bytes(&reencoded).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_round_trip_after_mutation() {
    init_tracing();
    let mut resource = parse_cnvrs_bytes(&golden_bytes()).unwrap();
    resource.sheets[0].entries[0].text = "Hello, world!\nこんにちは".to_owned();
    resource.sheets[0].entries[0].parameters[0].unknown = u64::MAX;

    let bytes = serialize_cnvrs(&resource).unwrap();
    let parsed = parse_cnvrs_bytes(&bytes).unwrap();
    assert_eq!(parsed, resource);
}

#[test]
fn test_write_and_read_file() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("text_en.cnvrs");

    write_cnvrs(&path, &golden_resource()).unwrap();
    let parsed = read_cnvrs(&path).unwrap();

    assert_eq!(parsed.sheets["en"].entries["msg"].text, "Hi");
    assert_eq!(parsed.fonts.len(), 1);
    assert_eq!(parsed.layouts.len(), 1);
}

#[test]
fn test_bad_magic_fails() {
    init_tracing();
    let mut bytes = golden_bytes();
    bytes[0] = b'X';
    let err = parse_cnvrs_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::InvalidCnvrsMagic(_)));
}

#[test]
fn test_length_mismatch_fails() {
    init_tracing();
    // Truncating the input invalidates the header length field
    let mut bytes = golden_bytes();
    bytes.pop();
    let err = parse_cnvrs_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::LengthMismatch { .. }));
}

#[test]
fn test_null_mandatory_pointer_fails() {
    init_tracing();
    let mut bytes = golden_bytes();
    // Zero out the sheet-name pointer at 0x50
    bytes[0x50..0x58].fill(0);
    let err = parse_cnvrs_bytes(&bytes).unwrap_err();
    assert!(matches!(err, Error::MissingValue { position: 0x50 }));
}

#[test]
fn test_shared_font_parsed_once() {
    init_tracing();
    // Two entries pointing at the same font record decode to one font
    let mut resource = golden_resource();
    let second = TextEntry {
        id: 2,
        font_name: Some("fnt".to_owned()),
        text: "Yo".to_owned(),
        ..TextEntry::default()
    };
    resource.sheets[0].entries.insert("msg2".to_owned(), second);

    let bytes = serialize_cnvrs(&resource).unwrap();
    let parsed = parse_cnvrs_bytes(&bytes).unwrap();
    assert_eq!(parsed.fonts.len(), 1);
    assert_eq!(parsed.sheets[0].entries.len(), 2);
    assert_eq!(parsed.sheets[0].entries[1].font_name.as_deref(), Some("fnt"));
}

#[test]
fn test_interned_strings_share_storage() {
    init_tracing();
    // Identical strings reuse one name-table slot
    let mut resource = golden_resource();
    resource.sheets[0].entries[0].parameters[1].value = "v1".to_owned();
    let bytes = serialize_cnvrs(&resource).unwrap();

    let needle: &[u8] = b"v1\0";
    let occurrences = bytes.windows(3).filter(|&w| w == needle).count();
    assert_eq!(occurrences, 1);

    let parsed = parse_cnvrs_bytes(&bytes).unwrap();
    assert_eq!(parsed.sheets[0].entries[0].parameters[0].value, "v1");
    assert_eq!(parsed.sheets[0].entries[0].parameters[1].value, "v1");
}
