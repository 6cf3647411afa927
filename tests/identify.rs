use moovtree::codec::Value;
use moovtree::config::ParseOptions;
use moovtree::parser::ParseError;
use moovtree::registry::default_registry;
use moovtree::{identify, identify_with, sniff};
use std::io::Cursor;

fn atom(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

fn ftyp() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(b"mp42");
    p.extend_from_slice(&[0, 0, 0, 0]);
    p.extend_from_slice(b"isom");
    atom(b"ftyp", &p)
}

fn mvhd() -> Vec<u8> {
    let mut p = vec![0u8; 4];
    for w in [0u32, 0, 600, 1200, 0x0001_0000] {
        p.extend_from_slice(&w.to_be_bytes());
    }
    p.extend_from_slice(&0x0100u16.to_be_bytes());
    p.extend_from_slice(&[0u8; 10 + 36 + 24]);
    p.extend_from_slice(&2u32.to_be_bytes());
    atom(b"mvhd", &p)
}

/// [ftyp mp42] [moov [mvhd]] [mdat]
fn make_minimal_movie() -> Vec<u8> {
    let mut data = ftyp();
    data.extend(atom(b"moov", &mvhd()));
    data.extend(atom(b"mdat", &[0u8; 16]));
    data
}

#[test]
fn short_stream_is_not_a_match() {
    let mut cur = Cursor::new(vec![0, 0, 0, 20, b'f', b't']);
    assert!(!sniff(&mut cur).unwrap());
    assert!(identify(&mut cur).unwrap().is_none());
}

#[test]
fn other_formats_are_not_a_match() {
    let mut cur = Cursor::new(b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec());
    assert!(identify(&mut cur).unwrap().is_none());

    let mut cur = Cursor::new(atom(b"moov", &[]));
    assert!(identify(&mut cur).unwrap().is_none());
}

#[test]
fn undersized_ftyp_is_not_a_match() {
    let mut cur = Cursor::new(atom(b"ftyp", b"mp42"));
    assert!(!sniff(&mut cur).unwrap());
    assert!(identify(&mut cur).unwrap().is_none());
}

#[test]
fn minimal_movie_is_identified() {
    let mut cur = Cursor::new(make_minimal_movie());

    let info = identify(&mut cur).unwrap().expect("not identified");

    assert_eq!(info.brand, "mp4");
    assert_eq!(info.major_brand, "mp42");
    let types: Vec<String> = info.atoms.iter().map(|a| a.typ.to_string()).collect();
    assert_eq!(types, ["ftyp", "moov", "mdat"]);

    let ftyp = info.find(&["ftyp"]).unwrap();
    assert_eq!(ftyp.offset, 0);
    assert_eq!(ftyp.size, 20);
    let fields = ftyp.decoded().unwrap();
    assert_eq!(fields.str("minor_version"), Some("0.0"));
    assert_eq!(
        fields.get("compatible_brands"),
        Some(&Value::Brands(vec!["isom".into()]))
    );

    let mvhd = info.find(&["moov", "mvhd"]).unwrap();
    assert_eq!(mvhd.offset, 28);
    let fields = mvhd.decoded().unwrap();
    assert_eq!(fields.get("matrix_structure"), Some(&Value::Matrix([0; 9])));
    assert_eq!(fields.u64("time_scale"), Some(600));
}

#[test]
fn brand_is_first_three_characters() {
    let mut p = Vec::new();
    p.extend_from_slice(b"qt  ");
    p.extend_from_slice(&[0x20, 0x05, 0x03, 0x00]);
    let mut cur = Cursor::new(atom(b"ftyp", &p));

    let info = identify(&mut cur).unwrap().unwrap();
    assert_eq!(info.brand, "qt ");
    assert_eq!(info.major_brand, "qt  ");
}

#[test]
fn ftyp_lookup_is_root_only() {
    let mut data = ftyp();
    data.extend(atom(b"moov", &ftyp()));
    let mut cur = Cursor::new(data);

    let info = identify(&mut cur).unwrap().unwrap();
    assert_eq!(info.find(&["ftyp"]).unwrap().offset, 0);
    assert!(info.find(&["moov", "ftyp"]).is_some());
    assert!(info.find(&["mvhd"]).is_none());
}

#[test]
fn truncated_ftyp_has_no_brand() {
    // header says 20 bytes but the stream ends after 12
    let mut data = ftyp();
    data.truncate(12);
    let mut cur = Cursor::new(data);

    assert!(sniff(&mut cur).unwrap());
    assert!(matches!(identify(&mut cur), Err(ParseError::MissingBrand)));
}

#[test]
fn identify_is_repeatable() {
    let data = make_minimal_movie();

    let first = identify(&mut Cursor::new(data.clone())).unwrap().unwrap();
    let second = identify(&mut Cursor::new(data)).unwrap().unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn tree_serializes_to_json() {
    let mut cur = Cursor::new(make_minimal_movie());
    let info = identify(&mut cur).unwrap().unwrap();

    let v = serde_json::to_value(&info).unwrap();

    assert_eq!(v["brand"], "mp4");
    let atoms = v["atoms"].as_array().unwrap();
    assert_eq!(atoms.len(), 3);

    let ftyp = &atoms[0];
    assert_eq!(ftyp["type"], "ftyp");
    assert_eq!(ftyp["offset"], 0);
    assert_eq!(ftyp["fields"]["major_brand"], "mp42");
    assert!(ftyp.get("children").is_none());

    let moov = &atoms[1];
    assert!(moov.get("fields").is_none());
    assert_eq!(moov["children"][0]["type"], "mvhd");
    assert_eq!(moov["children"][0]["path"], serde_json::json!(["moov", "mvhd"]));

    assert_eq!(atoms[2]["fields"], "opaque");
}

#[test]
fn custom_limits_apply_to_the_root() {
    let data = make_minimal_movie();

    let opts = ParseOptions::new().max_atoms_per_level(2);
    let info = identify_with(&mut Cursor::new(data.clone()), &opts, &default_registry())
        .unwrap()
        .unwrap();
    assert_eq!(info.atoms.len(), 2);

    let opts = ParseOptions::new().root_budget(20);
    let info = identify_with(&mut Cursor::new(data), &opts, &default_registry())
        .unwrap()
        .unwrap();
    assert_eq!(info.atoms.len(), 1);
}
