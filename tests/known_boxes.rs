use moovtree::boxes::FourCC;
use moovtree::known_boxes::{AtomClass, KnownBox};

#[test]
fn known_box_from_ftyp() {
    let kb = KnownBox::from(FourCC(*b"ftyp"));
    assert!(matches!(kb, KnownBox::Ftyp));
    assert_eq!(kb.full_name(), "File Type Box");
    assert_eq!(kb.class(), AtomClass::Leaf);
}

#[test]
fn containers_are_branches() {
    for cc in [b"moov", b"trak", b"mdia", b"minf", b"dinf", b"stbl", b"edts", b"udta"] {
        assert_eq!(KnownBox::from(FourCC(*cc)).class(), AtomClass::Branch, "{}", FourCC(*cc));
    }
}

#[test]
fn meta_is_branch_and_leaf() {
    assert_eq!(KnownBox::from(FourCC(*b"meta")).class(), AtomClass::BranchAndLeaf);
}

#[test]
fn unknown_types_are_leaves() {
    let kb = KnownBox::from(FourCC(*b"zzzz"));
    assert_eq!(kb, KnownBox::Unknown(FourCC(*b"zzzz")));
    assert_eq!(kb.class(), AtomClass::Leaf);
    assert_eq!(kb.full_name(), "Unknown Box");

    // sample tables are never descended into
    assert_eq!(KnownBox::from(FourCC(*b"stsd")).class(), AtomClass::Leaf);
}
