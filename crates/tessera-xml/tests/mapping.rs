//! Integration tests for reading and writing through the public API.

use serde_json::json;
use tessera_core::Registry;
use tessera_xml::{ErrorKind, ReadOptions, Reader, WriteOptions, Writer};

const LIBRARY: &str = r#"{
    "name": "Library", "uri": "urn:library", "prefix": "lib",
    "types": [
        { "name": "Catalog", "properties": [
            { "name": "name", "type": "String" },
            { "name": "books", "type": "Book", "isMany": true, "style": "type" },
            { "name": "featured", "type": "Book", "kind": "reference", "isMany": true } ] },
        { "name": "Book", "properties": [
            { "name": "id", "type": "String" },
            { "name": "title", "type": "String" },
            { "name": "pages", "type": "Integer" },
            { "name": "price", "type": "Real" },
            { "name": "blurb", "type": "String", "kind": "body" },
            { "name": "sequel", "type": "Book", "kind": "reference" } ] }
    ]
}"#;

fn registry() -> Registry {
    Registry::builder()
        .register_json(LIBRARY)
        .unwrap()
        .build()
        .unwrap()
}

fn write_options() -> WriteOptions {
    WriteOptions::default().with_xml_declaration(false)
}

#[test]
fn test_read_write_read_is_stable() {
    let registry = registry();
    let xml = r##"<?xml version="1.0" encoding="UTF-8"?>
<lib:Catalog xmlns:lib="urn:library" xmlns:ext="urn:ext" name="Shelf" featured="#b2 #b1" ext:owner="me">
  <lib:Book id="b1" title="One" pages="120" price="9.5" sequel="#b2">First &amp; best</lib:Book>
  <lib:Book id="b2" title="Two" pages="80"/>
  <lib:Book id="b3" title="Three"/>
  <ext:note level="2"><ext:p>kept</ext:p></ext:note>
</lib:Catalog>"##;

    let reader = Reader::new(&registry, ReadOptions::default());
    let first = reader.read(xml, Some("lib:Catalog")).unwrap();
    let written = Writer::new(&registry, write_options())
        .write(first.root())
        .unwrap();
    let second = reader.read(&written, Some("lib:Catalog")).unwrap();

    let snapshot = registry.snapshot(second.root());
    assert_eq!(registry.snapshot(first.root()), snapshot);
    assert_eq!(
        snapshot,
        json!({
            "$type": "lib:Catalog",
            "name": "Shelf",
            "featured": [ { "$ref": "b2" }, { "$ref": "b1" } ],
            "books": [
                { "$type": "lib:Book", "id": "b1", "title": "One", "pages": 120, "price": 9.5,
                  "sequel": { "$ref": "b2" }, "blurb": "First & best" },
                { "$type": "lib:Book", "id": "b2", "title": "Two", "pages": 80 },
                { "$type": "lib:Book", "id": "b3", "title": "Three" }
            ],
            "$attrs": { "ext:owner": "me" },
            "$extensions": [ "<ext:note level=\"2\"><ext:p>kept</ext:p></ext:note>" ]
        })
    );
}

#[test]
fn test_list_cardinality_and_order() {
    let registry = registry();
    let xml = r#"<lib:Catalog xmlns:lib="urn:library">
        <lib:Book id="c"/><lib:Book id="a"/><lib:Book id="b"/>
    </lib:Catalog>"#;

    let document = Reader::new(&registry, ReadOptions::default())
        .read(xml, None)
        .unwrap();
    let books = document.root().get("books").unwrap();
    let ids: Vec<String> = books
        .items()
        .iter()
        .map(|book| book.as_object().unwrap().get("id").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["c", "a", "b"]);

    let written = Writer::new(&registry, write_options())
        .write(document.root())
        .unwrap();
    assert_eq!(
        written,
        r#"<lib:Catalog xmlns:lib="urn:library"><lib:Book id="c"/><lib:Book id="a"/><lib:Book id="b"/></lib:Catalog>"#
    );
}

#[test]
fn test_dangling_reference_kind() {
    let registry = registry();
    let error = Reader::new(&registry, ReadOptions::default())
        .read(
            r##"<lib:Catalog xmlns:lib="urn:library" featured="#missing"/>"##,
            Some("lib:Catalog"),
        )
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::DanglingReference);
    assert_eq!(error.unresolved_ids(), ["missing"]);
    assert!(error.to_string().contains("missing"));
}

#[test]
fn test_default_namespace_document() {
    let registry = registry();
    let document = Reader::new(&registry, ReadOptions::default())
        .read(
            r#"<Catalog xmlns="urn:library" name="Plain"><Book id="x"/></Catalog>"#,
            Some("lib:Catalog"),
        )
        .unwrap();

    assert_eq!(document.root().get("name").unwrap().as_str(), Some("Plain"));
    assert!(document.element_by_id("x").is_some());
}

mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    /// Strategy for text that needs escaping in markup.
    fn markup_text_strategy() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 <>&\"'=;#/]{0,40}"
    }

    /// Attribute and body text survive a write followed by a read.
    fn check_text_survives(title: &str, blurb: &str) -> Result<(), TestCaseError> {
        let registry = registry();
        let book = registry.create("lib:Book").unwrap();
        book.set("title", title);
        book.set("blurb", blurb);

        let written = Writer::new(&registry, write_options()).write(&book);
        prop_assert!(written.is_ok(), "write failed: {:?}", written.err());
        let written = written.unwrap();

        let read = Reader::new(&registry, ReadOptions::default().with_strict(true))
            .read(&written, Some("lib:Book"));
        prop_assert!(read.is_ok(), "read of {written:?} failed: {:?}", read.err());
        let document = read.unwrap();

        let root = document.root();
        let read_title = root.get("title");
        prop_assert_eq!(read_title.as_ref().and_then(|value| value.as_str()), Some(title));
        let read_blurb = root.get("blurb");
        if blurb.trim().is_empty() {
            prop_assert!(read_blurb.is_none());
        } else {
            prop_assert_eq!(read_blurb.as_ref().and_then(|value| value.as_str()), Some(blurb));
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn text_survives_round_trip(
            title in markup_text_strategy(),
            blurb in markup_text_strategy(),
        ) {
            check_text_survives(&title, &blurb)?;
        }
    }
}
