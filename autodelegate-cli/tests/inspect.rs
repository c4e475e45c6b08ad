use std::fs;
use std::path::PathBuf;

use autodelegate_cli::commands::inspect;
use autodelegate_core::GeneratorSettings;
use tempfile::TempDir;

const DECLS: &str = r#"
units:
  - package: shop
    types:
      - name: Priced
        kind: interface
        methods: [{ name: price, returns: long }]
      - name: Named
        kind: interface
        methods: [{ name: name, returns: String }, { name: price, returns: long }]
      - name: Item
        kind: class
        implements: [Priced, Named]
        auto_delegate: { delegate_type: Both }
      - { name: Both, kind: interface, extends: [Priced, Named] }
      - { name: Flag, kind: enum, auto_delegate: {} }
"#;

fn fixture() -> (TempDir, Vec<PathBuf>) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("shop.yaml");
    fs::write(&path, DECLS).unwrap();
    (tmp, vec![path])
}

#[test]
fn lists_methods_origins_and_accessor() {
    colored::control::set_override(false);
    let (_tmp, inputs) = fixture();
    let text = inspect::render(&inputs, Some("Item"), &GeneratorSettings::default()).unwrap();
    let expected = "\
shop.Item -> Item_AutoDelegate
  java.lang.String name()  from shop.Named
  long price()  from shop.Priced (also shop.Named)
  accessor: shop.Both delegate()
";
    assert_eq!(text, expected);
}

#[test]
fn rejected_targets_are_listed() {
    colored::control::set_override(false);
    let (_tmp, inputs) = fixture();
    let text = inspect::render(&inputs, None, &GeneratorSettings::default()).unwrap();
    assert!(text.contains("shop.Flag rejected\n"));
    assert!(text.contains("shop.Item -> Item_AutoDelegate\n"));
}

#[test]
fn unknown_target_is_an_error() {
    let (_tmp, inputs) = fixture();
    let err = inspect::render(&inputs, Some("shop.Missing"), &GeneratorSettings::default()).unwrap_err();
    assert_eq!(err.to_string(), "no marked declaration named `shop.Missing`");
}
