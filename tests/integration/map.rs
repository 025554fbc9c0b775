//! Attribute and key access, copying and extension dispatch.

use crate::scratch;
use attrmap::{AttrMap, Error, NumAttrMap, Value, WarningReason};
use ndarray::array;
use std::fs;

#[test]
fn set_then_get_agree() {
    let mut map = AttrMap::new();
    let values = [
        ("int", Value::Int(3)),
        ("text", Value::from("hello")),
        ("nested", Value::from(vec![Value::Null, Value::Bool(false)])),
        ("$cash", Value::Float(-0.25)),
    ];
    for (key, value) in values.iter().cloned() {
        assert_eq!(map.set_attr(key, value), None);
    }
    for (key, value) in &values {
        assert_eq!(map.attr(key).unwrap(), value);
        assert_eq!(&map[*key], value);
    }
}

#[test]
fn invalid_keys_warn_once_and_are_stored() {
    let mut map = AttrMap::new();
    for key in ["1bad", "has space"] {
        let warning = map.insert(key, 7).unwrap();
        assert_eq!(warning.key(), key);
        assert_eq!(warning.reason(), WarningReason::InvalidIdentifier);
        assert_eq!(map[key], Value::Int(7));
        assert!(matches!(map.attr(key), Err(Error::NotAnAttribute(_))));
    }
    let warnings = map.update([("ok", 1), ("also bad", 2), ("keys", 3)]);
    let reasons: Vec<_> = warnings.iter().map(|w| (w.key(), w.reason())).collect();
    assert_eq!(
        reasons,
        [
            ("also bad", WarningReason::InvalidIdentifier),
            ("keys", WarningReason::ReservedName),
        ],
    );
}

#[test]
fn copy_is_deep() {
    let mut original = NumAttrMap::new();
    original.insert("list", vec![1, 2, 3]);
    original.insert("array", array![1.0, 2.0]);
    let mut inner = indexmap::IndexMap::new();
    inner.insert("x".to_owned(), Value::Int(1));
    original.insert("map", inner);

    let mut copy = original.copy();
    copy["list"].as_list_mut().unwrap().push(Value::Int(4));
    for x in copy["array"]
        .as_array_mut()
        .unwrap()
        .as_array_mut::<f64>()
        .unwrap()
    {
        *x *= 10.0;
    }
    copy["map"]
        .as_map_mut()
        .unwrap()
        .insert("y".to_owned(), Value::Int(2));

    assert_eq!(original["list"], Value::from(vec![1, 2, 3]));
    assert_eq!(original["array"], Value::from(array![1.0, 2.0]));
    assert_eq!(original["map"].as_map().unwrap().len(), 1);
    assert_ne!(copy, original);
}

#[test]
fn unknown_extension_gives_empty_map() {
    let (_dir, path) = scratch("notes.txt");
    fs::write(&path, "not read").unwrap();
    assert!(AttrMap::from_path(&path).unwrap().is_empty());
    assert!(NumAttrMap::from_path(&path).unwrap().is_empty());
    // Not even opened.
    let (_dir, missing) = scratch("missing.txt");
    assert!(AttrMap::from_path(&missing).unwrap().is_empty());
}

#[test]
fn base_map_ignores_numeric_extensions() {
    let (_dir, path) = scratch("data.mat");
    fs::write(&path, "not a MAT-file").unwrap();
    assert!(AttrMap::from_path(&path).unwrap().is_empty());
    assert!(NumAttrMap::from_path(&path).is_err());
}

#[test]
fn missing_json_file_is_an_io_error() {
    let (_dir, path) = scratch("missing.json");
    assert!(matches!(AttrMap::from_path(&path), Err(Error::Io { .. })));
}
