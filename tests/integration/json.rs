//! JSON5 loading and JSON saving.

use crate::scratch;
use attrmap::{AttrMap, Error, JsonOptions, NumAttrMap, Value};
use ndarray::{array, Array3};
use std::fs;

fn sample() -> AttrMap {
    let mut inner = indexmap::IndexMap::new();
    inner.insert("depth".to_owned(), Value::Int(2));
    inner.insert("ratio".to_owned(), Value::Float(0.5));
    [
        ("name", Value::from("sample")),
        ("count", Value::Int(-12)),
        ("enabled", Value::Bool(true)),
        ("missing", Value::Null),
        ("items", Value::from(vec![Value::Int(1), Value::from("two"), Value::Float(3.25)])),
        ("inner", Value::Map(inner)),
    ]
    .into_iter()
    .collect()
}

#[test]
fn round_trip() {
    let (_dir, path) = scratch("sample.json");
    let map = sample();
    map.save_json(&path).unwrap();
    let loaded = AttrMap::from_path(&path).unwrap();
    assert_eq!(loaded, map);
    let keys: Vec<_> = loaded.keys().cloned().collect();
    assert_eq!(keys, ["name", "count", "enabled", "missing", "items", "inner"]);
    assert!(fs::read_to_string(&path).unwrap().contains("\n    \"name\": \"sample\""));
}

#[test]
fn relaxed_syntax() {
    let (_dir, path) = scratch("relaxed.json");
    fs::write(
        &path,
        "// settings\n{\n  unquoted: 'single',\n  hex: 0x10,\n  list: [1, 2,],\n  /* block */ big: 1e3,\n}\n",
    )
    .unwrap();
    let map = AttrMap::from_path(&path).unwrap();
    assert_eq!(map["unquoted"], Value::from("single"));
    assert_eq!(map["hex"], Value::Int(16));
    assert_eq!(map["list"], Value::from(vec![1, 2]));
    assert_eq!(map["big"], Value::Float(1000.0));
}

#[test]
fn integers_beyond_i64_load_as_floats() {
    let (_dir, path) = scratch("wide.json");
    fs::write(
        &path,
        "{\"a\": 9223372036854775808, \"b\": 18446744073709551616,\n \"c\": -9223372036854775808, \"d\": [1, 9223372036854775807]}",
    )
    .unwrap();
    let map = AttrMap::from_path(&path).unwrap();
    assert_eq!(map["a"], Value::Float(9223372036854775808.0));
    assert_eq!(map["b"], Value::Float(18446744073709551616.0));
    assert_eq!(map["c"], Value::Int(i64::MIN));
    assert_eq!(map["d"], Value::from(vec![1, i64::MAX]));
}

#[test]
fn load_clears_or_merges() {
    let (_dir, path) = scratch("a.json");
    fs::write(&path, "{a: 1, 'b c': 2}").unwrap();

    let mut map = AttrMap::new();
    map.insert("old", 0);
    let warnings = map.load_json(&path, false).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].key(), "b c");
    assert_eq!(map.len(), 3);

    map.load_json(&path, true).unwrap();
    assert!(!map.contains_key("old"));
    assert_eq!(map.len(), 2);
}

#[test]
fn failed_load_leaves_map_untouched() {
    let (_dir, path) = scratch("bad.json");
    fs::write(&path, "{a: ").unwrap();
    let mut map = AttrMap::new();
    map.insert("kept", true);
    assert!(matches!(map.load_json(&path, true), Err(Error::ParseJson { .. })));
    assert_eq!(map["kept"], Value::Bool(true));
}

#[test]
fn arrays_need_the_numeric_map() {
    let (_dir, path) = scratch("array.json");
    let mut map = AttrMap::new();
    map.insert("a", array![1, 2]);
    assert!(matches!(map.save_json(&path), Err(Error::WriteJson { .. })));

    let num: NumAttrMap = map.into_iter().collect();
    num.save_json(&path, &JsonOptions::default()).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"a":[1,2]}"#);
}

#[test]
fn squeeze_all_flattens_singleton_axes() {
    let (_dir, path) = scratch("squeezed.json");
    let data = Array3::from_shape_vec((1, 5, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    let mut map = NumAttrMap::new();
    map.insert("data", data);

    map.save_json(&path, &JsonOptions::default()).unwrap();
    let kept = AttrMap::from_path(&path).unwrap();
    let rows = kept["data"].as_list().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].as_list().unwrap().len(), 5);

    let options = JsonOptions {
        indent: Some(2),
        squeeze_all: true,
    };
    map.save_json(&path, &options).unwrap();
    let squeezed = AttrMap::from_path(&path).unwrap();
    assert_eq!(squeezed["data"], Value::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
}

#[test]
fn non_finite_floats_are_written_as_null() {
    let (_dir, path) = scratch("nan.json");
    let mut map = AttrMap::new();
    map.insert("nan", f64::NAN);
    map.save_json_with(&path, None).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"nan":null}"#);
}
