//! `.npz` archives, through `NumAttrMap` and through the codec directly.

use crate::scratch;
use attrmap::{DType, Error, Format, NpzReader, NpzWriter, NumArray, NumAttrMap, Value};
use ndarray::{arr0, array};
use std::fs;
use std::io::Cursor;

#[test]
fn round_trip_through_map() {
    let (_dir, path) = scratch("arrays.npz");
    let arr1 = array![[1i32, 3, 0], [4, 7, -1]];
    let arr2 = array![0.5f64, -1.25, 8.0];
    let mut map = NumAttrMap::new();
    map.insert("a", arr1.clone());
    map.insert("b", arr2.clone());

    for compress in [true, false] {
        map.save_npz(&path, compress).unwrap();
        let mut loaded = NumAttrMap::new();
        loaded.load_npz(&path, false).unwrap();
        assert_eq!(loaded["a"], Value::from(arr1.clone()));
        assert_eq!(loaded["b"], Value::from(arr2.clone()));
        assert_eq!(loaded, map);
    }
}

#[test]
fn scalars_and_lists_become_arrays() {
    let (_dir, path) = scratch("converted.npz");
    let mut map = NumAttrMap::new();
    map.insert("n", 5);
    map.insert("x", 2.5);
    map.insert("flag", false);
    map.insert("rows", vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    map.insert("mixed", vec![Value::Bool(true), Value::Int(2)]);
    map.save_npz(&path, true).unwrap();

    let loaded = NumAttrMap::from_path(&path).unwrap();
    assert_eq!(loaded["n"], Value::from(arr0(5i64)));
    assert_eq!(loaded["x"].as_array().unwrap().scalar(), Some(Value::Float(2.5)));
    assert_eq!(loaded["flag"].as_array().unwrap().scalar(), Some(Value::Bool(false)));
    assert_eq!(loaded["rows"], Value::from(array![[1.0, 2.0], [3.0, 4.0]]));
    assert_eq!(loaded["mixed"], Value::from(array![1i64, 2]));
}

#[test]
fn unrepresentable_values_fail_before_writing() {
    let (_dir, path) = scratch("bad.npz");
    let mut map = NumAttrMap::new();
    map.insert("ok", array![1, 2]);
    map.insert("mixed", vec![Value::from("a"), Value::Int(1)]);
    let err = map.save_npz(&path, false).unwrap_err();
    assert!(matches!(
        err,
        Error::Unrepresentable { ref key, format: Format::Npz, .. } if key == "mixed"
    ));
    assert!(!path.exists());
}

#[test]
fn strings_round_trip_as_text() {
    let (_dir, path) = scratch("text.npz");
    let mut map = NumAttrMap::new();
    map.insert("label", "run");
    map.insert("empty", "");
    map.insert("names", vec![vec!["α", "beta"], vec!["c", ""]]);
    map.insert("x", 1.5);

    for compress in [false, true] {
        map.save_npz(&path, compress).unwrap();
        let loaded = NumAttrMap::from_path(&path).unwrap();
        assert_eq!(loaded["label"], Value::from("run"));
        assert_eq!(loaded["empty"], Value::from(""));
        assert_eq!(loaded["names"], map["names"]);
    }

    let mut reader = NpzReader::new(fs::File::open(&path).unwrap()).unwrap();
    let names = reader.by_name("names").unwrap();
    assert_eq!(names.shape(), &[2, 2]);
    assert!(names.is_text());
}

#[test]
fn empty_list_is_float() {
    let (_dir, path) = scratch("empty.npz");
    let mut map = NumAttrMap::new();
    map.insert("none", Vec::<Value>::new());
    map.save_npz(&path, false).unwrap();
    let loaded = NumAttrMap::from_path(&path).unwrap();
    let none = loaded["none"].as_array().unwrap();
    assert_eq!(none.dtype(), DType::F64);
    assert_eq!(none.shape(), &[0]);
}

#[test]
fn load_merges_unless_cleared() {
    let (_dir, path) = scratch("merge.npz");
    let mut source = NumAttrMap::new();
    source.insert("a", array![1u8]);
    source.save_npz(&path, false).unwrap();

    let mut map = NumAttrMap::new();
    map.insert("b", 1);
    map.load_npz(&path, false).unwrap();
    assert_eq!(map.len(), 2);
    map.load_npz(&path, true).unwrap();
    assert_eq!(map.keys().collect::<Vec<_>>(), ["a"]);
}

#[test]
fn corrupt_archive_is_an_error() {
    let (_dir, path) = scratch("corrupt.npz");
    fs::write(&path, b"PK not really").unwrap();
    let mut map = NumAttrMap::new();
    map.insert("kept", 1);
    assert!(matches!(map.load_npz(&path, true), Err(Error::ReadNpz { .. })));
    assert_eq!(map["kept"], Value::Int(1));
}

#[cfg(feature = "compressed_npz")]
#[test]
fn codec_compressed() {
    let mut buf = Vec::<u8>::new();
    let zeros = NumArray::from(ndarray::Array2::<f64>::zeros((64, 64)));
    {
        let mut writer = NpzWriter::new_compressed(Cursor::new(&mut buf));
        writer.add_array("zeros", &zeros).unwrap();
        writer.finish().unwrap();
    }
    assert!(buf.len() < 64 * 64 * 8);
    let mut reader = NpzReader::new(Cursor::new(&buf)).unwrap();
    assert_eq!(reader.by_name("zeros").unwrap(), zeros);
}

#[test]
fn codec_round_trip() {
    let mut buf = Vec::<u8>::new();
    let arr1 = NumArray::from(array![[1i32, 3, 0], [4, 7, -1]]);
    let arr2 = NumArray::from(array![[9u16, 6], [5, 2], [3, 1]].reversed_axes());

    {
        let mut writer = NpzWriter::new(Cursor::new(&mut buf));
        writer.add_array("arr1", &arr1).unwrap();
        writer.add_array("arr2.npy", &arr2).unwrap();
        writer.finish().unwrap();
    }

    let mut reader = NpzReader::new(Cursor::new(&buf)).unwrap();
    assert!(!reader.is_empty());
    assert_eq!(reader.len(), 2);
    assert_eq!(reader.names().unwrap(), ["arr1", "arr2"]);
    assert_eq!(reader.by_name("arr1").unwrap(), arr1);
    assert_eq!(reader.by_name("arr1.npy").unwrap(), arr1);
    assert_eq!(reader.by_index(1).unwrap(), arr2);
    assert!(reader.by_name("arr1.npy.npy").is_err());
    assert_eq!(reader.by_name("arr2").unwrap().shape(), &[2, 3]);
}
