//! MAT-file saving and loading through `NumAttrMap`.

use crate::scratch;
use attrmap::{
    Error, MatReadOptions, MatReader, MatWriteOptions, NumAttrMap, ReadMatError, Value,
};
use ndarray::{array, Array2, Array3};
use std::fs::{self, File};

#[test]
fn scalar_matrix_loads_as_scalar() {
    let (_dir, path) = scratch("scalar.mat");
    let mut map = NumAttrMap::new();
    map.insert("x", array![[3.5]]);
    map.save_mat(&path, &MatWriteOptions::default()).unwrap();

    let mut loaded = NumAttrMap::new();
    loaded.load_mat(&path, &MatReadOptions::default()).unwrap();
    assert_eq!(loaded["x"], Value::Float(3.5));

    let options = MatReadOptions {
        squeeze_floats: false,
        ..Default::default()
    };
    loaded.load_mat(&path, &options).unwrap();
    assert_eq!(loaded["x"], Value::from(array![[3.5]]));
}

#[test]
fn arrays_keep_shape_and_type() {
    let (_dir, path) = scratch("arrays.mat");
    let cube = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (i * 100 + j * 10 + k) as i32);
    let mut map = NumAttrMap::new();
    map.insert("cube", cube.clone());
    map.insert("mask", array![[true, false], [false, true]]);
    map.insert("bytes", array![[1u8, 2, 3]]);
    map.insert("single", array![[1.5f32], [-2.5]]);

    for compress in [false, true] {
        let options = MatWriteOptions {
            compress,
            ..Default::default()
        };
        map.save_mat(&path, &options).unwrap();
        let loaded = NumAttrMap::from_path(&path).unwrap();
        assert_eq!(loaded, map);
    }
}

#[test]
fn scalars_strings_and_lists() {
    let (_dir, path) = scratch("mixed.mat");
    let mut map = NumAttrMap::new();
    map.insert("count", 42);
    map.insert("ratio", 0.125);
    map.insert("flag", true);
    map.insert("label", "α-run");
    map.insert("cells", vec![Value::from("a"), Value::Int(2)]);
    map.insert("grid", vec![vec![1, 2], vec![3, 4]]);
    map.save_mat(&path, &MatWriteOptions::default()).unwrap();

    let loaded = NumAttrMap::from_path(&path).unwrap();
    assert_eq!(loaded["count"], Value::Int(42));
    assert_eq!(loaded["ratio"], Value::Float(0.125));
    assert_eq!(loaded["flag"], Value::Bool(true));
    assert_eq!(loaded["label"], Value::from("α-run"));

    // Lists are stored as cell arrays of 1x1 matrices.
    let cells = loaded["cells"].as_array().unwrap();
    assert_eq!(cells.shape(), &[1, 2]);
    let grid = loaded["grid"].as_array().unwrap();
    assert_eq!(grid.shape(), &[2, 2]);
    let corner = grid.as_array::<Value>().unwrap()[[1, 0]].clone();
    assert_eq!(corner, Value::from(Array2::from_elem((1, 1), 3i64)));
}

#[test]
fn squeeze_all_reaches_nested_values() {
    let (_dir, path) = scratch("nested.mat");
    let mut params = indexmap::IndexMap::new();
    params.insert("gain".to_owned(), Value::Float(2.0));
    params.insert("taps".to_owned(), Value::from(array![1.0, 0.5, 0.25]));
    params.insert("cells".to_owned(), Value::from(vec![Value::Int(1), Value::from("b")]));
    let mut map = NumAttrMap::new();
    map.insert("params", params);
    map.insert("column", Array3::<f64>::zeros((1, 4, 1)));
    map.save_mat(&path, &MatWriteOptions::default()).unwrap();

    let options = MatReadOptions {
        squeeze_all: true,
        ..Default::default()
    };
    let mut loaded = NumAttrMap::new();
    loaded.load_mat(&path, &options).unwrap();
    let params = loaded["params"].as_map().unwrap();
    assert_eq!(params["gain"], Value::Float(2.0));
    assert_eq!(params["taps"], Value::from(array![1.0, 0.5, 0.25]));
    assert_eq!(
        params["cells"].as_array().unwrap().to_value(),
        Value::from(vec![Value::Int(1), Value::from("b")]),
    );
    assert_eq!(loaded["column"].as_array().unwrap().shape(), &[4]);
}

#[test]
fn load_merges_unless_cleared() {
    let (_dir, path) = scratch("merge.mat");
    let mut source = NumAttrMap::new();
    source.insert("a", 1.0);
    source.save_mat(&path, &MatWriteOptions::default()).unwrap();

    let mut map = NumAttrMap::new();
    map.insert("b", 2.0);
    map.insert("a", 0.0);
    map.load_mat(&path, &MatReadOptions::default()).unwrap();
    assert_eq!(map["a"], Value::Float(1.0));
    assert_eq!(map["b"], Value::Float(2.0));

    let options = MatReadOptions {
        clear: true,
        ..Default::default()
    };
    map.load_mat(&path, &options).unwrap();
    assert!(!map.contains_key("b"));
}

#[test]
fn private_names_are_not_saved() {
    let (_dir, path) = scratch("private.mat");
    let mut map = NumAttrMap::new();
    map.insert("_hidden", 1);
    map.insert("shown", 2);
    map.save_mat(&path, &MatWriteOptions::default()).unwrap();
    let names: Vec<String> = MatReader::new(File::open(&path).unwrap())
        .unwrap()
        .map(|variable| variable.unwrap().0)
        .collect();
    assert_eq!(names, ["shown"]);
}

#[test]
fn rejects_other_files() {
    let (_dir, path) = scratch("fake.mat");
    fs::write(&path, "MATLAB 4 text that is far too short").unwrap();
    let err = NumAttrMap::from_path(&path).unwrap_err();
    assert!(matches!(
        err,
        Error::ReadMat {
            source: ReadMatError::NotLevel5,
            ..
        }
    ));
}

#[test]
fn big_endian_files() {
    // Hand-built big-endian file with the 1x2 double variable `v = [1, 2]`.
    let mut mat = vec![b' '; 116];
    mat.extend_from_slice(&[0; 8]);
    mat.extend_from_slice(&[0x01, 0x00, b'M', b'I']);
    let mut body = Vec::new();
    // Array flags: class double.
    body.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 8, 0, 0, 0, 6, 0, 0, 0, 0]);
    // Dimensions: 1x2.
    body.extend_from_slice(&[0, 0, 0, 5, 0, 0, 0, 8, 0, 0, 0, 1, 0, 0, 0, 2]);
    // Name: small element holding "v".
    body.extend_from_slice(&[0, 1, 0, 1, b'v', 0, 0, 0]);
    // Real part.
    body.extend_from_slice(&[0, 0, 0, 9, 0, 0, 0, 16]);
    body.extend_from_slice(&1.0f64.to_be_bytes());
    body.extend_from_slice(&2.0f64.to_be_bytes());
    mat.extend_from_slice(&[0, 0, 0, 14]);
    mat.extend_from_slice(&(body.len() as u32).to_be_bytes());
    mat.extend_from_slice(&body);

    let (_dir, path) = scratch("big.mat");
    fs::write(&path, &mat).unwrap();
    let map = NumAttrMap::from_path(&path).unwrap();
    assert_eq!(map["v"], Value::from(array![[1.0, 2.0]]));
}
