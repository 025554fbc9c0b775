//! The attribute-style map extended with numeric file formats.

use crate::array::{DType, NumArray};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::json::{self, JsonOptions};
use crate::key::KeyWarning;
use crate::map::AttrMap;
use crate::mat::{read_mat, MatReadOptions, MatWriteOptions, MatWriter};
use crate::npz::{NpzReader, NpzWriter};
use crate::value::Value;
use indexmap::IndexMap;
use ndarray::arr0;
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// Method names of [`NumAttrMap`], including those of [`AttrMap`].
const NUM_RESERVED: &[&str] = &[
    "attr",
    "attr_mut",
    "clear",
    "contains_key",
    "copy",
    "del_attr",
    "from_path",
    "get",
    "get_mut",
    "insert",
    "into_inner",
    "is_empty",
    "iter",
    "iter_mut",
    "keys",
    "len",
    "load",
    "load_json",
    "load_mat",
    "load_npz",
    "new",
    "remove",
    "save_json",
    "save_json_with",
    "save_mat",
    "save_npz",
    "set_attr",
    "update",
    "values",
    "values_mut",
];

/// An [`AttrMap`] for numerical work, which can also be saved to and loaded
/// from MAT-files and `.npz` archives, and which converts arrays to nested
/// lists when saving JSON.
///
/// All of [`AttrMap`]'s methods are available through `Deref`. `save_json`
/// and `save_json_with` are redefined here, so that arrays are written as
/// lists instead of failing.
///
/// # Example
///
/// ```no_run
/// use attrmap::{MatReadOptions, MatWriteOptions, NumAttrMap, Value};
/// use ndarray::array;
///
/// let mut map = NumAttrMap::new();
/// map.insert("gain", array![[3.5]]);
/// map.save_mat("run.mat", &MatWriteOptions::default())?;
///
/// let mut loaded = NumAttrMap::new();
/// loaded.load_mat("run.mat", &MatReadOptions::default())?;
/// assert_eq!(loaded["gain"], Value::Float(3.5));
/// # Ok::<_, attrmap::Error>(())
/// ```
#[derive(Clone, PartialEq)]
pub struct NumAttrMap(AttrMap);

impl NumAttrMap {
    /// Creates an empty map.
    pub fn new() -> NumAttrMap {
        NumAttrMap(AttrMap::with_reserved(NUM_RESERVED))
    }

    /// Creates a map from the file at `path`, selecting the loader by its
    /// extension (`.json`, `.mat` or `.npz`) with default options.
    ///
    /// Any other extension yields an empty map without touching the file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<NumAttrMap> {
        let path = path.as_ref();
        let mut map = NumAttrMap::new();
        match Format::from_path(path) {
            Some(format) => {
                map.load(path, format)?;
            }
            None => log::debug!("no loader for {}; leaving the map empty", path.display()),
        }
        Ok(map)
    }

    /// Loads the file at `path` as `format` with default options.
    ///
    /// JSON replaces the contents; MAT-files and archives are merged into
    /// them.
    pub fn load<P: AsRef<Path>>(&mut self, path: P, format: Format) -> Result<Vec<KeyWarning>> {
        match format {
            Format::Json => self.load_json(path, true),
            Format::Mat => self.load_mat(path, &MatReadOptions::default()),
            Format::Npz => self.load_npz(path, false),
        }
    }

    /// Returns a deep copy of the map. Same as `clone`.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.0.into_inner()
    }

    /// Writes the map to `path` as JSON, converting every array to nested
    /// lists.
    pub fn save_json<P: AsRef<Path>>(&self, path: P, options: &JsonOptions) -> Result<()> {
        let entries: IndexMap<String, Value> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone().arrays_to_lists(options.squeeze_all)))
            .collect();
        json::write(path.as_ref(), &entries, options.indent)
    }

    /// Writes the map to `path` as JSON, compact if `indent` is `None`,
    /// converting every array to nested lists.
    ///
    /// This shadows [`AttrMap::save_json_with`], which fails on arrays.
    pub fn save_json_with<P: AsRef<Path>>(&self, path: P, indent: Option<usize>) -> Result<()> {
        self.save_json(
            path,
            &JsonOptions {
                indent,
                squeeze_all: false,
            },
        )
    }

    /// Writes every entry to `path` as a MAT-file variable.
    ///
    /// Lists are stored as cell arrays and maps as structs. Entries whose
    /// keys start with an underscore are skipped.
    pub fn save_mat<P: AsRef<Path>>(&self, path: P, options: &MatWriteOptions) -> Result<()> {
        let path = path.as_ref();
        let wrap = |source| Error::WriteMat {
            path: path.to_owned(),
            source,
        };
        let file = File::create(path).map_err(Error::io(path))?;
        let mut mat = MatWriter::new(BufWriter::new(file), options.clone()).map_err(wrap)?;
        for (key, value) in self.iter() {
            mat.add_variable(key, value).map_err(wrap)?;
        }
        mat.finish().map_err(wrap)?;
        log::debug!("wrote {} variables to {}", self.len(), path.display());
        Ok(())
    }

    /// Merges the variables of the MAT-file at `path` into the map.
    ///
    /// With the default options every variable holding a single element,
    /// such as a `1x1` matrix, is loaded as that element.
    pub fn load_mat<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: &MatReadOptions,
    ) -> Result<Vec<KeyWarning>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(Error::io(path))?;
        let variables = read_mat(BufReader::new(file), options.squeeze_all).map_err(|source| {
            Error::ReadMat {
                path: path.to_owned(),
                source,
            }
        })?;
        log::debug!("read {} variables from {}", variables.len(), path.display());
        let squeeze_scalars = options.squeeze_floats && !options.squeeze_all;
        let variables = variables.into_iter().map(|(name, value)| match value {
            Value::Array(array) if squeeze_scalars && array.len() == 1 => {
                let scalar = array.scalar();
                (name, scalar.unwrap_or(Value::Array(array)))
            }
            other => (name, other),
        });
        if options.clear {
            self.clear();
        }
        Ok(self.update(variables))
    }

    /// Writes every entry to `path` as a member of a `.npz` archive, deflated
    /// if `compress` is set.
    ///
    /// Booleans, numbers and strings are stored as zero-dimensional arrays,
    /// and rectangular lists of numbers or of strings as arrays. Strings are
    /// stored as fixed-width unicode text, which NumPy loads without
    /// unpickling. Any other value fails with [`Error::Unrepresentable`]
    /// before the file is created.
    pub fn save_npz<P: AsRef<Path>>(&self, path: P, compress: bool) -> Result<()> {
        let path = path.as_ref();
        let arrays = self
            .iter()
            .map(|(key, value)| Ok((key, npz_array(key, value)?)))
            .collect::<Result<Vec<_>>>()?;
        let wrap = |source| Error::WriteNpz {
            path: path.to_owned(),
            source,
        };
        let file = File::create(path).map_err(Error::io(path))?;
        let mut npz = NpzWriter::with_compression(BufWriter::new(file), compress);
        for (key, array) in &arrays {
            npz.add_array(key.as_str(), array).map_err(wrap)?;
        }
        npz.finish().map_err(wrap)?;
        log::debug!("wrote {} arrays to {}", arrays.len(), path.display());
        Ok(())
    }

    /// Merges the arrays of the `.npz` archive at `path` into the map, after
    /// emptying it if `clear` is set.
    ///
    /// Text arrays are loaded as a string if zero-dimensional and as nested
    /// lists of strings otherwise. The archive is closed before the map is
    /// modified, whether or not every member could be read.
    pub fn load_npz<P: AsRef<Path>>(&mut self, path: P, clear: bool) -> Result<Vec<KeyWarning>> {
        let path = path.as_ref();
        let wrap = |source| Error::ReadNpz {
            path: path.to_owned(),
            source,
        };
        let entries = {
            let file = File::open(path).map_err(Error::io(path))?;
            let mut npz = NpzReader::new(BufReader::new(file)).map_err(wrap)?;
            let names = npz.names().map_err(wrap)?;
            names
                .into_iter()
                .enumerate()
                .map(|(index, name)| {
                    let array = npz.by_index(index).map_err(wrap)?;
                    let value = if array.is_text() {
                        array.to_value()
                    } else {
                        Value::Array(array)
                    };
                    Ok((name, value))
                })
                .collect::<Result<Vec<_>>>()?
        };
        log::debug!("read {} arrays from {}", entries.len(), path.display());
        if clear {
            self.clear();
        }
        Ok(self.update(entries))
    }
}

/// Converts a value to the array stored for it in a `.npz` archive.
fn npz_array<'a>(key: &str, value: &'a Value) -> Result<Cow<'a, NumArray>> {
    let unrepresentable = |reason: String| Error::Unrepresentable {
        key: key.to_owned(),
        format: Format::Npz,
        reason,
    };
    match value {
        Value::Array(array) if array.dtype() == DType::Object && !array.is_text() => {
            Err(unrepresentable(
                "object arrays holding anything but strings cannot be stored without pickling"
                    .to_owned(),
            ))
        }
        Value::Array(array) => Ok(Cow::Borrowed(array)),
        Value::Bool(b) => Ok(Cow::Owned(NumArray::Bool(arr0(*b).into_dyn()))),
        Value::Int(i) => Ok(Cow::Owned(NumArray::I64(arr0(*i).into_dyn()))),
        Value::Float(x) => Ok(Cow::Owned(NumArray::F64(arr0(*x).into_dyn()))),
        Value::String(_) => Ok(Cow::Owned(NumArray::Object(arr0(value.clone()).into_dyn()))),
        Value::List(items) => NumArray::from_list(items).map(Cow::Owned).ok_or_else(|| {
            unrepresentable(
                "list is ragged, mixes strings with numbers or holds other values".to_owned(),
            )
        }),
        other => Err(unrepresentable(format!(
            "{} values cannot be stored without pickling",
            other.kind()
        ))),
    }
}

impl Default for NumAttrMap {
    fn default() -> NumAttrMap {
        NumAttrMap::new()
    }
}

impl Deref for NumAttrMap {
    type Target = AttrMap;

    fn deref(&self) -> &AttrMap {
        &self.0
    }
}

impl DerefMut for NumAttrMap {
    fn deref_mut(&mut self) -> &mut AttrMap {
        &mut self.0
    }
}

impl fmt::Debug for NumAttrMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for NumAttrMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(entries: I) -> NumAttrMap {
        let mut map = NumAttrMap::new();
        map.update(entries);
        map
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for NumAttrMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, entries: I) {
        self.update(entries);
    }
}

impl<'a> IntoIterator for &'a NumAttrMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for NumAttrMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::WarningReason;
    use ndarray::array;

    #[test]
    fn format_methods_are_reserved() {
        let mut map = NumAttrMap::new();
        let warning = map.insert("save_mat", 1).unwrap();
        assert_eq!(warning.reason(), WarningReason::ReservedName);
        assert!(AttrMap::new().insert("save_mat", 1).is_none());
    }

    #[test]
    fn npz_conversions() {
        let int = Value::Int(3);
        assert_eq!(npz_array("k", &int).unwrap().shape(), &[] as &[usize]);
        let list = Value::from(vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(
            npz_array("k", &list).unwrap().into_owned(),
            NumArray::from(array![[1i64, 2], [3, 4]]),
        );
        let run = Value::from("run");
        let text = npz_array("k", &run).unwrap();
        assert!(text.is_text());
        assert_eq!(text.ndim(), 0);
        assert!(npz_array("k", &Value::from(vec!["a", "bc"])).unwrap().is_text());
        for bad in [
            Value::from(vec![Value::from("a"), Value::Int(1)]),
            Value::Null,
            Value::from(vec![Value::from(vec![1, 2]), Value::from(vec![3])]),
            Value::from(NumArray::object_from_list(vec![Value::Int(1)])),
        ] {
            assert!(matches!(
                npz_array("k", &bad),
                Err(Error::Unrepresentable { format: Format::Npz, .. })
            ));
        }
    }

    #[test]
    fn save_json_with_converts_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compact.json");
        let mut map = NumAttrMap::new();
        map.insert("a", array![[1, 2]]);
        map.save_json_with(&path, None).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"a":[[1,2]]}"#);
        assert!(map.0.save_json_with(&path, None).is_err());
    }

    #[test]
    fn deref_exposes_base_methods() {
        let mut map = NumAttrMap::new();
        map.set_attr("a", 1.5);
        assert_eq!(map.attr("a").unwrap(), &Value::Float(1.5));
        assert_eq!(map.len(), 1);
    }
}
