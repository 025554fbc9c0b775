//! The attribute-style map.

use crate::error::{Error, Result};
use crate::format::Format;
use crate::json;
use crate::key::{self, KeyWarning};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::path::Path;

/// Method names of [`AttrMap`], which keys must not shadow to be usable as
/// attributes.
pub(crate) const RESERVED: &[&str] = &[
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
    "new",
    "remove",
    "save_json",
    "save_json_with",
    "set_attr",
    "update",
    "values",
    "values_mut",
];

/// An ordered map from string keys to [`Value`]s whose entries can be
/// reached both by key and, for keys that are valid identifiers, as named
/// attributes.
///
/// The two facades share one store: `map.set_attr("x", 1)` and
/// `map.insert("x", 1)` are the same operation, and both `map.attr("x")` and
/// `map["x"]` read it back. Keys that cannot be spelled as attributes (such
/// as `"1bad"`, or `"copy"`, which is a method name) are still stored, but
/// produce a [`KeyWarning`], which is returned and also logged at `warn`
/// level.
///
/// Cloning is always deep: the map owns all of its values.
///
/// # Example
///
/// ```
/// use attrmap::{AttrMap, Value};
///
/// let mut map = AttrMap::new();
/// assert!(map.set_attr("alpha", 0.5).is_none());
/// assert_eq!(map["alpha"], Value::Float(0.5));
///
/// let warning = map.insert("has space", "x").unwrap();
/// assert_eq!(warning.key(), "has space");
/// assert!(map.attr("has space").is_err());
/// assert_eq!(map["has space"], Value::from("x"));
/// ```
#[derive(Clone)]
pub struct AttrMap {
    entries: IndexMap<String, Value>,
    reserved: &'static [&'static str],
}

impl AttrMap {
    /// Creates an empty map.
    pub fn new() -> AttrMap {
        AttrMap::with_reserved(RESERVED)
    }

    pub(crate) fn with_reserved(reserved: &'static [&'static str]) -> AttrMap {
        AttrMap {
            entries: IndexMap::new(),
            reserved,
        }
    }

    /// Creates a map from the file at `path` if its extension is `.json`.
    ///
    /// Any other extension yields an empty map without touching the file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<AttrMap> {
        let path = path.as_ref();
        let mut map = AttrMap::new();
        match Format::from_path(path) {
            Some(Format::Json) => {
                map.load_json(path, true)?;
            }
            _ => log::debug!("no loader for {}; leaving the map empty", path.display()),
        }
        Ok(map)
    }

    /// Replaces the contents with the file at `path`, read as `format`.
    ///
    /// Only [`Format::Json`] is supported; see
    /// [`NumAttrMap`](crate::NumAttrMap) for the numeric formats.
    pub fn load<P: AsRef<Path>>(&mut self, path: P, format: Format) -> Result<Vec<KeyWarning>> {
        match format {
            Format::Json => self.load_json(path, true),
            other => Err(Error::UnsupportedFormat(other)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Stores `value` under `key`, replacing any previous value in place.
    ///
    /// Returns a warning if the key cannot be used as an attribute. The value
    /// is stored either way.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<KeyWarning>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let key = key.into();
        let warning = self.check_key(&key);
        self.entries.insert(key, value.into());
        warning
    }

    /// Removes and returns the value under `key`, keeping the order of the
    /// remaining entries.
    pub fn remove(&mut self, key: &str) -> Result<Value> {
        self.entries
            .shift_remove(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Reads the attribute `name`.
    pub fn attr(&self, name: &str) -> Result<&Value> {
        self.check_attr(name)?;
        self.entries
            .get(name)
            .ok_or_else(|| Error::KeyNotFound(name.to_owned()))
    }

    pub fn attr_mut(&mut self, name: &str) -> Result<&mut Value> {
        self.check_attr(name)?;
        self.entries
            .get_mut(name)
            .ok_or_else(|| Error::KeyNotFound(name.to_owned()))
    }

    /// Sets the attribute `name`. Same as [`AttrMap::insert`].
    pub fn set_attr<K, V>(&mut self, name: K, value: V) -> Option<KeyWarning>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.insert(name, value)
    }

    /// Deletes the attribute `name`, returning its value.
    pub fn del_attr(&mut self, name: &str) -> Result<Value> {
        self.check_attr(name)?;
        self.remove(name)
    }

    /// Returns a deep copy of the map. Same as `clone`.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Inserts every entry of `entries`, overwriting existing keys and
    /// keeping the others. Returns the warnings for keys that cannot be used
    /// as attributes.
    pub fn update<I, K, V>(&mut self, entries: I) -> Vec<KeyWarning>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        entries
            .into_iter()
            .filter_map(|(key, value)| self.insert(key, value))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Value> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Value> {
        self.entries.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> indexmap::map::ValuesMut<'_, String, Value> {
        self.entries.values_mut()
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.entries
    }

    /// Loads the top-level entries of the JSON5 document at `path` through
    /// the validated setter, after emptying the map if `clear` is set.
    ///
    /// The map is left untouched if the file cannot be read or parsed.
    pub fn load_json<P: AsRef<Path>>(&mut self, path: P, clear: bool) -> Result<Vec<KeyWarning>> {
        let entries = json::read(path.as_ref())?;
        if clear {
            self.clear();
        }
        Ok(self.update(entries))
    }

    /// Writes the map to `path` as JSON indented by four spaces.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_json_with(path, Some(4))
    }

    /// Writes the map to `path` as JSON, compact if `indent` is `None`.
    ///
    /// Fails with [`Error::WriteJson`] if a value is a [`NumArray`](crate::NumArray).
    pub fn save_json_with<P: AsRef<Path>>(&self, path: P, indent: Option<usize>) -> Result<()> {
        json::write(path.as_ref(), &self.entries, indent)
    }

    fn check_key(&self, key: &str) -> Option<KeyWarning> {
        let warning = key::check(key, self.reserved);
        if let Some(warning) = &warning {
            log::warn!("{}", warning);
        }
        warning
    }

    fn check_attr(&self, name: &str) -> Result<()> {
        match key::check(name, self.reserved) {
            Some(_) => Err(Error::NotAnAttribute(name.to_owned())),
            None => Ok(()),
        }
    }
}

impl Default for AttrMap {
    fn default() -> AttrMap {
        AttrMap::new()
    }
}

impl PartialEq for AttrMap {
    fn eq(&self, other: &AttrMap) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for AttrMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(&self.entries).finish()
    }
}

impl Index<&str> for AttrMap {
    type Output = Value;

    /// # Panics
    ///
    /// Panics if `key` is not present.
    fn index(&self, key: &str) -> &Value {
        match self.entries.get(key) {
            Some(value) => value,
            None => panic!("key not found: {:?}", key),
        }
    }
}

impl IndexMut<&str> for AttrMap {
    fn index_mut(&mut self, key: &str) -> &mut Value {
        match self.entries.get_mut(key) {
            Some(value) => value,
            None => panic!("key not found: {:?}", key),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(entries: I) -> AttrMap {
        let mut map = AttrMap::new();
        map.update(entries);
        map
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for AttrMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, entries: I) {
        self.update(entries);
    }
}

impl<'a> IntoIterator for &'a AttrMap {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for AttrMap {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
