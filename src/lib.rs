//! This crate provides [`AttrMap`], an ordered map of named [`Value`]s that
//! can be accessed both by key and as attributes, and which can be loaded
//! from and saved to JSON5 files.
//!
//! [`NumAttrMap`] extends it for numerical work: its values may be
//! dynamically typed [`ndarray`] arrays ([`NumArray`]), and it can also be
//! loaded from and saved to level 5 [MAT-files] and NumPy [`.npz`] archives.
//!
//! [`ndarray`]: https://github.com/rust-ndarray/ndarray
//! [MAT-files]: https://www.mathworks.com/help/pdf_doc/matlab/matfile_format.pdf
//! [`.npz`]: https://numpy.org/doc/stable/reference/generated/numpy.savez.html
//!
//! # Attributes and keys
//!
//! Any string can be used as a key. A key can also be used as an attribute
//! (through [`AttrMap::attr`], [`AttrMap::set_attr`] and
//! [`AttrMap::del_attr`]) if it matches `^[a-zA-Z_$][a-zA-Z_$0-9]*$` and is
//! not the name of one of the map's methods. Storing a value under any other
//! key succeeds, but returns a [`KeyWarning`] and logs it through the [`log`]
//! facade.
//!
//! # Formats
//!
//! See [`Format`] for the extensions recognized by [`AttrMap::from_path`] and
//! [`NumAttrMap::from_path`]. The codecs are also usable on their own:
//!
//! * [`NpzReader`] and [`NpzWriter`] read and write `.npz` archives of
//!   [`NumArray`]s.
//! * [`MatReader`] and [`MatWriter`] (and [`read_mat`] and [`write_mat`])
//!   read and write MAT-files of [`Value`]s.
//!
//! # Limitations
//!
//! * `.npz` archives can only hold boolean, integer, floating point and
//!   text arrays. Maps, null, mixed lists and object arrays of anything but
//!   strings would need Python's pickle format and are rejected.
//!
//! * Complex, sparse, object and function handle MAT-file variables are not
//!   supported, and neither are MAT-files of version 4 or 7.3.
//!
//! # Example
//!
//! ```no_run
//! use attrmap::{JsonOptions, NumAttrMap, Value};
//! use ndarray::array;
//!
//! let mut map = NumAttrMap::from_path("settings.json")?;
//! map.set_attr("samples", array![[1.0], [2.0], [3.0]]);
//! map.save_json(
//!     "settings.json",
//!     &JsonOptions {
//!         indent: Some(2),
//!         squeeze_all: true,
//!     },
//! )?;
//! map.save_npz("settings.npz", true)?;
//!
//! let reloaded = NumAttrMap::from_path("settings.json")?;
//! assert_eq!(reloaded["samples"], Value::from(vec![1.0, 2.0, 3.0]));
//! # Ok::<_, attrmap::Error>(())
//! ```

mod array;
mod error;
mod format;
mod json;
mod key;
mod map;
mod mat;
mod npy;
mod npz;
mod num_map;
mod value;

pub use crate::array::{DType, Element, NumArray};
pub use crate::error::{Error, Result};
pub use crate::format::Format;
pub use crate::json::JsonOptions;
pub use crate::key::{is_identifier, KeyWarning, WarningReason};
pub use crate::map::AttrMap;
pub use crate::mat::{
    read_mat, write_mat, MatReadOptions, MatReader, MatWriteOptions, MatWriter, OnedAs,
    ReadMatError, WriteMatError,
};
pub use crate::npy::{
    read_npy, write_npy, ParseHeaderError, ReadHeaderError, ReadNpyError, WriteHeaderError,
    WriteNpyError,
};
pub use crate::npz::{NpzReader, NpzWriter, ReadNpzError, WriteNpzError};
pub use crate::num_map::NumAttrMap;
pub use crate::value::Value;
