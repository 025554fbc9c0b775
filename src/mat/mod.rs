//! Level 5 MAT-file codec.
//!
//! A MAT-file is a 128-byte header followed by a sequence of tagged data
//! elements, one `miMATRIX` element (optionally wrapped in a zlib-compressed
//! `miCOMPRESSED` element) per variable. Matrix data is stored in
//! column-major order, and every variable has at least two dimensions.
//!
//! See the "MAT-File Format" document published by MathWorks for details.

mod read;
mod write;

pub use self::read::{read_mat, MatReader};
pub use self::write::{write_mat, MatWriter};

use ndarray::ShapeError;
use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Length of the file header, including the version and endian indicator.
const HEADER_LEN: usize = 128;
/// Length of the descriptive text at the start of the header.
const HEADER_TEXT_LEN: usize = 116;
/// Version number of level 5 MAT-files.
const VERSION_5: u16 = 0x0100;

/// Flag bits in the array flags subelement.
const FLAG_COMPLEX: u32 = 0x0800;
const FLAG_LOGICAL: u32 = 0x0200;

/// Data types of tagged elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DataType {
    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Single = 7,
    Double = 9,
    Int64 = 12,
    UInt64 = 13,
    Matrix = 14,
    Compressed = 15,
    Utf8 = 16,
    Utf16 = 17,
    Utf32 = 18,
}

impl DataType {
    fn from_u32(tag: u32) -> Option<DataType> {
        Some(match tag {
            1 => DataType::Int8,
            2 => DataType::UInt8,
            3 => DataType::Int16,
            4 => DataType::UInt16,
            5 => DataType::Int32,
            6 => DataType::UInt32,
            7 => DataType::Single,
            9 => DataType::Double,
            12 => DataType::Int64,
            13 => DataType::UInt64,
            14 => DataType::Matrix,
            15 => DataType::Compressed,
            16 => DataType::Utf8,
            17 => DataType::Utf16,
            18 => DataType::Utf32,
            _ => return None,
        })
    }
}

/// Classes of `miMATRIX` elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArrayClass {
    Cell = 1,
    Struct = 2,
    Object = 3,
    Char = 4,
    Sparse = 5,
    Double = 6,
    Single = 7,
    Int8 = 8,
    UInt8 = 9,
    Int16 = 10,
    UInt16 = 11,
    Int32 = 12,
    UInt32 = 13,
    Int64 = 14,
    UInt64 = 15,
    Function = 16,
    Opaque = 17,
}

impl ArrayClass {
    fn from_u8(class: u8) -> Option<ArrayClass> {
        Some(match class {
            1 => ArrayClass::Cell,
            2 => ArrayClass::Struct,
            3 => ArrayClass::Object,
            4 => ArrayClass::Char,
            5 => ArrayClass::Sparse,
            6 => ArrayClass::Double,
            7 => ArrayClass::Single,
            8 => ArrayClass::Int8,
            9 => ArrayClass::UInt8,
            10 => ArrayClass::Int16,
            11 => ArrayClass::UInt16,
            12 => ArrayClass::Int32,
            13 => ArrayClass::UInt32,
            14 => ArrayClass::Int64,
            15 => ArrayClass::UInt64,
            16 => ArrayClass::Function,
            17 => ArrayClass::Opaque,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            ArrayClass::Cell => "cell",
            ArrayClass::Struct => "struct",
            ArrayClass::Object => "object",
            ArrayClass::Char => "char",
            ArrayClass::Sparse => "sparse",
            ArrayClass::Double => "double",
            ArrayClass::Single => "single",
            ArrayClass::Int8 => "int8",
            ArrayClass::UInt8 => "uint8",
            ArrayClass::Int16 => "int16",
            ArrayClass::UInt16 => "uint16",
            ArrayClass::Int32 => "int32",
            ArrayClass::UInt32 => "uint32",
            ArrayClass::Int64 => "int64",
            ArrayClass::UInt64 => "uint64",
            ArrayClass::Function => "function handle",
            ArrayClass::Opaque => "opaque",
        }
    }
}

/// How one-dimensional arrays are stored, since MAT-files have no 1-D arrays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnedAs {
    /// As a `1xN` row vector.
    #[default]
    Row,
    /// As an `Nx1` column vector.
    Column,
}

/// Options for [`NumAttrMap::save_mat`](crate::NumAttrMap::save_mat) and
/// [`MatWriter`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatWriteOptions {
    /// Compress each variable with zlib.
    pub compress: bool,
    pub oned_as: OnedAs,
    /// Allow struct field names of up to 63 characters instead of 31.
    pub long_field_names: bool,
}

/// Options for [`NumAttrMap::load_mat`](crate::NumAttrMap::load_mat).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatReadOptions {
    /// Replace every top-level array holding exactly one element by that
    /// element, undoing the format's habit of storing scalars as `1x1`
    /// matrices. Ignored when `squeeze_all` is set.
    pub squeeze_floats: bool,
    /// Remove every singleton axis of every decoded array, turning
    /// single-element arrays into scalars.
    pub squeeze_all: bool,
    /// Empty the map before merging in the loaded variables.
    pub clear: bool,
}

impl Default for MatReadOptions {
    fn default() -> MatReadOptions {
        MatReadOptions {
            squeeze_floats: true,
            squeeze_all: false,
            clear: false,
        }
    }
}

/// An error reading a MAT-file.
#[derive(Debug, Error)]
pub enum ReadMatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("not a level 5 MAT-file")]
    NotLevel5,
    #[error("unsupported MAT-file version {0:#06x}")]
    Version(u16),
    #[error("file ends in the middle of a data element")]
    Truncated,
    #[error("unknown data type {0}")]
    UnknownDataType(u32),
    #[error("expected {expected} data, found data type {found}")]
    UnexpectedElement { expected: &'static str, found: u32 },
    #[error("unknown array class {0}")]
    UnknownClass(u8),
    #[error("{0} arrays are not supported")]
    UnsupportedClass(&'static str),
    #[error("complex arrays are not supported")]
    Complex,
    #[error("negative dimension {0}")]
    NegativeDimension(i32),
    #[error("stored value does not fit the array class {0}")]
    OutOfRange(&'static str),
    #[error("invalid character data")]
    InvalidChar,
    #[error("invalid name: {0}")]
    InvalidName(#[from] FromUtf8Error),
    #[error("data did not match dimensions: {0}")]
    Shape(#[from] ShapeError),
}

/// An error writing a MAT-file.
#[derive(Debug, Error)]
pub enum WriteMatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("dimension {0} is too large for a MAT-file")]
    DimensionTooLarge(usize),
    #[error("element of {0} bytes is too large for a MAT-file")]
    ElementTooLarge(usize),
    #[error("field name {name:?} is longer than {max} characters")]
    FieldNameTooLong { name: String, max: usize },
}
