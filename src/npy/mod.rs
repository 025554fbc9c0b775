//! Reading and writing single arrays in [`.npy`] format.
//!
//! Unlike a statically typed reader, the element type is taken from the
//! header's `descr` field at runtime, so any supported `.npy` file can be
//! loaded into a [`NumArray`]. Fixed-width text (`'<U5'`, `'|S3'`) loads as
//! an object array of strings, and such arrays are written as `'<U{n}'`.
//!
//! [`.npy`]: https://numpy.org/doc/stable/reference/generated/numpy.lib.format.html

mod elements;
mod header;

use self::header::Header;
pub use self::header::{ParseHeaderError, ReadHeaderError, WriteHeaderError};
use crate::array::NumArray;
use ndarray::ShapeError;
use py_literal::Value as PyValue;
use std::io;
use thiserror::Error;

/// An error reading a `.npy` file.
#[derive(Debug, Error)]
pub enum ReadNpyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("error reading header: {0}")]
    Header(#[from] ReadHeaderError),
    /// The `descr` is not a supported element type. Object arrays (`'|O'`)
    /// land here because they need unpickling.
    #[error("unsupported type descriptor: {0}")]
    UnsupportedDescriptor(PyValue),
    #[error("number of elements in shape overflows usize")]
    LengthOverflow,
    #[error("missing {0} bytes of array data")]
    MissingBytes(usize),
    #[error("{0} extra bytes after array data")]
    ExtraBytes(usize),
    #[error("error parsing value {0:#04x} as a bool")]
    InvalidBool(u8),
    #[error("invalid unicode code point {0:#x} in text data")]
    InvalidChar(u32),
    #[error("data did not match shape in header: {0}")]
    Shape(#[from] ShapeError),
}

/// An error writing a `.npy` file.
#[derive(Debug, Error)]
pub enum WriteNpyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("error writing header: {0}")]
    Header(#[from] WriteHeaderError),
    /// Only object arrays of strings can be written, as fixed-width text.
    #[error("object arrays holding anything but strings cannot be written without pickling")]
    ObjectArray,
}

/// Reads an array in `.npy` format from `reader`.
pub fn read_npy<R: io::Read>(mut reader: R) -> Result<NumArray, ReadNpyError> {
    let header = Header::from_reader(&mut reader)?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    elements::decode(
        &header.type_descriptor,
        &header.shape,
        header.fortran_order,
        &bytes,
    )
}

/// Writes `array` in `.npy` format to `writer`, in C order.
pub fn write_npy<W: io::Write>(array: &NumArray, mut writer: W) -> Result<(), WriteNpyError> {
    let header = Header {
        type_descriptor: elements::descriptor(array)?,
        fortran_order: false,
        shape: array.shape().to_vec(),
    };
    let data = elements::encode(array)?;
    header.write(&mut writer)?;
    writer.write_all(&data)?;
    Ok(())
}
