//! Conversion between `.npy` data bytes and [`NumArray`]s.

use super::{ReadNpyError, WriteNpyError};
use crate::array::{from_shape_vec, DType, NumArray};
use crate::value::Value;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use py_literal::Value as PyValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

/// What a single element of a `.npy` file holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    Numeric(DType),
    /// Fixed-width text of this many UTF-32 code units.
    Unicode(usize),
    /// Fixed-width byte string.
    Bytes(usize),
}

impl Layout {
    fn size(self) -> Option<usize> {
        match self {
            Layout::Numeric(dtype) => dtype.size(),
            Layout::Unicode(width) => width.checked_mul(4),
            Layout::Bytes(width) => Some(width),
        }
    }
}

/// Parses a type descriptor such as `'<f8'`, `'|b1'` or `'<U5'`.
fn parse_descriptor(desc: &PyValue) -> Option<(Layout, Endian)> {
    let s = match desc {
        PyValue::String(s) => s.as_str(),
        _ => return None,
    };
    let (endian, code) = match s.as_bytes().first()? {
        b'<' => (Some(Endian::Little), &s[1..]),
        b'>' => (Some(Endian::Big), &s[1..]),
        b'|' => (None, &s[1..]),
        b'=' => (None, &s[1..]),
        _ => (None, s),
    };
    let dtype = match code {
        "b1" | "?" => DType::Bool,
        "i1" => DType::I8,
        "i2" => DType::I16,
        "i4" => DType::I32,
        "i8" => DType::I64,
        "u1" => DType::U8,
        "u2" => DType::U16,
        "u4" => DType::U32,
        "u8" => DType::U64,
        "f4" => DType::F32,
        "f8" => DType::F64,
        _ => {
            let width = |digits: &str| digits.parse::<usize>().ok();
            let layout = match code.as_bytes().first()? {
                b'U' => Layout::Unicode(width(&code[1..])?),
                b'S' => Layout::Bytes(width(&code[1..])?),
                _ => return None,
            };
            return Some((layout, endian.unwrap_or_else(native)));
        }
    };
    Some((Layout::Numeric(dtype), endian.unwrap_or_else(native)))
}

fn native() -> Endian {
    if cfg!(target_endian = "big") {
        Endian::Big
    } else {
        Endian::Little
    }
}

/// The descriptor written for `array`. Data is always written little-endian.
pub(super) fn descriptor(array: &NumArray) -> Result<PyValue, WriteNpyError> {
    let desc = match array.dtype() {
        DType::Bool => "|b1",
        DType::I8 => "|i1",
        DType::I16 => "<i2",
        DType::I32 => "<i4",
        DType::I64 => "<i8",
        DType::U8 => "|u1",
        DType::U16 => "<u2",
        DType::U32 => "<u4",
        DType::U64 => "<u8",
        DType::F32 => "<f4",
        DType::F64 => "<f8",
        DType::Object => return Ok(PyValue::String(format!("<U{}", text_width(array)?))),
    };
    Ok(PyValue::String(desc.into()))
}

/// Number of characters in the longest string of a text array, and at least
/// one.
fn text_width(array: &NumArray) -> Result<usize, WriteNpyError> {
    let elems = array.as_array::<Value>().ok_or(WriteNpyError::ObjectArray)?;
    elems.iter().try_fold(1, |width, elem| match elem {
        Value::String(s) => Ok(width.max(s.chars().count())),
        _ => Err(WriteNpyError::ObjectArray),
    })
}

/// Decodes `bytes` as `shape` elements described by `type_desc`.
pub(super) fn decode(
    type_desc: &PyValue,
    shape: &[usize],
    fortran_order: bool,
    bytes: &[u8],
) -> Result<NumArray, ReadNpyError> {
    let (layout, endian) = parse_descriptor(type_desc)
        .ok_or_else(|| ReadNpyError::UnsupportedDescriptor(type_desc.clone()))?;
    let len = shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or(ReadNpyError::LengthOverflow)?;
    let size = layout.size().ok_or(ReadNpyError::LengthOverflow)?;
    let needed = len.checked_mul(size).ok_or(ReadNpyError::LengthOverflow)?;
    if bytes.len() < needed {
        return Err(ReadNpyError::MissingBytes(needed - bytes.len()));
    } else if bytes.len() > needed {
        return Err(ReadNpyError::ExtraBytes(bytes.len() - needed));
    }
    match (layout, endian) {
        (Layout::Numeric(dtype), Endian::Little) => {
            decode_with::<LittleEndian>(dtype, shape, fortran_order, bytes, len)
        }
        (Layout::Numeric(dtype), Endian::Big) => {
            decode_with::<BigEndian>(dtype, shape, fortran_order, bytes, len)
        }
        (Layout::Unicode(width), Endian::Little) => {
            decode_unicode::<LittleEndian>(width, shape, fortran_order, bytes, len)
        }
        (Layout::Unicode(width), Endian::Big) => {
            decode_unicode::<BigEndian>(width, shape, fortran_order, bytes, len)
        }
        (Layout::Bytes(width), _) => {
            let strings = split(bytes, width, len)
                .map(|chunk| {
                    let end = chunk.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                    Value::String(String::from_utf8_lossy(&chunk[..end]).into_owned())
                })
                .collect();
            Ok(NumArray::Object(from_shape_vec(shape, fortran_order, strings)?))
        }
    }
}

/// Splits `bytes` into `len` chunks of `width` bytes.
fn split(bytes: &[u8], width: usize, len: usize) -> impl Iterator<Item = &[u8]> {
    (0..len).map(move |i| &bytes[i * width..(i + 1) * width])
}

fn decode_unicode<E: ByteOrder>(
    width: usize,
    shape: &[usize],
    fortran: bool,
    bytes: &[u8],
    len: usize,
) -> Result<NumArray, ReadNpyError> {
    let strings = split(bytes, width * 4, len)
        .map(|chunk| {
            let mut units = vec![0; width];
            E::read_u32_into(chunk, &mut units);
            let end = units.iter().rposition(|&u| u != 0).map_or(0, |i| i + 1);
            units[..end]
                .iter()
                .map(|&u| char::from_u32(u).ok_or(ReadNpyError::InvalidChar(u)))
                .collect::<Result<String, _>>()
                .map(Value::String)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NumArray::Object(from_shape_vec(shape, fortran, strings)?))
}

fn decode_with<E: ByteOrder>(
    dtype: DType,
    shape: &[usize],
    fortran: bool,
    bytes: &[u8],
    len: usize,
) -> Result<NumArray, ReadNpyError> {
    macro_rules! read_into {
        ($variant:ident, $zero:expr, $read_into:ident) => {{
            let mut out = vec![$zero; len];
            E::$read_into(bytes, &mut out);
            NumArray::$variant(from_shape_vec(shape, fortran, out)?)
        }};
    }
    let array = match dtype {
        DType::Bool => {
            let data = bytes
                .iter()
                .map(|&b| match b {
                    0 => Ok(false),
                    1 => Ok(true),
                    other => Err(ReadNpyError::InvalidBool(other)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            NumArray::Bool(from_shape_vec(shape, fortran, data)?)
        }
        DType::I8 => NumArray::I8(from_shape_vec(
            shape,
            fortran,
            bytes.iter().map(|&b| b as i8).collect(),
        )?),
        DType::U8 => NumArray::U8(from_shape_vec(shape, fortran, bytes.to_vec())?),
        DType::I16 => read_into!(I16, 0, read_i16_into),
        DType::I32 => read_into!(I32, 0, read_i32_into),
        DType::I64 => read_into!(I64, 0, read_i64_into),
        DType::U16 => read_into!(U16, 0, read_u16_into),
        DType::U32 => read_into!(U32, 0, read_u32_into),
        DType::U64 => read_into!(U64, 0, read_u64_into),
        DType::F32 => read_into!(F32, 0., read_f32_into),
        DType::F64 => read_into!(F64, 0., read_f64_into),
        DType::Object => {
            return Err(ReadNpyError::UnsupportedDescriptor(PyValue::String("|O".into())))
        }
    };
    Ok(array)
}

/// Encodes the elements of `array` in C order, little-endian.
pub(super) fn encode(array: &NumArray) -> Result<Vec<u8>, WriteNpyError> {
    macro_rules! write_into {
        ($a:expr, $size:expr, $write_into:ident) => {{
            let elems: Vec<_> = $a.iter().copied().collect();
            let mut out = vec![0; elems.len() * $size];
            LittleEndian::$write_into(&elems, &mut out);
            out
        }};
    }
    let bytes: Vec<u8> = match array {
        NumArray::Bool(a) => a.iter().map(|&b| u8::from(b)).collect(),
        NumArray::I8(a) => a.iter().map(|&x| x as u8).collect(),
        NumArray::U8(a) => a.iter().copied().collect(),
        NumArray::I16(a) => write_into!(a, 2, write_i16_into),
        NumArray::I32(a) => write_into!(a, 4, write_i32_into),
        NumArray::I64(a) => write_into!(a, 8, write_i64_into),
        NumArray::U16(a) => write_into!(a, 2, write_u16_into),
        NumArray::U32(a) => write_into!(a, 4, write_u32_into),
        NumArray::U64(a) => write_into!(a, 8, write_u64_into),
        NumArray::F32(a) => write_into!(a, 4, write_f32_into),
        NumArray::F64(a) => write_into!(a, 8, write_f64_into),
        NumArray::Object(a) => {
            let width = text_width(array)?;
            let mut out = vec![0; a.len() * width * 4];
            for (elem, chunk) in a.iter().zip(out.chunks_exact_mut(width * 4)) {
                if let Value::String(s) = elem {
                    let units: Vec<u32> = s.chars().map(u32::from).collect();
                    LittleEndian::write_u32_into(&units, &mut chunk[..units.len() * 4]);
                }
            }
            out
        }
    };
    Ok(bytes)
}
