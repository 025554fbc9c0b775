use super::{
    ArrayClass, DataType, ReadMatError, FLAG_COMPLEX, FLAG_LOGICAL, HEADER_LEN, HEADER_TEXT_LEN,
    VERSION_5,
};
use crate::array::{from_shape_vec, NumArray};
use crate::value::Value;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use indexmap::IndexMap;
use ndarray::{ArrayD, IxDyn};
use num_traits::NumCast;
use std::io::Read;
use std::marker::PhantomData;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

/// A tagged data element borrowed from a buffer.
struct Element<'a> {
    data_type: u32,
    data: &'a [u8],
}

impl Element<'_> {
    fn is(&self, data_type: DataType) -> bool {
        self.data_type == data_type as u32
    }

    fn check_type(&self, data_type: DataType, what: &'static str) -> Result<(), ReadMatError> {
        if self.is(data_type) {
            Ok(())
        } else {
            Err(ReadMatError::UnexpectedElement {
                expected: what,
                found: self.data_type,
            })
        }
    }
}

/// Walks the data elements in a buffer.
struct Elements<'a, E> {
    buf: &'a [u8],
    pos: usize,
    order: PhantomData<E>,
}

impl<'a, E: ByteOrder> Elements<'a, E> {
    fn new(buf: &'a [u8]) -> Self {
        Elements::at(buf, 0)
    }

    fn at(buf: &'a [u8], pos: usize) -> Self {
        Elements {
            buf,
            pos,
            order: PhantomData,
        }
    }

    fn next(&mut self) -> Result<Option<Element<'a>>, ReadMatError> {
        let rest = self.buf.get(self.pos..).unwrap_or_default();
        if rest.is_empty() {
            return Ok(None);
        }
        if rest.len() < 8 {
            return Err(ReadMatError::Truncated);
        }
        let word = E::read_u32(&rest[..4]);
        // Small data element: the byte count shares the first word with the
        // type, and up to four bytes of data follow.
        let small_len = (word >> 16) as usize;
        if small_len != 0 {
            if small_len > 4 {
                return Err(ReadMatError::Truncated);
            }
            self.pos += 8;
            return Ok(Some(Element {
                data_type: word & 0xffff,
                data: &rest[4..4 + small_len],
            }));
        }
        let len = E::read_u32(&rest[4..8]) as usize;
        let end = 8usize.checked_add(len).ok_or(ReadMatError::Truncated)?;
        let data = rest.get(8..end).ok_or(ReadMatError::Truncated)?;
        // Compressed elements are not padded to 8 bytes.
        let advance = if word == DataType::Compressed as u32 {
            end
        } else {
            (end + 7) / 8 * 8
        };
        self.pos += advance.min(rest.len());
        Ok(Some(Element {
            data_type: word,
            data,
        }))
    }

    fn require(&mut self) -> Result<Element<'a>, ReadMatError> {
        self.next()?.ok_or(ReadMatError::Truncated)
    }
}

/// Reader for level 5 MAT-files, yielding one `(name, value)` pair per
/// variable.
///
/// # Example
///
/// ```no_run
/// use attrmap::MatReader;
/// use std::fs::File;
///
/// let reader = MatReader::new(File::open("data.mat")?)?;
/// for variable in reader {
///     let (name, value) = variable?;
///     println!("{}: {}", name, value.kind());
/// }
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
pub struct MatReader {
    data: Vec<u8>,
    pos: usize,
    endian: Endian,
    squeeze_me: bool,
}

impl MatReader {
    /// Reads the whole file and checks its header.
    pub fn new<R: Read>(mut reader: R) -> Result<MatReader, ReadMatError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        if data.len() < HEADER_LEN {
            return Err(ReadMatError::NotLevel5);
        }
        let endian = match &data[HEADER_LEN - 2..HEADER_LEN] {
            b"IM" => Endian::Little,
            b"MI" => Endian::Big,
            _ => return Err(ReadMatError::NotLevel5),
        };
        let version_bytes = &data[HEADER_LEN - 4..HEADER_LEN - 2];
        let version = match endian {
            Endian::Little => LittleEndian::read_u16(version_bytes),
            Endian::Big => BigEndian::read_u16(version_bytes),
        };
        if version != VERSION_5 {
            return Err(ReadMatError::Version(version));
        }
        log::debug!("MAT-file header: {}", String::from_utf8_lossy(&data[..HEADER_TEXT_LEN]).trim_end());
        Ok(MatReader {
            data,
            pos: HEADER_LEN,
            endian,
            squeeze_me: false,
        })
    }

    /// Removes singleton axes from every decoded array, at any depth,
    /// and turns single-element arrays into scalars.
    pub fn squeeze_me(mut self, squeeze_me: bool) -> MatReader {
        self.squeeze_me = squeeze_me;
        self
    }

    /// Reads the next variable, or returns `None` at the end of the file.
    pub fn next_variable(&mut self) -> Result<Option<(String, Value)>, ReadMatError> {
        match self.endian {
            Endian::Little => self.next_variable_with::<LittleEndian>(),
            Endian::Big => self.next_variable_with::<BigEndian>(),
        }
    }

    fn next_variable_with<E: ByteOrder>(&mut self) -> Result<Option<(String, Value)>, ReadMatError> {
        loop {
            let mut elements = Elements::<E>::at(&self.data, self.pos);
            let element = match elements.next()? {
                Some(element) => element,
                None => return Ok(None),
            };
            self.pos = elements.pos;
            let (name, value) = match DataType::from_u32(element.data_type) {
                Some(DataType::Compressed) => {
                    let mut inflated = Vec::new();
                    ZlibDecoder::new(element.data).read_to_end(&mut inflated)?;
                    let matrix = Elements::<E>::new(&inflated).require()?;
                    matrix.check_type(DataType::Matrix, "matrix")?;
                    read_matrix::<E>(matrix.data, self.squeeze_me)?
                }
                Some(DataType::Matrix) => read_matrix::<E>(element.data, self.squeeze_me)?,
                _ => {
                    return Err(ReadMatError::UnexpectedElement {
                        expected: "matrix",
                        found: element.data_type,
                    })
                }
            };
            if name.is_empty() {
                log::debug!("skipping unnamed {} variable", value.kind());
                continue;
            }
            log::trace!("read MAT variable {:?} ({})", name, value.kind());
            return Ok(Some((name, value)));
        }
    }
}

impl Iterator for MatReader {
    type Item = Result<(String, Value), ReadMatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_variable().transpose()
    }
}

/// Reads every variable of a MAT-file, in file order.
pub fn read_mat<R: Read>(
    reader: R,
    squeeze_me: bool,
) -> Result<IndexMap<String, Value>, ReadMatError> {
    MatReader::new(reader)?.squeeze_me(squeeze_me).collect()
}

fn read_matrix<E: ByteOrder>(data: &[u8], squeeze_me: bool) -> Result<(String, Value), ReadMatError> {
    // MATLAB writes empty cells as matrix elements without subelements.
    if data.is_empty() {
        let empty = ArrayD::<f64>::zeros(IxDyn(&[0, 0]));
        return Ok((String::new(), Value::Array(NumArray::F64(empty))));
    }
    let mut sub = Elements::<E>::new(data);

    let flags = sub.require()?;
    flags.check_type(DataType::UInt32, "array flags")?;
    if flags.data.len() < 4 {
        return Err(ReadMatError::Truncated);
    }
    let flags = E::read_u32(&flags.data[..4]);
    let class_id = (flags & 0xff) as u8;
    let class = ArrayClass::from_u8(class_id).ok_or(ReadMatError::UnknownClass(class_id))?;

    let dims = sub.require()?;
    dims.check_type(DataType::Int32, "dimensions")?;
    let dims = dims
        .data
        .chunks_exact(4)
        .map(|chunk| {
            let dim = E::read_i32(chunk);
            usize::try_from(dim).map_err(|_| ReadMatError::NegativeDimension(dim))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let len: usize = dims.iter().product();

    let name = sub.require()?;
    name.check_type(DataType::Int8, "array name")?;
    let name = String::from_utf8(name.data.to_vec())?;

    let value = match class {
        ArrayClass::Double
        | ArrayClass::Single
        | ArrayClass::Int8
        | ArrayClass::UInt8
        | ArrayClass::Int16
        | ArrayClass::UInt16
        | ArrayClass::Int32
        | ArrayClass::UInt32
        | ArrayClass::Int64
        | ArrayClass::UInt64 => {
            if flags & FLAG_COMPLEX != 0 {
                return Err(ReadMatError::Complex);
            }
            let real = sub.require()?;
            let array = numeric::<E>(class, flags & FLAG_LOGICAL != 0, &dims, &real)?;
            finish(array, squeeze_me)
        }
        ArrayClass::Char => {
            let chars = match sub.next()? {
                Some(element) => chars::<E>(&element)?,
                None => Vec::new(),
            };
            char_value(&dims, chars)?
        }
        ArrayClass::Cell => {
            let mut cells = Vec::with_capacity(len);
            for _ in 0..len {
                let cell = sub.require()?;
                cell.check_type(DataType::Matrix, "cell")?;
                cells.push(read_matrix::<E>(cell.data, squeeze_me)?.1);
            }
            finish(NumArray::Object(from_shape_vec(&dims, true, cells)?), squeeze_me)
        }
        ArrayClass::Struct => {
            let field_len = sub.require()?;
            field_len.check_type(DataType::Int32, "field name length")?;
            if field_len.data.len() < 4 {
                return Err(ReadMatError::Truncated);
            }
            let field_len = E::read_i32(&field_len.data[..4]);
            let field_len =
                usize::try_from(field_len).map_err(|_| ReadMatError::NegativeDimension(field_len))?;
            let names = sub.require()?;
            names.check_type(DataType::Int8, "field names")?;
            let fields = if field_len == 0 {
                Vec::new()
            } else {
                names
                    .data
                    .chunks(field_len)
                    .map(|chunk| {
                        let end = chunk.iter().position(|&b| b == 0).unwrap_or(chunk.len());
                        String::from_utf8(chunk[..end].to_vec())
                    })
                    .collect::<Result<Vec<_>, _>>()?
            };
            let mut records = Vec::with_capacity(len);
            for _ in 0..len {
                let mut record = IndexMap::with_capacity(fields.len());
                for field in &fields {
                    let element = sub.require()?;
                    element.check_type(DataType::Matrix, "struct field")?;
                    record.insert(field.clone(), read_matrix::<E>(element.data, squeeze_me)?.1);
                }
                records.push(Value::Map(record));
            }
            match (len, records.pop()) {
                (1, Some(record)) => record,
                (_, last) => {
                    records.extend(last);
                    finish(NumArray::Object(from_shape_vec(&dims, true, records)?), squeeze_me)
                }
            }
        }
        ArrayClass::Object
        | ArrayClass::Sparse
        | ArrayClass::Function
        | ArrayClass::Opaque => return Err(ReadMatError::UnsupportedClass(class.name())),
    };
    Ok((name, value))
}

/// Applies `squeeze_me` to a decoded array.
fn finish(array: NumArray, squeeze_me: bool) -> Value {
    if !squeeze_me || array.is_empty() {
        return Value::Array(array);
    }
    let squeezed = array.squeeze();
    if squeezed.ndim() == 0 {
        if let Some(scalar) = squeezed.scalar() {
            return scalar;
        }
    }
    Value::Array(squeezed)
}

/// Decodes numeric data stored as any numeric type into the array class.
fn numeric<E: ByteOrder>(
    class: ArrayClass,
    logical: bool,
    dims: &[usize],
    element: &Element<'_>,
) -> Result<NumArray, ReadMatError> {
    let data_type = DataType::from_u32(element.data_type)
        .ok_or(ReadMatError::UnknownDataType(element.data_type))?;
    let bytes = element.data;
    if logical {
        let data = cast::<E, u8>(data_type, bytes, "logical")?
            .into_iter()
            .map(|b| b != 0)
            .collect();
        return Ok(NumArray::Bool(from_shape_vec(dims, true, data)?));
    }
    let name = class.name();
    let array = match class {
        ArrayClass::Double => NumArray::F64(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        ArrayClass::Single => NumArray::F32(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        ArrayClass::Int8 => NumArray::I8(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        ArrayClass::UInt8 => NumArray::U8(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        ArrayClass::Int16 => NumArray::I16(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        ArrayClass::UInt16 => NumArray::U16(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        ArrayClass::Int32 => NumArray::I32(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        ArrayClass::UInt32 => NumArray::U32(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        ArrayClass::Int64 => NumArray::I64(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        ArrayClass::UInt64 => NumArray::U64(from_shape_vec(dims, true, cast::<E, _>(data_type, bytes, name)?)?),
        other => return Err(ReadMatError::UnsupportedClass(other.name())),
    };
    Ok(array)
}

/// Reads `bytes` as elements of `data_type` and converts each to `T`.
///
/// Writers may store data in a smaller type than the array class (a double
/// array of small integers stored as `miUINT8`, for example).
fn cast<E: ByteOrder, T: NumCast>(
    data_type: DataType,
    bytes: &[u8],
    class: &'static str,
) -> Result<Vec<T>, ReadMatError> {
    macro_rules! cast_all {
        ($size:expr, $read:expr) => {{
            if bytes.len() % $size != 0 {
                return Err(ReadMatError::Truncated);
            }
            bytes
                .chunks_exact($size)
                .map(|chunk| <T as NumCast>::from(($read)(chunk)).ok_or(ReadMatError::OutOfRange(class)))
                .collect()
        }};
    }
    match data_type {
        DataType::Int8 => cast_all!(1, |chunk: &[u8]| chunk[0] as i8),
        DataType::UInt8 => cast_all!(1, |chunk: &[u8]| chunk[0]),
        DataType::Int16 => cast_all!(2, E::read_i16),
        DataType::UInt16 => cast_all!(2, E::read_u16),
        DataType::Int32 => cast_all!(4, E::read_i32),
        DataType::UInt32 => cast_all!(4, E::read_u32),
        DataType::Int64 => cast_all!(8, E::read_i64),
        DataType::UInt64 => cast_all!(8, E::read_u64),
        DataType::Single => cast_all!(4, E::read_f32),
        DataType::Double => cast_all!(8, E::read_f64),
        other => Err(ReadMatError::UnexpectedElement {
            expected: "numeric",
            found: other as u32,
        }),
    }
}

fn chars<E: ByteOrder>(element: &Element<'_>) -> Result<Vec<char>, ReadMatError> {
    let bytes = element.data;
    match DataType::from_u32(element.data_type) {
        Some(DataType::Utf8) => Ok(std::str::from_utf8(bytes)
            .map_err(|_| ReadMatError::InvalidChar)?
            .chars()
            .collect()),
        Some(DataType::UInt16) | Some(DataType::Utf16) => {
            let units = bytes.chunks_exact(2).map(E::read_u16);
            char::decode_utf16(units)
                .collect::<Result<_, _>>()
                .map_err(|_| ReadMatError::InvalidChar)
        }
        Some(DataType::UInt8) | Some(DataType::Int8) => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        Some(DataType::UInt32) | Some(DataType::Utf32) => bytes
            .chunks_exact(4)
            .map(|chunk| char::from_u32(E::read_u32(chunk)).ok_or(ReadMatError::InvalidChar))
            .collect(),
        _ => Err(ReadMatError::UnexpectedElement {
            expected: "character",
            found: element.data_type,
        }),
    }
}

/// A single-row char array becomes a string; more rows become a list of
/// row strings.
fn char_value(dims: &[usize], chars: Vec<char>) -> Result<Value, ReadMatError> {
    let rows = dims.first().copied().unwrap_or(0);
    let cols: usize = dims.iter().skip(1).product();
    if rows <= 1 || cols == 0 {
        return Ok(Value::String(chars.into_iter().collect()));
    }
    if chars.len() != rows * cols {
        return Err(ReadMatError::InvalidChar);
    }
    Ok(Value::List(
        (0..rows)
            .map(|r| Value::String((0..cols).map(|c| chars[c * rows + r]).collect()))
            .collect(),
    ))
}
