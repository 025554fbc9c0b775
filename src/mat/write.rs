use super::{
    ArrayClass, DataType, MatWriteOptions, OnedAs, WriteMatError, FLAG_LOGICAL, HEADER_TEXT_LEN,
    VERSION_5,
};
use crate::array::NumArray;
use crate::value::Value;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use ndarray::{arr0, ArrayD};
use std::io::Write;

/// Writer for level 5 MAT-files.
///
/// Variables are written little-endian, one `miMATRIX` element each.
/// Names starting with an underscore are skipped, since MATLAB cannot
/// load them.
///
/// # Example
///
/// ```no_run
/// use attrmap::{MatWriteOptions, MatWriter, Value};
/// use std::fs::File;
///
/// let mut mat = MatWriter::new(File::create("data.mat")?, MatWriteOptions::default())?;
/// mat.add_variable("x", &Value::from(3.5))?;
/// mat.add_variable("label", &Value::from("run 1"))?;
/// mat.finish()?;
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
pub struct MatWriter<W: Write> {
    writer: W,
    options: MatWriteOptions,
}

impl<W: Write> MatWriter<W> {
    /// Writes the file header and returns the writer.
    pub fn new(mut writer: W, options: MatWriteOptions) -> Result<MatWriter<W>, WriteMatError> {
        let text = format!(
            "MATLAB 5.0 MAT-file, Platform: {}, Created by: attrmap {}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION"),
        );
        let mut header = text.into_bytes();
        header.resize(HEADER_TEXT_LEN, b' ');
        // No subsystem data.
        header.extend_from_slice(&[0; 8]);
        header.write_u16::<LittleEndian>(VERSION_5)?;
        header.extend_from_slice(b"IM");
        writer.write_all(&header)?;
        Ok(MatWriter { writer, options })
    }

    /// Appends `value` as the variable `name`.
    pub fn add_variable(&mut self, name: &str, value: &Value) -> Result<(), WriteMatError> {
        if name.starts_with('_') {
            log::warn!("skipping variable {:?}: MAT-file names cannot start with an underscore", name);
            return Ok(());
        }
        log::trace!("writing MAT variable {:?} ({})", name, value.kind());
        let mut element = Vec::new();
        write_matrix(&mut element, name, value, &self.options)?;
        if self.options.compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&element)?;
            let compressed = encoder.finish()?;
            element.clear();
            write_tagged(&mut element, DataType::Compressed, &compressed)?;
        }
        self.writer.write_all(&element)?;
        Ok(())
    }

    /// Flushes the writer and returns it.
    pub fn finish(mut self) -> Result<W, WriteMatError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Writes every `(name, value)` pair as a variable of a new MAT-file.
pub fn write_mat<'a, W, I, K>(
    writer: W,
    variables: I,
    options: MatWriteOptions,
) -> Result<W, WriteMatError>
where
    W: Write,
    I: IntoIterator<Item = (K, &'a Value)>,
    K: AsRef<str>,
{
    let mut mat = MatWriter::new(writer, options)?;
    for (name, value) in variables {
        mat.add_variable(name.as_ref(), value)?;
    }
    mat.finish()
}

/// Appends a tag and `data`, using the small element format when the data
/// fits in four bytes and padding to 8 bytes otherwise.
fn write_tagged(out: &mut Vec<u8>, data_type: DataType, data: &[u8]) -> Result<(), WriteMatError> {
    let len = u32::try_from(data.len()).map_err(|_| WriteMatError::ElementTooLarge(data.len()))?;
    let packable = !matches!(data_type, DataType::Matrix | DataType::Compressed);
    if packable && (1..=4).contains(&data.len()) {
        out.write_u32::<LittleEndian>((len << 16) | data_type as u32)?;
        out.extend_from_slice(data);
        out.resize(out.len() + 4 - data.len(), 0);
        return Ok(());
    }
    out.write_u32::<LittleEndian>(data_type as u32)?;
    out.write_u32::<LittleEndian>(len)?;
    out.extend_from_slice(data);
    let rem = data.len() % 8;
    if data_type != DataType::Compressed && rem != 0 {
        out.resize(out.len() + 8 - rem, 0);
    }
    Ok(())
}

/// Writes the flags, dimensions and name subelements of a matrix.
fn array_header(
    body: &mut Vec<u8>,
    class: ArrayClass,
    flags: u32,
    dims: &[usize],
    name: &str,
) -> Result<(), WriteMatError> {
    let mut flag_bytes = Vec::with_capacity(8);
    flag_bytes.write_u32::<LittleEndian>(class as u32 | flags)?;
    flag_bytes.write_u32::<LittleEndian>(0)?;
    write_tagged(body, DataType::UInt32, &flag_bytes)?;

    let mut dim_bytes = Vec::with_capacity(dims.len() * 4);
    for &dim in dims {
        let dim = i32::try_from(dim).map_err(|_| WriteMatError::DimensionTooLarge(dim))?;
        dim_bytes.write_i32::<LittleEndian>(dim)?;
    }
    write_tagged(body, DataType::Int32, &dim_bytes)?;
    write_tagged(body, DataType::Int8, name.as_bytes())
}

fn write_matrix(
    out: &mut Vec<u8>,
    name: &str,
    value: &Value,
    options: &MatWriteOptions,
) -> Result<(), WriteMatError> {
    let mut body = Vec::new();
    match value {
        Value::Null => {
            array_header(&mut body, ArrayClass::Double, 0, &[0, 0], name)?;
            write_tagged(&mut body, DataType::Double, &[])?;
        }
        Value::Bool(b) => write_array(&mut body, name, &NumArray::Bool(arr0(*b).into_dyn()), options)?,
        Value::Int(i) => write_array(&mut body, name, &NumArray::I64(arr0(*i).into_dyn()), options)?,
        Value::Float(f) => write_array(&mut body, name, &NumArray::F64(arr0(*f).into_dyn()), options)?,
        Value::String(s) => {
            let units: Vec<u16> = s.encode_utf16().collect();
            array_header(&mut body, ArrayClass::Char, 0, &[1, units.len()], name)?;
            let mut bytes = vec![0; units.len() * 2];
            LittleEndian::write_u16_into(&units, &mut bytes);
            write_tagged(&mut body, DataType::Utf16, &bytes)?;
        }
        Value::List(items) => {
            let cells = NumArray::object_from_list(items.clone());
            write_array(&mut body, name, &cells, options)?;
        }
        Value::Map(fields) => write_struct(&mut body, name, fields, options)?,
        Value::Array(array) => write_array(&mut body, name, array, options)?,
    }
    write_tagged(out, DataType::Matrix, &body)
}

fn write_struct(
    body: &mut Vec<u8>,
    name: &str,
    fields: &IndexMap<String, Value>,
    options: &MatWriteOptions,
) -> Result<(), WriteMatError> {
    let max = if options.long_field_names { 63 } else { 31 };
    if let Some(long) = fields.keys().find(|k| k.len() > max) {
        return Err(WriteMatError::FieldNameTooLong {
            name: long.clone(),
            max,
        });
    }
    array_header(body, ArrayClass::Struct, 0, &[1, 1], name)?;
    // Field names are stored NUL-padded to a common length.
    let field_len = fields.keys().map(String::len).max().unwrap_or(0) + 1;
    let mut len_bytes = Vec::with_capacity(4);
    len_bytes.write_i32::<LittleEndian>(field_len as i32)?;
    write_tagged(body, DataType::Int32, &len_bytes)?;
    let mut names = vec![0; field_len * fields.len()];
    for (i, key) in fields.keys().enumerate() {
        names[i * field_len..i * field_len + key.len()].copy_from_slice(key.as_bytes());
    }
    write_tagged(body, DataType::Int8, &names)?;
    for value in fields.values() {
        write_matrix(body, "", value, options)?;
    }
    Ok(())
}

fn write_array(
    body: &mut Vec<u8>,
    name: &str,
    array: &NumArray,
    options: &MatWriteOptions,
) -> Result<(), WriteMatError> {
    let dims = match (array.shape(), options.oned_as) {
        ([], _) => vec![1, 1],
        (&[n], OnedAs::Row) => vec![1, n],
        (&[n], OnedAs::Column) => vec![n, 1],
        (shape, _) => shape.to_vec(),
    };

    macro_rules! numeric {
        ($a:expr, $class:ident, $data_type:ident, $size:expr, $write_into:ident) => {{
            array_header(body, ArrayClass::$class, 0, &dims, name)?;
            let elems: Vec<_> = column_major($a);
            let mut bytes = vec![0; elems.len() * $size];
            LittleEndian::$write_into(&elems, &mut bytes);
            write_tagged(body, DataType::$data_type, &bytes)
        }};
    }

    match array {
        NumArray::Bool(a) => {
            array_header(body, ArrayClass::UInt8, FLAG_LOGICAL, &dims, name)?;
            let bytes: Vec<u8> = column_major(a).into_iter().map(u8::from).collect();
            write_tagged(body, DataType::UInt8, &bytes)
        }
        NumArray::I8(a) => {
            array_header(body, ArrayClass::Int8, 0, &dims, name)?;
            let bytes: Vec<u8> = column_major(a).into_iter().map(|x| x as u8).collect();
            write_tagged(body, DataType::Int8, &bytes)
        }
        NumArray::U8(a) => {
            array_header(body, ArrayClass::UInt8, 0, &dims, name)?;
            write_tagged(body, DataType::UInt8, &column_major(a))
        }
        NumArray::I16(a) => numeric!(a, Int16, Int16, 2, write_i16_into),
        NumArray::U16(a) => numeric!(a, UInt16, UInt16, 2, write_u16_into),
        NumArray::I32(a) => numeric!(a, Int32, Int32, 4, write_i32_into),
        NumArray::U32(a) => numeric!(a, UInt32, UInt32, 4, write_u32_into),
        NumArray::I64(a) => numeric!(a, Int64, Int64, 8, write_i64_into),
        NumArray::U64(a) => numeric!(a, UInt64, UInt64, 8, write_u64_into),
        NumArray::F32(a) => numeric!(a, Single, Single, 4, write_f32_into),
        NumArray::F64(a) => numeric!(a, Double, Double, 8, write_f64_into),
        NumArray::Object(a) => {
            array_header(body, ArrayClass::Cell, 0, &dims, name)?;
            for cell in a.t().iter() {
                write_matrix(body, "", cell, options)?;
            }
            Ok(())
        }
    }
}

fn column_major<T: Copy>(a: &ArrayD<T>) -> Vec<T> {
    a.t().iter().copied().collect()
}
