use byteorder::{ByteOrder, LittleEndian};
use num_traits::ToPrimitive;
use py_literal::{
    FormatError as PyValueFormatError, ParseError as PyValueParseError, Value as PyValue,
};
use std::fmt;
use std::io;
use thiserror::Error;

/// Magic string to indicate npy format.
const MAGIC_STRING: &[u8] = b"\x93NUMPY";

/// Header lengths are padded so that the array data starts on a multiple of
/// this many bytes.
const HEADER_ALIGN: usize = 64;

#[derive(Debug, Error)]
pub enum ParseHeaderError {
    #[error("start does not match magic string")]
    MagicString,
    #[error("unknown version number: {major}.{minor}")]
    Version { major: u8, minor: u8 },
    /// The header dictionary contains non-ASCII characters, which format
    /// versions 1.0 and 2.0 forbid.
    #[error("non-ascii in array format string")]
    NonAscii,
    #[error("error parsing array format string as UTF-8: {0}")]
    Utf8Parse(#[from] std::str::Utf8Error),
    #[error("unknown key: {0}")]
    UnknownKey(PyValue),
    #[error("missing key: {0}")]
    MissingKey(&'static str),
    #[error("illegal value for key {key}: {value}")]
    IllegalValue { key: &'static str, value: PyValue },
    #[error("error parsing metadata dict: {0}")]
    DictParse(#[from] PyValueParseError),
    #[error("metadata is not a dict: {0}")]
    MetaNotDict(PyValue),
    #[error("newline missing at end of header")]
    MissingNewline,
}

#[derive(Debug, Error)]
pub enum ReadHeaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("error parsing header: {0}")]
    Parse(#[from] ParseHeaderError),
}

#[derive(Debug, Error)]
pub enum WriteHeaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("error formatting header: {0}")]
    Format(#[from] PyValueFormatError),
}

#[derive(Clone, Copy)]
enum Version {
    V1_0,
    V2_0,
    V3_0,
}

impl Version {
    fn from_bytes(major: u8, minor: u8) -> Result<Self, ParseHeaderError> {
        match (major, minor) {
            (1, 0) => Ok(Version::V1_0),
            (2, 0) => Ok(Version::V2_0),
            (3, 0) => Ok(Version::V3_0),
            (major, minor) => Err(ParseHeaderError::Version { major, minor }),
        }
    }

    fn major(self) -> u8 {
        match self {
            Version::V1_0 => 1,
            Version::V2_0 => 2,
            Version::V3_0 => 3,
        }
    }

    /// Number of bytes in representation of header length.
    fn header_len_num_bytes(self) -> usize {
        match self {
            Version::V1_0 => 2,
            Version::V2_0 | Version::V3_0 => 4,
        }
    }
}

/// The dictionary at the start of every `.npy` file.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub type_descriptor: PyValue,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_py_value())
    }
}

impl Header {
    fn from_py_value(value: PyValue) -> Result<Self, ParseHeaderError> {
        let dict = match value {
            PyValue::Dict(dict) => dict,
            other => return Err(ParseHeaderError::MetaNotDict(other)),
        };
        let mut type_descriptor = None;
        let mut fortran_order = None;
        let mut shape = None;
        for (key, value) in dict {
            match key {
                PyValue::String(ref k) if k == "descr" => type_descriptor = Some(value),
                PyValue::String(ref k) if k == "fortran_order" => match value {
                    PyValue::Boolean(b) => fortran_order = Some(b),
                    value => {
                        return Err(ParseHeaderError::IllegalValue {
                            key: "fortran_order",
                            value,
                        })
                    }
                },
                PyValue::String(ref k) if k == "shape" => {
                    let dims: Option<Vec<usize>> = value.as_tuple().and_then(|elems| {
                        elems
                            .iter()
                            .map(|elem| elem.as_integer()?.to_usize())
                            .collect()
                    });
                    match dims {
                        Some(dims) => shape = Some(dims),
                        None => {
                            return Err(ParseHeaderError::IllegalValue {
                                key: "shape",
                                value,
                            })
                        }
                    }
                }
                k => return Err(ParseHeaderError::UnknownKey(k)),
            }
        }
        Ok(Header {
            type_descriptor: type_descriptor.ok_or(ParseHeaderError::MissingKey("descr"))?,
            fortran_order: fortran_order.ok_or(ParseHeaderError::MissingKey("fortran_order"))?,
            shape: shape.ok_or(ParseHeaderError::MissingKey("shape"))?,
        })
    }

    pub fn from_reader<R: io::Read>(mut reader: R) -> Result<Self, ReadHeaderError> {
        let mut magic = [0; MAGIC_STRING.len()];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC_STRING {
            return Err(ParseHeaderError::MagicString.into());
        }

        let mut version = [0; 2];
        reader.read_exact(&mut version)?;
        let version = Version::from_bytes(version[0], version[1])?;

        let mut len_buf = [0; 4];
        reader.read_exact(&mut len_buf[..version.header_len_num_bytes()])?;
        let header_len = match version {
            Version::V1_0 => LittleEndian::read_u16(&len_buf) as usize,
            Version::V2_0 | Version::V3_0 => LittleEndian::read_u32(&len_buf) as usize,
        };

        let mut buf = vec![0; header_len];
        reader.read_exact(&mut buf)?;
        let without_newline = match buf.split_last() {
            Some((&b'\n', rest)) => rest,
            _ => return Err(ParseHeaderError::MissingNewline.into()),
        };
        if !matches!(version, Version::V3_0) && !without_newline.is_ascii() {
            return Err(ParseHeaderError::NonAscii.into());
        }
        let header_str = std::str::from_utf8(without_newline).map_err(ParseHeaderError::from)?;
        let dict: PyValue = header_str.parse().map_err(ParseHeaderError::from)?;
        Ok(Header::from_py_value(dict)?)
    }

    fn to_py_value(&self) -> PyValue {
        PyValue::Dict(vec![
            (PyValue::String("descr".into()), self.type_descriptor.clone()),
            (
                PyValue::String("fortran_order".into()),
                PyValue::Boolean(self.fortran_order),
            ),
            (
                PyValue::String("shape".into()),
                PyValue::Tuple(
                    self.shape
                        .iter()
                        .map(|&len| PyValue::Integer(len.into()))
                        .collect(),
                ),
            ),
        ])
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PyValueFormatError> {
        let mut dict = Vec::new();
        self.to_py_value().write_ascii(&mut dict)?;

        // Version 1.0 stores the header length in two bytes; fall back to
        // 2.0 for headers that do not fit.
        let version = if dict.len() + HEADER_ALIGN > u16::MAX as usize {
            Version::V2_0
        } else {
            Version::V1_0
        };
        let prefix_len = MAGIC_STRING.len() + 2 + version.header_len_num_bytes();

        // Pad with spaces, then a final newline, up to the alignment.
        let unpadded = prefix_len + dict.len() + 1;
        let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
        dict.resize(dict.len() + padding, b' ');
        dict.push(b'\n');

        let mut out = Vec::with_capacity(prefix_len + dict.len());
        out.extend_from_slice(MAGIC_STRING);
        out.push(version.major());
        out.push(0);
        match version {
            Version::V1_0 => {
                let mut len = [0; 2];
                LittleEndian::write_u16(&mut len, dict.len() as u16);
                out.extend_from_slice(&len);
            }
            Version::V2_0 | Version::V3_0 => {
                let mut len = [0; 4];
                LittleEndian::write_u32(&mut len, dict.len() as u32);
                out.extend_from_slice(&len);
            }
        }
        out.extend_from_slice(&dict);
        debug_assert_eq!(out.len() % HEADER_ALIGN, 0);
        Ok(out)
    }

    pub fn write<W: io::Write>(&self, mut writer: W) -> Result<(), WriteHeaderError> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = Header {
            type_descriptor: PyValue::String("<f8".into()),
            fortran_order: true,
            shape: vec![2, 3, 1],
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len() % HEADER_ALIGN, 0);
        assert_eq!(&bytes[..6], MAGIC_STRING);
        assert_eq!(Header::from_reader(&bytes[..]).unwrap(), header);
    }

    #[test]
    fn parses_numpy_header() {
        let dict = b"{'descr': '<i4', 'fortran_order': False, 'shape': (3,), }";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC_STRING);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&((dict.len() + 1) as u16).to_le_bytes());
        bytes.extend_from_slice(dict);
        bytes.push(b'\n');
        let header = Header::from_reader(&bytes[..]).unwrap();
        assert_eq!(header.type_descriptor, PyValue::String("<i4".into()));
        assert!(!header.fortran_order);
        assert_eq!(header.shape, vec![3]);
    }

    #[test]
    fn rejects_bad_magic() {
        let res = Header::from_reader(&b"\x93NUMPZ\x01\x00"[..]);
        assert!(matches!(
            res,
            Err(ReadHeaderError::Parse(ParseHeaderError::MagicString))
        ));
    }

    #[test]
    fn rejects_missing_key() {
        let value: PyValue = "{'descr': '<i4', 'shape': ()}".parse().unwrap();
        assert!(matches!(
            Header::from_py_value(value),
            Err(ParseHeaderError::MissingKey("fortran_order"))
        ));
    }
}
