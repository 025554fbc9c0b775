//! Reading and writing `.npz` archives of named arrays.

use crate::array::NumArray;
use crate::npy::{read_npy, write_npy, ReadNpyError, WriteNpyError};
use std::io::{self, Read, Seek, Write};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Suffix of every member of an `.npz` archive.
const NPY_SUFFIX: &str = ".npy";

/// An error writing a `.npz` file.
#[derive(Debug, Error)]
pub enum WriteNpzError {
    #[error("zip file error: {0}")]
    Zip(#[from] ZipError),
    #[error("error writing npy file {name:?} to npz archive: {source}")]
    Npy {
        name: String,
        #[source]
        source: WriteNpyError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An error reading a `.npz` file.
#[derive(Debug, Error)]
pub enum ReadNpzError {
    #[error("zip file error: {0}")]
    Zip(#[from] ZipError),
    #[error("error reading npy file {name:?} in npz archive: {source}")]
    Npy {
        name: String,
        #[source]
        source: ReadNpyError,
    },
}

/// Writer for `.npz` files.
///
/// # Example
///
/// ```no_run
/// use attrmap::{NpzWriter, NumArray};
/// use ndarray::array;
/// use std::fs::File;
///
/// let mut npz = NpzWriter::new(File::create("arrays.npz")?);
/// npz.add_array("a", &NumArray::from(array![[1i32, 2, 3], [4, 5, 6]]))?;
/// npz.add_array("b", &NumArray::from(array![7.5, 8.5]))?;
/// npz.finish()?;
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
pub struct NpzWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: FileOptions,
}

impl<W: Write + Seek> NpzWriter<W> {
    /// Creates a new `.npz` file without compression, like `numpy.savez`.
    pub fn new(writer: W) -> NpzWriter<W> {
        NpzWriter {
            zip: ZipWriter::new(writer),
            options: FileOptions::default().compression_method(CompressionMethod::Stored),
        }
    }

    /// Creates a new `.npz` file with deflate compression, like
    /// `numpy.savez_compressed`.
    #[cfg(feature = "compressed_npz")]
    pub fn new_compressed(writer: W) -> NpzWriter<W> {
        NpzWriter {
            zip: ZipWriter::new(writer),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Creates a compressed writer if `compress` is set and compression is
    /// compiled in, otherwise an uncompressed one.
    pub fn with_compression(writer: W, compress: bool) -> NpzWriter<W> {
        #[cfg(feature = "compressed_npz")]
        let npz = if compress {
            NpzWriter::new_compressed(writer)
        } else {
            NpzWriter::new(writer)
        };
        #[cfg(not(feature = "compressed_npz"))]
        let npz = {
            if compress {
                log::warn!("compressed_npz feature is disabled; writing an uncompressed archive");
            }
            NpzWriter::new(writer)
        };
        npz
    }

    /// Adds `array` to the archive as the member `name.npy`.
    pub fn add_array<N: Into<String>>(
        &mut self,
        name: N,
        array: &NumArray,
    ) -> Result<(), WriteNpzError> {
        let mut name = name.into();
        if !name.ends_with(NPY_SUFFIX) {
            name.push_str(NPY_SUFFIX);
        }
        log::trace!(
            "adding {} array of shape {:?} as {}",
            array.dtype(),
            array.shape(),
            name
        );
        self.zip.start_file(name.as_str(), self.options)?;
        write_npy(array, &mut self.zip).map_err(|source| WriteNpzError::Npy { name, source })?;
        Ok(())
    }

    /// Finishes the zip structures, flushes the writer and returns it.
    ///
    /// Dropping the writer also attempts to finish the archive, but silently
    /// ignores any error, so call this to find out whether writing succeeded.
    pub fn finish(mut self) -> Result<W, WriteNpzError> {
        let mut writer = self.zip.finish()?;
        writer.flush()?;
        Ok(writer)
    }
}

/// Reader for `.npz` files.
///
/// # Example
///
/// ```no_run
/// use attrmap::NpzReader;
/// use std::fs::File;
///
/// let mut npz = NpzReader::new(File::open("arrays.npz")?)?;
/// for name in npz.names()? {
///     let array = npz.by_name(&name)?;
///     println!("{}: {:?}", name, array.shape());
/// }
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
pub struct NpzReader<R: Read + Seek> {
    zip: ZipArchive<R>,
}

impl<R: Read + Seek> NpzReader<R> {
    /// Creates a new `.npz` file reader.
    pub fn new(reader: R) -> Result<NpzReader<R>, ReadNpzError> {
        Ok(NpzReader {
            zip: ZipArchive::new(reader)?,
        })
    }

    /// Returns `true` iff the archive doesn't contain any arrays.
    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Returns the number of arrays in the archive.
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    /// Returns the names of all of the arrays, without the `.npy` suffix,
    /// in archive order.
    pub fn names(&mut self) -> Result<Vec<String>, ReadNpzError> {
        (0..self.zip.len())
            .map(|i| -> Result<String, ReadNpzError> {
                let file = self.zip.by_index(i)?;
                let name = file.name();
                Ok(name.strip_suffix(NPY_SUFFIX).unwrap_or(name).to_owned())
            })
            .collect()
    }

    /// Reads an array by name, with or without the `.npy` suffix.
    pub fn by_name(&mut self, name: &str) -> Result<NumArray, ReadNpzError> {
        let member = if self.zip.file_names().any(|n| n == name) {
            name.to_owned()
        } else {
            format!("{}{}", name, NPY_SUFFIX)
        };
        let file = self.zip.by_name(&member)?;
        read_npy(file).map_err(|source| ReadNpzError::Npy {
            name: member,
            source,
        })
    }

    /// Reads an array by its index in the archive.
    pub fn by_index(&mut self, index: usize) -> Result<NumArray, ReadNpzError> {
        let file = self.zip.by_index(index)?;
        let name = file.name().to_owned();
        read_npy(file).map_err(|source| ReadNpzError::Npy { name, source })
    }
}
