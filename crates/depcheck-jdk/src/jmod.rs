//! `.jmod` container access.
//!
//! A jmod is a 4-byte `JM` header followed by a regular zip archive. Zip
//! offsets are relative to the start of the zip, so the header is hidden
//! behind [`JmodReader`] instead of copying the whole file into memory.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

const JMOD_MAGIC: [u8; 4] = [b'J', b'M', 0x01, 0x00];
const HEADER_LEN: u64 = JMOD_MAGIC.len() as u64;
const CLASSES_PREFIX: &str = "classes/";

pub(crate) type JmodArchive = ZipArchive<JmodReader<BufReader<File>>>;

#[derive(Debug, Error)]
pub enum JmodError {
    #[error("`{path}` is not a jmod file (bad header)")]
    BadHeader { path: PathBuf },

    #[error("failed to read jmod `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open jmod `{path}` as zip: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Presents everything after the jmod header as a standalone stream.
pub(crate) struct JmodReader<R> {
    inner: R,
}

impl<R: Read + Seek> Read for JmodReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Seek> Seek for JmodReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let pos = match pos {
            SeekFrom::Start(offset) => SeekFrom::Start(offset + HEADER_LEN),
            other => other,
        };
        let absolute = self.inner.seek(pos)?;
        absolute.checked_sub(HEADER_LEN).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of jmod payload")
        })
    }
}

pub(crate) fn open_archive(path: &Path) -> Result<JmodArchive, JmodError> {
    let io_err = |source| JmodError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = BufReader::new(File::open(path).map_err(io_err)?);
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).map_err(io_err)?;
    if magic != JMOD_MAGIC {
        return Err(JmodError::BadHeader {
            path: path.to_path_buf(),
        });
    }

    ZipArchive::new(JmodReader { inner: file }).map_err(|source| JmodError::Zip {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the bytes of `classes/<name>`, `None` if the entry is absent.
pub(crate) fn read_entry(
    archive: &mut JmodArchive,
    path: &Path,
    name: &str,
) -> Result<Option<Vec<u8>>, JmodError> {
    let entry_name = format!("{CLASSES_PREFIX}{name}");
    let mut entry = match archive.by_name(&entry_name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(source) => {
            return Err(JmodError::Zip {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buf).map_err(|source| JmodError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(buf))
}

/// `classes/java/lang/String.class` -> `java/lang/String`.
pub(crate) fn entry_to_internal_name(entry_name: &str) -> Option<&str> {
    entry_name.strip_prefix(CLASSES_PREFIX)?.strip_suffix(".class")
}
