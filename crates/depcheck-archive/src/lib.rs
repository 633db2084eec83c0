//! Uniform access to jars and exploded class directories.
//!
//! Both the artifact under test and every candidate dependency version are
//! read through [`Archive`]: named entries (the manifest) via
//! [`Archive::read`], compiled classes via [`Archive::for_each_class`].

use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;

pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read zip {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("failed to read {entry} in {path}: {source}")]
    Entry {
        path: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(path: &Path, source: zip::result::ZipError) -> Self {
        ArchiveError::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A compiled class read from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    /// Entry path inside the archive, e.g. `com/acme/Foo.class`.
    pub entry_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct Archive {
    path: PathBuf,
}

impl Archive {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a file from the archive.
    ///
    /// Returns `Ok(None)` when the file isn't present.
    pub fn read(&self, name: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        if self.path.is_dir() {
            let candidate = self.path.join(name);
            if !candidate.is_file() {
                return Ok(None);
            }
            return std::fs::read(&candidate)
                .map(Some)
                .map_err(|err| ArchiveError::io(&candidate, err));
        }

        let mut zip = self.open_zip()?;
        let result = match zip.by_name(name) {
            Ok(mut entry) => {
                let mut buf = Vec::new();
                entry
                    .read_to_end(&mut buf)
                    .map_err(|err| ArchiveError::io(&self.path, err))?;
                Ok(Some(buf))
            }
            Err(zip::result::ZipError::FileNotFound) => Ok(None),
            Err(err) => Err(ArchiveError::zip(&self.path, err)),
        };
        result
    }

    /// Read a UTF-8 text file (lossily) from the archive.
    pub fn read_to_string(&self, name: &str) -> Result<Option<String>, ArchiveError> {
        Ok(self
            .read(name)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Visit every compiled class of the archive.
    ///
    /// `module-info`/`package-info` and anything below `META-INF/` are not
    /// types of the artifact and are skipped. Entries are visited in
    /// archive order (sorted path order for directories). A class entry
    /// that cannot be read is handed to `visit` as an error and the walk
    /// goes on; only failing to open the archive itself is returned.
    pub fn for_each_class(
        &self,
        mut visit: impl FnMut(Result<ClassEntry, ArchiveError>),
    ) -> Result<usize, ArchiveError> {
        let mut count = 0;
        if self.path.is_dir() {
            let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.path)
                .follow_links(false)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        tracing::debug!(target: "depcheck.archive", error = %err, "skipping unreadable path");
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| entry.path().extension() == Some(OsStr::new("class")))
                .map(walkdir::DirEntry::into_path)
                .collect();
            files.sort();

            for file in files {
                let rel = file.strip_prefix(&self.path).unwrap_or(&file);
                let entry_name = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !is_type_entry(&entry_name) {
                    continue;
                }
                let entry = match std::fs::read(&file) {
                    Ok(bytes) => Ok(ClassEntry { entry_name, bytes }),
                    Err(err) => Err(ArchiveError::io(&file, err)),
                };
                visit(entry);
                count += 1;
            }
            return Ok(count);
        }

        let mut zip = self.open_zip()?;
        for i in 0..zip.len() {
            let mut file = match zip.by_index(i) {
                Ok(file) => file,
                Err(err) => {
                    visit(Err(ArchiveError::zip(&self.path, err)));
                    continue;
                }
            };
            if !file.is_file() {
                continue;
            }
            let entry_name = file.name().trim_start_matches('/').to_owned();
            if !is_type_entry(&entry_name) {
                continue;
            }

            let mut bytes = Vec::new();
            let entry = match file.read_to_end(&mut bytes) {
                Ok(_) => Ok(ClassEntry { entry_name, bytes }),
                Err(source) => Err(ArchiveError::Entry {
                    path: self.path.clone(),
                    entry: entry_name,
                    source,
                }),
            };
            visit(entry);
            count += 1;
        }
        Ok(count)
    }

    fn open_zip(&self) -> Result<ZipArchive<File>, ArchiveError> {
        let file = File::open(&self.path).map_err(|err| ArchiveError::io(&self.path, err))?;
        ZipArchive::new(file).map_err(|err| ArchiveError::zip(&self.path, err))
    }
}

fn is_type_entry(entry_name: &str) -> bool {
    let Some(stem) = entry_name.strip_suffix(".class") else {
        return false;
    };
    if entry_name.starts_with("META-INF/") {
        return false;
    }
    !(stem == "module-info"
        || stem == "package-info"
        || stem.ends_with("/module-info")
        || stem.ends_with("/package-info"))
}
