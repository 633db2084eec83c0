use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::version::VersionError;

/// Maximum line length in bytes, continuation lines included.
const LINE_LIMIT: usize = 72;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid `{header}` header: {reason}")]
    InvalidHeader { header: String, reason: String },

    #[error("malformed manifest line {line}: `{text}`")]
    MalformedLine { line: usize, text: String },

    #[error("invalid version in `{header}`: {source}")]
    Version {
        header: String,
        #[source]
        source: VersionError,
    },

    #[error("no `META-INF/MANIFEST.MF` in `{path}`")]
    Missing { path: PathBuf },

    #[error(transparent)]
    Archive(#[from] depcheck_archive::ArchiveError),

    #[error("failed to access manifest `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The main section of a JAR manifest.
///
/// Header order and any per-entry sections are preserved on write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    headers: Vec<(String, String)>,
    sections: String,
    crlf: bool,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let crlf = text.contains("\r\n");
        let mut headers: Vec<(String, String)> = Vec::new();
        let mut sections = String::new();

        let mut lines = text.split('\n').enumerate();
        for (idx, raw) in lines.by_ref() {
            let line = raw.trim_end_matches('\r');

            // The first empty line terminates the main attributes section.
            if line.is_empty() {
                break;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                let Some((_, value)) = headers.last_mut() else {
                    return Err(ManifestError::MalformedLine {
                        line: idx + 1,
                        text: line.to_owned(),
                    });
                };
                value.push_str(rest);
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(ManifestError::MalformedLine {
                    line: idx + 1,
                    text: line.to_owned(),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ManifestError::MalformedLine {
                    line: idx + 1,
                    text: line.to_owned(),
                });
            }
            headers.push((name.to_owned(), value.strip_prefix(' ').unwrap_or(value).to_owned()));
        }

        let rest: Vec<&str> = lines.map(|(_, l)| l).collect();
        if rest.iter().any(|l| !l.trim().is_empty()) {
            sections = rest.join("\n");
        }

        Ok(Self {
            headers,
            sections,
            crlf,
        })
    }

    /// Read `META-INF/MANIFEST.MF` from a jar or class directory.
    pub fn read_from_archive(path: &Path) -> Result<Self, ManifestError> {
        let archive = depcheck_archive::Archive::new(path);
        match archive.read_to_string(depcheck_archive::MANIFEST_ENTRY)? {
            Some(text) => Self::parse(&text),
            None => Err(ManifestError::Missing {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn read_file(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), ManifestError> {
        std::fs::write(path, self.render()).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Header names compare case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, existing)) => *existing = value,
            None => self.headers.push((name.to_owned(), value)),
        }
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn render(&self) -> String {
        let eol = if self.crlf { "\r\n" } else { "\n" };
        let mut out = String::new();
        for (name, value) in &self.headers {
            write_wrapped(&mut out, &format!("{name}: {value}"), eol);
        }
        out.push_str(eol);
        if !self.sections.is_empty() {
            out.push_str(&self.sections);
        }
        out
    }
}

fn write_wrapped(out: &mut String, line: &str, eol: &str) {
    let mut rest = line;
    let mut limit = LINE_LIMIT;
    loop {
        if rest.len() <= limit {
            out.push_str(rest);
            out.push_str(eol);
            return;
        }
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str(eol);
        out.push(' ');
        rest = &rest[cut..];
        // The leading space counts towards the limit.
        limit = LINE_LIMIT - 1;
    }
}
