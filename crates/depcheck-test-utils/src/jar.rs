use std::io::{Cursor, Write};
use std::ops::Range;
use std::path::Path;

use zip::write::FileOptions;
use zip::ZipWriter;

use crate::class_builder::{ClassBuilder, ModuleInfoBuilder};

/// Renders a bundle manifest with the given extra headers (`Name`, `value`).
pub fn bundle_manifest(symbolic_name: &str, version: &str, headers: &[(&str, &str)]) -> String {
    let mut out = String::from("Manifest-Version: 1.0\nBundle-ManifestVersion: 2\n");
    out.push_str(&format!("Bundle-SymbolicName: {symbolic_name}\n"));
    out.push_str(&format!("Bundle-Version: {version}\n"));
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out
}

/// Collects entries and writes them as a jar.
#[derive(Debug, Clone, Default)]
pub struct JarBuilder {
    manifest: Option<String>,
    entries: Vec<(String, Vec<u8>)>,
}

impl JarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    pub fn class(mut self, class: &ClassBuilder) -> Self {
        self.entries.push((class.entry_name(), class.build()));
        self
    }

    pub fn entry(mut self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.push((name.to_string(), bytes.into()));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default();
        if let Some(manifest) = &self.manifest {
            zip.start_file("META-INF/MANIFEST.MF", options)
                .expect("start manifest entry");
            zip.write_all(manifest.as_bytes()).expect("write manifest");
        }
        for (name, bytes) in &self.entries {
            zip.start_file(name.as_str(), options).expect("start entry");
            zip.write_all(bytes).expect("write entry");
        }
        zip.finish().expect("finish zip").into_inner()
    }

    pub fn write(&self, path: &Path) {
        std::fs::write(path, self.to_bytes()).expect("write jar");
    }

    /// Writes the entries as an exploded directory instead of a jar.
    pub fn write_dir(&self, dir: &Path) {
        let mut entries = self.entries.clone();
        if let Some(manifest) = &self.manifest {
            entries.push(("META-INF/MANIFEST.MF".to_string(), manifest.clone().into_bytes()));
        }
        for (name, bytes) in entries {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create entry dir");
            }
            std::fs::write(path, bytes).expect("write entry");
        }
    }
}

/// Writes a `.jmod`: the `JM\x01\x00` magic followed by a zip whose class
/// files live under `classes/`.
pub fn write_jmod(path: &Path, module: &ModuleInfoBuilder, classes: &[ClassBuilder]) {
    let mut jar = JarBuilder::new().entry("classes/module-info.class", module.build());
    for class in classes {
        jar = jar.entry(&format!("classes/{}", class.entry_name()), class.build());
    }

    let mut bytes = vec![b'J', b'M', 0x01, 0x00];
    bytes.extend_from_slice(&jar.to_bytes());
    std::fs::write(path, bytes).expect("write jmod");
}

/// Flips a few bytes inside the compressed data of `entry`. The central
/// directory stays intact, so the jar still opens and only that entry fails
/// to inflate.
pub fn corrupt_zip_entry(jar: &Path, entry: &str) {
    let mut bytes = std::fs::read(jar).expect("read jar");
    let data: Range<usize> = {
        let mut zip = zip::ZipArchive::new(Cursor::new(&bytes[..])).expect("open jar");
        let file = zip.by_name(entry).expect("entry present");
        assert!(file.compressed_size() >= 8, "entry too small to damage");
        let start = file.data_start() as usize;
        start + 1..start + 7
    };
    for byte in &mut bytes[data] {
        *byte ^= 0xA5;
    }
    std::fs::write(jar, bytes).expect("write jar");
}
