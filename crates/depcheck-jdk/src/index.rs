use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use depcheck_classfile::{binary_to_internal, internal_to_binary, is_non_type_classfile, parse_module_info_class};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use thiserror::Error;

use crate::discovery::{JdkDiscoveryError, JdkInstallation};
use crate::jmod::{self, JmodArchive, JmodError};

#[derive(Debug, Error)]
pub enum JdkIndexError {
    #[error(transparent)]
    Discovery(#[from] JdkDiscoveryError),

    #[error("`jmods/` directory not found at `{dir}`")]
    MissingJmodsDir { dir: PathBuf },

    #[error("no `.jmod` modules found under `{dir}`")]
    NoModulesFound { dir: PathBuf },

    #[error("`module-info.class` not found in `{path}`")]
    MissingModuleInfo { path: PathBuf },

    #[error("invalid `module-info.class` in `{path}`: {source}")]
    ModuleInfo {
        path: PathBuf,
        #[source]
        source: depcheck_classfile::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Jmod(#[from] JmodError),
}

struct JdkModule {
    name: String,
    path: PathBuf,
    packages: BTreeSet<String>,
    archive: OnceCell<Mutex<JmodArchive>>,
}

impl JdkModule {
    fn archive(&self) -> Result<&Mutex<JmodArchive>, JdkIndexError> {
        self.archive
            .get_or_try_init(|| Ok(Mutex::new(jmod::open_archive(&self.path)?)))
    }
}

/// Package → module index over a JDK's `jmods/` directory.
///
/// Module descriptors are read up front; a module's archive is only kept
/// open once a class is actually loaded from it.
pub struct JdkIndex {
    modules: Vec<JdkModule>,
    package_to_modules: HashMap<String, Vec<usize>>,
}

impl std::fmt::Debug for JdkIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdkIndex")
            .field("modules", &self.module_names().collect::<Vec<_>>())
            .field("packages", &self.package_to_modules.len())
            .finish()
    }
}

impl JdkIndex {
    /// Discover a JDK (see [`JdkInstallation::discover`]) and index its `jmods/`.
    pub fn discover(home: Option<&Path>) -> Result<Self, JdkIndexError> {
        let install = JdkInstallation::discover(home)?;
        Self::from_jmods_dir(install.jmods_dir())
    }

    pub fn from_jdk_root(root: impl AsRef<Path>) -> Result<Self, JdkIndexError> {
        let install = JdkInstallation::from_root(root)?;
        Self::from_jmods_dir(install.jmods_dir())
    }

    pub fn from_jmods_dir(jmods_dir: impl AsRef<Path>) -> Result<Self, JdkIndexError> {
        let jmods_dir = jmods_dir.as_ref().to_path_buf();
        if !jmods_dir.is_dir() {
            return Err(JdkIndexError::MissingJmodsDir { dir: jmods_dir });
        }

        let mut module_paths: Vec<PathBuf> = std::fs::read_dir(&jmods_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jmod"))
            .collect();

        // `java.base` first: most lookups end there.
        module_paths.sort_by_key(|p| {
            let file_name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            (file_name != "java.base.jmod", file_name.to_owned())
        });

        if module_paths.is_empty() {
            return Err(JdkIndexError::NoModulesFound { dir: jmods_dir });
        }

        let mut modules = Vec::with_capacity(module_paths.len());
        let mut package_to_modules: HashMap<String, Vec<usize>> = HashMap::new();
        for path in module_paths {
            let module = load_module(path)?;
            let idx = modules.len();
            for package in &module.packages {
                package_to_modules.entry(package.clone()).or_default().push(idx);
            }
            modules.push(module);
        }

        tracing::debug!(
            target: "depcheck.jdk",
            dir = %jmods_dir.display(),
            modules = modules.len(),
            packages = package_to_modules.len(),
            "indexed JDK modules"
        );

        Ok(Self {
            modules,
            package_to_modules,
        })
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    /// `true` if any platform module declares `package` (binary form, `java.util`).
    pub fn is_platform_package(&self, package: &str) -> bool {
        self.package_to_modules.contains_key(package)
    }

    /// Names of the modules declaring `package`, in index order.
    pub fn modules_for_package(&self, package: &str) -> Vec<&str> {
        self.package_to_modules
            .get(package)
            .map(|idxs| idxs.iter().map(|&i| self.modules[i].name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Raw class file bytes for a binary class name (`java.util.List`).
    ///
    /// Only modules that declare the class's package are consulted.
    pub fn class_bytes(&self, binary_name: &str) -> Result<Option<Vec<u8>>, JdkIndexError> {
        let internal = binary_to_internal(binary_name);
        if is_non_type_classfile(&internal) {
            return Ok(None);
        }

        let package = binary_name.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
        let Some(candidates) = self.package_to_modules.get(package) else {
            return Ok(None);
        };

        let entry = format!("{internal}.class");
        for &idx in candidates {
            let module = &self.modules[idx];
            let mut archive = module.archive()?.lock();
            if let Some(bytes) = jmod::read_entry(&mut archive, &module.path, &entry)? {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }
}

fn load_module(path: PathBuf) -> Result<JdkModule, JdkIndexError> {
    let mut archive = jmod::open_archive(&path)?;
    let Some(bytes) = jmod::read_entry(&mut archive, &path, "module-info.class")? else {
        return Err(JdkIndexError::MissingModuleInfo { path });
    };
    let descriptor = match parse_module_info_class(&bytes) {
        Ok(descriptor) => descriptor,
        Err(source) => return Err(JdkIndexError::ModuleInfo { path, source }),
    };

    let mut packages = descriptor.packages;
    if packages.len() <= descriptor.exports.len() {
        // No `ModulePackages` attribute; fall back to the archive listing.
        packages.extend(archive.file_names().filter_map(|name| {
            let internal = jmod::entry_to_internal_name(name)?;
            if is_non_type_classfile(internal) {
                return None;
            }
            let (pkg, _) = internal.rsplit_once('/')?;
            Some(internal_to_binary(pkg))
        }));
    }

    Ok(JdkModule {
        name: descriptor.name,
        path,
        packages,
        archive: OnceCell::with_value(Mutex::new(archive)),
    })
}

#[cfg(test)]
mod tests {
    use depcheck_test_utils::{write_jmod, ClassBuilder, ModuleInfoBuilder};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_jmods_dir_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = JdkIndex::from_jmods_dir(tmp.path().join("jmods")).unwrap_err();
        assert!(matches!(err, JdkIndexError::MissingJmodsDir { .. }));
    }

    #[test]
    fn empty_jmods_dir_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = JdkIndex::from_jmods_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, JdkIndexError::NoModulesFound { .. }));
    }

    #[test]
    fn bad_header_is_rejected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("java.base.jmod"), b"PK\x03\x04garbage").unwrap();
        let err = JdkIndex::from_jmods_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, JdkIndexError::Jmod(JmodError::BadHeader { .. })));
    }

    #[test]
    fn non_exported_packages_are_indexed() {
        let tmp = TempDir::new().unwrap();
        write_jmod(
            &tmp.path().join("java.base.jmod"),
            &ModuleInfoBuilder::new("java.base")
                .exports("java/lang")
                .package("jdk/internal/misc"),
            &[ClassBuilder::new("jdk/internal/misc/Unsafe")],
        );

        let index = JdkIndex::from_jmods_dir(tmp.path()).unwrap();
        assert!(index.is_platform_package("jdk.internal.misc"));
        assert!(index.class_bytes("jdk.internal.misc.Unsafe").unwrap().is_some());
        assert!(index.class_bytes("jdk.internal.misc.module-info").unwrap().is_none());
    }
}
