use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use depcheck_osgi::{BundleManifest, ExportedPackage, Requirement, RequirementKind, Version, VersionRange};

/// The bundle a requirement is currently resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidingUnit {
    pub id: String,
    pub version: Option<Version>,
    pub exports: Vec<ExportedPackage>,
    pub location: Option<PathBuf>,
}

impl ProvidingUnit {
    /// `None` when the manifest has no `Bundle-SymbolicName`.
    pub fn from_manifest(manifest: &BundleManifest, location: Option<&Path>) -> Option<Self> {
        Some(Self {
            id: manifest.symbolic_name.clone()?,
            version: manifest.version.clone(),
            exports: manifest.exports.clone(),
            location: location.map(Path::to_path_buf),
        })
    }

    pub fn export_version(&self, package: &str) -> Option<&Version> {
        self.exports.iter().find(|e| e.name == package).map(|e| &e.version)
    }

    pub fn exported_packages(&self) -> BTreeSet<&str> {
        self.exports.iter().map(|e| e.name.as_str()).collect()
    }

    /// The version a requirement of `kind` sees: the package export version
    /// for imports, the bundle version for required bundles.
    pub fn version_for(&self, kind: RequirementKind, name: &str) -> Option<&Version> {
        match kind {
            RequirementKind::Package => self.export_version(name),
            RequirementKind::Bundle => self.version.as_ref(),
        }
    }
}

/// One candidate version of a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactVersion {
    pub version: Version,
    /// `None` when the artifact could not be located.
    pub artifact: Option<PathBuf>,
    /// Where the candidate came from, e.g. `com.acme.lib 1.1.0`.
    pub provider: String,
}

/// Enumerates the versions of a dependency available for checking.
pub trait VersionProvider: Send + Sync {
    /// Candidate versions of `name` inside `range`. `unit` is the bundle the
    /// requirement currently resolves to.
    fn versions(
        &self,
        kind: RequirementKind,
        unit: &ProvidingUnit,
        name: &str,
        range: &VersionRange,
    ) -> Vec<ArtifactVersion>;
}

/// Resolves declared requirements to providing bundles.
pub trait DependencySource {
    fn resolve(&self, requirement: &Requirement) -> Option<ProvidingUnit>;
}
