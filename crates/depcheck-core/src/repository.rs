use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use depcheck_osgi::{BundleManifest, ManifestError, Requirement, RequirementKind, VersionRange};

use crate::provider::{ArtifactVersion, DependencySource, ProvidingUnit, VersionProvider};
use crate::CheckError;

/// Bundle jars found below a set of directories.
///
/// Serves both as the requirement resolver and as a version provider.
#[derive(Debug, Clone, Default)]
pub struct LocalRepository {
    units: Vec<ProvidingUnit>,
}

impl LocalRepository {
    /// Scan `roots` for `*.jar` bundles.
    ///
    /// Jars without a bundle manifest are ignored; a missing root is an error.
    pub fn scan(roots: &[PathBuf]) -> Result<Self, CheckError> {
        let mut units = Vec::new();
        for root in roots {
            let mut jars = Vec::new();
            for entry in walkdir::WalkDir::new(root).follow_links(true) {
                let entry = entry.map_err(|source| CheckError::Repository {
                    path: root.clone(),
                    source,
                })?;
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
                {
                    jars.push(entry.into_path());
                }
            }
            jars.sort();

            for jar in jars {
                if let Some(unit) = read_unit(&jar) {
                    units.push(unit);
                }
            }
        }

        tracing::debug!(target: "depcheck.repository", bundles = units.len(), "scanned repositories");
        Ok(Self::from_units(units))
    }

    pub fn from_units(units: Vec<ProvidingUnit>) -> Self {
        Self { units }
    }

    pub fn units(&self) -> &[ProvidingUnit] {
        &self.units
    }

    fn versions_of<'a>(
        &'a self,
        kind: RequirementKind,
        lineage: Option<&'a str>,
        name: &'a str,
    ) -> impl Iterator<Item = (&'a ProvidingUnit, depcheck_osgi::Version)> + 'a {
        self.units.iter().filter_map(move |unit| match kind {
            RequirementKind::Package => {
                if lineage.is_some_and(|id| id != unit.id) {
                    return None;
                }
                unit.export_version(name).map(|v| (unit, v.clone()))
            }
            RequirementKind::Bundle => {
                if unit.id != name {
                    return None;
                }
                unit.version.clone().map(|v| (unit, v))
            }
        })
    }
}

fn read_unit(jar: &Path) -> Option<ProvidingUnit> {
    match BundleManifest::read_from_archive(jar) {
        Ok(manifest) => {
            let unit = ProvidingUnit::from_manifest(&manifest, Some(jar));
            if unit.is_none() {
                tracing::debug!(target: "depcheck.repository", jar = %jar.display(), "not a bundle, ignoring");
            }
            unit
        }
        Err(ManifestError::Missing { .. }) => {
            tracing::debug!(target: "depcheck.repository", jar = %jar.display(), "no manifest, ignoring");
            None
        }
        Err(err) => {
            tracing::warn!(
                target: "depcheck.repository",
                jar = %jar.display(),
                error = %err,
                "unreadable bundle manifest, ignoring"
            );
            None
        }
    }
}

impl DependencySource for LocalRepository {
    /// The highest version inside the declared range.
    fn resolve(&self, requirement: &Requirement) -> Option<ProvidingUnit> {
        self.versions_of(requirement.kind, None, &requirement.name)
            .filter(|(_, version)| requirement.range.includes(version))
            .max_by(|(a_unit, a), (b_unit, b)| a.cmp(b).then_with(|| a_unit.version.cmp(&b_unit.version)))
            .map(|(unit, _)| unit.clone())
    }
}

impl VersionProvider for LocalRepository {
    /// Packages are only looked up in other versions of the resolved bundle.
    fn versions(
        &self,
        kind: RequirementKind,
        unit: &ProvidingUnit,
        name: &str,
        range: &VersionRange,
    ) -> Vec<ArtifactVersion> {
        let lineage = match kind {
            RequirementKind::Package => Some(unit.id.as_str()),
            RequirementKind::Bundle => None,
        };
        let mut found: Vec<ArtifactVersion> = self
            .versions_of(kind, lineage, name)
            .filter(|(_, version)| range.includes(version))
            .map(|(candidate, version)| ArtifactVersion {
                version,
                artifact: candidate.location.clone(),
                provider: format!("{} {}", candidate.id, candidate.version.clone().unwrap_or_default()),
            })
            .collect();
        found.sort_by_key(|v| Reverse(v.version.clone()));
        found.dedup_by(|a, b| a.version == b.version);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depcheck_osgi::{ExportedPackage, Version};

    fn unit(id: &str, version: &str, exports: &[(&str, &str)]) -> ProvidingUnit {
        ProvidingUnit {
            id: id.into(),
            version: Some(Version::parse(version).unwrap()),
            exports: exports
                .iter()
                .map(|(name, v)| ExportedPackage {
                    name: (*name).into(),
                    version: Version::parse(v).unwrap(),
                })
                .collect(),
            location: Some(PathBuf::from(format!("{id}-{version}.jar"))),
        }
    }

    fn requirement(kind: RequirementKind, name: &str, range: &str) -> Requirement {
        Requirement {
            kind,
            name: name.into(),
            declared: Some(range.into()),
            range: VersionRange::parse(range).unwrap(),
            optional: false,
        }
    }

    fn repo() -> LocalRepository {
        LocalRepository::from_units(vec![
            unit("com.acme.lib", "1.0.0", &[("com.acme", "1.0.0")]),
            unit("com.acme.lib", "1.1.0", &[("com.acme", "1.1.0")]),
            unit("com.acme.lib", "2.0.0", &[("com.acme", "2.0.0")]),
            unit("org.fork", "9.0.0", &[("com.acme", "1.5.0")]),
        ])
    }

    #[test]
    fn resolves_highest_version_in_range() {
        let repo = repo();
        let resolved = repo
            .resolve(&requirement(RequirementKind::Package, "com.acme", "[1.0,1.5)"))
            .unwrap();
        assert_eq!(resolved.version, Some(Version::new(1, 1, 0)));

        let fork = repo
            .resolve(&requirement(RequirementKind::Package, "com.acme", "[1.0,2.0)"))
            .unwrap();
        assert_eq!(fork.id, "org.fork");

        let bundle = repo
            .resolve(&requirement(RequirementKind::Bundle, "com.acme.lib", "[1.0,2.0]"))
            .unwrap();
        assert_eq!(bundle.version, Some(Version::new(2, 0, 0)));

        assert!(repo
            .resolve(&requirement(RequirementKind::Package, "org.none", "0.0.0"))
            .is_none());
    }

    #[test]
    fn package_candidates_stay_in_the_bundle_lineage() {
        let repo = repo();
        let resolved = unit("com.acme.lib", "1.1.0", &[("com.acme", "1.1.0")]);
        let range = VersionRange::parse("[1.0,2.0)").unwrap();

        let versions = repo.versions(RequirementKind::Package, &resolved, "com.acme", &range);
        let found: Vec<String> = versions.iter().map(|v| v.version.to_string()).collect();
        assert_eq!(found, vec!["1.1.0", "1.0.0"]);
        assert_eq!(versions[0].provider, "com.acme.lib 1.1.0");
        assert_eq!(versions[0].artifact.as_deref(), Some(Path::new("com.acme.lib-1.1.0.jar")));

        let bundles = repo.versions(RequirementKind::Bundle, &resolved, "com.acme.lib", &range);
        assert_eq!(bundles.len(), 2);
    }
}
