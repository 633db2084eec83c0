use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::header::{parse_header, render_header, Clause};
use crate::manifest::{Manifest, ManifestError};
use crate::version::{Version, VersionRange};

pub const BUNDLE_SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
pub const BUNDLE_VERSION: &str = "Bundle-Version";
pub const IMPORT_PACKAGE: &str = "Import-Package";
pub const REQUIRE_BUNDLE: &str = "Require-Bundle";
pub const EXPORT_PACKAGE: &str = "Export-Package";

/// How a dependency is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RequirementKind {
    #[serde(rename = "Import-Package")]
    Package,
    #[serde(rename = "Require-Bundle")]
    Bundle,
}

impl RequirementKind {
    pub fn header(self) -> &'static str {
        match self {
            RequirementKind::Package => IMPORT_PACKAGE,
            RequirementKind::Bundle => REQUIRE_BUNDLE,
        }
    }

    pub fn namespace(self) -> &'static str {
        match self {
            RequirementKind::Package => "osgi.wiring.package",
            RequirementKind::Bundle => "osgi.wiring.bundle",
        }
    }

    /// Attribute holding the version range in a clause.
    pub fn version_attribute(self) -> &'static str {
        match self {
            RequirementKind::Package => "version",
            RequirementKind::Bundle => "bundle-version",
        }
    }

    /// `package` / `bundle`
    pub fn noun(self) -> &'static str {
        match self {
            RequirementKind::Package => "package",
            RequirementKind::Bundle => "bundle",
        }
    }
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// A declared dependency: an imported package or a required bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub kind: RequirementKind,
    pub name: String,
    /// The range as written in the manifest, `None` if absent.
    pub declared: Option<String>,
    /// The effective range (`0.0.0` when nothing was declared).
    pub range: VersionRange,
    pub optional: bool,
}

impl Requirement {
    /// Declared range text, or `0.0.0`.
    pub fn range_text(&self) -> &str {
        self.declared.as_deref().unwrap_or("0.0.0")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedPackage {
    pub name: String,
    pub version: Version,
}

/// The OSGi view of a bundle manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleManifest {
    pub symbolic_name: Option<String>,
    /// `None` when `Bundle-Version` is absent or not a valid OSGi version.
    pub version: Option<Version>,
    pub requirements: Vec<Requirement>,
    pub exports: Vec<ExportedPackage>,
}

impl BundleManifest {
    /// Interpret `manifest`.
    ///
    /// Malformed requirement clauses or ranges are errors; an unparsable
    /// `Bundle-Version` only leaves the version unset.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ManifestError> {
        let symbolic_name = match manifest.get(BUNDLE_SYMBOLIC_NAME) {
            Some(value) => parse_header(BUNDLE_SYMBOLIC_NAME, value)?
                .first()
                .map(|c| c.name().to_owned()),
            None => None,
        };

        let version = manifest.get(BUNDLE_VERSION).and_then(|text| match Version::parse(text) {
            Ok(version) => Some(version),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring invalid Bundle-Version");
                None
            }
        });

        let mut requirements = Vec::new();
        for kind in [RequirementKind::Package, RequirementKind::Bundle] {
            requirements.extend(parse_requirements(manifest, kind)?);
        }

        let mut exports = Vec::new();
        if let Some(value) = manifest.get(EXPORT_PACKAGE) {
            for clause in parse_header(EXPORT_PACKAGE, value)? {
                let text = clause
                    .attribute("version")
                    .or_else(|| clause.attribute("specification-version"));
                let version = match text {
                    Some(text) => Version::parse(text).map_err(|source| ManifestError::Version {
                        header: EXPORT_PACKAGE.to_owned(),
                        source,
                    })?,
                    None => Version::default(),
                };
                exports.extend(clause.names.iter().map(|name| ExportedPackage {
                    name: name.clone(),
                    version: version.clone(),
                }));
            }
        }

        Ok(Self {
            symbolic_name,
            version,
            requirements,
            exports,
        })
    }

    pub fn read_from_archive(path: &Path) -> Result<Self, ManifestError> {
        Self::from_manifest(&Manifest::read_from_archive(path)?)
    }

    pub fn requirements_of(&self, kind: RequirementKind) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().filter(move |r| r.kind == kind)
    }

    pub fn export(&self, package: &str) -> Option<&ExportedPackage> {
        self.exports.iter().find(|e| e.name == package)
    }

    pub fn exported_packages(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(|e| e.name.as_str())
    }
}

fn parse_requirements(manifest: &Manifest, kind: RequirementKind) -> Result<Vec<Requirement>, ManifestError> {
    let Some(value) = manifest.get(kind.header()) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for clause in parse_header(kind.header(), value)? {
        let declared = clause.attribute(kind.version_attribute()).map(str::to_owned);
        let range = VersionRange::parse(declared.as_deref().unwrap_or("0.0.0")).map_err(|source| {
            ManifestError::Version {
                header: kind.header().to_owned(),
                source,
            }
        })?;
        let optional = clause.directive("resolution") == Some("optional");
        out.extend(clause.names.iter().map(|name| Requirement {
            kind,
            name: name.clone(),
            declared: declared.clone(),
            range: range.clone(),
            optional,
        }));
    }
    Ok(out)
}

/// Rewrite the declared ranges of `kind` requirements.
///
/// `updates` maps requirement names to new range text. Returns whether the
/// manifest changed.
pub fn update_requirement_ranges(
    manifest: &mut Manifest,
    kind: RequirementKind,
    updates: &BTreeMap<String, String>,
) -> Result<bool, ManifestError> {
    let Some(value) = manifest.get(kind.header()) else {
        return Ok(false);
    };

    let clauses = parse_header(kind.header(), value)?;
    let mut changed = false;
    let mut split = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let targets: Vec<&String> = clause.names.iter().filter(|n| updates.contains_key(*n)).collect();
        if targets.is_empty() {
            split.push(clause);
            continue;
        }

        // A clause naming several packages may need different ranges per name.
        let rest: Vec<String> = clause
            .names
            .iter()
            .filter(|n| !updates.contains_key(*n))
            .cloned()
            .collect();
        for name in targets {
            let new_range = &updates[name];
            if clause.attribute(kind.version_attribute()) == Some(new_range.as_str()) {
                split.push(Clause {
                    names: vec![name.clone()],
                    ..clause.clone()
                });
                continue;
            }
            let mut single = Clause {
                names: vec![name.clone()],
                ..clause.clone()
            };
            single.set_attribute(kind.version_attribute(), new_range.clone());
            split.push(single);
            changed = true;
        }
        if !rest.is_empty() {
            split.push(Clause {
                names: rest,
                ..clause
            });
        }
    }

    if changed {
        manifest.set(kind.header(), render_header(&split));
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(text: &str) -> Manifest {
        Manifest::parse(text).unwrap()
    }

    #[test]
    fn reads_requirements_and_exports() {
        let bundle = BundleManifest::from_manifest(&manifest(
            "Bundle-SymbolicName: com.acme.app;singleton:=true\n\
             Bundle-Version: 1.2.3.qualifier\n\
             Import-Package: com.acme;version=\"[1.0,2.0)\",org.other;resolution:=optional\n\
             Require-Bundle: org.lib;bundle-version=\"1.5\"\n\
             Export-Package: com.acme.app;version=\"1.2\",com.acme.app.spi\n",
        ))
        .unwrap();

        assert_eq!(bundle.symbolic_name.as_deref(), Some("com.acme.app"));
        assert_eq!(bundle.version.as_ref().map(ToString::to_string).as_deref(), Some("1.2.3.qualifier"));

        let imports: Vec<&Requirement> = bundle.requirements_of(RequirementKind::Package).collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].range.to_string(), "[1.0.0,2.0.0)");
        assert_eq!(imports[1].declared, None);
        assert_eq!(imports[1].range_text(), "0.0.0");
        assert!(imports[1].optional);

        let requires: Vec<&Requirement> = bundle.requirements_of(RequirementKind::Bundle).collect();
        assert_eq!(requires[0].name, "org.lib");
        assert_eq!(requires[0].range.to_string(), "1.5.0");

        assert_eq!(bundle.export("com.acme.app").unwrap().version, Version::new(1, 2, 0));
        assert_eq!(bundle.export("com.acme.app.spi").unwrap().version, Version::default());
    }

    #[test]
    fn malformed_requirement_is_an_error() {
        let err = BundleManifest::from_manifest(&manifest("Import-Package: com.acme;version=\"[1.0,2.0\n"))
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidHeader { .. }));

        let err = BundleManifest::from_manifest(&manifest("Import-Package: com.acme;version=\"[2.0,1.0)\"\n"))
            .unwrap_err();
        assert!(matches!(err, ManifestError::Version { .. }));
    }

    #[test]
    fn invalid_bundle_version_is_unset() {
        let bundle = BundleManifest::from_manifest(&manifest("Bundle-SymbolicName: a\nBundle-Version: one\n")).unwrap();
        assert_eq!(bundle.version, None);
    }

    #[test]
    fn updates_only_changed_ranges() {
        let mut m = manifest("Import-Package: com.acme;com.acme.spi;version=\"[1.0,2.0)\",org.other\n");

        let unchanged = BTreeMap::from([("org.missing".to_string(), "[1.0,2.0)".to_string())]);
        assert!(!update_requirement_ranges(&mut m, RequirementKind::Package, &unchanged).unwrap());

        let updates = BTreeMap::from([("com.acme".to_string(), "[1.1.0,2.0.0)".to_string())]);
        assert!(update_requirement_ranges(&mut m, RequirementKind::Package, &updates).unwrap());
        assert_eq!(
            m.get(IMPORT_PACKAGE),
            Some("com.acme;version=\"[1.1.0,2.0.0)\",com.acme.spi;version=\"[1.0,2.0)\",org.other")
        );

        assert!(!update_requirement_ranges(&mut m, RequirementKind::Package, &updates).unwrap());
        assert!(!update_requirement_ranges(&mut m, RequirementKind::Bundle, &updates).unwrap());
    }
}
