//! OSGi metadata: versions, version ranges and bundle manifests.

mod bundle;
mod header;
mod manifest;
mod version;

pub use bundle::{
    update_requirement_ranges, BundleManifest, ExportedPackage, Requirement, RequirementKind, BUNDLE_SYMBOLIC_NAME,
    BUNDLE_VERSION, EXPORT_PACKAGE, IMPORT_PACKAGE, REQUIRE_BUNDLE,
};
pub use header::{parse_header, render_header, Clause};
pub use manifest::{Manifest, ManifestError};
pub use version::{Version, VersionError, VersionRange};
