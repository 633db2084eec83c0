use std::path::{Path, PathBuf};
use std::sync::Arc;

use depcheck_api::{ArtifactUsage, PlatformResolver};
use depcheck_osgi::{BundleManifest, Manifest, RequirementKind};

use crate::checker::{DependencyChecker, Suggestion};
use crate::provider::DependencySource;
use crate::report::Report;
use crate::repository::LocalRepository;
use crate::state::{CheckRunState, DefaultAnalyzer};
use crate::CheckError;

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Bundle jar or class directory to check.
    pub artifact: PathBuf,
    pub repositories: Vec<PathBuf>,
    pub jdk_home: Option<PathBuf>,
    pub verbose: bool,
    pub apply_suggestions: bool,
    /// Manifest to rewrite; defaults to the one inside a class directory.
    pub manifest: Option<PathBuf>,
}

#[derive(Debug)]
pub struct CheckOutcome {
    pub report: Report,
    /// Set when suggestions were applied and the manifest changed.
    pub manifest_updated: Option<PathBuf>,
}

/// One checker per requirement kind.
#[derive(Debug, Clone)]
pub struct Checkers {
    pub package: DependencyChecker,
    pub bundle: DependencyChecker,
}

impl Checkers {
    pub fn new() -> Self {
        Self {
            package: DependencyChecker::new(RequirementKind::Package),
            bundle: DependencyChecker::new(RequirementKind::Bundle),
        }
    }

    pub fn get(&self, kind: RequirementKind) -> &DependencyChecker {
        match kind {
            RequirementKind::Package => &self.package,
            RequirementKind::Bundle => &self.bundle,
        }
    }

    fn get_mut(&mut self, kind: RequirementKind) -> &mut DependencyChecker {
        match kind {
            RequirementKind::Package => &mut self.package,
            RequirementKind::Bundle => &mut self.bundle,
        }
    }

    /// Check every requirement of `manifest`, imports first.
    pub fn check_all(
        &mut self,
        run: &mut CheckRunState,
        manifest: &BundleManifest,
        usage: &ArtifactUsage,
        source: &dyn DependencySource,
    ) {
        for kind in [RequirementKind::Package, RequirementKind::Bundle] {
            for requirement in manifest.requirements_of(kind) {
                let unit = source.resolve(requirement);
                self.get_mut(kind).check(run, requirement, unit.as_ref(), usage);
            }
        }
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        let mut out = self.package.suggestions();
        out.extend(self.bundle.suggestions());
        out
    }

    pub fn apply_suggestions(&self, manifest: &mut Manifest) -> Result<bool, CheckError> {
        let packages = self.package.apply_suggestions(manifest)?;
        let bundles = self.bundle.apply_suggestions(manifest)?;
        Ok(packages || bundles)
    }
}

impl Default for Checkers {
    fn default() -> Self {
        Self::new()
    }
}

/// Check the artifact described by `options` against the bundles in its
/// repositories.
pub fn run_check(options: &CheckOptions) -> Result<CheckOutcome, CheckError> {
    let artifact = options.artifact.as_path();
    let _span = tracing::info_span!("check", artifact = %artifact.display()).entered();

    // Fail before any expensive work when the rewrite target is unusable.
    let manifest_path = if options.apply_suggestions {
        Some(manifest_to_rewrite(artifact, options.manifest.as_deref())?)
    } else {
        None
    };

    let bundle = BundleManifest::read_from_archive(artifact)?;
    let platform = Arc::new(PlatformResolver::discover(options.jdk_home.as_deref()));
    let usage = ArtifactUsage::analyze(artifact, |name| platform.is_platform_class(name)).map_err(|source| {
        CheckError::Api {
            path: artifact.to_path_buf(),
            source,
        }
    })?;
    let repository = Arc::new(LocalRepository::scan(&options.repositories)?);

    let mut run = CheckRunState::new(Box::new(DefaultAnalyzer::new(platform)), options.verbose);
    run.add_provider(repository.clone());

    let mut checkers = Checkers::new();
    checkers.check_all(&mut run, &bundle, &usage, repository.as_ref());

    let mut manifest_updated = None;
    if let Some(path) = manifest_path {
        let mut manifest = Manifest::read_file(&path)?;
        if checkers.apply_suggestions(&mut manifest)? {
            manifest.write_file(&path)?;
            tracing::info!(manifest = %path.display(), "updated dependency ranges");
            manifest_updated = Some(path);
        }
    }

    let suggestions = checkers.suggestions();
    let problems = run.into_problems();
    tracing::info!(problems = problems.len(), suggestions = suggestions.len(), "check finished");
    Ok(CheckOutcome {
        report: Report::new(problems, suggestions, options.verbose),
        manifest_updated,
    })
}

fn manifest_to_rewrite(artifact: &Path, explicit: Option<&Path>) -> Result<PathBuf, CheckError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if artifact.is_dir() {
        return Ok(artifact.join("META-INF").join("MANIFEST.MF"));
    }
    Err(CheckError::ManifestInJar {
        path: artifact.to_path_buf(),
    })
}
