//! Checks declared dependency ranges against the methods an artifact calls.
//!
//! A [`DependencyChecker`] handles one requirement kind. For every requirement
//! it asks the registered version providers for candidate versions inside the
//! declared range, looks up each candidate's provided API through the run's
//! artifact cache and records a [`DependencyVersionProblem`] for every used
//! method a candidate lacks. The lowest version known to provide everything
//! becomes the suggested range floor.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use depcheck_api::{ArtifactUsage, MethodSignature};
use depcheck_osgi::{
    update_requirement_ranges, BundleManifest, Manifest, ManifestError, Requirement, RequirementKind, Version,
    VersionRange,
};
use serde::Serialize;

use crate::problem::{DependencyVersionProblem, ProblemKey};
use crate::provider::{ArtifactVersion, ProvidingUnit};
use crate::state::CheckRunState;

/// What the checker knows about one dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyState {
    requirement: Option<Requirement>,
    /// The version the artifact was built against.
    baseline: Option<Version>,
    good: BTreeSet<Version>,
    failed: BTreeSet<Version>,
    analyzed: BTreeSet<Version>,
    all_versions: BTreeSet<Version>,
    has_error: bool,
}

impl DependencyState {
    /// The lowest version known to provide every used method.
    ///
    /// The baseline counts as good unless it was analyzed and failed.
    pub fn lowest_good_version(&self) -> Option<&Version> {
        let baseline = self.baseline.as_ref().filter(|v| !self.failed.contains(*v));
        match (self.good.first(), baseline) {
            (Some(good), Some(baseline)) => Some(good.min(baseline)),
            (good, baseline) => good.or(baseline),
        }
    }

    pub fn baseline(&self) -> Option<&Version> {
        self.baseline.as_ref()
    }

    /// Baseline plus every candidate version offered, including ones whose
    /// artifact could not be located.
    pub fn all_versions(&self) -> &BTreeSet<Version> {
        &self.all_versions
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }
}

/// Suggested range floor for a dependency with problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub kind: RequirementKind,
    pub dependency: String,
    /// `None` when no checked version provides every used method.
    pub lowest: Option<Version>,
    pub all_versions: Vec<Version>,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seen: Vec<String> = self.all_versions.iter().map(ToString::to_string).collect();
        match &self.lowest {
            Some(lowest) => write!(
                f,
                "Suggested lower version for {} `{}` is `{}` out of [{}]",
                self.kind.noun(),
                self.dependency,
                lowest,
                seen.join(", ")
            ),
            None => write!(
                f,
                "No suitable version for {} `{}` found out of [{}]",
                self.kind.noun(),
                self.dependency,
                seen.join(", ")
            ),
        }
    }
}

/// Checker for one kind of requirement.
#[derive(Debug, Clone)]
pub struct DependencyChecker {
    kind: RequirementKind,
    states: BTreeMap<String, DependencyState>,
}

impl DependencyChecker {
    pub fn new(kind: RequirementKind) -> Self {
        Self {
            kind,
            states: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> RequirementKind {
        self.kind
    }

    pub fn state(&self, dependency: &str) -> Option<&DependencyState> {
        self.states.get(dependency)
    }

    pub fn states(&self) -> impl Iterator<Item = (&str, &DependencyState)> {
        self.states.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn lowest_good_version(&self, dependency: &str) -> Option<&Version> {
        self.state(dependency).and_then(DependencyState::lowest_good_version)
    }

    pub fn all_versions(&self, dependency: &str) -> Option<&BTreeSet<Version>> {
        self.state(dependency).map(DependencyState::all_versions)
    }

    /// Dependencies for which at least one candidate version lacks a used method.
    pub fn with_error(&self) -> impl Iterator<Item = &str> {
        self.states
            .iter()
            .filter(|(_, s)| s.has_error)
            .map(|(k, _)| k.as_str())
    }

    /// Check one requirement resolved to `unit`.
    ///
    /// Does nothing for an unresolved requirement. Candidate versions already
    /// analyzed for this dependency are skipped.
    pub fn check(
        &mut self,
        run: &mut CheckRunState,
        requirement: &Requirement,
        unit: Option<&ProvidingUnit>,
        usage: &ArtifactUsage,
    ) {
        debug_assert_eq!(requirement.kind, self.kind);
        let name = requirement.name.as_str();
        let Some(unit) = unit else {
            tracing::debug!(target: "depcheck.check", dependency = name, "requirement is not resolved");
            return;
        };
        let Some(baseline) = unit.version_for(self.kind, name).cloned() else {
            tracing::warn!(
                target: "depcheck.check",
                dependency = name,
                unit = %unit.id,
                "providing bundle has no usable version, skipping"
            );
            return;
        };

        let state = self.states.entry(name.to_owned()).or_default();
        if state.requirement.is_none() {
            state.requirement = Some(requirement.clone());
        }
        if state.baseline.is_none() {
            state.baseline = Some(baseline.clone());
        }
        state.all_versions.insert(baseline.clone());

        let used = match self.kind {
            RequirementKind::Package => usage.signatures_in_packages(|pkg| pkg == name),
            RequirementKind::Bundle => {
                let exports = unit.exported_packages();
                usage.signatures_in_packages(|pkg| exports.contains(pkg))
            }
        };
        if used.is_empty() {
            tracing::debug!(target: "depcheck.check", dependency = name, "no used methods, skipping");
            return;
        }

        let candidates: Vec<ArtifactVersion> = run
            .providers()
            .iter()
            .flat_map(|provider| provider.versions(self.kind, unit, name, &requirement.range))
            .collect();
        tracing::debug!(
            target: "depcheck.check",
            kind = %self.kind,
            dependency = name,
            range = %requirement.range,
            unit = %unit.id,
            candidates = ?candidates.iter().map(|c| c.version.to_string()).collect::<Vec<_>>(),
            "checking candidate versions"
        );

        let message = MessageContext {
            kind: self.kind,
            dependency: name,
            declared: requirement.range_text(),
            baseline: &baseline,
            unit,
            verbose: run.is_verbose(),
        };

        for candidate in candidates {
            self.states
                .entry(name.to_owned())
                .or_default()
                .all_versions
                .insert(candidate.version.clone());
            let Some(artifact) = candidate.artifact.as_deref() else {
                tracing::debug!(
                    target: "depcheck.check",
                    dependency = name,
                    version = %candidate.version,
                    "candidate has no artifact, skipping"
                );
                continue;
            };
            let state = self.states.entry(name.to_owned()).or_default();
            if !state.analyzed.insert(candidate.version.clone()) {
                continue;
            }

            let scoped = match self.kind {
                RequirementKind::Package => used.clone(),
                // The exports of this particular version decide what it must provide.
                RequirementKind::Bundle => match BundleManifest::read_from_archive(artifact) {
                    Ok(manifest) => {
                        let exports: BTreeSet<&str> = manifest.exported_packages().collect();
                        usage.signatures_in_packages(|pkg| exports.contains(pkg))
                    }
                    Err(err) => {
                        tracing::debug!(
                            target: "depcheck.check",
                            artifact = %artifact.display(),
                            error = %err,
                            "cannot read exported packages of candidate"
                        );
                        BTreeSet::new()
                    }
                },
            };
            if scoped.is_empty() {
                continue;
            }

            let Some(registry) = run.registry(artifact) else {
                continue;
            };

            let mut ok = true;
            for signature in &scoped {
                if registry.contains(signature) {
                    continue;
                }
                ok = false;

                let provided = registry.get(signature.class_name()).map(|_| {
                    let filter = match self.kind {
                        RequirementKind::Package => Some(name),
                        RequirementKind::Bundle => None,
                    };
                    registry.class_methods(signature.class_name(), filter)
                });
                tracing::debug!(target: "depcheck.check", signature = %signature, "not found");
                for sig in provided.iter().flatten() {
                    tracing::debug!(target: "depcheck.check", signature = %sig, "provided");
                }

                run.add_problem(DependencyVersionProblem {
                    key: ProblemKey {
                        dependency: name.to_owned(),
                        version: candidate.version.clone(),
                    },
                    kind: self.kind,
                    message: message.render(&candidate, signature),
                    missing: signature.clone(),
                    references: usage.references(signature).cloned().unwrap_or_default(),
                    provided,
                });
            }

            let state = self.states.entry(name.to_owned()).or_default();
            if ok {
                state.good.insert(candidate.version);
            } else {
                state.has_error = true;
                state.failed.insert(candidate.version);
            }
        }
    }

    /// Range floor suggestions for every dependency with problems.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.states
            .iter()
            .filter(|(_, state)| state.has_error)
            .map(|(name, state)| Suggestion {
                kind: self.kind,
                dependency: name.clone(),
                lowest: state.lowest_good_version().cloned(),
                all_versions: state.all_versions.iter().cloned().collect(),
            })
            .collect()
    }

    /// Raise the declared range floor of every dependency with problems to
    /// its lowest good version. Returns whether `manifest` changed.
    pub fn apply_suggestions(&self, manifest: &mut Manifest) -> Result<bool, ManifestError> {
        let mut updates = BTreeMap::new();
        for (name, state) in self.states.iter().filter(|(_, s)| s.has_error) {
            let (Some(requirement), Some(lowest)) = (&state.requirement, state.lowest_good_version()) else {
                tracing::warn!(target: "depcheck.check", dependency = %name, "no good version to suggest");
                continue;
            };
            if let Some(range) = suggested_range(requirement, lowest) {
                updates.insert(name.clone(), range.to_string());
            }
        }
        if updates.is_empty() {
            return Ok(false);
        }
        update_requirement_ranges(manifest, self.kind, &updates)
    }
}

/// The declared range with its floor raised to `lowest`, or `None` when the
/// floor would not change or `lowest` lies outside the declared range.
fn suggested_range(requirement: &Requirement, lowest: &Version) -> Option<VersionRange> {
    let range = &requirement.range;
    if !range.includes(lowest) {
        tracing::warn!(
            target: "depcheck.check",
            dependency = %requirement.name,
            range = %range,
            version = %lowest,
            "suggested version is outside the declared range"
        );
        return None;
    }

    if requirement.declared.is_some() && range.left() == lowest && range.is_left_closed() {
        return None;
    }
    Some(match (&requirement.declared, range.right()) {
        (None, _) => VersionRange::interval(lowest.clone(), true, Version::new(lowest.major + 1, 0, 0), false),
        (Some(_), Some(_)) => range.with_floor(lowest.clone()),
        (Some(_), None) => VersionRange::at_least(lowest.clone()),
    })
}

struct MessageContext<'a> {
    kind: RequirementKind,
    dependency: &'a str,
    declared: &'a str,
    baseline: &'a Version,
    unit: &'a ProvidingUnit,
    verbose: bool,
}

impl MessageContext<'_> {
    fn render(&self, candidate: &ArtifactVersion, missing: &MethodSignature) -> String {
        let method = if self.verbose {
            format!("{} {}", missing.method_name(), missing.descriptor())
        } else {
            missing.method_name().to_owned()
        };
        format!(
            "{} `{} {}` (compiled against `{}` provided by `{} {}`) includes `{}` (provided by `{}`) but this version is missing the method `{}#{}`",
            self.kind,
            self.dependency,
            self.declared,
            self.baseline,
            self.unit.id,
            self.unit.version.clone().unwrap_or_default(),
            candidate.version,
            candidate.provider,
            missing.class_name(),
            method,
        )
    }
}
