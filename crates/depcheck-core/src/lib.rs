//! Dependency version range checking for OSGi bundles.
//!
//! Given a bundle, [`run_check`] reads its declared requirements, finds the
//! methods it calls in each dependency and verifies every candidate version
//! of that dependency in the declared range still provides them. The result
//! is a [`Report`] of missing methods plus a suggested range floor per
//! affected dependency.

mod checker;
mod problem;
mod provider;
mod report;
mod repository;
mod run;
mod state;

use std::path::PathBuf;

use thiserror::Error;

pub use checker::{DependencyChecker, DependencyState, Suggestion};
pub use problem::{DependencyVersionProblem, ProblemKey};
pub use provider::{ArtifactVersion, DependencySource, ProvidingUnit, VersionProvider};
pub use report::{Report, ReportSink};
pub use repository::LocalRepository;
pub use run::{run_check, CheckOptions, CheckOutcome, Checkers};
pub use state::{ArtifactAnalyzer, CheckRunState, DefaultAnalyzer};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Manifest(#[from] depcheck_osgi::ManifestError),

    #[error("failed to analyze `{path}`: {source}")]
    Api {
        path: PathBuf,
        #[source]
        source: depcheck_api::ApiError,
    },

    #[error("failed to scan repository `{path}`: {source}")]
    Repository {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("cannot rewrite the manifest inside `{path}`, pass a manifest file to update")]
    ManifestInJar { path: PathBuf },
}
