use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use depcheck_api::{ApiError, ClassResolver, ProvidedApiRegistry};

use crate::problem::DependencyVersionProblem;
use crate::provider::VersionProvider;

/// Turns an artifact into its provided API.
pub trait ArtifactAnalyzer: Send + Sync {
    fn analyze(&self, artifact: &Path) -> Result<ProvidedApiRegistry, ApiError>;
}

/// Analyzes artifacts with a fixed supertype fallback, usually the platform.
pub struct DefaultAnalyzer {
    fallback: Arc<dyn ClassResolver>,
}

impl DefaultAnalyzer {
    pub fn new(fallback: Arc<dyn ClassResolver>) -> Self {
        Self { fallback }
    }
}

impl ArtifactAnalyzer for DefaultAnalyzer {
    fn analyze(&self, artifact: &Path) -> Result<ProvidedApiRegistry, ApiError> {
        ProvidedApiRegistry::analyze(artifact, Arc::clone(&self.fallback))
    }
}

/// State shared by all dependency checks of one run.
pub struct CheckRunState {
    problems: Vec<DependencyVersionProblem>,
    // Failed analyses are cached as `None`.
    registries: HashMap<PathBuf, Option<Arc<ProvidedApiRegistry>>>,
    analyzer: Box<dyn ArtifactAnalyzer>,
    providers: Vec<Arc<dyn VersionProvider>>,
    verbose: bool,
}

impl CheckRunState {
    pub fn new(analyzer: Box<dyn ArtifactAnalyzer>, verbose: bool) -> Self {
        Self {
            problems: Vec::new(),
            registries: HashMap::new(),
            analyzer,
            providers: Vec::new(),
            verbose,
        }
    }

    pub fn add_provider(&mut self, provider: Arc<dyn VersionProvider>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn VersionProvider>] {
        &self.providers
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// The provided API of `artifact`, analyzing it on first use.
    pub fn registry(&mut self, artifact: &Path) -> Option<Arc<ProvidedApiRegistry>> {
        if let Some(cached) = self.registries.get(artifact) {
            return cached.clone();
        }

        let registry = match self.analyzer.analyze(artifact) {
            Ok(registry) => Some(Arc::new(registry)),
            Err(err) => {
                tracing::warn!(
                    target: "depcheck.check",
                    artifact = %artifact.display(),
                    error = %err,
                    "failed to analyze candidate artifact"
                );
                None
            }
        };
        self.registries.insert(artifact.to_path_buf(), registry.clone());
        registry
    }

    pub fn add_problem(&mut self, problem: DependencyVersionProblem) {
        self.problems.push(problem);
    }

    /// Problems in the order they were found.
    pub fn problems(&self) -> &[DependencyVersionProblem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<DependencyVersionProblem> {
        self.problems
    }
}

impl std::fmt::Debug for CheckRunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckRunState")
            .field("problems", &self.problems.len())
            .field("registries", &self.registries.len())
            .field("providers", &self.providers.len())
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depcheck_api::NoClasses;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    impl ArtifactAnalyzer for Counting {
        fn analyze(&self, artifact: &Path) -> Result<ProvidedApiRegistry, ApiError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            DefaultAnalyzer::new(Arc::new(NoClasses)).analyze(artifact)
        }
    }

    #[test]
    fn failed_analysis_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut run = CheckRunState::new(Box::new(Counting(calls.clone())), false);
        let missing = Path::new("/definitely/not/here.jar");

        assert!(run.registry(missing).is_none());
        assert!(run.registry(missing).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
