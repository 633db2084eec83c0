use std::collections::BTreeSet;
use std::fmt;

use depcheck_api::MethodSignature;
use depcheck_osgi::{RequirementKind, Version};
use serde::Serialize;

/// Groups problems of one dependency version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProblemKey {
    pub dependency: String,
    pub version: Version,
}

impl fmt::Display for ProblemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.dependency, self.version)
    }
}

/// A used method missing from one candidate version of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyVersionProblem {
    pub key: ProblemKey,
    pub kind: RequirementKind,
    pub message: String,
    pub missing: MethodSignature,
    /// Classes of the checked artifact calling [`Self::missing`].
    pub references: BTreeSet<String>,
    /// What the candidate provides for the owning class; `None` when the
    /// class does not exist in that version at all.
    pub provided: Option<Vec<MethodSignature>>,
}

impl DependencyVersionProblem {
    /// `<message>, referenced by: <callers>`
    pub fn summary(&self) -> String {
        if self.references.is_empty() {
            return self.message.clone();
        }
        let callers: Vec<&str> = self.references.iter().map(String::as_str).collect();
        format!("{}, referenced by: {}", self.message, callers.join(", "))
    }
}
