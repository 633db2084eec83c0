use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::checker::Suggestion;
use crate::problem::DependencyVersionProblem;

/// Receives rendered report lines.
pub trait ReportSink {
    fn line(&mut self, line: &str);
}

impl ReportSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_owned());
    }
}

/// Findings of a check run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    problems: Vec<DependencyVersionProblem>,
    suggestions: Vec<Suggestion>,
    #[serde(skip)]
    verbose: bool,
}

impl Report {
    pub fn new(problems: Vec<DependencyVersionProblem>, suggestions: Vec<Suggestion>, verbose: bool) -> Self {
        Self {
            problems,
            suggestions,
            verbose,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    /// Every recorded problem, duplicates included.
    pub fn problems(&self) -> &[DependencyVersionProblem] {
        &self.problems
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Problems to display: all of them in verbose mode, otherwise the first
    /// one per key.
    pub fn entries(&self) -> Vec<&DependencyVersionProblem> {
        if self.verbose {
            return self.problems.iter().collect();
        }
        let mut seen = HashSet::new();
        self.problems
            .iter()
            .filter(|problem| seen.insert(&problem.key))
            .collect()
    }

    pub fn write_to(&self, sink: &mut dyn ReportSink) {
        for problem in self.entries() {
            sink.line(&problem.summary());
            if !self.verbose {
                continue;
            }
            match &problem.provided {
                None => sink.line(&format!("  class `{}` does not exist", problem.missing.class_name())),
                Some(provided) if provided.is_empty() => {
                    sink.line(&format!("  class `{}` provides no methods", problem.missing.class_name()))
                }
                Some(provided) => {
                    for sig in provided {
                        sink.line(&format!("  provided: `{sig}`"));
                    }
                }
            }
        }
        for suggestion in &self.suggestions {
            sink.line(&suggestion.to_string());
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.write_to(&mut lines);
        lines
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Dependency version check\n\n");
        if self.is_clean() {
            out.push_str("No problems found.\n");
            return out;
        }

        out.push_str("## Problems\n\n");
        for problem in self.entries() {
            out.push_str(&format!("- {}\n", problem.summary()));
            if !self.verbose {
                continue;
            }
            for sig in problem.provided.iter().flatten() {
                out.push_str(&format!("  - provided: `{sig}`\n"));
            }
        }

        if !self.suggestions.is_empty() {
            out.push_str("\n## Version suggestions\n\n");
            for suggestion in &self.suggestions {
                out.push_str(&format!("- {suggestion}\n"));
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_markdown(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_markdown())
    }
}
