use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use depcheck_archive::Archive;
use once_cell::sync::OnceCell;

use crate::provided::ProvidedApi;
use crate::resolver::{Chained, ClassResolver};
use crate::signature::{package_of, MethodSignature};
use crate::ApiError;

/// The provided API of every class in one artifact.
///
/// As a [`ClassResolver`] a registry only answers for its own classes; use
/// [`ProvidedApiRegistry::chain`] to put another resolver behind it.
pub struct ProvidedApiRegistry {
    artifact: Option<PathBuf>,
    classes: BTreeMap<String, Arc<ProvidedApi>>,
    fallback: Arc<dyn ClassResolver>,
    provides: OnceCell<BTreeSet<MethodSignature>>,
}

impl std::fmt::Debug for ProvidedApiRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidedApiRegistry")
            .field("artifact", &self.artifact)
            .field("classes", &self.classes.len())
            .finish_non_exhaustive()
    }
}

impl ProvidedApiRegistry {
    /// Read every class of the jar or class directory at `path`.
    ///
    /// Class entries that cannot be read or parsed are logged and skipped. Supertypes outside
    /// the artifact are looked up in `fallback`.
    pub fn analyze(path: &Path, fallback: Arc<dyn ClassResolver>) -> Result<Self, ApiError> {
        let mut classes = Vec::new();
        let mut skipped = 0usize;
        Archive::new(path).for_each_class(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(artifact = %path.display(), error = %err, "skipping unreadable class entry");
                    return;
                }
            };
            match ProvidedApi::extract(&entry.bytes) {
                Ok(api) => classes.push(api),
                Err(err) => {
                    skipped += 1;
                    tracing::warn!(
                        artifact = %path.display(),
                        entry = %entry.entry_name,
                        error = %err,
                        "skipping unparsable class"
                    );
                }
            }
        })?;

        tracing::debug!(
            artifact = %path.display(),
            classes = classes.len(),
            skipped,
            "analyzed provided API"
        );

        let mut registry = Self::from_classes(classes, fallback);
        registry.artifact = Some(path.to_path_buf());
        Ok(registry)
    }

    pub fn from_classes(
        classes: impl IntoIterator<Item = ProvidedApi>,
        fallback: Arc<dyn ClassResolver>,
    ) -> Self {
        Self {
            artifact: None,
            classes: classes
                .into_iter()
                .map(|api| (api.name().to_owned(), Arc::new(api)))
                .collect(),
            fallback,
            provides: OnceCell::new(),
        }
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn get(&self, class_name: &str) -> Option<&Arc<ProvidedApi>> {
        self.classes.get(class_name)
    }

    /// Own classes first, then the fallback given at construction.
    pub fn resolver(&self) -> Chained<&Self, &dyn ClassResolver> {
        Chained::new(self, self.fallback.as_ref())
    }

    /// Own classes first, then `fallback`.
    pub fn chain<F: ClassResolver>(self: &Arc<Self>, fallback: F) -> Chained<Arc<Self>, F> {
        Chained::new(Arc::clone(self), fallback)
    }

    /// Provided methods of one class, optionally limited to methods whose
    /// owning package is `package`.
    pub fn class_methods(&self, class_name: &str, package: Option<&str>) -> Vec<MethodSignature> {
        let Some(api) = self.classes.get(class_name) else {
            return Vec::new();
        };
        api.provides(&self.resolver())
            .into_iter()
            .filter(|sig| package.map_or(true, |pkg| sig.package_name() == pkg))
            .collect()
    }

    /// Union of [`ProvidedApi::provides`] over all classes; computed once.
    pub fn provides(&self) -> &BTreeSet<MethodSignature> {
        self.provides.get_or_init(|| {
            let resolver = self.resolver();
            self.classes
                .values()
                .flat_map(|api| api.provides(&resolver))
                .collect()
        })
    }

    pub fn contains(&self, signature: &MethodSignature) -> bool {
        self.provides().contains(signature)
    }

    /// Packages that contain at least one class of this artifact.
    pub fn packages(&self) -> BTreeSet<&str> {
        self.classes.keys().map(|name| package_of(name)).collect()
    }
}

impl ClassResolver for ProvidedApiRegistry {
    fn resolve(&self, binary_name: &str) -> Option<Arc<ProvidedApi>> {
        self.classes.get(binary_name).cloned()
    }
}
