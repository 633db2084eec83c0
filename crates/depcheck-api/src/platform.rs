use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use depcheck_jdk::JdkIndex;
use parking_lot::Mutex;

use crate::provided::ProvidedApi;
use crate::resolver::ClassResolver;
use crate::signature::package_of;

/// Provided API of the host platform's own classes, read from a JDK index.
///
/// Without a JDK every lookup is absent and only `java.*` packages and
/// array types count as platform classes.
#[derive(Debug)]
pub struct PlatformResolver {
    index: Option<JdkIndex>,
    memo: Mutex<HashMap<String, Option<Arc<ProvidedApi>>>>,
}

impl PlatformResolver {
    pub fn new(index: JdkIndex) -> Self {
        Self::with_index(Some(index))
    }

    pub fn unavailable() -> Self {
        Self::with_index(None)
    }

    /// Discover a JDK; failure degrades to [`PlatformResolver::unavailable`].
    pub fn discover(home: Option<&Path>) -> Self {
        match JdkIndex::discover(home) {
            Ok(index) => Self::new(index),
            Err(err) => {
                tracing::warn!(
                    target: "depcheck.jdk",
                    error = %err,
                    "no JDK available, platform classes will not be resolved"
                );
                Self::unavailable()
            }
        }
    }

    fn with_index(index: Option<JdkIndex>) -> Self {
        Self {
            index,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.index.is_some()
    }

    /// `true` for array types and for classes whose package belongs to the platform.
    pub fn is_platform_class(&self, binary_name: &str) -> bool {
        if binary_name.starts_with('[') {
            return true;
        }
        let package = package_of(binary_name);
        if package == "java" || package.starts_with("java.") {
            return true;
        }
        self.index
            .as_ref()
            .is_some_and(|index| index.is_platform_package(package))
    }

    fn load(&self, binary_name: &str) -> Option<Arc<ProvidedApi>> {
        let index = self.index.as_ref()?;
        let bytes = match index.class_bytes(binary_name) {
            Ok(bytes) => bytes?,
            Err(err) => {
                tracing::debug!(target: "depcheck.jdk", class = binary_name, error = %err, "platform lookup failed");
                return None;
            }
        };
        match ProvidedApi::extract(&bytes) {
            Ok(api) if api.name() == binary_name => Some(Arc::new(api)),
            Ok(api) => {
                tracing::debug!(target: "depcheck.jdk", class = binary_name, found = %api.name(), "platform class name mismatch");
                None
            }
            Err(err) => {
                tracing::debug!(target: "depcheck.jdk", class = binary_name, error = %err, "unparsable platform class");
                None
            }
        }
    }
}

impl ClassResolver for PlatformResolver {
    fn resolve(&self, binary_name: &str) -> Option<Arc<ProvidedApi>> {
        if let Some(hit) = self.memo.lock().get(binary_name) {
            return hit.clone();
        }
        let loaded = self.load(binary_name);
        self.memo
            .lock()
            .entry(binary_name.to_owned())
            .or_insert(loaded)
            .clone()
    }
}
