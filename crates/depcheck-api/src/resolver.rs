use std::sync::Arc;

use crate::provided::ProvidedApi;

/// Looks up the provided API of a class by binary name.
///
/// "Unknown class" is an ordinary outcome and is reported as `None`.
pub trait ClassResolver: Send + Sync {
    fn resolve(&self, binary_name: &str) -> Option<Arc<ProvidedApi>>;
}

impl<T: ClassResolver + ?Sized> ClassResolver for &T {
    fn resolve(&self, binary_name: &str) -> Option<Arc<ProvidedApi>> {
        (**self).resolve(binary_name)
    }
}

impl<T: ClassResolver + ?Sized> ClassResolver for Arc<T> {
    fn resolve(&self, binary_name: &str) -> Option<Arc<ProvidedApi>> {
        (**self).resolve(binary_name)
    }
}

impl<T: ClassResolver + ?Sized> ClassResolver for Box<T> {
    fn resolve(&self, binary_name: &str) -> Option<Arc<ProvidedApi>> {
        (**self).resolve(binary_name)
    }
}

/// Consults `primary` first, then `fallback`.
///
/// Classes known to `primary` shadow same-named classes of `fallback`.
#[derive(Debug, Clone)]
pub struct Chained<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> Chained<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: ClassResolver, F: ClassResolver> ClassResolver for Chained<P, F> {
    fn resolve(&self, binary_name: &str) -> Option<Arc<ProvidedApi>> {
        self.primary
            .resolve(binary_name)
            .or_else(|| self.fallback.resolve(binary_name))
    }
}

/// Resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClasses;

impl ClassResolver for NoClasses {
    fn resolve(&self, _binary_name: &str) -> Option<Arc<ProvidedApi>> {
        None
    }
}
