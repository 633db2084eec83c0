//! Provided and used method APIs of compiled classes.
//!
//! [`ProvidedApi`] describes what a class can be called with (declared plus
//! inherited methods), [`UsedApi`] what a class calls. A
//! [`ProvidedApiRegistry`] holds the provided API of one artifact and
//! resolves supertypes through a chain of [`ClassResolver`]s ending in the
//! [`PlatformResolver`].

mod platform;
mod provided;
mod registry;
mod resolver;
mod signature;
mod used;

use thiserror::Error;

pub use platform::PlatformResolver;
pub use provided::{ClassDefinition, ProvidedApi};
pub use registry::ProvidedApiRegistry;
pub use resolver::{Chained, ClassResolver, NoClasses};
pub use signature::{package_of, MethodSignature};
pub use used::{ArtifactUsage, UsedApi};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Archive(#[from] depcheck_archive::ArchiveError),

    #[error("invalid class file: {0}")]
    ClassFile(#[from] depcheck_classfile::Error),
}
