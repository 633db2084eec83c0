//! Utilities shared by depcheck tests.
//!
//! Fixtures are generated in-process instead of being checked in as
//! binaries: [`ClassBuilder`] emits real class files (including `Code`
//! attributes with `invoke*` instructions), [`JarBuilder`] packs them into
//! jars and [`write_jmod`] produces a minimal JDK `jmods/` entry.

mod class_builder;
pub mod env;
mod jar;

pub use class_builder::{Call, ClassBuilder, ModuleInfoBuilder};
pub use env::{env_lock, EnvVarGuard};
pub use jar::{bundle_manifest, corrupt_zip_entry, write_jmod, JarBuilder};
