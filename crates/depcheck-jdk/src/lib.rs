//! JDK discovery and the platform package index.
//!
//! The dependency checker treats every class whose package belongs to a
//! JDK module as platform-provided. [`JdkIndex`] answers that question and
//! hands out raw class bytes so platform types can take part in
//! provided-API resolution.

mod discovery;
mod index;
mod jmod;

pub use discovery::{JdkDiscoveryError, JdkInstallation, JdkSource};
pub use index::{JdkIndex, JdkIndexError};
pub use jmod::JmodError;
