#![forbid(unsafe_code)]
//! Minimal JVM class-file reader.
//!
//! Only what the dependency checker needs is decoded: the class header,
//! method/field declarations, the `Signature` attribute, the method
//! invocations inside `Code` attributes and `module-info` descriptors.
//! Everything else is skipped without interpretation.

mod classfile;
mod code;
mod constant_pool;
mod error;
mod module_info;
mod reader;

pub use crate::classfile::{access, ClassFile, ClassMember, ParseMode};
pub use crate::code::{InvokeKind, MethodInvocation};
pub use crate::error::{Error, Result};
pub use crate::module_info::{parse_module_info_class, ModuleDescriptor};

/// Converts an internal name (`java/lang/String`) to a binary name (`java.lang.String`).
pub fn internal_to_binary(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Converts a binary name (`java.lang.String`) to an internal name (`java/lang/String`).
pub fn binary_to_internal(binary: &str) -> String {
    binary.replace('.', "/")
}

/// `true` for class files that carry metadata rather than a type.
pub fn is_non_type_classfile(internal_name: &str) -> bool {
    internal_name == "module-info"
        || internal_name.ends_with("/module-info")
        || internal_name == "package-info"
        || internal_name.ends_with("/package-info")
}
