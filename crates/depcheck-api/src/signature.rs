use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};

/// A method identity: owning class (binary name), method name and descriptor.
///
/// Ordered by class name, then method name, then descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    class_name: String,
    method_name: String,
    descriptor: String,
}

impl MethodSignature {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            descriptor: descriptor.into(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// `com.acme.Foo#bar(I)V`
    pub fn id(&self) -> String {
        format!("{}#{}{}", self.class_name, self.method_name, self.descriptor)
    }

    /// Package of the owning class; `""` for the default package.
    pub fn package_name(&self) -> &str {
        package_of(&self.class_name)
    }

    pub fn is_constructor(&self) -> bool {
        self.method_name == "<init>" || self.method_name == "<clinit>"
    }

    /// The same method, owned by `class_name`.
    pub fn rebase(&self, class_name: &str) -> Self {
        Self {
            class_name: class_name.to_owned(),
            method_name: self.method_name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}

impl Ord for MethodSignature {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.class_name, &self.method_name, &self.descriptor).cmp(&(
            &other.class_name,
            &other.method_name,
            &other.descriptor,
        ))
    }
}

impl PartialOrd for MethodSignature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}{}", self.class_name, self.method_name, self.descriptor)
    }
}

impl Serialize for MethodSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Package part of a binary class name.
pub fn package_of(binary_name: &str) -> &str {
    binary_name.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
}
