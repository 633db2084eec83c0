use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use depcheck_archive::Archive;
use depcheck_classfile::{internal_to_binary, ClassFile, ParseMode};

use crate::signature::MethodSignature;
use crate::ApiError;

/// The methods one class invokes on non-platform classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedApi {
    class_name: String,
    signatures: BTreeSet<MethodSignature>,
}

impl UsedApi {
    /// Collect every `invoke*` target of `bytes` whose owner is not a
    /// platform class. Array receivers are always skipped.
    pub fn extract(bytes: &[u8], is_platform_class: impl Fn(&str) -> bool) -> Result<Self, ApiError> {
        let class = ClassFile::parse_with(bytes, ParseMode::Invocations)?;
        let class_name = internal_to_binary(&class.this_class);

        let signatures = class
            .invocations()
            .filter(|call| !call.owner.starts_with('['))
            .map(|call| MethodSignature::new(internal_to_binary(&call.owner), &call.name, &call.descriptor))
            .filter(|sig| !is_platform_class(sig.class_name()))
            .collect();

        Ok(Self {
            class_name,
            signatures,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn signatures(&self) -> &BTreeSet<MethodSignature> {
        &self.signatures
    }
}

/// Used API of a whole artifact with caller attribution.
#[derive(Debug, Clone, Default)]
pub struct ArtifactUsage {
    classes: Vec<UsedApi>,
    references: BTreeMap<MethodSignature, BTreeSet<String>>,
}

impl ArtifactUsage {
    /// Scan every class of the jar or class directory at `path`.
    ///
    /// Unreadable or unparsable classes are logged and skipped; failing to
    /// open the artifact is an error.
    pub fn analyze(path: &Path, is_platform_class: impl Fn(&str) -> bool) -> Result<Self, ApiError> {
        let mut usage = Self::default();
        Archive::new(path).for_each_class(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(artifact = %path.display(), error = %err, "skipping unreadable class entry");
                    return;
                }
            };
            match UsedApi::extract(&entry.bytes, &is_platform_class) {
                Ok(used) => usage.add(used),
                Err(err) => tracing::warn!(
                    artifact = %path.display(),
                    entry = %entry.entry_name,
                    error = %err,
                    "skipping unparsable class"
                ),
            }
        })?;

        tracing::debug!(
            artifact = %path.display(),
            classes = usage.classes.len(),
            signatures = usage.references.len(),
            "analyzed used API"
        );
        Ok(usage)
    }

    pub fn add(&mut self, used: UsedApi) {
        for sig in &used.signatures {
            self.references
                .entry(sig.clone())
                .or_default()
                .insert(used.class_name.clone());
        }
        self.classes.push(used);
    }

    pub fn classes(&self) -> &[UsedApi] {
        &self.classes
    }

    /// Every used signature of the artifact.
    pub fn signatures(&self) -> impl Iterator<Item = &MethodSignature> {
        self.references.keys()
    }

    /// Used signatures whose owning package satisfies `in_scope`.
    pub fn signatures_in_packages(&self, in_scope: impl Fn(&str) -> bool) -> BTreeSet<MethodSignature> {
        self.references
            .keys()
            .filter(|sig| in_scope(sig.package_name()))
            .cloned()
            .collect()
    }

    /// Classes of the artifact that invoke `signature`.
    pub fn references(&self, signature: &MethodSignature) -> Option<&BTreeSet<String>> {
        self.references.get(signature)
    }

    pub fn reference_map(&self) -> &BTreeMap<MethodSignature, BTreeSet<String>> {
        &self.references
    }
}

#[cfg(test)]
mod tests {
    use depcheck_classfile::access::ACC_PUBLIC;
    use depcheck_test_utils::{corrupt_zip_entry, Call, ClassBuilder, JarBuilder};

    use super::*;

    fn is_java(name: &str) -> bool {
        name.starts_with("java.")
    }

    #[test]
    fn skips_platform_and_array_owners() {
        let bytes = ClassBuilder::new("com/acme/app/Main")
            .method_calling(
                ACC_PUBLIC,
                "run",
                "()V",
                &[
                    Call::invokespecial("java/lang/Object", "<init>", "()V"),
                    Call::invokevirtual("[I", "clone", "()Ljava/lang/Object;"),
                    Call::invokestatic("com/acme/Foo", "bar", "(I)V"),
                    Call::invokeinterface("com/acme/spi/Service", "call", "()V"),
                ],
            )
            .build();

        let used = UsedApi::extract(&bytes, is_java).unwrap();
        assert_eq!(used.class_name(), "com.acme.app.Main");
        let ids: Vec<String> = used.signatures().iter().map(MethodSignature::id).collect();
        assert_eq!(
            ids,
            vec!["com.acme.Foo#bar(I)V".to_string(), "com.acme.spi.Service#call()V".to_string()]
        );
    }

    #[test]
    fn aggregates_callers_and_scopes_by_package() {
        let call = [Call::invokevirtual("com/acme/Foo", "bar", "(I)V")];
        let mut usage = ArtifactUsage::default();
        for name in ["com/app/A", "com/app/B"] {
            let bytes = ClassBuilder::new(name)
                .method_calling(ACC_PUBLIC, "m", "()V", &call)
                .method_calling(ACC_PUBLIC, "n", "()V", &[Call::invokestatic("org/other/Util", "go", "()V")])
                .build();
            usage.add(UsedApi::extract(&bytes, is_java).unwrap());
        }

        let bar = MethodSignature::new("com.acme.Foo", "bar", "(I)V");
        assert_eq!(
            usage.references(&bar).unwrap(),
            &BTreeSet::from(["com.app.A".to_string(), "com.app.B".to_string()])
        );
        assert_eq!(
            usage.signatures_in_packages(|pkg| pkg == "com.acme"),
            BTreeSet::from([bar])
        );
        assert_eq!(usage.signatures().count(), 2);
    }

    #[test]
    fn damaged_entries_do_not_hide_the_rest_of_the_jar() {
        let tmp = tempfile::TempDir::new().unwrap();
        let jar = tmp.path().join("app.jar");
        let call = [Call::invokevirtual("com/acme/Foo", "bar", "(I)V")];
        JarBuilder::new()
            .class(&ClassBuilder::new("com/acme/app/Main").method_calling(ACC_PUBLIC, "run", "()V", &call))
            .class(&ClassBuilder::new("com/acme/app/Other").method_calling(ACC_PUBLIC, "run", "()V", &call))
            .write(&jar);
        corrupt_zip_entry(&jar, "com/acme/app/Other.class");

        let usage = ArtifactUsage::analyze(&jar, |_| false).unwrap();
        let sig = MethodSignature::new("com.acme.Foo", "bar", "(I)V");
        assert_eq!(
            usage.references(&sig).unwrap().iter().collect::<Vec<_>>(),
            vec!["com.acme.app.Main"]
        );
    }
}
