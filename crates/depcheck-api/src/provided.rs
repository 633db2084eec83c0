use std::collections::{BTreeSet, HashSet};

use depcheck_classfile::{internal_to_binary, ClassFile};

use crate::resolver::ClassResolver;
use crate::signature::MethodSignature;
use crate::ApiError;

/// Header of a parsed class: flags, names and direct supertypes, all in
/// binary form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    pub access_flags: u16,
    pub name: String,
    pub generic_signature: Option<String>,
    /// `None` only for `java.lang.Object`.
    pub super_name: Option<String>,
    pub interface_names: Vec<String>,
}

impl ClassDefinition {
    fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.super_name
            .as_deref()
            .into_iter()
            .chain(self.interface_names.iter().map(String::as_str))
    }
}

/// The externally callable methods of one class.
///
/// Only declarations are stored; inherited methods are computed by
/// [`ProvidedApi::provides`] against a resolver supplied by the caller.
#[derive(Debug, Clone)]
pub struct ProvidedApi {
    definition: ClassDefinition,
    declared: BTreeSet<MethodSignature>,
}

impl ProvidedApi {
    pub fn extract(bytes: &[u8]) -> Result<Self, ApiError> {
        Ok(Self::from_class_file(ClassFile::parse(bytes)?))
    }

    pub fn from_class_file(class: ClassFile) -> Self {
        let name = internal_to_binary(&class.this_class);
        let declared = class
            .methods
            .iter()
            .filter(|m| !m.is_private())
            .map(|m| MethodSignature::new(name.clone(), m.name.clone(), m.descriptor.clone()))
            .collect();

        let definition = ClassDefinition {
            access_flags: class.access_flags,
            generic_signature: class.signature,
            super_name: class.super_class.as_deref().map(internal_to_binary),
            interface_names: class.interfaces.iter().map(|i| internal_to_binary(i)).collect(),
            name,
        };

        Self {
            definition,
            declared,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ClassDefinition {
        &self.definition
    }

    /// Non-private methods declared by this class itself.
    pub fn declared(&self) -> &BTreeSet<MethodSignature> {
        &self.declared
    }

    /// Declared plus inherited methods, all owned by this class.
    ///
    /// Supertypes the resolver does not know contribute nothing. Inherited
    /// constructors and static initialisers are dropped. Each class is
    /// visited at most once, so cyclic hierarchies terminate.
    pub fn provides(&self, resolver: &dyn ClassResolver) -> BTreeSet<MethodSignature> {
        let mut visited = HashSet::new();
        self.collect(resolver, &mut visited)
    }

    fn collect(
        &self,
        resolver: &dyn ClassResolver,
        visited: &mut HashSet<String>,
    ) -> BTreeSet<MethodSignature> {
        visited.insert(self.definition.name.clone());

        let mut out = self.declared.clone();
        for supertype in self.definition.supertypes() {
            if visited.contains(supertype) {
                continue;
            }
            let Some(parent) = resolver.resolve(supertype) else {
                tracing::trace!(class = %self.name(), supertype, "supertype not resolvable");
                continue;
            };
            out.extend(
                parent
                    .collect(resolver, visited)
                    .into_iter()
                    .filter(|sig| !sig.is_constructor())
                    .map(|sig| sig.rebase(&self.definition.name)),
            );
        }
        out
    }
}
