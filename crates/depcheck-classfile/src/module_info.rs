use std::collections::BTreeSet;

use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::internal_to_binary;
use crate::reader::Reader;

/// The parts of a `module-info.class` needed to map packages to modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Exported packages (binary form, `java.lang`), qualified or not.
    pub exports: Vec<String>,
    /// Every package of the module: the `ModulePackages` attribute when
    /// present, always including the exported packages.
    pub packages: BTreeSet<String>,
}

impl ModuleDescriptor {
    pub fn contains_package(&self, package: &str) -> bool {
        self.packages.contains(package)
    }
}

/// Parse a `module-info.class` file into a [`ModuleDescriptor`].
pub fn parse_module_info_class(bytes: &[u8]) -> Result<ModuleDescriptor> {
    let mut reader = Reader::new(bytes);
    let magic = reader.read_u4()?;
    if magic != 0xCAFEBABE {
        return Err(Error::InvalidMagic(magic));
    }

    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let cp = ConstantPool::parse(&mut reader)?;

    // access_flags, this_class, super_class
    reader.skip(6)?;

    let interfaces_count = reader.read_u2()? as usize;
    reader.skip(interfaces_count * 2)?;

    let fields_count = reader.read_u2()? as usize;
    for _ in 0..fields_count {
        skip_member(&mut reader)?;
    }

    let methods_count = reader.read_u2()? as usize;
    for _ in 0..methods_count {
        skip_member(&mut reader)?;
    }

    let mut descriptor: Option<ModuleDescriptor> = None;
    let mut extra_packages = BTreeSet::new();

    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let mut sub = Reader::new(info);

        match cp.get_utf8(name_index)? {
            "Module" => {
                descriptor = Some(parse_module_attribute(&mut sub, &cp)?);
                sub.ensure_empty()
                    .map_err(|_| Error::MalformedAttribute("Module"))?;
            }
            "ModulePackages" => {
                let count = sub.read_u2()? as usize;
                for _ in 0..count {
                    let index = sub.read_u2()?;
                    extra_packages.insert(internal_to_binary(&cp.get_package_name(index)?));
                }
                sub.ensure_empty()
                    .map_err(|_| Error::MalformedAttribute("ModulePackages"))?;
            }
            _ => {}
        }
    }

    let mut descriptor = descriptor.ok_or(Error::Other("missing Module attribute"))?;
    descriptor.packages.extend(extra_packages);
    Ok(descriptor)
}

fn skip_member(reader: &mut Reader<'_>) -> Result<()> {
    // access_flags, name_index, descriptor_index
    reader.skip(6)?;
    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        reader.read_u2()?; // attribute_name_index
        let len = reader.read_u4()? as usize;
        reader.skip(len)?;
    }
    Ok(())
}

fn parse_module_attribute(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<ModuleDescriptor> {
    let module_name_index = reader.read_u2()?;
    let _module_flags = reader.read_u2()?;
    let _module_version_index = reader.read_u2()?;
    let name = cp.get_module_name(module_name_index)?;

    // requires: module, flags, version
    let requires_count = reader.read_u2()? as usize;
    reader.skip(requires_count * 6)?;

    let exports_count = reader.read_u2()? as usize;
    let mut exports = Vec::with_capacity(exports_count);
    for _ in 0..exports_count {
        let exports_index = reader.read_u2()?;
        let _exports_flags = reader.read_u2()?;
        let exports_to_count = reader.read_u2()? as usize;
        reader.skip(exports_to_count * 2)?;
        exports.push(internal_to_binary(&cp.get_package_name(exports_index)?));
    }

    let opens_count = reader.read_u2()? as usize;
    for _ in 0..opens_count {
        reader.skip(4)?;
        let opens_to_count = reader.read_u2()? as usize;
        reader.skip(opens_to_count * 2)?;
    }

    let uses_count = reader.read_u2()? as usize;
    reader.skip(uses_count * 2)?;

    let provides_count = reader.read_u2()? as usize;
    for _ in 0..provides_count {
        reader.skip(2)?;
        let with_count = reader.read_u2()? as usize;
        reader.skip(with_count * 2)?;
    }

    let packages = exports.iter().cloned().collect();
    Ok(ModuleDescriptor {
        name,
        exports,
        packages,
    })
}
