use crate::code::{scan_invocations, MethodInvocation};
use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::Reader;

/// Access flag bits shared by classes and members.
pub mod access {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_SUPER: u16 = 0x0020;
    pub const ACC_BRIDGE: u16 = 0x0040;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
    pub const ACC_MODULE: u16 = 0x8000;
}

/// How much of each method body to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Header and member declarations only; `Code` attributes are skipped.
    #[default]
    Declarations,
    /// Additionally walk every `Code` attribute and record method invocations.
    Invocations,
}

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    /// Internal name, e.g. `com/acme/Foo`.
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ClassMember>,
    pub methods: Vec<ClassMember>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    /// Only populated for methods parsed with [`ParseMode::Invocations`].
    pub invocations: Vec<MethodInvocation>,
}

impl ClassMember {
    pub fn is_private(&self) -> bool {
        self.access_flags & access::ACC_PRIVATE != 0
    }
}

impl ClassFile {
    /// Parses the class header and member declarations.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_with(bytes, ParseMode::Declarations)
    }

    pub fn parse_with(bytes: &[u8], mode: ParseMode) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != 0xCAFEBABE {
            return Err(Error::InvalidMagic(magic));
        }

        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let cp = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = cp.get_class_name(reader.read_u2()?)?;
        let super_class_idx = reader.read_u2()?;
        let super_class = if super_class_idx == 0 {
            None
        } else {
            Some(cp.get_class_name(super_class_idx)?)
        };

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(cp.get_class_name(reader.read_u2()?)?);
        }

        let fields_count = reader.read_u2()? as usize;
        let mut fields = Vec::with_capacity(fields_count);
        for _ in 0..fields_count {
            fields.push(parse_member(&mut reader, &cp, ParseMode::Declarations)?);
        }

        let methods_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            methods.push(parse_member(&mut reader, &cp, mode)?);
        }

        let class_attrs = parse_attributes(&mut reader, &cp, ParseMode::Declarations)?;

        reader.ensure_empty()?;

        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            signature: class_attrs.signature,
        })
    }

    /// Every method invocation issued by any method of this class, in
    /// declaration order. Empty unless parsed with [`ParseMode::Invocations`].
    pub fn invocations(&self) -> impl Iterator<Item = &MethodInvocation> {
        self.methods.iter().flat_map(|m| m.invocations.iter())
    }
}

fn parse_member(reader: &mut Reader<'_>, cp: &ConstantPool, mode: ParseMode) -> Result<ClassMember> {
    let access_flags = reader.read_u2()?;
    let name = cp.get_utf8(reader.read_u2()?)?.to_string();
    let descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();

    let attrs = parse_attributes(reader, cp, mode)?;
    Ok(ClassMember {
        access_flags,
        name,
        descriptor,
        signature: attrs.signature,
        invocations: attrs.invocations,
    })
}

#[derive(Default)]
struct ParsedAttributes {
    signature: Option<String>,
    invocations: Vec<MethodInvocation>,
}

fn parse_attributes(reader: &mut Reader<'_>, cp: &ConstantPool, mode: ParseMode) -> Result<ParsedAttributes> {
    let attributes_count = reader.read_u2()? as usize;
    let mut parsed = ParsedAttributes::default();
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let name = cp.get_utf8(name_index)?;

        let mut sub = Reader::new(info);
        match name {
            "Signature" => {
                let sig_index = sub.read_u2()?;
                parsed.signature = Some(cp.get_utf8(sig_index)?.to_string());
                sub.ensure_empty()
                    .map_err(|_| Error::MalformedAttribute("Signature"))?;
            }
            "Code" if mode == ParseMode::Invocations => {
                let _max_stack = sub.read_u2()?;
                let _max_locals = sub.read_u2()?;
                let code_length = sub.read_u4()? as usize;
                let code = sub.read_bytes(code_length)?;
                parsed.invocations.extend(scan_invocations(code, cp)?);
                // Exception table and nested attributes (line numbers, frames)
                // carry no method references.
            }
            _ => {
                // Unknown attribute: intentionally skipped.
            }
        }
    }

    Ok(parsed)
}
