use crate::error::{Error, Result};
use crate::reader::Reader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CpInfo {
    /// Placeholder for index 0 and the slot following a `Long`/`Double`.
    Unusable,
    Utf8(String),
    Integer,
    Float,
    Long,
    Double,
    Class { name_index: u16 },
    String,
    Fieldref,
    Methodref { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodref { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
    Module { name_index: u16 },
    Package { name_index: u16 },
}

impl CpInfo {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            CpInfo::Unusable => "Unusable",
            CpInfo::Utf8(_) => "Utf8",
            CpInfo::Integer => "Integer",
            CpInfo::Float => "Float",
            CpInfo::Long => "Long",
            CpInfo::Double => "Double",
            CpInfo::Class { .. } => "Class",
            CpInfo::String => "String",
            CpInfo::Fieldref => "Fieldref",
            CpInfo::Methodref { .. } => "Methodref",
            CpInfo::InterfaceMethodref { .. } => "InterfaceMethodref",
            CpInfo::NameAndType { .. } => "NameAndType",
            CpInfo::MethodHandle => "MethodHandle",
            CpInfo::MethodType => "MethodType",
            CpInfo::Dynamic => "Dynamic",
            CpInfo::InvokeDynamic => "InvokeDynamic",
            CpInfo::Module { .. } => "Module",
            CpInfo::Package { .. } => "Package",
        }
    }
}

/// A method reference resolved through the constant pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_interface: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ConstantPool {
    entries: Vec<CpInfo>,
}

impl ConstantPool {
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count.max(1));
        entries.push(CpInfo::Unusable);

        while entries.len() < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let len = reader.read_u2()? as usize;
                    CpInfo::Utf8(decode_modified_utf8(reader.read_bytes(len)?)?)
                }
                3 => {
                    reader.skip(4)?;
                    CpInfo::Integer
                }
                4 => {
                    reader.skip(4)?;
                    CpInfo::Float
                }
                5 => {
                    reader.skip(8)?;
                    CpInfo::Long
                }
                6 => {
                    reader.skip(8)?;
                    CpInfo::Double
                }
                7 => CpInfo::Class {
                    name_index: reader.read_u2()?,
                },
                8 => {
                    reader.skip(2)?;
                    CpInfo::String
                }
                9 => {
                    reader.skip(4)?;
                    CpInfo::Fieldref
                }
                10 => CpInfo::Methodref {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                11 => CpInfo::InterfaceMethodref {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                12 => CpInfo::NameAndType {
                    name_index: reader.read_u2()?,
                    descriptor_index: reader.read_u2()?,
                },
                15 => {
                    reader.skip(3)?;
                    CpInfo::MethodHandle
                }
                16 => {
                    reader.skip(2)?;
                    CpInfo::MethodType
                }
                17 => {
                    reader.skip(4)?;
                    CpInfo::Dynamic
                }
                18 => {
                    reader.skip(4)?;
                    CpInfo::InvokeDynamic
                }
                19 => CpInfo::Module {
                    name_index: reader.read_u2()?,
                },
                20 => CpInfo::Package {
                    name_index: reader.read_u2()?,
                },
                other => return Err(Error::InvalidConstantPoolTag(other)),
            };

            // 8-byte constants take up two slots.
            let wide = matches!(entry, CpInfo::Long | CpInfo::Double);
            entries.push(entry);
            if wide {
                entries.push(CpInfo::Unusable);
            }
        }

        if entries.len() > count.max(1) {
            return Err(Error::Other("8-byte constant overflows the constant pool"));
        }

        Ok(Self { entries })
    }

    pub(crate) fn get(&self, index: u16) -> Result<&CpInfo> {
        match self.entries.get(index as usize) {
            Some(CpInfo::Unusable) | None => Err(Error::InvalidConstantPoolIndex(index)),
            Some(entry) => Ok(entry),
        }
    }

    pub(crate) fn get_utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            CpInfo::Utf8(value) => Ok(value),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    pub(crate) fn get_class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::Class { name_index } => Ok(self.get_utf8(*name_index)?.to_string()),
            other => Err(mismatch(index, "Class", other)),
        }
    }

    pub(crate) fn get_module_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::Module { name_index } => Ok(self.get_utf8(*name_index)?.to_string()),
            other => Err(mismatch(index, "Module", other)),
        }
    }

    pub(crate) fn get_package_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpInfo::Package { name_index } => Ok(self.get_utf8(*name_index)?.to_string()),
            other => Err(mismatch(index, "Package", other)),
        }
    }

    /// Resolves a `Methodref` or `InterfaceMethodref` entry.
    pub(crate) fn get_method_ref(&self, index: u16) -> Result<MemberRef> {
        let (class_index, name_and_type_index, is_interface) = match self.get(index)? {
            CpInfo::Methodref {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, false),
            CpInfo::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, true),
            other => return Err(mismatch(index, "Methodref", other)),
        };

        let owner = self.get_class_name(class_index)?;
        let (name_index, descriptor_index) = match self.get(name_and_type_index)? {
            CpInfo::NameAndType {
                name_index,
                descriptor_index,
            } => (*name_index, *descriptor_index),
            other => return Err(mismatch(name_and_type_index, "NameAndType", other)),
        };

        Ok(MemberRef {
            owner,
            name: self.get_utf8(name_index)?.to_string(),
            descriptor: self.get_utf8(descriptor_index)?.to_string(),
            is_interface,
        })
    }
}

fn mismatch(index: u16, expected: &'static str, found: &CpInfo) -> Error {
    Error::ConstantPoolTypeMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

/// Decodes the JVM's "modified UTF-8" (CESU-8 with an overlong NUL).
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    if bytes.iter().all(|b| *b != 0 && *b < 0x80) {
        // ASCII fast path; covers nearly every identifier and descriptor.
        return std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::InvalidModifiedUtf8);
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0x80 == 0 {
            if b0 == 0 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push(u16::from(b0));
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = continuation(bytes, i + 1)?;
            units.push((u16::from(b0 & 0x1F) << 6) | u16::from(b1));
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = continuation(bytes, i + 1)?;
            let b2 = continuation(bytes, i + 2)?;
            units.push((u16::from(b0 & 0x0F) << 12) | (u16::from(b1) << 6) | u16::from(b2));
            i += 3;
        } else {
            return Err(Error::InvalidModifiedUtf8);
        }
    }

    String::from_utf16(&units).map_err(|_| Error::InvalidModifiedUtf8)
}

fn continuation(bytes: &[u8], index: usize) -> Result<u8> {
    match bytes.get(index) {
        Some(b) if b & 0xC0 == 0x80 => Ok(b & 0x3F),
        _ => Err(Error::InvalidModifiedUtf8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_modified_utf8_nul_and_surrogates() {
        assert_eq!(decode_modified_utf8(b"plain").unwrap(), "plain");
        assert_eq!(decode_modified_utf8(&[b'a', 0xC0, 0x80, b'b']).unwrap(), "a\0b");
        // U+1F600 as a CESU-8 surrogate pair.
        let smiley = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(decode_modified_utf8(&smiley).unwrap(), "\u{1F600}");
        assert_eq!(decode_modified_utf8(&[0xC3]), Err(Error::InvalidModifiedUtf8));
    }

    #[test]
    fn long_constants_occupy_two_slots() {
        // count = 4: #1 Long, #2 unusable, #3 Utf8 "x"
        let bytes = [
            0x00, 0x04, 5, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0x00, 0x01, b'x',
        ];
        let mut reader = Reader::new(&bytes);
        let cp = ConstantPool::parse(&mut reader).unwrap();
        assert_eq!(cp.get_utf8(3).unwrap(), "x");
        assert_eq!(cp.get(2), Err(Error::InvalidConstantPoolIndex(2)));
        assert!(matches!(
            cp.get_utf8(1),
            Err(Error::ConstantPoolTypeMismatch { expected: "Utf8", found: "Long", .. })
        ));
    }
}
