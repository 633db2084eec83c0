use std::collections::HashMap;

const ACC_PUBLIC: u16 = 0x0001;
const ACC_SUPER: u16 = 0x0020;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;
const ACC_MODULE: u16 = 0x8000;

const MAJOR_JAVA_8: u16 = 52;
const MAJOR_JAVA_9: u16 = 53;

/// A method invocation emitted into a generated `Code` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    opcode: u8,
    owner: String,
    name: String,
    descriptor: String,
}

impl Call {
    pub fn invokevirtual(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(0xb6, owner, name, descriptor)
    }

    pub fn invokespecial(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(0xb7, owner, name, descriptor)
    }

    pub fn invokestatic(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(0xb8, owner, name, descriptor)
    }

    pub fn invokeinterface(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(0xb9, owner, name, descriptor)
    }

    fn new(opcode: u8, owner: &str, name: &str, descriptor: &str) -> Self {
        Self {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct MemberDef {
    access_flags: u16,
    name: String,
    descriptor: String,
    calls: Vec<Call>,
}

/// Builds a syntactically valid class file.
///
/// Methods get a `Code` attribute (their calls followed by `return`)
/// unless they are abstract.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    internal_name: String,
    access_flags: u16,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<MemberDef>,
    methods: Vec<MemberDef>,
}

impl ClassBuilder {
    /// A public class extending `java/lang/Object`.
    pub fn new(internal_name: &str) -> Self {
        Self {
            internal_name: internal_name.to_string(),
            access_flags: ACC_PUBLIC | ACC_SUPER,
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A public interface.
    pub fn interface(internal_name: &str) -> Self {
        let mut this = Self::new(internal_name);
        this.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
        this
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn entry_name(&self) -> String {
        format!("{}.class", self.internal_name)
    }

    pub fn super_class(mut self, internal_name: &str) -> Self {
        self.super_class = Some(internal_name.to_string());
        self
    }

    /// Root of the hierarchy (`java/lang/Object` itself).
    pub fn no_super_class(mut self) -> Self {
        self.super_class = None;
        self
    }

    pub fn implements(mut self, internal_name: &str) -> Self {
        self.interfaces.push(internal_name.to_string());
        self
    }

    pub fn field(mut self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.fields.push(MemberDef {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            calls: Vec::new(),
        });
        self
    }

    pub fn method(self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.method_calling(access_flags, name, descriptor, &[])
    }

    pub fn method_calling(
        mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        calls: &[Call],
    ) -> Self {
        self.methods.push(MemberDef {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            calls: calls.to_vec(),
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = PoolWriter::default();
        let this_class = pool.class(&self.internal_name);
        let super_class = self.super_class.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();
        let code_name = pool.utf8("Code");

        let mut members = Vec::new();
        encode_members(&mut members, &mut pool, &self.fields, None);
        let fields_len = members.len();
        encode_members(&mut members, &mut pool, &self.methods, Some(code_name));
        let (fields, methods) = members.split_at(fields_len);

        let mut out = Vec::new();
        push_u32(&mut out, 0xCAFEBABE);
        push_u16(&mut out, 0);
        push_u16(&mut out, MAJOR_JAVA_8);
        pool.write(&mut out);
        push_u16(&mut out, self.access_flags);
        push_u16(&mut out, this_class);
        push_u16(&mut out, super_class);
        push_u16(&mut out, interfaces.len() as u16);
        for index in interfaces {
            push_u16(&mut out, index);
        }
        push_u16(&mut out, self.fields.len() as u16);
        out.extend_from_slice(fields);
        push_u16(&mut out, self.methods.len() as u16);
        out.extend_from_slice(methods);
        push_u16(&mut out, 0); // class attributes
        out
    }
}

fn encode_members(out: &mut Vec<u8>, pool: &mut PoolWriter, members: &[MemberDef], code_name: Option<u16>) {
    for member in members {
        push_u16(out, member.access_flags);
        push_u16(out, pool.utf8(&member.name));
        push_u16(out, pool.utf8(&member.descriptor));

        let code_name = match code_name {
            Some(index) if member.access_flags & ACC_ABSTRACT == 0 => index,
            _ => {
                push_u16(out, 0);
                continue;
            }
        };

        let mut code = Vec::new();
        for call in &member.calls {
            let is_interface = call.opcode == 0xb9;
            let index = pool.method_ref(&call.owner, &call.name, &call.descriptor, is_interface);
            code.push(call.opcode);
            push_u16(&mut code, index);
            if is_interface {
                code.push(1); // count
                code.push(0);
            }
        }
        code.push(0xb1); // return

        push_u16(out, 1); // attributes_count
        push_u16(out, code_name);
        push_u32(out, (2 + 2 + 4 + code.len() + 2 + 2) as u32);
        push_u16(out, 8); // max_stack
        push_u16(out, 8); // max_locals
        push_u32(out, code.len() as u32);
        out.extend_from_slice(&code);
        push_u16(out, 0); // exception_table_length
        push_u16(out, 0); // attributes_count
    }
}

/// Builds a `module-info.class` with `Module` and `ModulePackages` attributes.
#[derive(Debug, Clone)]
pub struct ModuleInfoBuilder {
    name: String,
    exports: Vec<String>,
    packages: Vec<String>,
}

impl ModuleInfoBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exports: Vec::new(),
            packages: Vec::new(),
        }
    }

    /// Exported package in internal form (`java/lang`).
    pub fn exports(mut self, package: &str) -> Self {
        self.exports.push(package.to_string());
        self
    }

    /// Non-exported package listed only in `ModulePackages`.
    pub fn package(mut self, package: &str) -> Self {
        self.packages.push(package.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = PoolWriter::default();
        let this_class = pool.class("module-info");
        let module_index = pool.module(&self.name);
        let exports: Vec<u16> = self.exports.iter().map(|p| pool.package(p)).collect();
        let all_packages: Vec<u16> = self
            .exports
            .iter()
            .chain(self.packages.iter())
            .map(|p| pool.package(p))
            .collect();
        let module_attr = pool.utf8("Module");
        let packages_attr = pool.utf8("ModulePackages");

        let mut module = Vec::new();
        push_u16(&mut module, module_index);
        push_u16(&mut module, 0); // flags
        push_u16(&mut module, 0); // version
        push_u16(&mut module, 0); // requires
        push_u16(&mut module, exports.len() as u16);
        for index in &exports {
            push_u16(&mut module, *index);
            push_u16(&mut module, 0); // flags
            push_u16(&mut module, 0); // exports_to_count
        }
        push_u16(&mut module, 0); // opens
        push_u16(&mut module, 0); // uses
        push_u16(&mut module, 0); // provides

        let mut packages = Vec::new();
        push_u16(&mut packages, all_packages.len() as u16);
        for index in &all_packages {
            push_u16(&mut packages, *index);
        }

        let mut out = Vec::new();
        push_u32(&mut out, 0xCAFEBABE);
        push_u16(&mut out, 0);
        push_u16(&mut out, MAJOR_JAVA_9);
        pool.write(&mut out);
        push_u16(&mut out, ACC_MODULE);
        push_u16(&mut out, this_class);
        push_u16(&mut out, 0); // super_class
        push_u16(&mut out, 0); // interfaces
        push_u16(&mut out, 0); // fields
        push_u16(&mut out, 0); // methods
        push_u16(&mut out, 2); // attributes
        push_u16(&mut out, module_attr);
        push_u32(&mut out, module.len() as u32);
        out.extend_from_slice(&module);
        push_u16(&mut out, packages_attr);
        push_u32(&mut out, packages.len() as u32);
        out.extend_from_slice(&packages);
        out
    }
}

/// Deduplicating constant pool writer.
#[derive(Default)]
struct PoolWriter {
    bytes: Vec<u8>,
    count: u16,
    interned: HashMap<(u8, String), u16>,
}

impl PoolWriter {
    fn intern(&mut self, tag: u8, key: String, body: Vec<u8>) -> u16 {
        if let Some(index) = self.interned.get(&(tag, key.clone())) {
            return *index;
        }
        self.count += 1;
        let index = self.count;
        self.bytes.push(tag);
        self.bytes.extend_from_slice(&body);
        self.interned.insert((tag, key), index);
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut body = Vec::new();
        push_u16(&mut body, value.len() as u16);
        body.extend_from_slice(value.as_bytes());
        self.intern(1, value.to_string(), body)
    }

    fn indexed(&mut self, tag: u8, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.intern(tag, name.to_string(), name_index.to_be_bytes().to_vec())
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        self.indexed(7, internal_name)
    }

    fn module(&mut self, name: &str) -> u16 {
        self.indexed(19, name)
    }

    fn package(&mut self, internal_name: &str) -> u16 {
        self.indexed(20, internal_name)
    }

    fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str, is_interface: bool) -> u16 {
        let class_index = self.class(owner);
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);

        let mut nat = Vec::new();
        push_u16(&mut nat, name_index);
        push_u16(&mut nat, descriptor_index);
        let nat_index = self.intern(12, format!("{name}:{descriptor}"), nat);

        let mut body = Vec::new();
        push_u16(&mut body, class_index);
        push_u16(&mut body, nat_index);
        let tag = if is_interface { 11 } else { 10 };
        self.intern(tag, format!("{owner}.{name}:{descriptor}"), body)
    }

    fn write(&self, out: &mut Vec<u8>) {
        push_u16(out, self.count + 1);
        out.extend_from_slice(&self.bytes);
    }
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}
