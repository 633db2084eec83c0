use depcheck_classfile::{
    access, parse_module_info_class, ClassFile, Error, InvokeKind, ParseMode,
};
use depcheck_test_utils::{Call, ClassBuilder, ModuleInfoBuilder};

#[test]
fn parses_header_and_members() {
    let bytes = ClassBuilder::new("com/acme/Foo")
        .super_class("com/acme/Base")
        .implements("com/acme/Api")
        .field(access::ACC_PRIVATE, "count", "I")
        .method(access::ACC_PUBLIC, "<init>", "()V")
        .method(access::ACC_PRIVATE, "secret", "()V")
        .method(access::ACC_PUBLIC | access::ACC_ABSTRACT, "bar", "(I)V")
        .build();

    let class = ClassFile::parse(&bytes).unwrap();
    assert_eq!(class.major_version, 52);
    assert_eq!(class.this_class, "com/acme/Foo");
    assert_eq!(class.super_class.as_deref(), Some("com/acme/Base"));
    assert_eq!(class.interfaces, vec!["com/acme/Api".to_string()]);
    assert_eq!(class.fields.len(), 1);
    assert_eq!(class.fields[0].name, "count");

    let names: Vec<_> = class.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["<init>", "secret", "bar"]);
    assert!(class.methods[1].is_private());
    assert!(!class.methods[2].is_private());
    assert_eq!(class.methods[2].descriptor, "(I)V");

    // Declarations mode never decodes bodies.
    assert_eq!(class.invocations().count(), 0);
}

#[test]
fn root_class_has_no_superclass() {
    let bytes = ClassBuilder::new("java/lang/Object")
        .no_super_class()
        .build();
    let class = ClassFile::parse(&bytes).unwrap();
    assert_eq!(class.super_class, None);
}

#[test]
fn collects_invocations_from_code() {
    let bytes = ClassBuilder::new("com/acme/client/Client")
        .method_calling(
            access::ACC_PUBLIC,
            "run",
            "()V",
            &[
                Call::invokespecial("java/lang/Object", "<init>", "()V"),
                Call::invokevirtual("com/acme/Foo", "bar", "(I)V"),
                Call::invokeinterface("com/acme/Api", "call", "()Ljava/lang/String;"),
            ],
        )
        .method_calling(
            access::ACC_STATIC,
            "helper",
            "()V",
            &[Call::invokestatic("com/acme/Util", "help", "()V")],
        )
        .build();

    let class = ClassFile::parse_with(&bytes, ParseMode::Invocations).unwrap();
    let calls: Vec<_> = class
        .invocations()
        .map(|i| (i.kind, i.owner.as_str(), i.name.as_str(), i.descriptor.as_str()))
        .collect();
    assert_eq!(
        calls,
        vec![
            (InvokeKind::Special, "java/lang/Object", "<init>", "()V"),
            (InvokeKind::Virtual, "com/acme/Foo", "bar", "(I)V"),
            (InvokeKind::Interface, "com/acme/Api", "call", "()Ljava/lang/String;"),
            (InvokeKind::Static, "com/acme/Util", "help", "()V"),
        ]
    );
}

#[test]
fn rejects_bad_magic_and_truncation() {
    let mut bytes = ClassBuilder::new("com/acme/Foo").build();
    let truncated = &bytes[..bytes.len() - 3];
    assert_eq!(ClassFile::parse(truncated).unwrap_err(), Error::UnexpectedEof);

    bytes[0] = 0x00;
    assert!(matches!(ClassFile::parse(&bytes), Err(Error::InvalidMagic(_))));
}

#[test]
fn parses_module_descriptor_packages() {
    let bytes = ModuleInfoBuilder::new("java.base")
        .exports("java/lang")
        .exports("java/util")
        .package("jdk/internal/misc")
        .build();

    let module = parse_module_info_class(&bytes).unwrap();
    assert_eq!(module.name, "java.base");
    assert_eq!(module.exports, vec!["java.lang".to_string(), "java.util".to_string()]);
    assert!(module.contains_package("java.lang"));
    assert!(module.contains_package("jdk.internal.misc"));
    assert!(!module.contains_package("com.acme"));
}
