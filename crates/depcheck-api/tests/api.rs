use std::sync::Arc;

use depcheck_api::{ArtifactUsage, ClassResolver, MethodSignature, PlatformResolver, ProvidedApiRegistry};
use depcheck_classfile::access::{ACC_PRIVATE, ACC_PUBLIC};
use depcheck_jdk::JdkIndex;
use depcheck_test_utils::{write_jmod, Call, ClassBuilder, JarBuilder, ModuleInfoBuilder};
use tempfile::TempDir;

fn platform(tmp: &TempDir) -> Arc<PlatformResolver> {
    let jmods = tmp.path().join("jmods");
    std::fs::create_dir_all(&jmods).unwrap();
    write_jmod(
        &jmods.join("java.base.jmod"),
        &ModuleInfoBuilder::new("java.base").exports("java/lang").exports("java/util"),
        &[
            ClassBuilder::new("java/lang/Object")
                .no_super_class()
                .method(ACC_PUBLIC, "<init>", "()V")
                .method(ACC_PUBLIC, "toString", "()Ljava/lang/String;"),
            ClassBuilder::interface("java/lang/Runnable").method(0x0401, "run", "()V"),
        ],
    );
    write_jmod(
        &jmods.join("java.logging.jmod"),
        &ModuleInfoBuilder::new("java.logging").exports("java/util/logging"),
        &[ClassBuilder::new("java/util/logging/Logger")],
    );
    Arc::new(PlatformResolver::new(JdkIndex::from_jmods_dir(&jmods).unwrap()))
}

#[test]
fn provided_api_of_a_jar_includes_platform_inherited_methods() {
    let tmp = TempDir::new().unwrap();
    let platform = platform(&tmp);
    let jar = tmp.path().join("acme.jar");
    JarBuilder::new()
        .class(
            &ClassBuilder::new("com/acme/A")
                .method(ACC_PUBLIC, "<init>", "()V")
                .method(ACC_PUBLIC, "foo", "()V")
                .method(ACC_PRIVATE, "secret", "()V"),
        )
        .class(
            &ClassBuilder::new("com/acme/B")
                .super_class("com/acme/A")
                .implements("java/lang/Runnable")
                .method(ACC_PUBLIC, "run", "()V"),
        )
        .write(&jar);

    let registry = ProvidedApiRegistry::analyze(&jar, platform.clone()).unwrap();
    let provided = registry.provides();
    let sig = |class: &str, name: &str, desc: &str| MethodSignature::new(class, name, desc);

    assert!(provided.contains(&sig("com.acme.B", "foo", "()V")));
    assert!(provided.contains(&sig("com.acme.B", "toString", "()Ljava/lang/String;")));
    assert!(provided.contains(&sig("com.acme.A", "toString", "()Ljava/lang/String;")));
    assert!(provided.contains(&sig("com.acme.A", "<init>", "()V")));
    assert!(!provided.contains(&sig("com.acme.B", "<init>", "()V")));
    assert!(!provided.contains(&sig("com.acme.A", "secret", "()V")));
    assert!(!provided.contains(&sig("com.acme.B", "secret", "()V")));
    assert!(provided.iter().all(|s| s.class_name().starts_with("com.acme.")));

    // The registry itself only answers for its own classes.
    assert!(registry.resolve("java.lang.Object").is_none());
    assert!(registry.resolver().resolve("java.lang.Object").is_some());
}

#[test]
fn used_api_never_contains_platform_calls() {
    let tmp = TempDir::new().unwrap();
    let platform = platform(&tmp);
    let app = tmp.path().join("app");
    JarBuilder::new()
        .class(&ClassBuilder::new("com/app/Main").method_calling(
            ACC_PUBLIC,
            "main",
            "()V",
            &[
                Call::invokespecial("java/lang/Object", "<init>", "()V"),
                Call::invokestatic("java/util/logging/Logger", "getLogger", "(Ljava/lang/String;)Ljava/util/logging/Logger;"),
                Call::invokevirtual("[Ljava/lang/String;", "clone", "()Ljava/lang/Object;"),
                Call::invokevirtual("com/acme/Foo", "bar", "(I)V"),
            ],
        ))
        .entry("com/app/package-info.class", vec![0x00])
        .write_dir(&app);

    let usage = ArtifactUsage::analyze(&app, |name| platform.is_platform_class(name)).unwrap();
    let used: Vec<String> = usage.signatures().map(MethodSignature::id).collect();
    assert_eq!(used, vec!["com.acme.Foo#bar(I)V".to_string()]);
    assert!(usage
        .signatures()
        .all(|sig| !platform.is_platform_class(sig.class_name())));
}
