use std::path::Path;

use depcheck_classfile::ClassFile;
use depcheck_jdk::{JdkDiscoveryError, JdkIndex, JdkIndexError, JdkInstallation, JdkSource};
use depcheck_test_utils::{env_lock, write_jmod, ClassBuilder, EnvVarGuard, ModuleInfoBuilder};
use tempfile::tempdir;

fn fake_jdk(root: &Path) {
    let jmods = root.join("jmods");
    std::fs::create_dir_all(&jmods).unwrap();
    write_jmod(
        &jmods.join("java.base.jmod"),
        &ModuleInfoBuilder::new("java.base")
            .exports("java/lang")
            .exports("java/util"),
        &[
            ClassBuilder::new("java/lang/Object").no_super_class(),
            ClassBuilder::interface("java/util/List").method(0x0401, "size", "()I"),
        ],
    );
    write_jmod(
        &jmods.join("java.sql.jmod"),
        &ModuleInfoBuilder::new("java.sql").exports("java/sql"),
        &[ClassBuilder::interface("java/sql/Connection")],
    );
}

#[test]
fn indexes_packages_and_loads_classes() {
    let tmp = tempdir().unwrap();
    fake_jdk(tmp.path());

    let index = JdkIndex::from_jdk_root(tmp.path()).unwrap();
    assert_eq!(index.module_names().collect::<Vec<_>>(), vec!["java.base", "java.sql"]);
    assert!(index.is_platform_package("java.util"));
    assert!(index.is_platform_package("java.sql"));
    assert!(!index.is_platform_package("com.acme"));
    assert_eq!(index.modules_for_package("java.sql"), vec!["java.sql"]);

    let bytes = index.class_bytes("java.util.List").unwrap().unwrap();
    let class = ClassFile::parse(&bytes).unwrap();
    assert_eq!(class.this_class, "java/util/List");
    assert_eq!(class.methods[0].name, "size");

    assert!(index.class_bytes("java.util.Missing").unwrap().is_none());
    assert!(index.class_bytes("com.acme.Foo").unwrap().is_none());
}

#[test]
fn root_without_jmods_is_rejected() {
    let tmp = tempdir().unwrap();
    let err = JdkIndex::from_jdk_root(tmp.path()).unwrap_err();
    assert!(matches!(
        err,
        JdkIndexError::Discovery(JdkDiscoveryError::MissingJmodsDir { .. })
    ));
}

#[test]
fn explicit_home_wins_over_environment() {
    let _lock = env_lock();
    let env_jdk = tempdir().unwrap();
    fake_jdk(env_jdk.path());
    let explicit = tempdir().unwrap();
    fake_jdk(explicit.path());

    let _java_home = EnvVarGuard::set("JAVA_HOME", env_jdk.path());
    let install = JdkInstallation::discover(Some(explicit.path())).unwrap();
    assert_eq!(install.root(), explicit.path());
}

#[test]
fn discovers_from_java_home() {
    let _lock = env_lock();
    let jdk = tempdir().unwrap();
    fake_jdk(jdk.path());

    let _java_home = EnvVarGuard::set("JAVA_HOME", jdk.path());
    let install = JdkInstallation::discover(None).unwrap();
    assert_eq!(install.jmods_dir(), jdk.path().join("jmods"));
    assert_eq!(install.source(), JdkSource::JavaHome);
}

#[test]
fn java_home_pointing_at_jre_is_coerced() {
    let _lock = env_lock();
    let jdk = tempdir().unwrap();
    fake_jdk(jdk.path());
    let jre = jdk.path().join("jre");
    std::fs::create_dir_all(&jre).unwrap();

    let _java_home = EnvVarGuard::set("JAVA_HOME", &jre);
    let install = JdkInstallation::discover(None).unwrap();
    assert_eq!(install.root(), jdk.path());
}

#[test]
fn nothing_to_discover() {
    let _lock = env_lock();
    let empty = tempdir().unwrap();
    let _java_home = EnvVarGuard::unset("JAVA_HOME");
    let _path = EnvVarGuard::set("PATH", empty.path());

    let err = JdkInstallation::discover(None).unwrap_err();
    assert!(matches!(err, JdkDiscoveryError::NotFound));
}
