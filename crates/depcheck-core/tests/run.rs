use std::path::Path;

use depcheck_classfile::access::ACC_PUBLIC;
use depcheck_core::{run_check, CheckError, CheckOptions};
use depcheck_osgi::Manifest;
use depcheck_test_utils::{bundle_manifest, write_jmod, Call, ClassBuilder, JarBuilder, ModuleInfoBuilder};
use tempfile::TempDir;

fn fake_jdk(root: &Path) {
    let jmods = root.join("jmods");
    std::fs::create_dir_all(&jmods).unwrap();
    write_jmod(
        &jmods.join("java.base.jmod"),
        &ModuleInfoBuilder::new("java.base").exports("java/lang"),
        &[ClassBuilder::new("java/lang/Object")
            .no_super_class()
            .method(ACC_PUBLIC, "<init>", "()V")
            .method(ACC_PUBLIC, "hashCode", "()I")],
    );
}

fn write_library(repository: &Path, version: &str, methods: &[&str]) {
    let mut widget = ClassBuilder::new("org/lib/Widget");
    for method in methods {
        widget = widget.method(ACC_PUBLIC, method, "()V");
    }
    JarBuilder::new()
        .manifest(bundle_manifest(
            "org.lib",
            version,
            &[("Export-Package", format!("org.lib;version=\"{version}\"").as_str())],
        ))
        .class(&widget)
        .write(&repository.join(format!("org.lib-{version}.jar")));
}

fn write_app(dir: &Path, import: &str) {
    JarBuilder::new()
        .manifest(bundle_manifest("com.app", "1.0.0", &[("Import-Package", import)]))
        .class(&ClassBuilder::new("com/app/Main").method_calling(
            ACC_PUBLIC,
            "main",
            "()V",
            &[
                Call::invokevirtual("org/lib/Widget", "draw", "()V"),
                // Inherited from the platform, present in every version.
                Call::invokevirtual("org/lib/Widget", "hashCode", "()I"),
                Call::invokevirtual("java/lang/Object", "hashCode", "()I"),
            ],
        ))
        .write_dir(dir);
}

#[test]
fn checks_a_class_directory_and_rewrites_its_manifest() {
    let tmp = TempDir::new().unwrap();
    fake_jdk(&tmp.path().join("jdk"));
    let repository = tmp.path().join("repo");
    std::fs::create_dir_all(&repository).unwrap();
    write_library(&repository, "1.0.0", &[]);
    write_library(&repository, "1.2.0", &["draw"]);
    write_library(&repository, "1.3.0", &["draw"]);
    let app = tmp.path().join("app");
    write_app(&app, "org.lib;version=\"[1.0,2)\"");

    let outcome = run_check(&CheckOptions {
        artifact: app.clone(),
        repositories: vec![repository],
        jdk_home: Some(tmp.path().join("jdk")),
        verbose: false,
        apply_suggestions: true,
        manifest: None,
    })
    .unwrap();

    let problems = outcome.report.problems();
    assert_eq!(problems.len(), 1, "{problems:#?}");
    assert_eq!(problems[0].key.to_string(), "org.lib_1.0.0");
    assert!(problems[0].message.ends_with("missing the method `org.lib.Widget#draw`"));
    assert_eq!(
        outcome.report.suggestions()[0].to_string(),
        "Suggested lower version for package `org.lib` is `1.2.0` out of [1.0.0, 1.2.0, 1.3.0]"
    );

    let manifest_path = app.join("META-INF/MANIFEST.MF");
    assert_eq!(outcome.manifest_updated.as_deref(), Some(manifest_path.as_path()));
    let manifest = Manifest::read_file(&manifest_path).unwrap();
    assert_eq!(manifest.get("Import-Package"), Some("org.lib;version=\"[1.2.0,2.0.0)\""));
    assert_eq!(manifest.get("Bundle-SymbolicName"), Some("com.app"));
}

#[test]
fn clean_artifact_has_an_empty_report() {
    let tmp = TempDir::new().unwrap();
    fake_jdk(&tmp.path().join("jdk"));
    let repository = tmp.path().join("repo");
    std::fs::create_dir_all(&repository).unwrap();
    write_library(&repository, "1.2.0", &["draw"]);
    let app = tmp.path().join("app");
    write_app(&app, "org.lib;version=\"[1.2,2)\"");

    let outcome = run_check(&CheckOptions {
        artifact: app,
        repositories: vec![repository],
        jdk_home: Some(tmp.path().join("jdk")),
        ..CheckOptions::default()
    })
    .unwrap();

    assert!(outcome.report.is_clean());
    assert!(outcome.report.suggestions().is_empty());
    assert_eq!(outcome.manifest_updated, None);
}

#[test]
fn fatal_errors_abort_the_run() {
    let tmp = TempDir::new().unwrap();
    let app = tmp.path().join("app");
    write_app(&app, "org.lib;version=\"[1.0,2.0\"");

    let err = run_check(&CheckOptions {
        artifact: app.clone(),
        jdk_home: Some(tmp.path().join("no-jdk")),
        ..CheckOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, CheckError::Manifest(_)), "{err}");

    let jar = tmp.path().join("app.jar");
    JarBuilder::new()
        .manifest(bundle_manifest("com.app", "1.0.0", &[]))
        .write(&jar);
    let err = run_check(&CheckOptions {
        artifact: jar,
        apply_suggestions: true,
        ..CheckOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, CheckError::ManifestInJar { .. }), "{err}");

    write_app(&app, "org.lib");
    let err = run_check(&CheckOptions {
        artifact: app,
        repositories: vec![tmp.path().join("missing-repo")],
        jdk_home: Some(tmp.path().join("no-jdk")),
        ..CheckOptions::default()
    })
    .unwrap_err();
    assert!(matches!(err, CheckError::Repository { .. }), "{err}");
}
