use std::path::PathBuf;

use depcheck_config::{discover_config_path, load_for_dir, ConfigError, DepcheckConfig, DEPCHECK_CONFIG_ENV_VAR};
use depcheck_test_utils::{env_lock, EnvVarGuard};
use tempfile::tempdir;

#[test]
fn loads_and_rebases_relative_paths() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("depcheck.toml");
    std::fs::write(
        &path,
        r#"
repositories = ["target/repository", "/abs/repo"]

[logging]
level = "debug"
json = true

[jdk]
home = "jdk"

[check]
verbose = true
fail_on_problems = false
report = "target/depcheck.md"
"#,
    )
    .unwrap();

    let config = DepcheckConfig::load_from_path(&path).unwrap();
    assert_eq!(
        config.repositories,
        vec![dir.path().join("target/repository"), PathBuf::from("/abs/repo")]
    );
    assert_eq!(config.jdk.home, Some(dir.path().join("jdk")));
    assert_eq!(config.check.report, Some(dir.path().join("target/depcheck.md")));
    assert!(config.check.verbose);
    assert!(!config.check.fail_on_problems);
    assert!(!config.check.apply_suggestions);
    assert!(config.logging.json);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn parse_errors_name_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("depcheck.toml");
    std::fs::write(&path, "[check]\nverbose = \"yes\"\n").unwrap();

    let err = DepcheckConfig::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Toml { .. }));
    assert!(err.to_string().contains("depcheck.toml"));

    let missing = DepcheckConfig::load_from_path(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
}

#[test]
fn discovers_config_files() {
    let _lock = env_lock();
    let _env = EnvVarGuard::unset(DEPCHECK_CONFIG_ENV_VAR);
    let dir = tempdir().unwrap();

    assert_eq!(discover_config_path(dir.path()), None);
    let (config, path) = load_for_dir(dir.path()).unwrap();
    assert_eq!(config, DepcheckConfig::default());
    assert_eq!(path, None);

    std::fs::write(dir.path().join(".depcheck.toml"), "").unwrap();
    assert_eq!(discover_config_path(dir.path()), Some(dir.path().join(".depcheck.toml")));

    std::fs::write(dir.path().join("depcheck.toml"), "").unwrap();
    assert_eq!(discover_config_path(dir.path()), Some(dir.path().join("depcheck.toml")));
}

#[test]
fn env_var_overrides_discovery() {
    let _lock = env_lock();
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("depcheck.toml"), "").unwrap();

    let _env = EnvVarGuard::set(DEPCHECK_CONFIG_ENV_VAR, "custom.toml");
    assert_eq!(discover_config_path(dir.path()), Some(dir.path().join("custom.toml")));
}
