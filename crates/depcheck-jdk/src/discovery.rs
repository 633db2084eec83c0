use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

/// Where a [`JdkInstallation`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JdkSource {
    /// Passed in by the caller (`--jdk-home`, `[jdk] home`).
    Explicit,
    JavaHome,
    JavaOnPath,
}

/// A JDK image with a `jmods/` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JdkInstallation {
    root: PathBuf,
    source: JdkSource,
}

#[derive(Debug, Error)]
pub enum JdkDiscoveryError {
    #[error("could not discover a JDK installation (tried JAVA_HOME and `java` on PATH)")]
    NotFound,

    #[error("JDK root `{root}` does not contain a `jmods/` directory")]
    MissingJmodsDir { root: PathBuf },
}

impl JdkInstallation {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn jmods_dir(&self) -> PathBuf {
        self.root.join("jmods")
    }

    pub fn source(&self) -> JdkSource {
        self.source
    }

    pub fn from_root(root: impl AsRef<Path>) -> Result<Self, JdkDiscoveryError> {
        let root = root.as_ref();
        if !root.join("jmods").is_dir() {
            return Err(JdkDiscoveryError::MissingJmodsDir {
                root: root.to_path_buf(),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
            source: JdkSource::Explicit,
        })
    }

    /// Find the JDK used to resolve platform classes.
    ///
    /// `home` wins when given and must be a JDK (or its `jre/` directory).
    /// Otherwise `JAVA_HOME` is tried, then the `java` found on `PATH`.
    pub fn discover(home: Option<&Path>) -> Result<Self, JdkDiscoveryError> {
        if let Some(home) = home {
            let root = jdk_root_near(home).unwrap_or_else(|| home.to_path_buf());
            return Self::from_root(root);
        }

        let sources: [(JdkSource, fn() -> Option<PathBuf>); 2] = [
            (JdkSource::JavaHome, java_home_root),
            (JdkSource::JavaOnPath, java_on_path_root),
        ];
        for (source, find) in sources {
            if let Some(root) = find() {
                tracing::debug!(target: "depcheck.jdk", ?source, root = %root.display(), "discovered JDK");
                return Ok(Self { root, source });
            }
        }
        Err(JdkDiscoveryError::NotFound)
    }
}

/// `dir` or its parent, whichever has `jmods/`. `java.home` points at
/// `$JDK/jre` on older layouts.
fn jdk_root_near(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .take(2)
        .find(|candidate| candidate.join("jmods").is_dir())
        .map(Path::to_path_buf)
}

fn java_home_root() -> Option<PathBuf> {
    let home = std::env::var_os("JAVA_HOME").filter(|v| !v.is_empty())?;
    jdk_root_near(Path::new(&home))
}

fn java_on_path_root() -> Option<PathBuf> {
    let exe = if cfg!(windows) { "java.exe" } else { "java" };
    let path = std::env::var_os("PATH")?;
    let java = std::env::split_paths(&path)
        .map(|dir| dir.join(exe))
        .find(|candidate| candidate.is_file())?;

    reported_java_home(&java)
        .and_then(|home| jdk_root_near(&home))
        .or_else(|| {
            // `$JDK/bin/java`, usually behind alternatives symlinks.
            let resolved = java.canonicalize().ok()?;
            jdk_root_near(resolved.parent()?.parent()?)
        })
}

/// `java.home` as printed by `java -XshowSettings:properties`.
fn reported_java_home(java: &Path) -> Option<PathBuf> {
    let output = Command::new(java)
        .args(["-XshowSettings:properties", "-version"])
        .output()
        .ok()?;

    // HotSpot prints the settings on stderr.
    let home = [&output.stderr, &output.stdout].into_iter().find_map(|bytes| {
        String::from_utf8_lossy(bytes).lines().find_map(|line| {
            let (key, value) = line.split_once('=')?;
            (key.trim() == "java.home").then(|| PathBuf::from(value.trim()))
        })
    });
    home
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jre_directory_resolves_to_its_jdk() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("jmods")).unwrap();
        let jre = tmp.path().join("jre");
        std::fs::create_dir_all(&jre).unwrap();

        assert_eq!(jdk_root_near(tmp.path()).as_deref(), Some(tmp.path()));
        assert_eq!(jdk_root_near(&jre).as_deref(), Some(tmp.path()));
        assert_eq!(jdk_root_near(&jre.join("lib")), None);
    }

    #[cfg(unix)]
    #[test]
    fn reads_java_home_from_the_launcher_settings() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let java = tmp.path().join("java");
        std::fs::write(
            &java,
            "#!/bin/sh\necho 'Property settings:' >&2\necho '    java.home = /opt/jdk-21' >&2\n",
        )
        .unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(reported_java_home(&java), Some(PathBuf::from("/opt/jdk-21")));
        assert_eq!(reported_java_home(&tmp.path().join("missing")), None);
    }

    #[test]
    fn explicit_home_must_have_jmods() {
        let tmp = tempfile::tempdir().unwrap();
        let err = JdkInstallation::discover(Some(tmp.path())).unwrap_err();
        assert!(matches!(err, JdkDiscoveryError::MissingJmodsDir { .. }));

        std::fs::create_dir_all(tmp.path().join("jmods")).unwrap();
        let install = JdkInstallation::discover(Some(tmp.path())).unwrap();
        assert_eq!(install.source(), JdkSource::Explicit);
    }
}
