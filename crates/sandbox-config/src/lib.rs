pub mod error;
pub mod git;

pub use error::*;
pub use git::current_branch;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Project metadata file read from the project directory
pub const MANIFEST_FILE: &str = "package.json";

/// `srcDir` value meaning "the project directory itself"
const CURRENT_DIR: &str = ".";

/// The `sandbox` block of `package.json`
///
/// ```json
/// { "sandbox": { "srcDir": "dist", "prefix": "app/" } }
/// ```
///
/// Both keys are optional. Without `srcDir` there is nothing to deploy;
/// without `prefix` objects are uploaded at the bucket root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SandboxSettings {
    #[serde(rename = "srcDir", default)]
    pub src_dir: Option<String>,

    #[serde(default)]
    pub prefix: Option<String>,
}

impl SandboxSettings {
    /// Source directory resolved against `project_dir`
    pub fn src_dir(&self, project_dir: &Path) -> Option<PathBuf> {
        match self.src_dir.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(CURRENT_DIR) => Some(project_dir.to_path_buf()),
            Some(dir) => Some(project_dir.join(dir)),
        }
    }

    /// Key prefix for uploaded objects
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or_default()
    }

    /// Replace fields with values given on the command line or environment
    pub fn with_overrides(mut self, src_dir: Option<String>, prefix: Option<String>) -> Self {
        if src_dir.is_some() {
            self.src_dir = src_dir;
        }
        if prefix.is_some() {
            self.prefix = prefix;
        }
        self
    }
}

/// The fields of `package.json` this tool reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub sandbox: Option<SandboxSettings>,
}

/// Read `package.json` from `project_dir`; `Ok(None)` when there is none
pub fn load_manifest(project_dir: &Path) -> Result<Option<ProjectManifest>> {
    let path = project_dir.join(MANIFEST_FILE);
    if !path.is_file() {
        debug!(path = %path.display(), "No manifest");
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let manifest = serde_json::from_str(&contents)
        .map_err(|source| ConfigError::InvalidManifest { path, source })?;
    Ok(Some(manifest))
}

/// Everything one invocation needs to know about the project, read once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub dir: PathBuf,
    pub name: String,
    pub branch: String,
    pub settings: SandboxSettings,
}

impl Project {
    /// Resolve the project for `dir`
    ///
    /// Explicit `name`/`branch` arguments win over `package.json` and the
    /// checked-out branch. A broken manifest is tolerated when the name is
    /// given explicitly.
    pub fn load(dir: &Path, name: Option<String>, branch: Option<String>) -> Result<Self> {
        let manifest = match load_manifest(dir) {
            Ok(Some(manifest)) => manifest,
            Ok(None) if name.is_none() => {
                return Err(ConfigError::ManifestNotFound(dir.to_path_buf()));
            }
            Ok(None) => ProjectManifest::default(),
            Err(e) if name.is_some() => {
                warn!(error = %e, "Ignoring unreadable manifest");
                ProjectManifest::default()
            }
            Err(e) => return Err(e),
        };

        let name = name
            .or(manifest.name)
            .filter(|n| !n.trim().is_empty())
            .ok_or(ConfigError::ProjectNameMissing)?;
        let branch = branch
            .or_else(|| git::current_branch(dir))
            .ok_or_else(|| ConfigError::BranchNotFound(dir.to_path_buf()))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            name,
            branch,
            settings: manifest.sandbox.unwrap_or_default(),
        })
    }

    /// Source directory resolved against the project directory
    pub fn src_dir(&self) -> Option<PathBuf> {
        self.settings.src_dir(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn project_dir(manifest: &str, head: Option<&str>) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
        if let Some(head) = head {
            fs::create_dir(dir.path().join(".git")).unwrap();
            fs::write(dir.path().join(".git/HEAD"), head).unwrap();
        }
        dir
    }

    #[test]
    fn test_load_manifest_with_settings() {
        let dir = project_dir(
            r#"{"name": "acme-web", "version": "1.0.0", "sandbox": {"srcDir": "dist", "prefix": "app/"}}"#,
            None,
        );

        let manifest = load_manifest(dir.path()).unwrap().unwrap();

        assert_eq!(manifest.name.as_deref(), Some("acme-web"));
        let settings = manifest.sandbox.unwrap();
        assert_eq!(settings.src_dir(dir.path()), Some(dir.path().join("dist")));
        assert_eq!(settings.prefix(), "app/");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = SandboxSettings::default();
        assert_eq!(settings.src_dir(Path::new("/project")), None);
        assert_eq!(settings.prefix(), "");

        let settings: SandboxSettings = serde_json::from_str(r#"{"srcDir": ""}"#).unwrap();
        assert_eq!(settings.src_dir(Path::new("/project")), None);
    }

    #[test]
    fn test_settings_current_dir() {
        let settings = SandboxSettings {
            src_dir: Some(".".to_string()),
            prefix: None,
        };
        assert_eq!(
            settings.src_dir(Path::new("/project")),
            Some(PathBuf::from("/project"))
        );
    }

    #[test]
    fn test_settings_overrides() {
        let settings = SandboxSettings {
            src_dir: Some("dist".to_string()),
            prefix: Some("app/".to_string()),
        }
        .with_overrides(Some("build".to_string()), None);

        assert_eq!(settings.src_dir.as_deref(), Some("build"));
        assert_eq!(settings.prefix(), "app/");
    }

    #[test]
    fn test_load_manifest_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_manifest(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_load_manifest_invalid() {
        let dir = project_dir("{ not json", None);
        assert!(matches!(
            load_manifest(dir.path()),
            Err(ConfigError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_project_from_manifest_and_git() {
        let dir = project_dir(
            r#"{"name": "My App", "sandbox": {"srcDir": "build"}}"#,
            Some("ref: refs/heads/feature/login\n"),
        );

        let project = Project::load(dir.path(), None, None).unwrap();

        assert_eq!(project.name, "My App");
        assert_eq!(project.branch, "feature/login");
        assert_eq!(project.src_dir(), Some(dir.path().join("build")));
    }

    #[test]
    fn test_project_arguments_win() {
        let dir = project_dir(
            r#"{"name": "acme"}"#,
            Some("ref: refs/heads/main\n"),
        );

        let project = Project::load(
            dir.path(),
            Some("other".to_string()),
            Some("release".to_string()),
        )
        .unwrap();

        assert_eq!(project.name, "other");
        assert_eq!(project.branch, "release");
    }

    #[test]
    fn test_project_tolerates_broken_manifest_with_name() {
        let dir = project_dir("{ not json", None);

        let project =
            Project::load(dir.path(), Some("acme".to_string()), Some("main".to_string()))
                .unwrap();

        assert_eq!(project.settings, SandboxSettings::default());
    }

    #[test]
    fn test_project_requires_name() {
        let dir = project_dir(r#"{"version": "1.0.0"}"#, None);
        assert!(matches!(
            Project::load(dir.path(), None, Some("main".to_string())),
            Err(ConfigError::ProjectNameMissing)
        ));
    }

    #[test]
    fn test_project_requires_manifest_without_name() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Project::load(dir.path(), None, Some("main".to_string())),
            Err(ConfigError::ManifestNotFound(_))
        ));

        let project =
            Project::load(dir.path(), Some("acme".to_string()), Some("main".to_string()))
                .unwrap();
        assert_eq!(project.name, "acme");
    }

    #[test]
    fn test_project_requires_branch() {
        let dir = project_dir(r#"{"name": "acme"}"#, None);
        if git::find_git_dir(dir.path()).is_none() {
            assert!(matches!(
                Project::load(dir.path(), None, None),
                Err(ConfigError::BranchNotFound(_))
            ));
        }
    }

    #[test]
    #[serial]
    fn test_project_from_current_dir() {
        let dir = project_dir(
            r#"{"name": "acme", "sandbox": {"srcDir": "."}}"#,
            Some("ref: refs/heads/main\n"),
        );
        let original_dir = std::env::current_dir().unwrap();

        std::env::set_current_dir(dir.path()).unwrap();
        let result = Project::load(Path::new("."), None, None);
        std::env::set_current_dir(original_dir).unwrap();

        let project = result.unwrap();
        assert_eq!(project.name, "acme");
        assert_eq!(project.branch, "main");
        assert_eq!(project.src_dir(), Some(PathBuf::from(".")));
    }
}
