use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("package.json not found in {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("Invalid package.json at {}: {source}", .path.display())]
    InvalidManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Project name not found. Add a name to package.json or pass it as an argument")]
    ProjectNameMissing,

    #[error("Current branch not found in {}. Run inside a git repository or pass the branch as an argument", .0.display())]
    BranchNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
