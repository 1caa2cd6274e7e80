//! Error types for the registry loader.

/// Errors that can occur while loading or watching the registry file.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Registry content is well-formed but inconsistent (duplicate ids, bad radius).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
