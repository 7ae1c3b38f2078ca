use std::path::Path;

/// Filesystem existence checks
pub trait PathProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}
