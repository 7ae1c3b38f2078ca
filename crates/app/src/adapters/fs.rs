use repodeck_core::ports::PathProbe;
use std::path::Path;

/// Answers existence checks against the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProbe;

impl PathProbe for OsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
