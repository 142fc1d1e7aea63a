//! Per-attempt scratch directories.
//!
//! Each execution attempt owns exactly one directory, named with a fresh
//! UUID so concurrent attempts can never collide, and removed on drop on
//! every exit path. No locks; unique naming is the whole coordination
//! story.

use std::io;
use std::path::Path;

use tempfile::TempDir;
use uuid::Uuid;

#[derive(Debug)]
pub(crate) struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub(crate) fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("crucible-{}-", Uuid::new_v4()))
            .tempdir()?;
        Ok(Scratch { dir })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_removed_on_drop() {
        let scratch = Scratch::new().unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(path.join("solution.py"), "print(1)").unwrap();
        assert!(path.is_dir());
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn attempts_never_share_a_directory() {
        let a = Scratch::new().unwrap();
        let b = Scratch::new().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
