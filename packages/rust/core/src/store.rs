//! Document storage: whole-document reads and atomic overwrites.

use std::path::Path;

use tracing::debug;

use pagepatch_shared::{PagePatchError, Result};

/// Where documents are read from and written back to.
///
/// Implementations must never leave a document half-written.
pub trait DocumentStore: Send + Sync {
    /// Read the whole document.
    fn read(&self, path: &Path) -> std::io::Result<String>;

    /// Replace the whole document with `text`.
    fn write(&self, path: &Path, text: &str) -> Result<()>;
}

/// Local filesystem store. Writes go to a sibling temp file that is then
/// renamed over the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl DocumentStore for FsStore {
    fn read(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, text: &str) -> Result<()> {
        write_atomic(path, text.as_bytes())
    }
}

/// Write `bytes` to `.{name}.tmp` next to `path`, then rename it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PagePatchError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{name}.tmp"));

    if let Err(e) = std::fs::write(&temp, bytes) {
        let _ = std::fs::remove_file(&temp);
        return Err(PagePatchError::write(path, e));
    }

    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(PagePatchError::write(path, e));
    }

    debug!(path = %path.display(), size = bytes.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pp-store-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn write_replaces_whole_document() {
        let tmp = temp_dir();
        let path = tmp.join("About.jsx");
        std::fs::write(&path, "old old old old").unwrap();

        FsStore.write(&path, "new").unwrap();

        assert_eq!(FsStore.read(&path).unwrap(), "new");
        assert!(!tmp.join(".About.jsx.tmp").exists());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_into_missing_directory_fails_cleanly() {
        let tmp = temp_dir();
        let path = tmp.join("missing").join("About.jsx");

        let err = FsStore.write(&path, "x").unwrap_err();
        assert!(err.is_write_failure());
        let message = err.to_string();
        assert!(message.contains(&path.display().to_string()), "{message}");
        assert!(!message.contains(".About.jsx.tmp"), "{message}");
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rename_failure_keeps_original() {
        let tmp = temp_dir();
        // A directory at the target path makes the rename fail.
        let path = tmp.join("Contact.jsx");
        std::fs::create_dir_all(path.join("child")).unwrap();

        let err = FsStore.write(&path, "x").unwrap_err();
        assert!(err.is_write_failure());
        assert!(path.is_dir());
        assert!(!tmp.join(".Contact.jsx.tmp").exists());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn read_missing_document_is_not_found() {
        let tmp = temp_dir();
        let err = FsStore.read(&tmp.join("Nope.jsx")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
