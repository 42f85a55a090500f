//! Single-file cache helpers.
//!
//! Every cache in this crate is one small file. Writers go through
//! [`write_atomic`] so a concurrent reader either sees the previous file or
//! the complete new one, never a partial write.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Write `data` to `path` by filling a temp file in the same directory and
/// renaming it over the destination.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "cache path has no parent"))?;
    create_private_dir(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(parent)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    // Dropping the temp file on error removes it.
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a cache file, treating any failure as "no cache".
pub fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(b) => Some(b),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::debug!("read {}: {e}", path.display());
            }
            None
        }
    }
}

/// Remove a cache file. Missing files and errors are ignored.
pub fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!("remove {}: {e}", path.display());
    }
}

fn create_private_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)
    }
}
