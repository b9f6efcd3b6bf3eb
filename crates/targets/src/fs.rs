//! Filesystem helpers shared by the target adapters.

use std::path::Path;

use vibes_common::{Error, Result};

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Create `dir` and its parents, group/world readable.
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io_at(dir, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(DIR_MODE))
            .map_err(|e| Error::io_at(dir, e))?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_file_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE))
        .map_err(|e| Error::io_at(path, e))
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path) -> Result<()> {
    Ok(())
}

pub(crate) fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| Error::io_at(path, e))?;
    set_file_mode(path)
}

pub(crate) fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    std::fs::copy(src, dst).map_err(|e| Error::io_at(src, e))?;
    set_file_mode(dst)
}

pub(crate) fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir(dst)?;
    for entry in std::fs::read_dir(src).map_err(|e| Error::io_at(src, e))? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let dest_path = dst.join(entry.file_name());
        if ty.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_path)?;
        } else {
            copy_file(&entry.path(), &dest_path)?;
        }
    }
    Ok(())
}

/// Whether anything (including a dangling symlink) occupies `path`.
pub(crate) fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Remove whatever occupies `path`. Symlinks are unlinked, not followed.
pub(crate) fn remove_existing(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| Error::io_at(path, e))
}

/// Symlink `dst` to `src`. Returns `false` when the platform has no
/// symlinks, in which case the caller copies instead.
#[cfg(unix)]
pub(crate) fn symlink(src: &Path, dst: &Path) -> Result<bool> {
    let src = std::path::absolute(src).map_err(|e| Error::io_at(src, e))?;
    std::os::unix::fs::symlink(&src, dst).map_err(|e| Error::io_at(dst, e))?;
    Ok(true)
}

#[cfg(not(unix))]
pub(crate) fn symlink(_src: &Path, _dst: &Path) -> Result<bool> {
    Ok(false)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_dir_recursive_copies_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("a.md"), "a").unwrap();
        std::fs::write(src.join("nested/b.md"), "b").unwrap();

        let dst = tmp.path().join("dst");
        copy_dir_recursive(&src, &dst).unwrap();
        assert_eq!(std::fs::read_to_string(dst.join("a.md")).unwrap(), "a");
        assert_eq!(std::fs::read_to_string(dst.join("nested/b.md")).unwrap(), "b");
    }

    #[cfg(unix)]
    #[test]
    fn remove_existing_unlinks_symlink_without_touching_target() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("target");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("keep.md"), "keep").unwrap();
        let link = tmp.path().join("link");
        assert!(symlink(&target, &link).unwrap());

        assert!(occupied(&link));
        remove_existing(&link).unwrap();
        assert!(!occupied(&link));
        assert!(target.join("keep.md").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn written_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f.md");
        write_file(&path, b"x").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
