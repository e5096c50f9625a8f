//! Replacing the executable on disk with a downloaded build.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{Result, TpixError};

/// How the staged binary takes the place of the running one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStrategy {
    /// Move the running executable to `<name>.old`, then move the new one in.
    /// For platforms that lock the file of a running program.
    RenameAside,
    /// Unlink the running executable and rename the new one over it,
    /// copying when a rename is not possible.
    Overwrite,
}

/// Install `staged` at `target` using `strategy`
pub fn install_binary(staged: &Path, target: &Path, strategy: InstallStrategy) -> Result<()> {
    ensure_executable(staged)?;

    match strategy {
        InstallStrategy::RenameAside => rename_aside(staged, target),
        InstallStrategy::Overwrite => overwrite(staged, target),
    }?;

    log::info!("Installed new binary at {}", target.display());
    Ok(())
}

/// Sibling path the old executable is kept at during a rename-aside install
pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".old");
    target.with_file_name(name)
}

/// Find the file called `name` anywhere below `dir`
pub fn find_binary(dir: &Path, name: &str) -> Result<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name() == name)
        .map(|entry| entry.into_path())
        .ok_or_else(|| TpixError::InvalidArchive(format!("{} not found in release archive", name)))
}

#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn ensure_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn rename_aside(staged: &Path, target: &Path) -> Result<()> {
    let backup = backup_path(target);

    remove_if_exists(&backup)?;
    match fs::rename(target, &backup) {
        Ok(()) => log::debug!("Moved {} to {}", target.display(), backup.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    move_file(staged, target).map_err(|e| {
        log::warn!(
            "Installing the new binary failed; the previous one is at {}",
            backup.display()
        );
        e
    })
}

fn overwrite(staged: &Path, target: &Path) -> Result<()> {
    remove_if_exists(target)?;
    move_file(staged, target)
}

/// Rename, falling back to a read-then-write copy across filesystems
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Err(e) = fs::rename(from, to) {
        log::debug!("Rename failed ({}), copying instead", e);
        copy_file(from, to)?;
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let content = fs::read(from)?;
    fs::write(to, content)?;
    ensure_executable(to)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(temp: &TempDir) -> (PathBuf, PathBuf) {
        let staged = temp.path().join("staging").join("tpix");
        fs::create_dir_all(staged.parent().unwrap()).unwrap();
        fs::write(&staged, "new build").unwrap();

        let target = temp.path().join("bin").join("tpix");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "old build").unwrap();

        (staged, target)
    }

    #[test]
    fn test_overwrite() {
        let temp = TempDir::new().unwrap();
        let (staged, target) = setup(&temp);

        install_binary(&staged, &target, InstallStrategy::Overwrite).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new build");
        assert!(!staged.exists());
        assert!(!backup_path(&target).exists());
    }

    #[test]
    fn test_overwrite_missing_target() {
        let temp = TempDir::new().unwrap();
        let (staged, target) = setup(&temp);
        fs::remove_file(&target).unwrap();

        install_binary(&staged, &target, InstallStrategy::Overwrite).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new build");
    }

    #[test]
    fn test_rename_aside_replaces_stale_backup() {
        let temp = TempDir::new().unwrap();
        let (staged, target) = setup(&temp);
        let backup = backup_path(&target);
        fs::write(&backup, "stale").unwrap();

        install_binary(&staged, &target, InstallStrategy::RenameAside).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new build");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old build");
    }

    #[test]
    fn test_rename_aside_keeps_backup_on_failure() {
        let temp = TempDir::new().unwrap();
        let (_, target) = setup(&temp);
        let missing = temp.path().join("staging").join("missing");

        assert!(rename_aside(&missing, &target).is_err());
        assert_eq!(fs::read_to_string(backup_path(&target)).unwrap(), "old build");
    }

    #[test]
    fn test_copy_file() {
        let temp = TempDir::new().unwrap();
        let (staged, target) = setup(&temp);

        copy_file(&staged, &target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new build");
        assert!(staged.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_installed_binary_is_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let (staged, target) = setup(&temp);
        fs::set_permissions(&staged, fs::Permissions::from_mode(0o644)).unwrap();

        install_binary(&staged, &target, InstallStrategy::Overwrite).unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/usr/local/bin/tpix")),
            PathBuf::from("/usr/local/bin/tpix.old")
        );
        assert_eq!(
            backup_path(Path::new("C:/tools/tpix.exe")),
            PathBuf::from("C:/tools/tpix.exe.old")
        );
    }

    #[test]
    fn test_find_binary() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("tpix-cli-linux-amd64");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("README.md"), "docs").unwrap();
        fs::write(nested.join("tpix"), "binary").unwrap();

        assert_eq!(find_binary(temp.path(), "tpix").unwrap(), nested.join("tpix"));
        assert!(matches!(
            find_binary(temp.path(), "tpix.exe"),
            Err(TpixError::InvalidArchive(_))
        ));
    }
}
