//! Cross-account sharing of spool files.
//!
//! The producer usually runs under the printing subsystem's service account
//! while the consumer runs as the desktop user. Access across that boundary
//! is granted with permissive modes plus a best-effort ownership handoff.
//! Every platform-specific call lives in this module.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;

/// Mode applied to the spool root and each user directory.
pub const SHARED_DIR_MODE: u32 = 0o777;

/// Mode applied to payload files and the pending list.
pub const READABLE_FILE_MODE: u32 = 0o644;

/// Mode applied to the pending-list lock file.
pub const LOCK_FILE_MODE: u32 = 0o666;

/// A local account resolved from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Login name.
    pub name: String,
    /// Numeric user id.
    pub uid: u32,
    /// Primary group id.
    pub gid: u32,
    /// Home directory.
    pub home: PathBuf,
}

/// Look up an account by login name. Unknown names yield `None`.
#[cfg(unix)]
pub fn lookup_account(name: &str) -> Option<Account> {
    match nix::unistd::User::from_name(name) {
        Ok(Some(user)) => Some(Account {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
        }),
        Ok(None) => None,
        Err(e) => {
            debug!(user = name, error = %e, "Account lookup failed");
            None
        }
    }
}

#[cfg(not(unix))]
pub fn lookup_account(_name: &str) -> Option<Account> {
    None
}

/// Name of the account running this process.
#[cfg(unix)]
pub fn current_user() -> AppResult<String> {
    let uid = nix::unistd::getuid();
    match nix::unistd::User::from_uid(uid) {
        Ok(Some(user)) => Ok(user.name),
        Ok(None) => Err(AppError::not_found(format!("No account for uid {uid}"))),
        Err(e) => Err(AppError::with_source(
            ErrorKind::Internal,
            format!("Failed to resolve account for uid {uid}"),
            e,
        )),
    }
}

#[cfg(not(unix))]
pub fn current_user() -> AppResult<String> {
    std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .map_err(|_| AppError::not_found("Cannot determine the current user"))
}

/// Set the permission bits of `path`.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> AppResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to set mode {mode:o} on {}", path.display()),
            e,
        )
    })
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> AppResult<()> {
    Ok(())
}

/// Transfer ownership of `path` to `account`.
#[cfg(unix)]
pub fn hand_over(path: &Path, account: &Account) -> AppResult<()> {
    use nix::unistd::{Gid, Uid, chown};
    chown(
        path,
        Some(Uid::from_raw(account.uid)),
        Some(Gid::from_raw(account.gid)),
    )
    .map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to chown {} to {}", path.display(), account.name),
            e,
        )
    })
}

#[cfg(not(unix))]
pub fn hand_over(_path: &Path, _account: &Account) -> AppResult<()> {
    Ok(())
}

/// Make a directory usable by every local account and, when known, owned by
/// `owner`. Failures are logged and swallowed.
pub fn share_dir(path: &Path, owner: Option<&Account>) {
    if let Err(e) = set_mode(path, SHARED_DIR_MODE) {
        warn!(path = %path.display(), error = %e, "Could not open up spool directory");
    }
    if let Some(account) = owner {
        if let Err(e) = hand_over(path, account) {
            debug!(path = %path.display(), error = %e, "Ownership handoff skipped");
        }
    }
}

/// Make a file readable by its owning account. Failures are logged and
/// swallowed.
pub fn share_file(path: &Path, owner: Option<&Account>) {
    if let Err(e) = set_mode(path, READABLE_FILE_MODE) {
        warn!(path = %path.display(), error = %e, "Could not set spool file mode");
    }
    if let Some(account) = owner {
        if let Err(e) = hand_over(path, account) {
            debug!(path = %path.display(), error = %e, "Ownership handoff skipped");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_share_dir_sets_world_writable() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("spool");
        std::fs::create_dir(&target).unwrap();

        share_dir(&target, None);

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, SHARED_DIR_MODE);
    }

    #[test]
    fn test_share_file_sets_readable() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("job.pdf");
        std::fs::write(&target, b"%PDF").unwrap();

        share_file(&target, None);

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, READABLE_FILE_MODE);
    }

    #[test]
    fn test_unknown_account_is_none() {
        assert!(lookup_account("printhub-no-such-user-xyz").is_none());
    }

    #[test]
    fn test_current_user_resolves() {
        let name = current_user().unwrap();
        assert_eq!(lookup_account(&name).map(|a| a.name), Some(name));
    }
}
