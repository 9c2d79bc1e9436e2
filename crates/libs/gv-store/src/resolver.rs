//! Root-confined path resolution.

use std::{
    ffi::OsString,
    fs, io,
    path::{MAIN_SEPARATOR, Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{path::Rejection, path::sanitize, prelude::*};

/// How path prefixes are compared once both sides are canonical.
///
/// This is configuration, not platform detection: the confinement check must behave the
/// same in tests and in production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCase {
    /// Byte-exact comparison.
    #[default]
    Sensitive,
    /// Case-folded comparison.
    Insensitive,
}

impl PathCase {
    fn fold(&self, path: &Path) -> Vec<u8> {
        let bytes = path.as_os_str().as_encoded_bytes();
        match self {
            PathCase::Sensitive => bytes.to_vec(),
            PathCase::Insensitive => match std::str::from_utf8(bytes) {
                Ok(text) => text.to_lowercase().into_bytes(),
                Err(_) => bytes.to_ascii_lowercase(),
            },
        }
    }
}

/// Resolve `relative` beneath `root` and prove the result stays inside it.
///
/// `relative` is sanitized again here no matter where it came from. Both sides are
/// canonicalized, so symlinks pointing out of the root are caught. A target that does not
/// exist yet resolves through its deepest existing ancestor; reporting it as missing is left
/// to whoever opens it.
pub fn resolve_under_root(root: &Path, relative: &str, case: PathCase) -> Result<PathBuf> {
    let relative = sanitize(relative)?;
    let canonical_root = fs::canonicalize(root)?;

    let mut target = canonical_root.clone();
    for segment in relative.segments() {
        target.push(segment);
    }
    let target = canonicalize_existing_prefix(&target)?;

    if !is_within(&canonical_root, &target, case) {
        debug!(
            "Rejecting {} as it escapes {}",
            target.display(),
            canonical_root.display()
        );
        return Err(Rejection::RootEscape.into());
    }
    Ok(target)
}

fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<OsString> = Vec::new();
    loop {
        match fs::canonicalize(&existing) {
            Ok(mut resolved) => {
                for segment in tail.iter().rev() {
                    resolved.push(segment);
                }
                return Ok(resolved);
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                // A dangling symlink has no canonical form; its target is unknown.
                if fs::symlink_metadata(&existing).is_ok_and(|meta| meta.file_type().is_symlink())
                {
                    return Err(Rejection::RootEscape.into());
                }
                let Some(name) = existing.file_name().map(|name| name.to_os_string()) else {
                    return Err(err.into());
                };
                tail.push(name);
                if !existing.pop() {
                    return Err(err.into());
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn is_within(root: &Path, target: &Path, case: PathCase) -> bool {
    let root = case.fold(root);
    let target = case.fold(target);
    if target == root {
        return true;
    }
    let mut prefix = root;
    let separator = MAIN_SEPARATOR as u8;
    if prefix.last() != Some(&separator) {
        prefix.push(separator);
    }
    target.starts_with(&prefix)
}
