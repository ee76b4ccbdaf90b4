//! Output-location safety: generated projects must never land inside the
//! installation's own directories.

use std::path::{Component, Path, PathBuf};

use crate::error::{OrchestratorError, Result};

/// Makes `path` absolute against the current directory and resolves `.` and
/// `..` lexically.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Resolves symlinks in the longest existing ancestor of `path` and reattaches
/// the non-existing remainder.
pub fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = absolutize(path)?;

    let mut existing = absolute.as_path();
    let mut remainder = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                remainder.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = if existing.exists() {
        existing.canonicalize()?
    } else {
        existing.to_path_buf()
    };
    for name in remainder.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// Returns the resolved output location, or an error when it equals or is
/// nested under one of `protected` (compared component-wise).
pub fn check_output_location(path: &Path, protected: &[PathBuf]) -> Result<PathBuf> {
    let resolved = resolve(path)?;

    for root in protected {
        let root = resolve(root)?;
        if resolved.starts_with(&root) {
            return Err(OrchestratorError::UnsafeOutputLocation {
                path: resolved,
                root,
            });
        }
    }
    Ok(resolved)
}

/// Directories generated output must stay out of: the executable's directory,
/// the source tree when running from a cargo `target/` directory, and the
/// testforge home.
pub fn default_protected_roots(home: Option<&Path>) -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        if let Some(tree) = exe_dir
            .ancestors()
            .find(|dir| dir.file_name().is_some_and(|name| name == "target"))
            .and_then(Path::parent)
        {
            roots.push(tree.to_path_buf());
        }
        roots.push(exe_dir);
    }

    if let Some(home) = home {
        roots.push(home.to_path_buf());
    }
    roots
}
