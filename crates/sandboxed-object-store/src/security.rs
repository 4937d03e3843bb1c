//! Key validation and sandbox enforcement.

use crate::error::{Result, SandboxedStoreError};
use crate::store::METADATA_SUFFIX;
use std::path::{Component, Path, PathBuf};

/// Sets secure permissions on a directory (Unix only).
pub async fn set_secure_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        tokio::fs::set_permissions(path, perms)
            .await
            .map_err(|_e| SandboxedStoreError::Permission {
                operation: "set secure permissions".to_string(),
                path: path.to_path_buf(),
            })?;
    }

    #[cfg(not(unix))]
    {
        if !path.exists() {
            return Err(SandboxedStoreError::PathValidation {
                path: path.to_path_buf(),
                reason: "Directory does not exist".to_string(),
            });
        }
    }

    Ok(())
}

/// Validates an object key and returns its normalized relative path.
///
/// Rejects empty keys, NUL bytes, absolute paths, keys that climb above the
/// root, and keys that collide with metadata sidecar names.
pub fn validate_key(key: &str) -> Result<PathBuf> {
    let invalid = |reason: &str| SandboxedStoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key cannot be empty"));
    }
    if key.contains('\0') {
        return Err(invalid("key contains null bytes"));
    }
    if key.ends_with(METADATA_SUFFIX) {
        return Err(invalid("key uses the reserved metadata suffix"));
    }

    let path = Path::new(key);
    if path.is_absolute() {
        return Err(invalid("absolute keys are not allowed"));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(invalid("key escapes the store root"));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("absolute keys are not allowed"));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(invalid("key resolves to the store root"));
    }

    Ok(normalized)
}

/// Verifies that `resolved_path` stays inside `canonical_base` once symlinks
/// are resolved. Missing files are checked through their nearest existing
/// ancestor.
pub fn validate_path_within_sandbox(resolved_path: &Path, canonical_base: &Path) -> Result<()> {
    let mut probe = resolved_path;
    let canonical = loop {
        if probe.exists() {
            break probe
                .canonicalize()
                .map_err(|e| SandboxedStoreError::PathValidation {
                    path: resolved_path.to_path_buf(),
                    reason: format!("Failed to resolve path: {e}"),
                })?;
        }
        probe = probe
            .parent()
            .ok_or_else(|| SandboxedStoreError::PathValidation {
                path: resolved_path.to_path_buf(),
                reason: "Path has no existing ancestor".to_string(),
            })?;
    };

    if !canonical.starts_with(canonical_base) {
        return Err(SandboxedStoreError::PathValidation {
            path: resolved_path.to_path_buf(),
            reason: format!(
                "Path escapes sandbox: resolves to '{}' (outside '{}')",
                canonical.display(),
                canonical_base.display()
            ),
        });
    }

    Ok(())
}
